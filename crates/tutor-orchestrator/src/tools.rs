//! Tool calls the tutor can hand to the host, and their results.
//!
//! Both sides are tagged unions keyed by tool name:
//!
//! ```json
//! {"tool": "generate_practice", "args": {"topic_id": "fractions", "count": 5}}
//! ```
//!
//! Payloads are validated when they cross into the crate; anything invalid
//! is a [`TutorError::InvalidInput`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tutor_curriculum::DifficultyBand;
use tutor_types::{DetectedIntent, IntentCategory, TutorError};

/// Most practice problems one call may request.
pub const MAX_PRACTICE_COUNT: u32 = 20;

const DEFAULT_PRACTICE_COUNT: u32 = 5;

/// A tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "args", rename_all = "snake_case")]
pub enum ToolCall {
    GeneratePractice {
        topic_id: String,
        count: u32,
        #[serde(default)]
        difficulty: Option<DifficultyBand>,
    },
    ExplainConcept {
        concept: String,
        #[serde(default)]
        topic_id: Option<String>,
    },
    CheckAnswer {
        problem: String,
        answer: String,
    },
    ScheduleReview {
        topic_id: String,
        /// SM-2 recall quality, 0-5
        quality: u8,
    },
    SearchResources {
        query: String,
        #[serde(default)]
        topic_id: Option<String>,
    },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::GeneratePractice { .. } => "generate_practice",
            ToolCall::ExplainConcept { .. } => "explain_concept",
            ToolCall::CheckAnswer { .. } => "check_answer",
            ToolCall::ScheduleReview { .. } => "schedule_review",
            ToolCall::SearchResources { .. } => "search_resources",
        }
    }

    /// Parse and validate a JSON payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TutorError> {
        let call: ToolCall = serde_json::from_value(value)
            .map_err(|e| TutorError::InvalidInput(format!("invalid tool call: {}", e)))?;
        call.validate()?;
        Ok(call)
    }

    pub fn validate(&self) -> Result<(), TutorError> {
        let invalid = |msg: String| Err(TutorError::InvalidInput(format!("{}: {}", self.name(), msg)));

        match self {
            ToolCall::GeneratePractice { topic_id, count, .. } => {
                if topic_id.trim().is_empty() {
                    return invalid("topic_id is required".to_string());
                }
                if *count == 0 || *count > MAX_PRACTICE_COUNT {
                    return invalid(format!("count must be 1-{}, got {}", MAX_PRACTICE_COUNT, count));
                }
            }
            ToolCall::ExplainConcept { concept, .. } => {
                if concept.trim().is_empty() {
                    return invalid("concept is required".to_string());
                }
            }
            ToolCall::CheckAnswer { problem, answer } => {
                if problem.trim().is_empty() || answer.trim().is_empty() {
                    return invalid("problem and answer are required".to_string());
                }
            }
            ToolCall::ScheduleReview { topic_id, quality } => {
                if topic_id.trim().is_empty() {
                    return invalid("topic_id is required".to_string());
                }
                if *quality > 5 {
                    return invalid(format!("quality must be 0-5, got {}", quality));
                }
            }
            ToolCall::SearchResources { query, .. } => {
                if query.trim().is_empty() {
                    return invalid("query is required".to_string());
                }
            }
        }
        Ok(())
    }

    /// Derive a tool call from a detected intent.
    ///
    /// `topics` are the curriculum topics resolved for the message, best
    /// first. Returns `Ok(None)` for intents that map to no tool.
    pub fn from_intent(intent: &DetectedIntent, topics: &[String]) -> Result<Option<Self>, TutorError> {
        let entity_topic = || {
            intent
                .entity_str("topic_id")
                .map(str::to_string)
                .or_else(|| topics.first().cloned())
        };
        let message = intent.entity_str("message").unwrap_or_default().to_string();

        let call = match intent.category {
            IntentCategory::Practice => {
                let count = match intent.entities.get("count") {
                    None => DEFAULT_PRACTICE_COUNT,
                    Some(v) => v
                        .as_u64()
                        .and_then(|c| u32::try_from(c).ok())
                        .ok_or_else(|| TutorError::InvalidInput(format!("count is not a number: {}", v)))?,
                };
                let difficulty = match intent.entities.get("difficulty") {
                    None => None,
                    Some(v) => Some(serde_json::from_value(v.clone()).map_err(|_| {
                        TutorError::InvalidInput(format!("unknown difficulty: {}", v))
                    })?),
                };
                ToolCall::GeneratePractice {
                    topic_id: entity_topic().unwrap_or_default(),
                    count,
                    difficulty,
                }
            }
            IntentCategory::Explain => ToolCall::ExplainConcept {
                concept: intent
                    .entity_str("concept")
                    .or_else(|| intent.entity_str("topic"))
                    .map(str::to_string)
                    .unwrap_or(message),
                topic_id: entity_topic(),
            },
            IntentCategory::Diagnose => ToolCall::CheckAnswer {
                problem: intent.entity_str("problem").unwrap_or_default().to_string(),
                answer: intent.entity_str("answer").unwrap_or_default().to_string(),
            },
            IntentCategory::Resources => ToolCall::SearchResources {
                query: intent
                    .entity_str("query")
                    .map(str::to_string)
                    .unwrap_or(message),
                topic_id: entity_topic(),
            },
            _ => return Ok(None),
        };

        call.validate()?;
        Ok(Some(call))
    }
}

/// Outcome of a tool call, reported back by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "result", rename_all = "snake_case")]
pub enum ToolResult {
    GeneratePractice { problems: Vec<String> },
    ExplainConcept { explanation: String },
    CheckAnswer { correct: bool, feedback: String },
    ScheduleReview { next_review_at: DateTime<Utc> },
    SearchResources { titles: Vec<String>, urls: Vec<String> },
}

impl ToolResult {
    pub fn name(&self) -> &'static str {
        match self {
            ToolResult::GeneratePractice { .. } => "generate_practice",
            ToolResult::ExplainConcept { .. } => "explain_concept",
            ToolResult::CheckAnswer { .. } => "check_answer",
            ToolResult::ScheduleReview { .. } => "schedule_review",
            ToolResult::SearchResources { .. } => "search_resources",
        }
    }

    /// Whether this result answers `call`.
    pub fn answers(&self, call: &ToolCall) -> bool {
        self.name() == call.name()
    }

    /// Parse a host-reported result for `call`.
    ///
    /// Rejects malformed payloads and results for a different tool.
    pub fn from_value(call: &ToolCall, value: serde_json::Value) -> Result<Self, TutorError> {
        let result: ToolResult = serde_json::from_value(value)
            .map_err(|e| TutorError::InvalidInput(format!("invalid tool result: {}", e)))?;
        if !result.answers(call) {
            return Err(TutorError::InvalidInput(format!(
                "{} result does not answer a {} call",
                result.name(),
                call.name()
            )));
        }
        if let ToolResult::SearchResources { titles, urls } = &result {
            if titles.len() != urls.len() {
                return Err(TutorError::InvalidInput(format!(
                    "search_resources: {} titles but {} urls",
                    titles.len(),
                    urls.len()
                )));
            }
        }
        Ok(result)
    }

    /// One-line note for the session history.
    pub fn summary(&self) -> String {
        match self {
            ToolResult::GeneratePractice { problems } => {
                format!("Practice set generated: {}", problems.join("; "))
            }
            ToolResult::ExplainConcept { explanation } => format!("Explanation given: {}", explanation),
            ToolResult::CheckAnswer { correct, feedback } => format!(
                "Answer checked ({}): {}",
                if *correct { "correct" } else { "incorrect" },
                feedback
            ),
            ToolResult::ScheduleReview { next_review_at } => {
                format!("Review scheduled for {}", next_review_at.format("%Y-%m-%d"))
            }
            ToolResult::SearchResources { titles, .. } => {
                format!("Resources found: {}", titles.join("; "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_json_shape() {
        let call = ToolCall::GeneratePractice {
            topic_id: "fractions".to_string(),
            count: 3,
            difficulty: Some(DifficultyBand::Intermediate),
        };
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(value["tool"], "generate_practice");
        assert_eq!(value["args"]["difficulty"], "intermediate");
        assert_eq!(ToolCall::from_value(value).unwrap(), call);
    }

    #[test]
    fn test_from_value_rejects_bad_payloads() {
        let unknown = json!({"tool": "launch_rockets", "args": {}});
        assert!(matches!(ToolCall::from_value(unknown), Err(TutorError::InvalidInput(_))));

        let too_many = json!({"tool": "generate_practice", "args": {"topic_id": "ratio", "count": 50}});
        assert!(matches!(ToolCall::from_value(too_many), Err(TutorError::InvalidInput(_))));

        let bad_quality = json!({"tool": "schedule_review", "args": {"topic_id": "ratio", "quality": 9}});
        assert!(ToolCall::from_value(bad_quality).is_err());
    }

    #[test]
    fn test_practice_from_intent() {
        let intent = DetectedIntent::new(IntentCategory::Practice, 0.9)
            .with_entity("count", json!(8));
        let call = ToolCall::from_intent(&intent, &["linear_equations".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(
            call,
            ToolCall::GeneratePractice {
                topic_id: "linear_equations".to_string(),
                count: 8,
                difficulty: None,
            }
        );
    }

    #[test]
    fn test_practice_without_topic_is_invalid() {
        let intent = DetectedIntent::new(IntentCategory::Practice, 0.9);
        assert!(matches!(
            ToolCall::from_intent(&intent, &[]),
            Err(TutorError::InvalidInput(_))
        ));

        let intent = DetectedIntent::new(IntentCategory::Practice, 0.9)
            .with_entity("count", json!("lots"));
        assert!(ToolCall::from_intent(&intent, &["ratio".to_string()]).is_err());
    }

    #[test]
    fn test_explain_and_general() {
        let intent = DetectedIntent::new(IntentCategory::Explain, 0.8)
            .with_entity("message", json!("what is a ratio"));
        let call = ToolCall::from_intent(&intent, &["ratio".to_string()]).unwrap().unwrap();
        assert_eq!(call.name(), "explain_concept");

        let intent = DetectedIntent::new(IntentCategory::General, 0.3);
        assert_eq!(ToolCall::from_intent(&intent, &[]).unwrap(), None);
    }

    #[test]
    fn test_result_matches_call() {
        let call = ToolCall::CheckAnswer {
            problem: "2 + 2".to_string(),
            answer: "4".to_string(),
        };
        let value = json!({"tool": "check_answer", "result": {"correct": true, "feedback": "Well done"}});
        let result = ToolResult::from_value(&call, value).unwrap();
        assert_eq!(
            result,
            ToolResult::CheckAnswer {
                correct: true,
                feedback: "Well done".to_string(),
            }
        );
        assert_eq!(result.summary(), "Answer checked (correct): Well done");
    }

    #[test]
    fn test_result_for_other_tool_is_rejected() {
        let call = ToolCall::ExplainConcept {
            concept: "ratio".to_string(),
            topic_id: None,
        };
        let wrong_tool = json!({"tool": "check_answer", "result": {"correct": true, "feedback": "ok"}});
        assert!(matches!(
            ToolResult::from_value(&call, wrong_tool),
            Err(TutorError::InvalidInput(_))
        ));

        let call = ToolCall::SearchResources {
            query: "ratio".to_string(),
            topic_id: None,
        };
        let lopsided = json!({"tool": "search_resources", "result": {"titles": ["A", "B"], "urls": ["https://a.example"]}});
        assert!(ToolResult::from_value(&call, lopsided).is_err());
    }
}
