//! Rule-based provider that works without network access.
//!
//! Replies are assembled from the learner's detected intent and whatever
//! curriculum context the request carries. Always available, so it makes a
//! sensible last entry in the priority list.

use async_trait::async_trait;

use tutor_types::{DetectedIntent, IntentCategory, Persona};

use crate::intent::LocalIntentDetector;

use super::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderError};

/// Maximum context bullets quoted per section.
const MAX_BULLETS: usize = 2;

/// Offline, rule-based provider.
#[derive(Default)]
pub struct OfflineProvider {
    detector: LocalIntentDetector,
}

impl OfflineProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn compose(&self, message: &str, context: Option<&str>) -> CompletionResponse {
        let intent = self.detector.detect(message);
        let mut parts = vec![opening(intent.category).to_string()];

        if let Some(context) = context {
            if let Some(topics) = line_value(context, "Topics:") {
                parts.push(format!("This is about {}.", topics));
            }
            let objectives = section_bullets(context, "Learning objectives:");
            if !objectives.is_empty() {
                parts.push(format!("We'll focus on: {}.", objectives.join("; ")));
            }
            let misconceptions = section_bullets(context, "Common misconceptions to watch for:");
            if let Some(first) = misconceptions.first() {
                parts.push(format!("A common slip here is: {}.", first.trim_end_matches('.')));
            }
        }

        parts.push(closing(intent.category).to_string());

        CompletionResponse::new(parts.join(" ")).with_suggestions(
            suggestions(intent.category)
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

fn opening(category: IntentCategory) -> &'static str {
    match category {
        IntentCategory::Explain => "Let's break this idea down step by step.",
        IntentCategory::Solve => "Let's work through this problem together.",
        IntentCategory::Practice => "Here's a chance to practise.",
        IntentCategory::Diagnose => "Mistakes are how we learn, so let's find where it went off track.",
        IntentCategory::Exam => "Let's get you ready for the exam.",
        IntentCategory::Homework => "Let's tackle your homework one question at a time.",
        IntentCategory::Progress => "I can't load your full progress report offline right now.",
        IntentCategory::Resources => "I can't search for new resources offline right now.",
        IntentCategory::Scheduling => "I can't reach the booking system offline right now.",
        IntentCategory::General => "I'm here to help.",
    }
}

fn closing(category: IntentCategory) -> &'static str {
    match category {
        IntentCategory::Solve | IntentCategory::Homework => {
            "What do you think the first step should be?"
        }
        IntentCategory::Diagnose => "Can you show me your working so far?",
        IntentCategory::Practice | IntentCategory::Exam => {
            "Try the first question and tell me your answer."
        }
        IntentCategory::Explain => "Which part would you like me to go over first?",
        _ => "What would you like to do next?",
    }
}

fn suggestions(category: IntentCategory) -> &'static [&'static str] {
    match category {
        IntentCategory::Explain => &["Show me an example", "Give me a practice question"],
        IntentCategory::Solve | IntentCategory::Homework => {
            &["Give me a hint", "Check my answer"]
        }
        IntentCategory::Practice | IntentCategory::Exam => {
            &["Make it harder", "Make it easier", "Explain the answer"]
        }
        IntentCategory::Diagnose => &["Explain the correct method", "Try a similar question"],
        _ => &["Explain a topic", "Practise a topic"],
    }
}

// Value after `label` on the first line starting with it.
fn line_value<'a>(context: &'a str, label: &str) -> Option<&'a str> {
    context
        .lines()
        .find_map(|l| l.trim().strip_prefix(label))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// Bullet lines directly following a section header.
fn section_bullets<'a>(context: &'a str, header: &str) -> Vec<&'a str> {
    context
        .lines()
        .skip_while(|l| l.trim() != header)
        .skip(1)
        .map_while(|l| l.trim().strip_prefix("- "))
        .take(MAX_BULLETS)
        .collect()
}

#[async_trait]
impl CompletionProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    fn available(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let message = request
            .last_user_message()
            .ok_or_else(|| ProviderError::Api("request has no user message".to_string()))?;
        Ok(self.compose(&message.content, request.context.as_deref()))
    }

    async fn detect_intent(
        &self,
        message: &str,
        _persona: Persona,
        _subject: Option<&str>,
        _level: Option<&str>,
    ) -> Result<DetectedIntent, ProviderError> {
        Ok(self.detector.detect(message))
    }
}
