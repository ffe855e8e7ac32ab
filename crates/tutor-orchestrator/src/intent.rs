//! Intent detection helpers.
//!
//! Provider-backed detection asks a completion provider for a JSON intent
//! and parses it with [`parse_intent_json`]. When no provider can answer,
//! [`LocalIntentDetector`] classifies from keyword tables. It never fails,
//! and its confidence stays below what a provider reports.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use tutor_types::{DetectedIntent, IntentCategory, Persona};

static RE_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\s+(?:more\s+)?(?:questions|problems|examples|exercises)\b")
        .expect("valid regex")
});

/// Confidence reported by the local detector when nothing matches.
pub const LOCAL_BASE_CONFIDENCE: f32 = 0.3;

/// Highest confidence the local detector will report.
pub const LOCAL_MAX_CONFIDENCE: f32 = 0.7;

/// Keyword tables for the local detector, checked in this order on ties.
fn default_keywords() -> Vec<(IntentCategory, Vec<&'static str>)> {
    vec![
        (
            IntentCategory::Diagnose,
            vec!["wrong", "mistake", "where did i go", "why is my", "incorrect", "marked"],
        ),
        (
            IntentCategory::Practice,
            vec!["practice", "practise", "quiz", "test me", "exercise", "drill", "more questions"],
        ),
        (
            IntentCategory::Homework,
            vec!["homework", "assignment", "worksheet", "due tomorrow", "coursework"],
        ),
        (
            IntentCategory::Exam,
            vec!["exam", "gcse", "revision", "revise", "past paper", "mock"],
        ),
        (
            IntentCategory::Solve,
            vec!["solve", "calculate", "work out", "evaluate", "find the value", "how do i"],
        ),
        (
            IntentCategory::Explain,
            vec!["explain", "what is", "what are", "what does", "why", "how does", "meaning", "define"],
        ),
        (
            IntentCategory::Progress,
            vec!["progress", "how am i doing", "report", "mastery", "weak topics"],
        ),
        (
            IntentCategory::Resources,
            vec!["resource", "lesson plan", "materials", "video", "reading list"],
        ),
        (
            IntentCategory::Scheduling,
            vec!["book a", "schedule", "reschedule", "cancel", "availability", "next lesson"],
        ),
    ]
}

/// Keyword-table intent classifier.
pub struct LocalIntentDetector {
    tables: Vec<(IntentCategory, Vec<String>)>,
}

impl Default for LocalIntentDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIntentDetector {
    pub fn new() -> Self {
        let tables = default_keywords()
            .into_iter()
            .map(|(c, words)| (c, words.into_iter().map(str::to_string).collect()))
            .collect();
        Self { tables }
    }

    /// Classify a message. Always returns an intent.
    pub fn detect(&self, message: &str) -> DetectedIntent {
        let lower = message.to_lowercase();

        let mut best: Option<(IntentCategory, f32, Vec<&str>)> = None;
        for (category, keywords) in &self.tables {
            let matched: Vec<&str> = keywords
                .iter()
                .filter(|k| lower.contains(k.as_str()))
                .map(String::as_str)
                .collect();
            let score = calculate_score(&matched);
            if score > 0.0 && best.as_ref().map_or(true, |(_, s, _)| score > *s) {
                best = Some((*category, score, matched));
            }
        }

        let mut intent = match best {
            Some((category, score, matched)) => {
                debug!(category = category.as_str(), score = score, matched = ?matched, "Local intent match");
                let confidence = LOCAL_BASE_CONFIDENCE
                    + (LOCAL_MAX_CONFIDENCE - LOCAL_BASE_CONFIDENCE) * score;
                DetectedIntent::new(category, confidence)
            }
            None => DetectedIntent::new(IntentCategory::General, LOCAL_BASE_CONFIDENCE),
        };

        if let Some(count) = RE_COUNT
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            intent = intent.with_entity("count", serde_json::json!(count));
        }
        intent.with_entity("message", serde_json::json!(message))
    }
}

// More matches and longer phrases score higher.
fn calculate_score(matches: &[&str]) -> f32 {
    if matches.is_empty() {
        return 0.0;
    }
    let base = (matches.len() as f32).min(3.0) / 3.0;
    let specificity_bonus: f32 = matches
        .iter()
        .map(|k| if k.len() > 5 { 0.1 } else { 0.0 })
        .sum();
    (base + specificity_bonus).min(1.0)
}

/// Prompt asking a provider to classify a message as JSON.
pub fn intent_prompt(persona: Persona, subject: Option<&str>, level: Option<&str>) -> String {
    let categories: Vec<&str> = IntentCategory::all().iter().map(|c| c.as_str()).collect();
    format!(
        r#"Classify the {persona}'s message for a tutoring assistant.
Subject: {subject}. Level: {level}.

Respond with JSON only:
{{
  "category": one of [{categories}],
  "action": "short verb for the requested operation",
  "confidence": 0.0-1.0,
  "entities": {{"topic": "...", "count": 5}},
  "requires_confirmation": false
}}"#,
        persona = persona.as_str(),
        subject = subject.unwrap_or("unspecified"),
        level = level.unwrap_or("unspecified"),
        categories = categories.join(", "),
    )
}

#[derive(Deserialize)]
struct RawIntent {
    category: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    entities: HashMap<String, serde_json::Value>,
    #[serde(default)]
    requires_confirmation: bool,
}

/// Parse a provider's intent JSON. Returns `None` for malformed output or an
/// unknown category.
pub fn parse_intent_json(text: &str) -> Option<DetectedIntent> {
    let raw: RawIntent = serde_json::from_str(&extract_json(text)).ok()?;
    let category = IntentCategory::parse(&raw.category)?;

    let mut intent = DetectedIntent::new(category, raw.confidence.unwrap_or(0.8));
    if let Some(action) = raw.action.filter(|a| !a.trim().is_empty()) {
        intent.action = action.trim().to_lowercase();
    }
    intent.entities = raw.entities;
    intent.requires_confirmation = raw.requires_confirmation;
    Some(intent)
}

/// Extract a JSON object from text (handles markdown code blocks).
pub fn extract_json(text: &str) -> String {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim().to_string();
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            return text[start + 3..start + 3 + end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}
