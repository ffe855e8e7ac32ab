//! Detected intents.
//!
//! An intent is the category of help a message asks for plus a finer
//! action within that category. `"{category}:{action}"` is the operation
//! string checked by authorization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Broad category of a learner or staff request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Explain a concept
    Explain,
    /// Work through a specific problem
    Solve,
    /// Request practice problems
    Practice,
    /// Find what went wrong in an attempt
    Diagnose,
    /// Exam preparation
    Exam,
    /// Help with set homework
    Homework,
    /// Progress and mastery reports
    Progress,
    /// Teaching resources and lesson material
    Resources,
    /// Booking and scheduling lessons
    Scheduling,
    /// Anything else
    #[default]
    General,
}

impl IntentCategory {
    /// All categories.
    pub fn all() -> &'static [IntentCategory] {
        &[
            IntentCategory::Explain,
            IntentCategory::Solve,
            IntentCategory::Practice,
            IntentCategory::Diagnose,
            IntentCategory::Exam,
            IntentCategory::Homework,
            IntentCategory::Progress,
            IntentCategory::Resources,
            IntentCategory::Scheduling,
            IntentCategory::General,
        ]
    }

    /// Returns the display name for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Explain => "explain",
            IntentCategory::Solve => "solve",
            IntentCategory::Practice => "practice",
            IntentCategory::Diagnose => "diagnose",
            IntentCategory::Exam => "exam",
            IntentCategory::Homework => "homework",
            IntentCategory::Progress => "progress",
            IntentCategory::Resources => "resources",
            IntentCategory::Scheduling => "scheduling",
            IntentCategory::General => "general",
        }
    }

    /// Parse from a display name. Unknown names map to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::all().iter().copied().find(|c| c.as_str() == value)
    }

    /// Default action used when a detector gives none.
    pub fn default_action(&self) -> &'static str {
        match self {
            IntentCategory::Explain => "concept",
            IntentCategory::Solve => "problem",
            IntentCategory::Practice => "generate",
            IntentCategory::Diagnose => "error",
            IntentCategory::Exam => "prepare",
            IntentCategory::Homework => "help",
            IntentCategory::Progress => "view",
            IntentCategory::Resources => "find",
            IntentCategory::Scheduling => "book",
            IntentCategory::General => "chat",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of intent detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIntent {
    /// Category of the request
    pub category: IntentCategory,

    /// Action within the category
    pub action: String,

    /// Detector confidence (0.0-1.0)
    pub confidence: f32,

    /// Extracted entities (topic, problem text, dates ...)
    #[serde(default)]
    pub entities: HashMap<String, serde_json::Value>,

    /// Whether the action should be confirmed before running
    #[serde(default)]
    pub requires_confirmation: bool,
}

impl DetectedIntent {
    /// Create an intent with the category's default action.
    pub fn new(category: IntentCategory, confidence: f32) -> Self {
        Self {
            category,
            action: category.default_action().to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            entities: HashMap::new(),
            requires_confirmation: false,
        }
    }

    /// Low-confidence general intent used when detection output is unusable.
    pub fn general_fallback() -> Self {
        Self::new(IntentCategory::General, 0.3)
    }

    /// Builder: set action
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Builder: add an entity
    pub fn with_entity(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.entities.insert(key.into(), value);
        self
    }

    /// Operation string checked by authorization, e.g. `"practice:generate"`.
    pub fn operation(&self) -> String {
        format!("{}:{}", self.category.as_str(), self.action)
    }

    /// String entity lookup.
    pub fn entity_str(&self, key: &str) -> Option<&str> {
        self.entities.get(key).and_then(|v| v.as_str())
    }
}
