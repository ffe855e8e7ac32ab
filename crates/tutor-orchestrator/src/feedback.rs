//! Response quality scoring from learner feedback and text heuristics.
//!
//! Scores are all 0.0-1.0. The composite weights learner feedback 0.5,
//! explanation quality 0.3 and understanding promotion 0.2.

use serde::{Deserialize, Serialize};

use tutor_types::TutorError;

/// Score used when no learner feedback exists.
pub const NEUTRAL_FEEDBACK: f32 = 0.5;

/// Learner reaction to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerFeedback {
    ThumbsUp,
    ThumbsDown,
    /// 1-5 star rating
    Rating(u8),
}

impl LearnerFeedback {
    /// Validated star rating.
    pub fn rating(value: u8) -> Result<Self, TutorError> {
        if (1..=5).contains(&value) {
            Ok(LearnerFeedback::Rating(value))
        } else {
            Err(TutorError::InvalidInput(format!(
                "rating must be between 1 and 5, got {}",
                value
            )))
        }
    }

    pub fn score(&self) -> f32 {
        match self {
            LearnerFeedback::ThumbsUp => 1.0,
            LearnerFeedback::ThumbsDown => 0.0,
            LearnerFeedback::Rating(value) => (*value).min(5) as f32 / 5.0,
        }
    }
}

/// Per-signal scores for a response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseScore {
    pub feedback: f32,
    pub explanation_quality: f32,
    pub understanding_promotion: f32,
    pub composite: f32,
}

const STEP_MARKERS: &[&str] = &["step 1", "step 2", "first", "then", "next", "finally", "1.", "2."];
const EXAMPLE_MARKERS: &[&str] = &["for example", "for instance", "such as", "e.g.", "like this"];
const SCAFFOLD_MARKERS: &[&str] = &["remember", "think about", "consider", "notice", "key point"];
const GIVEAWAY_MARKERS: &[&str] = &["the answer is", "answer:", "= answer"];
const ENCOURAGEMENT_MARKERS: &[&str] = &[
    "well done",
    "good",
    "great",
    "excellent",
    "you're on the right track",
    "nice work",
    "keep going",
    "you've got this",
];
const PRIOR_KNOWLEDGE_MARKERS: &[&str] = &[
    "you learned",
    "remember when",
    "as you know",
    "building on",
    "using what you know",
    "from before",
];
const MISCONCEPTION_MARKERS: &[&str] = &[
    "common mistake",
    "be careful",
    "don't confuse",
    "misconception",
    "students often",
    "watch out for",
];

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

/// Structure, examples, length, scaffolding, and not handing over the answer.
pub fn explanation_quality(text: &str) -> f32 {
    let lower = text.to_lowercase();
    let mut score = 0.0;

    if contains_any(&lower, STEP_MARKERS) {
        score += 1.0;
    }
    if contains_any(&lower, EXAMPLE_MARKERS) {
        score += 1.0;
    }

    let words = text.split_whitespace().count();
    if (50..=500).contains(&words) {
        score += 1.0;
    } else if (30..=600).contains(&words) {
        score += 0.5;
    }

    if contains_any(&lower, SCAFFOLD_MARKERS) {
        score += 1.0;
    }
    if !contains_any(&lower, GIVEAWAY_MARKERS) {
        score += 1.0;
    }

    score / 5.0
}

/// Checks for questions, encouragement, prior knowledge and misconceptions.
pub fn understanding_promotion(text: &str) -> f32 {
    let lower = text.to_lowercase();
    let checks = [
        text.contains('?'),
        contains_any(&lower, ENCOURAGEMENT_MARKERS),
        contains_any(&lower, PRIOR_KNOWLEDGE_MARKERS),
        contains_any(&lower, MISCONCEPTION_MARKERS),
    ];
    checks.iter().filter(|c| **c).count() as f32 / 4.0
}

/// Score a response, with or without learner feedback.
pub fn score_response(text: &str, feedback: Option<LearnerFeedback>) -> ResponseScore {
    let feedback = feedback.map_or(NEUTRAL_FEEDBACK, |f| f.score());
    let explanation_quality = explanation_quality(text);
    let understanding_promotion = understanding_promotion(text);

    ResponseScore {
        feedback,
        explanation_quality,
        understanding_promotion,
        composite: 0.5 * feedback + 0.3 * explanation_quality + 0.2 * understanding_promotion,
    }
}
