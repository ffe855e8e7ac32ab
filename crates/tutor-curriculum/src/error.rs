//! Curriculum error types.

use thiserror::Error;

/// Errors raised while loading a curriculum.
#[derive(Debug, Error)]
pub enum CurriculumError {
    /// Curriculum document could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Two topics share an id
    #[error("Duplicate topic id: {0}")]
    DuplicateTopic(String),

    /// A topic names a parent, prerequisite or related topic that does not exist
    #[error("Topic {topic} references unknown topic {reference}")]
    UnknownReference { topic: String, reference: String },
}
