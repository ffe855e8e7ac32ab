//! Error types for the practice scheduler.

use thiserror::Error;

/// Errors that can occur during scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Practice store read or write failed
    #[error("Store error: {0}")]
    Store(String),

    /// SM-2 quality outside 0-5
    #[error("Invalid quality: {0} (expected 0-5)")]
    InvalidQuality(u8),

    /// Malformed request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Outcome worker has stopped accepting outcomes
    #[error("Outcome worker is not running")]
    NotRunning,
}
