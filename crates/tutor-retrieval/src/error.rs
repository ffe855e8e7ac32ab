//! Retrieval error types.

use thiserror::Error;

/// Errors raised by external retrieval collaborators.
///
/// The retriever itself never fails a request: these errors are logged and
/// the affected source contributes nothing.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Query embedding could not be computed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Similarity search failed
    #[error("Search error in {namespace}: {message}")]
    Search { namespace: String, message: String },

    /// Curated link lookup failed
    #[error("Link catalog error in {namespace}: {message}")]
    Links { namespace: String, message: String },

    /// Source listing failed
    #[error("Source directory error: {0}")]
    Directory(String),

    /// Source lookup exceeded its timeout
    #[error("Timed out after {0}ms")]
    Timeout(u64),
}
