//! # tutor-types
//!
//! Shared domain types for the tutoring core.
//!
//! This crate defines the data structures used across the workspace:
//! - Knowledge: tiers, source descriptors, chunks and per-tier retrieval strategies
//! - Personas: the caller roles that drive tone, tool access and knowledge sources
//! - Conversation: chat messages and detected intents
//! - Text: keyword extraction with the shared stop-word set
//! - Settings: layered configuration for every component
//!
//! ## Usage
//!
//! ```rust
//! use tutor_types::{extract_keywords, KnowledgeTier, RetrievalStrategy};
//!
//! let strategies = RetrievalStrategy::default_strategies();
//! assert_eq!(strategies[0].tier, KnowledgeTier::Curriculum);
//!
//! let keywords = extract_keywords("Explain the order of operations");
//! assert!(keywords.contains(&"order".to_string()));
//! ```

pub mod config;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod message;
pub mod persona;
pub mod text;

pub use config::{
    ProviderSettings, ProvidersSettings, RankingSettings, ResolverSettings, RetrievalSettings,
    SchedulerSettings, SessionSettings, Settings,
};
pub use error::TutorError;
pub use intent::{DetectedIntent, IntentCategory};
pub use knowledge::{
    KnowledgeChunk, KnowledgeTier, RetrievalStrategy, SourceDescriptor, SourceType,
};
pub use message::{ChatMessage, MessageRole};
pub use persona::Persona;
pub use text::{extract_keywords, is_stop_word, tokenize, STOP_WORDS};
