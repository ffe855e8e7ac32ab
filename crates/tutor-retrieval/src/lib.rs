//! # tutor-retrieval
//!
//! Multi-tier knowledge retrieval and ranking for the tutoring core.
//!
//! This crate provides:
//! - `KnowledgeRetriever`: concurrent per-source lookups (vector similarity
//!   for material tiers, keyword overlap for curated links) with priority
//!   weighting, merge and score filtering
//! - `QualityScorer`: relevance, authority, topic alignment and recency
//! - `RankingEngine`: per-tier strategies, fusion, context expansion,
//!   coverage and token-budgeted context synthesis
//!
//! External collaborators (similarity store, embedder, link catalog, source
//! directory) are traits; in-memory mocks live in [`mock`].
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tutor_retrieval::{QualityScorer, RankingEngine};
//! use tutor_types::{KnowledgeChunk, KnowledgeTier, SourceDescriptor, SourceType};
//!
//! let source = SourceDescriptor::new(SourceType::Curriculum, "GCSE maths notes", Utc::now());
//! let chunk = KnowledgeChunk::new("c1", "Brackets come first in BIDMAS", KnowledgeTier::Curriculum, source, 0.9);
//!
//! let engine = RankingEngine::new(QualityScorer::new());
//! let report = engine.run("brackets bidmas", &[chunk], &[]);
//! assert_eq!(report.coverage, 1.0);
//! ```

pub mod error;
pub mod mock;
pub mod quality;
pub mod ranking;
pub mod retriever;

pub use error::RetrievalError;
pub use mock::{MockEmbedder, MockLinkCatalog, MockSimilaritySearch, StaticSourceDirectory};
pub use quality::{recency_score, QualityBreakdown, QualityScorer, QualityWeights};
pub use ranking::{coverage, RankedChunk, RankingEngine, RankingReport, SynthesizedContext};
pub use retriever::{
    keyword_overlap, merge_hits, CuratedLink, KnowledgeRetriever, KnowledgeSource,
    KnowledgeSourceDirectory, LinkCatalog, QueryEmbedder, RetrievalHit, RetrievalRequest,
    RetrievalResult, SimilarityRow, SimilaritySearch, SourceKind, SourceResults,
};
