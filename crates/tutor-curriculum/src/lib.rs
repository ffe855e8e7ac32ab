//! # tutor-curriculum
//!
//! Curriculum topic graph and query-to-topic resolution.
//!
//! The graph is a static taxonomy of topics with parent/child, prerequisite
//! and related-topic edges. The resolver maps free-text learner queries onto
//! those topics and assembles a [`CurriculumContext`] used to ground answers,
//! align retrieved knowledge and target practice.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tutor_curriculum::{builtin_graph, TopicResolver, MATHS};
//!
//! let graph = Arc::new(builtin_graph().unwrap());
//! let resolver = TopicResolver::new(graph);
//!
//! let ctx = resolver.build_context("What is 100 - 50 × 2", MATHS, None).unwrap();
//! assert_eq!(ctx.topic_ids()[0], "four_operations");
//! ```

pub mod builtin;
pub mod error;
pub mod graph;
pub mod resolver;

pub use builtin::{builtin_graph, MATHS};
pub use error::CurriculumError;
pub use graph::{
    CurriculumGraph, CurriculumTopic, DifficultyBand, TopicId, TopicRelation, TopicTier,
};
pub use resolver::{normalize_query, CurriculumContext, TopicMatch, TopicResolver, TopicSummary};
