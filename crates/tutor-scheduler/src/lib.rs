//! # tutor-scheduler
//!
//! Adaptive practice scheduling for the tutoring core.
//!
//! This crate provides:
//! - Per-topic performance tracking with confidence-weighted mastery and
//!   trend detection
//! - Learning gap detection with prerequisite-aware priority
//! - Focused and interleaved practice session generation
//! - SM-2 spaced repetition schedules
//! - `PracticeStore` persistence trait with an in-memory implementation
//! - `OutcomeWorker`, a background consumer of practice outcomes with
//!   graceful shutdown
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tutor_scheduler::{InMemoryPracticeStore, PracticeOutcome, PracticeScheduler, PracticeStrategy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let scheduler = PracticeScheduler::new(Arc::new(InMemoryPracticeStore::new()));
//!
//! for correct in [false, false, true, false] {
//!     scheduler
//!         .record_outcome(&PracticeOutcome::new("learner-1", "fractions", correct))
//!         .await
//!         .unwrap();
//! }
//!
//! let gaps = scheduler.detect_gaps("learner-1").await.unwrap();
//! assert_eq!(gaps[0].topic_id, "fractions");
//!
//! let plan = scheduler
//!     .generate_session("learner-1", PracticeStrategy::Focused, 5)
//!     .await
//!     .unwrap();
//! assert_eq!(plan.items.len(), 5);
//! # }
//! ```

pub mod error;
pub mod gaps;
pub mod performance;
pub mod practice;
pub mod scheduler;
pub mod spaced;
pub mod store;
pub mod worker;

pub use error::SchedulerError;
pub use gaps::{GapDetector, GapSeverity, LearningGap, PREREQUISITE_BOOST};
pub use performance::{trend_of, AttemptRecord, TopicPerformance, Trend, HISTORY_WINDOW};
pub use practice::{
    build_items, difficulty_for, fisher_yates, split_evenly, PracticeItem, PracticePlan,
    PracticeStrategy, INTERLEAVE_WIDTH,
};
pub use scheduler::{PracticeOutcome, PracticeScheduler, RecordedOutcome, MAX_SESSION_PROBLEMS};
pub use spaced::{SpacedRepetitionSchedule, DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR, PASSING_QUALITY};
pub use store::{InMemoryPracticeStore, PracticeStore};
pub use worker::{OutcomeSender, OutcomeWorker, WorkerStats};
