//! Practice scheduler service.
//!
//! Ties performance tracking, SM-2 review scheduling and gap-driven
//! practice generation to a [`PracticeStore`].
//!
//! Every outcome updates performance, but a topic gets at most one SM-2
//! review per UTC day: the first outcome of the day sets the review, later
//! ones in the same sitting leave the schedule as it is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use tutor_curriculum::CurriculumGraph;
use tutor_types::SchedulerSettings;

use crate::error::SchedulerError;
use crate::gaps::{GapDetector, LearningGap};
use crate::performance::TopicPerformance;
use crate::practice::{build_items, PracticePlan, PracticeStrategy};
use crate::spaced::SpacedRepetitionSchedule;
use crate::store::PracticeStore;

/// Most problems one generated session may hold.
pub const MAX_SESSION_PROBLEMS: usize = 50;

/// SM-2 quality assumed for a correct answer without an explicit rating.
const IMPLICIT_CORRECT_QUALITY: u8 = 4;

/// SM-2 quality assumed for an incorrect answer without an explicit rating.
const IMPLICIT_INCORRECT_QUALITY: u8 = 1;

/// One answered practice problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeOutcome {
    pub student_id: String,
    pub topic_id: String,
    pub correct: bool,
    /// Explicit SM-2 recall quality (0-5)
    #[serde(default)]
    pub quality: Option<u8>,
    pub occurred_at: DateTime<Utc>,
}

impl PracticeOutcome {
    pub fn new(student_id: impl Into<String>, topic_id: impl Into<String>, correct: bool) -> Self {
        Self {
            student_id: student_id.into(),
            topic_id: topic_id.into(),
            correct,
            quality: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// Recall quality used for the SM-2 update.
    pub fn effective_quality(&self) -> u8 {
        self.quality.unwrap_or(if self.correct {
            IMPLICIT_CORRECT_QUALITY
        } else {
            IMPLICIT_INCORRECT_QUALITY
        })
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.student_id.trim().is_empty() {
            return Err(SchedulerError::InvalidInput("student_id is required".to_string()));
        }
        if self.topic_id.trim().is_empty() {
            return Err(SchedulerError::InvalidInput("topic_id is required".to_string()));
        }
        if let Some(q) = self.quality {
            if q > 5 {
                return Err(SchedulerError::InvalidQuality(q));
            }
        }
        Ok(())
    }
}

/// Rows written by [`PracticeScheduler::record_outcome`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedOutcome {
    pub performance: TopicPerformance,
    pub schedule: SpacedRepetitionSchedule,
    /// Whether this outcome applied an SM-2 review
    pub reviewed: bool,
}

/// Adaptive practice scheduler.
///
/// Outcomes for the same (student, topic) pair must be applied by a single
/// writer; [`crate::OutcomeWorker`] provides that.
pub struct PracticeScheduler {
    store: Arc<dyn PracticeStore>,
    graph: Option<Arc<CurriculumGraph>>,
    settings: SchedulerSettings,
}

impl PracticeScheduler {
    pub fn new(store: Arc<dyn PracticeStore>) -> Self {
        Self {
            store,
            graph: None,
            settings: SchedulerSettings::default(),
        }
    }

    /// Curriculum graph for prerequisite boosts and default difficulty.
    pub fn with_graph(mut self, graph: Arc<CurriculumGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Apply one outcome: performance update plus the day's SM-2 review,
    /// stored together.
    #[instrument(skip(self, outcome), fields(student = %outcome.student_id, topic = %outcome.topic_id))]
    pub async fn record_outcome(&self, outcome: &PracticeOutcome) -> Result<RecordedOutcome, SchedulerError> {
        outcome.validate()?;

        let mut performance = self
            .store
            .get_performance(&outcome.student_id, &outcome.topic_id)
            .await?
            .unwrap_or_else(|| TopicPerformance::new(&outcome.student_id, &outcome.topic_id));
        performance.record_attempt(outcome.correct, outcome.occurred_at);

        let mut schedule = self
            .store
            .get_schedule(&outcome.student_id, &outcome.topic_id)
            .await?
            .unwrap_or_else(|| {
                SpacedRepetitionSchedule::new(&outcome.student_id, &outcome.topic_id, outcome.occurred_at)
            });
        let reviewed = !schedule.reviewed_on_day_of(outcome.occurred_at);
        if reviewed {
            schedule.review(outcome.effective_quality(), outcome.occurred_at)?;
        }

        self.store.put_performance(performance.clone()).await?;
        if reviewed {
            self.store.put_schedule(schedule.clone()).await?;
        }

        debug!(
            accuracy = performance.accuracy,
            mastery = performance.mastery,
            interval_days = schedule.interval_days,
            reviewed = reviewed,
            "Recorded practice outcome"
        );

        Ok(RecordedOutcome {
            performance,
            schedule,
            reviewed,
        })
    }

    /// Gaps for a student, highest priority first.
    pub async fn detect_gaps(&self, student_id: &str) -> Result<Vec<LearningGap>, SchedulerError> {
        let records = self.store.list_performance(student_id).await?;
        let mut detector = GapDetector::new(self.settings.min_attempts);
        if let Some(graph) = self.graph.as_deref() {
            detector = detector.with_graph(graph);
        }
        Ok(detector.detect(&records))
    }

    /// Schedules due at `now`, most overdue first.
    pub async fn due_reviews(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SpacedRepetitionSchedule>, SchedulerError> {
        let mut due: Vec<SpacedRepetitionSchedule> = self
            .store
            .list_schedules(student_id)
            .await?
            .into_iter()
            .filter(|s| s.is_due(now))
            .collect();
        due.sort_by(|a, b| {
            a.next_review_at
                .cmp(&b.next_review_at)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        Ok(due)
    }

    /// Generate a practice session targeting the student's gaps.
    pub async fn generate_session(
        &self,
        student_id: &str,
        strategy: PracticeStrategy,
        count: usize,
    ) -> Result<PracticePlan, SchedulerError> {
        Self::check_count(count)?;
        let gaps = self.detect_gaps(student_id).await?;
        Ok(self.plan(student_id, gaps, strategy, count, &mut rand::rng()))
    }

    /// [`Self::generate_session`] with a caller-supplied RNG for the shuffle.
    pub async fn generate_session_with_rng<R: Rng + ?Sized>(
        &self,
        student_id: &str,
        strategy: PracticeStrategy,
        count: usize,
        rng: &mut R,
    ) -> Result<PracticePlan, SchedulerError> {
        Self::check_count(count)?;
        let gaps = self.detect_gaps(student_id).await?;
        Ok(self.plan(student_id, gaps, strategy, count, rng))
    }

    fn check_count(count: usize) -> Result<(), SchedulerError> {
        if count == 0 || count > MAX_SESSION_PROBLEMS {
            return Err(SchedulerError::InvalidInput(format!(
                "count must be 1-{}, got {}",
                MAX_SESSION_PROBLEMS, count
            )));
        }
        Ok(())
    }

    fn plan<R: Rng + ?Sized>(
        &self,
        student_id: &str,
        gaps: Vec<LearningGap>,
        strategy: PracticeStrategy,
        count: usize,
        rng: &mut R,
    ) -> PracticePlan {
        let (items, targeted) = build_items(&gaps, strategy, count, self.graph.as_deref(), rng);
        info!(
            student = student_id,
            strategy = %strategy,
            gaps = gaps.len(),
            items = items.len(),
            "Generated practice session"
        );
        PracticePlan {
            student_id: student_id.to_string(),
            strategy,
            items,
            targeted,
        }
    }
}
