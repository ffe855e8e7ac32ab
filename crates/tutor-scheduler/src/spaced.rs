//! SM-2 spaced repetition.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Starting ease factor.
pub const DEFAULT_EASE_FACTOR: f32 = 2.5;

/// Ease factor floor.
pub const MIN_EASE_FACTOR: f32 = 1.3;

/// Lowest quality that counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Review schedule for one (student, topic) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacedRepetitionSchedule {
    pub student_id: String,
    pub topic_id: String,
    pub next_review_at: DateTime<Utc>,
    pub interval_days: u32,
    pub ease_factor: f32,
    /// Consecutive successful reviews
    pub success_count: u32,
    pub last_quality: Option<u8>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl SpacedRepetitionSchedule {
    /// A fresh schedule, due immediately.
    pub fn new(student_id: impl Into<String>, topic_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            student_id: student_id.into(),
            topic_id: topic_id.into(),
            next_review_at: now,
            interval_days: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            success_count: 0,
            last_quality: None,
            last_reviewed_at: None,
        }
    }

    /// Apply a review with recall quality `quality` (0-5).
    pub fn review(&mut self, quality: u8, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        if quality > 5 {
            return Err(SchedulerError::InvalidQuality(quality));
        }

        let miss = (5 - quality) as f32;
        self.ease_factor = (self.ease_factor + 0.1 - miss * (0.08 + miss * 0.02)).max(MIN_EASE_FACTOR);

        if quality < PASSING_QUALITY {
            self.success_count = 0;
            self.interval_days = 1;
        } else {
            self.success_count += 1;
            self.interval_days = match self.success_count {
                1 => 1,
                2 => 6,
                _ => ((self.interval_days as f32) * self.ease_factor).round().max(1.0) as u32,
            };
        }

        self.last_quality = Some(quality);
        self.last_reviewed_at = Some(now);
        self.next_review_at = now + Duration::days(i64::from(self.interval_days));
        Ok(())
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }

    /// Whether a review was already applied on the UTC calendar day of `at`.
    pub fn reviewed_on_day_of(&self, at: DateTime<Utc>) -> bool {
        self.last_reviewed_at
            .is_some_and(|last| last.date_naive() == at.date_naive())
    }
}
