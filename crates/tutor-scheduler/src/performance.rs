//! Per-topic performance tracking.
//!
//! A [`TopicPerformance`] row is updated exactly once per recorded attempt.
//! Mastery is a confidence-weighted blend of the previous mastery and the raw
//! accuracy: the more attempts, the closer mastery sits to accuracy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attempts kept for trend detection.
pub const HISTORY_WINDOW: usize = 20;

/// Attempts at which mastery fully tracks accuracy.
const FULL_CONFIDENCE_ATTEMPTS: f32 = 10.0;

/// Accuracy shift between history halves that counts as a trend.
const TREND_THRESHOLD: f32 = 0.1;

/// Direction of recent performance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One practice attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub correct: bool,
    pub attempted_at: DateTime<Utc>,
}

/// Performance of one student on one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPerformance {
    pub student_id: String,
    pub topic_id: String,
    pub attempted: u32,
    pub correct: u32,
    /// correct / attempted
    pub accuracy: f32,
    /// Confidence-weighted skill estimate, 0.0-1.0
    pub mastery: f32,
    pub last_practiced_at: Option<DateTime<Utc>>,
    pub trend: Trend,
    /// Most recent attempts, oldest first
    #[serde(default)]
    pub history: Vec<AttemptRecord>,
}

impl TopicPerformance {
    pub fn new(student_id: impl Into<String>, topic_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            topic_id: topic_id.into(),
            attempted: 0,
            correct: 0,
            accuracy: 0.0,
            mastery: 0.0,
            last_practiced_at: None,
            trend: Trend::Stable,
            history: Vec::new(),
        }
    }

    /// Apply one attempt.
    pub fn record_attempt(&mut self, correct: bool, at: DateTime<Utc>) {
        self.attempted += 1;
        if correct {
            self.correct += 1;
        }
        self.accuracy = self.correct as f32 / self.attempted as f32;

        let confidence = (self.attempted as f32 / FULL_CONFIDENCE_ATTEMPTS).min(1.0);
        self.mastery = (self.mastery * (1.0 - confidence) + self.accuracy * confidence).clamp(0.0, 1.0);

        self.last_practiced_at = Some(at);
        self.history.push(AttemptRecord {
            correct,
            attempted_at: at,
        });
        if self.history.len() > HISTORY_WINDOW {
            let excess = self.history.len() - HISTORY_WINDOW;
            self.history.drain(..excess);
        }
        self.trend = trend_of(&self.history);
    }
}

/// Compare accuracy of the recent half of `history` against the older half.
///
/// Fewer than four attempts is always stable.
pub fn trend_of(history: &[AttemptRecord]) -> Trend {
    if history.len() < 4 {
        return Trend::Stable;
    }

    let (older, recent) = history.split_at(history.len() / 2);
    let accuracy = |records: &[AttemptRecord]| {
        records.iter().filter(|r| r.correct).count() as f32 / records.len() as f32
    };

    let delta = accuracy(recent) - accuracy(older);
    if delta > TREND_THRESHOLD {
        Trend::Improving
    } else if delta < -TREND_THRESHOLD {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(perf: &mut TopicPerformance, results: &[bool]) {
        for correct in results {
            perf.record_attempt(*correct, Utc::now());
        }
    }

    #[test]
    fn test_first_attempt() {
        let mut perf = TopicPerformance::new("s1", "fractions");
        perf.record_attempt(true, Utc::now());

        assert_eq!(perf.attempted, 1);
        assert_eq!(perf.correct, 1);
        assert_eq!(perf.accuracy, 1.0);
        // confidence 0.1 against a zero starting mastery
        assert!((perf.mastery - 0.1).abs() < 1e-6);
        assert!(perf.last_practiced_at.is_some());
        assert_eq!(perf.trend, Trend::Stable);
    }

    #[test]
    fn test_mastery_converges_on_accuracy() {
        let mut perf = TopicPerformance::new("s1", "ratio");
        record(&mut perf, &[true; 10]);
        // At ten attempts confidence is 1.0, so mastery equals accuracy
        assert!((perf.mastery - 1.0).abs() < 1e-6);

        record(&mut perf, &[false; 10]);
        assert!((perf.accuracy - 0.5).abs() < 1e-6);
        assert!((perf.mastery - perf.accuracy).abs() < 1e-6);
    }

    #[test]
    fn test_trend_detection() {
        let mut perf = TopicPerformance::new("s1", "ratio");
        record(&mut perf, &[false, false, true, true]);
        assert_eq!(perf.trend, Trend::Improving);

        let mut perf = TopicPerformance::new("s1", "ratio");
        record(&mut perf, &[true, true, false, false]);
        assert_eq!(perf.trend, Trend::Declining);

        let mut perf = TopicPerformance::new("s1", "ratio");
        record(&mut perf, &[true, false, true, false]);
        assert_eq!(perf.trend, Trend::Stable);

        let mut perf = TopicPerformance::new("s1", "ratio");
        record(&mut perf, &[true, false, false]);
        assert_eq!(perf.trend, Trend::Stable);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut perf = TopicPerformance::new("s1", "ratio");
        record(&mut perf, &[true; 25]);
        assert_eq!(perf.history.len(), HISTORY_WINDOW);
        assert_eq!(perf.attempted, 25);
    }

    #[test]
    fn test_serde_shape() {
        let mut perf = TopicPerformance::new("s1", "ratio");
        record(&mut perf, &[true, true, false, false]);
        let json = serde_json::to_value(&perf).unwrap();
        assert_eq!(json["trend"], "declining");
        assert_eq!(json["attempted"], 4);
    }
}
