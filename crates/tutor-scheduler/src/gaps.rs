//! Learning gap detection.
//!
//! A gap is a topic whose performance record shows weak accuracy, low
//! mastery or a declining trend. Severity is the weighted sum of the signals
//! that fired; topics other topics build on get a priority boost.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tutor_curriculum::CurriculumGraph;

use crate::performance::{TopicPerformance, Trend};

const ACCURACY_THRESHOLD: f32 = 0.6;
const MASTERY_THRESHOLD: f32 = 0.5;
const VERY_LOW_ACCURACY: f32 = 0.4;

/// Priority multiplier for topics that are a prerequisite of another topic.
pub const PREREQUISITE_BOOST: f32 = 1.2;

/// Coarse severity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    Critical,
    High,
    Moderate,
}

impl GapSeverity {
    pub fn from_score(severity: f32) -> Self {
        if severity >= 0.7 {
            GapSeverity::Critical
        } else if severity >= 0.5 {
            GapSeverity::High
        } else {
            GapSeverity::Moderate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GapSeverity::Critical => "critical",
            GapSeverity::High => "high",
            GapSeverity::Moderate => "moderate",
        }
    }
}

impl std::fmt::Display for GapSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected learning gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningGap {
    pub topic_id: String,
    pub severity: f32,
    pub label: GapSeverity,
    pub priority: f32,
    pub accuracy: f32,
    pub mastery: f32,
    pub trend: Trend,
    /// Which conditions fired, for display
    pub reasons: Vec<String>,
}

/// Finds gaps in a student's performance records.
#[derive(Debug, Clone)]
pub struct GapDetector<'a> {
    graph: Option<&'a CurriculumGraph>,
    min_attempts: u32,
}

impl<'a> GapDetector<'a> {
    pub fn new(min_attempts: u32) -> Self {
        Self {
            graph: None,
            min_attempts,
        }
    }

    /// Use `graph` for the prerequisite boost.
    pub fn with_graph(mut self, graph: &'a CurriculumGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Evaluate one record. `None` when it has too few attempts or no
    /// condition fires.
    pub fn evaluate(&self, perf: &TopicPerformance) -> Option<LearningGap> {
        if perf.attempted < self.min_attempts {
            return None;
        }

        let low_accuracy = perf.accuracy < ACCURACY_THRESHOLD;
        let low_mastery = perf.mastery < MASTERY_THRESHOLD;
        let declining = perf.trend == Trend::Declining;
        if !(low_accuracy || low_mastery || declining) {
            return None;
        }

        let mut severity: f32 = 0.0;
        let mut reasons = Vec::new();
        if low_accuracy {
            severity += 0.4;
            reasons.push(format!("accuracy {:.0}%", perf.accuracy * 100.0));
        }
        if low_mastery {
            severity += 0.3;
            reasons.push(format!("mastery {:.2}", perf.mastery));
        }
        if declining {
            severity += 0.2;
            reasons.push("declining trend".to_string());
        }
        if perf.accuracy < VERY_LOW_ACCURACY {
            severity += 0.1;
        }
        let severity = severity.min(1.0);

        let is_prerequisite = self
            .graph
            .is_some_and(|g| g.is_prerequisite_of_any(&perf.topic_id));
        let priority = if is_prerequisite {
            severity * PREREQUISITE_BOOST
        } else {
            severity
        };

        Some(LearningGap {
            topic_id: perf.topic_id.clone(),
            severity,
            label: GapSeverity::from_score(severity),
            priority,
            accuracy: perf.accuracy,
            mastery: perf.mastery,
            trend: perf.trend,
            reasons,
        })
    }

    /// All gaps, highest priority first. Ties break by topic id.
    pub fn detect(&self, records: &[TopicPerformance]) -> Vec<LearningGap> {
        let mut gaps: Vec<LearningGap> = records.iter().filter_map(|r| self.evaluate(r)).collect();
        gaps.sort_by(|a, b| {
            b.priority
                .total_cmp(&a.priority)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        debug!(records = records.len(), gaps = gaps.len(), "Detected learning gaps");
        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tutor_curriculum::builtin_graph;

    fn perf(topic: &str, results: &[bool]) -> TopicPerformance {
        let mut p = TopicPerformance::new("s1", topic);
        for r in results {
            p.record_attempt(*r, Utc::now());
        }
        p
    }

    #[test]
    fn test_needs_min_attempts() {
        let detector = GapDetector::new(3);
        assert!(detector.evaluate(&perf("ratio", &[false, false])).is_none());
        assert!(detector.evaluate(&perf("ratio", &[false, false, false])).is_some());
    }

    #[test]
    fn test_low_accuracy_is_critical() {
        let mut results = vec![true, true];
        results.extend([false; 8]);
        let gap = GapDetector::new(3).evaluate(&perf("ratio", &results)).unwrap();

        assert!((gap.accuracy - 0.2).abs() < 1e-6);
        assert!(gap.severity >= 0.7);
        assert_eq!(gap.label, GapSeverity::Critical);
    }

    #[test]
    fn test_strong_topic_has_no_gap() {
        let gap = GapDetector::new(3).evaluate(&perf("ratio", &[true; 12]));
        assert!(gap.is_none());
    }

    #[test]
    fn test_declining_only() {
        // 10 attempts, 7 correct, all misses at the end
        let results = [true, true, true, true, true, true, true, false, false, false];
        let p = perf("ratio", &results);
        assert_eq!(p.trend, Trend::Declining);

        let gap = GapDetector::new(3).evaluate(&p).unwrap();
        assert!((gap.severity - 0.2).abs() < 1e-6);
        assert_eq!(gap.label, GapSeverity::Moderate);
    }

    #[test]
    fn test_prerequisite_boost_orders_gaps() {
        let graph = builtin_graph().unwrap();
        let prerequisite = graph
            .topics()
            .iter()
            .find(|t| graph.is_prerequisite_of_any(&t.id))
            .unwrap()
            .id
            .clone();
        let leaf = graph
            .topics()
            .iter()
            .find(|t| !graph.is_prerequisite_of_any(&t.id))
            .unwrap()
            .id
            .clone();

        let records = vec![perf(&leaf, &[false; 5]), perf(&prerequisite, &[false; 5])];
        let gaps = GapDetector::new(3).with_graph(&graph).detect(&records);

        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].topic_id, prerequisite);
        assert!((gaps[0].priority - gaps[0].severity * PREREQUISITE_BOOST).abs() < 1e-6);
        assert_eq!(gaps[1].priority, gaps[1].severity);
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(GapSeverity::from_score(0.7), GapSeverity::Critical);
        assert_eq!(GapSeverity::from_score(0.5), GapSeverity::High);
        assert_eq!(GapSeverity::from_score(0.49), GapSeverity::Moderate);
    }
}
