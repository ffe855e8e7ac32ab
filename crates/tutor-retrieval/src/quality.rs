//! Per-chunk quality scoring.
//!
//! Quality is a weighted sum of four signals, each in 0.0-1.0:
//!
//! | Signal | Weight | Source |
//! |---|---|---|
//! | relevance | 0.40 | raw similarity from the source lookup |
//! | authority | 0.30 | fixed table by source type |
//! | topic alignment | 0.20 | curriculum relation to the query's topics |
//! | recency | 0.10 | `0.5^(age_days / 365)` from source creation |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tutor_curriculum::{CurriculumGraph, TopicRelation};
use tutor_types::KnowledgeChunk;

/// Half-life of the recency signal.
pub const RECENCY_HALF_LIFE_DAYS: f64 = 365.0;

/// Alignment when the chunk's topic is unknown or unrelated.
const NEUTRAL_ALIGNMENT: f32 = 0.5;

/// Weights for the quality signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    pub relevance: f32,
    pub authority: f32,
    pub topic_alignment: f32,
    pub recency: f32,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            relevance: 0.40,
            authority: 0.30,
            topic_alignment: 0.20,
            recency: 0.10,
        }
    }
}

/// Individual signals and their weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub relevance: f32,
    pub authority: f32,
    pub topic_alignment: f32,
    pub recency: f32,
    /// Weighted sum of the signals
    pub total: f32,
}

/// Computes chunk quality against the query's curriculum topics.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    weights: QualityWeights,
    graph: Option<Arc<CurriculumGraph>>,
}

impl QualityScorer {
    /// Scorer with default weights and no curriculum graph.
    ///
    /// Without a graph, alignment only distinguishes exact topic matches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: use a curriculum graph for parent/child and related alignment
    pub fn with_graph(mut self, graph: Arc<CurriculumGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Builder: override weights
    pub fn with_weights(mut self, weights: QualityWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn graph(&self) -> Option<&Arc<CurriculumGraph>> {
        self.graph.as_ref()
    }

    /// Score a chunk.
    pub fn score(
        &self,
        chunk: &KnowledgeChunk,
        query_topics: &[String],
        now: DateTime<Utc>,
    ) -> QualityBreakdown {
        let relevance = chunk.similarity.clamp(0.0, 1.0);
        let authority = chunk.source.source_type.authority();
        let topic_alignment = self.topic_alignment(chunk.topic_id.as_deref(), query_topics);
        let recency = recency_score(chunk.source.created_at, now);

        let w = &self.weights;
        let total = w.relevance * relevance
            + w.authority * authority
            + w.topic_alignment * topic_alignment
            + w.recency * recency;

        QualityBreakdown {
            relevance,
            authority,
            topic_alignment,
            recency,
            total,
        }
    }

    /// Best alignment between a chunk's topic and any of the query topics.
    pub fn topic_alignment(&self, chunk_topic: Option<&str>, query_topics: &[String]) -> f32 {
        let Some(chunk_topic) = chunk_topic else {
            return NEUTRAL_ALIGNMENT;
        };
        query_topics
            .iter()
            .map(|q| {
                let relation = match &self.graph {
                    Some(graph) => graph.relation(chunk_topic, q),
                    None if chunk_topic == q => TopicRelation::Same,
                    None => TopicRelation::Unrelated,
                };
                alignment_for(relation)
            })
            .fold(NEUTRAL_ALIGNMENT, f32::max)
    }
}

fn alignment_for(relation: TopicRelation) -> f32 {
    match relation {
        TopicRelation::Same => 1.0,
        TopicRelation::ParentChild => 0.8,
        TopicRelation::Related => 0.7,
        TopicRelation::Unrelated => NEUTRAL_ALIGNMENT,
    }
}

/// Exponential decay from creation time; future timestamps score 1.0.
pub fn recency_score(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let age_days = (now - created_at).num_seconds().max(0) as f64 / 86_400.0;
    0.5_f64.powf(age_days / RECENCY_HALF_LIFE_DAYS) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tutor_curriculum::builtin_graph;
    use tutor_types::{KnowledgeTier, SourceDescriptor, SourceType};

    fn chunk(source_type: SourceType, similarity: f32, topic: Option<&str>) -> KnowledgeChunk {
        let source = SourceDescriptor::new(source_type, "src", Utc::now());
        let chunk = KnowledgeChunk::new("c", "content", KnowledgeTier::General, source, similarity);
        match topic {
            Some(t) => chunk.with_topic(t),
            None => chunk,
        }
    }

    #[test]
    fn test_recency_half_life() {
        let now = Utc::now();
        assert!((recency_score(now, now) - 1.0).abs() < 1e-6);
        let year_ago = now - Duration::days(365);
        assert!((recency_score(year_ago, now) - 0.5).abs() < 1e-3);
        let future = now + Duration::days(10);
        assert!((recency_score(future, now) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_sum() {
        let scorer = QualityScorer::new();
        let now = Utc::now();
        let c = chunk(SourceType::Curriculum, 1.0, Some("fractions"));
        let q = scorer.score(&c, &["fractions".to_string()], now);
        assert!((q.total - 1.0).abs() < 1e-3);

        let c = chunk(SourceType::WebArticle, 0.5, None);
        let q = scorer.score(&c, &[], now);
        // 0.4*0.5 + 0.3*0.5 + 0.2*0.5 + 0.1*~1.0
        assert!((q.total - 0.55).abs() < 1e-3);
    }

    #[test]
    fn test_alignment_with_graph() {
        let scorer = QualityScorer::new().with_graph(Arc::new(builtin_graph().unwrap()));
        let query = vec!["four_operations".to_string()];
        assert_eq!(scorer.topic_alignment(Some("four_operations"), &query), 1.0);
        assert_eq!(scorer.topic_alignment(Some("number"), &query), 0.8);
        assert_eq!(scorer.topic_alignment(Some("negative_numbers"), &query), 0.7);
        assert_eq!(scorer.topic_alignment(Some("angles"), &query), 0.5);
        assert_eq!(scorer.topic_alignment(None, &query), 0.5);
    }

    #[test]
    fn test_alignment_without_graph() {
        let scorer = QualityScorer::new();
        let query = vec!["a".to_string(), "b".to_string()];
        assert_eq!(scorer.topic_alignment(Some("b"), &query), 1.0);
        assert_eq!(scorer.topic_alignment(Some("c"), &query), 0.5);
    }
}
