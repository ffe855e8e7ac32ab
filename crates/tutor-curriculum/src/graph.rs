//! Curriculum topic graph.
//!
//! A static taxonomy of topics with three kinds of edges:
//! - parent/child (a tree rooted at the top-level topics)
//! - prerequisites (assumed acyclic, not checked)
//! - related topics (undirected in practice, stored one way)
//!
//! All lookups are side-effect free. A missing topic is `None` or an empty
//! list, never an error.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CurriculumError;

/// Unique identifier for a topic.
pub type TopicId = String;

/// Exam tier a topic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicTier {
    Foundation,
    Higher,
    Both,
}

impl TopicTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicTier::Foundation => "foundation",
            TopicTier::Higher => "higher",
            TopicTier::Both => "both",
        }
    }
}

/// Difficulty band, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyBand {
    Foundation,
    Intermediate,
    Higher,
}

impl DifficultyBand {
    /// Easiest band.
    pub fn easiest() -> Self {
        DifficultyBand::Foundation
    }

    /// Hardest band.
    pub fn hardest() -> Self {
        DifficultyBand::Higher
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyBand::Foundation => "foundation",
            DifficultyBand::Intermediate => "intermediate",
            DifficultyBand::Higher => "higher",
        }
    }
}

impl std::fmt::Display for DifficultyBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A curriculum topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumTopic {
    /// Stable key
    pub id: TopicId,

    /// Display name
    pub name: String,

    /// Short description
    pub description: String,

    /// Parent topic; `None` for top-level topics
    #[serde(default)]
    pub parent_id: Option<TopicId>,

    /// Subject key (e.g. "maths")
    pub subject: String,

    /// Exam tier
    pub tier: TopicTier,

    /// Default difficulty band
    pub difficulty: DifficultyBand,

    /// Learning objectives in teaching order
    #[serde(default)]
    pub learning_objectives: Vec<String>,

    /// Topics that should be understood first
    #[serde(default)]
    pub prerequisites: Vec<TopicId>,

    /// Common misconceptions
    #[serde(default)]
    pub misconceptions: Vec<String>,

    /// Terms that signal this topic in a query
    #[serde(default)]
    pub vocabulary: Vec<String>,

    /// Explicitly related topics
    #[serde(default)]
    pub related_topic_ids: Vec<TopicId>,
}

impl CurriculumTopic {
    /// Whether this topic sits at the top of the tree.
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    fn matches_keyword(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self
                .vocabulary
                .iter()
                .any(|v| v.to_lowercase().contains(needle))
            || self
                .learning_objectives
                .iter()
                .any(|o| o.to_lowercase().contains(needle))
    }
}

/// How two topics relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicRelation {
    /// Same topic
    Same,
    /// One is the parent of the other
    ParentChild,
    /// One lists the other as related
    Related,
    /// No direct relation, or either topic is unknown
    Unrelated,
}

/// Immutable topic graph with lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct CurriculumGraph {
    topics: Vec<CurriculumTopic>,
    by_id: HashMap<TopicId, usize>,
    children: HashMap<TopicId, Vec<usize>>,
}

impl CurriculumGraph {
    /// Build a graph from a list of topics.
    ///
    /// Fails on duplicate ids and on parent, prerequisite or related ids that
    /// name unknown topics. Prerequisite cycles are not detected.
    pub fn from_topics(topics: Vec<CurriculumTopic>) -> Result<Self, CurriculumError> {
        let mut by_id = HashMap::with_capacity(topics.len());
        for (idx, topic) in topics.iter().enumerate() {
            if by_id.insert(topic.id.clone(), idx).is_some() {
                return Err(CurriculumError::DuplicateTopic(topic.id.clone()));
            }
        }

        let mut children: HashMap<TopicId, Vec<usize>> = HashMap::new();
        for (idx, topic) in topics.iter().enumerate() {
            let references = topic
                .parent_id
                .iter()
                .chain(topic.prerequisites.iter())
                .chain(topic.related_topic_ids.iter());
            for reference in references {
                if !by_id.contains_key(reference) {
                    return Err(CurriculumError::UnknownReference {
                        topic: topic.id.clone(),
                        reference: reference.clone(),
                    });
                }
            }
            if let Some(parent) = &topic.parent_id {
                children.entry(parent.clone()).or_default().push(idx);
            }
        }

        debug!(topics = topics.len(), "Curriculum graph built");
        Ok(Self {
            topics,
            by_id,
            children,
        })
    }

    /// Parse a JSON array of topics and build a graph.
    pub fn from_json(json: &str) -> Result<Self, CurriculumError> {
        let topics: Vec<CurriculumTopic> = serde_json::from_str(json)?;
        Self::from_topics(topics)
    }

    /// Number of topics.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether the graph has no topics.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// All topics in load order.
    pub fn topics(&self) -> &[CurriculumTopic] {
        &self.topics
    }

    /// Look up a topic by id.
    pub fn get_topic(&self, id: &str) -> Option<&CurriculumTopic> {
        self.by_id.get(id).map(|&idx| &self.topics[idx])
    }

    /// Direct children of a topic.
    pub fn children(&self, parent_id: &str) -> Vec<&CurriculumTopic> {
        self.children
            .get(parent_id)
            .map(|idxs| idxs.iter().map(|&i| &self.topics[i]).collect())
            .unwrap_or_default()
    }

    /// Topics with no parent.
    pub fn top_level(&self) -> Vec<&CurriculumTopic> {
        self.topics.iter().filter(|t| t.is_top_level()).collect()
    }

    /// Case-insensitive substring search over name, description, vocabulary
    /// and objectives.
    pub fn search(&self, keyword: &str) -> Vec<&CurriculumTopic> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.topics
            .iter()
            .filter(|t| t.matches_keyword(&needle))
            .collect()
    }

    /// Topics belonging to a subject (case-insensitive).
    pub fn topics_for_subject(&self, subject: &str) -> Vec<&CurriculumTopic> {
        let subject = subject.trim().to_lowercase();
        self.topics
            .iter()
            .filter(|t| t.subject.to_lowercase() == subject)
            .collect()
    }

    /// Prerequisite topics of a topic.
    pub fn prerequisites_of(&self, id: &str) -> Vec<&CurriculumTopic> {
        self.get_topic(id)
            .map(|t| {
                t.prerequisites
                    .iter()
                    .filter_map(|p| self.get_topic(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Explicitly related topics of a topic.
    pub fn related_to(&self, id: &str) -> Vec<&CurriculumTopic> {
        self.get_topic(id)
            .map(|t| {
                t.related_topic_ids
                    .iter()
                    .filter_map(|r| self.get_topic(r))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Topics sharing the same parent, excluding the topic itself.
    pub fn siblings_of(&self, id: &str) -> Vec<&CurriculumTopic> {
        match self.get_topic(id).and_then(|t| t.parent_id.as_deref()) {
            Some(parent) => self
                .children(parent)
                .into_iter()
                .filter(|t| t.id != id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether any topic lists `id` as a prerequisite.
    pub fn is_prerequisite_of_any(&self, id: &str) -> bool {
        self.topics
            .iter()
            .any(|t| t.prerequisites.iter().any(|p| p == id))
    }

    /// Relation between two topics.
    pub fn relation(&self, a: &str, b: &str) -> TopicRelation {
        let (Some(ta), Some(tb)) = (self.get_topic(a), self.get_topic(b)) else {
            return TopicRelation::Unrelated;
        };
        if ta.id == tb.id {
            return TopicRelation::Same;
        }
        if ta.parent_id.as_deref() == Some(tb.id.as_str())
            || tb.parent_id.as_deref() == Some(ta.id.as_str())
        {
            return TopicRelation::ParentChild;
        }
        if ta.related_topic_ids.contains(&tb.id) || tb.related_topic_ids.contains(&ta.id) {
            return TopicRelation::Related;
        }
        TopicRelation::Unrelated
    }

    /// Distinct subjects in load order.
    pub fn subjects(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.topics
            .iter()
            .map(|t| t.subject.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn topic(id: &str, parent: Option<&str>) -> CurriculumTopic {
        CurriculumTopic {
            id: id.to_string(),
            name: id.replace('_', " "),
            description: format!("About {}", id),
            parent_id: parent.map(str::to_string),
            subject: "maths".to_string(),
            tier: TopicTier::Both,
            difficulty: DifficultyBand::Intermediate,
            learning_objectives: Vec::new(),
            prerequisites: Vec::new(),
            misconceptions: Vec::new(),
            vocabulary: Vec::new(),
            related_topic_ids: Vec::new(),
        }
    }

    fn sample_graph() -> CurriculumGraph {
        let mut a = topic("algebra", None);
        a.vocabulary = vec!["Variable".to_string()];
        let mut linear = topic("linear_equations", Some("algebra"));
        linear.prerequisites = vec!["expressions".to_string()];
        linear.related_topic_ids = vec!["graphs".to_string()];
        let expressions = topic("expressions", Some("algebra"));
        let graphs = topic("graphs", None);
        CurriculumGraph::from_topics(vec![a, linear, expressions, graphs]).unwrap()
    }

    #[test]
    fn test_lookup_and_children() {
        let graph = sample_graph();
        assert_eq!(graph.len(), 4);
        assert!(graph.get_topic("linear_equations").is_some());
        assert!(graph.get_topic("calculus").is_none());

        let children: Vec<_> = graph.children("algebra").iter().map(|t| t.id.as_str()).collect();
        assert_eq!(children, vec!["linear_equations", "expressions"]);
        assert!(graph.children("graphs").is_empty());

        let top: Vec<_> = graph.top_level().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(top, vec!["algebra", "graphs"]);
    }

    #[test]
    fn test_search_case_insensitive() {
        let graph = sample_graph();
        let hits = graph.search("VARIABLE");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "algebra");
        assert!(graph.search("  ").is_empty());
    }

    #[test]
    fn test_relations() {
        let graph = sample_graph();
        assert_eq!(graph.relation("algebra", "algebra"), TopicRelation::Same);
        assert_eq!(graph.relation("algebra", "expressions"), TopicRelation::ParentChild);
        assert_eq!(graph.relation("graphs", "linear_equations"), TopicRelation::Related);
        assert_eq!(graph.relation("expressions", "graphs"), TopicRelation::Unrelated);
        assert_eq!(graph.relation("expressions", "missing"), TopicRelation::Unrelated);
    }

    #[test]
    fn test_prerequisite_lookups() {
        let graph = sample_graph();
        assert!(graph.is_prerequisite_of_any("expressions"));
        assert!(!graph.is_prerequisite_of_any("graphs"));
        let prereqs = graph.prerequisites_of("linear_equations");
        assert_eq!(prereqs[0].id, "expressions");
        let siblings = graph.siblings_of("expressions");
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].id, "linear_equations");
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let mut t = topic("orphan", Some("nowhere"));
        t.prerequisites.clear();
        let err = CurriculumGraph::from_topics(vec![t]).unwrap_err();
        assert!(matches!(err, CurriculumError::UnknownReference { .. }));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err =
            CurriculumGraph::from_topics(vec![topic("a", None), topic("a", None)]).unwrap_err();
        assert!(matches!(err, CurriculumError::DuplicateTopic(_)));
    }

    #[test]
    fn test_cycles_are_not_checked() {
        let mut a = topic("a", None);
        let mut b = topic("b", None);
        a.prerequisites = vec!["b".to_string()];
        b.prerequisites = vec!["a".to_string()];
        assert!(CurriculumGraph::from_topics(vec![a, b]).is_ok());
    }

    #[test]
    fn test_difficulty_order() {
        assert!(DifficultyBand::easiest() < DifficultyBand::Intermediate);
        assert!(DifficultyBand::Intermediate < DifficultyBand::hardest());
    }
}
