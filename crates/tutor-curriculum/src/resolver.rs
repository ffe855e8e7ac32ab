//! Query-to-topic resolution.
//!
//! Maps free-text learner queries onto curriculum topics by keyword and
//! vocabulary matching, then assembles a [`CurriculumContext`] that grounds
//! the tutor's answer.
//!
//! Scoring per topic of the requested subject:
//! - +0.5 if the topic name appears verbatim in the lowercased query
//! - +0.2 per vocabulary term present in the query
//! - +0.1 per learning-objective keyword present in the query
//!
//! Arithmetic symbols are expanded into operation words before matching so
//! that a bare expression such as `100 - 50 × 2` still reaches the topic that
//! teaches it.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tutor_types::{extract_keywords, tokenize, ResolverSettings};

use crate::graph::{CurriculumGraph, CurriculumTopic, DifficultyBand, TopicId, TopicTier};

// Scores are accumulated in hundredths to keep threshold comparisons exact.
const NAME_POINTS: u32 = 50;
const VOCABULARY_POINTS: u32 = 20;
const OBJECTIVE_KEYWORD_POINTS: u32 = 10;

static RE_SUBTRACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d\s*[-−]\s*\d").expect("valid regex"));
static RE_ADD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d\s*\+\s*\d").expect("valid regex"));
static RE_FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d\s*/\s*\d").expect("valid regex"));
static RE_POWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d\s*\^\s*\d").expect("valid regex"));
static RE_RELATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[=<>≤≥]").expect("valid regex"));
static RE_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+[a-z]\b|\b[a-z]\b\s*[=<>]|[=<>]\s*\d*[a-z]\b").expect("valid regex"));

/// A topic that matched a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMatch {
    /// Matched topic
    pub topic_id: TopicId,

    /// Topic display name
    pub name: String,

    /// Confidence (0.0-1.0)
    pub confidence: f32,

    /// Literal names, terms and keywords that triggered the match
    pub matched_keywords: Vec<String>,
}

/// Short reference to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub id: TopicId,
    pub name: String,
}

impl From<&CurriculumTopic> for TopicSummary {
    fn from(topic: &CurriculumTopic) -> Self {
        Self {
            id: topic.id.clone(),
            name: topic.name.clone(),
        }
    }
}

/// Curriculum grounding assembled from matched topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumContext {
    /// Matches, best first
    pub matches: Vec<TopicMatch>,

    /// Deduplicated prerequisites of all matched topics
    pub prerequisites: Vec<TopicSummary>,

    /// Explicitly related topics and same-parent siblings
    pub related_topics: Vec<TopicSummary>,

    /// Difficulty of the top match
    pub suggested_difficulty: DifficultyBand,

    /// Tier of the top match, resolved against the learner's tier
    pub suggested_tier: TopicTier,

    pub learning_objectives: Vec<String>,
    pub misconceptions: Vec<String>,
    pub vocabulary: Vec<String>,
}

impl CurriculumContext {
    /// Ids of the matched topics, best first.
    pub fn topic_ids(&self) -> Vec<TopicId> {
        self.matches.iter().map(|m| m.topic_id.clone()).collect()
    }

    /// Top match.
    pub fn primary(&self) -> Option<&TopicMatch> {
        self.matches.first()
    }

    /// Render as a system prompt section.
    pub fn to_prompt_section(&self) -> String {
        let mut out = String::from("## Curriculum Context\n");

        let names: Vec<&str> = self.matches.iter().map(|m| m.name.as_str()).collect();
        out.push_str(&format!("Topics: {}\n", names.join(", ")));
        out.push_str(&format!(
            "Level: {} tier, {} difficulty\n",
            self.suggested_tier.as_str(),
            self.suggested_difficulty
        ));

        if !self.learning_objectives.is_empty() {
            out.push_str("\nLearning objectives:\n");
            for objective in &self.learning_objectives {
                out.push_str(&format!("- {}\n", objective));
            }
        }

        if !self.misconceptions.is_empty() {
            out.push_str("\nCommon misconceptions to watch for:\n");
            for misconception in &self.misconceptions {
                out.push_str(&format!("- {}\n", misconception));
            }
        }

        if !self.prerequisites.is_empty() {
            let names: Vec<&str> = self.prerequisites.iter().map(|p| p.name.as_str()).collect();
            out.push_str(&format!(
                "\nCheck prerequisite understanding: {}\n",
                names.join(", ")
            ));
        }

        if !self.vocabulary.is_empty() {
            out.push_str(&format!("\nKey vocabulary: {}\n", self.vocabulary.join(", ")));
        }

        out
    }
}

/// Resolves queries against a curriculum graph.
#[derive(Debug, Clone)]
pub struct TopicResolver {
    graph: Arc<CurriculumGraph>,
    config: ResolverSettings,
}

impl TopicResolver {
    /// Create a resolver with default settings.
    pub fn new(graph: Arc<CurriculumGraph>) -> Self {
        Self::with_config(graph, ResolverSettings::default())
    }

    /// Create a resolver with custom settings.
    pub fn with_config(graph: Arc<CurriculumGraph>, config: ResolverSettings) -> Self {
        Self { graph, config }
    }

    /// The underlying graph.
    pub fn graph(&self) -> &Arc<CurriculumGraph> {
        &self.graph
    }

    /// Score every topic of `subject` and return the best matches.
    pub fn resolve(&self, query: &str, subject: &str) -> Vec<TopicMatch> {
        let query_lower = query.to_lowercase();
        let normalized = normalize_query(&query_lower);
        let padded = format!(" {} ", tokenize(&normalized).join(" "));
        let query_tokens: HashSet<String> = tokenize(&normalized).into_iter().collect();

        let mut matches: Vec<TopicMatch> = self
            .graph
            .topics_for_subject(subject)
            .into_iter()
            .filter_map(|topic| self.score_topic(topic, &query_lower, &padded, &query_tokens))
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        matches.truncate(self.config.max_matches);

        debug!(
            query = query,
            subject = subject,
            matches = matches.len(),
            "Resolved query to topics"
        );
        matches
    }

    fn score_topic(
        &self,
        topic: &CurriculumTopic,
        query_lower: &str,
        padded_query: &str,
        query_tokens: &HashSet<String>,
    ) -> Option<TopicMatch> {
        let mut points = 0u32;
        let mut matched = Vec::new();

        let name = topic.name.to_lowercase();
        if query_lower.contains(&name) {
            points += NAME_POINTS;
            matched.push(name);
        }

        for term in &topic.vocabulary {
            let term_tokens = tokenize(term);
            if term_tokens.is_empty() {
                continue;
            }
            let phrase = format!(" {} ", term_tokens.join(" "));
            if padded_query.contains(&phrase) {
                points += VOCABULARY_POINTS;
                matched.push(term.to_lowercase());
            }
        }

        let mut seen = HashSet::new();
        for objective in &topic.learning_objectives {
            for keyword in extract_keywords(objective) {
                if seen.insert(keyword.clone()) && query_tokens.contains(&keyword) {
                    points += OBJECTIVE_KEYWORD_POINTS;
                    matched.push(keyword);
                }
            }
        }

        let confidence = (points as f32 / 100.0).min(1.0);
        if confidence <= self.config.threshold {
            return None;
        }

        let mut unique = HashSet::new();
        matched.retain(|k| unique.insert(k.clone()));

        Some(TopicMatch {
            topic_id: topic.id.clone(),
            name: topic.name.clone(),
            confidence,
            matched_keywords: matched,
        })
    }

    /// Resolve a query and assemble curriculum context.
    ///
    /// Returns `None` when no topic clears the threshold.
    pub fn build_context(
        &self,
        query: &str,
        subject: &str,
        learner_tier: Option<TopicTier>,
    ) -> Option<CurriculumContext> {
        let matches = self.resolve(query, subject);
        self.context_for_matches(matches, learner_tier)
    }

    /// Assemble curriculum context from pre-computed matches.
    pub fn context_for_matches(
        &self,
        matches: Vec<TopicMatch>,
        learner_tier: Option<TopicTier>,
    ) -> Option<CurriculumContext> {
        let topics: Vec<&CurriculumTopic> = matches
            .iter()
            .filter_map(|m| self.graph.get_topic(&m.topic_id))
            .collect();
        let top = *topics.first()?;

        let matched_ids: HashSet<&str> = topics.iter().map(|t| t.id.as_str()).collect();

        let mut prerequisites = Vec::new();
        let mut seen_prereqs = HashSet::new();
        for topic in &topics {
            for prereq in self.graph.prerequisites_of(&topic.id) {
                if seen_prereqs.insert(prereq.id.clone()) {
                    prerequisites.push(TopicSummary::from(prereq));
                }
            }
        }

        let mut related_topics = Vec::new();
        let mut seen_related = HashSet::new();
        'outer: for topic in &topics {
            let candidates = self
                .graph
                .related_to(&topic.id)
                .into_iter()
                .chain(self.graph.siblings_of(&topic.id));
            for candidate in candidates {
                if related_topics.len() >= self.config.max_related {
                    break 'outer;
                }
                if matched_ids.contains(candidate.id.as_str()) {
                    continue;
                }
                if seen_related.insert(candidate.id.clone()) {
                    related_topics.push(TopicSummary::from(candidate));
                }
            }
        }

        let suggested_tier = match top.tier {
            TopicTier::Both => match learner_tier {
                Some(TopicTier::Higher) => TopicTier::Higher,
                _ => TopicTier::Foundation,
            },
            tier => tier,
        };

        Some(CurriculumContext {
            suggested_difficulty: top.difficulty,
            suggested_tier,
            learning_objectives: dedup_strings(topics.iter().flat_map(|t| &t.learning_objectives)),
            misconceptions: dedup_strings(topics.iter().flat_map(|t| &t.misconceptions)),
            vocabulary: dedup_strings(topics.iter().flat_map(|t| &t.vocabulary)),
            prerequisites,
            related_topics,
            matches,
        })
    }
}

fn dedup_strings<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

/// Append operation words for arithmetic symbols found in a lowercased query.
pub fn normalize_query(query_lower: &str) -> String {
    let mut extra: Vec<&str> = Vec::new();
    if query_lower.contains('×') || query_lower.contains('*') {
        extra.push("multiply");
    }
    if query_lower.contains('÷') {
        extra.push("divide");
    }
    if RE_ADD.is_match(query_lower) {
        extra.push("add");
    }
    if RE_SUBTRACT.is_match(query_lower) {
        extra.push("subtract");
    }
    if RE_FRACTION.is_match(query_lower) {
        extra.push("fraction");
    }
    if RE_POWER.is_match(query_lower) {
        extra.push("power");
    }
    if query_lower.contains('%') {
        extra.push("percentage");
    }
    if query_lower.contains('√') {
        extra.push("square root");
    }
    if RE_RELATION.is_match(query_lower) && RE_VARIABLE.is_match(query_lower) {
        extra.push("equation");
    }

    if extra.is_empty() {
        query_lower.to_string()
    } else {
        format!("{} {}", query_lower, extra.join(" "))
    }
}
