//! Knowledge retrieval across a caller's sources.
//!
//! Each source listed for the caller is queried independently:
//! - curated-link sources are scored by keyword overlap with the query
//! - every other source is a vector-similarity lookup
//!
//! Lookups run concurrently, each under its own timeout. A failing or slow
//! source is logged and contributes nothing. Hit scores are boosted by
//! source priority, merged, truncated to `top_k` and filtered by `min_score`.
//! Chunks keep the raw lookup score as their similarity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tutor_types::{
    extract_keywords, KnowledgeChunk, KnowledgeTier, Persona, RetrievalSettings, SourceDescriptor,
    SourceType,
};

use crate::error::RetrievalError;

/// Score multiplier for curated-link keyword matches.
pub const LINK_SCORE_FACTOR: f32 = 0.85;

/// Lowest (numerically highest) source priority.
pub const LOWEST_PRIORITY: u8 = 4;

/// Kind of knowledge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Curated curriculum material (vector)
    Curriculum,
    /// User-uploaded material (vector)
    UserUpload,
    /// Shared general reference (vector)
    General,
    /// Curated web links (keyword)
    CuratedLinks,
}

impl SourceKind {
    /// Tier of chunks produced by this kind of source.
    pub fn tier(&self) -> KnowledgeTier {
        match self {
            SourceKind::Curriculum => KnowledgeTier::Curriculum,
            SourceKind::UserUpload => KnowledgeTier::UserUpload,
            SourceKind::General => KnowledgeTier::General,
            SourceKind::CuratedLinks => KnowledgeTier::Web,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Curriculum => "curriculum",
            SourceKind::UserUpload => "user_upload",
            SourceKind::General => "general",
            SourceKind::CuratedLinks => "curated_links",
        }
    }

    pub fn is_vector(&self) -> bool {
        !matches!(self, SourceKind::CuratedLinks)
    }
}

/// A knowledge source available to a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub kind: SourceKind,

    /// Namespace queried in the backing store
    pub namespace: String,

    /// 1 (highest) to 4 (lowest)
    pub priority: u8,

    /// Owner for user-scoped sources
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl KnowledgeSource {
    pub fn new(kind: SourceKind, namespace: impl Into<String>, priority: u8) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            priority,
            owner_id: None,
        }
    }

    /// Builder: set owner
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Score multiplier: `1 + 0.1 * (4 - priority)`, priority clamped to 1-4.
    pub fn priority_factor(&self) -> f32 {
        let priority = self.priority.clamp(1, LOWEST_PRIORITY);
        1.0 + 0.1 * f32::from(LOWEST_PRIORITY - priority)
    }
}

/// A row returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRow {
    pub id: String,
    pub content: String,
    pub similarity: f32,

    /// Optional `title`, `author`, `url`, `created_at`, `topic_id`,
    /// `source_type` and `related_chunk_ids`
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SimilarityRow {
    pub fn new(id: impl Into<String>, content: impl Into<String>, similarity: f32) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            similarity,
            metadata: HashMap::new(),
        }
    }

    /// Builder: add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// A curated link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedLink {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CuratedLink {
    fn searchable_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.tags.join(" ")).to_lowercase()
    }
}

/// Vector-similarity lookup over a namespace.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn search(
        &self,
        embedding: &[f32],
        namespace: &str,
        subject: Option<&str>,
        level: Option<&str>,
        count: usize,
    ) -> Result<Vec<SimilarityRow>, RetrievalError>;
}

/// Text embedding for queries.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Curated link collections.
#[async_trait]
pub trait LinkCatalog: Send + Sync {
    async fn links(&self, namespace: &str) -> Result<Vec<CuratedLink>, RetrievalError>;
}

/// Lists the knowledge sources visible to a caller.
#[async_trait]
pub trait KnowledgeSourceDirectory: Send + Sync {
    async fn get_sources(
        &self,
        user_id: &str,
        persona: Persona,
    ) -> Result<Vec<KnowledgeSource>, RetrievalError>;
}

/// One retrieval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
    pub user_id: String,
    pub persona: Persona,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>, user_id: impl Into<String>, persona: Persona) -> Self {
        Self {
            query: query.into(),
            user_id: user_id.into(),
            persona,
            subject: None,
            level: None,
        }
    }

    /// Builder: set subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Builder: set level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }
}

/// A retrieved chunk with its priority-adjusted score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub chunk: KnowledgeChunk,
    pub namespace: String,
    /// Raw score times the source's priority factor; may exceed 1.0
    pub adjusted_score: f32,
}

/// Outcome of querying one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResults {
    pub namespace: String,
    pub kind: SourceKind,
    pub hits: usize,
    pub success: bool,
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

/// Retrieval result with explainability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Final hits, best first
    pub hits: Vec<RetrievalHit>,

    /// Per-source outcomes
    pub sources: Vec<SourceResults>,

    /// Why the result looks the way it does
    pub explanation: String,
}

impl RetrievalResult {
    fn empty(explanation: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            sources: Vec::new(),
            explanation: explanation.into(),
        }
    }

    pub fn has_results(&self) -> bool {
        !self.hits.is_empty()
    }

    /// Chunks in hit order.
    pub fn chunks(&self) -> Vec<KnowledgeChunk> {
        self.hits.iter().map(|h| h.chunk.clone()).collect()
    }
}

/// Fans a query out to every source visible to the caller.
pub struct KnowledgeRetriever {
    embedder: Arc<dyn QueryEmbedder>,
    search: Arc<dyn SimilaritySearch>,
    links: Arc<dyn LinkCatalog>,
    directory: Arc<dyn KnowledgeSourceDirectory>,
    settings: RetrievalSettings,
}

impl KnowledgeRetriever {
    pub fn new(
        embedder: Arc<dyn QueryEmbedder>,
        search: Arc<dyn SimilaritySearch>,
        links: Arc<dyn LinkCatalog>,
        directory: Arc<dyn KnowledgeSourceDirectory>,
    ) -> Self {
        Self {
            embedder,
            search,
            links,
            directory,
            settings: RetrievalSettings::default(),
        }
    }

    /// Builder: override settings
    pub fn with_settings(mut self, settings: RetrievalSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Retrieve knowledge for a request. Never fails: errors yield fewer hits.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> RetrievalResult {
        let sources = match self
            .directory
            .get_sources(&request.user_id, request.persona)
            .await
        {
            Ok(sources) => sources,
            Err(e) => {
                warn!(user_id = %request.user_id, error = %e, "Source listing failed");
                return RetrievalResult::empty(format!("Source listing failed: {}", e));
            }
        };
        if sources.is_empty() {
            return RetrievalResult::empty("No knowledge sources available");
        }

        let embedding = match self.embedder.embed(&request.query).await {
            Ok(embedding) if !embedding.is_empty() => embedding,
            Ok(_) => {
                warn!("Query embedding was empty");
                return RetrievalResult::empty("Query embedding unavailable");
            }
            Err(e) => {
                warn!(error = %e, "Query embedding failed");
                return RetrievalResult::empty(format!("Query embedding failed: {}", e));
            }
        };

        let timeout = Duration::from_millis(self.settings.source_timeout_ms);
        let lookups = sources.iter().map(|source| {
            let embedding = &embedding;
            async move {
                let start = Instant::now();
                let outcome =
                    tokio::time::timeout(timeout, self.query_source(source, request, embedding))
                        .await
                        .unwrap_or_else(|_| {
                            Err(RetrievalError::Timeout(self.settings.source_timeout_ms))
                        });
                (source, outcome, start.elapsed().as_millis() as u64)
            }
        });
        let outcomes = futures::future::join_all(lookups).await;

        let mut hits = Vec::new();
        let mut source_results = Vec::with_capacity(outcomes.len());
        for (source, outcome, elapsed) in outcomes {
            match outcome {
                Ok(source_hits) => {
                    debug!(
                        namespace = %source.namespace,
                        kind = source.kind.as_str(),
                        hits = source_hits.len(),
                        "Source lookup complete"
                    );
                    source_results.push(SourceResults {
                        namespace: source.namespace.clone(),
                        kind: source.kind,
                        hits: source_hits.len(),
                        success: true,
                        error: None,
                        execution_time_ms: elapsed,
                    });
                    hits.extend(source_hits);
                }
                Err(e) => {
                    warn!(namespace = %source.namespace, error = %e, "Source lookup failed");
                    source_results.push(SourceResults {
                        namespace: source.namespace.clone(),
                        kind: source.kind,
                        hits: 0,
                        success: false,
                        error: Some(e.to_string()),
                        execution_time_ms: elapsed,
                    });
                }
            }
        }

        let total = hits.len();
        let hits = merge_hits(hits, self.settings.top_k, self.settings.min_score);
        let failed = source_results.iter().filter(|s| !s.success).count();
        let explanation = format!(
            "{} of {} candidates kept from {} sources ({} failed)",
            hits.len(),
            total,
            source_results.len(),
            failed
        );

        RetrievalResult {
            hits,
            sources: source_results,
            explanation,
        }
    }

    async fn query_source(
        &self,
        source: &KnowledgeSource,
        request: &RetrievalRequest,
        embedding: &[f32],
    ) -> Result<Vec<RetrievalHit>, RetrievalError> {
        let factor = source.priority_factor();
        if source.kind.is_vector() {
            let rows = self
                .search
                .search(
                    embedding,
                    &source.namespace,
                    request.subject.as_deref(),
                    request.level.as_deref(),
                    self.settings.per_source_limit,
                )
                .await?;
            Ok(rows
                .into_iter()
                .map(|row| {
                    let adjusted = row.similarity * factor;
                    RetrievalHit {
                        chunk: row_to_chunk(row, source),
                        namespace: source.namespace.clone(),
                        adjusted_score: adjusted,
                    }
                })
                .collect())
        } else {
            let links = self.links.links(&source.namespace).await?;
            let keywords = extract_keywords(&request.query);
            Ok(links
                .into_iter()
                .filter_map(|link| {
                    let overlap = keyword_overlap(&keywords, &link.searchable_text());
                    if overlap <= 0.0 {
                        return None;
                    }
                    let raw = overlap * LINK_SCORE_FACTOR;
                    let adjusted = raw * factor;
                    Some(RetrievalHit {
                        chunk: link_to_chunk(link, raw),
                        namespace: source.namespace.clone(),
                        adjusted_score: adjusted,
                    })
                })
                .collect())
        }
    }
}

/// Fraction of query keywords present in `text` (already lowercased).
pub fn keyword_overlap(keywords: &[String], text: &str) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let matched = keywords.iter().filter(|k| text.contains(k.as_str())).count();
    matched as f32 / keywords.len() as f32
}

/// Sort by adjusted score, truncate to `top_k`, then drop hits below `min_score`.
pub fn merge_hits(mut hits: Vec<RetrievalHit>, top_k: usize, min_score: f32) -> Vec<RetrievalHit> {
    hits.sort_by(|a, b| {
        b.adjusted_score
            .partial_cmp(&a.adjusted_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    hits.truncate(top_k);
    hits.retain(|h| h.adjusted_score >= min_score);
    hits
}

/// Chunk similarity stays the raw lookup score; the priority boost lives on
/// [`RetrievalHit::adjusted_score`] only.
fn row_to_chunk(row: SimilarityRow, source: &KnowledgeSource) -> KnowledgeChunk {
    let tier = source.kind.tier();
    let source_type = row
        .meta_str("source_type")
        .and_then(SourceType::parse)
        .unwrap_or_else(|| SourceType::for_tier(tier));
    let name = row
        .meta_str("title")
        .unwrap_or(source.namespace.as_str())
        .to_string();
    let created_at = row
        .meta_str("created_at")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let mut descriptor = SourceDescriptor::new(source_type, name, created_at);
    if let Some(author) = row.meta_str("author") {
        descriptor = descriptor.with_author(author);
    }
    if let Some(url) = row.meta_str("url") {
        descriptor = descriptor.with_url(url);
    }

    let topic_id = row.meta_str("topic_id").map(str::to_string);
    let related: Vec<String> = row
        .metadata
        .get("related_chunk_ids")
        .and_then(|v| v.as_array())
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let mut chunk = KnowledgeChunk::new(row.id, row.content, tier, descriptor, row.similarity)
        .with_related(related);
    chunk.topic_id = topic_id;
    chunk
}

fn link_to_chunk(link: CuratedLink, similarity: f32) -> KnowledgeChunk {
    let descriptor = SourceDescriptor::new(SourceType::WebArticle, &link.title, link.created_at)
        .with_url(&link.url);
    let content = if link.description.is_empty() {
        link.title.clone()
    } else {
        format!("{}: {}", link.title, link.description)
    };
    let mut chunk = KnowledgeChunk::new(link.id, content, KnowledgeTier::Web, descriptor, similarity);
    chunk.topic_id = link.topic_id;
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEmbedder, MockLinkCatalog, MockSimilaritySearch, StaticSourceDirectory};
    use crate::quality::QualityScorer;
    use crate::ranking::RankingEngine;

    fn link(id: &str, title: &str, description: &str) -> CuratedLink {
        CuratedLink {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://example.org/{}", id),
            description: description.to_string(),
            tags: Vec::new(),
            topic_id: None,
            created_at: Utc::now(),
        }
    }

    fn retriever(
        search: MockSimilaritySearch,
        links: MockLinkCatalog,
        sources: Vec<KnowledgeSource>,
    ) -> KnowledgeRetriever {
        KnowledgeRetriever::new(
            Arc::new(MockEmbedder::default()),
            Arc::new(search),
            Arc::new(links),
            Arc::new(StaticSourceDirectory::new(sources)),
        )
    }

    #[test]
    fn test_priority_factor() {
        assert!((KnowledgeSource::new(SourceKind::General, "g", 1).priority_factor() - 1.3).abs() < 1e-6);
        assert!((KnowledgeSource::new(SourceKind::General, "g", 4).priority_factor() - 1.0).abs() < 1e-6);
        // Out-of-range priorities are clamped
        assert!((KnowledgeSource::new(SourceKind::General, "g", 9).priority_factor() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_keyword_overlap() {
        let keywords = vec!["fractions".to_string(), "decimals".to_string()];
        assert_eq!(keyword_overlap(&keywords, "converting fractions"), 0.5);
        assert_eq!(keyword_overlap(&[], "anything"), 0.0);
    }

    #[test]
    fn test_merge_truncates_before_filtering() {
        let make = |id: &str, score: f32| {
            let source = SourceDescriptor::new(SourceType::WebArticle, "x", Utc::now());
            RetrievalHit {
                chunk: KnowledgeChunk::new(id, "c", KnowledgeTier::Web, source, score),
                namespace: "ns".to_string(),
                adjusted_score: score,
            }
        };
        let hits = vec![make("a", 0.9), make("b", 0.4), make("c", 1.2), make("d", 0.6)];
        let merged = merge_hits(hits, 3, 0.5);
        let ids: Vec<&str> = merged.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "d"]);
        // Chunk similarity is clamped even when the adjusted score is not
        assert_eq!(merged[0].chunk.similarity, 1.0);
    }

    #[tokio::test]
    async fn test_vector_and_link_sources() {
        let search = MockSimilaritySearch::default().with_rows(
            "maths-core",
            vec![
                SimilarityRow::new("v1", "Order of operations explained", 0.8)
                    .with_metadata("title", serde_json::json!("BIDMAS guide"))
                    .with_metadata("topic_id", serde_json::json!("four_operations")),
                SimilarityRow::new("v2", "Barely relevant", 0.3),
            ],
        );
        let links = MockLinkCatalog::default().with_links(
            "links",
            vec![
                link("l1", "Order of operations", "BIDMAS practice"),
                link("l2", "Volcanoes", "Geography"),
            ],
        );
        let sources = vec![
            KnowledgeSource::new(SourceKind::Curriculum, "maths-core", 1),
            KnowledgeSource::new(SourceKind::CuratedLinks, "links", 4),
        ];

        let request = RetrievalRequest::new("order of operations", "u1", Persona::Student);
        let result = retriever(search, links, sources).retrieve(&request).await;

        let ids: Vec<&str> = result.hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "l1"]);

        let v1 = &result.hits[0];
        assert!((v1.adjusted_score - 0.8 * 1.3).abs() < 1e-5);
        assert!((v1.chunk.similarity - 0.8).abs() < 1e-6);
        assert_eq!(v1.chunk.tier, KnowledgeTier::Curriculum);
        assert_eq!(v1.chunk.topic_id.as_deref(), Some("four_operations"));
        assert_eq!(v1.chunk.source.name, "BIDMAS guide");

        let l1 = &result.hits[1];
        assert!((l1.adjusted_score - 0.85).abs() < 1e-5);
        assert!((l1.chunk.similarity - 0.85).abs() < 1e-6);
        assert_eq!(l1.chunk.tier, KnowledgeTier::Web);
        assert_eq!(l1.chunk.source.url.as_deref(), Some("https://example.org/l1"));
        assert_eq!(result.sources.len(), 2);
        assert!(result.sources.iter().all(|s| s.success));
    }

    #[tokio::test]
    async fn test_priority_boost_keeps_raw_similarity_order() {
        let search = MockSimilaritySearch::default().with_rows(
            "reference",
            vec![
                SimilarityRow::new("a-weak", "Ratios compare quantities", 0.80),
                SimilarityRow::new("b-strong", "Ratios compare two quantities by division", 0.95),
            ],
        );
        let sources = vec![KnowledgeSource::new(SourceKind::General, "reference", 1)];
        let request = RetrievalRequest::new("ratio", "u1", Persona::Student);
        let result = retriever(search, MockLinkCatalog::default(), sources)
            .retrieve(&request)
            .await;

        let ids: Vec<&str> = result.hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["b-strong", "a-weak"]);
        // Boosted past 1.0 on the hit, raw on the chunk
        assert!(result.hits.iter().all(|h| h.adjusted_score > 1.0));
        assert!((result.hits[0].chunk.similarity - 0.95).abs() < 1e-6);
        assert!((result.hits[1].chunk.similarity - 0.80).abs() < 1e-6);

        let ranked = RankingEngine::new(QualityScorer::new()).rank(&result.chunks(), &[], 10, Utc::now());
        let ranked_ids: Vec<&str> = ranked.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ranked_ids, vec!["b-strong", "a-weak"]);
        assert!(ranked[0].weighted_quality > ranked[1].weighted_quality);
    }

    #[tokio::test]
    async fn test_failing_source_contributes_nothing() {
        let search = MockSimilaritySearch::default()
            .with_rows("good", vec![SimilarityRow::new("g1", "content", 0.9)])
            .with_failure("bad");
        let sources = vec![
            KnowledgeSource::new(SourceKind::General, "good", 2),
            KnowledgeSource::new(SourceKind::General, "bad", 1),
        ];
        let request = RetrievalRequest::new("anything", "u1", Persona::Tutor);
        let result = retriever(search, MockLinkCatalog::default(), sources)
            .retrieve(&request)
            .await;

        assert_eq!(result.hits.len(), 1);
        let bad = result.sources.iter().find(|s| s.namespace == "bad").unwrap();
        assert!(!bad.success);
        assert!(bad.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_times_out() {
        let search = MockSimilaritySearch::default()
            .with_rows("slow", vec![SimilarityRow::new("s1", "content", 0.9)])
            .with_delay("slow", Duration::from_secs(30))
            .with_rows("fast", vec![SimilarityRow::new("f1", "content", 0.9)]);
        let sources = vec![
            KnowledgeSource::new(SourceKind::General, "slow", 1),
            KnowledgeSource::new(SourceKind::General, "fast", 1),
        ];
        let request = RetrievalRequest::new("anything", "u1", Persona::Student);
        let result = retriever(search, MockLinkCatalog::default(), sources)
            .retrieve(&request)
            .await;

        let ids: Vec<&str> = result.hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["f1"]);
        let slow = result.sources.iter().find(|s| s.namespace == "slow").unwrap();
        assert!(slow.error.as_deref().unwrap_or_default().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_embedding_failure_returns_empty() {
        let search = MockSimilaritySearch::default()
            .with_rows("ns", vec![SimilarityRow::new("a", "content", 0.9)]);
        let retriever = KnowledgeRetriever::new(
            Arc::new(MockEmbedder::failing()),
            Arc::new(search),
            Arc::new(MockLinkCatalog::default()),
            Arc::new(StaticSourceDirectory::new(vec![KnowledgeSource::new(
                SourceKind::General,
                "ns",
                1,
            )])),
        );
        let request = RetrievalRequest::new("anything", "u1", Persona::Student);
        let result = retriever.retrieve(&request).await;
        assert!(!result.has_results());
        assert!(result.explanation.contains("embedding"));
    }
}
