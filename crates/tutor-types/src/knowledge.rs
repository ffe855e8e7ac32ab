//! Knowledge types shared by the retriever and the ranking engine.
//!
//! - `KnowledgeTier`: the category of a knowledge source (curriculum, user upload, general, web)
//! - `SourceType`: the concrete kind of source, used for authority scoring
//! - `KnowledgeChunk`: a transient retrieved piece of content with its raw similarity
//! - `RetrievalStrategy`: per-tier limits, similarity floor and weight

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Knowledge source category.
///
/// The declaration order is also the presentation order used when
/// synthesizing context for a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeTier {
    /// Curated curriculum material
    Curriculum,
    /// Material uploaded by the learner or their tutor
    UserUpload,
    /// Shared general reference material
    General,
    /// Curated web links and articles
    Web,
}

impl KnowledgeTier {
    /// All tiers in presentation order.
    pub fn all() -> &'static [KnowledgeTier] {
        &[
            KnowledgeTier::Curriculum,
            KnowledgeTier::UserUpload,
            KnowledgeTier::General,
            KnowledgeTier::Web,
        ]
    }

    /// Returns the display name for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeTier::Curriculum => "curriculum",
            KnowledgeTier::UserUpload => "user_upload",
            KnowledgeTier::General => "general",
            KnowledgeTier::Web => "web",
        }
    }

    /// Heading used for this tier in synthesized context.
    pub fn heading(&self) -> &'static str {
        match self {
            KnowledgeTier::Curriculum => "Curriculum Knowledge",
            KnowledgeTier::UserUpload => "Your Materials",
            KnowledgeTier::General => "General Reference",
            KnowledgeTier::Web => "Web Resources",
        }
    }
}

impl std::fmt::Display for KnowledgeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Concrete kind of knowledge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Curated curriculum material
    Curriculum,
    /// Published textbook
    Textbook,
    /// Notes written by a tutor
    TeacherNotes,
    /// Arbitrary file uploaded by a user
    UserUpload,
    /// General reference material
    GeneralReference,
    /// Web article or curated link
    WebArticle,
}

impl SourceType {
    /// Fixed authority score for this source type (0.0-1.0).
    pub fn authority(&self) -> f32 {
        match self {
            SourceType::Curriculum => 1.0,
            SourceType::Textbook => 0.9,
            SourceType::TeacherNotes => 0.85,
            SourceType::UserUpload => 0.75,
            SourceType::GeneralReference => 0.7,
            SourceType::WebArticle => 0.5,
        }
    }

    /// Returns the display name for this source type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Curriculum => "curriculum",
            SourceType::Textbook => "textbook",
            SourceType::TeacherNotes => "teacher_notes",
            SourceType::UserUpload => "user_upload",
            SourceType::GeneralReference => "general_reference",
            SourceType::WebArticle => "web_article",
        }
    }

    /// Parse from a display name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "curriculum" => Some(SourceType::Curriculum),
            "textbook" => Some(SourceType::Textbook),
            "teacher_notes" => Some(SourceType::TeacherNotes),
            "user_upload" => Some(SourceType::UserUpload),
            "general_reference" => Some(SourceType::GeneralReference),
            "web_article" => Some(SourceType::WebArticle),
            _ => None,
        }
    }

    /// Default source type for chunks coming from a tier.
    pub fn for_tier(tier: KnowledgeTier) -> Self {
        match tier {
            KnowledgeTier::Curriculum => SourceType::Curriculum,
            KnowledgeTier::UserUpload => SourceType::UserUpload,
            KnowledgeTier::General => SourceType::GeneralReference,
            KnowledgeTier::Web => SourceType::WebArticle,
        }
    }
}

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Kind of source
    pub source_type: SourceType,

    /// Human-readable source name (document title, link title)
    pub name: String,

    /// Optional author
    #[serde(default)]
    pub author: Option<String>,

    /// Optional URL
    #[serde(default)]
    pub url: Option<String>,

    /// When the source was created
    pub created_at: DateTime<Utc>,
}

impl SourceDescriptor {
    /// Create a descriptor with no author or URL.
    pub fn new(source_type: SourceType, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            source_type,
            name: name.into(),
            author: None,
            url: None,
            created_at,
        }
    }

    /// Builder: set author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Builder: set URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// One-line attribution, e.g. `Source: Algebra Basics by J. Smith (https://...)`.
    pub fn attribution(&self) -> String {
        let mut line = format!("Source: {}", self.name);
        if let Some(author) = &self.author {
            line.push_str(&format!(" by {}", author));
        }
        if let Some(url) = &self.url {
            line.push_str(&format!(" ({})", url));
        }
        line
    }
}

/// A piece of retrieved knowledge.
///
/// Chunks are created per search call and are not mutated once scored;
/// quality lives on the ranking engine's output, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Chunk identifier
    pub id: String,

    /// Text content
    pub content: String,

    /// Tier of the source this chunk came from
    pub tier: KnowledgeTier,

    /// Source attribution
    pub source: SourceDescriptor,

    /// Linked curriculum topic, if known
    #[serde(default)]
    pub topic_id: Option<String>,

    /// Raw similarity from the source lookup (0.0-1.0)
    pub similarity: f32,

    /// Chunks that can be pulled in for context expansion
    #[serde(default)]
    pub related_chunk_ids: Vec<String>,
}

impl KnowledgeChunk {
    /// Create a chunk with no topic link and no related chunks.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        tier: KnowledgeTier,
        source: SourceDescriptor,
        similarity: f32,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            tier,
            source,
            topic_id: None,
            similarity: similarity.clamp(0.0, 1.0),
            related_chunk_ids: Vec::new(),
        }
    }

    /// Builder: link to a curriculum topic
    pub fn with_topic(mut self, topic_id: impl Into<String>) -> Self {
        self.topic_id = Some(topic_id.into());
        self
    }

    /// Builder: set related chunk ids
    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related_chunk_ids = related;
        self
    }

    /// Rough token estimate (content length / 4).
    pub fn estimated_tokens(&self) -> usize {
        self.content.len() / 4
    }
}

/// Per-tier retrieval policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalStrategy {
    /// Tier this strategy applies to
    pub tier: KnowledgeTier,

    /// Maximum chunks taken from this tier
    pub max_chunks: usize,

    /// Minimum raw similarity for a chunk to be considered
    pub min_similarity: f32,

    /// Multiplier applied to quality (0.0-1.0)
    pub weight: f32,
}

impl RetrievalStrategy {
    /// Create a strategy, clamping weight and similarity floor to 0.0-1.0.
    pub fn new(tier: KnowledgeTier, max_chunks: usize, min_similarity: f32, weight: f32) -> Self {
        Self {
            tier,
            max_chunks,
            min_similarity: min_similarity.clamp(0.0, 1.0),
            weight: weight.clamp(0.0, 1.0),
        }
    }

    /// The default ordered strategy list.
    pub fn default_strategies() -> Vec<RetrievalStrategy> {
        vec![
            RetrievalStrategy::new(KnowledgeTier::Curriculum, 5, 0.70, 1.0),
            RetrievalStrategy::new(KnowledgeTier::UserUpload, 4, 0.65, 0.9),
            RetrievalStrategy::new(KnowledgeTier::General, 3, 0.60, 0.7),
            RetrievalStrategy::new(KnowledgeTier::Web, 2, 0.55, 0.5),
        ]
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.weight) {
            return Err(format!("weight must be 0.0-1.0, got {}", self.weight));
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(format!(
                "min_similarity must be 0.0-1.0, got {}",
                self.min_similarity
            ));
        }
        Ok(())
    }
}
