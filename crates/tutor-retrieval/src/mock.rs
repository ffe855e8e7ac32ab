//! In-memory collaborators for tests and offline use.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tutor_types::Persona;

use crate::error::RetrievalError;
use crate::retriever::{
    CuratedLink, KnowledgeSource, KnowledgeSourceDirectory, LinkCatalog, QueryEmbedder,
    SimilarityRow, SimilaritySearch,
};

/// Similarity search returning canned rows per namespace.
#[derive(Default)]
pub struct MockSimilaritySearch {
    /// Rows to return for each namespace
    pub rows: HashMap<String, Vec<SimilarityRow>>,
    /// Simulated delay for each namespace
    pub delays: HashMap<String, Duration>,
    /// Which namespaces fail
    pub fail_namespaces: HashSet<String>,
}

impl MockSimilaritySearch {
    /// Add rows for a namespace.
    pub fn with_rows(mut self, namespace: impl Into<String>, rows: Vec<SimilarityRow>) -> Self {
        self.rows.insert(namespace.into(), rows);
        self
    }

    /// Add delay for a namespace.
    pub fn with_delay(mut self, namespace: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(namespace.into(), delay);
        self
    }

    /// Mark a namespace as failing.
    pub fn with_failure(mut self, namespace: impl Into<String>) -> Self {
        self.fail_namespaces.insert(namespace.into());
        self
    }
}

#[async_trait]
impl SimilaritySearch for MockSimilaritySearch {
    async fn search(
        &self,
        _embedding: &[f32],
        namespace: &str,
        _subject: Option<&str>,
        _level: Option<&str>,
        count: usize,
    ) -> Result<Vec<SimilarityRow>, RetrievalError> {
        if let Some(delay) = self.delays.get(namespace) {
            tokio::time::sleep(*delay).await;
        }

        if self.fail_namespaces.contains(namespace) {
            return Err(RetrievalError::Search {
                namespace: namespace.to_string(),
                message: "mock failure".to_string(),
            });
        }

        let mut rows = self.rows.get(namespace).cloned().unwrap_or_default();
        rows.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(rows.into_iter().take(count).collect())
    }
}

/// Embedder returning a fixed vector, or failing.
pub struct MockEmbedder {
    embedding: Option<Vec<f32>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            embedding: Some(vec![0.1, 0.2, 0.3]),
        }
    }
}

impl MockEmbedder {
    /// Embedder that always fails.
    pub fn failing() -> Self {
        Self { embedding: None }
    }
}

#[async_trait]
impl QueryEmbedder for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
        self.embedding
            .clone()
            .ok_or_else(|| RetrievalError::Embedding("mock embedder unavailable".to_string()))
    }
}

/// Link catalog with canned links per namespace.
#[derive(Default)]
pub struct MockLinkCatalog {
    pub links: HashMap<String, Vec<CuratedLink>>,
    pub fail_namespaces: HashSet<String>,
}

impl MockLinkCatalog {
    /// Add links for a namespace.
    pub fn with_links(mut self, namespace: impl Into<String>, links: Vec<CuratedLink>) -> Self {
        self.links.insert(namespace.into(), links);
        self
    }

    /// Mark a namespace as failing.
    pub fn with_failure(mut self, namespace: impl Into<String>) -> Self {
        self.fail_namespaces.insert(namespace.into());
        self
    }
}

#[async_trait]
impl LinkCatalog for MockLinkCatalog {
    async fn links(&self, namespace: &str) -> Result<Vec<CuratedLink>, RetrievalError> {
        if self.fail_namespaces.contains(namespace) {
            return Err(RetrievalError::Links {
                namespace: namespace.to_string(),
                message: "mock failure".to_string(),
            });
        }
        Ok(self.links.get(namespace).cloned().unwrap_or_default())
    }
}

/// Directory returning the same sources for every caller.
#[derive(Debug, Clone, Default)]
pub struct StaticSourceDirectory {
    sources: Vec<KnowledgeSource>,
    persona_overrides: HashMap<Persona, Vec<KnowledgeSource>>,
}

impl StaticSourceDirectory {
    pub fn new(sources: Vec<KnowledgeSource>) -> Self {
        Self {
            sources,
            persona_overrides: HashMap::new(),
        }
    }

    /// Builder: sources for a specific persona
    pub fn with_persona_sources(mut self, persona: Persona, sources: Vec<KnowledgeSource>) -> Self {
        self.persona_overrides.insert(persona, sources);
        self
    }
}

#[async_trait]
impl KnowledgeSourceDirectory for StaticSourceDirectory {
    async fn get_sources(
        &self,
        user_id: &str,
        persona: Persona,
    ) -> Result<Vec<KnowledgeSource>, RetrievalError> {
        let sources = self
            .persona_overrides
            .get(&persona)
            .unwrap_or(&self.sources);
        // User-scoped sources are only visible to their owner
        Ok(sources
            .iter()
            .filter(|s| s.owner_id.as_deref().map_or(true, |owner| owner == user_id))
            .cloned()
            .collect())
    }
}
