//! End-to-end test infrastructure for the tutoring core.
//!
//! Provides a shared [`TestHarness`] and fixture builders for tests that
//! cross crate boundaries: curriculum resolution into a tutoring turn,
//! knowledge retrieval into ranking, and practice outcomes into gap
//! detection.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use tutor_curriculum::{builtin_graph, CurriculumGraph};
use tutor_orchestrator::{
    Authorizer, CompletionProvider, MockProvider, ProviderChain, SessionStart, TutorContext,
};
use tutor_retrieval::{
    CuratedLink, KnowledgeRetriever, KnowledgeSource, MockEmbedder, MockLinkCatalog,
    MockSimilaritySearch, SimilarityRow, SourceKind, StaticSourceDirectory,
};
use tutor_scheduler::{PracticeOutcome, PracticeScheduler};
use tutor_types::{KnowledgeChunk, KnowledgeTier, Persona, SourceDescriptor, SourceType};

/// Namespace of the curriculum vector source.
pub const CURRICULUM_NS: &str = "maths-curriculum";

/// Namespace of the general-reference vector source.
pub const GENERAL_NS: &str = "general-reference";

/// Namespace of the curated link collection.
pub const LINKS_NS: &str = "curated-links";

/// Shared test harness: a tutoring context wired to mock collaborators.
pub struct TestHarness {
    pub graph: Arc<CurriculumGraph>,
    pub context: TutorContext,
}

impl TestHarness {
    /// Harness over the built-in maths curriculum with the given providers
    /// and no knowledge retrieval.
    pub fn new(providers: Vec<Arc<MockProvider>>) -> Self {
        Self::builder(providers, None, None)
    }

    /// Harness that also retrieves from [`bidmas_retriever`].
    pub fn with_knowledge(providers: Vec<Arc<MockProvider>>) -> Self {
        Self::builder(providers, Some(bidmas_retriever()), None)
    }

    pub fn builder(
        providers: Vec<Arc<MockProvider>>,
        retriever: Option<KnowledgeRetriever>,
        authorizer: Option<Arc<dyn Authorizer>>,
    ) -> Self {
        let graph = maths_graph();
        let mut builder = TutorContext::builder()
            .with_providers(provider_chain(providers, Duration::from_secs(20)))
            .with_curriculum(graph.clone());
        if let Some(retriever) = retriever {
            builder = builder.with_retriever(retriever);
        }
        if let Some(authorizer) = authorizer {
            builder = builder.with_authorizer(authorizer);
        }
        Self {
            graph,
            context: builder.build(),
        }
    }

    /// Start a maths session and return its id.
    pub fn maths_session(&self, user_id: &str, persona: Persona) -> String {
        self.context
            .start_session(SessionStart::new(user_id, persona).with_subject("maths"))
            .session_id
    }
}

/// The built-in maths curriculum.
pub fn maths_graph() -> Arc<CurriculumGraph> {
    Arc::new(builtin_graph().expect("Built-in curriculum should load"))
}

/// Provider chain over mock providers, in order.
pub fn provider_chain(providers: Vec<Arc<MockProvider>>, call_timeout: Duration) -> ProviderChain {
    ProviderChain::new(
        providers
            .into_iter()
            .map(|p| p as Arc<dyn CompletionProvider>)
            .collect(),
        call_timeout,
    )
}

/// Curated link with no tags or topic.
pub fn link(id: &str, title: &str, description: &str, created_at: DateTime<Utc>) -> CuratedLink {
    CuratedLink {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://example.org/{}", id),
        description: description.to_string(),
        tags: Vec::new(),
        topic_id: None,
        created_at,
    }
}

/// Retriever whose curriculum source knows about order of operations.
pub fn bidmas_retriever() -> KnowledgeRetriever {
    let search = MockSimilaritySearch::default().with_rows(
        CURRICULUM_NS,
        vec![
            SimilarityRow::new(
                "bidmas-1",
                "BIDMAS sets the order: brackets, indices, division and multiplication, then addition and subtraction. In 100 - 50 × 2 the multiplication comes first.",
                0.92,
            )
            .with_metadata("topic_id", serde_json::json!("four_operations")),
            SimilarityRow::new("bidmas-2", "Multiplication before subtraction gives 100 - 100 = 0.", 0.81)
                .with_metadata("topic_id", serde_json::json!("four_operations")),
        ],
    );
    let directory = StaticSourceDirectory::new(vec![KnowledgeSource::new(
        SourceKind::Curriculum,
        CURRICULUM_NS,
        1,
    )]);

    KnowledgeRetriever::new(
        Arc::new(MockEmbedder::default()),
        Arc::new(search),
        Arc::new(MockLinkCatalog::default()),
        Arc::new(directory),
    )
}

/// Chunk with a tier-default source, created now.
pub fn chunk(id: &str, content: &str, tier: KnowledgeTier, similarity: f32) -> KnowledgeChunk {
    let source = SourceDescriptor::new(SourceType::for_tier(tier), id, Utc::now());
    KnowledgeChunk::new(id, content, tier, source, similarity)
}

/// Record a series of right/wrong answers for one topic, in order.
pub async fn record_results(scheduler: &PracticeScheduler, student: &str, topic: &str, results: &[bool]) {
    for correct in results {
        scheduler
            .record_outcome(&PracticeOutcome::new(student, topic, *correct))
            .await
            .expect("Outcome should apply");
    }
}
