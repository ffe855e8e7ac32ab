//! Graceful degradation E2E tests.
//!
//! A tutoring turn must never hard-fail: when providers are unavailable,
//! failing or slow, when retrieval breaks, or when intent output is
//! malformed, the learner still gets a persona-appropriate reply.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use e2e_tests::{maths_graph, provider_chain, TestHarness, CURRICULUM_NS};
use tutor_orchestrator::prompts::{default_suggestions, fallback_response};
use tutor_orchestrator::{IntentSource, MockProvider, ProviderError, SessionStart, TutorContext};
use tutor_retrieval::{
    KnowledgeRetriever, KnowledgeSource, MockEmbedder, MockLinkCatalog, MockSimilaritySearch,
    SourceKind, StaticSourceDirectory,
};
use tutor_types::{IntentCategory, Persona, TutorError};

/// Every configured provider reports unavailable; each persona still gets
/// its static reply.
#[tokio::test]
async fn test_all_providers_unavailable() {
    for persona in [Persona::Student, Persona::Tutor, Persona::Client, Persona::Agent] {
        let anthropic = Arc::new(MockProvider::new("anthropic").unavailable());
        let openai = Arc::new(MockProvider::new("openai").unavailable());
        let harness = TestHarness::new(vec![anthropic.clone(), openai.clone()]);
        let session_id = harness.maths_session("user-b", persona);

        let response = harness
            .context
            .process_message(&session_id, "Can you explain what a ratio is?")
            .await
            .expect("A turn must not fail when providers are down");

        assert!(!response.content.is_empty());
        assert_eq!(response.content, fallback_response(persona));
        assert_eq!(response.suggestions, default_suggestions(persona));
        assert!(response.metadata.degraded);
        assert!(response.metadata.providers_attempted.is_empty());
        assert_eq!(response.metadata.intent_source, IntentSource::Local);

        // Unavailable providers are never called
        assert_eq!(anthropic.complete_calls() + openai.complete_calls(), 0);
        assert_eq!(anthropic.intent_calls() + openai.intent_calls(), 0);
    }
}

#[tokio::test]
async fn test_failing_providers_and_retrieval() {
    let primary = Arc::new(MockProvider::new("primary").with_failure(ProviderError::Api("502".into())));
    let backup = Arc::new(MockProvider::new("backup").with_failure(ProviderError::RateLimited));

    let retriever = KnowledgeRetriever::new(
        Arc::new(MockEmbedder::failing()),
        Arc::new(MockSimilaritySearch::default()),
        Arc::new(MockLinkCatalog::default()),
        Arc::new(StaticSourceDirectory::new(vec![KnowledgeSource::new(
            SourceKind::Curriculum,
            CURRICULUM_NS,
            1,
        )])),
    );
    let harness = TestHarness::builder(vec![primary, backup], Some(retriever), None);
    let session_id = harness.maths_session("learner-b", Persona::Student);

    let response = harness
        .context
        .process_message(&session_id, "How do I add fractions with different denominators?")
        .await
        .unwrap();

    assert!(response.metadata.degraded);
    assert_eq!(response.metadata.providers_attempted, vec!["primary", "backup"]);
    assert_eq!(response.metadata.coverage, 0.0);
    // Curriculum grounding still works without retrieval
    assert_eq!(response.metadata.topics[0], "fractions");

    let session = harness.context.get_session(&session_id).unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[1].content, fallback_response(Persona::Student));
}

/// Intent output that is not JSON falls back to the local detector.
#[tokio::test]
async fn test_malformed_intent_output() {
    let primary = Arc::new(MockProvider::new("primary").with_response("Sure! Happy to help."));
    let harness = TestHarness::new(vec![primary.clone()]);
    let session_id = harness.maths_session("learner-c", Persona::Student);

    let response = harness
        .context
        .process_message(&session_id, "hmm okay then")
        .await
        .unwrap();

    assert_eq!(primary.intent_calls(), 1);
    assert_eq!(response.metadata.intent_source, IntentSource::Local);
    assert_eq!(response.metadata.intent.category, IntentCategory::General);
    assert!(response.metadata.intent.confidence <= 0.3);
    assert_eq!(response.content, "Sure! Happy to help.");
}

/// A hung primary is abandoned after the call timeout.
#[tokio::test(start_paused = true)]
async fn test_slow_primary_times_out() {
    let slow = Arc::new(
        MockProvider::new("slow")
            .with_response("too late")
            .with_delay(Duration::from_secs(120)),
    );
    let backup = Arc::new(MockProvider::new("backup").with_response("backup answer"));

    let context = TutorContext::builder()
        .with_providers(provider_chain(vec![slow.clone(), backup], Duration::from_secs(5)))
        .with_curriculum(maths_graph())
        .build();
    let session_id = context
        .start_session(SessionStart::new("learner-d", Persona::Student).with_subject("maths"))
        .session_id;

    let response = context
        .process_message(&session_id, "Explain what a prime number is")
        .await
        .unwrap();

    assert_eq!(response.content, "backup answer");
    assert_eq!(response.metadata.provider_used.as_deref(), Some("backup"));
    assert_eq!(response.metadata.providers_attempted, vec!["slow", "backup"]);
    assert_eq!(response.metadata.intent_source, IntentSource::Local);
    assert!(!response.metadata.degraded);
}

/// With no providers configured the context answers offline.
#[tokio::test]
async fn test_offline_default_chain() {
    let context = TutorContext::builder().with_curriculum(maths_graph()).build();
    assert_eq!(context.providers().names(), vec!["offline"]);

    let session_id = context
        .start_session(SessionStart::new("learner-e", Persona::Student).with_subject("maths"))
        .session_id;
    let response = context
        .process_message(&session_id, "What is 100 - 50 × 2")
        .await
        .unwrap();

    assert_eq!(response.metadata.provider_used.as_deref(), Some("offline"));
    assert!(!response.metadata.degraded);
    assert!(response.content.contains("Four operations"));
    assert!(response.content.contains("BIDMAS"));
}

#[tokio::test]
async fn test_unknown_session_is_an_error() {
    let harness = TestHarness::new(vec![]);
    let result = harness.context.process_message("01NOSUCHSESSION", "hello").await;
    assert!(matches!(result, Err(TutorError::SessionNotFound(_))));
}
