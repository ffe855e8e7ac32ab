//! Curriculum grounding E2E tests.
//!
//! A learner query is resolved onto the maths curriculum, the resulting
//! context (objectives, misconceptions, retrieved knowledge) reaches the
//! completion provider, and the session records the topics covered.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{maths_graph, TestHarness};
use tutor_curriculum::{TopicResolver, TopicTier, MATHS};
use tutor_orchestrator::{MockProvider, TeachingMode};
use tutor_types::{DetectedIntent, IntentCategory, Persona};

/// Order-of-operations query resolves to four operations and flags BIDMAS.
#[test]
fn test_order_of_operations_query_resolves() {
    let resolver = TopicResolver::new(maths_graph());

    let context = resolver
        .build_context("What is 100 - 50 × 2", MATHS, None)
        .expect("Query should resolve to a topic");

    let top = &context.matches[0];
    assert_eq!(top.topic_id, "four_operations");
    assert!(top.confidence >= 0.5, "confidence was {}", top.confidence);
    assert!(!top.matched_keywords.is_empty());

    assert!(context
        .misconceptions
        .iter()
        .any(|m| m.contains("BIDMAS")));
    // Unknown learner tier on a both-tier topic defaults to foundation
    assert_eq!(context.suggested_tier, TopicTier::Foundation);

    let section = context.to_prompt_section();
    assert!(section.starts_with("## Curriculum Context"));
    assert!(section.contains("Common misconceptions to watch for:"));
}

#[test]
fn test_irrelevant_and_empty_queries_resolve_to_nothing() {
    let resolver = TopicResolver::new(maths_graph());

    assert!(resolver.build_context("", MATHS, None).is_none());
    assert!(resolver
        .build_context("what's the weather like tomorrow", MATHS, None)
        .is_none());
    // Topics from another subject are never considered
    assert!(resolver
        .build_context("What is 100 - 50 × 2", "history", None)
        .is_none());
}

#[test]
fn test_confidence_is_bounded() {
    let resolver = TopicResolver::new(maths_graph());
    let queries = [
        "simplify the fraction 12/18 using common factors and prime factors",
        "solve the quadratic equation by factorising and completing the square",
        "pythagoras theorem hypotenuse right angled triangle area perimeter",
        "mean median mode range averages",
        "ratio proportion share in a ratio",
    ];

    for query in queries {
        for m in resolver.resolve(query, MATHS) {
            assert!(
                (0.0..=1.0).contains(&m.confidence),
                "{} scored {} for '{}'",
                m.topic_id,
                m.confidence,
                query
            );
        }
        assert!(resolver.resolve(query, MATHS).len() <= 3);
    }
}

#[test]
fn test_graph_lookups() {
    let graph = maths_graph();

    assert!(graph.get_topic("no_such_topic").is_none());
    let four_ops = graph.get_topic("four_operations").unwrap();
    assert_eq!(four_ops.parent_id.as_deref(), Some("number"));

    let children: Vec<&str> = graph.children("number").iter().map(|t| t.id.as_str()).collect();
    assert!(children.contains(&"four_operations"));
    assert!(graph.top_level().iter().all(|t| t.parent_id.is_none()));

    // Search is case-insensitive over objectives as well as names
    let found: Vec<&str> = graph.search("bidmas").iter().map(|t| t.id.as_str()).collect();
    assert!(found.contains(&"four_operations"));
}

/// Full turn: curriculum and retrieved knowledge reach the provider.
#[tokio::test]
async fn test_turn_is_grounded_in_curriculum_and_knowledge() {
    let provider = Arc::new(
        MockProvider::new("primary")
            .with_response("What do you do first, the subtraction or the multiplication?")
            .with_intent(DetectedIntent::new(IntentCategory::Solve, 0.9)),
    );
    let harness = TestHarness::with_knowledge(vec![provider.clone()]);
    let session_id = harness.maths_session("learner-a", Persona::Student);

    let response = harness
        .context
        .process_message(&session_id, "What is 100 - 50 × 2")
        .await
        .unwrap();

    assert_eq!(response.metadata.topics, vec!["four_operations".to_string()]);
    assert_eq!(response.metadata.mode.as_ref().unwrap().mode, TeachingMode::Socratic);
    assert!(!response.metadata.degraded);
    // Every token in the query is short or a stop word
    assert_eq!(response.metadata.coverage, 0.0);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let context = requests[0].context.as_deref().unwrap();
    assert!(context.contains("## Curriculum Context"));
    assert!(context.contains("Working left to right instead of applying BIDMAS"));
    assert!(context.contains("multiplication comes first"));

    let session = harness.context.get_session(&session_id).unwrap();
    assert!(session.topics_covered.contains("four_operations"));
    assert_eq!(session.messages.len(), 2);
}

#[tokio::test]
async fn test_topics_accumulate_across_turns() {
    let provider = Arc::new(MockProvider::new("primary"));
    let harness = TestHarness::new(vec![provider]);
    let session_id = harness.maths_session("learner-b", Persona::Student);

    harness
        .context
        .process_message(&session_id, "What is 100 - 50 × 2")
        .await
        .unwrap();
    harness
        .context
        .process_message(&session_id, "How do I simplify a fraction like 12/18?")
        .await
        .unwrap();

    let session = harness.context.get_session(&session_id).unwrap();
    assert!(session.topics_covered.contains("four_operations"));
    assert!(session.topics_covered.contains("fractions"));
    assert_eq!(session.messages.len(), 4);
}
