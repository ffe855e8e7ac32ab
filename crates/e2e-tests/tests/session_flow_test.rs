//! Multi-turn session E2E tests: teaching mode escalation, persona policy
//! and tool calls derived from intents.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::TestHarness;
use tutor_orchestrator::prompts::REFUSAL_MESSAGE;
use tutor_orchestrator::{MockProvider, PersonaPolicy, TeachingMode, ToolCall};
use tutor_types::{DetectedIntent, IntentCategory, MessageRole, Persona};

#[tokio::test]
async fn test_struggling_learner_gets_direct_teaching() {
    let provider = Arc::new(
        MockProvider::new("primary").with_intent(DetectedIntent::new(IntentCategory::Solve, 0.9)),
    );
    let harness = TestHarness::new(vec![provider.clone()]);
    let id = harness.maths_session("learner-m", Persona::Student);

    let first = harness
        .context
        .process_message(&id, "How do I solve the equation 3x + 2 = 11?")
        .await
        .unwrap();
    let mode = first.metadata.mode.unwrap();
    assert_eq!(mode.mode, TeachingMode::Socratic);
    assert_eq!(mode.fallback, TeachingMode::Direct);
    assert_eq!(first.metadata.topics.first().map(String::as_str), Some("linear_equations"));

    let second = harness
        .context
        .process_message(&id, "I'm stuck and confused, I don't understand this")
        .await
        .unwrap();
    assert_eq!(second.metadata.mode.unwrap().mode, TeachingMode::Direct);

    // Both turns reached the provider with the full history so far
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 3);

    let session = harness.context.get_session(&id).unwrap();
    let roles: Vec<MessageRole> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant
        ]
    );
}

#[tokio::test]
async fn test_client_homework_is_refused_but_explain_is_not() {
    let provider = Arc::new(
        MockProvider::new("primary")
            .with_intent(DetectedIntent::new(IntentCategory::Homework, 0.9).with_action("complete")),
    );
    let harness = TestHarness::builder(
        vec![provider.clone()],
        None,
        Some(Arc::new(PersonaPolicy::new())),
    );

    let client = harness.maths_session("parent-1", Persona::Client);
    let refused = harness
        .context
        .process_message(&client, "Can you do my child's fractions homework?")
        .await
        .unwrap();
    assert!(refused.metadata.refused);
    assert_eq!(refused.content, REFUSAL_MESSAGE);
    assert!(refused.metadata.mode.is_none());
    assert_eq!(provider.complete_calls(), 0);

    // Same request from a student is allowed
    let student = harness.maths_session("learner-h", Persona::Student);
    let allowed = harness
        .context
        .process_message(&student, "Can you help with my fractions homework?")
        .await
        .unwrap();
    assert!(!allowed.metadata.refused);
    assert_eq!(allowed.metadata.provider_used.as_deref(), Some("primary"));
    assert_eq!(provider.complete_calls(), 1);
}

#[tokio::test]
async fn test_practice_intent_becomes_tool_call() {
    let provider = Arc::new(MockProvider::new("primary").with_intent(
        DetectedIntent::new(IntentCategory::Practice, 0.9).with_entity("count", json!(3)),
    ));
    let harness = TestHarness::new(vec![provider]);
    let id = harness.maths_session("learner-t", Persona::Student);

    let response = harness
        .context
        .process_message(&id, "Give me some practice questions on fractions")
        .await
        .unwrap();

    assert_eq!(
        response.metadata.tool_call,
        Some(ToolCall::GeneratePractice {
            topic_id: "fractions".to_string(),
            count: 3,
            difficulty: None,
        })
    );
}
