//! Per-message turn handling.
//!
//! [`TutorContext`] owns the session registry and every collaborator a turn
//! needs. The host creates one, shares it behind an `Arc`, and calls
//! [`TutorContext::process_message`] for each inbound message.
//!
//! A turn never fails except when the session is unknown, ended or expired.
//! Provider failures fall back down the chain and finally to a static reply;
//! retrieval failures just mean less context.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use tutor_curriculum::{CurriculumContext, CurriculumGraph, TopicResolver, TopicTier};
use tutor_retrieval::{KnowledgeRetriever, QualityScorer, RankingEngine, RetrievalRequest};
use tutor_types::{
    ChatMessage, DetectedIntent, MessageRole, RankingSettings, ResolverSettings, Settings,
    TutorError,
};

use crate::authorization::{AllowAll, AuthContext, Authorizer};
use crate::fallback::{IntentSource, ProviderChain};
use crate::mode::{estimate_struggle, select_mode, ModeContext, ModeRecommendation};
use crate::prompts::{default_suggestions, fallback_response, system_prompt, REFUSAL_MESSAGE};
use crate::provider::{CompletionProvider, CompletionRequest, OfflineProvider};
use crate::session::{Session, SessionRegistry, SessionStart};
use crate::tools::{ToolCall, ToolResult};

/// Recent learner messages considered when estimating struggle.
const STRUGGLE_WINDOW: usize = 3;

/// Turn diagnostics returned alongside the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Provider that produced the reply; `None` for refusals and static replies
    pub provider_used: Option<String>,
    /// Providers called for the reply, in order
    pub providers_attempted: Vec<String>,
    pub intent: DetectedIntent,
    pub intent_source: IntentSource,
    /// Absent when the turn was refused
    pub mode: Option<ModeRecommendation>,
    /// Fraction of query keywords found in retrieved knowledge
    pub coverage: f32,
    /// Curriculum topic ids resolved for the message
    pub topics: Vec<String>,
    /// Every provider failed and a static reply was used
    pub degraded: bool,
    /// Authorization denied the operation
    pub refused: bool,
    #[serde(default)]
    pub tool_call: Option<ToolCall>,
}

/// Reply to one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorResponse {
    pub session_id: String,
    pub content: String,
    pub suggestions: Vec<String>,
    pub metadata: ResponseMetadata,
}

/// Curriculum and knowledge context gathered for a turn.
#[derive(Debug, Default)]
struct TurnContext {
    curriculum: Option<CurriculumContext>,
    coverage: f32,
    text: String,
}

impl TurnContext {
    fn topics(&self) -> Vec<String> {
        self.curriculum
            .as_ref()
            .map(|c| c.topic_ids())
            .unwrap_or_default()
    }
}

/// Shared state for all tutoring sessions.
pub struct TutorContext {
    registry: SessionRegistry,
    providers: ProviderChain,
    authorizer: Arc<dyn Authorizer>,
    resolver: Option<TopicResolver>,
    retriever: Option<KnowledgeRetriever>,
    ranking: RankingEngine,
}

impl TutorContext {
    pub fn builder() -> TutorContextBuilder {
        TutorContextBuilder::default()
    }

    pub fn providers(&self) -> &ProviderChain {
        &self.providers
    }

    pub fn start_session(&self, start: SessionStart) -> Session {
        self.registry.start(start)
    }

    pub fn get_session(&self, session_id: &str) -> Result<Session, TutorError> {
        self.registry.get(session_id)
    }

    pub fn end_session(&self, session_id: &str) -> Result<Session, TutorError> {
        self.registry.end(session_id)
    }

    pub fn purge_expired(&self) -> usize {
        self.registry.purge_expired()
    }

    pub fn active_session_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Validate a host-reported tool result and note it in the session
    /// history, where the next turn's provider sees it.
    pub fn record_tool_result(
        &self,
        session_id: &str,
        call: &ToolCall,
        value: serde_json::Value,
    ) -> Result<ToolResult, TutorError> {
        let result = ToolResult::from_value(call, value)?;
        self.registry
            .append(session_id, ChatMessage::new(MessageRole::System, result.summary()))?;
        debug!(session_id = %session_id, tool = result.name(), "Recorded tool result");
        Ok(result)
    }

    /// Handle one learner message.
    ///
    /// Returns [`TutorError::SessionNotFound`] for unknown, ended or expired
    /// sessions; every other failure is absorbed into the response.
    #[instrument(skip(self, message), fields(session_id = %session_id))]
    pub async fn process_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<TutorResponse, TutorError> {
        let session = self.registry.get(session_id)?;

        let user_message = ChatMessage::user(message);
        self.registry.append(session_id, user_message.clone())?;

        let subject = session.subject.as_deref();
        let level = session.level.as_deref();
        let (intent, intent_source) = self
            .providers
            .detect_intent(message, session.persona, subject, level)
            .await;
        debug!(
            category = intent.category.as_str(),
            action = %intent.action,
            confidence = intent.confidence,
            source = ?intent_source,
            "Intent detected"
        );

        let auth = AuthContext {
            user_id: session.user_id.clone(),
            persona: session.persona,
            session_id: session.session_id.clone(),
        };
        let operation = intent.operation();
        if !self.authorizer.is_operation_allowed(&auth, &operation).await {
            info!(operation = %operation, persona = session.persona.as_str(), "Operation refused");
            self.registry
                .append(session_id, ChatMessage::assistant(REFUSAL_MESSAGE))?;
            return Ok(TutorResponse {
                session_id: session_id.to_string(),
                content: REFUSAL_MESSAGE.to_string(),
                suggestions: default_suggestions(session.persona),
                metadata: ResponseMetadata {
                    provider_used: None,
                    providers_attempted: Vec::new(),
                    intent,
                    intent_source,
                    mode: None,
                    coverage: 0.0,
                    topics: Vec::new(),
                    degraded: false,
                    refused: true,
                    tool_call: None,
                },
            });
        }

        let turn = self.gather_context(&session, message).await;
        let topics = turn.topics();

        let recent: Vec<&str> = session
            .user_messages()
            .map(|m| m.content.as_str())
            .chain(std::iter::once(message))
            .collect();
        let struggle = estimate_struggle(recent.iter().rev().take(STRUGGLE_WINDOW).copied());
        let questions_asked = session.questions_asked() + usize::from(message.contains('?'));
        let mode = select_mode(&ModeContext {
            intent: intent.category,
            struggle,
            questions_asked,
            persona: session.persona,
        });
        debug!(mode = mode.mode.as_str(), struggle = struggle, reason = %mode.reason, "Teaching mode selected");

        let tool_call = match ToolCall::from_intent(&intent, &topics) {
            Ok(call) => call,
            Err(e) => {
                warn!(error = %e, "Ignoring invalid tool payload");
                None
            }
        };

        let mut history = session.messages.clone();
        history.push(user_message);
        let request = CompletionRequest::new(
            system_prompt(session.persona, mode.mode, subject, level, session.goal.as_deref()),
            history,
        )
        .with_context(turn.text.clone());

        let outcome = self.providers.complete(&request).await;
        let providers_attempted = outcome.providers_attempted();
        let (content, suggestions, degraded) = match outcome.response {
            Some(response) => {
                let suggestions = response
                    .suggestions
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| default_suggestions(session.persona));
                (response.content, suggestions, false)
            }
            None => (
                fallback_response(session.persona).to_string(),
                default_suggestions(session.persona),
                true,
            ),
        };

        self.registry
            .append(session_id, ChatMessage::assistant(content.clone()))?;
        self.registry.add_topics(session_id, topics.iter().cloned())?;

        info!(
            provider = outcome.provider_used.as_deref().unwrap_or("static"),
            mode = mode.mode.as_str(),
            topics = topics.len(),
            degraded = degraded,
            "Turn complete"
        );

        Ok(TutorResponse {
            session_id: session_id.to_string(),
            content,
            suggestions,
            metadata: ResponseMetadata {
                provider_used: outcome.provider_used,
                providers_attempted,
                intent,
                intent_source,
                mode: Some(mode),
                coverage: turn.coverage,
                topics,
                degraded,
                refused: false,
                tool_call,
            },
        })
    }

    /// Resolve curriculum topics and retrieve knowledge concurrently, then
    /// rank and synthesize one context block.
    async fn gather_context(&self, session: &Session, message: &str) -> TurnContext {
        let learner_tier = session.level.as_deref().and_then(tier_from_level);

        let curriculum = async {
            match (&self.resolver, session.subject.as_deref()) {
                (Some(resolver), Some(subject)) => {
                    resolver.build_context(message, subject, learner_tier)
                }
                _ => None,
            }
        };

        let retrieval = async {
            let retriever = self.retriever.as_ref()?;
            let mut request =
                RetrievalRequest::new(message, session.user_id.clone(), session.persona);
            if let Some(subject) = &session.subject {
                request = request.with_subject(subject.clone());
            }
            if let Some(level) = &session.level {
                request = request.with_level(level.clone());
            }
            Some(retriever.retrieve(&request).await)
        };

        let (curriculum, retrieval) = tokio::join!(curriculum, retrieval);

        let mut turn = TurnContext {
            curriculum,
            ..Default::default()
        };
        let topics = turn.topics();

        let mut sections = Vec::new();
        if let Some(curriculum) = &turn.curriculum {
            sections.push(curriculum.to_prompt_section());
        }
        if let Some(retrieval) = retrieval {
            debug!(hits = retrieval.hits.len(), explanation = %retrieval.explanation, "Retrieval finished");
            let report = self.ranking.run(message, &retrieval.chunks(), &topics);
            turn.coverage = report.coverage;
            if !report.context.text.is_empty() {
                sections.push(report.context.text);
            }
        }
        turn.text = sections.join("\n");
        turn
    }
}

/// Map a session level such as "GCSE Higher" to an exam tier.
fn tier_from_level(level: &str) -> Option<TopicTier> {
    let level = level.to_lowercase();
    if level.contains("higher") {
        Some(TopicTier::Higher)
    } else if level.contains("foundation") {
        Some(TopicTier::Foundation)
    } else {
        None
    }
}

/// Builder for [`TutorContext`].
pub struct TutorContextBuilder {
    ttl: chrono::Duration,
    providers: Option<ProviderChain>,
    authorizer: Arc<dyn Authorizer>,
    graph: Option<Arc<CurriculumGraph>>,
    resolver_settings: ResolverSettings,
    retriever: Option<KnowledgeRetriever>,
    ranking_settings: RankingSettings,
}

impl Default for TutorContextBuilder {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::hours(24),
            providers: None,
            authorizer: Arc::new(AllowAll),
            graph: None,
            resolver_settings: ResolverSettings::default(),
            retriever: None,
            ranking_settings: RankingSettings::default(),
        }
    }
}

impl TutorContextBuilder {
    /// Apply loaded settings: TTL, provider chain, resolver and ranking.
    pub fn with_settings(mut self, settings: &Settings) -> Result<Self, TutorError> {
        self.ttl = settings.session_ttl();
        self.providers = Some(
            ProviderChain::from_settings(&settings.providers)
                .map_err(|e| TutorError::Config(e.to_string()))?,
        );
        self.resolver_settings = settings.resolver.clone();
        self.ranking_settings = settings.ranking.clone();
        Ok(self)
    }

    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_providers(mut self, providers: ProviderChain) -> Self {
        self.providers = Some(providers);
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Enable topic resolution and graph-aware ranking.
    pub fn with_curriculum(mut self, graph: Arc<CurriculumGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_retriever(mut self, retriever: KnowledgeRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn build(self) -> TutorContext {
        // Without configured providers, answer offline
        let providers = self.providers.unwrap_or_else(|| {
            let offline: Arc<dyn CompletionProvider> = Arc::new(OfflineProvider::new());
            ProviderChain::new(vec![offline], Duration::from_secs(20))
        });

        let scorer = match &self.graph {
            Some(graph) => QualityScorer::new().with_graph(graph.clone()),
            None => QualityScorer::new(),
        };
        let resolver = self
            .graph
            .map(|graph| TopicResolver::with_config(graph, self.resolver_settings));

        TutorContext {
            registry: SessionRegistry::new(self.ttl),
            providers,
            authorizer: self.authorizer,
            resolver,
            retriever: self.retriever,
            ranking: RankingEngine::with_settings(scorer, self.ranking_settings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::PersonaPolicy;
    use crate::mode::TeachingMode;
    use crate::provider::{MockProvider, ProviderError};
    use tutor_curriculum::builtin_graph;
    use serde_json::json;
    use tutor_types::{IntentCategory, Persona};

    fn chain(providers: Vec<Arc<MockProvider>>) -> ProviderChain {
        ProviderChain::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn CompletionProvider>)
                .collect(),
            Duration::from_secs(20),
        )
    }

    fn context(providers: Vec<Arc<MockProvider>>) -> TutorContext {
        TutorContext::builder()
            .with_providers(chain(providers))
            .with_curriculum(Arc::new(builtin_graph().unwrap()))
            .build()
    }

    fn student_session(ctx: &TutorContext) -> String {
        ctx.start_session(SessionStart::new("learner-1", Persona::Student).with_subject("maths"))
            .session_id
    }

    #[tokio::test]
    async fn test_unknown_session_is_the_only_error() {
        let ctx = context(vec![]);
        let result = ctx.process_message("nope", "hello").await;
        assert!(matches!(result, Err(TutorError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_turn_uses_primary_provider() {
        let primary = Arc::new(
            MockProvider::new("primary")
                .with_response("Let's think about BIDMAS.")
                .with_intent(DetectedIntent::new(IntentCategory::Solve, 0.9)),
        );
        let ctx = context(vec![primary.clone()]);
        let id = student_session(&ctx);

        let response = ctx
            .process_message(&id, "What is 100 - 50 × 2")
            .await
            .unwrap();

        assert_eq!(response.content, "Let's think about BIDMAS.");
        assert_eq!(response.metadata.provider_used.as_deref(), Some("primary"));
        assert_eq!(response.metadata.topics, vec!["four_operations".to_string()]);
        assert_eq!(response.metadata.mode.unwrap().mode, TeachingMode::Socratic);
        assert!(!response.metadata.degraded);
        assert_eq!(response.suggestions, default_suggestions(Persona::Student));

        // Curriculum context reached the provider
        let request = &primary.requests()[0];
        let context = request.context.as_deref().unwrap();
        assert!(context.contains("## Curriculum Context"));
        assert!(context.contains("BIDMAS"));

        let session = ctx.get_session(&id).unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, MessageRole::User);
        assert!(session.topics_covered.contains("four_operations"));
    }

    #[tokio::test]
    async fn test_fallback_appends_user_message_once() {
        let primary = Arc::new(MockProvider::new("primary").with_failure(ProviderError::RateLimited));
        let backup = Arc::new(MockProvider::new("backup").with_response("backup reply"));
        let ctx = context(vec![primary, backup]);
        let id = student_session(&ctx);

        let response = ctx.process_message(&id, "explain ratio").await.unwrap();
        assert_eq!(response.metadata.provider_used.as_deref(), Some("backup"));
        assert_eq!(response.metadata.providers_attempted, vec!["primary", "backup"]);
        assert_eq!(response.metadata.intent_source, IntentSource::Local);

        let session = ctx.get_session(&id).unwrap();
        let users = session.messages.iter().filter(|m| m.is_user()).count();
        assert_eq!(users, 1);
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_all_providers_down_gives_static_reply() {
        let a = Arc::new(MockProvider::new("a").with_failure(ProviderError::Api("500".into())));
        let b = Arc::new(MockProvider::new("b").unavailable());
        let ctx = context(vec![a, b]);
        let id = ctx
            .start_session(SessionStart::new("tutor-1", Persona::Tutor))
            .session_id;

        let response = ctx.process_message(&id, "lesson ideas please").await.unwrap();
        assert!(response.metadata.degraded);
        assert_eq!(response.content, fallback_response(Persona::Tutor));
        assert_eq!(response.metadata.provider_used, None);
    }

    #[tokio::test]
    async fn test_refusal_skips_providers() {
        let primary = Arc::new(
            MockProvider::new("primary")
                .with_intent(DetectedIntent::new(IntentCategory::Homework, 0.9)),
        );
        let ctx = TutorContext::builder()
            .with_providers(chain(vec![primary.clone()]))
            .with_authorizer(Arc::new(PersonaPolicy::new()))
            .build();
        let id = ctx
            .start_session(SessionStart::new("parent-1", Persona::Client))
            .session_id;

        let response = ctx.process_message(&id, "do the homework").await.unwrap();
        assert!(response.metadata.refused);
        assert_eq!(response.content, REFUSAL_MESSAGE);
        assert_eq!(primary.complete_calls(), 0);

        let session = ctx.get_session(&id).unwrap();
        assert_eq!(session.messages.last().unwrap().content, REFUSAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_no_subject_skips_resolution() {
        let ctx = context(vec![Arc::new(MockProvider::new("primary"))]);
        let id = ctx
            .start_session(SessionStart::new("learner-2", Persona::Student))
            .session_id;

        let response = ctx.process_message(&id, "What is 100 - 50 × 2").await.unwrap();
        assert!(response.metadata.topics.is_empty());
    }

    #[tokio::test]
    async fn test_tool_result_lands_in_history() {
        let ctx = context(vec![]);
        let id = student_session(&ctx);
        let call = ToolCall::GeneratePractice {
            topic_id: "ratio".to_string(),
            count: 2,
            difficulty: None,
        };

        let bad = json!({"tool": "explain_concept", "result": {"explanation": "no"}});
        assert!(matches!(
            ctx.record_tool_result(&id, &call, bad),
            Err(TutorError::InvalidInput(_))
        ));
        assert!(ctx.get_session(&id).unwrap().messages.is_empty());

        let good = json!({"tool": "generate_practice", "result": {"problems": ["Share 12 in 1:3", "Simplify 6:9"]}});
        let result = ctx.record_tool_result(&id, &call, good).unwrap();
        assert_eq!(result.name(), "generate_practice");

        let session = ctx.get_session(&id).unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, MessageRole::System);
        assert_eq!(
            session.messages[0].content,
            "Practice set generated: Share 12 in 1:3; Simplify 6:9"
        );

        ctx.end_session(&id).unwrap();
        let late = json!({"tool": "generate_practice", "result": {"problems": []}});
        assert!(matches!(
            ctx.record_tool_result(&id, &call, late),
            Err(TutorError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ended_session_rejects_messages() {
        let ctx = context(vec![]);
        let id = student_session(&ctx);
        assert_eq!(ctx.active_session_count(), 1);

        ctx.end_session(&id).unwrap();
        assert_eq!(ctx.active_session_count(), 0);
        assert!(ctx.process_message(&id, "hello").await.is_err());
    }

    #[test]
    fn test_tier_from_level() {
        assert_eq!(tier_from_level("GCSE Higher"), Some(TopicTier::Higher));
        assert_eq!(tier_from_level("foundation"), Some(TopicTier::Foundation));
        assert_eq!(tier_from_level("year 9"), None);
    }
}
