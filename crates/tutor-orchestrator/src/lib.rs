//! # tutor-orchestrator
//!
//! Session orchestration for the tutoring core.
//!
//! This crate provides:
//! - `TutorContext`: session registry plus the per-message turn pipeline
//!   (intent, authorization, curriculum + knowledge context, teaching mode,
//!   provider fallback, history)
//! - `CompletionProvider`: one trait for Anthropic, OpenAI-compatible,
//!   offline and mock providers, chained by `ProviderChain`
//! - Teaching mode selection and learner struggle estimation
//! - Tagged `ToolCall` / `ToolResult` payloads
//! - Response quality scoring from learner feedback
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tutor_curriculum::builtin_graph;
//! use tutor_orchestrator::{SessionStart, TutorContext};
//! use tutor_types::Persona;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = TutorContext::builder()
//!     .with_curriculum(Arc::new(builtin_graph()?))
//!     .build();
//!
//! let session = ctx.start_session(SessionStart::new("learner-1", Persona::Student).with_subject("maths"));
//! let reply = ctx.process_message(&session.session_id, "What is 100 - 50 × 2").await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod fallback;
pub mod feedback;
pub mod intent;
pub mod mode;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod session;
pub mod tools;

pub use authorization::{AllowAll, AuthContext, Authorizer, PersonaPolicy};
pub use fallback::{AttemptOutcome, ChainOutcome, IntentSource, ProviderAttempt, ProviderChain};
pub use feedback::{
    explanation_quality, score_response, understanding_promotion, LearnerFeedback, ResponseScore,
};
pub use intent::{extract_json, intent_prompt, parse_intent_json, LocalIntentDetector};
pub use mode::{estimate_struggle, select_mode, ModeContext, ModeRecommendation, TeachingMode};
pub use orchestrator::{ResponseMetadata, TutorContext, TutorContextBuilder, TutorResponse};
pub use provider::{
    collect_stream, ApiFlavor, ApiProvider, ApiProviderConfig, CompletionOptions,
    CompletionProvider, CompletionRequest, CompletionResponse, CompletionStream, MockProvider,
    OfflineProvider, ProviderError, StreamChunk, TokenUsage,
};
pub use session::{Session, SessionRegistry, SessionStart, SessionState};
pub use tools::{ToolCall, ToolResult};
