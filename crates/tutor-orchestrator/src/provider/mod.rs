//! Completion providers.
//!
//! One [`CompletionProvider`] trait fronts every backend: hosted LLM APIs
//! (Anthropic, OpenAI-compatible), a rule-based offline responder, and a
//! scriptable mock for tests. The orchestrator chains them in the order
//! given by `providers.priority`.

mod api;
mod mock;
mod offline;

pub use api::{ApiProvider, ApiProviderConfig, ApiFlavor};
pub use mock::MockProvider;
pub use offline::OfflineProvider;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tutor_types::{ChatMessage, DetectedIntent, Persona};

use crate::intent::{intent_prompt, parse_intent_json};

/// Error type for completion providers.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Sampling options for a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Persona and teaching-mode instructions
    pub system_prompt: String,

    /// Synthesized curriculum and knowledge context, if any
    #[serde(default)]
    pub context: Option<String>,

    /// Conversation history, oldest first, ending with the user's message
    pub messages: Vec<ChatMessage>,

    #[serde(default)]
    pub options: CompletionOptions,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            context: None,
            messages,
            options: CompletionOptions::default(),
        }
    }

    /// Builder: attach synthesized context (ignored when blank)
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    /// Builder: override sampling options
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// System prompt with the context section appended.
    pub fn full_system_prompt(&self) -> String {
        match &self.context {
            Some(context) => format!("{}\n\n{}", self.system_prompt, context),
            None => self.system_prompt.clone(),
        }
    }

    /// Most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.is_user())
    }
}

/// Token accounting reported by hosted providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Provider reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,

    /// Follow-up prompts the provider suggested, if any
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,

    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            suggestions: None,
            usage: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// One increment of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content_delta: String,
    pub done: bool,
}

impl StreamChunk {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content_delta: content.into(),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            content_delta: String::new(),
            done: true,
        }
    }
}

/// Stream of completion increments.
pub type CompletionStream = BoxStream<'static, Result<StreamChunk, ProviderError>>;

/// Pluggable completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name as used in `providers.priority`.
    fn name(&self) -> &str;

    /// Whether the provider is configured well enough to try.
    fn available(&self) -> bool;

    /// Produce a full reply.
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Produce a reply as a stream of deltas.
    ///
    /// The default emits the whole `complete()` reply as one delta followed
    /// by a `done` marker.
    async fn stream(&self, request: &CompletionRequest) -> Result<CompletionStream, ProviderError> {
        let response = self.complete(request).await?;
        let chunks = vec![Ok(StreamChunk::delta(response.content)), Ok(StreamChunk::done())];
        Ok(stream::iter(chunks).boxed())
    }

    /// Classify a learner message.
    ///
    /// Malformed provider output is a [`ProviderError::Parse`].
    async fn detect_intent(
        &self,
        message: &str,
        persona: Persona,
        subject: Option<&str>,
        level: Option<&str>,
    ) -> Result<DetectedIntent, ProviderError> {
        let request = CompletionRequest::new(
            intent_prompt(persona, subject, level),
            vec![ChatMessage::user(message)],
        )
        .with_options(CompletionOptions {
            max_tokens: 256,
            temperature: 0.0,
        });

        let response = self.complete(&request).await?;
        parse_intent_json(&response.content).ok_or_else(|| {
            ProviderError::Parse(format!("{} returned no usable intent JSON", self.name()))
        })
    }
}

/// Drain a completion stream into a string.
///
/// A stream that ends without a `done` chunk counts as complete.
pub async fn collect_stream(mut stream: CompletionStream) -> Result<String, ProviderError> {
    let mut content = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        content.push_str(&chunk.content_delta);
        if chunk.done {
            break;
        }
    }
    Ok(content)
}
