//! Mock provider for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use tutor_types::{DetectedIntent, Persona};

use super::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderError};

/// Scriptable provider that never touches the network.
///
/// Records every request it receives so tests can assert on prompts and
/// call counts.
pub struct MockProvider {
    name: String,
    response: CompletionResponse,
    failure: Option<ProviderError>,
    intent: Option<DetectedIntent>,
    delay: Option<Duration>,
    available: bool,
    complete_calls: AtomicUsize,
    intent_calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            response: CompletionResponse::new(format!("Response from {}", name)),
            name,
            failure: None,
            intent: None,
            delay: None,
            available: true,
            complete_calls: AtomicUsize::new(0),
            intent_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply with this content.
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.response.content = content.into();
        self
    }

    /// Attach suggestions to every reply.
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.response.suggestions = Some(suggestions);
        self
    }

    /// Fail every call with this error.
    pub fn with_failure(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Return this intent from `detect_intent` instead of parsing a reply.
    pub fn with_intent(mut self, intent: DetectedIntent) -> Self {
        self.intent = Some(intent);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report the provider as unavailable.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn intent_calls(&self) -> usize {
        self.intent_calls.load(Ordering::SeqCst)
    }

    /// Requests received by `complete`, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn available(&self) -> bool {
        self.available
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.wait().await;

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.response.clone()),
        }
    }

    async fn detect_intent(
        &self,
        message: &str,
        _persona: Persona,
        _subject: Option<&str>,
        _level: Option<&str>,
    ) -> Result<DetectedIntent, ProviderError> {
        self.intent_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        match &self.intent {
            Some(intent) => Ok(intent.clone()),
            None => crate::intent::parse_intent_json(&self.response.content)
                .ok_or_else(|| ProviderError::Parse(format!("no intent in {:?}", message))),
        }
    }
}
