//! Ordered provider chain with per-call timeouts.
//!
//! Providers are tried strictly one after another in priority order. Each
//! call runs under `tokio::time::timeout`; a timeout counts as a failure.
//! Unavailable providers are skipped without being called.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use tutor_types::{DetectedIntent, Persona, ProvidersSettings};

use crate::intent::LocalIntentDetector;
use crate::provider::{
    ApiFlavor, ApiProvider, ApiProviderConfig, CompletionProvider, CompletionRequest,
    CompletionResponse, CompletionStream, OfflineProvider, ProviderError,
};

/// What happened when the chain reached a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum AttemptOutcome {
    Success,
    Failed(String),
    TimedOut,
    /// Provider reported itself unavailable and was not called
    Skipped,
}

/// One provider's turn in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// Result of running the chain.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    /// `None` when every provider failed
    pub response: Option<CompletionResponse>,
    pub provider_used: Option<String>,
    pub attempts: Vec<ProviderAttempt>,
}

impl ChainOutcome {
    /// Providers that were actually called, in order.
    pub fn providers_attempted(&self) -> Vec<String> {
        self.attempts
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::Skipped)
            .map(|a| a.provider.clone())
            .collect()
    }

    pub fn is_exhausted(&self) -> bool {
        self.response.is_none()
    }
}

/// Where a detected intent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Provider,
    Local,
}

/// Priority-ordered completion providers.
pub struct ProviderChain {
    providers: Vec<Arc<dyn CompletionProvider>>,
    call_timeout: Duration,
    local: LocalIntentDetector,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>, call_timeout: Duration) -> Self {
        Self {
            providers,
            call_timeout,
            local: LocalIntentDetector::new(),
        }
    }

    /// Build the chain named by `providers.priority`.
    ///
    /// Unknown names are logged and ignored.
    pub fn from_settings(settings: &ProvidersSettings) -> Result<Self, ProviderError> {
        let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();
        for name in &settings.priority {
            match name.trim().to_lowercase().as_str() {
                "anthropic" | "claude" => providers.push(Arc::new(ApiProvider::new(
                    ApiProviderConfig::from_settings(ApiFlavor::Anthropic, settings),
                )?)),
                "openai" => providers.push(Arc::new(ApiProvider::new(
                    ApiProviderConfig::from_settings(ApiFlavor::OpenAi, settings),
                )?)),
                "offline" => providers.push(Arc::new(OfflineProvider::new())),
                other => warn!(provider = other, "Unknown provider in priority list, ignoring"),
            }
        }
        Ok(Self::new(providers, Duration::from_secs(settings.timeout_secs)))
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Configured provider names, in priority order.
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// First available provider.
    pub fn primary(&self) -> Option<&Arc<dyn CompletionProvider>> {
        self.providers.iter().find(|p| p.available())
    }

    /// Detect intent with the primary provider, falling back to the local
    /// keyword detector on error, malformed output or timeout.
    pub async fn detect_intent(
        &self,
        message: &str,
        persona: Persona,
        subject: Option<&str>,
        level: Option<&str>,
    ) -> (DetectedIntent, IntentSource) {
        let Some(primary) = self.primary() else {
            debug!("No available provider, using local intent detection");
            return (self.local.detect(message), IntentSource::Local);
        };

        let call = primary.detect_intent(message, persona, subject, level);
        match timeout(self.call_timeout, call).await {
            Ok(Ok(intent)) => {
                // Keep the raw text available to tool payloads
                let intent = if intent.entities.contains_key("message") {
                    intent
                } else {
                    intent.with_entity("message", serde_json::json!(message))
                };
                (intent, IntentSource::Provider)
            }
            Ok(Err(e)) => {
                warn!(provider = primary.name(), error = %e, "Intent detection failed, using local detector");
                (self.local.detect(message), IntentSource::Local)
            }
            Err(_) => {
                warn!(
                    provider = primary.name(),
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Intent detection timed out, using local detector"
                );
                (self.local.detect(message), IntentSource::Local)
            }
        }
    }

    /// Complete with the first provider that succeeds.
    pub async fn complete(&self, request: &CompletionRequest) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();

        for provider in &self.providers {
            let name = provider.name().to_string();
            if !provider.available() {
                debug!(provider = %name, "Skipping unavailable provider");
                outcome.attempts.push(ProviderAttempt {
                    provider: name,
                    outcome: AttemptOutcome::Skipped,
                    elapsed_ms: 0,
                });
                continue;
            }

            let start = Instant::now();
            let result = timeout(self.call_timeout, provider.complete(request)).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            let attempt_outcome = match result {
                Ok(Ok(response)) => {
                    info!(provider = %name, elapsed_ms = elapsed_ms, "Provider completed");
                    outcome.attempts.push(ProviderAttempt {
                        provider: name.clone(),
                        outcome: AttemptOutcome::Success,
                        elapsed_ms,
                    });
                    outcome.response = Some(response);
                    outcome.provider_used = Some(name);
                    return outcome;
                }
                Ok(Err(e)) => {
                    warn!(provider = %name, error = %e, "Provider failed, trying next");
                    AttemptOutcome::Failed(e.to_string())
                }
                Err(_) => {
                    warn!(provider = %name, elapsed_ms = elapsed_ms, "Provider timed out, trying next");
                    AttemptOutcome::TimedOut
                }
            };

            outcome.attempts.push(ProviderAttempt {
                provider: name,
                outcome: attempt_outcome,
                elapsed_ms,
            });
        }

        warn!(attempts = outcome.attempts.len(), "All providers failed");
        outcome
    }

    /// Open a stream on the first provider that accepts the request.
    ///
    /// Only opening the stream is covered by the fallback; errors inside an
    /// open stream are the caller's to handle.
    pub async fn stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<(String, CompletionStream), ProviderError> {
        let mut last_error =
            ProviderError::Unavailable("no completion provider is available".to_string());

        for provider in self.providers.iter().filter(|p| p.available()) {
            match timeout(self.call_timeout, provider.stream(request)).await {
                Ok(Ok(stream)) => return Ok((provider.name().to_string(), stream)),
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), error = %e, "Stream failed to open, trying next");
                    last_error = e;
                }
                Err(_) => {
                    let ms = self.call_timeout.as_millis() as u64;
                    warn!(provider = provider.name(), timeout_ms = ms, "Stream open timed out, trying next");
                    last_error = ProviderError::Timeout(ms);
                }
            }
        }

        Err(last_error)
    }
}
