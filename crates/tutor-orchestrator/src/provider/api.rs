//! Hosted LLM providers (Anthropic Messages API and OpenAI-compatible chat).

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use tutor_types::{MessageRole, ProviderSettings, ProvidersSettings};

use super::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, TokenUsage};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Wire format spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    Anthropic,
    OpenAi,
}

impl ApiFlavor {
    /// Provider name used in the priority list.
    pub fn name(&self) -> &'static str {
        match self {
            ApiFlavor::Anthropic => "anthropic",
            ApiFlavor::OpenAi => "openai",
        }
    }
}

/// Configuration for an API-backed provider.
#[derive(Debug, Clone)]
pub struct ApiProviderConfig {
    pub flavor: ApiFlavor,

    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    pub model: String,

    /// Missing key means the provider reports itself unavailable
    pub api_key: Option<SecretString>,

    /// HTTP request timeout
    pub timeout: Duration,

    /// Retries after the first failed attempt
    pub max_retries: u32,
}

impl ApiProviderConfig {
    /// Create config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            flavor: ApiFlavor::OpenAi,
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
            api_key: Some(SecretString::from(api_key.into())),
            timeout: Duration::from_secs(20),
            max_retries: 1,
        }
    }

    /// Create config for the Claude API.
    pub fn claude(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            flavor: ApiFlavor::Anthropic,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            model: model.into(),
            api_key: Some(SecretString::from(api_key.into())),
            timeout: Duration::from_secs(20),
            max_retries: 1,
        }
    }

    /// Build from the `providers` config section.
    pub fn from_settings(flavor: ApiFlavor, providers: &ProvidersSettings) -> Self {
        let (section, base_url, model): (&ProviderSettings, _, _) = match flavor {
            ApiFlavor::Anthropic => (&providers.anthropic, ANTHROPIC_BASE_URL, ANTHROPIC_DEFAULT_MODEL),
            ApiFlavor::OpenAi => (&providers.openai, OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL),
        };

        Self {
            flavor,
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| base_url.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: section.model.clone().unwrap_or_else(|| model.to_string()),
            api_key: section
                .api_key
                .as_ref()
                .filter(|k| !k.trim().is_empty())
                .map(|k| SecretString::from(k.clone())),
            timeout: Duration::from_secs(providers.timeout_secs),
            max_retries: providers.max_retries,
        }
    }

    /// Builder: point at a custom endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder: set retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// API-backed completion provider.
pub struct ApiProvider {
    client: Client,
    config: ApiProviderConfig,
}

impl ApiProvider {
    pub fn new(config: ApiProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiProviderConfig {
        &self.config
    }

    /// Call the API with retry logic.
    async fn call_api(
        &self,
        api_key: &SecretString,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_elapsed_time: Some(Duration::from_secs(10)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(provider = self.name(), attempt = attempts, "Calling completion API");

            let result = match self.config.flavor {
                ApiFlavor::Anthropic => self.make_anthropic_request(api_key, request).await,
                ApiFlavor::OpenAi => self.make_openai_request(api_key, request).await,
            };

            match result {
                Ok(response) => return Ok(response),
                // A reply we cannot read will not improve on retry
                Err(e @ ProviderError::Parse(_)) => return Err(e),
                Err(e) => {
                    if attempts > self.config.max_retries {
                        error!(provider = self.name(), error = %e, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                provider = self.name(),
                                error = %e,
                                retry_in_ms = duration.as_millis() as u64,
                                "API call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(provider = self.name(), error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Make OpenAI-compatible API request.
    async fn make_openai_request(
        &self,
        api_key: &SecretString,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        #[derive(Serialize)]
        struct OpenAIRequest {
            model: String,
            messages: Vec<OpenAIMessage>,
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Serialize)]
        struct OpenAIMessage {
            role: &'static str,
            content: String,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
            #[serde(default)]
            usage: Option<OpenAIUsage>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: String,
        }

        #[derive(Deserialize)]
        struct OpenAIUsage {
            prompt_tokens: u32,
            completion_tokens: u32,
        }

        let mut messages = vec![OpenAIMessage {
            role: "system",
            content: request.full_system_prompt(),
        }];
        messages.extend(request.messages.iter().map(|m| OpenAIMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        }));

        let body = OpenAIRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        let response = check_status(response).await?;

        let response_body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = response_body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;

        let mut completion = CompletionResponse::new(content);
        if let Some(usage) = response_body.usage {
            completion = completion.with_usage(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }
        Ok(completion)
    }

    /// Make Anthropic API request.
    async fn make_anthropic_request(
        &self,
        api_key: &SecretString,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        #[derive(Serialize)]
        struct AnthropicRequest {
            model: String,
            max_tokens: u32,
            temperature: f32,
            system: String,
            messages: Vec<AnthropicMessage>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage {
            role: &'static str,
            content: String,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
            #[serde(default)]
            usage: Option<TokenUsage>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(default)]
            text: String,
        }

        // The Messages API takes the system prompt out of band
        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: m.content.clone(),
            })
            .collect();

        let body = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
            system: request.full_system_prompt(),
            messages,
        };

        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        let response = check_status(response).await?;

        let response_body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content: String = response_body
            .content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(ProviderError::Parse("No content in response".to_string()));
        }

        let mut completion = CompletionResponse::new(content);
        if let Some(usage) = response_body.usage {
            completion = completion.with_usage(usage);
        }
        Ok(completion)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if response.status() == 429 {
        return Err(ProviderError::RateLimited);
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api(format!("HTTP {}: {}", status, body)));
    }

    Ok(response)
}

#[async_trait]
impl CompletionProvider for ApiProvider {
    fn name(&self) -> &str {
        self.config.flavor.name()
    }

    fn available(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let Some(api_key) = &self.config.api_key else {
            return Err(ProviderError::Unavailable(format!(
                "{} has no API key",
                self.name()
            )));
        };
        self.call_api(api_key, request).await
    }
}
