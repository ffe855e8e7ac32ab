//! Configuration loading for the tutoring core.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/tutor-core/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TutorError;
use crate::knowledge::RetrievalStrategy;

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Hours from creation until a session expires
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_ttl_hours() -> i64 {
    24
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
        }
    }
}

/// Settings for a single API-backed completion provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderSettings {
    /// Model name (e.g., "claude-3-5-haiku-latest", "gpt-4o-mini")
    #[serde(default)]
    pub model: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersSettings {
    /// Provider names in priority order; the first available one is primary
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,

    /// Per-call timeout in seconds; a timeout counts as a provider failure
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Retries per provider call before moving down the chain
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Anthropic settings
    #[serde(default)]
    pub anthropic: ProviderSettings,

    /// OpenAI-compatible settings
    #[serde(default)]
    pub openai: ProviderSettings,
}

fn default_priority() -> Vec<String> {
    vec![
        "anthropic".to_string(),
        "openai".to_string(),
        "offline".to_string(),
    ]
}

fn default_provider_timeout() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    1
}

impl Default for ProvidersSettings {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            timeout_secs: default_provider_timeout(),
            max_retries: default_max_retries(),
            anthropic: ProviderSettings::default(),
            openai: ProviderSettings::default(),
        }
    }
}

impl ProvidersSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.priority.is_empty() {
            return Err("providers.priority must name at least one provider".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("providers.timeout_secs must be > 0".to_string());
        }
        Ok(())
    }
}

/// Knowledge retriever settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Results kept after the global merge
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Adjusted-score floor applied after truncation
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Rows requested from each vector source
    #[serde(default = "default_per_source_limit")]
    pub per_source_limit: usize,

    /// Timeout for a single source lookup in milliseconds
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
}

fn default_top_k() -> usize {
    10
}

fn default_min_score() -> f32 {
    0.5
}

fn default_per_source_limit() -> usize {
    10
}

fn default_source_timeout_ms() -> u64 {
    5000
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            per_source_limit: default_per_source_limit(),
            source_timeout_ms: default_source_timeout_ms(),
        }
    }
}

impl RetrievalSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(format!("min_score must be 0.0-1.0, got {}", self.min_score));
        }
        if self.top_k == 0 {
            return Err("top_k must be > 0".to_string());
        }
        Ok(())
    }
}

/// Ranking engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSettings {
    /// Total chunks kept after fusion
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Token budget for synthesized context
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Pull related chunks into the selection
    #[serde(default)]
    pub expand_context: bool,

    /// Per-tier strategies
    #[serde(default = "RetrievalStrategy::default_strategies")]
    pub strategies: Vec<RetrievalStrategy>,
}

fn default_max_chunks() -> usize {
    10
}

fn default_token_budget() -> usize {
    2000
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            max_chunks: default_max_chunks(),
            token_budget: default_token_budget(),
            expand_context: false,
            strategies: RetrievalStrategy::default_strategies(),
        }
    }
}

impl RankingSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        for strategy in &self.strategies {
            strategy.validate()?;
        }
        Ok(())
    }
}

/// Topic resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Topics must score strictly above this to match
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Maximum matched topics returned
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,

    /// Maximum related topics in a curriculum context
    #[serde(default = "default_max_related")]
    pub max_related: usize,
}

fn default_threshold() -> f32 {
    0.3
}

fn default_max_matches() -> usize {
    3
}

fn default_max_related() -> usize {
    5
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_matches: default_max_matches(),
            max_related: default_max_related(),
        }
    }
}

/// Practice scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Attempts needed before a topic is considered for gap detection
    #[serde(default = "default_min_attempts")]
    pub min_attempts: u32,

    /// Capacity of the practice outcome queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_min_attempts() -> u32 {
    3
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            min_attempts: default_min_attempts(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Session lifecycle
    #[serde(default)]
    pub session: SessionSettings,

    /// Completion providers
    #[serde(default)]
    pub providers: ProvidersSettings,

    /// Knowledge retrieval
    #[serde(default)]
    pub retrieval: RetrievalSettings,

    /// Ranking and synthesis
    #[serde(default)]
    pub ranking: RankingSettings,

    /// Topic resolution
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Practice scheduling
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            session: SessionSettings::default(),
            providers: ProvidersSettings::default(),
            retrieval: RetrievalSettings::default(),
            ranking: RankingSettings::default(),
            resolver: ResolverSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/tutor-core/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (TUTOR_*, nested keys separated by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TutorError> {
        let config_dir = ProjectDirs::from("", "", "tutor-core")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| TutorError::Config(e.to_string()))?
            .set_default("session.ttl_hours", default_ttl_hours())
            .map_err(|e| TutorError::Config(e.to_string()))?
            .set_default("providers.timeout_secs", default_provider_timeout() as i64)
            .map_err(|e| TutorError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: TUTOR_LOG_LEVEL, TUTOR_PROVIDERS__TIMEOUT_SECS, TUTOR_PROVIDERS__ANTHROPIC__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("TUTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TutorError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TutorError::Config(e.to_string()))?;

        settings.validate().map_err(TutorError::Config)?;
        Ok(settings)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        if self.session.ttl_hours <= 0 {
            return Err("session.ttl_hours must be > 0".to_string());
        }
        self.providers.validate()?;
        self.retrieval.validate()?;
        self.ranking.validate()?;
        Ok(())
    }

    /// Session TTL as a chrono duration.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session.ttl_hours)
    }
}
