//! Configuration loading, validation, and management for Chatwright.
//!
//! Loads configuration from `~/.chatwright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatwright/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Reply generation budgets and time limits
    #[serde(default)]
    pub generation: GenerationConfig,

    /// In-memory cache sizing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Live market data lookups
    #[serde(default)]
    pub market: MarketConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("generation", &self.generation)
            .field("cache", &self.cache)
            .field("market", &self.market)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for MarketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// Budgets and time limits for the two generation tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Time limit for each attempt, primary and fallback alike
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Knowledge budget (chars) for the primary attempt
    #[serde(default = "default_primary_budget")]
    pub primary_knowledge_budget: usize,

    /// Knowledge budget (chars) for the fallback attempt
    #[serde(default = "default_fallback_budget")]
    pub fallback_knowledge_budget: usize,

    #[serde(default = "default_primary_max_tokens")]
    pub primary_max_tokens: u32,

    #[serde(default = "default_fallback_max_tokens")]
    pub fallback_max_tokens: u32,
}

fn default_attempt_timeout() -> u64 {
    15
}
fn default_primary_budget() -> usize {
    100_000
}
fn default_fallback_budget() -> usize {
    8_000
}
fn default_primary_max_tokens() -> u32 {
    2048
}
fn default_fallback_max_tokens() -> u32 {
    600
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout(),
            primary_knowledge_budget: default_primary_budget(),
            fallback_knowledge_budget: default_fallback_budget(),
            primary_max_tokens: default_primary_max_tokens(),
            fallback_max_tokens: default_fallback_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub knowledge_ttl_secs: u64,

    #[serde(default = "default_knowledge_capacity")]
    pub knowledge_capacity: usize,

    #[serde(default = "default_cache_ttl")]
    pub prompt_ttl_secs: u64,

    #[serde(default = "default_prompt_capacity")]
    pub prompt_capacity: usize,

    #[serde(default = "default_quote_ttl")]
    pub quote_ttl_secs: u64,

    #[serde(default = "default_quote_capacity")]
    pub quote_capacity: usize,
}

fn default_cache_ttl() -> u64 {
    600
}
fn default_knowledge_capacity() -> usize {
    100
}
fn default_prompt_capacity() -> usize {
    50
}
fn default_quote_ttl() -> u64 {
    60
}
fn default_quote_capacity() -> usize {
    200
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            knowledge_ttl_secs: default_cache_ttl(),
            knowledge_capacity: default_knowledge_capacity(),
            prompt_ttl_secs: default_cache_ttl(),
            prompt_capacity: default_prompt_capacity(),
            quote_ttl_secs: default_quote_ttl(),
            quote_capacity: default_quote_capacity(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_market_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_market_timeout")]
    pub timeout_secs: u64,

    /// Extra phrase → canonical id aliases, merged over the built-in table
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}

fn default_market_provider() -> String {
    "coingecko".into()
}
fn default_market_timeout() -> u64 {
    5
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_market_provider(),
            api_url: None,
            api_key: None,
            timeout_secs: default_market_timeout(),
            aliases: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Request body limit; profiles with many documents are large
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    4 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatwright/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `CHATWRIGHT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("CHATWRIGHT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("CHATWRIGHT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("CHATWRIGHT_MODEL") {
            self.default_model = model;
        }

        if self.market.api_key.is_none() {
            self.market.api_key = std::env::var("CHATWRIGHT_MARKET_API_KEY").ok();
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatwright")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let generation = &self.generation;
        if generation.attempt_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.attempt_timeout_secs must be > 0".into(),
            ));
        }
        if generation.fallback_knowledge_budget >= generation.primary_knowledge_budget {
            return Err(ConfigError::ValidationError(
                "generation.fallback_knowledge_budget must be smaller than primary_knowledge_budget"
                    .into(),
            ));
        }

        let cache = &self.cache;
        if cache.knowledge_capacity == 0 || cache.prompt_capacity == 0 || cache.quote_capacity == 0
        {
            return Err(ConfigError::ValidationError(
                "cache capacities must be > 0".into(),
            ));
        }

        if self.market.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "market.timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            generation: GenerationConfig::default(),
            cache: CacheConfig::default(),
            market: MarketConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
