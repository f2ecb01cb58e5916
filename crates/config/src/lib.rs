//! Configuration loading, validation, and management for pawline.
//!
//! Loads configuration from `~/.pawline/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The preamble every request starts with.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI powered assistant to help people adopt a dog from the adoption \
agency named Pooch Palace with locations in Antwerp, Seoul, Tokyo, Singapore, Paris, \
Mumbai, New Delhi, Barcelona, San Francisco, and London. Information about the dogs available \
will be presented below. If there is no information, then return a polite response suggesting we \
don't have any dogs available.";

/// The root configuration structure.
///
/// Maps directly to `~/.pawline/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion engine backend
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Request pipeline settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Conversation memory backend
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Grounding document lookup
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Where the assistant finds its tool provider
    #[serde(default)]
    pub tools: ToolsConfig,

    /// The scheduling tool provider process
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

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
            .field("default_max_tokens", &self.default_max_tokens)
            .field("assistant", &self.assistant)
            .field("memory", &self.memory)
            .field("retrieval", &self.retrieval)
            .field("tools", &self.tools)
            .field("scheduler", &self.scheduler)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// How many prior messages are replayed to the completion engine
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Completion rounds that may end in tool calls before the request is aborted
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Overall deadline for one question, end to end
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}
fn default_history_window() -> usize {
    20
}
fn default_max_tool_rounds() -> u32 {
    5
}
fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            history_window: default_history_window(),
            max_tool_rounds: default_max_tool_rounds(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AssistantConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Upper bound for any configured timeout: one day.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Upper bound for `scheduler.pickup_delay_days`.
pub const MAX_PICKUP_DELAY_DAYS: i64 = 365;

/// Memory backends understood by [`MemoryConfig::backend`].
pub const MEMORY_BACKENDS: &[&str] = &["sqlite", "file", "in_memory"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Database file (sqlite) or directory (file); defaults under the config dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_memory_backend() -> String {
    "sqlite".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
        }
    }
}

impl MemoryConfig {
    /// The storage location for the configured backend.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match self.backend.as_str() {
            "file" => AppConfig::config_dir().join("sessions"),
            _ => AppConfig::config_dir().join("memory.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Documents scoring below this are not returned
    #[serde(default)]
    pub min_score: f32,

    /// JSON list of dog records indexed at assistant startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<PathBuf>,

    #[serde(default = "default_retrieval_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_top_k() -> usize {
    4
}
fn default_retrieval_timeout_secs() -> u64 {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: 0.0,
            seed_file: None,
            timeout_secs: default_retrieval_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_provider_addr")]
    pub provider_addr: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_provider_addr() -> String {
    "127.0.0.1:8081".into()
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_call_timeout_secs() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            provider_addr: default_provider_addr(),
            connect_timeout_secs: default_connect_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Days between booking and the offered pickup time
    #[serde(default = "default_pickup_delay_days")]
    pub pickup_delay_days: i64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8081
}
fn default_pickup_delay_days() -> i64 {
    3
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            pickup_delay_days: default_pickup_delay_days(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.pawline/config.toml).
    ///
    /// Environment variables checked for the API key, in order:
    /// - `PAWLINE_API_KEY`
    /// - `OPENAI_API_KEY`
    /// - `OPENROUTER_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
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

    /// Apply environment overrides through `lookup` (highest priority).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("PAWLINE_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| lookup("OPENROUTER_API_KEY"));
        }
        if let Some(provider) = lookup("PAWLINE_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("PAWLINE_MODEL") {
            self.default_model = model;
        }
        if let Some(addr) = lookup("PAWLINE_TOOLS_ADDR") {
            self.tools.provider_addr = addr;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pawline")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.assistant.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.history_window must be > 0".into(),
            ));
        }
        if self.assistant.max_tool_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.max_tool_rounds must be > 0".into(),
            ));
        }
        if self.assistant.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.request_timeout_secs must be > 0".into(),
            ));
        }
        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory backend '{}' (expected one of {})",
                self.memory.backend,
                MEMORY_BACKENDS.join(", ")
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be > 0".into(),
            ));
        }
        for (key, secs) in [
            ("assistant.request_timeout_secs", self.assistant.request_timeout_secs),
            ("retrieval.timeout_secs", self.retrieval.timeout_secs),
            ("tools.connect_timeout_secs", self.tools.connect_timeout_secs),
            ("tools.call_timeout_secs", self.tools.call_timeout_secs),
        ] {
            if secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must be at most {MAX_TIMEOUT_SECS}"
                )));
            }
        }
        if !(0..=MAX_PICKUP_DELAY_DAYS).contains(&self.scheduler.pickup_delay_days) {
            return Err(ConfigError::ValidationError(format!(
                "scheduler.pickup_delay_days must be between 0 and {MAX_PICKUP_DELAY_DAYS}"
            )));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
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
            default_max_tokens: default_max_tokens(),
            assistant: AssistantConfig::default(),
            memory: MemoryConfig::default(),
            retrieval: RetrievalConfig::default(),
            tools: ToolsConfig::default(),
            scheduler: SchedulerConfig::default(),
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
