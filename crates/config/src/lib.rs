//! Configuration loading, validation, and management for Code Coach.
//!
//! Loads configuration from `~/.codecoach/config.toml` (or an explicit path)
//! with environment variable overrides, then validates everything once at
//! startup. A missing `OPENAI_API_KEY` is a startup error, never a
//! per-request one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The base tutoring instruction injected when the caller sends no system
/// message of its own.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Code Coach. Teach Swift/SwiftUI/iOS to beginners. \
Be concise, friendly, and avoid markdown formatting. \
Use a 4-step method: 1) Understand 2) Plan 3) Write 4) Review. \
Keep examples short and readable for a phone screen.";

/// The root configuration structure.
///
/// Maps directly to `~/.codecoach/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream API key (`OPENAI_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier sent with every completion
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for the single upstream call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Prompt shaping and history guardrails
    #[serde(default)]
    pub prompt: PromptConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    900
}
fn default_request_timeout_secs() -> u64 {
    60
}

/// Redact a secret for Debug output.
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
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("gateway", &self.gateway)
            .field("prompt", &self.prompt)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. Empty = any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// Maximum accepted request body, in bytes
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_body_limit_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_allowed_origins: Vec::new(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Base system instruction
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Only the most recent N non-system messages are forwarded
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Longer message contents are truncated to this many characters
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}
fn default_max_turns() -> usize {
    12
}
fn default_max_content_chars() -> usize {
    4000
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_turns: default_max_turns(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (or the default location), apply
    /// environment overrides and validate.
    ///
    /// Environment variables, highest priority:
    /// - `OPENAI_API_KEY`
    /// - `OPENAI_BASE_URL`, `OPENAI_MODEL`, `OPENAI_TEMPERATURE`, `OPENAI_MAX_TOKENS`
    /// - `CODECOACH_HOST`, `CODECOACH_PORT`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir().join("config.toml"),
        };
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a specific file path without validating it.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.api_url = url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.model = model;
        }
        if let Some(raw) = get("OPENAI_TEMPERATURE") {
            self.temperature = parse_env("OPENAI_TEMPERATURE", &raw)?;
        }
        if let Some(raw) = get("OPENAI_MAX_TOKENS") {
            self.max_tokens = parse_env("OPENAI_MAX_TOKENS", &raw)?;
        }
        if let Some(host) = get("CODECOACH_HOST") {
            self.gateway.host = host;
        }
        if let Some(raw) = get("CODECOACH_PORT") {
            self.gateway.port = parse_env("CODECOACH_PORT", &raw)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codecoach")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.has_api_key() {
            return Err(ConfigError::MissingApiKey);
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be > 0".into(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        if self.prompt.max_turns == 0 || self.prompt.max_content_chars == 0 {
            return Err(ConfigError::ValidationError(
                "prompt.max_turns and prompt.max_content_chars must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from file or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Render the configuration as TOML with the API key masked.
    pub fn to_redacted_toml(&self) -> String {
        let mut redacted = self.clone();
        if redacted.api_key.is_some() {
            redacted.api_key = Some("[REDACTED]".into());
        }
        toml::to_string_pretty(&redacted).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            gateway: GatewayConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

fn parse_env<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
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

    #[error("OPENAI_API_KEY environment variable is not set")]
    MissingApiKey,

    #[error("Invalid value '{value}' for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}
