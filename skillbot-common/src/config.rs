//! Configuration management for Skillbot services.
//!
//! Configuration lives in a single JSON file at `~/.skillbot/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `SKILLBOT_BIND` → server.bind
//! - `SKILLBOT_PORT` → server.port
//! - `OPENAI_API_KEY` → assistant.api_key
//! - `ASSISTANT_ID` → assistant.assistant_id
//! - `SKILLBOT_ASSISTANT_BASE_URL` → assistant.base_url
//! - `SKILLBOT_MAX_CONTEXT` → session.max_context_messages
//! - `SKILLBOT_LOG_LEVEL` → observability.log_level

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".skillbot"),
        |dirs| dirs.home_dir().join(".skillbot"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default: "0.0.0.0" (skill servers must be reachable
    /// from the platform)
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

// ============================================================================
// Assistant Backend Configuration
// ============================================================================

/// Assistant backend (inference) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// API key for the assistant backend
    #[serde(default)]
    pub api_key: String,

    /// Assistant (persona) identifier
    #[serde(default)]
    pub assistant_id: String,

    /// Base URL of the assistant API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Interval between run-status polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Hard ceiling on how long a single run may be polled, in seconds.
    /// A run still in flight past this point is reported as failed.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            assistant_id: String::new(),
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_wait_secs() -> u64 {
    120
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Conversation session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of messages kept in a conversation. When a thread
    /// grows past this ceiling it is migrated to a fresh thread holding
    /// only the most recent messages. Default: 10
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,

    /// Text returned in the immediate acknowledgement while the answer is
    /// being generated
    #[serde(default = "default_ack_text")]
    pub ack_text: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_context_messages: default_max_context_messages(),
            ack_text: default_ack_text(),
        }
    }
}

fn default_max_context_messages() -> usize {
    10
}

fn default_ack_text() -> String {
    "생각 중".into()
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for all Skillbot services.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, then apply environment
    /// overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides on top of file values.
    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("SKILLBOT_BIND") {
            self.server.bind = bind;
        }
        if let Ok(port) = std::env::var("SKILLBOT_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.assistant.api_key = key;
        }
        if let Ok(id) = std::env::var("ASSISTANT_ID") {
            self.assistant.assistant_id = id;
        }
        if let Ok(url) = std::env::var("SKILLBOT_ASSISTANT_BASE_URL") {
            self.assistant.base_url = url;
        }
        if let Ok(max) = std::env::var("SKILLBOT_MAX_CONTEXT") {
            if let Ok(max) = max.parse() {
                self.session.max_context_messages = max;
            }
        }
        if let Ok(level) = std::env::var("SKILLBOT_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }

    /// Validate that the fields required to reach the assistant backend are
    /// present.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.assistant.api_key.is_empty() {
            return Err(crate::error::Error::Config(
                "assistant.api_key is not set (OPENAI_API_KEY)".into(),
            ));
        }
        if self.assistant.assistant_id.is_empty() {
            return Err(crate::error::Error::Config(
                "assistant.assistant_id is not set (ASSISTANT_ID)".into(),
            ));
        }
        Ok(())
    }
}
