// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for the idea board

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Web server settings
    #[serde(default)]
    pub web: WebConfig,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Content moderation settings
    #[serde(default)]
    pub moderation: ModerationConfig,

    /// Submission throttling
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Key clients by the first `X-Forwarded-For` hop instead of the peer address
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API (the `/chat/completions` path is appended)
    #[serde(default = "default_moderation_url")]
    pub url: String,
    #[serde(default = "default_moderation_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer token, if any
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    /// Minimum seconds between two accepted submissions from one client
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_tracked_clients")]
    pub max_tracked_clients: usize,
    /// Sweep expired entries every N checks
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
}

// Default value functions
fn default_true() -> bool { true }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_db_path() -> String { "ideaboard.db".to_string() }
fn default_moderation_url() -> String { "http://localhost:11434/v1".to_string() }
fn default_moderation_model() -> String { "llama3.2:3b".to_string() }
fn default_api_key_env() -> String { "IDEABOARD_MODERATION_KEY".to_string() }
fn default_temperature() -> f32 { 0.3 }
fn default_max_tokens() -> u32 { 200 }
fn default_timeout() -> u64 { 30 }
fn default_window_secs() -> u64 { 60 }
fn default_max_tracked_clients() -> usize { 10_000 }
fn default_cleanup_interval() -> u64 { 100 }

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            trust_forwarded_for: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_moderation_url(),
            model: default_moderation_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_tracked_clients: default_max_tracked_clients(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl ModerationConfig {
    /// Bearer token from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::IdeaBoardError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make the server misbehave
    pub fn validate(&self) -> crate::Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(crate::IdeaBoardError::Config("database.path is empty".to_string()));
        }
        if self.moderation.enabled && self.moderation.url.trim().is_empty() {
            return Err(crate::IdeaBoardError::Config(
                "moderation.url is required when moderation is enabled".to_string(),
            ));
        }
        if self.rate_limit.max_tracked_clients == 0 || self.rate_limit.cleanup_interval == 0 {
            return Err(crate::IdeaBoardError::Config(
                "rate_limit.max_tracked_clients and rate_limit.cleanup_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
