//! Wayfarer Configuration Module
//!
//! Explicit configuration passed into the gateway and the pipeline runner.
//! Config is stored in `~/.config/wayfarer/config.toml` (or given with `--config`).
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables named in `gateway.required_env` (`MAPBOX_ACCESS_TOKEN`)
//! 2. Config file
//! 3. Defaults (Mapbox MCP server via `npx`)
//!
//! Nothing in the library reads the process environment on its own: callers
//! merge it explicitly with [`WayfarerConfig::with_env`] or
//! [`WayfarerConfig::with_env_lookup`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WayfarerError};
use crate::gateway::GatewayConfig;
use crate::resilience::{CallPolicy, RetryConfig};

/// Settings for a planning run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WayfarerConfig {
    /// Tool gateway process settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Retry and timeout settings for gateway calls
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Retry settings as they appear in the config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// 0.0 to 1.0
    pub jitter: f64,
    /// Per-attempt timeout for a single tool call
    pub call_timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 250,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter: 0.1,
            call_timeout_ms: 30_000,
        }
    }
}

impl RetrySettings {
    /// Build the call policy used by agent tool boxes.
    pub fn call_policy(&self) -> CallPolicy {
        let retry = RetryConfig::default()
            .with_max_retries(self.max_retries)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_backoff_multiplier(self.backoff_multiplier)
            .with_jitter(self.jitter);

        CallPolicy::new(retry, Duration::from_millis(self.call_timeout_ms))
    }
}

impl WayfarerConfig {
    /// `~/.config/wayfarer` (platform config dir)
    ///
    /// Returns `~/.config/wayfarer/` on Unix, `%APPDATA%/wayfarer/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wayfarer")
    }

    /// Default location of `config.toml`
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default path
    ///
    /// A missing file yields the defaults;
    /// an unreadable or malformed one is a `ConfigError`.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path (must exist)
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| WayfarerError::ConfigError {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| WayfarerError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    ///
    /// The directory is created on first save.
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| WayfarerError::ConfigError {
                reason: format!("Failed to create config directory: {}", e),
            })?;
        }
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| WayfarerError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| WayfarerError::ConfigError {
            reason: format!("Failed to write config file: {}", e),
        })?;

        Ok(())
    }

    /// Structural checks that do not involve credentials
    pub fn validate(&self) -> Result<()> {
        if self.gateway.command.trim().is_empty() {
            return Err(WayfarerError::InvalidConfig {
                message: "gateway.command cannot be empty".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(WayfarerError::InvalidConfig {
                message: format!("retry.jitter must be within 0.0..=1.0, got {}", self.retry.jitter),
            });
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(WayfarerError::InvalidConfig {
                message: "retry.backoff_multiplier must be >= 1.0".to_string(),
            });
        }
        if self.retry.call_timeout_ms == 0 {
            return Err(WayfarerError::InvalidConfig {
                message: "retry.call_timeout_ms must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Merge with process environment variables
    ///
    /// Non-empty environment values override the file.
    pub fn with_env(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Merge required gateway variables from an arbitrary lookup.
    ///
    /// Only variables listed in `gateway.required_env` are consulted; empty
    /// values are ignored so they cannot mask a value from the config file.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for var in &self.gateway.required_env {
            if let Some(value) = lookup(var) {
                if !value.is_empty() {
                    self.gateway.env.insert(var.clone(), value);
                }
            }
        }
        self
    }
}

/// Shorten a credential for console output
///
/// Shows first N chars + asterisks, e.g. "pk.eyJ1***"
pub fn mask_api_key(key: &str, visible_chars: usize) -> String {
    if key.is_empty() {
        return String::new();
    }

    let visible = key
        .char_indices()
        .nth(visible_chars)
        .map_or(key.len(), |(idx, _)| idx);
    format!("{}***", &key[..visible])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_contains_wayfarer() {
        let path = WayfarerConfig::config_path();
        assert!(path.to_string_lossy().contains("wayfarer"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_default_gateway_is_mapbox() {
        let config = WayfarerConfig::default();
        assert_eq!(config.gateway.command, "npx");
        assert_eq!(config.gateway.args, vec!["-y", "@mapbox/mcp-server"]);
        assert_eq!(config.gateway.required_env, vec!["MAPBOX_ACCESS_TOKEN"]);
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config = WayfarerConfig::from_toml_str(
            r#"
[retry]
max_retries = 5
"#,
        )
        .unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay_ms, 250);
        assert_eq!(config.gateway.name, "mapbox");
    }

    #[test]
    fn test_parse_custom_gateway() {
        let config = WayfarerConfig::from_toml_str(
            r#"
[gateway]
name = "local"
command = "node"
args = ["dist/index.js"]
required_env = []

[gateway.env]
LOG_LEVEL = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.gateway.name, "local");
        assert_eq!(config.gateway.command, "node");
        assert!(config.gateway.required_env.is_empty());
        assert_eq!(
            config.gateway.env.get("LOG_LEVEL").map(String::as_str),
            Some("debug")
        );
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = WayfarerConfig::from_toml_str("[gateway\ncommand = ").unwrap_err();
        assert_eq!(err.code(), "WF-001");
    }

    #[test]
    fn test_invalid_jitter_rejected() {
        let err = WayfarerConfig::from_toml_str("[retry]\njitter = 2.0\n").unwrap_err();
        assert_eq!(err.code(), "WF-002");
    }

    #[test]
    fn test_env_lookup_overrides_file_value() {
        let mut config = WayfarerConfig::default();
        config
            .gateway
            .env
            .insert("MAPBOX_ACCESS_TOKEN".to_string(), "from-file".to_string());

        let config = config.with_env_lookup(|key| {
            (key == "MAPBOX_ACCESS_TOKEN").then(|| "from-env".to_string())
        });

        assert_eq!(
            config.gateway.env.get("MAPBOX_ACCESS_TOKEN").map(String::as_str),
            Some("from-env")
        );
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let config = WayfarerConfig::default().with_env_lookup(|_| Some(String::new()));
        assert!(!config.gateway.env.contains_key("MAPBOX_ACCESS_TOKEN"));
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = WayfarerConfig::default();
        config.retry.max_retries = 7;
        config.save_to(&path).unwrap();

        let loaded = WayfarerConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let err = WayfarerConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert_eq!(err.code(), "WF-001");
    }

    #[test]
    fn test_call_policy_from_settings() {
        let settings = RetrySettings {
            max_retries: 4,
            call_timeout_ms: 1_500,
            ..RetrySettings::default()
        };
        let policy = settings.call_policy();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.timeout(), Duration::from_millis(1_500));
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("pk.eyJ1IjoiZGVtbyJ9", 6), "pk.eyJ***");
        assert_eq!(mask_api_key("abc", 6), "abc***");
        assert_eq!(mask_api_key("", 6), "");
    }
}
