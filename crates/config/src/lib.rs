//! Configuration loading, validation, and management for rolelog.
//!
//! Loads configuration from `~/.rolelog/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.rolelog/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Transcript log configuration
    #[serde(default)]
    pub logs: LogsConfig,

    /// Placeholder completion settings
    #[serde(default)]
    pub mock: MockConfig,
}

/// Redact API keys for Debug output.
fn redact(keys: &[String]) -> Vec<&'static str> {
    keys.iter().map(|_| "[REDACTED]").collect()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer tokens accepted on `/v1` routes.
    #[serde(default = "default_api_keys")]
    pub api_keys: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}
fn default_api_keys() -> Vec<String> {
    vec!["custom-key".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_keys: default_api_keys(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_keys", &redact(&self.api_keys))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Directory holding `request_<key>.log`, `request_<key>_raw.json` and
    /// `error-log.log`.
    #[serde(default = "default_logs_dir")]
    pub dir: PathBuf,
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            dir: default_logs_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    /// Model id reported by `/v1/models` and completions
    #[serde(default = "default_mock_model")]
    pub model: String,

    #[serde(default = "default_owned_by")]
    pub owned_by: String,

    /// Fixed assistant reply
    #[serde(default = "default_reply")]
    pub reply: String,
}

fn default_mock_model() -> String {
    "mock-model-1".into()
}
fn default_owned_by() -> String {
    "custom-owner".into()
}
fn default_reply() -> String {
    "This is a mock response from the custom OpenAI-compatible server".into()
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model: default_mock_model(),
            owned_by: default_owned_by(),
            reply: default_reply(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.rolelog/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `ROLELOG_PORT`, then `PORT`
    /// - `ROLELOG_API_KEY`, then `API_KEY` (replaces the whole key set)
    /// - `ROLELOG_LOGS_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with(&config_path, |name| std::env::var(name).ok())
    }

    /// Load `path`, apply overrides from `lookup`, then validate the result.
    pub fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// The result is not validated; overrides may still repair it.
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

        Ok(config)
    }

    /// Apply overrides from an environment-like lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup("ROLELOG_PORT").or_else(|| lookup("PORT")) {
            self.gateway.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("invalid port: {port}")))?;
        }

        if let Some(key) = lookup("ROLELOG_API_KEY").or_else(|| lookup("API_KEY")) {
            self.gateway.api_keys = vec![key];
        }

        if let Some(dir) = lookup("ROLELOG_LOGS_DIR") {
            self.logs.dir = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".rolelog")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be greater than 0".into(),
            ));
        }

        if self.gateway.api_keys.is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway.api_keys must contain at least one key".into(),
            ));
        }

        if self.gateway.api_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "gateway.api_keys must not contain blank keys".into(),
            ));
        }

        if self.logs.dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "logs.dir must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.gateway.api_keys, vec!["custom-key".to_string()]);
        assert_eq!(config.logs.dir, PathBuf::from("logs"));
        assert_eq!(config.mock.model, "mock-model-1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.mock.reply, config.mock.reply);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[gateway]\nport = 8080\n\n[logs]\ndir = \"/var/log/rolelog\"").unwrap();
        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.logs.dir, PathBuf::from("/var/log/rolelog"));
        assert_eq!(config.mock.owned_by, "custom-owner");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[gateway\nport = ").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.gateway.port, 3000);
    }

    #[test]
    fn env_overrides_take_priority() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("PORT", "4000"),
                ("ROLELOG_PORT", "5000"),
                ("API_KEY", "secret"),
                ("ROLELOG_LOGS_DIR", "/tmp/rl"),
            ]))
            .unwrap();
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.gateway.api_keys, vec!["secret".to_string()]);
        assert_eq!(config.logs.dir, PathBuf::from("/tmp/rl"));
    }

    #[test]
    fn override_repairs_an_invalid_file_port() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[gateway]\nport = 0").unwrap();
        let config = AppConfig::load_with(tmp.path(), env(&[("PORT", "4000")])).unwrap();
        assert_eq!(config.gateway.port, 4000);
    }

    #[test]
    fn invalid_file_without_override_fails_validation() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[gateway]\nport = 0").unwrap();
        let err = AppConfig::load_with(tmp.path(), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn plain_port_variable_is_honored() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[("PORT", "8081")])).unwrap();
        assert_eq!(config.gateway.port, 8081);
    }

    #[test]
    fn invalid_port_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_overrides(env(&[("PORT", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn empty_key_set_is_invalid() {
        let mut config = AppConfig::default();
        config.gateway.api_keys.clear();
        assert!(config.validate().is_err());
        config.gateway.api_keys.push("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_keys() {
        let mut config = AppConfig::default();
        config.gateway.api_keys = vec!["super-secret".into()];
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("3000"));
        assert!(toml_str.contains("mock-model-1"));
    }
}
