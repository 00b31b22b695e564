//! Configuration for the DatoCMS code-mode MCP server.
//!
//! A `Config` struct loaded from a JSON file on disk (`dcms.json`),
//! overridable by environment variables, holding the server's identity,
//! [`logger::LoggerConfig`], [`telemetry::TelemetryConfig`] and the CMA
//! client settings in [`ClientConfig`].

pub mod auth;
pub(crate) mod defaults;
pub mod logger;
pub mod telemetry;

use std::path::Path;

use auth::SecretString;
use camino::Utf8PathBuf;
use logger::LoggerConfig;
use serde::{Deserialize, Serialize};
use telemetry::TelemetryConfig;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid DATOCMS_BASE_URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("invalid EXECUTION_TIMEOUT_SECONDS: {0}")]
    InvalidTimeout(std::num::ParseIntError),
    #[error("invalid MAX_OUTPUT_BYTES: {0}")]
    InvalidMaxOutputBytes(std::num::ParseIntError),
    #[error("could not determine a user config directory")]
    NoConfigDir,
}

/// Top-level server configuration, persisted as `dcms.json` under the
/// workspace's user-data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::default_server_name")]
    pub name: String,
    #[serde(default = "defaults::default_server_version")]
    pub version: String,
    #[serde(default = "defaults::default_server_description")]
    pub description: String,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: defaults::default_server_name(),
            version: defaults::default_server_version(),
            description: defaults::default_server_description(),
            client: ClientConfig::default(),
            logger: LoggerConfig::default(),
            telemetry: TelemetryConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Config {
    /// The default `dcms.json` location under the OS user-config directory,
    /// e.g. `~/.config/dcms-mcp/dcms.json` on Linux. Mirrors
    /// `dcms_workspace::Workspace::default_root`'s use of the same
    /// `ProjectDirs` identifier for the sibling data directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if the platform has no
    /// resolvable user config directory.
    pub fn default_path() -> Result<std::path::PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("com", "datocms", "dcms-mcp").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("dcms.json"))
    }

    /// Load config from a JSON file, falling back to defaults if the file
    /// does not exist. Environment variables always take precedence over
    /// whatever the file contains.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if an environment variable override is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let utf8_path = Utf8PathBuf::from_path_buf(path.to_path_buf())
            .unwrap_or_else(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned()));

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: utf8_path.clone(),
                source,
            })?;
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: utf8_path.clone(),
                source,
            })?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Persist this config back to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let utf8_path = Utf8PathBuf::from_path_buf(path.to_path_buf())
            .unwrap_or_else(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned()));
        let json = serde_json::to_string_pretty(self).expect("Config always serializes");
        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: utf8_path,
            source,
        })
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(token) = std::env::var("DATOCMS_API_TOKEN") {
            self.client.api_token = Some(SecretString::new_plain(&token));
        }
        if let Ok(env) = std::env::var("DATOCMS_ENVIRONMENT") {
            self.client.environment = Some(env);
        }
        if let Ok(base_url) = std::env::var("DATOCMS_BASE_URL") {
            self.client.base_url = Url::parse(&base_url)?;
        }
        if let Ok(timeout) = std::env::var("EXECUTION_TIMEOUT_SECONDS") {
            self.execution.timeout_seconds =
                timeout.parse().map_err(ConfigError::InvalidTimeout)?;
        }
        if let Ok(max_bytes) = std::env::var("MAX_OUTPUT_BYTES") {
            self.execution.max_output_bytes =
                max_bytes.parse().map_err(ConfigError::InvalidMaxOutputBytes)?;
        }
        Ok(())
    }
}

/// CMA client connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default = "defaults::default_base_url")]
    pub base_url: Url,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            environment: None,
            base_url: defaults::default_base_url(),
        }
    }
}

/// Defaults for `execute_script`, overridable per-call (see `dcms_workspace`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "defaults::default_execution_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "defaults::default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: defaults::default_execution_timeout_seconds(),
            max_output_bytes: defaults::default_max_output_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            "DATOCMS_API_TOKEN",
            "DATOCMS_ENVIRONMENT",
            "DATOCMS_BASE_URL",
            "EXECUTION_TIMEOUT_SECONDS",
            "MAX_OUTPUT_BYTES",
        ] {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, config.name);
        assert_eq!(parsed.client.base_url, config.client.base_url);
    }

    #[test]
    fn env_overrides_win_over_file_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("DATOCMS_API_TOKEN", "secret-token");
            std::env::set_var("EXECUTION_TIMEOUT_SECONDS", "120");
        }

        let mut config = Config::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.execution.timeout_seconds, 120);
        assert!(config.client.api_token.is_some());
        clear_env();
    }

    #[test]
    fn invalid_timeout_env_var_errors() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("EXECUTION_TIMEOUT_SECONDS", "not-a-number");
        }
        let mut config = Config::default();
        assert!(config.apply_env_overrides().is_err());
        clear_env();
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let config = Config::load(Path::new("/nonexistent/dcms.json")).unwrap();
        assert_eq!(config.name, defaults::default_server_name());
    }
}
