//! TOML Configuration File Support
//!
//! Centralized configuration loading for the client, supporting a TOML file
//! at `~/.config/maestro/client.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! backend_url = "http://localhost:8000"
//! connect_timeout_ms = 5000
//! health_timeout_ms = 5000
//! event_buffer = 100
//! health_poll_secs = 30
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default workflow server address (`maestro serve`)
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the backend URL came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Structure
// =============================================================================

/// On-disk form; every key optional
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientToml {
    /// Workflow server base URL
    pub backend_url: Option<String>,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
    /// Health probe timeout in milliseconds
    pub health_timeout_ms: Option<u64>,
    /// Stream events buffered ahead of the transcript writer
    pub event_buffer: Option<usize>,
    /// Health polling interval in seconds (0 = probe once at startup)
    pub health_poll_secs: Option<u64>,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Resolved client configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Workflow server base URL
    pub backend_url: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Health probe timeout in milliseconds
    pub health_timeout_ms: u64,
    /// Stream events buffered ahead of the transcript writer
    pub event_buffer: usize,
    /// Health polling interval in seconds (0 = probe once at startup)
    pub health_poll_secs: u64,
    /// Where `backend_url` came from
    pub source: ConfigSource,
    /// Config file that was read, if any
    pub config_file_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            connect_timeout_ms: 5000,
            health_timeout_ms: 5000,
            event_buffer: 100,
            health_poll_secs: 0,
            source: ConfigSource::Default,
            config_file_path: None,
        }
    }
}

impl ClientConfig {
    /// Connection timeout as a `Duration`
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Health probe timeout as a `Duration`
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// Health polling interval, or `None` for a single startup probe
    #[must_use]
    pub fn health_poll_interval(&self) -> Option<Duration> {
        (self.health_poll_secs > 0).then(|| Duration::from_secs(self.health_poll_secs))
    }

    /// Check values that would make the client unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend_url.trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError(
                "backend_url must not be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "backend_url must start with http:// or https://, got {url}"
            )));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "event_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_toml(&mut self, toml: &ClientToml) {
        if let Some(ref url) = toml.backend_url {
            self.backend_url.clone_from(url);
            self.source = ConfigSource::File;
        }
        if let Some(ms) = toml.connect_timeout_ms {
            self.connect_timeout_ms = ms;
        }
        if let Some(ms) = toml.health_timeout_ms {
            self.health_timeout_ms = ms;
        }
        if let Some(n) = toml.event_buffer {
            self.event_buffer = n;
        }
        if let Some(secs) = toml.health_poll_secs {
            self.health_poll_secs = secs;
        }
    }

    /// Apply `MAESTRO_*` variables looked up through `var`
    fn apply_env_with(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("MAESTRO_URL") {
            self.backend_url = url;
            self.source = ConfigSource::Env;
        }
        if let Some(ms) = var("MAESTRO_CONNECT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.connect_timeout_ms = ms;
        }
        if let Some(ms) = var("MAESTRO_HEALTH_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.health_timeout_ms = ms;
        }
        if let Some(n) = var("MAESTRO_EVENT_BUFFER").and_then(|v| v.parse().ok()) {
            self.event_buffer = n;
        }
        if let Some(secs) = var("MAESTRO_HEALTH_POLL_SECS").and_then(|v| v.parse().ok()) {
            self.health_poll_secs = secs;
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Default config file location (`$XDG_CONFIG_HOME/maestro/client.toml`)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("maestro").join("client.toml"))
}

/// Load configuration from the default path plus environment
///
/// # Errors
///
/// See [`load_config_from_path`].
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from `path` (missing file = defaults) plus environment
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    let mut config = load_file(path)?;
    config.apply_env_with(|key| std::env::var(key).ok());
    Ok(config)
}

fn load_file(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    let Some(config_path) = path else {
        return Ok(config);
    };

    if !config_path.exists() {
        tracing::debug!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        return Ok(config);
    }

    let toml_content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
            path: config_path.clone(),
            source: e,
        })?;

    let toml_config: ClientToml = toml::from_str(&toml_content)?;
    config.apply_toml(&toml_config);
    tracing::info!(path = %config_path.display(), "Loaded configuration from file");
    config.config_file_path = Some(config_path);

    Ok(config)
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend URL override
    pub backend_url: Option<String>,
    /// Health polling interval override (seconds)
    pub health_poll_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Create an empty override set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the backend URL
    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Override the health polling interval
    #[must_use]
    pub fn with_health_poll_secs(mut self, secs: u64) -> Self {
        self.health_poll_secs = Some(secs);
        self
    }

    /// Apply the overrides
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(ref url) = self.backend_url {
            config.backend_url.clone_from(url);
            config.source = ConfigSource::Cli;
        }
        if let Some(secs) = self.health_poll_secs {
            config.health_poll_secs = secs;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
