//! Command-Line Interface
//!
//! Flags sit on top of the client config: `--url` beats `MAESTRO_URL`, which
//! beats the TOML file.

use std::path::PathBuf;

use clap::Parser;

use maestro_client_core::{
    default_config_path, load_config_from_path, ClientConfig, ConfigError, ConfigOverrides,
};

/// Maestro TUI - chat with a Maestro workflow server
#[derive(Parser, Debug)]
#[command(name = "maestro-tui")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Workflow server URL (e.g. http://localhost:8000)
    #[arg(short = 'u', long, value_name = "URL")]
    pub url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "MAESTRO_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log file (default: <cache dir>/maestro/tui.log)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Re-probe backend health every SECS seconds (0 = once at startup)
    #[arg(long, value_name = "SECS")]
    pub health_poll: Option<u64>,
}

impl Args {
    /// Config overrides from flags
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref url) = self.url {
            overrides = overrides.with_backend_url(url.clone());
        }
        if let Some(secs) = self.health_poll {
            overrides = overrides.with_health_poll_secs(secs);
        }
        overrides
    }

    /// Config file to read
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(default_config_path)
    }

    /// Where logs go; the terminal belongs to the UI, so never stderr
    ///
    /// `None` only when no path was given and there is no cache directory.
    #[must_use]
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("maestro").join("tui.log")))
    }

    /// Load file and environment config, then apply flags
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable or the final
    /// configuration is invalid.
    pub fn load_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = load_config_from_path(self.config_path())?;
        self.overrides().apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}
