//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. Environment variables (`IMAGEQ__SECTION__KEY`)
//! 4. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use libimageq::config::{Config, OutputFormat};
use libimageq::{ImageQuery, Result};
use std::path::{Path, PathBuf};

/// Application context with resolved configuration
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
    /// Output format after applying the `--format` flag
    pub format: OutputFormat,
}

impl AppContext {
    /// Build context with precedence: defaults > config file > env vars > CLI flags
    ///
    /// An explicit config path must exist; the default one may be absent.
    pub fn build(config_path: Option<&Path>, cli_format: Option<&str>) -> Result<Self> {
        let config = match (config_path, default_config_path()) {
            (Some(path), _) => Config::load(Some(path))?,
            (None, Some(path)) => Config::load_or_default(&path)?,
            (None, None) => Config::load(None)?,
        };

        Ok(Self::with_config(config, cli_format))
    }

    /// Applies CLI flag overrides to an already loaded configuration.
    pub fn with_config(config: Config, cli_format: Option<&str>) -> Self {
        let format = cli_format
            .map(OutputFormat::from)
            .unwrap_or(config.output.format);

        Self { config, format }
    }

    /// Creates a query over the HTTP registry client.
    pub fn query(&self) -> Result<ImageQuery> {
        ImageQuery::builder()
            .with_config(self.config.clone())
            .build()
    }
}

/// Default configuration file location, `<config dir>/imageq/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("imageq").join("config.yaml"))
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
