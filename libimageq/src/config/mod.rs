//! Application configuration.
//!
//! Defaults are merged with an optional YAML file and then with `IMAGEQ__`
//! prefixed environment variables (`IMAGEQ__NETWORK__TIMEOUT=60`).

use crate::auth::Credentials;
use crate::client::ClientConfig;
use crate::error::{ImageqError, Result};
use crate::hub::{DEFAULT_DOCKER_HUB_URL, DEFAULT_QUAY_URL};
use crate::metadata::DEFAULT_CONCURRENCY;
use config::{Config as ConfigRs, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;


/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "IMAGEQ";

/// Root configuration structure.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub insecure_registries: Vec<String>,
    #[serde(default)]
    pub credentials: Vec<CredentialEntry>,
}

impl Config {
    /// Parses a `Config` from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = ConfigRs::builder()
            .add_source(ConfigRs::try_from(&Config::default())?)
            .add_source(File::from_str(s, FileFormat::Yaml));

        Self::from_builder(builder)
    }

    /// Loads configuration from an explicit file, which must exist.
    ///
    /// With `None` only defaults and environment variables apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, true, Self::environment())
    }

    /// Loads configuration from a file that may be absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        Self::load_with(Some(path), false, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with(path: Option<&Path>, required: bool, environment: Environment) -> Result<Self> {
        let mut builder =
            ConfigRs::builder().add_source(ConfigRs::try_from(&Config::default())?);

        if let Some(p) = path {
            if required && !p.exists() {
                return Err(ImageqError::config(
                    "Configuration file not found".to_string(),
                    Some(p.display().to_string()),
                ));
            }
            builder = builder.add_source(
                File::from(p)
                    .format(FileFormat::Yaml)
                    .required(required),
            );
        }

        Self::from_builder(builder.add_source(environment))
    }

    /// Creates a `Config` from a `config::ConfigBuilder`.
    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                ImageqError::config_with_source(
                    "Failed to deserialize configuration",
                    None::<&str>,
                    e,
                )
            })
    }

    /// HTTP client settings derived from this configuration.
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new().with_timeout(self.network.timeout);
        for registry in &self.insecure_registries {
            client = client.with_insecure_registry(registry.clone());
        }
        for entry in &self.credentials {
            client = client.with_credentials(entry.registry.clone(), entry.to_credentials());
        }
        client
    }
}

/// Output formatting settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default, Clone)]
pub struct Output {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Enum for output formats.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,

    Json,

    Yaml,
}

impl From<&str> for OutputFormat {
    /// Unrecognized names fall back to [`OutputFormat::Pretty`].
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Pretty,
        }
    }
}

/// Network settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Network {
    /// Per-request timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,

    /// Platform manifests fetched in parallel for multi-arch images.
    #[serde(default = "default_network_concurrency")]
    pub concurrency: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
            concurrency: default_network_concurrency(),
        }
    }
}

fn default_network_timeout() -> u64 {
    30
}

fn default_network_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Base URLs of the vendor APIs used for descriptions and push dates.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Endpoints {
    #[serde(default = "default_docker_hub_url")]
    pub docker_hub: String,

    #[serde(default = "default_quay_url")]
    pub quay: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            docker_hub: default_docker_hub_url(),
            quay: default_quay_url(),
        }
    }
}

fn default_docker_hub_url() -> String {
    DEFAULT_DOCKER_HUB_URL.to_string()
}

fn default_quay_url() -> String {
    DEFAULT_QUAY_URL.to_string()
}

/// Credentials for one registry host.
///
/// A `token` wins over `username`/`password`; an entry with neither is
/// anonymous.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CredentialEntry {
    pub registry: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub token: Option<String>,
}

impl CredentialEntry {
    pub fn to_credentials(&self) -> Credentials {
        match (&self.token, &self.username, &self.password) {
            (Some(token), _, _) => Credentials::bearer(token.clone()),
            (None, Some(username), Some(password)) => {
                Credentials::basic(username.clone(), password.clone())
            }
            _ => Credentials::Anonymous,
        }
    }
}
