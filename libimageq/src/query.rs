//! High-level API taking raw image strings.
//!
//! # Examples
//!
//! ```no_run
//! use libimageq::ImageQuery;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut query = ImageQuery::connect()?;
//!
//!     println!("latest: {}", query.latest("ghcr.io/actions/actions-runner")?);
//!
//!     let info = query.show("nginx:1.27")?;
//!     println!("{}: {}", info.value.full_image_ref, info.value.description);
//!     for warning in &info.diagnostics {
//!         eprintln!("warning: {}", warning);
//!     }
//!     Ok(())
//! }
//! ```

use crate::auth::Credentials;
use crate::cache::CacheStats;
use crate::client::{Client, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::hub::HubApi;
use crate::metadata::{Diagnosed, ImageInfo, MetadataAggregator, TagInfo, TagMetadata};
use crate::reference::{ImageReference, resolve};

/// Resolves raw image strings and answers questions about them.
///
/// One `ImageQuery` owns one [`MetadataAggregator`], so repeated questions
/// about the same tag reuse its manifest.
pub struct ImageQuery<T: Transport = Client> {
    aggregator: MetadataAggregator<T>,
}

impl ImageQuery<Client> {
    /// Creates a query over the public registries with default settings.
    pub fn connect() -> Result<Self> {
        Self::builder().build()
    }

    /// Creates a builder for custom configuration.
    pub fn builder() -> ImageQueryBuilder {
        ImageQueryBuilder::new()
    }
}

impl<T: Transport> ImageQuery<T> {
    /// Resolves a raw string without contacting any registry.
    pub fn resolve(&self, raw: &str) -> ImageReference {
        resolve(raw)
    }

    /// Aggregated information for `show`.
    pub fn show(&mut self, raw: &str) -> Result<Diagnosed<ImageInfo>> {
        self.aggregator.get_image_info(&resolve(raw))
    }

    /// All tags, newest first.
    pub fn tags(&self, raw: &str) -> Result<Vec<TagInfo>> {
        self.aggregator.get_tags(&resolve(raw))
    }

    /// Highest semantically versioned tag.
    pub fn latest(&self, raw: &str) -> Result<String> {
        self.aggregator.get_latest_tag(&resolve(raw))
    }

    /// Digest, size and date of one tag.
    pub fn tag_metadata(&mut self, raw: &str, tag: &str) -> Result<TagMetadata> {
        self.aggregator.get_tag_metadata(&resolve(raw), tag)
    }

    /// Web page of the repository.
    pub fn browse_url(&self, raw: &str) -> String {
        self.aggregator.get_browse_url(&resolve(raw))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.aggregator.cache_stats()
    }
}

/// Builder for [`ImageQuery`].
#[derive(Debug, Default)]
pub struct ImageQueryBuilder {
    config: Option<Config>,
    credentials: Vec<(String, Credentials)>,
}

impl ImageQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an already loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds credentials for a registry host, on top of the configuration.
    pub fn with_credentials(
        mut self,
        registry: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        self.credentials.push((registry.into(), credentials));
        self
    }

    /// Builds a query backed by the HTTP client.
    pub fn build(self) -> Result<ImageQuery<Client>> {
        let config = self.config.clone().unwrap_or_default();
        let mut client_config = config.client_config();
        for (registry, credentials) in &self.credentials {
            client_config = client_config.with_credentials(registry.clone(), credentials.clone());
        }

        let client = Client::with_config(client_config)?;
        self.build_with_transport(client)
    }

    /// Builds a query over any transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<ImageQuery<T>> {
        let config = self.config.unwrap_or_default();
        let hub = HubApi::with_endpoints(
            config.network.timeout,
            &config.endpoints.docker_hub,
            &config.endpoints.quay,
        )?;

        let aggregator =
            MetadataAggregator::new(transport, hub).with_concurrency(config.network.concurrency);

        Ok(ImageQuery { aggregator })
    }
}
