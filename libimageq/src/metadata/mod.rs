//! Metadata aggregation for container repositories.
//!
//! [`MetadataAggregator`] answers the `show`, `tags` and `latest` questions
//! for a resolved [`ImageReference`]. Registry data comes through a
//! [`Transport`]; descriptions and Docker Hub push dates come from the
//! vendor APIs in [`crate::hub`]. Enrichment is best effort: anything that
//! cannot be found is left empty rather than failing the request.

mod types;

pub use types::*;

use crate::cache::{CacheStats, DescriptorCache};
use crate::client::Transport;
use crate::error::{ImageqError, Result};
use crate::family::{self, RegistryFamily};
use crate::hub::HubApi;
use crate::oci::{self, ANNOTATION_CREATED, Image, ImageConfiguration, ManifestDescriptor};
use crate::ranking;
use crate::reference::{ImageReference, Repository};
use rayon::prelude::*;
use tracing::debug;


/// Tag inspected when a reference does not name one.
pub const DEFAULT_TAG: &str = "latest";

/// Description reported when no source has one.
pub const NO_DESCRIPTION: &str = "Description not available for this registry";

/// Default number of platform manifests fetched in parallel.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Aggregates tags, sizes, dates and descriptions for image references.
///
/// # Examples
///
/// ```no_run
/// use libimageq::client::Client;
/// use libimageq::hub::HubApi;
/// use libimageq::metadata::MetadataAggregator;
/// use libimageq::reference::resolve;
///
/// # fn example() -> libimageq::Result<()> {
/// let mut aggregator = MetadataAggregator::new(Client::new()?, HubApi::new(30)?);
/// let info = aggregator.get_image_info(&resolve("nginx:1.27"))?;
/// println!("{} ({:?} bytes)", info.value.full_image_ref, info.value.size);
/// # Ok(())
/// # }
/// ```
pub struct MetadataAggregator<T: Transport> {
    transport: T,
    hub: HubApi,
    cache: DescriptorCache,
    concurrency: usize,
}

impl<T: Transport> MetadataAggregator<T> {
    pub fn new(transport: T, hub: HubApi) -> Self {
        Self {
            transport,
            hub,
            cache: DescriptorCache::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets how many platform manifests are fetched at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Parses the fully-qualified repository of a reference.
    fn repository(reference: &ImageReference) -> Result<Repository> {
        family::full_reference(reference).parse()
    }

    /// Lists every tag of the repository, ranked newest first.
    pub fn get_tags(&self, reference: &ImageReference) -> Result<Vec<TagInfo>> {
        let repository = Self::repository(reference)?;
        let tags = self.transport.list_tags(&repository)?;

        Ok(ranking::rank(tags.into_iter().map(TagInfo::named).collect()))
    }

    /// Returns the highest semantically versioned tag.
    pub fn get_latest_tag(&self, reference: &ImageReference) -> Result<String> {
        let tags = self.get_tags(reference)?;
        if tags.is_empty() {
            return Err(ImageqError::no_tags(reference.name.as_str()));
        }

        ranking::filter_valid(tags)
            .into_iter()
            .next()
            .map(|tag| tag.name)
            .ok_or_else(|| ImageqError::no_semver_tags(reference.name.as_str()))
    }

    /// Web page of the repository.
    pub fn get_browse_url(&self, reference: &ImageReference) -> String {
        family::browse_url(reference)
    }

    /// Digest, size and creation date of one tag.
    pub fn get_tag_metadata(
        &mut self,
        reference: &ImageReference,
        tag: &str,
    ) -> Result<TagMetadata> {
        let repository = Self::repository(reference)?;
        self.tag_metadata(&repository, tag)
    }

    /// Everything `show` reports about a reference.
    ///
    /// A reference that does not form a valid repository fails before any
    /// request is made. Failing to read the tag's manifest does not: the
    /// metadata fields stay empty and the failure is recorded as a
    /// diagnostic.
    pub fn get_image_info(
        &mut self,
        reference: &ImageReference,
    ) -> Result<Diagnosed<ImageInfo>> {
        let repository = Self::repository(reference)?;
        let target_tag = reference.tag().unwrap_or(DEFAULT_TAG).to_string();
        let mut diagnostics = Vec::new();

        let metadata = match self.tag_metadata(&repository, &target_tag) {
            Ok(metadata) => metadata,
            Err(e) => {
                let action = if e.is_transport() {
                    "failed to fetch"
                } else {
                    "could not read"
                };
                let message = format!(
                    "{} metadata for {}: {}",
                    action,
                    repository.tagged(&target_tag),
                    e
                );
                debug!("{}", message);
                diagnostics.push(message);
                TagMetadata::default()
            }
        };

        let description = self.description(reference, &repository, &target_tag);

        let info = ImageInfo {
            name: reference.name.clone(),
            description,
            full_image_ref: format!("{}:{}", family::full_reference(reference), target_tag),
            latest_tag: target_tag,
            tag_date: metadata.date,
            size: metadata.size,
            manifest_digest: metadata.digest,
            registry: family::display_name(reference),
        };

        Ok(Diagnosed {
            value: info,
            diagnostics,
        })
    }

    /// Descriptor of `repository:tag`, fetched once per aggregator.
    fn descriptor(&mut self, repository: &Repository, tag: &str) -> Result<ManifestDescriptor> {
        let key = DescriptorCache::key(repository, tag);
        let transport = &self.transport;
        self.cache
            .get_or_try_insert_with(&key, || {
                ManifestDescriptor::fetch(transport, repository, tag)
            })
            .cloned()
    }

    fn tag_metadata(&mut self, repository: &Repository, tag: &str) -> Result<TagMetadata> {
        let descriptor = self.descriptor(repository, tag)?;

        Ok(TagMetadata {
            size: self.total_size(&descriptor, repository),
            date: self.creation_date(&descriptor, repository, tag),
            digest: Some(descriptor.digest),
        })
    }

    /// Default-platform image of a descriptor, resolved once per aggregator.
    fn default_image(
        &mut self,
        descriptor: &ManifestDescriptor,
        repository: &Repository,
    ) -> Result<Image> {
        let transport = &self.transport;
        self.cache
            .image_or_try_insert_with(repository, descriptor, || {
                descriptor.image(transport, repository)
            })
            .cloned()
    }

    /// Compressed size of the image, summed over platforms for an index.
    fn total_size(
        &mut self,
        descriptor: &ManifestDescriptor,
        repository: &Repository,
    ) -> Option<u64> {
        let total = if descriptor.is_index() {
            self.multi_arch_size(descriptor, repository)
        } else {
            match self.default_image(descriptor, repository) {
                Ok(image) => image.total_size(),
                Err(e) => {
                    debug!("Unable to size {}: {}", descriptor.digest, e);
                    0
                }
            }
        };

        (total > 0).then_some(total)
    }

    fn multi_arch_size(&self, descriptor: &ManifestDescriptor, repository: &Repository) -> u64 {
        let digests: Vec<String> = descriptor
            .manifest
            .platforms()
            .into_iter()
            .map(|(_, platform_descriptor)| platform_descriptor.digest().to_string())
            .collect();

        if digests.is_empty() {
            return 0;
        }

        let transport = &self.transport;
        let platform_size = |digest: &String| -> u64 {
            match Image::fetch(transport, repository, digest) {
                Ok(image) => image.total_size(),
                Err(e) => {
                    debug!("Skipping platform manifest {}: {}", digest, e);
                    0
                }
            }
        };

        let threads = self.concurrency.min(digests.len()).max(1);
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| digests.par_iter().map(platform_size).sum::<u64>()),
            Err(e) => {
                debug!("Falling back to sequential platform fetches: {}", e);
                digests.iter().map(platform_size).sum()
            }
        }
    }

    /// Creation date: manifest annotation, then image configuration, with
    /// the Docker Hub push date taking precedence when available.
    fn creation_date(
        &mut self,
        descriptor: &ManifestDescriptor,
        repository: &Repository,
        tag: &str,
    ) -> Option<String> {
        let mut date = descriptor
            .annotation(ANNOTATION_CREATED)
            .map(str::to_string)
            .or_else(|| {
                self.config_file(descriptor, repository)
                    .and_then(|config| oci::created_rfc3339(&config))
            });

        if RegistryFamily::classify(repository.registry()) == RegistryFamily::DockerHub
            && !tag.is_empty()
        {
            let (organization, name) = hub_path(repository.path());
            if let Some(hub_date) = self.hub.docker_hub_tag_date(organization, name, tag) {
                date = Some(hub_date);
            }
        }

        date
    }

    fn config_file(
        &mut self,
        descriptor: &ManifestDescriptor,
        repository: &Repository,
    ) -> Option<ImageConfiguration> {
        let config = self
            .default_image(descriptor, repository)
            .and_then(|image| image.config_file());

        match config {
            Ok(config) => Some(config),
            Err(e) => {
                debug!("No image configuration for {}: {}", descriptor.digest, e);
                None
            }
        }
    }

    fn description(
        &mut self,
        reference: &ImageReference,
        repository: &Repository,
        tag: &str,
    ) -> String {
        let vendor = match reference.family() {
            RegistryFamily::DockerHub => self.hub.docker_hub_description(
                reference.organization().unwrap_or("library"),
                &reference.name,
            ),
            RegistryFamily::Quay => self
                .hub
                .quay_description(&reference.organization, &reference.name),
            _ => None,
        };

        vendor
            .or_else(|| self.label_description(repository, tag))
            .unwrap_or_else(|| NO_DESCRIPTION.to_string())
    }

    fn label_description(&mut self, repository: &Repository, tag: &str) -> Option<String> {
        let descriptor = match self.descriptor(repository, tag) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                debug!(
                    "No descriptor for label lookup on {}: {}",
                    repository.tagged(tag),
                    e
                );
                return None;
            }
        };

        self.config_file(&descriptor, repository)
            .and_then(|config| oci::description_label(&config))
    }
}

/// Splits a Docker Hub repository path into organization and name.
fn hub_path(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or(("library", path))
}
