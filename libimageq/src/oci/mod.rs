//! OCI manifest, index and configuration handling.
//!
//! Re-exports the `oci-spec` types used across `libimageq` and builds the
//! descriptor and image views that the metadata aggregator reads from.

pub use oci_spec::image::{Descriptor, ImageConfiguration, ImageIndex, ImageManifest, Platform};

use crate::client::Transport;
use crate::error::{ImageqError, Result};
use crate::reference::Repository;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use tracing::debug;


/// OCI image index media type.
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
/// OCI image manifest media type.
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
/// Docker manifest list media type.
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
/// Docker image manifest media type.
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str =
    "application/vnd.docker.distribution.manifest.v2+json";

/// Media types sent in the `Accept` header of manifest requests.
pub const MANIFEST_ACCEPT: [&str; 4] = [
    MEDIA_TYPE_OCI_INDEX,
    MEDIA_TYPE_OCI_MANIFEST,
    MEDIA_TYPE_DOCKER_MANIFEST_LIST,
    MEDIA_TYPE_DOCKER_MANIFEST,
];

/// Annotation carrying the image creation timestamp.
pub const ANNOTATION_CREATED: &str = "org.opencontainers.image.created";
/// Label keys consulted for a description, in order.
pub const DESCRIPTION_LABELS: [&str; 3] = [
    "org.opencontainers.image.description",
    "description",
    "org.opencontainers.image.title",
];

/// Platform preferred when a single image must be picked from an index.
pub const DEFAULT_OS: &str = "linux";
pub const DEFAULT_ARCH: &str = "amd64";

/// Represents either a single-platform image manifest or a multi-platform image index.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum ManifestOrIndex {
    /// A single-platform image manifest
    Manifest(ImageManifest),
    /// A multi-platform image index
    Index(ImageIndex),
}

impl ManifestOrIndex {
    /// Parse manifest bytes, detecting whether they hold a manifest or an index.
    ///
    /// The `mediaType` field decides when present; otherwise the presence of a
    /// `manifests` array marks an index.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| ImageqError::validation_with_source("Failed to parse manifest JSON", e))?;

        let media_type = value
            .get("mediaType")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let is_index = if media_type.is_empty() {
            value.get("manifests").is_some()
        } else {
            is_index_media_type(media_type)
        };

        if is_index {
            let index: ImageIndex = serde_json::from_slice(bytes).map_err(|e| {
                ImageqError::validation_with_source("Failed to parse image index", e)
            })?;
            Ok(ManifestOrIndex::Index(index))
        } else if !media_type.is_empty()
            || value.get("layers").is_some()
            || value.get("config").is_some()
        {
            let manifest: ImageManifest = serde_json::from_slice(bytes).map_err(|e| {
                ImageqError::validation_with_source("Failed to parse image manifest", e)
            })?;
            Ok(ManifestOrIndex::Manifest(manifest))
        } else {
            Err(ImageqError::validation(
                "Unable to determine if content is a manifest or index",
            ))
        }
    }

    /// Returns true if this is a multi-platform index.
    pub fn is_index(&self) -> bool {
        matches!(self, ManifestOrIndex::Index(_))
    }

    /// Top-level annotations of the manifest or index.
    pub fn annotations(&self) -> Option<&HashMap<String, String>> {
        match self {
            ManifestOrIndex::Manifest(m) => m.annotations().as_ref(),
            ManifestOrIndex::Index(i) => i.annotations().as_ref(),
        }
    }

    /// Index entries that carry a platform; empty for a single manifest.
    pub fn platforms(&self) -> Vec<(&Platform, &Descriptor)> {
        match self {
            ManifestOrIndex::Manifest(_) => vec![],
            ManifestOrIndex::Index(index) => index
                .manifests()
                .iter()
                .filter_map(|desc| desc.platform().as_ref().map(|platform| (platform, desc)))
                .collect(),
        }
    }

    /// Find a manifest descriptor for a specific platform.
    pub fn find_platform(&self, os: &str, arch: &str) -> Option<&Descriptor> {
        self.platforms()
            .into_iter()
            .find(|(p, _)| p.os().to_string() == os && p.architecture().to_string() == arch)
            .map(|(_, desc)| desc)
    }
}

/// Returns true for OCI index and Docker manifest list media types.
pub fn is_index_media_type(media_type: &str) -> bool {
    media_type == MEDIA_TYPE_OCI_INDEX
        || media_type == MEDIA_TYPE_DOCKER_MANIFEST_LIST
        || media_type.contains("index")
        || media_type.contains("manifest.list")
}

/// The manifest (or index) a tag points at, with its content digest.
#[derive(Debug, Clone)]
pub struct ManifestDescriptor {
    pub digest: String,
    pub media_type: String,
    pub manifest: ManifestOrIndex,
}

impl ManifestDescriptor {
    /// Fetches and parses the manifest for `reference` (a tag or digest).
    pub fn fetch<T: Transport + ?Sized>(
        transport: &T,
        repository: &Repository,
        reference: &str,
    ) -> Result<Self> {
        let (bytes, digest) = transport.fetch_manifest(repository, reference)?;
        Self::from_bytes(&bytes, digest)
    }

    /// Builds a descriptor from raw manifest bytes and their digest.
    pub fn from_bytes(bytes: &[u8], digest: String) -> Result<Self> {
        let manifest = ManifestOrIndex::from_bytes(bytes)?;
        let media_type = serde_json::from_slice::<serde_json::Value>(bytes)
            .ok()
            .and_then(|v| v.get("mediaType").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| match manifest {
                ManifestOrIndex::Index(_) => MEDIA_TYPE_OCI_INDEX.to_string(),
                ManifestOrIndex::Manifest(_) => MEDIA_TYPE_OCI_MANIFEST.to_string(),
            });

        Ok(Self {
            digest,
            media_type,
            manifest,
        })
    }

    /// Returns true when the descriptor points at a multi-platform index.
    pub fn is_index(&self) -> bool {
        is_index_media_type(&self.media_type) || self.manifest.is_index()
    }

    /// Looks up a top-level annotation.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.manifest
            .annotations()
            .and_then(|a| a.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Resolves the single image this descriptor stands for.
    ///
    /// For an index the `linux/amd64` entry is used, falling back to the first
    /// entry that carries a platform.
    pub fn image<T: Transport + ?Sized>(
        &self,
        transport: &T,
        repository: &Repository,
    ) -> Result<Image> {
        match &self.manifest {
            ManifestOrIndex::Manifest(manifest) => {
                Image::from_manifest(transport, repository, manifest.clone())
            }
            ManifestOrIndex::Index(_) => {
                let descriptor = self
                    .manifest
                    .find_platform(DEFAULT_OS, DEFAULT_ARCH)
                    .or_else(|| self.manifest.platforms().first().map(|(_, d)| *d))
                    .ok_or_else(|| {
                        let name = format!("{}@{}", repository, self.digest);
                        ImageqError::not_found("platform manifest", name.as_str())
                    })?;
                debug!("Resolving index {} via {}", self.digest, descriptor.digest());
                Image::fetch(transport, repository, &descriptor.digest().to_string())
            }
        }
    }
}

/// A single-platform image: its manifest plus the raw configuration blob.
#[derive(Debug, Clone)]
pub struct Image {
    pub manifest: ImageManifest,
    pub raw_config: Vec<u8>,
}

impl Image {
    /// Fetches a platform manifest by digest and its configuration blob.
    pub fn fetch<T: Transport + ?Sized>(
        transport: &T,
        repository: &Repository,
        digest: &str,
    ) -> Result<Self> {
        let (bytes, _) = transport.fetch_manifest(repository, digest)?;
        match ManifestOrIndex::from_bytes(&bytes)? {
            ManifestOrIndex::Manifest(manifest) => {
                Self::from_manifest(transport, repository, manifest)
            }
            ManifestOrIndex::Index(_) => Err(ImageqError::validation(format!(
                "Expected an image manifest at {}@{}, found an index",
                repository, digest
            ))),
        }
    }

    fn from_manifest<T: Transport + ?Sized>(
        transport: &T,
        repository: &Repository,
        manifest: ImageManifest,
    ) -> Result<Self> {
        let config_digest = manifest.config().digest().to_string();
        let raw_config = transport.fetch_blob(repository, &config_digest)?;
        Ok(Self {
            manifest,
            raw_config,
        })
    }

    /// Compressed size of each layer as listed in the manifest.
    pub fn layer_sizes(&self) -> Vec<u64> {
        self.manifest.layers().iter().map(|layer| layer.size()).collect()
    }

    /// Layer sizes plus the length of the raw configuration blob.
    pub fn total_size(&self) -> u64 {
        self.layer_sizes().iter().sum::<u64>() + self.raw_config.len() as u64
    }

    /// Parses the configuration blob.
    pub fn config_file(&self) -> Result<ImageConfiguration> {
        serde_json::from_slice(&self.raw_config).map_err(|e| {
            ImageqError::validation_with_source("Failed to parse image configuration", e)
        })
    }
}

/// `0001-01-01T00:00:00Z` as Unix seconds, written by builders that leave
/// the creation time unset.
const ZERO_TIME_SECONDS: i64 = -62_135_596_800;

/// Creation timestamp of a configuration, normalized to RFC 3339 in UTC.
///
/// Missing, unparseable and zero timestamps yield `None`.
pub fn created_rfc3339(config: &ImageConfiguration) -> Option<String> {
    let created = config.created().as_deref()?.trim();
    let timestamp = match DateTime::parse_from_rfc3339(created) {
        Ok(timestamp) => timestamp.with_timezone(&Utc),
        Err(e) => {
            if !created.is_empty() {
                debug!("Ignoring creation time '{}': {}", created, e);
            }
            return None;
        }
    };

    if timestamp.timestamp() == ZERO_TIME_SECONDS {
        return None;
    }
    Some(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// First non-empty description label of a configuration.
pub fn description_label(config: &ImageConfiguration) -> Option<String> {
    let labels = config.config().as_ref()?.labels().as_ref()?;
    DESCRIPTION_LABELS
        .iter()
        .filter_map(|key| labels.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
