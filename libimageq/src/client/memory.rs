//! In-memory [`Transport`] for offline use and tests.

use super::Transport;
use crate::digest::Digest;
use crate::error::{ImageqError, Result};
use crate::reference::Repository;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A registry held entirely in memory.
///
/// Manifests are addressable by the tag they were published under and by
/// their digest; blobs by digest.
///
/// # Examples
///
/// ```
/// use libimageq::client::{MemoryTransport, Transport};
/// use libimageq::reference::Repository;
///
/// let repository: Repository = "ghcr.io/acme/app".parse().unwrap();
/// let transport = MemoryTransport::new().with_tags(&repository, ["1.0.0", "latest"]);
/// assert_eq!(transport.list_tags(&repository).unwrap(), ["1.0.0", "latest"]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    tags: HashMap<String, Vec<String>>,
    manifests: HashMap<String, (Vec<u8>, String)>,
    blobs: HashMap<String, Vec<u8>>,
    manifest_requests: AtomicUsize,
    blob_requests: AtomicUsize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tag listing of a repository.
    pub fn with_tags<I, S>(mut self, repository: &Repository, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.insert(
            repository.to_string(),
            tags.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Publishes a manifest under `tag` and returns its digest.
    pub fn publish_manifest(
        &mut self,
        repository: &Repository,
        tag: Option<&str>,
        bytes: impl Into<Vec<u8>>,
    ) -> String {
        let bytes = bytes.into();
        let digest = Digest::sha256_of(&bytes).to_string();

        if let Some(tag) = tag {
            self.manifests
                .insert(repository.tagged(tag), (bytes.clone(), digest.clone()));
        }
        self.manifests
            .insert(format!("{}@{}", repository, digest), (bytes, digest.clone()));
        digest
    }

    /// Stores a blob and returns its digest.
    pub fn publish_blob(&mut self, bytes: impl Into<Vec<u8>>) -> String {
        let bytes = bytes.into();
        let digest = Digest::sha256_of(&bytes).to_string();
        self.blobs.insert(digest.clone(), bytes);
        digest
    }

    /// Number of manifest fetches served so far.
    pub fn manifest_requests(&self) -> usize {
        self.manifest_requests.load(Ordering::SeqCst)
    }

    /// Number of blob fetches served so far.
    pub fn blob_requests(&self) -> usize {
        self.blob_requests.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn list_tags(&self, repository: &Repository) -> Result<Vec<String>> {
        self.tags
            .get(&repository.to_string())
            .cloned()
            .ok_or_else(|| {
                let name = repository.to_string();
                ImageqError::not_found("repository", name.as_str())
            })
    }

    fn fetch_manifest(
        &self,
        repository: &Repository,
        reference: &str,
    ) -> Result<(Vec<u8>, String)> {
        self.manifest_requests.fetch_add(1, Ordering::SeqCst);

        let key = if reference.contains(':') {
            format!("{}@{}", repository, reference)
        } else {
            repository.tagged(reference)
        };

        self.manifests
            .get(&key)
            .cloned()
            .ok_or_else(|| ImageqError::not_found("manifest", key.as_str()))
    }

    fn fetch_blob(&self, _repository: &Repository, digest: &str) -> Result<Vec<u8>> {
        self.blob_requests.fetch_add(1, Ordering::SeqCst);

        self.blobs
            .get(digest)
            .cloned()
            .ok_or_else(|| ImageqError::not_found("blob", digest))
    }
}
