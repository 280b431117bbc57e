//! In-memory descriptor cache.
//!
//! Each metadata aggregator owns one cache. Descriptors are keyed by the
//! fully-qualified repository and tag, resolved images by repository and
//! descriptor digest. Entries are populated on first lookup and kept for the
//! aggregator's lifetime.

use crate::error::Result;
use crate::oci::{Image, ManifestDescriptor};
use crate::reference::Repository;
use std::collections::HashMap;
use tracing::debug;


/// Hit and miss counters of a [`DescriptorCache`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Memoizes manifest descriptors by `"<registry>/<repository>:<tag>"`, and
/// the image each descriptor resolves to.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: HashMap<String, ManifestDescriptor>,
    images: HashMap<String, Image>,
    hits: u64,
    misses: u64,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a repository and tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimageq::cache::DescriptorCache;
    ///
    /// let repository = "nginx".parse().unwrap();
    /// let key = DescriptorCache::key(&repository, "latest");
    /// assert_eq!(key, "docker.io/library/nginx:latest");
    /// ```
    pub fn key(repository: &Repository, tag: &str) -> String {
        repository.tagged(tag)
    }

    /// Returns the cached descriptor for `key`, or runs `fetch` and stores
    /// its result. Failed fetches are not cached.
    pub fn get_or_try_insert_with<F>(
        &mut self,
        key: &str,
        fetch: F,
    ) -> Result<&ManifestDescriptor>
    where
        F: FnOnce() -> Result<ManifestDescriptor>,
    {
        if self.entries.contains_key(key) {
            self.hits += 1;
            debug!("Descriptor cache hit for {}", key);
        } else {
            self.misses += 1;
            debug!("Descriptor cache miss for {}", key);
            let descriptor = fetch()?;
            self.entries.insert(key.to_string(), descriptor);
        }

        Ok(&self.entries[key])
    }

    /// Returns the image resolved from `descriptor`, or runs `resolve` and
    /// stores its result. Failures are not cached.
    pub fn image_or_try_insert_with<F>(
        &mut self,
        repository: &Repository,
        descriptor: &ManifestDescriptor,
        resolve: F,
    ) -> Result<&Image>
    where
        F: FnOnce() -> Result<Image>,
    {
        let key = format!("{}@{}", repository, descriptor.digest);
        if !self.images.contains_key(&key) {
            debug!("Resolving image for {}", key);
            let image = resolve()?;
            self.images.insert(key.clone(), image);
        }

        Ok(&self.images[&key])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
