//! Result types produced by the metadata aggregator.

use serde::{Deserialize, Serialize};

/// One tag of a repository.
///
/// Tag listings only carry the name; the other fields are filled when a
/// caller resolves per-tag metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl TagInfo {
    /// Creates a tag entry carrying only its name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Digest, size and date resolved for one `(repository, tag)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMetadata {
    /// Total compressed size in bytes, summed over platforms for an index.
    pub size: Option<u64>,
    /// Creation date as reported by the best available source.
    pub date: Option<String>,
    pub digest: Option<String>,
}

/// Aggregated answer to a `show` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub name: String,
    pub description: String,
    pub latest_tag: String,
    pub tag_date: Option<String>,
    pub size: Option<u64>,
    pub manifest_digest: Option<String>,
    /// Human registry name, e.g. `Docker Hub`.
    pub registry: String,
    pub full_image_ref: String,
}

/// A primary result together with the non-fatal problems met while building it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosed<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl<T> Diagnosed<T> {
    /// Returns true when nothing went wrong.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Splits into the value and the diagnostics.
    pub fn into_parts(self) -> (T, Vec<String>) {
        (self.value, self.diagnostics)
    }
}
