//! Image reference resolution.
//!
//! Container image strings are ambiguous: `nginx`, `nginxinc/nginx` and
//! `ghcr.io/actions/checkout` all have different shapes, and only lexical
//! heuristics can tell a registry host from an organization. [`resolve`] turns
//! any raw string into an [`ImageReference`] without ever failing.
//!
//! [`Repository`] is the validated, fully-qualified form handed to the
//! registry transport. It wraps `oci_spec::distribution::Reference` so that a
//! malformed path is rejected before any request is made.

use crate::error::{ImageqError, Result};
use crate::family::KNOWN_REGISTRY_HOSTS;
use oci_spec::distribution::Reference as OciReference;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;


/// Structured form of a raw image string.
///
/// An empty `registry` means the default public hub. `name` is the only field
/// that is non-empty for every non-empty input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    pub registry: String,
    pub organization: String,
    pub name: String,
    pub tag: String,
}

impl ImageReference {
    /// Creates a reference from its parts.
    pub fn new(
        registry: impl Into<String>,
        organization: impl Into<String>,
        name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            organization: organization.into(),
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Returns the tag, if one was given.
    pub fn tag(&self) -> Option<&str> {
        (!self.tag.is_empty()).then_some(self.tag.as_str())
    }

    /// Returns the organization, if one was given.
    pub fn organization(&self) -> Option<&str> {
        (!self.organization.is_empty()).then_some(self.organization.as_str())
    }
}

impl FromStr for ImageReference {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(resolve(s))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.registry.is_empty() {
            write!(f, "{}/", self.registry)?;
        }
        if !self.organization.is_empty() {
            write!(f, "{}/", self.organization)?;
        }
        f.write_str(&self.name)?;
        if !self.tag.is_empty() {
            write!(f, ":{}", self.tag)?;
        }
        Ok(())
    }
}

/// Resolves a raw image string into an [`ImageReference`].
///
/// # Examples
///
/// ```
/// use libimageq::reference::resolve;
///
/// let reference = resolve("ghcr.io/actions/checkout:v4");
/// assert_eq!(reference.registry, "ghcr.io");
/// assert_eq!(reference.organization, "actions");
/// assert_eq!(reference.name, "checkout");
/// assert_eq!(reference.tag, "v4");
///
/// let bare = resolve("nginx");
/// assert_eq!(bare.name, "nginx");
/// assert!(bare.registry.is_empty());
/// ```
pub fn resolve(raw: &str) -> ImageReference {
    let mut reference = ImageReference::default();

    // A colon only separates a tag when it comes after the last slash,
    // otherwise it belongs to a registry port.
    let path = match (raw.rfind(':'), raw.rfind('/')) {
        (Some(colon), slash) if slash.is_none_or(|s| colon > s) => {
            reference.tag = raw[colon + 1..].to_string();
            &raw[..colon]
        }
        _ => raw,
    };

    let Some((first, rest)) = path.split_once('/') else {
        reference.name = path.to_string();
        return reference;
    };

    if looks_like_registry(first) {
        reference.registry = first.to_string();
        match rest.split_once('/') {
            Some((organization, name)) => {
                reference.organization = organization.to_string();
                reference.name = name.to_string();
            }
            None => reference.name = rest.to_string(),
        }
        return reference;
    }

    // Hub convention: everything after the organization is the name, nested
    // paths included.
    reference.organization = first.to_string();
    reference.name = rest.to_string();
    reference
}

/// A first path segment names a registry when it carries a host marker or
/// starts with one of the known family hosts.
fn looks_like_registry(segment: &str) -> bool {
    segment.contains('.')
        || segment.contains(':')
        || KNOWN_REGISTRY_HOSTS
            .iter()
            .any(|host| segment.starts_with(host))
}

/// A validated repository path as understood by the registry transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    registry: String,
    path: String,
}

impl FromStr for Repository {
    type Err = ImageqError;

    fn from_str(s: &str) -> Result<Self> {
        let last_segment = s.rsplit('/').next().unwrap_or(s);
        if last_segment.contains(':') || s.contains('@') {
            return Err(ImageqError::validation(format!(
                "Invalid image reference '{}': expected a repository without tag or digest",
                s
            )));
        }

        let oci_reference = OciReference::from_str(s).map_err(|e| ImageqError::Validation {
            message: format!("Invalid image reference '{}': {}", s, e),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            registry: oci_reference.registry().to_string(),
            path: oci_reference.repository().to_string(),
        })
    }
}

impl Repository {
    /// Returns the registry host (e.g. `docker.io`, `ghcr.io`).
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Returns the repository path within the registry (e.g. `library/nginx`).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `<registry>/<path>:<tag>`.
    pub fn tagged(&self, tag: &str) -> String {
        format!("{}:{}", self, tag)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.path)
    }
}
