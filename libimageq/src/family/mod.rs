//! Registry family classification and per-family conventions.
//!
//! Each well-known registry vendor has its own display name and its own web
//! UI layout. The registry host is classified once into a [`RegistryFamily`]
//! and every convention is a `match` over that enum, with [`RegistryFamily::Custom`]
//! treating any unrecognized host as a first-class registry.

use crate::reference::ImageReference;
use serde::{Deserialize, Serialize};
use std::fmt;


/// Docker Hub host as written in image references.
pub const DOCKER_HUB: &str = "docker.io";
/// Docker Hub v2 API host.
pub const DOCKER_HUB_V2: &str = "registry-1.docker.io";
/// Docker Hub index host used by older clients.
pub const DOCKER_HUB_INDEX: &str = "index.docker.io";
/// GitHub Container Registry.
pub const GHCR: &str = "ghcr.io";
/// Google Container Registry (and its regional subdomains).
pub const GCR: &str = "gcr.io";
/// Amazon ECR Public.
pub const ECR_PUBLIC: &str = "ecr.aws";
/// Azure Container Registry tenant suffix.
pub const ACR: &str = "azurecr.io";
/// Red Hat Quay.
pub const QUAY: &str = "quay.io";

/// Family hosts recognized when resolving raw image strings.
pub const KNOWN_REGISTRY_HOSTS: [&str; 5] = [GHCR, GCR, ECR_PUBLIC, ACR, QUAY];

/// A registry vendor with bespoke naming and browsing conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryFamily {
    DockerHub,
    GitHub,
    Google,
    EcrPublic,
    Azure,
    Quay,
    Custom,
}

impl RegistryFamily {
    /// Classifies a registry host by suffix.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimageq::family::RegistryFamily;
    ///
    /// assert_eq!(RegistryFamily::classify(""), RegistryFamily::DockerHub);
    /// assert_eq!(RegistryFamily::classify("eu.gcr.io"), RegistryFamily::Google);
    /// assert_eq!(RegistryFamily::classify("myregistry.azurecr.io"), RegistryFamily::Azure);
    /// assert_eq!(RegistryFamily::classify("registry.example.com"), RegistryFamily::Custom);
    /// ```
    pub fn classify(registry: &str) -> Self {
        match registry {
            "" | DOCKER_HUB | DOCKER_HUB_V2 | DOCKER_HUB_INDEX => Self::DockerHub,
            host if host.ends_with(GHCR) => Self::GitHub,
            host if host.ends_with(GCR) => Self::Google,
            host if host.ends_with(ECR_PUBLIC) => Self::EcrPublic,
            host if host.ends_with(ACR) => Self::Azure,
            host if host.ends_with(QUAY) => Self::Quay,
            _ => Self::Custom,
        }
    }

    /// Fixed human label, `None` for custom registries.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::DockerHub => Some("Docker Hub"),
            Self::GitHub => Some("GitHub Container Registry"),
            Self::Google => Some("Google Container Registry"),
            Self::EcrPublic => Some("Amazon Elastic Container Registry Public"),
            Self::Azure => Some("Azure Container Registry"),
            Self::Quay => Some("Quay.io"),
            Self::Custom => None,
        }
    }
}

impl fmt::Display for RegistryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().unwrap_or("Custom registry"))
    }
}

impl ImageReference {
    /// Returns the registry family of this reference.
    pub fn family(&self) -> RegistryFamily {
        RegistryFamily::classify(&self.registry)
    }
}

/// Human-readable registry name; unrecognized hosts are echoed verbatim.
pub fn display_name(reference: &ImageReference) -> String {
    reference
        .family()
        .label()
        .map(str::to_string)
        .unwrap_or_else(|| reference.registry.clone())
}

/// Fully-qualified repository path (without tag) for transport calls.
///
/// # Examples
///
/// ```
/// use libimageq::family::full_reference;
/// use libimageq::reference::resolve;
///
/// assert_eq!(full_reference(&resolve("nginx")), "library/nginx");
/// assert_eq!(full_reference(&resolve("quay.io/coreos/etcd")), "quay.io/coreos/etcd");
/// ```
pub fn full_reference(reference: &ImageReference) -> String {
    match (reference.registry.as_str(), reference.organization.as_str()) {
        ("", "") => format!("library/{}", reference.name),
        ("", organization) => format!("{}/{}", organization, reference.name),
        (registry, "") => format!("{}/{}", registry, reference.name),
        (registry, organization) => format!("{}/{}/{}", registry, organization, reference.name),
    }
}

/// Web page for the repository, derived without network access.
pub fn browse_url(reference: &ImageReference) -> String {
    let ImageReference {
        registry,
        organization,
        name,
        ..
    } = reference;

    match reference.family() {
        RegistryFamily::DockerHub => {
            let organization: &str = if organization.is_empty() {
                "library"
            } else {
                organization
            };
            format!("https://hub.docker.com/r/{}/{}", organization, name)
        }
        RegistryFamily::GitHub => format!(
            "https://github.com/{}/{}/pkgs/container/{}",
            organization, name, name
        ),
        RegistryFamily::Google => {
            let project = if organization.is_empty() {
                registry
            } else {
                organization
            };
            format!(
                "https://console.cloud.google.com/gcr/images/{}/GLOBAL/{}",
                project, name
            )
        }
        RegistryFamily::EcrPublic => format!("https://gallery.ecr.aws/{}/{}", organization, name),
        RegistryFamily::Azure if organization.is_empty() => {
            format!("https://{}/#/repository/{}", registry, name)
        }
        RegistryFamily::Azure => format!(
            "https://{}/#/repository/{}/{}",
            registry, organization, name
        ),
        RegistryFamily::Quay => format!("https://quay.io/repository/{}/{}", organization, name),
        RegistryFamily::Custom => format!("https://{}", registry),
    }
}
