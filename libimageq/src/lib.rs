//! imageq - Container Image Metadata Library
//!
//! libimageq turns loosely written container image references such as
//! `nginx`, `bitnami/redis:7.2` or `ghcr.io/actions/checkout:v4` into
//! structured references, and gathers what registries know about them: the
//! tags, the newest semantic version, and per-tag digest, size, creation
//! date and description.
//!
//! # Quick Start
//!
//! ```no_run
//! use libimageq::ImageQuery;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut query = ImageQuery::connect()?;
//!
//!     for tag in query.tags("quay.io/prometheus/prometheus")?.iter().take(5) {
//!         println!("{}", tag.name);
//!     }
//!
//!     let info = query.show("nginx")?.value;
//!     println!("{} on {}", info.full_image_ref, info.registry);
//!     Ok(())
//! }
//! ```
//!
//! # Main Types
//!
//! - [`ImageQuery`] - Entry point taking raw image strings
//! - [`ImageReference`] - A resolved `registry/organization/name:tag`
//! - [`RegistryFamily`] - Registry vendor and its naming conventions
//! - [`MetadataAggregator`] - Tags, sizes, dates and descriptions over a [`Transport`]
//! - [`Diagnosed`] - A result together with non-fatal diagnostics
//!
//! # Architecture
//!
//! Resolution, registry classification and tag ranking are pure and never
//! touch the network. Everything that does goes through the [`Transport`]
//! trait, implemented over HTTP by [`client::Client`] and in memory by
//! [`client::MemoryTransport`].

#![warn(clippy::all)]

/// Returns the libimageq crate version.
///
/// # Examples
///
/// ```
/// let version = libimageq::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

mod query;
pub use query::{ImageQuery, ImageQueryBuilder};

pub use auth::Credentials;
pub use client::Transport;
pub use config::Config;
pub use error::{ImageqError, Result};
pub use family::RegistryFamily;
pub use metadata::{Diagnosed, ImageInfo, MetadataAggregator, TagInfo, TagMetadata};
pub use reference::{ImageReference, resolve};

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod family;
pub mod format;
pub mod hub;
pub mod metadata;
pub mod oci;
pub mod ranking;
pub mod reference;
