//! Vendor REST endpoints used to enrich registry metadata.
//!
//! Docker Hub and Quay expose repository descriptions, and Docker Hub exposes
//! per-tag push dates, through APIs outside the OCI distribution protocol.
//! Every lookup here is best effort: failures are logged and yield `None`.

use crate::error::{ImageqError, Result};
use regex::Regex;
use reqwest::blocking::Client as ReqwestClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;


/// Default Docker Hub API base URL.
pub const DEFAULT_DOCKER_HUB_URL: &str = "https://hub.docker.com";
/// Default Quay API base URL.
pub const DEFAULT_QUAY_URL: &str = "https://quay.io";

const TAG_PAGE_SIZE: usize = 100;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag pattern is valid"));

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    last_updated: Option<String>,
}

/// Client for the Docker Hub and Quay REST APIs.
#[derive(Debug, Clone)]
pub struct HubApi {
    http_client: ReqwestClient,
    docker_hub_url: String,
    quay_url: String,
}

impl HubApi {
    /// Creates a client against the public endpoints.
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        Self::with_endpoints(timeout_seconds, DEFAULT_DOCKER_HUB_URL, DEFAULT_QUAY_URL)
    }

    /// Creates a client against custom base URLs.
    pub fn with_endpoints(
        timeout_seconds: u64,
        docker_hub_url: &str,
        quay_url: &str,
    ) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("imageq/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImageqError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            docker_hub_url: docker_hub_url.trim_end_matches('/').to_string(),
            quay_url: quay_url.trim_end_matches('/').to_string(),
        })
    }

    /// Repository description from Docker Hub.
    ///
    /// `organization` is `library` for official images.
    pub fn docker_hub_description(&self, organization: &str, name: &str) -> Option<String> {
        let url = format!(
            "{}/v2/repositories/{}/{}/",
            self.docker_hub_url, organization, name
        );
        self.get_json::<RepositoryResponse>(&url)?
            .description
            .filter(|d| !d.is_empty())
    }

    /// Repository description from Quay, with HTML markup removed.
    pub fn quay_description(&self, organization: &str, name: &str) -> Option<String> {
        let url = format!(
            "{}/api/v1/repository/{}/{}",
            self.quay_url, organization, name
        );
        self.get_json::<RepositoryResponse>(&url)?
            .description
            .filter(|d| !d.is_empty())
            .map(|d| strip_html(&d))
    }

    /// Push date of `tag` according to Docker Hub.
    ///
    /// Pages through the tag listing until the tag is found.
    pub fn docker_hub_tag_date(
        &self,
        organization: &str,
        name: &str,
        tag: &str,
    ) -> Option<String> {
        let mut url = Some(format!(
            "{}/v2/repositories/{}/{}/tags/?page_size={}",
            self.docker_hub_url, organization, name, TAG_PAGE_SIZE
        ));

        while let Some(page_url) = url {
            let page = self.get_json::<TagPage>(&page_url)?;

            let found = page
                .results
                .into_iter()
                .find(|entry| entry.name == tag)
                .and_then(|entry| entry.last_updated)
                .filter(|date| !date.is_empty());
            if found.is_some() {
                return found;
            }

            url = page.next.filter(|next| !next.is_empty());
        }

        debug!(
            "Tag {} not found on Docker Hub for {}/{}",
            tag, organization, name
        );
        None
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let response = match self.http_client.get(url).send() {
            Ok(response) => response,
            Err(e) => {
                debug!("Request to {} failed: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Request to {} returned {}", url, response.status());
            return None;
        }

        match response.json::<T>() {
            Ok(body) => Some(body),
            Err(e) => {
                debug!("Unexpected response body from {}: {}", url, e);
                None
            }
        }
    }
}

/// Removes HTML tags and surrounding whitespace.
///
/// # Examples
///
/// ```
/// use libimageq::hub::strip_html;
///
/// assert_eq!(strip_html("  <p>etcd <b>key</b> store</p>\n"), "etcd key store");
/// ```
pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}
