//! HTTP transport for OCI registry communication.
//!
//! [`Transport`] is the seam the metadata aggregator reads through: list tags,
//! fetch a manifest, fetch a blob. [`Client`] implements it over the OCI
//! Distribution v2 API with reqwest's blocking client, and
//! answers the `WWW-Authenticate` token challenge registries send even for
//! anonymous pulls.

use crate::auth::{AuthChallenge, Credentials, TokenResponse};
use crate::digest::Digest;
use crate::error::{ImageqError, Result};
use crate::family::{DOCKER_HUB, DOCKER_HUB_INDEX, DOCKER_HUB_V2};
use crate::oci::MANIFEST_ACCEPT;
use crate::reference::Repository;
use reqwest::StatusCode;
use reqwest::blocking::{Client as ReqwestClient, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, LINK, RETRY_AFTER, WWW_AUTHENTICATE};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

mod memory;

pub use memory::MemoryTransport;

#[cfg(test)]
mod tests;

/// Read access to a container registry.
///
/// Implementations must be shareable across threads: multi-platform sizes
/// are computed by fetching platform manifests in parallel.
pub trait Transport: Sync {
    /// Lists every tag of the repository.
    fn list_tags(&self, repository: &Repository) -> Result<Vec<String>>;

    /// Fetches a manifest by tag or digest, returning its bytes and digest.
    fn fetch_manifest(
        &self,
        repository: &Repository,
        reference: &str,
    ) -> Result<(Vec<u8>, String)>;

    /// Fetches a blob by digest.
    fn fetch_blob(&self, repository: &Repository, digest: &str) -> Result<Vec<u8>>;
}

/// Response from the tags list API endpoint.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Configuration for the HTTP client.
///
/// # Examples
///
/// ```
/// use libimageq::auth::Credentials;
/// use libimageq::client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_timeout(60)
///     .with_insecure_registry("registry.internal:5000")
///     .with_credentials("ghcr.io", Credentials::bearer("token"));
/// assert_eq!(config.timeout_seconds, 60);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
    /// Registries reached over plain HTTP in addition to local hosts
    pub insecure_registries: Vec<String>,
    /// Credentials keyed by registry host
    pub credentials: HashMap<String, Credentials>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
            insecure_registries: Vec::new(),
            credentials: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }

    /// Marks a registry as reachable over plain HTTP.
    pub fn with_insecure_registry(mut self, registry: impl Into<String>) -> Self {
        self.insecure_registries.push(registry.into());
        self
    }

    /// Registers credentials for a registry host.
    pub fn with_credentials(
        mut self,
        registry: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        self.credentials.insert(registry.into(), credentials);
        self
    }
}

/// HTTP client for OCI registry operations.
///
/// One client serves every registry; the endpoint is derived from the
/// repository being queried. Bearer tokens are cached per repository for the
/// lifetime of the client.
#[derive(Debug)]
pub struct Client {
    http_client: ReqwestClient,
    config: ClientConfig,
    tokens: Mutex<HashMap<String, String>>,
}

impl Client {
    /// Creates a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimageq::client::{Client, ClientConfig};
    ///
    /// let client = Client::with_config(ClientConfig::new().with_timeout(10)).unwrap();
    /// assert_eq!(client.base_url("docker.io"), "https://registry-1.docker.io");
    /// ```
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(concat!("imageq/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImageqError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            config,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the v2 API base URL for a registry host.
    ///
    /// Docker Hub aliases map to `registry-1.docker.io`. Local hosts and
    /// registries configured as insecure use `http`, everything else `https`.
    pub fn base_url(&self, registry: &str) -> String {
        let registry = match registry {
            "" | DOCKER_HUB | DOCKER_HUB_INDEX => DOCKER_HUB_V2,
            other => other,
        };

        let scheme = if self.is_insecure(registry) {
            "http"
        } else {
            "https"
        };
        format!("{}://{}", scheme, registry.trim_end_matches('/'))
    }

    fn is_insecure(&self, registry: &str) -> bool {
        let host = host_of(registry);
        host == "localhost"
            || host.starts_with("127.")
            || host == "[::1]"
            || host.ends_with(".local")
            || self
                .config
                .insecure_registries
                .iter()
                .any(|r| r == registry || r == host)
    }

    fn credentials_for(&self, registry: &str) -> Option<&Credentials> {
        self.config.credentials.get(registry)
    }

    fn cached_token(&self, key: &str) -> Option<String> {
        let tokens = match self.tokens.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tokens.get(key).cloned()
    }

    fn store_token(&self, key: String, token: String) {
        let mut tokens = match self.tokens.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tokens.insert(key, token);
    }

    /// Authorization sent on the first attempt: a cached token, or a
    /// pre-issued bearer token from the configuration.
    fn initial_authorization(&self, repository: &Repository) -> Option<String> {
        if let Some(token) = self.cached_token(&repository.to_string()) {
            return Some(format!("Bearer {}", token));
        }
        match self.credentials_for(repository.registry()) {
            Some(creds @ Credentials::Bearer { .. }) => creds.to_header_value(),
            _ => None,
        }
    }

    fn send(
        &self,
        url: &str,
        accept: Option<&str>,
        authorization: Option<&str>,
    ) -> Result<Response> {
        trace!("GET {}", url);
        let mut request = self.http_client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        request
            .send()
            .map_err(|e| self.translate_reqwest_error(e, url))
    }

    /// Performs an authenticated GET, answering one auth challenge.
    fn get(&self, repository: &Repository, url: &str, accept: Option<&str>) -> Result<Response> {
        let authorization = self.initial_authorization(repository);
        let response = self.send(url, accept, authorization.as_deref())?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_response_status(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| AuthChallenge::parse(v).ok());

        let retry_authorization = match challenge {
            Some(challenge) => self.answer_challenge(repository, &challenge)?,
            None => None,
        };

        match retry_authorization {
            Some(authorization) => {
                debug!("Retrying {} after auth challenge", url);
                let response = self.send(url, accept, Some(&authorization))?;
                Self::check_response_status(response)
            }
            None => Self::check_response_status(response),
        }
    }

    /// Returns the Authorization header to retry with, if the challenge can
    /// be answered.
    fn answer_challenge(
        &self,
        repository: &Repository,
        challenge: &AuthChallenge,
    ) -> Result<Option<String>> {
        let credentials = self.credentials_for(repository.registry());

        if !challenge.is_bearer() {
            return Ok(match credentials {
                Some(creds @ Credentials::Basic { .. }) => creds.to_header_value(),
                _ => None,
            });
        }

        let token = self.fetch_token(repository, challenge, credentials)?;
        self.store_token(repository.to_string(), token.clone());
        Ok(Some(format!("Bearer {}", token)))
    }

    fn fetch_token(
        &self,
        repository: &Repository,
        challenge: &AuthChallenge,
        credentials: Option<&Credentials>,
    ) -> Result<String> {
        let scope = challenge.pull_scope(repository.path());
        debug!("Requesting token from {} for {}", challenge.realm, scope);

        let mut query = vec![("scope", scope.as_str())];
        if let Some(service) = &challenge.service {
            query.push(("service", service.as_str()));
        }

        let mut request = self.http_client.get(&challenge.realm).query(&query);
        if let Some(Credentials::Basic { username, password }) = credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .map_err(|e| self.translate_reqwest_error(e, &challenge.realm))?;
        let response = Self::check_response_status(response)?;

        let token: TokenResponse = response.json().map_err(|e| {
            ImageqError::validation_with_source("Failed to parse token response", e)
        })?;

        token.into_token().ok_or_else(|| {
            ImageqError::authentication(
                format!("Token service {} returned no token", challenge.realm),
                None,
            )
        })
    }

    /// Extracts the next page URL from the Link header.
    ///
    /// `Link: </v2/<name>/tags/list?n=100&last=v1>; rel="next"`
    fn extract_next_link(headers: &HeaderMap) -> Option<String> {
        let link_str = headers.get(LINK)?.to_str().ok()?;

        for link_part in link_str.split(',') {
            let link_part = link_part.trim();

            if link_part.contains("rel=\"next\"") || link_part.contains("rel='next'") {
                if let Some(start) = link_part.find('<')
                    && let Some(end) = link_part.find('>')
                {
                    return Some(link_part[start + 1..end].to_string());
                }
            }
        }

        None
    }

    /// Translates a reqwest error into an ImageqError.
    fn translate_reqwest_error(&self, error: reqwest::Error, url: &str) -> ImageqError {
        if error.is_timeout() {
            ImageqError::network(format!(
                "Request to {} timed out after {} seconds",
                url, self.config.timeout_seconds
            ))
        } else if error.is_connect() {
            ImageqError::network_with_source(format!("Failed to connect to {}", url), error)
        } else if error.is_request() {
            ImageqError::network_with_source(format!("Failed to send request to {}", url), error)
        } else {
            ImageqError::network_with_source(
                format!("Network error communicating with {}", url),
                error,
            )
        }
    }

    /// Checks the HTTP response status and translates errors to ImageqError.
    fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let retry_after = parse_retry_after(response.headers());
        let error_body = response
            .text()
            .unwrap_or_else(|_| String::from("(unable to read response body)"));

        match status {
            StatusCode::UNAUTHORIZED => Err(ImageqError::authentication(
                format!("Authentication required for {}: {}", url, error_body),
                Some(401),
            )),
            StatusCode::FORBIDDEN => Err(ImageqError::authentication(
                format!("Access forbidden for {}: {}", url, error_body),
                Some(403),
            )),
            StatusCode::NOT_FOUND => Err(ImageqError::not_found("endpoint", url.as_str())),
            StatusCode::TOO_MANY_REQUESTS => Err(ImageqError::rate_limit(
                format!("Rate limit exceeded for {}", url),
                retry_after,
            )),
            status if status.is_server_error() => Err(ImageqError::server(
                format!("Server error from {}: {}", url, error_body),
                status.as_u16(),
            )),
            _ => Err(ImageqError::network(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                url,
                error_body
            ))),
        }
    }
}

impl Transport for Client {
    fn list_tags(&self, repository: &Repository) -> Result<Vec<String>> {
        let base = self.base_url(repository.registry());
        let mut url = format!("{}/v2/{}/tags/list", base, repository.path());
        let mut all_tags = Vec::new();

        loop {
            let response = self.get(repository, &url, None)?;
            let next_path = Self::extract_next_link(response.headers());

            let tags_response: TagsResponse = response.json().map_err(|e| {
                ImageqError::validation_with_source("Failed to parse tags response", e)
            })?;

            if !tags_response.name.is_empty() && tags_response.name != repository.path() {
                debug!(
                    "Registry answered for '{}' while listing '{}'",
                    tags_response.name,
                    repository.path()
                );
            }

            all_tags.extend(tags_response.tags.unwrap_or_default());

            match next_path {
                Some(next) if next.starts_with("http://") || next.starts_with("https://") => {
                    url = next
                }
                Some(path) => url = format!("{}{}", base, path),
                None => break,
            }
        }

        debug!("Listed {} tags for {}", all_tags.len(), repository);
        Ok(all_tags)
    }

    fn fetch_manifest(
        &self,
        repository: &Repository,
        reference: &str,
    ) -> Result<(Vec<u8>, String)> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.base_url(repository.registry()),
            repository.path(),
            reference
        );
        let accept = MANIFEST_ACCEPT.join(", ");

        let response = self.get(repository, &url, Some(&accept))?;

        let header_digest = response
            .headers()
            .get("Docker-Content-Digest")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let manifest_bytes = response.bytes().map_err(|e| {
            ImageqError::network_with_source("Failed to read manifest response", e)
        })?;

        let digest = match header_digest {
            Some(digest) => digest,
            None => Digest::sha256_of(&manifest_bytes).to_string(),
        };

        Ok((manifest_bytes.to_vec(), digest))
    }

    fn fetch_blob(&self, repository: &Repository, digest: &str) -> Result<Vec<u8>> {
        let expected_digest = Digest::from_str(digest)?;

        let url = format!(
            "{}/v2/{}/blobs/{}",
            self.base_url(repository.registry()),
            repository.path(),
            digest
        );

        let response = self.get(repository, &url, None)?;
        let blob_bytes = response
            .bytes()
            .map_err(|e| ImageqError::network_with_source("Failed to read blob response", e))?;

        expected_digest.verify(&blob_bytes)?;

        Ok(blob_bytes.to_vec())
    }
}

/// Host part of a registry, without port.
fn host_of(registry: &str) -> &str {
    if registry.starts_with('[') {
        return registry
            .find(']')
            .map(|end| &registry[..=end])
            .unwrap_or(registry);
    }
    registry.split(':').next().unwrap_or(registry)
}

/// Parses a `Retry-After` header given in seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}
