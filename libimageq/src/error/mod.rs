//! Error types for imageq
//!
//! Every fallible operation in the library returns [`ImageqError`]. Transport
//! failures keep the HTTP status semantics of the registry that produced them,
//! while tag-selection failures get their own variants so callers can tell
//! "repository has no tags" apart from "repository has no versioned tags".

use thiserror::Error;


/// Main error type for imageq operations
#[derive(Error, Debug)]
pub enum ImageqError {
    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors (401, 403, token issues)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Resource not found errors (404)
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (500, 503)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Validation errors (malformed reference, digest mismatch, etc.)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The repository exists but lists no tags at all
    #[error("no tags found for image '{image}'")]
    NoTagsFound { image: String },

    /// The repository has tags but none of them is a semantic version
    #[error("no semantic version tags found for image '{image}'")]
    NoSemverTags { image: String },

    /// Configuration errors (invalid config file, missing settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for imageq operations
pub type Result<T> = std::result::Result<T, ImageqError>;

impl ImageqError {
    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimageq::error::ImageqError;
    ///
    /// let err = ImageqError::network("connection refused");
    /// assert!(matches!(err, ImageqError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new not found error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimageq::error::ImageqError;
    ///
    /// let err = ImageqError::not_found("manifest", "library/nginx:latest");
    /// assert!(matches!(err, ImageqError::NotFound { .. }));
    /// ```
    pub fn not_found<S: Into<String>>(resource_type: S, name: S) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new server error.
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimageq::error::ImageqError;
    ///
    /// let err = ImageqError::validation("invalid manifest format");
    /// assert!(matches!(err, ImageqError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an error for a repository that lists no tags.
    pub fn no_tags<S: Into<String>>(image: S) -> Self {
        Self::NoTagsFound {
            image: image.into(),
        }
    }

    /// Creates an error for a repository whose tags are all unversioned.
    pub fn no_semver_tags<S: Into<String>>(image: S) -> Self {
        Self::NoSemverTags {
            image: image.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true for failures raised by the registry transport.
    ///
    /// These are the errors `get_image_info` tolerates while enriching a tag.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Authentication { .. }
                | Self::NotFound { .. }
                | Self::RateLimit { .. }
                | Self::Server { .. }
        )
    }
}

impl From<config::ConfigError> for ImageqError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Failed to build configuration", None, error)
    }
}
