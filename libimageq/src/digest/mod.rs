//! Content digest parsing and verification.
//!
//! Wraps `oci_spec::image::Digest` so malformed digests surface as
//! validation errors, and adds SHA-256 computation for manifests served
//! without a `Docker-Content-Digest` header.

use crate::error::{ImageqError, Result};
use oci_spec::image::Digest as OciDigest;
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::str::FromStr;


/// A content digest such as `sha256:7173b8…`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(OciDigest);

impl FromStr for Digest {
    type Err = ImageqError;

    fn from_str(s: &str) -> Result<Self> {
        let oci_digest = OciDigest::from_str(s).map_err(|e| ImageqError::Validation {
            message: format!("Invalid digest format: {}", e),
            source: Some(Box::new(e)),
        })?;
        Ok(Digest(oci_digest))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Digest {
    /// Computes the SHA-256 digest of `bytes`.
    pub fn sha256_of(bytes: &[u8]) -> Self {
        let hex = format!("{:x}", Sha256::digest(bytes));
        // A freshly computed sha256 hex string is always a valid digest.
        Digest(OciDigest::from_str(&format!("sha256:{}", hex)).expect("valid sha256 digest"))
    }

    /// Returns the algorithm part (e.g. `sha256`).
    pub fn algorithm(&self) -> String {
        self.0.algorithm().to_string()
    }

    /// Returns the encoded hash part.
    pub fn hex(&self) -> &str {
        self.0.digest()
    }

    /// Checks that `bytes` hash to this digest.
    ///
    /// Only SHA-256 is supported; other algorithms are rejected.
    pub fn verify(&self, bytes: &[u8]) -> Result<()> {
        if self.algorithm() != "sha256" {
            return Err(ImageqError::validation(format!(
                "Unsupported digest algorithm: {}. Only sha256 is currently supported",
                self.algorithm()
            )));
        }

        let computed = Self::sha256_of(bytes);
        if computed.hex() != self.hex() {
            return Err(ImageqError::validation(format!(
                "Blob digest mismatch: expected {}, computed {}",
                self, computed
            )));
        }
        Ok(())
    }
}
