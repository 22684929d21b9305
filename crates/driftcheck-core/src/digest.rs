//! Content digests for compiler artifacts.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest as Sha2Digest, Sha256};

/// SHA-256 digest of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Compute the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    /// Hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Returned when a string is not a 64-char hex SHA-256 digest.
#[derive(Debug, thiserror::Error)]
#[error("invalid digest hex: {0}")]
pub struct InvalidDigest(pub String);

impl FromStr for Digest {
    type Err = InvalidDigest;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| InvalidDigest(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(InvalidDigest(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// The `contentHash` recorded for an artifact.
///
/// An empty artifact hashes to the empty string, not to the SHA-256 of zero
/// bytes. Baselines written by failed compilations rely on this.
pub fn content_hash(artifact: &[u8]) -> String {
    if artifact.is_empty() {
        String::new()
    } else {
        Digest::compute(artifact).to_hex()
    }
}
