//! Content fingerprints for deduplication.
//!
//! A fingerprint is both the deduplication key and the storage key of an asset
//! on the Pages content store, so it depends on the file bytes only.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of digest bytes kept in a fingerprint (32 hex characters).
const FINGERPRINT_BYTES: usize = 16;

/// Fingerprint of an asset's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps a fingerprint string received from the API.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first 8 characters for display purposes.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hasher for computing content fingerprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHasher;

impl ContentHasher {
    /// Creates a new content hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a file's bytes.
    ///
    /// The first 128 bits of the SHA-256 digest, hex encoded.
    #[must_use]
    pub fn fingerprint(&self, content: &[u8]) -> Fingerprint {
        let digest = Sha256::digest(content);
        Fingerprint(hex::encode(&digest[..FINGERPRINT_BYTES]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bytes_same_fingerprint() {
        let hasher = ContentHasher::new();
        let index = hasher.fingerprint(b"<h1>hello</h1>");
        let copy = hasher.fingerprint(b"<h1>hello</h1>");

        assert_eq!(index, copy);
    }

    #[test]
    fn test_different_bytes_different_fingerprint() {
        let hasher = ContentHasher::new();
        let a = hasher.fingerprint(b"body { color: red }");
        let b = hasher.fingerprint(b"body { color: blue }");

        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_is_fixed_length_hex() {
        let hasher = ContentHasher::new();
        let inputs: [&[u8]; 3] = [b"", b"a", &[0u8; 4096]];
        for content in inputs {
            let fp = hasher.fingerprint(content);
            assert_eq!(fp.as_str().len(), 32);
            assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_known_digest_prefix() {
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb924...
        let fp = ContentHasher::new().fingerprint(b"");
        assert_eq!(fp.as_str(), "e3b0c44298fc1c149afbf4c8996fb924");
        assert_eq!(fp.short(), "e3b0c442");
    }
}
