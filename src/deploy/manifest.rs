//! Deployment manifests.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::fingerprint::Fingerprint;

/// Mapping from site path to content fingerprint for one deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, Fingerprint>,
}

impl Manifest {
    /// Creates an empty manifest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds an entry, returning the fingerprint previously stored for the path.
    pub fn insert(&mut self, path: impl Into<String>, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.entries.insert(path.into(), fingerprint)
    }

    /// Returns the fingerprint stored for a path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct fingerprints referenced by the manifest, sorted.
    #[must_use]
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.entries
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Serializes the manifest to the JSON object sent as the `manifest` form field.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_json_shape() {
        let mut manifest = Manifest::new();
        manifest.insert("/style.css", Fingerprint::new("h2"));
        manifest.insert("/index.html", Fingerprint::new("h1"));

        let json = manifest.to_json().expect("serialize");
        assert_eq!(json, r#"{"/index.html":"h1","/style.css":"h2"}"#);
    }

    #[test]
    fn test_fingerprints_are_deduplicated() {
        let mut manifest = Manifest::new();
        manifest.insert("/a.txt", Fingerprint::new("same"));
        manifest.insert("/b.txt", Fingerprint::new("same"));
        manifest.insert("/c.txt", Fingerprint::new("other"));

        assert_eq!(manifest.len(), 3);
        assert_eq!(
            manifest.fingerprints(),
            vec![Fingerprint::new("other"), Fingerprint::new("same")]
        );
    }
}
