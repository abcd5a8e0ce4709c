//! Configuration types for the uploader.
//!
//! This module defines the structs that map to the `pages.deploy.yaml` file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deploy::DEFAULT_CONCURRENCY;
use crate::pages::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploaderConfig {
    /// Pages project to deploy to.
    pub project: ProjectConfig,
    /// API connection settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Upload settings.
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Pages project identification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Account identifier.
    pub account_id: String,
    /// Pages project name.
    pub name: String,
}

/// API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Upload settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadConfig {
    /// Directory holding the built site, relative to the config file.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Maximum number of uploads in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Upload token lifetime assumed when the token has no `exp` claim.
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,
    /// How long before expiry a token is refreshed.
    #[serde(default = "default_token_safety_margin_secs")]
    pub token_safety_margin_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            concurrency: default_concurrency(),
            token_lifetime_secs: default_token_lifetime_secs(),
            token_safety_margin_secs: default_token_safety_margin_secs(),
        }
    }
}

// Default value functions

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_directory() -> PathBuf {
    PathBuf::from("public")
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

const fn default_token_lifetime_secs() -> u64 {
    300
}

const fn default_token_safety_margin_secs() -> u64 {
    60
}

impl UploaderConfig {
    /// Resolves the site directory against the directory holding the config file.
    #[must_use]
    pub fn site_dir(&self, base: &Path) -> PathBuf {
        if self.upload.directory.is_absolute() {
            self.upload.directory.clone()
        } else {
            base.join(&self.upload.directory)
        }
    }
}

impl ApiConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl UploadConfig {
    /// Default upload token lifetime.
    #[must_use]
    pub const fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }

    /// Upload token safety margin.
    #[must_use]
    pub const fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: UploaderConfig = serde_yaml::from_str(
            r"
project:
  account_id: acc-1
  name: my-site
",
        )
        .unwrap();

        assert_eq!(config.api, ApiConfig::default());
        assert_eq!(config.api.base_url, "https://api.cloudflare.com/client/v4");
        assert_eq!(config.api.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.upload.directory, PathBuf::from("public"));
        assert_eq!(config.upload.concurrency, 8);
        assert_eq!(config.upload.token_lifetime(), Duration::from_secs(300));
        assert_eq!(config.upload.token_safety_margin(), Duration::from_secs(60));
    }

    #[test]
    fn test_site_dir_resolution() {
        let mut config: UploaderConfig = serde_yaml::from_str(
            r"
project:
  account_id: acc-1
  name: my-site
upload:
  directory: dist
",
        )
        .unwrap();

        assert_eq!(config.site_dir(Path::new("/work")), PathBuf::from("/work/dist"));

        config.upload.directory = PathBuf::from("/srv/site");
        assert_eq!(config.site_dir(Path::new("/work")), PathBuf::from("/srv/site"));
    }
}
