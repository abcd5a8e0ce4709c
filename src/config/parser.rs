//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, PagesError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::UploaderConfig;

/// Environment variable holding the project API key.
pub const API_TOKEN_VAR: &str = "CLOUDFLARE_API_TOKEN";

/// Configuration parser for loading uploader configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<UploaderConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(PagesError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PagesError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<UploaderConfig> {
        debug!("Parsing YAML configuration");

        let config: UploaderConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            PagesError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed configuration for project: {}", config.project.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Recognized variables: `PAGES_ACCOUNT_ID`, `PAGES_PROJECT_NAME`,
    /// `PAGES_BASE_URL` and `PAGES_UPLOAD_CONCURRENCY`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override is malformed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<UploaderConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies overrides read through `lookup` to the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `PAGES_UPLOAD_CONCURRENCY` is not a number.
    pub fn apply_overrides(
        config: &mut UploaderConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(account_id) = lookup("PAGES_ACCOUNT_ID") {
            debug!("Overriding project.account_id from environment");
            config.project.account_id = account_id;
        }

        if let Some(name) = lookup("PAGES_PROJECT_NAME") {
            debug!("Overriding project.name from environment");
            config.project.name = name;
        }

        if let Some(base_url) = lookup("PAGES_BASE_URL") {
            debug!("Overriding api.base_url from environment");
            config.api.base_url = base_url;
        }

        if let Some(concurrency) = lookup("PAGES_UPLOAD_CONCURRENCY") {
            debug!("Overriding upload.concurrency from environment");
            config.upload.concurrency = concurrency.trim().parse().map_err(|e| {
                PagesError::Config(ConfigError::ParseError {
                    message: format!("Invalid PAGES_UPLOAD_CONCURRENCY '{concurrency}': {e}"),
                    location: None,
                })
            })?;
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                PagesError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the project API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `CLOUDFLARE_API_TOKEN` is unset or empty.
    pub fn get_api_key() -> Result<String> {
        Self::api_key_from(|name| std::env::var(name).ok())
    }

    /// Reads the project API key through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unset or empty.
    pub fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        lookup(API_TOKEN_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PagesError::Config(ConfigError::MissingEnvVar {
                    name: API_TOKEN_VAR.to_string(),
                })
            })
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["pages.deploy.yaml", "pages.deploy.yml"];

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(PagesError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r"
project:
  account_id: acc-1
  name: my-site
";

    #[test]
    fn test_parse_minimal_config() {
        let config = ConfigParser::new().parse_yaml(MINIMAL, None).unwrap();
        assert_eq!(config.project.account_id, "acc-1");
        assert_eq!(config.project.name, "my-site");
        assert_eq!(config.upload.concurrency, 8);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
project:
  account_id: 0123456789abcdef
  name: docs-site
api:
  base_url: https://api.example.test/client/v4
  timeout_secs: 10
upload:
  directory: ./dist
  concurrency: 16
  token_lifetime_secs: 600
  token_safety_margin_secs: 30
";
        let config = ConfigParser::new().parse_yaml(yaml, None).unwrap();
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.upload.concurrency, 16);
        assert_eq!(config.upload.directory, PathBuf::from("./dist"));
        assert_eq!(config.upload.token_lifetime_secs, 600);
    }

    #[test]
    fn test_missing_project_is_a_parse_error() {
        let result = ConfigParser::new().parse_yaml("upload:\n  concurrency: 4\n", None);
        assert!(matches!(
            result,
            Err(PagesError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConfigParser::new().parse_yaml(MINIMAL, None).unwrap();
        let env = HashMap::from([
            ("PAGES_PROJECT_NAME", "other-site"),
            ("PAGES_UPLOAD_CONCURRENCY", "3"),
        ]);

        ConfigParser::apply_overrides(&mut config, |name| env.get(name).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.project.name, "other-site");
        assert_eq!(config.project.account_id, "acc-1");
        assert_eq!(config.upload.concurrency, 3);
    }

    #[test]
    fn test_invalid_concurrency_override() {
        let mut config = ConfigParser::new().parse_yaml(MINIMAL, None).unwrap();
        let result = ConfigParser::apply_overrides(&mut config, |name| {
            (name == "PAGES_UPLOAD_CONCURRENCY").then(|| String::from("many"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_api_key_lookup() {
        let key = ConfigParser::api_key_from(|_| Some(String::from("secret"))).unwrap();
        assert_eq!(key, "secret");

        let missing = ConfigParser::api_key_from(|_| Some(String::from("  ")));
        assert!(matches!(
            missing,
            Err(PagesError::Config(ConfigError::MissingEnvVar { ref name })) if name == API_TOKEN_VAR
        ));
    }

    #[test]
    fn test_find_config_file_searches_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("site/src");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("pages.deploy.yml"), MINIMAL).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("pages.deploy.yml"));

        let loaded = ConfigParser::new().load_file(&found).unwrap();
        assert_eq!(loaded.project.name, "my-site");
    }
}
