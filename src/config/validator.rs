//! Configuration validation.
//!
//! Checks the loaded configuration before any request is made, collecting
//! every error and warning instead of stopping at the first one.

use crate::error::{ConfigError, PagesError, Result};
use tracing::debug;

use super::spec::{ApiConfig, ProjectConfig, UploadConfig, UploaderConfig};

/// Concurrency above which a warning is emitted.
const HIGH_CONCURRENCY: usize = 64;

/// Validator for uploader configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an uploader configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &UploaderConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(PagesError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Runs every check and returns all findings.
    #[must_use]
    pub fn check(&self, config: &UploaderConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_project(&config.project, &mut result);
        Self::validate_api(&config.api, &mut result);
        Self::validate_upload(&config.upload, &mut result);

        result
    }

    fn validate_project(project: &ProjectConfig, result: &mut ValidationResult) {
        if project.account_id.trim().is_empty() {
            result.error("project.account_id", "Account ID cannot be empty");
        }

        if project.name.is_empty() {
            result.error("project.name", "Project name cannot be empty");
        } else if !is_valid_name(&project.name) {
            result.error(
                "project.name",
                format!(
                    "Project name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    project.name
                ),
            );
        }
    }

    fn validate_api(api: &ApiConfig, result: &mut ValidationResult) {
        match reqwest::Url::parse(&api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.scheme() == "http" {
                    result
                        .warnings
                        .push(format!("api.base_url '{}' is not using HTTPS", api.base_url));
                }
            }
            Ok(url) => result.error(
                "api.base_url",
                format!("Unsupported URL scheme '{}', expected http or https", url.scheme()),
            ),
            Err(e) => result.error("api.base_url", format!("Invalid URL '{}': {e}", api.base_url)),
        }

        if api.timeout_secs == 0 {
            result.error("api.timeout_secs", "Timeout must be at least 1 second");
        }
    }

    fn validate_upload(upload: &UploadConfig, result: &mut ValidationResult) {
        if upload.concurrency == 0 {
            result.error("upload.concurrency", "Concurrency must be at least 1");
        } else if upload.concurrency > HIGH_CONCURRENCY {
            result.warnings.push(format!(
                "upload.concurrency {} is high; the API may rate limit uploads",
                upload.concurrency
            ));
        }

        if upload.directory.as_os_str().is_empty() {
            result.error("upload.directory", "Upload directory cannot be empty");
        }

        if upload.token_lifetime_secs == 0 {
            result.error("upload.token_lifetime_secs", "Token lifetime must be at least 1 second");
        } else if upload.token_safety_margin_secs >= upload.token_lifetime_secs {
            result.warnings.push(format!(
                "upload.token_safety_margin_secs ({}) is not below token_lifetime_secs ({}); \
                 a new upload token will be requested for every call",
                upload.token_safety_margin_secs, upload.token_lifetime_secs
            ));
        }
    }
}

/// Checks that a project name is lowercase alphanumeric with single hyphens.
fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('-') || name.ends_with('-') {
        return false;
    }

    if name.contains("--") {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl ValidationResult {
    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn config(yaml: &str) -> UploaderConfig {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("my-site"));
        assert!(is_valid_name("docs2"));
        assert!(is_valid_name("404-pages"));
        assert!(is_valid_name("a"));
    }

    #[test]
    fn test_invalid_name() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("My-Site")); // uppercase
        assert!(!is_valid_name("my_site")); // underscore
        assert!(!is_valid_name("site-")); // ends with hyphen
        assert!(!is_valid_name("my--site")); // consecutive hyphens
    }

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::new()
            .validate(&config("project:\n  account_id: acc-1\n  name: my-site\n"))
            .unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_errors_are_collected() {
        let result = ConfigValidator::new().check(&config(
            r#"
project:
  account_id: ""
  name: My_Site
api:
  base_url: ftp://example.test
  timeout_secs: 0
upload:
  concurrency: 0
"#,
        ));

        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "project.account_id",
                "project.name",
                "api.base_url",
                "api.timeout_secs",
                "upload.concurrency"
            ]
        );
    }

    #[test]
    fn test_validate_returns_first_error() {
        let err = ConfigValidator::new()
            .validate(&config("project:\n  account_id: acc-1\n  name: Bad\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            PagesError::Config(ConfigError::ValidationError { field: Some(ref f), .. }) if f == "project.name"
        ));
    }

    #[test]
    fn test_warnings() {
        let result = ConfigValidator::new()
            .validate(&config(
                r"
project:
  account_id: acc-1
  name: my-site
api:
  base_url: http://localhost:8787
upload:
  concurrency: 128
  token_lifetime_secs: 60
  token_safety_margin_secs: 60
",
            ))
            .unwrap();

        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 3);
    }
}
