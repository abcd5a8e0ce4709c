//! Configuration module for the Pages uploader.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `pages.deploy.yaml`
//! - Environment overrides and the API key
//! - Validation of configuration values

mod spec;
mod parser;
mod validator;

pub use spec::{ApiConfig, ProjectConfig, UploadConfig, UploaderConfig};
pub use parser::{API_TOKEN_VAR, ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
