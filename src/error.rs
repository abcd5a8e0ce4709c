//! Error types for the Pages uploader.
//!
//! This module provides the error hierarchy for every step of a deployment:
//! configuration, the Pages REST API, and the diff-and-upload pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployStage;

/// The main error type for the Pages uploader.
#[derive(Debug, Error)]
pub enum PagesError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pages API errors.
    #[error("Pages API error: {0}")]
    Api(#[from] ApiError),

    /// Deployment pipeline errors.
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Pages REST API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The upload token could not be obtained, or the API key was rejected.
    #[error("Pages authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The request never produced a response.
    #[error("Network error calling {endpoint}: {message}")]
    Network {
        /// Endpoint that was being called.
        endpoint: &'static str,
        /// Description of the network error.
        message: String,
    },

    /// The request timed out.
    #[error("Request to {endpoint} timed out")]
    Timeout {
        /// Endpoint that was being called.
        endpoint: &'static str,
    },

    /// The API answered with a non-success status code.
    #[error("{endpoint} failed with status {status}: {message}")]
    RequestFailed {
        /// Endpoint that was being called.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
        /// Error message or body from the API.
        message: String,
    },

    /// The API answered 2xx but reported `success: false`.
    #[error("{endpoint} reported failure: {message}")]
    Unsuccessful {
        /// Endpoint that was being called.
        endpoint: &'static str,
        /// Error messages from the response envelope.
        message: String,
    },

    /// The response body did not match the expected schema.
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse {
        /// Endpoint that was being called.
        endpoint: &'static str,
        /// Description of the response issue.
        message: String,
    },
}

/// Deployment pipeline errors.
#[derive(Debug, Error)]
pub enum DeployError {
    /// One of the concurrent asset uploads failed.
    #[error("Failed to upload {path} ({fingerprint}): {source}")]
    UploadFailed {
        /// Site path of the artifact that failed.
        path: String,
        /// Fingerprint the artifact was uploaded under.
        fingerprint: String,
        /// Underlying cause.
        #[source]
        source: Box<PagesError>,
    },

    /// A pipeline stage failed; later stages were not run.
    #[error("Deployment failed while {stage}: {source}")]
    StageFailed {
        /// Stage that failed.
        stage: DeployStage,
        /// Underlying cause.
        #[source]
        source: Box<PagesError>,
    },

    /// There is nothing to deploy.
    #[error("No files to deploy")]
    NoArtifacts,

    /// Two artifacts claim the same site path.
    #[error("Duplicate site path: {path}")]
    DuplicatePath {
        /// The duplicated path.
        path: String,
    },

    /// Some stale deployments could not be deleted.
    #[error("Failed to delete {} deployment(s): {}", failed.len(), failed.join(", "))]
    PruneIncomplete {
        /// IDs of deployments that are still present.
        failed: Vec<String>,
    },
}

/// Result type alias for Pages uploader operations.
pub type Result<T> = std::result::Result<T, PagesError>;

impl PagesError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wraps this error with the pipeline stage it happened in.
    #[must_use]
    pub fn in_stage(self, stage: DeployStage) -> Self {
        Self::Deploy(DeployError::StageFailed {
            stage,
            source: Box::new(self),
        })
    }

    /// Returns the pipeline stage this error was raised in, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<DeployStage> {
        match self {
            Self::Deploy(DeployError::StageFailed { stage, .. }) => Some(*stage),
            _ => None,
        }
    }

    /// Returns true if re-running the whole pipeline may succeed.
    ///
    /// Nothing in the pipeline retries on its own; this only informs the caller.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(ApiError::Network { .. } | ApiError::Timeout { .. }) => true,
            Self::Api(ApiError::RequestFailed { status, .. }) => *status == 429 || *status >= 500,
            Self::Deploy(
                DeployError::UploadFailed { source, .. } | DeployError::StageFailed { source, .. },
            ) => source.is_transient(),
            _ => false,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ApiError {
    /// Creates an authentication error.
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Creates a decode error for an endpoint.
    #[must_use]
    pub fn invalid_response(endpoint: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint,
            message: message.into(),
        }
    }
}
