//! Pages API types and data structures.
//!
//! This module defines the request and response schemas of the Pages REST API.
//! Every response is decoded into an explicit schema; a shape mismatch is a
//! decode error, never a silently missing field.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::Fingerprint;
use crate::error::ApiError;

/// Standard response envelope of the API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Errors reported by the API.
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    /// Call result, absent on some endpoints.
    pub result: Option<T>,
}

/// One entry of the `errors` array of an envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl<T> ApiEnvelope<T> {
    /// Joins the reported errors into one message.
    pub fn error_message(&self) -> String {
        if self.errors.is_empty() {
            return String::from("no error details returned");
        }

        self.errors
            .iter()
            .map(|e| format!("[{}] {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Returns the result, failing if the API omitted it.
    pub fn into_result(self, endpoint: &'static str) -> Result<T, ApiError> {
        self.result
            .ok_or_else(|| ApiError::invalid_response(endpoint, "response has no result"))
    }
}

/// Result of the upload-token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadTokenResult {
    pub jwt: String,
}

/// Body of the check-missing and upsert-hashes endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct HashesRequest<'a> {
    pub hashes: &'a [Fingerprint],
}

/// One asset in the body of the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetUpload {
    key: Fingerprint,
    value: String,
    metadata: AssetMetadata,
    base64: bool,
}

/// Metadata stored alongside an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct AssetMetadata {
    #[serde(rename = "contentType")]
    content_type: String,
}

impl AssetUpload {
    /// Base64-encodes `content` for upload under `key`.
    #[must_use]
    pub fn new(key: &Fingerprint, content: &[u8], content_type: &str) -> Self {
        Self {
            key: key.clone(),
            value: STANDARD.encode(content),
            metadata: AssetMetadata {
                content_type: content_type.to_string(),
            },
            base64: true,
        }
    }

    /// Storage key of the asset.
    #[must_use]
    pub const fn key(&self) -> &Fingerprint {
        &self.key
    }

    /// Base64-encoded content.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Content type sent as metadata.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.metadata.content_type
    }
}

/// A deployment of the Pages project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique deployment identifier.
    pub id: String,
    /// Preview URL of the deployment.
    #[serde(default)]
    pub url: Option<String>,
    /// Environment (production or preview).
    #[serde(default)]
    pub environment: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
}

/// The deployment created by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    /// Unique deployment identifier.
    pub id: String,
    /// Preview URL of the deployment.
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_asset_upload_wire_shape() {
        let asset = AssetUpload::new(&Fingerprint::new("h1"), b"hi", "text/plain");
        let value = serde_json::to_value([&asset]).expect("serialize");

        assert_eq!(
            value,
            json!([{
                "key": "h1",
                "value": "aGk=",
                "metadata": { "contentType": "text/plain" },
                "base64": true
            }])
        );
    }

    #[test]
    fn test_envelope_without_result() {
        let envelope: ApiEnvelope<UploadTokenResult> =
            serde_json::from_value(json!({ "success": true })).expect("decode");

        assert!(envelope.success);
        assert!(envelope.into_result("upload-token").is_err());
    }

    #[test]
    fn test_envelope_error_message() {
        let envelope: ApiEnvelope<Vec<Fingerprint>> = serde_json::from_value(json!({
            "success": false,
            "errors": [{ "code": 8000000, "message": "project not found" }],
            "result": null
        }))
        .expect("decode");

        assert_eq!(envelope.error_message(), "[8000000] project not found");
    }

    #[test]
    fn test_deployment_decodes_timestamps() {
        let deployment: Deployment = serde_json::from_value(json!({
            "id": "f64788e9",
            "url": "https://f64788e9.my-site.pages.dev",
            "environment": "preview",
            "created_on": "2024-01-01T10:00:00.123456Z",
            "modified_on": "2024-01-01T10:05:00Z",
            "stages": []
        }))
        .expect("decode");

        assert_eq!(deployment.id, "f64788e9");
        assert_eq!(deployment.modified_on.to_rfc3339(), "2024-01-01T10:05:00+00:00");
    }

    #[test]
    fn test_deployment_requires_modified_on() {
        let result: Result<Deployment, _> = serde_json::from_value(json!({ "id": "a" }));
        assert!(result.is_err());
    }
}
