//! Pages API client implementation.
//!
//! This module provides the HTTP client for the Pages REST API. Project-level
//! calls are authorized with the API key; asset calls use the cached upload token.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::{DeserializeOwned, IgnoredAny};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::UploaderConfig;
use crate::deploy::{Fingerprint, Manifest};
use crate::error::{ApiError, PagesError, Result};

use super::api::PagesApi;
use super::token::{DEFAULT_SAFETY_MARGIN, DEFAULT_TOKEN_LIFETIME, TokenManager};
use super::types::{
    ApiEnvelope, AssetUpload, Deployment, DeploymentSummary, HashesRequest, UploadTokenResult,
};

/// Cloudflare API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("pages-uploader/", env!("CARGO_PKG_VERSION"));

const UPLOAD_TOKEN: &str = "upload-token";
const CHECK_MISSING: &str = "assets/check-missing";
const UPLOAD: &str = "assets/upload";
const UPSERT_HASHES: &str = "assets/upsert-hashes";
const CREATE_DEPLOYMENT: &str = "create deployment";
const LIST_DEPLOYMENTS: &str = "list deployments";
const DELETE_DEPLOYMENT: &str = "delete deployment";

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Pages API client.
///
/// Clones share the HTTP connection pool and the upload token cache.
#[derive(Debug, Clone)]
pub struct PagesClient {
    /// HTTP client.
    client: Client,
    /// API base URL without trailing slash.
    base_url: String,
    /// Account identifier.
    account_id: String,
    /// Pages project name.
    project_name: String,
    /// Long-lived project API key.
    api_key: String,
    /// Upload token cache.
    tokens: Arc<TokenManager>,
}

impl PagesClient {
    /// Creates a client for a project with default base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(account_id: &str, project_name: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            base_url: DEFAULT_BASE_URL.to_string(),
            account_id: account_id.to_string(),
            project_name: project_name.to_string(),
            api_key: api_key.to_string(),
            tokens: Arc::new(TokenManager::new(DEFAULT_TOKEN_LIFETIME, DEFAULT_SAFETY_MARGIN)),
        })
    }

    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &UploaderConfig, api_key: &str) -> Result<Self> {
        let client = Self {
            client: build_http_client(config.api.timeout())?,
            ..Self::new(&config.project.account_id, &config.project.name, api_key)?
        };

        Ok(client
            .with_base_url(&config.api.base_url)
            .with_token_policy(config.upload.token_lifetime(), config.upload.token_safety_margin()))
    }

    /// Points the client at another API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Replaces the upload token cache with one using the given lifetime and margin.
    #[must_use]
    pub fn with_token_policy(mut self, default_lifetime: Duration, safety_margin: Duration) -> Self {
        self.tokens = Arc::new(TokenManager::new(default_lifetime, safety_margin));
        self
    }

    /// Builds a URL below the project resource.
    fn project_url(&self, suffix: &str) -> String {
        format!(
            "{}/accounts/{}/pages/projects/{}/{suffix}",
            self.base_url, self.account_id, self.project_name
        )
    }

    /// Builds a URL below the shared asset resource.
    fn assets_url(&self, suffix: &str) -> String {
        format!("{}/pages/assets/{suffix}", self.base_url)
    }

    /// Returns a valid upload token, refreshing it if needed.
    async fn upload_token(&self) -> Result<String> {
        let token = self.tokens.acquire(|| self.fetch_upload_token()).await?;
        Ok(token.value().to_string())
    }

    /// Requests a fresh upload token.
    async fn fetch_upload_token(&self) -> Result<String> {
        let request = self
            .client
            .get(self.project_url(UPLOAD_TOKEN))
            .bearer_auth(&self.api_key);

        let envelope: ApiEnvelope<UploadTokenResult> = self.send(UPLOAD_TOKEN, request).await?;
        Ok(envelope.into_result(UPLOAD_TOKEN)?.jwt)
    }

    /// Sends a request and checks the status code.
    async fn execute(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Response> {
        trace!("Calling {endpoint}");

        let response = request
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, &e))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::auth(format!(
                "{endpoint} rejected the credentials ({status}): {}",
                error_detail(&body)
            ))
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RequestFailed {
                endpoint,
                status: status.as_u16(),
                message: error_detail(&body),
            }
            .into());
        }

        debug!("{endpoint} answered {status}");
        Ok(response)
    }

    /// Sends a request and decodes a successful response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<ApiEnvelope<T>> {
        let response = self.execute(endpoint, request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(endpoint, &e))?;

        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body)
            .map_err(|e| ApiError::invalid_response(endpoint, format!("failed to parse response: {e}")))?;

        if !envelope.success {
            return Err(ApiError::Unsuccessful {
                endpoint,
                message: envelope.error_message(),
            }
            .into());
        }

        Ok(envelope)
    }
}

#[async_trait]
impl PagesApi for PagesClient {
    async fn check_missing(&self, hashes: &[Fingerprint]) -> Result<HashSet<Fingerprint>> {
        let jwt = self.upload_token().await?;
        let request = self
            .client
            .post(self.assets_url("check-missing"))
            .bearer_auth(jwt)
            .json(&HashesRequest { hashes });

        let envelope: ApiEnvelope<Vec<Fingerprint>> = self.send(CHECK_MISSING, request).await?;
        let missing: HashSet<Fingerprint> = envelope.into_result(CHECK_MISSING)?.into_iter().collect();

        debug!("{} of {} assets are missing", missing.len(), hashes.len());
        Ok(missing)
    }

    async fn upload_asset(&self, asset: AssetUpload) -> Result<()> {
        let jwt = self.upload_token().await?;
        let request = self
            .client
            .post(self.assets_url("upload"))
            .bearer_auth(jwt)
            .json(&[&asset]);

        let _: ApiEnvelope<IgnoredAny> = self.send(UPLOAD, request).await?;
        debug!("Uploaded asset {}", asset.key());
        Ok(())
    }

    async fn upsert_hashes(&self, hashes: &[Fingerprint]) -> Result<()> {
        let jwt = self.upload_token().await?;
        let request = self
            .client
            .post(self.assets_url("upsert-hashes"))
            .bearer_auth(jwt)
            .json(&HashesRequest { hashes });

        let _: ApiEnvelope<IgnoredAny> = self.send(UPSERT_HASHES, request).await?;
        debug!("Registered {} hashes", hashes.len());
        Ok(())
    }

    async fn create_deployment(&self, manifest: &Manifest) -> Result<Option<DeploymentSummary>> {
        let manifest_json = manifest
            .to_json()
            .map_err(|e| PagesError::internal(format!("Failed to serialize manifest: {e}")))?;
        let form = Form::new().text("manifest", manifest_json);

        let request = self
            .client
            .post(self.project_url("deployments"))
            .bearer_auth(&self.api_key)
            .multipart(form);

        let envelope: ApiEnvelope<DeploymentSummary> = self.send(CREATE_DEPLOYMENT, request).await?;
        if envelope.result.is_none() {
            warn!("Deployment created but the API returned no deployment details");
        }
        Ok(envelope.result)
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        let request = self
            .client
            .get(self.project_url("deployments"))
            .bearer_auth(&self.api_key);

        let envelope: ApiEnvelope<Vec<Deployment>> = self.send(LIST_DEPLOYMENTS, request).await?;
        envelope.into_result(LIST_DEPLOYMENTS).map_err(Into::into)
    }

    async fn delete_deployment(&self, deployment_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.project_url(&format!("deployments/{deployment_id}")))
            .bearer_auth(&self.api_key);

        self.execute(DELETE_DEPLOYMENT, request).await?;
        Ok(())
    }
}

/// Builds the underlying HTTP client.
fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            ApiError::Network {
                endpoint: "client setup",
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Maps a reqwest failure to a transport error.
fn transport_error(endpoint: &'static str, error: &reqwest::Error) -> PagesError {
    if error.is_timeout() {
        ApiError::Timeout { endpoint }.into()
    } else {
        ApiError::Network {
            endpoint,
            message: error.to_string(),
        }
        .into()
    }
}

/// Extracts a readable message from an error body.
fn error_detail(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<IgnoredAny>>(body) {
        if !envelope.errors.is_empty() {
            return envelope.error_message();
        }
    }

    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }

    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
