//! Pages API trait definition.
//!
//! The deployment pipeline and the pruner only talk to the platform through
//! this trait, so they can run against the HTTP client or a test double.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::deploy::{Fingerprint, Manifest};
use crate::error::Result;

use super::types::{AssetUpload, Deployment, DeploymentSummary};

/// Remote operations of a Pages project.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PagesApi: Send + Sync {
    /// Returns the subset of `hashes` the asset store does not hold yet.
    async fn check_missing(&self, hashes: &[Fingerprint]) -> Result<HashSet<Fingerprint>>;

    /// Stores one asset under its fingerprint.
    async fn upload_asset(&self, asset: AssetUpload) -> Result<()>;

    /// Registers the fingerprints a deployment is about to reference.
    async fn upsert_hashes(&self, hashes: &[Fingerprint]) -> Result<()>;

    /// Creates a deployment from a manifest.
    async fn create_deployment(&self, manifest: &Manifest) -> Result<Option<DeploymentSummary>>;

    /// Lists the project's deployments.
    async fn list_deployments(&self) -> Result<Vec<Deployment>>;

    /// Deletes one deployment.
    async fn delete_deployment(&self, deployment_id: &str) -> Result<()>;
}
