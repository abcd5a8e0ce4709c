//! Deployment pipeline.
//!
//! A deployment runs through fixed stages:
//! hash, resolve missing assets, upload, register hashes, commit.
//! A failure in any stage stops the pipeline and is reported with that stage.
//! Running the pipeline again from the start is always safe.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{DeployError, Result};
use crate::pages::{DeploymentSummary, PagesApi};

use super::artifact::FileArtifact;
use super::fingerprint::{ContentHasher, Fingerprint};
use super::manifest::Manifest;
use super::uploader::{AssetUploader, DEFAULT_CONCURRENCY, HashedArtifact};

/// Stage of the deployment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    /// Fingerprinting the artifacts.
    Hashing,
    /// Asking the store which assets it lacks.
    ResolvingMissing,
    /// Uploading the missing assets.
    Uploading,
    /// Registering the manifest fingerprints.
    RegisteringHashes,
    /// Creating the deployment.
    CommittingDeployment,
}

impl std::fmt::Display for DeployStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Hashing => "hashing files",
            Self::ResolvingMissing => "resolving missing assets",
            Self::Uploading => "uploading assets",
            Self::RegisteringHashes => "registering hashes",
            Self::CommittingDeployment => "committing the deployment",
        };
        write!(f, "{s}")
    }
}

/// One artifact in an upload plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpload {
    /// Site path.
    pub path: String,
    /// Content fingerprint.
    pub fingerprint: Fingerprint,
    /// Size in bytes.
    pub size: usize,
    /// Whether the store lacks this content.
    pub needs_upload: bool,
}

/// What a deployment would upload, computed without changing anything remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadPlan {
    /// Planned artifacts, ordered by path.
    pub entries: Vec<PlannedUpload>,
}

impl UploadPlan {
    /// Number of distinct assets that would be uploaded.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.needs_upload && seen.insert(&e.fingerprint))
            .count()
    }

    /// Total bytes that would be uploaded.
    #[must_use]
    pub fn upload_bytes(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.needs_upload && seen.insert(&e.fingerprint))
            .map(|e| e.size)
            .sum()
    }

    /// Returns true if every asset is already stored.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.entries.iter().all(|e| !e.needs_upload)
    }
}

impl std::fmt::Display for UploadPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_up_to_date() {
            return write!(f, "All {} files already uploaded", self.entries.len());
        }

        writeln!(
            f,
            "Upload Plan ({} of {} files, {} bytes):",
            self.upload_count(),
            self.entries.len(),
            self.upload_bytes()
        )?;
        for entry in self.entries.iter().filter(|e| e.needs_upload) {
            writeln!(f, "  + {} ({})", entry.path, entry.fingerprint.short())?;
        }
        Ok(())
    }
}

/// Result of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// Manifest the deployment was created from.
    pub manifest: Manifest,
    /// Number of assets uploaded.
    pub uploaded: usize,
    /// Number of artifacts whose content was already stored.
    pub reused: usize,
    /// The created deployment, if the service returned one.
    pub deployment: Option<DeploymentSummary>,
}

/// Runs deployments against a Pages project.
pub struct Deployer {
    api: Arc<dyn PagesApi>,
    hasher: ContentHasher,
    concurrency: usize,
}

impl Deployer {
    /// Creates a deployer.
    #[must_use]
    pub fn new(api: Arc<dyn PagesApi>) -> Self {
        Self {
            api,
            hasher: ContentHasher::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets the maximum number of uploads in flight.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Computes which artifacts would be uploaded.
    ///
    /// Only the hashing and resolving stages run; nothing is uploaded or committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifacts are invalid or the missing check fails.
    pub async fn plan(&self, artifacts: &[FileArtifact]) -> Result<UploadPlan> {
        let hashed = self
            .hash(artifacts)
            .map_err(|e| e.in_stage(DeployStage::Hashing))?;
        let missing = self
            .api
            .check_missing(&unique_fingerprints(&hashed))
            .await
            .map_err(|e| e.in_stage(DeployStage::ResolvingMissing))?;

        let mut entries: Vec<PlannedUpload> = hashed
            .iter()
            .map(|h| PlannedUpload {
                path: h.artifact.path().to_string(),
                fingerprint: h.fingerprint.clone(),
                size: h.artifact.len(),
                needs_upload: missing.contains(&h.fingerprint),
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(UploadPlan { entries })
    }

    /// Deploys the artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::StageFailed`] naming the stage that failed. An
    /// empty or duplicated artifact set fails in [`DeployStage::Hashing`]
    /// before any remote call. Assets uploaded before a failure stay uploaded.
    pub async fn deploy(&self, artifacts: &[FileArtifact]) -> Result<DeployReport> {
        info!("Hashing {} files", artifacts.len());
        let hashed = self
            .hash(artifacts)
            .map_err(|e| e.in_stage(DeployStage::Hashing))?;

        info!("Resolving missing assets");
        let missing = self
            .api
            .check_missing(&unique_fingerprints(&hashed))
            .await
            .map_err(|e| e.in_stage(DeployStage::ResolvingMissing))?;
        debug!("{} of {} assets missing", missing.len(), hashed.len());

        let outcome = AssetUploader::new(Arc::clone(&self.api))
            .with_concurrency(self.concurrency)
            .upload_missing(&hashed, &missing)
            .await
            .map_err(|e| e.in_stage(DeployStage::Uploading))?;

        let mut manifest = Manifest::new();
        for (artifact, fingerprint) in hashed.iter().zip(outcome.fingerprints) {
            manifest.insert(artifact.artifact.path(), fingerprint);
        }

        info!("Registering {} hashes", manifest.len());
        self.api
            .upsert_hashes(&manifest.fingerprints())
            .await
            .map_err(|e| e.in_stage(DeployStage::RegisteringHashes))?;

        info!("Committing deployment of {} files", manifest.len());
        let deployment = self
            .api
            .create_deployment(&manifest)
            .await
            .map_err(|e| e.in_stage(DeployStage::CommittingDeployment))?;

        if let Some(summary) = &deployment {
            info!("Created deployment {}", summary.id);
        }

        Ok(DeployReport {
            manifest,
            uploaded: outcome.uploaded,
            reused: outcome.reused,
            deployment,
        })
    }

    /// Fingerprints the artifacts, rejecting empty input and duplicate paths.
    fn hash(&self, artifacts: &[FileArtifact]) -> Result<Vec<HashedArtifact>> {
        if artifacts.is_empty() {
            return Err(DeployError::NoArtifacts.into());
        }

        let mut paths = std::collections::HashSet::new();
        for artifact in artifacts {
            if !paths.insert(artifact.path()) {
                return Err(DeployError::DuplicatePath {
                    path: artifact.path().to_string(),
                }
                .into());
            }
        }

        Ok(artifacts
            .iter()
            .map(|a| HashedArtifact::new(a.clone(), &self.hasher))
            .collect())
    }
}

/// Sorted, deduplicated fingerprints of the artifacts.
fn unique_fingerprints(hashed: &[HashedArtifact]) -> Vec<Fingerprint> {
    let mut fingerprints: Vec<Fingerprint> = hashed.iter().map(|h| h.fingerprint.clone()).collect();
    fingerprints.sort();
    fingerprints.dedup();
    fingerprints
}
