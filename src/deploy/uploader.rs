//! Concurrent upload of missing assets.
//!
//! Uploads run in a bounded worker pool. Each task reports exactly one outcome,
//! panics included, and the first failure aborts the batch. Assets that were
//! already stored stay stored: the store is content addressed, so a later run
//! simply finds them present.

use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{DeployError, PagesError, Result};
use crate::pages::{AssetUpload, PagesApi};

use super::artifact::FileArtifact;
use super::fingerprint::{ContentHasher, Fingerprint};

/// Default number of uploads in flight.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// An artifact paired with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedArtifact {
    /// The file.
    pub artifact: FileArtifact,
    /// Fingerprint of its content.
    pub fingerprint: Fingerprint,
}

impl HashedArtifact {
    /// Fingerprints an artifact.
    #[must_use]
    pub fn new(artifact: FileArtifact, hasher: &ContentHasher) -> Self {
        let fingerprint = hasher.fingerprint(artifact.content());
        Self {
            artifact,
            fingerprint,
        }
    }
}

/// Result of uploading a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Final fingerprint of each artifact, in input order.
    pub fingerprints: Vec<Fingerprint>,
    /// Number of assets uploaded.
    pub uploaded: usize,
    /// Number of artifacts already present in the store.
    pub reused: usize,
}

/// One upload to perform.
struct UploadJob {
    artifact: FileArtifact,
    fingerprint: Fingerprint,
}

/// Outcome reported by one upload task.
struct UploadReport {
    path: String,
    fingerprint: Fingerprint,
    result: Result<()>,
}

/// Uploader for missing assets.
pub struct AssetUploader {
    /// Pages API.
    api: Arc<dyn PagesApi>,
    /// Maximum number of uploads in flight.
    concurrency: usize,
}

impl AssetUploader {
    /// Creates an uploader with the default concurrency.
    #[must_use]
    pub fn new(api: Arc<dyn PagesApi>) -> Self {
        Self {
            api,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets the maximum number of uploads in flight (at least 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Uploads every artifact whose fingerprint is in `missing`.
    ///
    /// Artifacts sharing a missing fingerprint are uploaded once. The returned
    /// fingerprints follow the order of `artifacts`, whatever order the uploads
    /// complete in.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::UploadFailed`] for the first upload that fails.
    /// Uploads still in flight are aborted; nothing is retried or rolled back.
    pub async fn upload_missing(
        &self,
        artifacts: &[HashedArtifact],
        missing: &HashSet<Fingerprint>,
    ) -> Result<UploadOutcome> {
        let mut queued = HashSet::new();
        let jobs: Vec<UploadJob> = artifacts
            .iter()
            .filter(|a| missing.contains(&a.fingerprint))
            .filter(|a| queued.insert(a.fingerprint.clone()))
            .map(|a| UploadJob {
                artifact: a.artifact.clone(),
                fingerprint: a.fingerprint.clone(),
            })
            .collect();

        let uploaded = jobs.len();
        let reused = artifacts
            .iter()
            .filter(|a| !missing.contains(&a.fingerprint))
            .count();

        info!(
            "Uploading {uploaded} assets ({reused} already present, {} at a time)",
            self.concurrency
        );
        self.run_pool(jobs).await?;

        Ok(UploadOutcome {
            fingerprints: artifacts.iter().map(|a| a.fingerprint.clone()).collect(),
            uploaded,
            reused,
        })
    }

    /// Runs the jobs with at most `concurrency` in flight, stopping at the first failure.
    async fn run_pool(&self, jobs: Vec<UploadJob>) -> Result<()> {
        let total = jobs.len();
        let mut pending = jobs.into_iter();
        let mut in_flight = JoinSet::new();
        let mut completed = 0usize;

        loop {
            while in_flight.len() < self.concurrency {
                let Some(job) = pending.next() else { break };
                in_flight.spawn(upload_one(Arc::clone(&self.api), job));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            let report = joined
                .map_err(|e| PagesError::internal(format!("Upload task did not complete: {e}")))?;

            if let Err(source) = report.result {
                warn!(
                    "Upload of {} failed, aborting {} in-flight uploads",
                    report.path,
                    in_flight.len()
                );
                in_flight.abort_all();
                return Err(DeployError::UploadFailed {
                    path: report.path,
                    fingerprint: report.fingerprint.to_string(),
                    source: Box::new(source),
                }
                .into());
            }

            completed += 1;
            debug!(
                "Uploaded {} as {} ({completed}/{total})",
                report.path,
                report.fingerprint.short()
            );
        }

        Ok(())
    }
}

/// Uploads one asset. Always produces a report, even if the upload panics.
async fn upload_one(api: Arc<dyn PagesApi>, job: UploadJob) -> UploadReport {
    let UploadJob {
        artifact,
        fingerprint,
    } = job;

    let result = AssertUnwindSafe(async {
        let asset = AssetUpload::new(&fingerprint, artifact.content(), artifact.content_type());
        api.upload_asset(asset).await
    })
    .catch_unwind()
    .await
    .unwrap_or_else(|panic| {
        Err(PagesError::internal(format!(
            "upload task panicked: {}",
            panic_message(panic.as_ref())
        )))
    });

    UploadReport {
        path: artifact.path().to_string(),
        fingerprint,
        result,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
