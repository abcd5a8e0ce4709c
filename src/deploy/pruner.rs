//! Pruning of stale deployments.
//!
//! The most recently modified deployment is kept and every other deployment of
//! the project is deleted.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::pages::{Deployment, PagesApi};

/// Which deployments to keep and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrunePlan {
    /// The latest deployment.
    pub keep: Deployment,
    /// Every other deployment.
    pub delete: Vec<Deployment>,
}

/// A deletion that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDeletion {
    /// Deployment ID.
    pub id: String,
    /// Error message.
    pub error: String,
}

/// Result of a prune.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// ID of the kept deployment, if the project had any.
    pub kept: Option<String>,
    /// IDs of deleted deployments.
    pub deleted: Vec<String>,
    /// Deletions that failed.
    pub failed: Vec<FailedDeletion>,
}

impl PruneReport {
    /// Returns true if every stale deployment was deleted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Splits deployments into the one to keep and the stale ones.
///
/// The deployment with the greatest `modified_on` is kept; on a tie the one
/// listed last wins. Returns `None` for an empty list.
#[must_use]
pub fn plan_prune(deployments: Vec<Deployment>) -> Option<PrunePlan> {
    let (keep_index, _) = deployments
        .iter()
        .enumerate()
        .max_by_key(|(_, d)| d.modified_on)?;

    let mut delete = deployments;
    let keep = delete.remove(keep_index);
    Some(PrunePlan { keep, delete })
}

/// Deletes every deployment but the latest.
pub struct DeploymentPruner {
    api: Arc<dyn PagesApi>,
}

impl DeploymentPruner {
    /// Creates a pruner.
    #[must_use]
    pub fn new(api: Arc<dyn PagesApi>) -> Self {
        Self { api }
    }

    /// Lists the project's deployments, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the deployments cannot be listed.
    pub async fn list(&self) -> Result<Vec<Deployment>> {
        let mut deployments = self.api.list_deployments().await?;
        deployments.sort_by(|a, b| b.modified_on.cmp(&a.modified_on));
        Ok(deployments)
    }

    /// Computes the prune plan without deleting anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the deployments cannot be listed.
    pub async fn plan(&self) -> Result<Option<PrunePlan>> {
        Ok(plan_prune(self.api.list_deployments().await?))
    }

    /// Deletes the stale deployments of a plan, one at a time.
    ///
    /// A failed deletion is recorded and the remaining ones still run.
    pub async fn execute(&self, plan: PrunePlan) -> PruneReport {
        let mut report = PruneReport {
            kept: Some(plan.keep.id),
            ..PruneReport::default()
        };

        for deployment in plan.delete {
            match self.api.delete_deployment(&deployment.id).await {
                Ok(()) => {
                    info!("Deleted deployment {}", deployment.id);
                    report.deleted.push(deployment.id);
                }
                Err(e) => {
                    error!("Failed to delete deployment {}: {e}", deployment.id);
                    report.failed.push(FailedDeletion {
                        id: deployment.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Lists, plans and deletes in one go.
    ///
    /// # Errors
    ///
    /// Returns an error only if the deployments cannot be listed; failed
    /// deletions are part of the report.
    pub async fn prune(&self) -> Result<PruneReport> {
        let Some(plan) = self.plan().await? else {
            warn!("Project has no deployments, nothing to prune");
            return Ok(PruneReport::default());
        };

        info!(
            "Keeping deployment {}, deleting {} others",
            plan.keep.id,
            plan.delete.len()
        );
        Ok(self.execute(plan).await)
    }
}
