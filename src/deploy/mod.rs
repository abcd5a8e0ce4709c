//! Deployment module.
//!
//! This module turns a directory of built files into a Pages deployment:
//! content fingerprinting, the bounded concurrent uploader, the staged
//! deployment pipeline, and pruning of stale deployments.

mod artifact;
mod fingerprint;
mod manifest;
mod pipeline;
mod pruner;
mod uploader;

pub use artifact::{FileArtifact, collect_artifacts, content_type_for};
pub use fingerprint::{ContentHasher, Fingerprint};
pub use manifest::Manifest;
pub use pipeline::{DeployReport, DeployStage, Deployer, PlannedUpload, UploadPlan};
pub use pruner::{DeploymentPruner, FailedDeletion, PrunePlan, PruneReport, plan_prune};
pub use uploader::{AssetUploader, DEFAULT_CONCURRENCY, HashedArtifact, UploadOutcome};
