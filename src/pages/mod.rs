//! Pages API integration module.
//!
//! This module provides everything needed to talk to the Pages REST API:
//! the request/response schemas, the upload token cache, the `PagesApi`
//! trait, and its reqwest implementation.

mod api;
mod client;
mod token;
mod types;

#[cfg(test)]
pub use api::MockPagesApi;
pub use api::PagesApi;
pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, PagesClient};
pub use token::{AuthToken, DEFAULT_SAFETY_MARGIN, DEFAULT_TOKEN_LIFETIME, TokenManager};
pub use types::{AssetUpload, Deployment, DeploymentSummary};
