// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![cfg_attr(not(test), warn(clippy::unwrap_used))]  // unwrap() warning
#![cfg_attr(not(test), warn(clippy::expect_used))]  // expect() warning
#![cfg_attr(not(test), warn(clippy::panic))]        // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Pages Uploader
//!
//! Content-addressed deployments of static sites to Cloudflare Pages.
//!
//! ## Overview
//!
//! A deployment is driven by the content of the site, not by its history:
//!
//! - Every file is fingerprinted from its bytes
//! - The asset store is asked which fingerprints it lacks
//! - Only the missing assets are uploaded, several at a time
//! - A manifest mapping paths to fingerprints creates the deployment
//!
//! Deploying an unchanged site uploads nothing and still creates a deployment.
//!
//! ## Pipeline
//!
//! 1. **Hashing**: fingerprint every file
//! 2. **Resolving missing**: one check-missing request for the whole set
//! 3. **Uploading**: bounded concurrent uploads of the missing assets
//! 4. **Registering hashes**: upsert the manifest fingerprints
//! 5. **Committing**: create the deployment from the manifest
//!
//! A failure stops the pipeline and reports the stage it happened in.
//! Nothing is retried or rolled back, and running it again is safe.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`pages`]: Pages API client, schemas and upload token cache
//! - [`deploy`]: Fingerprinting, uploading, the pipeline and pruning
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   account_id: "0123456789abcdef"
//!   name: my-site
//!
//! upload:
//!   directory: public
//!   concurrency: 8
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod pages;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, UploaderConfig};
pub use deploy::{
    ContentHasher, DeployReport, DeployStage, Deployer, DeploymentPruner, FileArtifact,
    Fingerprint, Manifest, PruneReport, UploadPlan,
};
pub use error::{PagesError, Result};
pub use pages::{PagesApi, PagesClient, TokenManager};
