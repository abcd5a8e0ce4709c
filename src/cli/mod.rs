//! CLI module for the Pages uploader.
//!
//! This module provides the command-line interface for deploying
//! static sites and managing deployments.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
