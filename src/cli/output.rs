//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::deploy::{DeployReport, PrunePlan, PruneReport, UploadPlan};
use crate::pages::Deployment;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Deployment row for table display.
#[derive(Tabled)]
struct DeploymentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Environment")]
    environment: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "URL")]
    url: String,
}

/// Upload row for table display.
#[derive(Tabled)]
struct UploadRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an upload plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &UploadPlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(&PlanJson::from(plan)),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &UploadPlan) -> String {
        if plan.is_up_to_date() {
            return format!(
                "{} All {} files are already uploaded.\n",
                "✓".green(),
                plan.entries.len()
            );
        }

        let mut output = String::from("\nUpload Plan\n\n");

        let rows: Vec<UploadRow> = plan
            .entries
            .iter()
            .filter(|e| e.needs_upload)
            .map(|e| UploadRow {
                path: Self::truncate(&e.path, 60),
                hash: e.fingerprint.short().to_string(),
                size: format_bytes(e.size),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nPlan: {} to upload ({}), {} already stored\n",
            plan.upload_count().to_string().green(),
            format_bytes(plan.upload_bytes()),
            plan.entries.iter().filter(|e| !e.needs_upload).count().to_string().dimmed()
        );

        output
    }

    /// Formats the result of a deployment.
    #[must_use]
    pub fn format_deploy_report(&self, report: &DeployReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => {
                let mut output = format!("{} Deployment created\n\n", "✓".green());
                let _ = writeln!(output, "   Files: {}", report.manifest.len());
                let _ = writeln!(output, "   Uploaded: {}", report.uploaded);
                let _ = writeln!(output, "   Already stored: {}", report.reused);

                if let Some(deployment) = &report.deployment {
                    let _ = writeln!(output, "   ID: {}", deployment.id);
                    if let Some(url) = &deployment.url {
                        let _ = writeln!(output, "   URL: {}", url.cyan());
                    }
                }

                output
            }
        }
    }

    /// Formats a list of deployments.
    #[must_use]
    pub fn format_deployments(&self, deployments: &[Deployment]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&deployments),
            OutputFormat::Text => {
                if deployments.is_empty() {
                    return String::from("   No deployments.\n");
                }

                let rows: Vec<DeploymentRow> = deployments
                    .iter()
                    .map(|d| DeploymentRow {
                        id: d.id.clone(),
                        environment: d.environment.clone().unwrap_or_else(|| String::from("-")),
                        modified: d.modified_on.format("%Y-%m-%d %H:%M:%S").to_string(),
                        url: d.url.clone().unwrap_or_default(),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                let _ = write!(output, "\n\n{} deployment(s)\n", deployments.len());
                output
            }
        }
    }

    /// Formats a prune plan before confirmation.
    #[must_use]
    pub fn format_prune_plan(&self, plan: &PrunePlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(plan),
            OutputFormat::Text => {
                let mut output = format!(
                    "\nKeeping {} (modified {})\n",
                    plan.keep.id.green(),
                    plan.keep.modified_on.format("%Y-%m-%d %H:%M:%S")
                );

                if plan.delete.is_empty() {
                    output.push_str("Nothing to delete.\n");
                    return output;
                }

                let _ = writeln!(output, "Deleting {} deployment(s):", plan.delete.len());
                for deployment in &plan.delete {
                    let _ = writeln!(output, "   {} {}", "-".red(), deployment.id);
                }

                output
            }
        }
    }

    /// Formats the result of a prune.
    #[must_use]
    pub fn format_prune_report(&self, report: &PruneReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => {
                let Some(kept) = &report.kept else {
                    return String::from("   No deployments to prune.\n");
                };

                let status = if report.is_complete() {
                    format!("{} Prune complete", "✓".green())
                } else {
                    format!("{} Prune incomplete", "✗".red())
                };

                let mut output = format!("{status}\n\n");
                let _ = writeln!(output, "   Kept: {kept}");
                let _ = writeln!(output, "   Deleted: {}", report.deleted.len());

                if !report.failed.is_empty() {
                    let _ = write!(output, "\n{} Failed deletions:\n", "⚠".yellow());
                    for failure in &report.failed {
                        let _ = writeln!(output, "   - {}: {}", failure.id, failure.error);
                    }
                }

                output
            }
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid\n", "✓".green())
                } else {
                    format!("{} Configuration is invalid\n", "✗".red())
                };

                for error in &result.errors {
                    let _ = writeln!(output, "   {} {error}", "error:".red());
                }

                if show_warnings {
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   {} {warning}", "warning:".yellow());
                    }
                } else if result.warning_count() > 0 {
                    let _ = writeln!(
                        output,
                        "   {} warning(s), use --warnings to show them",
                        result.warning_count()
                    );
                }

                output
            }
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.status_line("success", &"✓".green().to_string(), message)
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        self.status_line("error", &"✗".red().to_string(), message)
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.status_line("warning", &"⚠".yellow().to_string(), message)
    }

    fn status_line(&self, status: &str, symbol: &str, message: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({ "status": status, "message": message })),
            OutputFormat::Text => format!("{symbol} {message}"),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Formats a byte count with a binary unit.
fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson<'a> {
    files: usize,
    to_upload: usize,
    upload_bytes: usize,
    entries: &'a [crate::deploy::PlannedUpload],
}

impl<'a> From<&'a UploadPlan> for PlanJson<'a> {
    fn from(plan: &'a UploadPlan) -> Self {
        Self {
            files: plan.entries.len(),
            to_upload: plan.upload_count(),
            upload_bytes: plan.upload_bytes(),
            entries: &plan.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{ContentHasher, FailedDeletion, PlannedUpload};
    use chrono::{TimeZone, Utc};

    fn plan() -> UploadPlan {
        let hasher = ContentHasher::new();
        UploadPlan {
            entries: vec![
                PlannedUpload {
                    path: String::from("/index.html"),
                    fingerprint: hasher.fingerprint(b"home"),
                    size: 2048,
                    needs_upload: true,
                },
                PlannedUpload {
                    path: String::from("/style.css"),
                    fingerprint: hasher.fingerprint(b"css"),
                    size: 10,
                    needs_upload: false,
                },
            ],
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("/a/very/long/path.html", 10), "/a/very...");
    }

    #[test]
    fn test_plan_text_lists_uploads_only() {
        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&plan());
        assert!(text.contains("/index.html"));
        assert!(!text.contains("/style.css"));
    }

    #[test]
    fn test_plan_json() {
        let json = OutputFormatter::new(OutputFormat::Json).format_plan(&plan());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["files"], 2);
        assert_eq!(value["to_upload"], 1);
        assert_eq!(value["entries"][0]["path"], "/index.html");
    }

    #[test]
    fn test_deployments_table() {
        let deployments = vec![Deployment {
            id: String::from("dep-1"),
            url: Some(String::from("https://dep-1.my-site.pages.dev")),
            environment: Some(String::from("production")),
            created_on: None,
            modified_on: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }];

        let text = OutputFormatter::new(OutputFormat::Text).format_deployments(&deployments);
        assert!(text.contains("dep-1"));
        assert!(text.contains("2024-05-01 12:00:00"));
        assert!(text.contains("1 deployment(s)"));
    }

    #[test]
    fn test_status_lines() {
        let text = OutputFormatter::new(OutputFormat::Text);
        assert!(text.success("Project initialized").ends_with(" Project initialized"));
        assert!(text.warning("token missing").ends_with(" token missing"));

        let json = OutputFormatter::new(OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json.warning("token missing")).unwrap();
        assert_eq!(value["status"], "warning");
        assert_eq!(value["message"], "token missing");
        let value: serde_json::Value = serde_json::from_str(&json.success("done")).unwrap();
        assert_eq!(value["status"], "success");
    }

    #[test]
    fn test_prune_report_lists_failures() {
        let report = PruneReport {
            kept: Some(String::from("b")),
            deleted: vec![String::from("a")],
            failed: vec![FailedDeletion {
                id: String::from("c"),
                error: String::from("active deployment"),
            }],
        };

        let text = OutputFormatter::new(OutputFormat::Text).format_prune_report(&report);
        assert!(text.contains("Kept: b"));
        assert!(text.contains("c: active deployment"));

        let json = OutputFormatter::new(OutputFormat::Json).format_prune_report(&report);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["failed"][0]["id"], "c");
    }
}
