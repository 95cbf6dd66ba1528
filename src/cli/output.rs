//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::audit::{AuditLog, AuditOperation};
use crate::config::ValidationResult;
use crate::container::{Operation, ProcessState};
use crate::error::{DeployerError, Result};
use crate::plan::{Plan, ResourceKind};
use crate::reconciler::{DryRun, RunReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Audit change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Op")]
    operation: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Property")]
    property: String,
    #[tabled(rename = "Old")]
    old_value: String,
    #[tabled(rename = "New")]
    new_value: String,
}

/// Operation row for table display.
#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Attribute")]
    attribute: String,
}

/// Plan summary row for table display.
#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Entries")]
    count: usize,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the report of an applied plan.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Yaml => to_yaml(report),
            OutputFormat::Text => {
                let mut output = Self::format_audits_text(&report.audits);
                let _ = write!(
                    output,
                    "\nRun {} from {} ({} audits), process state: {}\n",
                    &report.run_id.to_string()[..8],
                    report.host,
                    report.audits.len(),
                    Self::format_process_state(report.process_state)
                );
                Ok(output)
            }
        }
    }

    /// Formats the result of a dry run.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn format_dry_run(&self, dry_run: &DryRun) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&DryRunJson::from(dry_run)),
            OutputFormat::Yaml => to_yaml(&DryRunJson::from(dry_run)),
            OutputFormat::Text => {
                let mut output = Self::format_audits_text(&dry_run.audits);
                if !dry_run.operations.is_empty() {
                    let _ = write!(output, "\n{} operations would be sent:\n", dry_run.operations.len());
                    let rows: Vec<OperationRow> = dry_run
                        .operations
                        .iter()
                        .enumerate()
                        .map(|(i, o)| OperationRow {
                            index: i + 1,
                            operation: Self::format_operation_kind(o),
                            address: o.address().to_string(),
                            attribute: o
                                .get("name")
                                .and_then(serde_json::Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        })
                        .collect();
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }
                Ok(output)
            }
        }
    }

    /// Formats a validated plan.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn format_validation(&self, plan: &Plan, validation: &ValidationResult, warnings: bool) -> Result<String> {
        let counts: Vec<KindRow> = ResourceKind::ALL
            .into_iter()
            .map(|kind| KindRow {
                kind: kind.name().to_string(),
                count: plan.names(kind).len(),
            })
            .collect();

        match self.format {
            OutputFormat::Json | OutputFormat::Yaml => {
                let summary = ValidationJson {
                    valid: validation.is_valid(),
                    entries: counts.iter().map(|row| (row.kind.clone(), row.count)).collect(),
                    warnings: validation.warnings.clone(),
                };
                if self.format == OutputFormat::Json {
                    to_json(&summary)
                } else {
                    to_yaml(&summary)
                }
            }
            OutputFormat::Text => {
                let mut output = format!("{} Plan and configuration are valid\n\n", "✓".green());
                output.push_str(&Table::new(counts).to_string());
                output.push('\n');
                if warnings {
                    for warning in &validation.warnings {
                        let _ = writeln!(output, "{} {warning}", "⚠".yellow());
                    }
                } else if validation.warning_count() > 0 {
                    let _ = writeln!(output, "\n{} warnings, use --warnings to show them", validation.warning_count());
                }
                Ok(output)
            }
        }
    }

    /// Formats an effective plan. Text output is the plan YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn format_effective(&self, plan: &Plan) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(plan),
            OutputFormat::Text | OutputFormat::Yaml => to_yaml(plan),
        }
    }

    /// Formats audits as a table, followed by the skipped entries.
    fn format_audits_text(audits: &AuditLog) -> String {
        let mut output = String::new();

        if audits.is_empty() {
            let _ = writeln!(output, "{} No changes required - container is up to date.", "✓".green());
        } else {
            let rows: Vec<ChangeRow> = audits
                .iter()
                .flat_map(|audit| {
                    audit.changes.iter().map(move |change| ChangeRow {
                        operation: Self::format_audit_operation(audit.operation),
                        resource: audit.target.to_string(),
                        property: change.name.clone(),
                        old_value: Self::truncate(change.old_value.as_deref().unwrap_or("-"), 40),
                        new_value: Self::truncate(change.new_value.as_deref().unwrap_or("-"), 40),
                    })
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');

            let count = |operation| audits.iter().filter(|a| a.operation == operation).count();
            let _ = writeln!(
                output,
                "\n{} added, {} changed, {} removed",
                count(AuditOperation::Add).to_string().green(),
                count(AuditOperation::Change).to_string().yellow(),
                count(AuditOperation::Remove).to_string().red()
            );
        }

        for warning in audits.warnings() {
            let _ = writeln!(output, "{} skipped {warning}", "⚠".yellow());
        }
        output
    }

    /// Formats an audit operation with color.
    fn format_audit_operation(operation: AuditOperation) -> String {
        match operation {
            AuditOperation::Add => "+add".green().to_string(),
            AuditOperation::Change => "~change".yellow().to_string(),
            AuditOperation::Remove => "-remove".red().to_string(),
        }
    }

    /// Formats an operation name, colored by direction.
    fn format_operation_kind(operation: &Operation) -> String {
        let name = operation.kind().name();
        if operation.kind().direction() == crate::container::Direction::Subtractive {
            name.red().to_string()
        } else {
            name.green().to_string()
        }
    }

    /// Formats a process state with color.
    fn format_process_state(state: ProcessState) -> String {
        match state {
            ProcessState::Running => "running".green().to_string(),
            ProcessState::ReloadRequired => "reload-required".yellow().to_string(),
            ProcessState::RestartRequired => "restart-required".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{head}...")
        }
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, error: &DeployerError) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::Yaml => {
                let json = serde_json::json!({
                    "status": "error",
                    "client_error": error.is_client_error(),
                    "message": error.to_string(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {error}", "✗".red()),
        }
    }
}

fn to_json(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| DeployerError::internal(format!("JSON serialization failed: {e}")))
}

fn to_yaml(value: &impl Serialize) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| DeployerError::internal(format!("YAML serialization failed: {e}")))
}

// Serialization helpers

#[derive(Serialize)]
struct DryRunJson<'a> {
    operations: Vec<serde_json::Value>,
    #[serde(flatten)]
    audits: &'a AuditLog,
}

impl<'a> From<&'a DryRun> for DryRunJson<'a> {
    fn from(dry_run: &'a DryRun) -> Self {
        Self {
            operations: dry_run.operations.iter().map(|o| o.to_step(None)).collect(),
            audits: &dry_run.audits,
        }
    }
}

#[derive(Serialize)]
struct ValidationJson {
    valid: bool,
    entries: Vec<(String, usize)>,
    warnings: Vec<String>,
}
