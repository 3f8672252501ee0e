//! JSON export of resolver runs and fitted state

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::summary::PreprocessSummary;
use crate::pipeline::{MissingValueResolver, Resolved, RuleOutcome};

/// Metadata about the preprocessing run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    /// Loan-prep version
    pub loanprep_version: String,
    /// Fitted delinquency age median used by the run
    pub delinquency_age_median: Option<f64>,
}

/// Row counts through the pipeline
#[derive(Serialize)]
pub struct RunCounts {
    pub raw_rows: usize,
    pub selected_rows: usize,
    pub resolved_rows: usize,
    pub features: usize,
    pub bad_loans: usize,
    pub good_loans: usize,
}

/// Complete report of a preprocessing run
#[derive(Serialize)]
pub struct ResolveReportExport<'a> {
    pub metadata: RunMetadata,
    pub counts: RunCounts,
    /// Every rule and bulk pass, in evaluation order
    pub outcomes: &'a [RuleOutcome],
}

/// Build the export structure for a run
pub fn build_resolve_report<'a>(
    summary: &PreprocessSummary,
    resolved: &'a Resolved,
) -> ResolveReportExport<'a> {
    ResolveReportExport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            loanprep_version: env!("CARGO_PKG_VERSION").to_string(),
            delinquency_age_median: summary.delinquency_age_median,
        },
        counts: RunCounts {
            raw_rows: summary.raw_rows,
            selected_rows: summary.selected_rows,
            resolved_rows: summary.resolved_rows,
            features: summary.feature_count,
            bad_loans: summary.bad_loans,
            good_loans: summary.good_loans,
        },
        outcomes: &resolved.outcomes,
    }
}

/// Export a run report to a JSON file
pub fn export_resolve_report(
    summary: &PreprocessSummary,
    resolved: &Resolved,
    output_path: &Path,
) -> Result<()> {
    let report = build_resolve_report(summary, resolved);
    let json = serde_json::to_string_pretty(&report)
        .context("Failed to serialize preprocessing report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write report: {}", output_path.display()))?;

    Ok(())
}

/// Save a fitted resolver so later runs reuse the same median
pub fn save_resolver(resolver: &MissingValueResolver, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(resolver)
        .context("Failed to serialize resolver state to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write resolver state: {}", output_path.display()))?;

    Ok(())
}

/// Load a resolver saved with [`save_resolver`]
pub fn load_resolver(path: &Path) -> Result<MissingValueResolver> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read resolver state: {}", path.display()))?;

    serde_json::from_str(&json)
        .with_context(|| format!("Invalid resolver state: {}", path.display()))
}
