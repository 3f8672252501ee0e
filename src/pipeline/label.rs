//! Loan condition labels and column selection
//!
//! Keeps individual applications, maps the raw loan status to a Good/Bad
//! label, drops rows whose status is neither, and projects the table down to
//! the applicant and loan columns plus the label.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::columns::{APPLICANT_FEATURES, APPLICATION_TYPE, LABEL_COLUMN, LOAN_FEATURES, LOAN_STATUS};
use super::frame::{require, string_values};
use crate::config::SelectionConfig;
use crate::error::PrepError;

/// Statuses that count as a bad loan
const BAD_STATUSES: &[&str] = &[
    "Charged Off",
    "Late (31-120 days)",
    "In Grace Period",
    "Late (16-30 days)",
    "Default",
    "Does not meet the credit policy. Status:Charged Off",
];

/// Statuses that count as a good loan
const GOOD_STATUSES: &[&str] = &[
    "Fully Paid",
    "Does not meet the credit policy. Status:Fully Paid",
];

/// Binary outcome of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanCondition {
    #[serde(rename = "Good Loan")]
    Good,
    #[serde(rename = "Bad Loan")]
    Bad,
}

impl LoanCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanCondition::Good => "Good Loan",
            LoanCondition::Bad => "Bad Loan",
        }
    }

    /// Map a raw loan status. Statuses outside the two fixed tables, such as
    /// "Current", have no label.
    pub fn from_status(status: &str) -> Option<Self> {
        if BAD_STATUSES.contains(&status) {
            Some(LoanCondition::Bad)
        } else if GOOD_STATUSES.contains(&status) {
            Some(LoanCondition::Good)
        } else {
            None
        }
    }
}

impl fmt::Display for LoanCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanCondition {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Good Loan" => Ok(LoanCondition::Good),
            "Bad Loan" => Ok(LoanCondition::Bad),
            other => Err(PrepError::UnknownLabel(other.to_string())),
        }
    }
}

/// Columns kept by the selector, in output order: label, applicant list,
/// loan list, then `config.include`, with `config.exclude` removed.
///
/// Duplicates are kept once. Excluding a column that is not selected is a
/// configuration error.
pub fn selected_columns(config: &SelectionConfig) -> Result<Vec<String>> {
    let mut columns: Vec<String> = Vec::new();
    let candidates = std::iter::once(LABEL_COLUMN)
        .chain(APPLICANT_FEATURES.iter().copied())
        .chain(LOAN_FEATURES.iter().copied())
        .chain(config.include.iter().map(String::as_str));

    for name in candidates {
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    }

    for excluded in &config.exclude {
        let position = columns
            .iter()
            .position(|c| c == excluded)
            .ok_or_else(|| PrepError::UnknownExcludedColumn(excluded.clone()))?;
        columns.remove(position);
    }

    Ok(columns)
}

/// Derive the loan condition label and select the modelling columns.
///
/// # Arguments
/// * `df` - Type-normalized loan table
/// * `config` - Extra columns to include and columns to exclude
///
/// # Returns
/// Individual applications with a recognised status, restricted to
/// [`selected_columns`]. The label column is categorical.
pub fn select_individual_loans(df: &DataFrame, config: &SelectionConfig) -> Result<DataFrame> {
    let columns = selected_columns(config)?;
    let input_rows = df.height();

    let application_types = string_values(require(df, APPLICATION_TYPE)?)?;
    let individual: BooleanChunked = application_types
        .iter()
        .map(|v| v.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("individual")))
        .collect();
    let mut out = df
        .filter(&individual)
        .context("Failed to filter individual applications")?;
    let individual_rows = out.height();

    let statuses = string_values(require(&out, LOAN_STATUS)?)?;
    let conditions: Vec<Option<LoanCondition>> = statuses
        .iter()
        .map(|v| v.as_deref().and_then(LoanCondition::from_status))
        .collect();

    let labels: Vec<Option<&str>> = conditions.iter().map(|c| c.map(|c| c.as_str())).collect();
    let label_series = Series::new(LABEL_COLUMN.into(), labels)
        .cast(&DataType::Categorical(None, CategoricalOrdering::Physical))
        .context("Failed to build loan condition column")?;
    out.with_column(label_series)
        .context("Failed to add loan condition column")?;

    let labelled: BooleanChunked = conditions.iter().map(Option::is_some).collect();
    let out = out
        .filter(&labelled)
        .context("Failed to filter unlabelled loans")?;

    for name in &columns {
        require(&out, name)?;
    }
    let out = out.select(columns).context("Failed to select columns")?;

    info!(
        input_rows,
        individual_rows,
        labelled_rows = out.height(),
        columns = out.width(),
        "derived loan condition and selected columns"
    );

    Ok(out)
}

/// Read the label column back as [`LoanCondition`] values.
pub fn loan_conditions(df: &DataFrame) -> Result<Vec<LoanCondition>> {
    string_values(require(df, LABEL_COLUMN)?)?
        .into_iter()
        .map(|v| -> Result<LoanCondition> {
            let v = v.ok_or_else(|| PrepError::UnknownLabel("null".to_string()))?;
            Ok(v.parse::<LoanCondition>()?)
        })
        .collect()
}

/// Count how many labels are bad and good loans
pub fn count_conditions(labels: &[LoanCondition]) -> (usize, usize) {
    let bad = labels.iter().filter(|&&l| l == LoanCondition::Bad).count();
    (bad, labels.len() - bad)
}
