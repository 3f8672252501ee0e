//! Missing value analysis and rule-based resolution
//!
//! The resolver runs the rule book, drops rows lacking a mandatory feature,
//! zero-fills and sentinel-fills the remaining gaps, and splits the label off
//! the cleaned table. Its only fitted state is the delinquency-age median.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::columns::{
    LABEL_COLUMN, MANDATORY_FEATURES, SENTINEL, SENTINEL_FILL_FEATURES, ZERO_FILL_FEATURES,
};
use super::frame::{drop_where, fill_missing, missing_mask, numeric_values};
use super::label::{loan_conditions, LoanCondition};
use super::rules::{RuleEffect, RuleGroup, RULE_BOOK};
use crate::error::PrepError;

/// Analyze missing values in the dataset.
///
/// Returns the missing ratio of every column, sorted descending. Null and
/// floating-point NaN both count as missing.
pub fn analyze_missing_values(df: &DataFrame) -> Result<Vec<(String, f64)>> {
    // Handle empty DataFrame
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let rows = df.height() as f64;
    let mut missing_ratios: Vec<(String, f64)> = Vec::new();

    for column in df.get_columns() {
        let missing = missing_mask(column)?.into_iter().filter(|&m| m).count();
        missing_ratios.push((column.name().to_string(), missing as f64 / rows));
    }

    // Sort by missing ratio descending
    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(missing_ratios)
}

/// Columns from `columns` that still contain missing values
pub fn columns_with_missing(df: &DataFrame, columns: &[&str]) -> Result<Vec<String>> {
    let mut incomplete = Vec::new();
    for &name in columns {
        if let Ok(column) = df.column(name) {
            if missing_mask(column)?.into_iter().any(|m| m) {
                incomplete.push(name.to_string());
            }
        }
    }
    Ok(incomplete)
}

/// Median of `mths_since_last_delinq` over rows with past delinquencies
/// (`delinq_2yrs > 0`) and none current (`acc_now_delinq == 0`).
pub fn delinquency_age_median(df: &DataFrame) -> Result<f64> {
    let ages = numeric_values(df, "mths_since_last_delinq")?;
    let delinquencies = numeric_values(df, "delinq_2yrs")?;
    let current = numeric_values(df, "acc_now_delinq")?;

    let sample: Vec<f64> = ages
        .iter()
        .zip(&delinquencies)
        .zip(&current)
        .filter(|((_, d), c)| d.is_some_and(|d| d > 0.0) && **c == Some(0.0))
        .filter_map(|((age, _), _)| *age)
        .collect();

    let median = Float64Chunked::from_vec("mths_since_last_delinq".into(), sample)
        .median()
        .ok_or(PrepError::EmptyFitSample)?;

    Ok(median)
}

/// Outcome of one rule or bulk pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub group: RuleGroup,
    /// Rule identifier, or the column name for the per-column passes
    pub rule: String,
    #[serde(flatten)]
    pub effect: RuleEffect,
}

impl RuleOutcome {
    fn new(group: RuleGroup, rule: &str, effect: RuleEffect) -> Self {
        Self {
            group,
            rule: rule.to_string(),
            effect,
        }
    }
}

/// Result of resolving a table: features, parallel labels, and what each
/// rule did on the way.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub features: DataFrame,
    pub labels: Vec<LoanCondition>,
    pub outcomes: Vec<RuleOutcome>,
}

impl Resolved {
    /// Total rows removed across all rules
    pub fn rows_dropped(&self) -> usize {
        self.outcomes.iter().map(|o| o.effect.dropped()).sum()
    }

    /// Rows removed per group, in evaluation order, omitting groups that
    /// removed nothing
    pub fn dropped_by_group(&self) -> Vec<(RuleGroup, usize)> {
        let mut totals: Vec<(RuleGroup, usize)> = Vec::new();
        for outcome in &self.outcomes {
            let dropped = outcome.effect.dropped();
            if dropped == 0 {
                continue;
            }
            match totals.iter_mut().find(|(g, _)| *g == outcome.group) {
                Some((_, total)) => *total += dropped,
                None => totals.push((outcome.group, dropped)),
            }
        }
        totals
    }
}

/// Drop every row missing a value in any of `columns`.
///
/// Columns not in the table are skipped and reported as [`RuleEffect::Absent`].
pub fn drop_incomplete_rows(df: &mut DataFrame, columns: &[&str]) -> Result<Vec<RuleOutcome>> {
    let mut outcomes = Vec::with_capacity(columns.len());
    for &name in columns {
        let mask = match df.column(name) {
            Ok(column) => Some(missing_mask(column)?),
            Err(_) => None,
        };
        let effect = match mask {
            Some(mask) => RuleEffect::Dropped(drop_where(df, &mask)?),
            None => RuleEffect::Absent,
        };
        debug!(column = name, ?effect, "mandatory feature check");
        outcomes.push(RuleOutcome::new(RuleGroup::MandatoryFeatures, name, effect));
    }
    Ok(outcomes)
}

/// Replace missing values in every column of `columns` with `value`.
///
/// Columns not in the table are skipped. Running this twice is a no-op the
/// second time.
pub fn fill_missing_columns(
    df: &mut DataFrame,
    columns: &[&str],
    value: f64,
    group: RuleGroup,
) -> Result<Vec<RuleOutcome>> {
    let mut outcomes = Vec::with_capacity(columns.len());
    for &name in columns {
        let effect = match fill_missing(df, name, value)? {
            Some(filled) => RuleEffect::Filled(filled),
            None => RuleEffect::Absent,
        };
        debug!(column = name, value, ?effect, "bulk fill");
        outcomes.push(RuleOutcome::new(group, name, effect));
    }
    Ok(outcomes)
}

/// Split the label column off a resolved table.
pub fn split_labels(df: &DataFrame) -> Result<(DataFrame, Vec<LoanCondition>)> {
    let labels = loan_conditions(df)?;
    let features = df
        .drop(LABEL_COLUMN)
        .context("Failed to split label column from features")?;
    Ok((features, labels))
}

/// Rule-based missing value resolver.
///
/// `fit` computes the delinquency-age median once; `transform` reuses it
/// unchanged for every table it is applied to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValueResolver {
    delinquency_age_median: Option<f64>,
}

impl MissingValueResolver {
    /// Create an unfitted resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver from a previously fitted median
    pub fn with_median(delinquency_age_median: f64) -> Self {
        Self {
            delinquency_age_median: Some(delinquency_age_median),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.delinquency_age_median.is_some()
    }

    pub fn delinquency_age_median(&self) -> Option<f64> {
        self.delinquency_age_median
    }

    /// Fit the delinquency-age median on reference data
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let median = delinquency_age_median(df)?;
        info!(median, rows = df.height(), "fitted delinquency age median");
        self.delinquency_age_median = Some(median);
        Ok(self)
    }

    /// Resolve missing values and split features from labels.
    ///
    /// # Arguments
    /// * `df` - Labelled table from the selector; must contain every column
    ///   the rule book reads and the label column
    ///
    /// # Returns
    /// Feature table without the label column, the labels in row order, and
    /// the outcome of every rule and bulk pass in evaluation order
    pub fn transform(&self, df: &DataFrame) -> Result<Resolved> {
        let median = self.delinquency_age_median.ok_or(PrepError::NotFitted)?;
        let mut df = df.clone();
        let input_rows = df.height();
        let mut outcomes = Vec::new();

        for rule in RULE_BOOK {
            let effect = rule
                .apply(&mut df, median)
                .with_context(|| format!("Rule {} ({}) failed", rule.id, rule.group.label()))?;
            outcomes.push(RuleOutcome::new(rule.group, rule.id, effect));
        }

        outcomes.extend(drop_incomplete_rows(&mut df, MANDATORY_FEATURES)?);
        outcomes.extend(fill_missing_columns(
            &mut df,
            ZERO_FILL_FEATURES,
            0.0,
            RuleGroup::ZeroFill,
        )?);
        outcomes.extend(fill_missing_columns(
            &mut df,
            SENTINEL_FILL_FEATURES,
            SENTINEL,
            RuleGroup::SentinelFill,
        )?);

        let (features, labels) = split_labels(&df)?;

        info!(
            input_rows,
            output_rows = features.height(),
            features = features.width(),
            "resolved missing values"
        );

        Ok(Resolved {
            features,
            labels,
            outcomes,
        })
    }

    /// Fit on `df` and resolve it
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Resolved> {
        self.fit(df)?;
        self.transform(df)
    }
}
