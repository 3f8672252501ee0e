//! End-to-end preprocessing: normalize, label and select, resolve

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::label::select_individual_loans;
use super::missing::{MissingValueResolver, Resolved};
use super::normalize::normalize_types;
use crate::config::SelectionConfig;
use crate::report::PreprocessSummary;

/// Runs the three preprocessing stages in order over a raw loan table.
///
/// Fitting only touches the resolver; the other stages are stateless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanPreprocessor {
    config: SelectionConfig,
    resolver: MissingValueResolver,
}

impl LoanPreprocessor {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            resolver: MissingValueResolver::new(),
        }
    }

    /// Build from a selection config and an already fitted resolver
    pub fn with_resolver(config: SelectionConfig, resolver: MissingValueResolver) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn resolver(&self) -> &MissingValueResolver {
        &self.resolver
    }

    /// Normalize types, derive labels and select columns.
    pub fn prepare(&self, raw: &DataFrame) -> Result<DataFrame> {
        let typed = normalize_types(raw).context("Type normalization failed")?;
        select_individual_loans(&typed, &self.config).context("Label derivation failed")
    }

    /// Fit the resolver on a raw reference table
    pub fn fit(&mut self, raw: &DataFrame) -> Result<&mut Self> {
        let prepared = self.prepare(raw)?;
        self.resolver.fit(&prepared)?;
        Ok(self)
    }

    /// Run all three stages with the fitted resolver.
    pub fn transform(&self, raw: &DataFrame) -> Result<Resolved> {
        let prepared = self.prepare(raw)?;
        self.resolver.transform(&prepared)
    }

    /// Like [`transform`](Self::transform), also returning a run summary.
    pub fn transform_with_summary(&self, raw: &DataFrame) -> Result<(Resolved, PreprocessSummary)> {
        let prepared = self.prepare(raw)?;
        let resolved = self.resolver.transform(&prepared)?;
        let summary = PreprocessSummary::new(raw.height(), &prepared, &resolved, &self.resolver)?;
        Ok((resolved, summary))
    }

    /// Fit on `raw` and transform it
    pub fn fit_transform(&mut self, raw: &DataFrame) -> Result<Resolved> {
        let prepared = self.prepare(raw)?;
        self.resolver.fit(&prepared)?;
        self.resolver.transform(&prepared)
    }
}
