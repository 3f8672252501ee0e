//! Preprocessing summary report

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use polars::prelude::*;

use crate::pipeline::{
    analyze_missing_values, count_conditions, MissingValueResolver, Resolved, RuleEffect,
    RuleGroup,
};

/// Rows shown in the missing value profile
const PROFILE_DISPLAY_LIMIT: usize = 10;

/// Summary of one preprocessing run
#[derive(Debug, Clone, Default)]
pub struct PreprocessSummary {
    pub raw_rows: usize,
    pub selected_rows: usize,
    pub resolved_rows: usize,
    pub feature_count: usize,
    pub bad_loans: usize,
    pub good_loans: usize,
    pub delinquency_age_median: Option<f64>,
    pub dropped_by_group: Vec<(RuleGroup, usize)>,
    /// Rules whose fill-from-column was skipped, with the rows it selected
    pub skipped_fills: Vec<(String, usize)>,
    /// Selected columns that had missing values before resolution, highest
    /// ratio first
    pub missing_profile: Vec<(String, f64)>,
}

impl PreprocessSummary {
    /// Summarise a run from the raw row count, the selected table the
    /// resolver was given and its output.
    pub fn new(
        raw_rows: usize,
        selected: &DataFrame,
        resolved: &Resolved,
        resolver: &MissingValueResolver,
    ) -> Result<Self> {
        let (bad_loans, good_loans) = count_conditions(&resolved.labels);
        let skipped_fills = resolved
            .outcomes
            .iter()
            .filter_map(|o| match o.effect {
                RuleEffect::Skipped(rows) => Some((o.rule.clone(), rows)),
                _ => None,
            })
            .collect();
        let missing_profile = analyze_missing_values(selected)?
            .into_iter()
            .filter(|(_, ratio)| *ratio > 0.0)
            .collect();

        Ok(Self {
            raw_rows,
            selected_rows: selected.height(),
            resolved_rows: resolved.features.height(),
            feature_count: resolved.features.width(),
            bad_loans,
            good_loans,
            delinquency_age_median: resolver.delinquency_age_median(),
            dropped_by_group: resolved.dropped_by_group(),
            skipped_fills,
            missing_profile,
        })
    }

    /// Share of selected rows that survived missing value resolution
    pub fn retention(&self) -> f64 {
        if self.selected_rows > 0 {
            self.resolved_rows as f64 / self.selected_rows as f64
        } else {
            0.0
        }
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("PREPROCESSING SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Raw Rows"), Cell::new(self.raw_rows)]);
        table.add_row(vec![
            Cell::new("👤 Individual, Labelled"),
            Cell::new(self.selected_rows),
        ]);
        table.add_row(vec![
            Cell::new("✅ Resolved Rows"),
            Cell::new(self.resolved_rows)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![Cell::new("🧮 Features"), Cell::new(self.feature_count)]);
        table.add_row(vec![
            Cell::new("🟥 Bad Loans"),
            Cell::new(self.bad_loans).fg(Color::Red),
        ]);
        table.add_row(vec![
            Cell::new("🟩 Good Loans"),
            Cell::new(self.good_loans).fg(Color::Green),
        ]);

        if let Some(median) = self.delinquency_age_median {
            table.add_row(vec![
                Cell::new("📐 Delinquency Age Median"),
                Cell::new(format!("{:.1}", median)),
            ]);
        }

        let retention_pct = self.retention() * 100.0;
        let color = if retention_pct > 90.0 {
            Color::Green
        } else if retention_pct > 70.0 {
            Color::Yellow
        } else {
            Color::Red
        };
        table.add_row(vec![
            Cell::new("📉 Retention"),
            Cell::new(format!("{:.1}%", retention_pct))
                .fg(color)
                .add_attribute(Attribute::Bold),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.missing_profile.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("🔍").cyan(),
                style("MISSING VALUES BEFORE RESOLUTION").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            println!();
            for (column, ratio) in self.missing_profile.iter().take(PROFILE_DISPLAY_LIMIT) {
                println!(
                    "      {} {:<26} {}",
                    style("•").dim(),
                    column,
                    style(format!("{:.1}%", ratio * 100.0)).yellow()
                );
            }
            if self.missing_profile.len() > PROFILE_DISPLAY_LIMIT {
                println!(
                    "      {}",
                    style(format!(
                        "... and {} more columns",
                        self.missing_profile.len() - PROFILE_DISPLAY_LIMIT
                    ))
                    .dim()
                );
            }
        }

        if !self.dropped_by_group.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("📝").cyan(),
                style("DROPPED ROWS BY RULE GROUP").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            println!();
            for (group, rows) in &self.dropped_by_group {
                println!(
                    "      {} {:<26} {}",
                    style("•").dim(),
                    group.label(),
                    style(rows).yellow().bold()
                );
            }
        }

        if !self.skipped_fills.is_empty() {
            println!();
            println!(
                "      {}",
                style("Skipped fills (incompatible column types):").yellow()
            );
            for (rule, rows) in &self.skipped_fills {
                println!("        {} rule {} ({} rows)", style("•").dim(), rule, rows);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention() {
        let summary = PreprocessSummary {
            selected_rows: 200,
            resolved_rows: 150,
            ..Default::default()
        };
        assert!((summary.retention() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_retention_empty_selection() {
        assert_eq!(PreprocessSummary::default().retention(), 0.0);
    }

    #[test]
    fn test_missing_profile_lists_only_gappy_columns() {
        let selected = df! {
            "annual_inc" => [Some(52_000.0f64), None, Some(61_000.0), Some(48_000.0)],
            "dti" => [Some(14.2f64), Some(f64::NAN), None, Some(9.1)],
            "grade" => ["A", "B", "C", "D"],
        }
        .unwrap();
        let resolved = Resolved {
            features: selected.clone(),
            labels: Vec::new(),
            outcomes: Vec::new(),
        };
        let resolver = MissingValueResolver::with_median(30.0);

        let summary = PreprocessSummary::new(10, &selected, &resolved, &resolver).unwrap();

        assert_eq!(summary.selected_rows, 4);
        assert_eq!(
            summary.missing_profile,
            vec![("dti".to_string(), 0.5), ("annual_inc".to_string(), 0.25)]
        );
    }
}
