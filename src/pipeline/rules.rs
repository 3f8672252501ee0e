//! Ordered imputation rules for correlated column groups
//!
//! Each rule reads the current values of a few columns, selects rows with a
//! predicate and then fills or drops them. Rules run strictly in book order
//! against the table as left by the previous rule: several predicates read
//! columns that an earlier rule has just written, and drops shrink the table
//! for every rule after them.

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::columns::SENTINEL;
use super::frame::{drop_where, fill_constant, fill_from_column, numeric_values};

/// Column group a rule (or bulk pass) works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleGroup {
    PublicRecord,
    Delinquency,
    Inquiries,
    AccountCounts,
    Balances,
    Collections,
    InstallmentActivity,
    InstallmentUtilization,
    RevolvingUtilization,
    MandatoryFeatures,
    ZeroFill,
    SentinelFill,
}

impl RuleGroup {
    pub fn label(&self) -> &'static str {
        match self {
            RuleGroup::PublicRecord => "Public record",
            RuleGroup::Delinquency => "Delinquency",
            RuleGroup::Inquiries => "Inquiries",
            RuleGroup::AccountCounts => "Account counts",
            RuleGroup::Balances => "Balances",
            RuleGroup::Collections => "Collections",
            RuleGroup::InstallmentActivity => "Installment activity",
            RuleGroup::InstallmentUtilization => "Installment utilization",
            RuleGroup::RevolvingUtilization => "Revolving utilization",
            RuleGroup::MandatoryFeatures => "Mandatory features",
            RuleGroup::ZeroFill => "Zero fill",
            RuleGroup::SentinelFill => "Sentinel fill",
        }
    }
}

/// What a rule does to the rows its predicate selects
#[derive(Debug, Clone, Copy)]
pub enum Action {
    /// Set each listed column to its constant
    FillConstant(&'static [(&'static str, f64)]),
    /// Copy `source` into every target; a no-op when types are incompatible
    FillFromColumn {
        targets: &'static [&'static str],
        source: &'static str,
    },
    /// Set the column to the fitted delinquency-age median
    FillStatistic(&'static str),
    /// Remove the rows
    DropRows,
}

/// Row-level predicate over the rule's input columns, in declaration order
pub type Predicate = fn(&[Option<f64>]) -> bool;

/// A single imputation rule
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Short identifier, group number plus letter (e.g. `2e`)
    pub id: &'static str,
    pub group: RuleGroup,
    /// Columns read by the predicate
    pub inputs: &'static [&'static str],
    pub predicate: Predicate,
    pub action: Action,
}

/// Effect of one rule or bulk pass on the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", content = "rows", rename_all = "snake_case")]
pub enum RuleEffect {
    /// Rows whose values were written
    Filled(usize),
    /// Rows removed from the table
    Dropped(usize),
    /// Rows selected by a fill that could not be applied
    Skipped(usize),
    /// Optional column not in the table
    Absent,
}

impl RuleEffect {
    pub fn dropped(&self) -> usize {
        match self {
            RuleEffect::Dropped(n) => *n,
            _ => 0,
        }
    }

    pub fn filled(&self) -> usize {
        match self {
            RuleEffect::Filled(n) => *n,
            _ => 0,
        }
    }
}

impl Rule {
    /// Selection vector of the rows this rule applies to, on the current table.
    pub fn select(&self, df: &DataFrame) -> Result<Vec<bool>> {
        let inputs = self
            .inputs
            .iter()
            .map(|name| numeric_values(df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut row_values = vec![None; inputs.len()];
        let mask = (0..df.height())
            .map(|row| {
                for (slot, column) in row_values.iter_mut().zip(&inputs) {
                    *slot = column[row];
                }
                (self.predicate)(&row_values)
            })
            .collect();

        Ok(mask)
    }

    /// Evaluate the predicate and apply the action in place.
    pub fn apply(&self, df: &mut DataFrame, delinquency_age_median: f64) -> Result<RuleEffect> {
        let mask = self.select(df)?;
        let selected = mask.iter().filter(|&&m| m).count();

        let effect = match self.action {
            Action::FillConstant(fills) => {
                for (column, value) in fills {
                    fill_constant(df, column, &mask, *value)?;
                }
                RuleEffect::Filled(selected)
            }
            Action::FillFromColumn { targets, source } => {
                if selected == 0 || fill_from_column(df, targets, source, &mask)? {
                    RuleEffect::Filled(selected)
                } else {
                    warn!(
                        rule = self.id,
                        source,
                        rows = selected,
                        "incompatible fill from column skipped"
                    );
                    RuleEffect::Skipped(selected)
                }
            }
            Action::FillStatistic(column) => {
                fill_constant(df, column, &mask, delinquency_age_median)?;
                RuleEffect::Filled(selected)
            }
            Action::DropRows => RuleEffect::Dropped(drop_where(df, &mask)?),
        };

        debug!(rule = self.id, group = self.group.label(), ?effect, "applied rule");
        Ok(effect)
    }
}

fn miss(v: Option<f64>) -> bool {
    v.is_none()
}

fn zero(v: Option<f64>) -> bool {
    v == Some(0.0)
}

fn pos(v: Option<f64>) -> bool {
    v.is_some_and(|x| x > 0.0)
}

fn nonzero(v: Option<f64>) -> bool {
    v.is_some_and(|x| x != 0.0)
}

fn zero_or_miss(v: Option<f64>) -> bool {
    miss(v) || zero(v)
}

const RECORD: &[&str] = &["mths_since_last_record", "pub_rec"];
const DELINQ: &[&str] = &["mths_since_last_delinq", "delinq_2yrs", "acc_now_delinq"];
const INQ: &[&str] = &["inq_last_6mths", "inq_last_12m", "inq_fi"];
const ACC: &[&str] = &["open_acc", "total_acc"];
const BAL: &[&str] = &["tot_cur_bal", "total_acc"];
const COLL: &[&str] = &["tot_coll_amt", "collections_12_mths_ex_med"];
const IL: &[&str] = &["open_il_12m", "open_il_24m", "mths_since_rcnt_il", "total_bal_il"];
const IL_UTIL: &[&str] = &["total_bal_il", "il_util"];
const REVOL: &[&str] = &["revol_bal", "revol_util"];

/// Rule groups 1–9 in evaluation order
pub static RULE_BOOK: &[Rule] = &[
    // Age of last public record
    Rule {
        id: "1a",
        group: RuleGroup::PublicRecord,
        inputs: RECORD,
        predicate: |v| miss(v[0]) && zero(v[1]),
        action: Action::FillConstant(&[("mths_since_last_record", SENTINEL)]),
    },
    Rule {
        id: "1b",
        group: RuleGroup::PublicRecord,
        inputs: RECORD,
        predicate: |v| miss(v[0]) && nonzero(v[1]),
        action: Action::FillConstant(&[("mths_since_last_record", 1.0)]),
    },
    Rule {
        id: "1c",
        group: RuleGroup::PublicRecord,
        inputs: RECORD,
        predicate: |v| miss(v[0]) && miss(v[1]),
        action: Action::DropRows,
    },
    // Age of last delinquency: [age, delinq_2yrs, acc_now_delinq]
    Rule {
        id: "2a",
        group: RuleGroup::Delinquency,
        inputs: DELINQ,
        predicate: |v| miss(v[0]) && zero(v[1]) && zero(v[2]),
        action: Action::FillConstant(&[("mths_since_last_delinq", SENTINEL)]),
    },
    Rule {
        id: "2b",
        group: RuleGroup::Delinquency,
        inputs: DELINQ,
        predicate: |v| miss(v[0]) && pos(v[1]) && pos(v[2]),
        action: Action::FillConstant(&[("mths_since_last_delinq", 1.0)]),
    },
    Rule {
        id: "2c",
        group: RuleGroup::Delinquency,
        inputs: DELINQ,
        predicate: |v| miss(v[0]) && pos(v[1]) && zero(v[2]),
        action: Action::FillStatistic("mths_since_last_delinq"),
    },
    Rule {
        id: "2d",
        group: RuleGroup::Delinquency,
        inputs: DELINQ,
        predicate: |v| zero(v[0]) && pos(v[1]) && zero(v[2]),
        action: Action::FillStatistic("mths_since_last_delinq"),
    },
    // Delinquency count correction
    Rule {
        id: "2e",
        group: RuleGroup::Delinquency,
        inputs: DELINQ,
        predicate: |v| v[0].is_some_and(|age| age > 0.0 && age < 25.0) && zero(v[1]) && zero(v[2]),
        action: Action::FillConstant(&[("delinq_2yrs", 1.0)]),
    },
    Rule {
        id: "2f",
        group: RuleGroup::Delinquency,
        inputs: DELINQ,
        predicate: |v| zero(v[0]) && zero(v[1]) && zero(v[2]),
        action: Action::FillConstant(&[("mths_since_last_delinq", SENTINEL)]),
    },
    Rule {
        id: "2g",
        group: RuleGroup::Delinquency,
        inputs: DELINQ,
        predicate: |v| miss(v[0]) && miss(v[1]) && miss(v[2]),
        action: Action::DropRows,
    },
    // Inquiries: [6 months, 12 months, finance inquiries]
    Rule {
        id: "3a",
        group: RuleGroup::Inquiries,
        inputs: INQ,
        predicate: |v| (miss(v[0]) || miss(v[1])) && zero(v[2]),
        action: Action::FillConstant(&[("inq_last_6mths", 0.0), ("inq_last_12m", 0.0)]),
    },
    Rule {
        id: "3b",
        group: RuleGroup::Inquiries,
        inputs: INQ,
        predicate: |v| (miss(v[0]) || miss(v[1])) && pos(v[2]),
        action: Action::FillFromColumn {
            targets: &["inq_last_6mths", "inq_last_12m"],
            source: "inq_fi",
        },
    },
    Rule {
        id: "3c",
        group: RuleGroup::Inquiries,
        inputs: INQ,
        predicate: |v| miss(v[0]) && miss(v[1]) && miss(v[2]),
        action: Action::DropRows,
    },
    // Open and total account counts
    Rule {
        id: "4a",
        group: RuleGroup::AccountCounts,
        inputs: ACC,
        predicate: |v| (miss(v[0]) || miss(v[1])) && (zero(v[0]) || zero(v[1])),
        action: Action::FillConstant(&[("open_acc", 0.0), ("total_acc", 0.0)]),
    },
    Rule {
        id: "4b",
        group: RuleGroup::AccountCounts,
        inputs: ACC,
        predicate: |v| (miss(v[0]) || miss(v[1])) && (pos(v[0]) || pos(v[1])),
        action: Action::DropRows,
    },
    Rule {
        id: "4c",
        group: RuleGroup::AccountCounts,
        inputs: ACC,
        predicate: |v| miss(v[0]) && miss(v[1]),
        action: Action::DropRows,
    },
    // Current balance against total account count
    Rule {
        id: "5a",
        group: RuleGroup::Balances,
        inputs: BAL,
        predicate: |v| (miss(v[0]) || miss(v[1])) && (zero(v[0]) || zero(v[1])),
        action: Action::FillConstant(&[("tot_cur_bal", 0.0), ("total_acc", 0.0)]),
    },
    Rule {
        id: "5b",
        group: RuleGroup::Balances,
        inputs: BAL,
        predicate: |v| (miss(v[0]) || miss(v[1])) && (pos(v[0]) || pos(v[1])),
        action: Action::DropRows,
    },
    Rule {
        id: "5c",
        group: RuleGroup::Balances,
        inputs: BAL,
        predicate: |v| miss(v[0]) && miss(v[1]),
        action: Action::DropRows,
    },
    // Collections: [amount, count in last 12 months]
    Rule {
        id: "6a",
        group: RuleGroup::Collections,
        inputs: COLL,
        predicate: |v| miss(v[0]) && miss(v[1]),
        action: Action::DropRows,
    },
    Rule {
        id: "6b",
        group: RuleGroup::Collections,
        inputs: COLL,
        predicate: |v| zero_or_miss(v[0]) && zero_or_miss(v[1]),
        action: Action::FillConstant(&[("tot_coll_amt", 0.0), ("collections_12_mths_ex_med", 0.0)]),
    },
    Rule {
        id: "6c",
        group: RuleGroup::Collections,
        inputs: COLL,
        predicate: |v| miss(v[0]) && nonzero(v[1]),
        action: Action::DropRows,
    },
    Rule {
        id: "6d",
        group: RuleGroup::Collections,
        inputs: COLL,
        predicate: |v| zero(v[0]) && miss(v[1]),
        action: Action::DropRows,
    },
    // Installment loans: [opened 12m, opened 24m, months since recent, balance]
    Rule {
        id: "7a",
        group: RuleGroup::InstallmentActivity,
        inputs: IL,
        predicate: |v| miss(v[0]) && miss(v[1]) && miss(v[2]) && zero(v[3]),
        action: Action::FillConstant(&[
            ("mths_since_rcnt_il", SENTINEL),
            ("open_il_12m", 0.0),
            ("open_il_24m", 0.0),
        ]),
    },
    Rule {
        id: "7b",
        group: RuleGroup::InstallmentActivity,
        inputs: IL,
        predicate: |v| miss(v[0]) && miss(v[1]) && miss(v[2]) && pos(v[3]),
        action: Action::DropRows,
    },
    Rule {
        id: "7c",
        group: RuleGroup::InstallmentActivity,
        inputs: IL,
        predicate: |v| (pos(v[0]) || pos(v[1])) && miss(v[2]) && pos(v[3]),
        action: Action::FillConstant(&[("mths_since_rcnt_il", 1.0)]),
    },
    Rule {
        id: "7d",
        group: RuleGroup::InstallmentActivity,
        inputs: IL,
        predicate: |v| miss(v[0]) && miss(v[1]) && miss(v[2]) && miss(v[3]),
        action: Action::FillConstant(&[
            ("open_il_12m", 0.0),
            ("open_il_24m", 0.0),
            ("mths_since_rcnt_il", SENTINEL),
            ("total_bal_il", 0.0),
        ]),
    },
    // Installment balance and utilization
    Rule {
        id: "8a",
        group: RuleGroup::InstallmentUtilization,
        inputs: IL_UTIL,
        predicate: |v| pos(v[0]) && miss(v[1]),
        action: Action::DropRows,
    },
    Rule {
        id: "8b",
        group: RuleGroup::InstallmentUtilization,
        inputs: IL_UTIL,
        predicate: |v| miss(v[0]) && pos(v[1]),
        action: Action::DropRows,
    },
    Rule {
        id: "8c",
        group: RuleGroup::InstallmentUtilization,
        inputs: IL_UTIL,
        predicate: |v| miss(v[0]) && zero(v[1]),
        action: Action::FillConstant(&[("total_bal_il", 0.0)]),
    },
    Rule {
        id: "8d",
        group: RuleGroup::InstallmentUtilization,
        inputs: IL_UTIL,
        predicate: |v| zero(v[0]) && miss(v[1]),
        action: Action::FillConstant(&[("il_util", 0.0)]),
    },
    Rule {
        id: "8e",
        group: RuleGroup::InstallmentUtilization,
        inputs: IL_UTIL,
        predicate: |v| miss(v[0]) && miss(v[1]),
        action: Action::FillConstant(&[("total_bal_il", 0.0), ("il_util", 0.0)]),
    },
    // Revolving balance and utilization
    Rule {
        id: "9a",
        group: RuleGroup::RevolvingUtilization,
        inputs: REVOL,
        predicate: |v| pos(v[0]) && miss(v[1]),
        action: Action::DropRows,
    },
    Rule {
        id: "9b",
        group: RuleGroup::RevolvingUtilization,
        inputs: REVOL,
        predicate: |v| miss(v[0]) && pos(v[1]),
        action: Action::DropRows,
    },
    Rule {
        id: "9c",
        group: RuleGroup::RevolvingUtilization,
        inputs: REVOL,
        predicate: |v| miss(v[0]) && zero(v[1]),
        action: Action::FillConstant(&[("revol_bal", 0.0)]),
    },
    Rule {
        id: "9d",
        group: RuleGroup::RevolvingUtilization,
        inputs: REVOL,
        predicate: |v| zero(v[0]) && miss(v[1]),
        action: Action::FillConstant(&[("revol_util", 0.0)]),
    },
    Rule {
        id: "9e",
        group: RuleGroup::RevolvingUtilization,
        inputs: REVOL,
        predicate: |v| miss(v[0]) && miss(v[1]),
        action: Action::FillConstant(&[("revol_bal", 0.0), ("revol_util", 0.0)]),
    },
];

/// Look up a rule by its identifier
pub fn rule(id: &str) -> Option<&'static Rule> {
    RULE_BOOK.iter().find(|r| r.id == id)
}
