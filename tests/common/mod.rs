//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::collections::BTreeMap;

use loanprep::pipeline::columns::{APPLICANT_FEATURES, LABEL_COLUMN, LOAN_FEATURES};
use loanprep::pipeline::{selected_columns, LoanCondition};
use loanprep::SelectionConfig;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Selected columns that hold text rather than numbers
pub const TEXT_COLUMNS: &[&str] = &[
    "emp_length",
    "home_ownership",
    "verification_status",
    "earliest_cr_line",
    "term",
    "grade",
    "sub_grade",
    "pymnt_plan",
];

/// One loan record with every selected column populated.
///
/// `LoanRow::clean()` is a fully populated, individual, fully paid loan whose
/// values select no rule of the rule book, so a table of clean rows comes out
/// of the resolver unchanged.
#[derive(Debug, Clone)]
pub struct LoanRow {
    pub application_type: String,
    pub loan_status: String,
    pub numbers: BTreeMap<&'static str, Option<f64>>,
    pub text: BTreeMap<&'static str, Option<String>>,
}

impl LoanRow {
    pub fn clean() -> Self {
        let mut numbers = BTreeMap::new();
        let mut text = BTreeMap::new();

        for &name in APPLICANT_FEATURES.iter().chain(LOAN_FEATURES) {
            if TEXT_COLUMNS.contains(&name) {
                text.insert(name, Some(clean_text(name).to_string()));
            } else {
                numbers.insert(name, Some(clean_number(name)));
            }
        }

        Self {
            application_type: "Individual".to_string(),
            loan_status: "Fully Paid".to_string(),
            numbers,
            text,
        }
    }

    /// Set a numeric column; `None` makes it missing
    pub fn set(mut self, name: &'static str, value: Option<f64>) -> Self {
        assert!(self.numbers.contains_key(name), "{} is not a numeric column", name);
        self.numbers.insert(name, value);
        self
    }

    /// Set a text column; `None` makes it missing
    pub fn text(mut self, name: &'static str, value: Option<&str>) -> Self {
        assert!(self.text.contains_key(name), "{} is not a text column", name);
        self.text.insert(name, value.map(str::to_string));
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.loan_status = status.to_string();
        self
    }

    pub fn application(mut self, application_type: &str) -> Self {
        self.application_type = application_type.to_string();
        self
    }
}

fn clean_number(name: &str) -> f64 {
    match name {
        "annual_inc" => 52_000.0,
        "dti" => 14.2,
        "delinq_2yrs" => 1.0,
        "mths_since_last_delinq" => 30.0,
        "acc_now_delinq" => 0.0,
        "pub_rec" => 1.0,
        "mths_since_last_record" => 48.0,
        "mths_since_last_major_derog" => 40.0,
        "inq_last_6mths" => 1.0,
        "inq_last_12m" => 2.0,
        "inq_fi" => 1.0,
        "open_acc" => 7.0,
        "total_acc" => 15.0,
        "tot_cur_bal" => 24_000.0,
        "tot_coll_amt" => 150.0,
        "collections_12_mths_ex_med" => 1.0,
        "open_acc_6m" => 1.0,
        "open_il_12m" => 1.0,
        "open_il_24m" => 2.0,
        "mths_since_rcnt_il" => 6.0,
        "total_bal_il" => 8_400.0,
        "il_util" => 62.0,
        "open_rv_12m" => 1.0,
        "open_rv_24m" => 3.0,
        "max_bal_bc" => 1_900.0,
        "all_util" => 48.0,
        "revol_bal" => 5_300.0,
        "revol_util" => 37.5,
        "total_rev_hi_lim" => 14_000.0,
        "total_cu_tl" => 2.0,
        "loan_amnt" => 12_000.0,
        "int_rate" => 11.99,
        "installment" => 398.5,
        other => panic!("no clean value for {}", other),
    }
}

fn clean_text(name: &str) -> &'static str {
    match name {
        "emp_length" => "5 years",
        "home_ownership" => "RENT",
        "verification_status" => "Verified",
        "earliest_cr_line" => "Aug-2003",
        "term" => " 36 months",
        "grade" => "B",
        "sub_grade" => "B4",
        "pymnt_plan" => "n",
        other => panic!("no clean value for {}", other),
    }
}

fn number_column(name: &str, rows: &[LoanRow]) -> Column {
    let values: Vec<Option<f64>> = rows.iter().map(|r| r.numbers[name]).collect();
    Column::new(name.into(), values)
}

fn text_column(name: &str, rows: &[LoanRow]) -> Column {
    let values: Vec<Option<&str>> = rows.iter().map(|r| r.text[name].as_deref()).collect();
    Column::new(name.into(), values)
}

/// Table shaped like the selector's output: label first, then the applicant
/// and loan columns. Every row must carry a labelled status.
pub fn selected_frame(rows: &[LoanRow]) -> DataFrame {
    let names = selected_columns(&SelectionConfig::default()).unwrap();

    let columns: Vec<Column> = names
        .iter()
        .map(|name| {
            if name == LABEL_COLUMN {
                let labels: Vec<&str> = rows
                    .iter()
                    .map(|r| {
                        LoanCondition::from_status(&r.loan_status)
                            .expect("fixture rows must be labelled")
                            .as_str()
                    })
                    .collect();
                Column::new(LABEL_COLUMN.into(), labels)
                    .cast(&DataType::Categorical(None, CategoricalOrdering::Physical))
                    .unwrap()
            } else if TEXT_COLUMNS.contains(&name.as_str()) {
                text_column(name, rows)
            } else {
                number_column(name, rows)
            }
        })
        .collect();

    DataFrame::new(columns).unwrap()
}

/// Raw dataset as it arrives before normalisation: an id, the application
/// type and loan status, a couple of columns outside the selection, and
/// every selected column with text left as text.
pub fn raw_frame(rows: &[LoanRow]) -> DataFrame {
    let ids: Vec<i64> = (1..=rows.len() as i64).collect();
    let application_types: Vec<&str> = rows.iter().map(|r| r.application_type.as_str()).collect();
    let statuses: Vec<&str> = rows.iter().map(|r| r.loan_status.as_str()).collect();
    let titles: Vec<&str> = rows.iter().map(|_| "  Registered Nurse ").collect();
    let issued: Vec<&str> = rows.iter().map(|_| "Dec-2015").collect();

    let mut columns = vec![
        Column::new("id".into(), ids),
        Column::new("application_type".into(), application_types),
        Column::new("loan_status".into(), statuses),
        Column::new("emp_title".into(), titles),
        Column::new("issue_d".into(), issued),
    ];

    let names = selected_columns(&SelectionConfig::default()).unwrap();
    for name in names.iter().filter(|n| n.as_str() != LABEL_COLUMN) {
        if TEXT_COLUMNS.contains(&name.as_str()) {
            columns.push(text_column(name, rows));
        } else {
            columns.push(number_column(name, rows));
        }
    }

    DataFrame::new(columns).unwrap()
}

/// Clean rows with random gaps punched into the numeric columns.
///
/// Deterministic for a given seed.
pub fn random_gappy_rows(count: usize, missing_rate: f64, seed: u64) -> Vec<LoanRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let template = LoanRow::clean();
    let numeric: Vec<&'static str> = template.numbers.keys().copied().collect();

    (0..count)
        .map(|_| {
            let mut row = template.clone();
            for &name in &numeric {
                if rng.gen_bool(missing_rate) {
                    row.numbers.insert(name, None);
                } else if rng.gen_bool(0.2) {
                    row.numbers.insert(name, Some(0.0));
                }
            }
            if rng.gen_bool(0.3) {
                row.loan_status = "Charged Off".to_string();
            }
            row
        })
        .collect()
}
