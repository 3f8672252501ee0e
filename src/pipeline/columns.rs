//! Fixed column-name tables for the loan-servicing record schema
//!
//! Names are matched verbatim against the raw dataset.

/// Name of the derived binary label column
pub const LABEL_COLUMN: &str = "loan_condition";

/// Application-type column used to keep individual applications only
pub const APPLICATION_TYPE: &str = "application_type";

/// Raw loan status column the label is derived from
pub const LOAN_STATUS: &str = "loan_status";

/// Employment length column, cast to an ordered category
pub const EMP_LENGTH: &str = "emp_length";

/// Sentinel for "no qualifying event observed"
pub const SENTINEL: f64 = 99.0;

/// Columns cast to 64-bit integers
pub const INT_FEATURES: &[&str] = &[
    "id",
    "member_id",
    "delinq_2yrs",
    "open_acc",
    "pub_rec",
    "total_acc",
    "collections_12_mths_ex_med",
    "policy_code",
    "acc_now_delinq",
];

/// Columns cast to 64-bit floats
pub const FLOAT_FEATURES: &[&str] = &[
    "id",
    "member_id",
    "loan_amnt",
    "funded_amnt",
    "funded_amnt_inv",
    "int_rate",
    "installment",
    "annual_inc",
    "dti",
    "delinq_2yrs",
    "inq_last_6mths",
    "mths_since_last_delinq",
    "mths_since_last_record",
    "open_acc",
    "pub_rec",
    "revol_bal",
    "revol_util",
    "total_acc",
    "out_prncp",
    "out_prncp_inv",
    "total_pymnt",
    "total_pymnt_inv",
    "total_rec_prncp",
    "total_rec_int",
    "total_rec_late_fee",
    "recoveries",
    "collection_recovery_fee",
    "last_pymnt_amnt",
    "collections_12_mths_ex_med",
    "mths_since_last_major_derog",
    "policy_code",
    "annual_inc_joint",
    "dti_joint",
    "acc_now_delinq",
    "tot_coll_amt",
    "tot_cur_bal",
    "open_acc_6m",
    "open_il_12m",
    "open_il_24m",
    "mths_since_rcnt_il",
    "total_bal_il",
    "il_util",
    "open_rv_12m",
    "open_rv_24m",
    "max_bal_bc",
    "all_util",
    "total_rev_hi_lim",
    "inq_fi",
    "total_cu_tl",
    "inq_last_12m",
];

/// Columns holding `Mon-YYYY` dates
pub const DATE_FEATURES: &[&str] = &[
    "issue_d",
    "earliest_cr_line",
    "last_pymnt_d",
    "next_pymnt_d",
    "last_credit_pull_d",
];

/// Free-text columns that get surrounding whitespace stripped
pub const STRING_FEATURES: &[&str] = &["emp_title", "title", "desc", "zip_code", "addr_state"];

/// Columns cast to unordered categoricals
pub const CATEGORICAL_FEATURES: &[&str] = &[
    "term",
    "grade",
    "sub_grade",
    "emp_length",
    "home_ownership",
    "verification_status",
    "loan_status",
    "pymnt_plan",
    "purpose",
    "initial_list_status",
    "application_type",
    "verification_status_joint",
];

/// Employment length levels, lowest first
pub const EMP_LENGTH_ORDER: &[&str] = &[
    "< 1 year",
    "1 year",
    "2 years",
    "3 years",
    "4 years",
    "5 years",
    "6 years",
    "7 years",
    "8 years",
    "9 years",
    "10+ years",
];

/// Credit-profile columns describing the applicant
pub const APPLICANT_FEATURES: &[&str] = &[
    "emp_length",
    "home_ownership",
    "annual_inc",
    "verification_status",
    "dti",
    "earliest_cr_line",
    "delinq_2yrs",
    "mths_since_last_delinq",
    "acc_now_delinq",
    "pub_rec",
    "mths_since_last_record",
    "mths_since_last_major_derog",
    "inq_last_6mths",
    "inq_last_12m",
    "inq_fi",
    "open_acc",
    "total_acc",
    "tot_cur_bal",
    "tot_coll_amt",
    "collections_12_mths_ex_med",
    "open_acc_6m",
    "open_il_12m",
    "open_il_24m",
    "mths_since_rcnt_il",
    "total_bal_il",
    "il_util",
    "open_rv_12m",
    "open_rv_24m",
    "max_bal_bc",
    "all_util",
    "revol_bal",
    "revol_util",
    "total_rev_hi_lim",
    "total_cu_tl",
];

/// Columns describing the requested loan
pub const LOAN_FEATURES: &[&str] = &[
    "loan_amnt",
    "term",
    "int_rate",
    "installment",
    "grade",
    "sub_grade",
    "pymnt_plan",
];

/// Rows missing any of these are dropped
pub const MANDATORY_FEATURES: &[&str] = &[
    "annual_inc",
    "dti",
    "home_ownership",
    "loan_amnt",
    "term",
    "int_rate",
    "installment",
    "grade",
    "sub_grade",
    "pymnt_plan",
];

/// Remaining missing values in these columns become 0
pub const ZERO_FILL_FEATURES: &[&str] = &[
    "delinq_2yrs",
    "acc_now_delinq",
    "pub_rec",
    "inq_last_6mths",
    "inq_last_12m",
    "inq_fi",
    "open_acc",
    "total_acc",
    "tot_cur_bal",
    "tot_coll_amt",
    "collections_12_mths_ex_med",
    "open_acc_6m",
    "open_il_12m",
    "open_il_24m",
    "total_bal_il",
    "il_util",
    "open_rv_12m",
    "open_rv_24m",
    "max_bal_bc",
    "all_util",
    "revol_bal",
    "revol_util",
    "total_rev_hi_lim",
    "total_cu_tl",
];

/// Remaining missing values in these "months since" columns become [`SENTINEL`]
pub const SENTINEL_FILL_FEATURES: &[&str] = &[
    "mths_since_rcnt_il",
    "mths_since_last_record",
    "mths_since_last_major_derog",
    "mths_since_last_delinq",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_selection_lists_have_expected_sizes() {
        assert_eq!(APPLICANT_FEATURES.len(), 34);
        assert_eq!(LOAN_FEATURES.len(), 7);
        assert_eq!(MANDATORY_FEATURES.len(), 10);
        assert_eq!(EMP_LENGTH_ORDER.len(), 11);
    }

    #[test]
    fn test_fill_lists_are_selected() {
        let selected: HashSet<&str> = APPLICANT_FEATURES
            .iter()
            .chain(LOAN_FEATURES)
            .copied()
            .collect();
        for name in ZERO_FILL_FEATURES
            .iter()
            .chain(SENTINEL_FILL_FEATURES)
            .chain(MANDATORY_FEATURES)
        {
            assert!(selected.contains(name), "{} is not a selected column", name);
        }
    }
}
