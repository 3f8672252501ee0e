//! Error types for loan preprocessing.
//!
//! Recoverable conditions (failed casts, incompatible column fills, optional
//! columns that are not present) never surface here. These variants are the
//! failures that must stop the pipeline and reach the caller.

use polars::prelude::DataType;
use thiserror::Error;

/// Errors raised by the preprocessing stages.
///
/// Public operations return `anyhow::Result`, so callers that need to branch
/// on a specific failure can use `err.downcast_ref::<PrepError>()`.
#[derive(Debug, Error)]
pub enum PrepError {
    /// `transform` was called on a resolver that has not been fitted.
    #[error("Missing value resolver is not fitted; call fit() before transform()")]
    NotFitted,

    /// The reference data has no row with a past delinquency, no current
    /// delinquency and a known delinquency age, so the median is undefined.
    #[error(
        "Cannot fit delinquency age median: no rows with delinq_2yrs > 0, \
         acc_now_delinq == 0 and a known mths_since_last_delinq"
    )]
    EmptyFitSample,

    /// A column that a non-optional step reads is absent from the table.
    #[error("Required column '{column}' not found in dataset")]
    MissingColumn {
        /// Name of the absent column
        column: String,
    },

    /// A column that a rule reads or writes does not hold numbers.
    #[error("Column '{column}' is not numeric ({dtype}); missing value rules need a numeric column")]
    NonNumericColumn {
        /// Name of the offending column
        column: String,
        /// Its dtype as reported by polars
        dtype: String,
    },

    /// An excluded column is not among the selected columns.
    #[error("Excluded column '{0}' is not among the selected columns")]
    UnknownExcludedColumn(String),

    /// The label column holds something other than the two loan classes.
    #[error("Unrecognized loan condition label: '{0}'")]
    UnknownLabel(String),
}

impl PrepError {
    pub(crate) fn missing_column(column: &str) -> Self {
        PrepError::MissingColumn {
            column: column.to_string(),
        }
    }

    pub(crate) fn non_numeric_column(column: &str, dtype: &DataType) -> Self {
        PrepError::NonNumericColumn {
            column: column.to_string(),
            dtype: dtype.to_string(),
        }
    }
}
