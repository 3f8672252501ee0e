//! Loan-prep: Loan Application Preprocessing Library
//!
//! Prepares a raw loan-application dataset for Good/Bad loan classification:
//! type normalisation, label derivation with column selection, and rule-based
//! missing value resolution that yields a feature table and a label vector.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::SelectionConfig;
pub use error::PrepError;
