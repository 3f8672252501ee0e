//! Report module - summarizing and exporting preprocessing runs

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
