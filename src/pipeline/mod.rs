//! Pipeline module - the three preprocessing stages and their building blocks

pub mod columns;
pub mod frame;
pub mod label;
pub mod missing;
pub mod normalize;
pub mod preprocess;
pub mod rules;

pub use label::*;
pub use missing::*;
pub use normalize::*;
pub use preprocess::*;
pub use rules::{Action, Rule, RuleEffect, RuleGroup, RULE_BOOK};
