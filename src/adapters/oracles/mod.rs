//! Concrete oracle implementations.

pub mod command;
pub mod pattern;
pub mod predicate;

pub use command::{CommandOracle, CommandOracleConfig, FailOn};
pub use pattern::{RegexOracle, SELECT_TAG_PATTERN};
pub use predicate::PredicateOracle;
