//! deltamin - delta debugging for failure-inducing inputs
//!
//! Given an input that makes some program misbehave and an oracle that
//! recognizes the misbehavior, deltamin shrinks the input to a 1-minimal
//! failing version: removing any single unit makes the failure disappear.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): unit sequences, verdicts, errors and the oracle port
//! - **Service Layer** (`services`): partitioning, oracle adapter and the ddmin controller
//! - **Adapters** (`adapters`): regex, command and closure oracles
//! - **Infrastructure Layer** (`infrastructure`): content loading, configuration, logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use deltamin::{reduce, RegexOracle, UnitSequence};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let input = UnitSequence::from("<html><SELECT name=a></html>");
//!     let minimal = reduce(input, RegexOracle::select_tag()).await?;
//!     assert_eq!(minimal.to_string(), "<SELECT >");
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::oracles::{
    CommandOracle, CommandOracleConfig, FailOn, PredicateOracle, RegexOracle,
};
pub use domain::models::{
    Config, LoggingConfig, ReductionConfig, ReductionReport, ReductionStats, Span, Unit,
    UnitKind, UnitSequence, Verdict,
};
pub use domain::ports::Oracle;
pub use domain::ReductionError;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::content::{ContentLoader, LoadedContent};
pub use services::{reduce, ReductionController, ReductionOptions};
