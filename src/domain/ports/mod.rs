//! Port trait definitions (Hexagonal Architecture)
//!
//! - Oracle: classifies a candidate sequence as failing or passing
//!
//! The reduction engine depends only on these traits; concrete oracles live
//! in `crate::adapters::oracles`.
pub mod oracle;

pub use oracle::Oracle;
