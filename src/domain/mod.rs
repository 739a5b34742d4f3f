//! Domain layer for the delta-debugging engine
//!
//! This module contains the core data model (unit sequences, verdicts,
//! configuration) and the oracle port the engine is written against.

pub mod error;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use error::ReductionError;
