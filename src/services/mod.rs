//! Service layer: partitioning, oracle mediation and the reduction loop.

pub mod oracle_adapter;
pub mod partitioner;
pub mod reduction_controller;

pub use oracle_adapter::{OracleAdapter, OracleCounters, TrialError};
pub use partitioner::{clamp_granularity, complement, split, Partition};
pub use reduction_controller::{reduce, ReductionController, ReductionOptions};
