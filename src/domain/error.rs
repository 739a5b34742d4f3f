use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the reduction engine and its content loader.
#[derive(Error, Debug)]
pub enum ReductionError {
    #[error("Failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Oracle does not classify the initial input as failing")]
    NoInitialFailure,

    #[error(
        "Oracle failed in round {round} (best failing candidate has {best_candidate_len} units)"
    )]
    OracleFailed {
        round: usize,
        best_candidate_len: usize,
        best_candidate: Vec<u8>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(
        "Reduction cancelled in round {round} (best failing candidate has {best_candidate_len} units)"
    )]
    Cancelled {
        round: usize,
        best_candidate_len: usize,
        best_candidate: Vec<u8>,
    },

    #[error("Oracle no longer classifies the reduced candidate ({len} units) as failing")]
    UnstableOracle { len: usize },
}

impl ReductionError {
    /// Encoded best-known failing candidate, when the error carries one.
    pub fn best_candidate(&self) -> Option<&[u8]> {
        match self {
            Self::OracleFailed { best_candidate, .. } | Self::Cancelled { best_candidate, .. } => {
                Some(best_candidate)
            }
            _ => None,
        }
    }
}
