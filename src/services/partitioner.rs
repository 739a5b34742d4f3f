//! Splitting candidates into contiguous, near-equal parts.
//!
//! Parts are computed as index ranges first ([`Partition`]) and only turned
//! into sequences on demand, so a round over `n` parts never copies units.

use std::ops::Range;

use crate::domain::models::{Unit, UnitSequence};
use crate::domain::ReductionError;

/// Clamp a requested granularity to what a sequence of `len` units supports.
pub fn clamp_granularity(n: usize, len: usize) -> usize {
    n.min(len).max(2)
}

/// Boundaries of `n` contiguous parts over a sequence of known length.
///
/// The first `len % n` parts are one unit longer than the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    bounds: Vec<Range<usize>>,
}

impl Partition {
    pub fn new(len: usize, n: usize) -> Result<Self, ReductionError> {
        if n < 2 {
            return Err(ReductionError::InvalidArgument(format!(
                "granularity must be at least 2, got {n}"
            )));
        }
        let n = clamp_granularity(n, len);
        let size = len / n;
        let remainder = len % n;

        let mut start = 0;
        let bounds = (0..n)
            .map(|i| {
                let end = start + size + usize::from(i < remainder);
                let range = start..end;
                start = end;
                range
            })
            .collect();

        Ok(Self { bounds })
    }

    /// Number of parts after clamping
    pub fn granularity(&self) -> usize {
        self.bounds.len()
    }

    pub fn bounds(&self) -> &[Range<usize>] {
        &self.bounds
    }
}

/// Split `seq` into `n` contiguous parts (`n` clamped to the sequence length).
pub fn split<U: Unit>(
    seq: &UnitSequence<U>,
    n: usize,
) -> Result<Vec<UnitSequence<U>>, ReductionError> {
    let partition = Partition::new(seq.len(), n)?;
    Ok(partition
        .bounds()
        .iter()
        .map(|range| seq.slice(range.clone()))
        .collect())
}

/// Concatenate every part except `index`, preserving order.
pub fn complement<U: Unit>(
    parts: &[UnitSequence<U>],
    index: usize,
) -> Result<UnitSequence<U>, ReductionError> {
    if index >= parts.len() {
        return Err(ReductionError::InvalidArgument(format!(
            "part index {index} out of range for {} parts",
            parts.len()
        )));
    }
    let rest: Vec<UnitSequence<U>> = parts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, part)| part.clone())
        .collect();

    UnitSequence::concat(&rest).ok_or_else(|| {
        ReductionError::InvalidArgument(
            "complement requires at least two parts sharing one arena".to_string(),
        )
    })
}
