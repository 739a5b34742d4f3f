use serde::{Deserialize, Serialize};
use std::fmt;

/// Oracle classification of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The input still triggers the failure under investigation.
    Fail,
    /// The input does not trigger the failure.
    Pass,
}

impl Verdict {
    /// `Fail` when `failing` holds, `Pass` otherwise.
    pub const fn fail_if(failing: bool) -> Self {
        if failing {
            Self::Fail
        } else {
            Self::Pass
        }
    }

    pub const fn is_fail(self) -> bool {
        matches!(self, Self::Fail)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Pass => "pass",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
