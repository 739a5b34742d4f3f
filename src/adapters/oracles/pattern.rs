//! Regex-based oracles, including the default `<SELECT …>` tag detector.

use anyhow::Result;
use async_trait::async_trait;
use regex::bytes::Regex;
use std::sync::LazyLock;

use crate::domain::models::{Unit, UnitSequence, Verdict};
use crate::domain::ports::Oracle;
use crate::domain::ReductionError;

/// Case-insensitive `<SELECT …>` opening tag on a single line.
pub const SELECT_TAG_PATTERN: &str = r"(?i-u)<SELECT .*?>";

static SELECT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SELECT_TAG_PATTERN).expect("select tag pattern is valid"));

/// Fails when the encoded candidate matches a regular expression.
///
/// Matching runs over the candidate's bytes, so the oracle works for every
/// unit kind and tolerates input that is not valid UTF-8.
#[derive(Debug, Clone)]
pub struct RegexOracle {
    regex: Regex,
}

impl RegexOracle {
    pub fn new(pattern: &str) -> Result<Self, ReductionError> {
        let regex = Regex::new(pattern).map_err(|e| {
            ReductionError::InvalidArgument(format!("invalid oracle pattern '{pattern}': {e}"))
        })?;
        Ok(Self { regex })
    }

    /// The default oracle: an HTML `<SELECT …>` opening tag, any case.
    pub fn select_tag() -> Self {
        Self {
            regex: SELECT_TAG.clone(),
        }
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.regex.is_match(bytes)
    }
}

impl Default for RegexOracle {
    fn default() -> Self {
        Self::select_tag()
    }
}

#[async_trait]
impl<U: Unit> Oracle<U> for RegexOracle {
    async fn test(&self, input: &UnitSequence<U>) -> Result<Verdict> {
        Ok(Verdict::fail_if(self.matches(&input.to_bytes())))
    }

    fn name(&self) -> &str {
        "regex"
    }
}
