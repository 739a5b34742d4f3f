use crate::domain::models::{Unit, UnitSequence, Verdict};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Port for classifying candidate inputs during reduction
///
/// An oracle decides whether a sequence still triggers the failure under
/// investigation. Implementations must be deterministic for a given input;
/// they need not be monotonic. The engine only ever hands out read-only
/// views of the candidate.
///
/// Errors returned here abort the reduction and are reported together with
/// the best failing candidate found so far.
///
/// # Examples
///
/// ```no_run
/// use deltamin::domain::models::{UnitSequence, Verdict};
/// use deltamin::domain::ports::Oracle;
/// use anyhow::Result;
///
/// async fn example(oracle: &dyn Oracle<char>) -> Result<()> {
///     let input = UnitSequence::from("<select name=x>");
///     let verdict = oracle.test(&input).await?;
///     assert_eq!(verdict, Verdict::Fail);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Oracle<U: Unit>: Send + Sync {
    /// Classify `input` as failing or passing
    async fn test(&self, input: &UnitSequence<U>) -> Result<Verdict>;

    /// Short name used in log output
    fn name(&self) -> &str {
        "oracle"
    }
}

#[async_trait]
impl<U: Unit, O: Oracle<U> + ?Sized> Oracle<U> for Arc<O> {
    async fn test(&self, input: &UnitSequence<U>) -> Result<Verdict> {
        (**self).test(input).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
