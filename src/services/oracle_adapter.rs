//! Oracle adapter: timeout, cancellation and verdict caching around an [`Oracle`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::models::{Span, Unit, UnitSequence, Verdict};
use crate::domain::ports::Oracle;

/// Why a trial produced no verdict.
#[derive(Debug)]
pub enum TrialError {
    /// The caller cancelled the reduction while the call was pending
    Cancelled,
    /// The oracle itself returned an error
    Oracle(anyhow::Error),
}

/// Snapshot of the adapter's call accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleCounters {
    pub calls: u64,
    pub cache_hits: u64,
    pub timeouts: u64,
}

/// Wraps a caller-supplied oracle for one reduction run.
///
/// The cache is keyed by arena spans, so an adapter must not be shared
/// between runs over different inputs. It only holds verdicts for trials of
/// the current candidate; the controller clears it on every reduction.
pub struct OracleAdapter<U: Unit> {
    oracle: Arc<dyn Oracle<U>>,
    timeout: Option<Duration>,
    cache: Option<Mutex<HashMap<Vec<Span>, Verdict>>>,
    calls: AtomicU64,
    cache_hits: AtomicU64,
    timeouts: AtomicU64,
}

impl<U: Unit> OracleAdapter<U> {
    pub fn new(oracle: Arc<dyn Oracle<U>>, timeout: Option<Duration>, cache_verdicts: bool) -> Self {
        Self {
            oracle,
            timeout,
            cache: cache_verdicts.then(|| Mutex::new(HashMap::new())),
            calls: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Classify `input`, answering from the cache when possible.
    ///
    /// Timed-out calls are reported as [`Verdict::Pass`] and never cached.
    pub async fn classify(
        &self,
        input: &UnitSequence<U>,
        cancel: &CancellationToken,
    ) -> Result<Verdict, TrialError> {
        if let Some(verdict) = self.cached(input) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(verdict);
        }
        let (verdict, timed_out) = self.invoke(input, cancel).await?;
        if !timed_out {
            self.remember(input, verdict);
        }
        Ok(verdict)
    }

    /// Classify `input` with a fresh oracle call, ignoring the cache.
    pub async fn classify_uncached(
        &self,
        input: &UnitSequence<U>,
        cancel: &CancellationToken,
    ) -> Result<Verdict, TrialError> {
        self.invoke(input, cancel).await.map(|(verdict, _)| verdict)
    }

    /// Forget every cached verdict.
    pub fn reset_cache(&self) {
        if let Some(mut cache) = self.cache.as_ref().and_then(|c| c.lock().ok()) {
            cache.clear();
        }
    }

    pub fn counters(&self) -> OracleCounters {
        OracleCounters {
            calls: self.calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    async fn invoke(
        &self,
        input: &UnitSequence<U>,
        cancel: &CancellationToken,
    ) -> Result<(Verdict, bool), TrialError> {
        if cancel.is_cancelled() {
            return Err(TrialError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::Relaxed);

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TrialError::Cancelled),
            outcome = bounded(self.oracle.test(input), self.timeout) => outcome,
        };

        match outcome {
            Some(result) => result
                .map(|verdict| (verdict, false))
                .map_err(TrialError::Oracle),
            None => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    oracle = self.oracle.name(),
                    units = input.len(),
                    timeout_ms = self
                        .timeout
                        .map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
                    "oracle call timed out, treating as pass"
                );
                Ok((Verdict::Pass, true))
            }
        }
    }

    fn cached(&self, input: &UnitSequence<U>) -> Option<Verdict> {
        let cache = self.cache.as_ref()?.lock().ok()?;
        cache.get(input.spans()).copied()
    }

    fn remember(&self, input: &UnitSequence<U>, verdict: Verdict) {
        if let Some(mut cache) = self.cache.as_ref().and_then(|c| c.lock().ok()) {
            cache.insert(input.spans().to_vec(), verdict);
        }
    }
}

/// Await `call`, giving up after `limit` when one is set.
async fn bounded<F>(call: F, limit: Option<Duration>) -> Option<F::Output>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call).await.ok(),
        None => Some(call.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct ContainsB {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Oracle<char> for ContainsB {
        async fn test(&self, input: &UnitSequence<char>) -> Result<Verdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Verdict::fail_if(input.iter().any(|c| *c == 'b')))
        }
    }

    struct Hangs;

    #[async_trait]
    impl Oracle<char> for Hangs {
        async fn test(&self, _input: &UnitSequence<char>) -> Result<Verdict> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Verdict::Fail)
        }

        fn name(&self) -> &str {
            "hangs"
        }
    }

    struct Broken;

    #[async_trait]
    impl Oracle<char> for Broken {
        async fn test(&self, _input: &UnitSequence<char>) -> Result<Verdict> {
            anyhow::bail!("oracle exploded")
        }
    }

    #[tokio::test]
    async fn test_cache_answers_repeated_sequences() {
        let oracle = Arc::new(ContainsB {
            calls: AtomicUsize::new(0),
        });
        let adapter: OracleAdapter<char> = OracleAdapter::new(oracle.clone(), None, true);
        let cancel = CancellationToken::new();
        let seq = UnitSequence::from("abc");

        assert_eq!(adapter.classify(&seq, &cancel).await.unwrap(), Verdict::Fail);
        assert_eq!(
            adapter.classify(&seq.slice(0..3), &cancel).await.unwrap(),
            Verdict::Fail
        );
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            adapter.counters(),
            OracleCounters {
                calls: 1,
                cache_hits: 1,
                timeouts: 0
            }
        );
    }

    #[tokio::test]
    async fn test_reset_cache_forgets_verdicts() {
        let oracle = Arc::new(ContainsB {
            calls: AtomicUsize::new(0),
        });
        let adapter: OracleAdapter<char> = OracleAdapter::new(oracle.clone(), None, true);
        let cancel = CancellationToken::new();
        let seq = UnitSequence::from("abc");

        adapter.classify(&seq, &cancel).await.unwrap();
        adapter.reset_cache();
        adapter.classify(&seq, &cancel).await.unwrap();

        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
        assert_eq!(adapter.counters().cache_hits, 0);
        assert_eq!(adapter.oracle_name(), "oracle");
    }

    #[tokio::test]
    async fn test_uncached_always_calls_oracle() {
        let oracle = Arc::new(ContainsB {
            calls: AtomicUsize::new(0),
        });
        let adapter: OracleAdapter<char> = OracleAdapter::new(oracle.clone(), None, true);
        let cancel = CancellationToken::new();
        let seq = UnitSequence::from("xyz");

        adapter.classify(&seq, &cancel).await.unwrap();
        let verdict = adapter.classify_uncached(&seq, &cancel).await.unwrap();
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let oracle = Arc::new(ContainsB {
            calls: AtomicUsize::new(0),
        });
        let adapter: OracleAdapter<char> = OracleAdapter::new(oracle.clone(), None, false);
        let cancel = CancellationToken::new();
        let seq = UnitSequence::from("b");

        adapter.classify(&seq, &cancel).await.unwrap();
        adapter.classify(&seq, &cancel).await.unwrap();
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
        assert_eq!(adapter.counters().cache_hits, 0);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_pass() {
        let adapter: OracleAdapter<char> = OracleAdapter::new(Arc::new(Hangs), Some(Duration::from_millis(50)), true);
        let cancel = CancellationToken::new();
        let seq = UnitSequence::from("abc");

        let verdict = adapter.classify(&seq, &cancel).await.unwrap();
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(adapter.counters().timeouts, 1);

        // Timeouts are not remembered
        adapter.classify(&seq, &cancel).await.unwrap();
        assert_eq!(adapter.counters().calls, 2);
        assert_eq!(adapter.counters().cache_hits, 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let adapter: OracleAdapter<char> = OracleAdapter::new(Arc::new(Hangs), None, true);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = adapter.classify(&UnitSequence::from("a"), &cancel).await;
        assert!(matches!(result, Err(TrialError::Cancelled)));
        assert_eq!(adapter.counters().calls, 0);
    }

    #[tokio::test]
    async fn test_oracle_error_propagates() {
        let adapter: OracleAdapter<char> = OracleAdapter::new(Arc::new(Broken), None, true);
        let cancel = CancellationToken::new();

        match adapter.classify(&UnitSequence::from("a"), &cancel).await {
            Err(TrialError::Oracle(err)) => assert_eq!(err.to_string(), "oracle exploded"),
            other => panic!("expected oracle error, got {other:?}"),
        }
    }
}
