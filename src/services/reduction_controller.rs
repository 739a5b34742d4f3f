//! Reduction controller: the ddmin state machine.
//!
//! Each round splits the candidate into `n` parts and tries, in order,
//! `part_0, complement_0, part_1, complement_1, ...`. The first failing trial
//! decides the transition:
//!
//! - a failing part becomes the candidate and granularity resets to the minimum;
//! - a failing complement becomes the candidate and granularity drops by one;
//! - if nothing fails, granularity doubles (capped at the candidate length),
//!   and once every part is a single unit the candidate is 1-minimal.
//!
//! Trials of one round run through an order-preserving bounded stream, so with
//! `max_workers > 1` several oracle calls are in flight at once while the
//! applied transition stays the one the sequential order would pick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::domain::models::{
    ReductionConfig, ReductionReport, ReductionStats, Unit, UnitSequence, Verdict,
};
use crate::domain::ports::Oracle;
use crate::domain::ReductionError;
use crate::services::oracle_adapter::{OracleAdapter, TrialError};
use crate::services::partitioner::{clamp_granularity, Partition};

/// Tuning knobs for a reduction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionOptions {
    /// Starting granularity and floor after every reduction (at least 2)
    pub min_granularity: usize,
    /// Oracle trials allowed in flight within one round (1 = sequential)
    pub max_workers: usize,
    /// Per-call limit; a call exceeding it counts as pass
    pub oracle_timeout: Option<Duration>,
    /// Remember verdicts of sequences already classified during the run
    pub cache_verdicts: bool,
}

impl Default for ReductionOptions {
    fn default() -> Self {
        Self {
            min_granularity: 2,
            max_workers: 1,
            oracle_timeout: None,
            cache_verdicts: true,
        }
    }
}

impl ReductionOptions {
    pub fn validate(&self) -> Result<(), ReductionError> {
        if self.min_granularity < 2 {
            return Err(ReductionError::InvalidArgument(format!(
                "minimum granularity must be at least 2, got {}",
                self.min_granularity
            )));
        }
        if self.max_workers == 0 {
            return Err(ReductionError::InvalidArgument(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.oracle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ReductionError::InvalidArgument(
                "oracle timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&ReductionConfig> for ReductionOptions {
    fn from(config: &ReductionConfig) -> Self {
        Self {
            min_granularity: config.min_granularity,
            max_workers: config.max_workers,
            oracle_timeout: config.oracle_timeout_ms.map(Duration::from_millis),
            cache_verdicts: config.cache_verdicts,
        }
    }
}

/// Outcome of one partition round.
enum Transition<U: Unit> {
    Subset {
        index: usize,
        candidate: UnitSequence<U>,
    },
    Complement {
        index: usize,
        candidate: UnitSequence<U>,
    },
    Stay,
}

#[derive(Debug, Clone, Copy)]
enum Trial {
    Part(usize),
    Complement(usize),
}

/// Drives delta debugging of one input against one oracle.
pub struct ReductionController<U: Unit> {
    oracle: Arc<dyn Oracle<U>>,
    options: ReductionOptions,
}

impl<U: Unit> ReductionController<U> {
    pub fn new(oracle: Arc<dyn Oracle<U>>, options: ReductionOptions) -> Result<Self, ReductionError> {
        options.validate()?;
        Ok(Self { oracle, options })
    }

    /// Reduce `input` to a 1-minimal failing sequence.
    pub async fn reduce(
        &self,
        input: UnitSequence<U>,
    ) -> Result<ReductionReport<U>, ReductionError> {
        self.reduce_with_cancellation(input, CancellationToken::new())
            .await
    }

    /// Like [`Self::reduce`], aborting with [`ReductionError::Cancelled`]
    /// once `cancel` fires.
    pub async fn reduce_with_cancellation(
        &self,
        input: UnitSequence<U>,
        cancel: CancellationToken,
    ) -> Result<ReductionReport<U>, ReductionError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "reduce",
            %run_id,
            oracle = self.oracle.name(),
            units = input.len()
        );
        self.run(input, &cancel, run_id).instrument(span).await
    }

    async fn run(
        &self,
        input: UnitSequence<U>,
        cancel: &CancellationToken,
        run_id: Uuid,
    ) -> Result<ReductionReport<U>, ReductionError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let adapter = OracleAdapter::new(
            Arc::clone(&self.oracle),
            self.options.oracle_timeout,
            self.options.cache_verdicts,
        );
        let initial_len = input.len();

        match adapter.classify(&input, cancel).await {
            Ok(Verdict::Fail) => {}
            Ok(Verdict::Pass) => return Err(ReductionError::NoInitialFailure),
            Err(err) => return Err(abort(err, 0, &input)),
        }

        let min = self.options.min_granularity;
        let mut candidate = input;
        let mut n = min;
        let mut rounds = 0;

        while candidate.len() >= 2 {
            n = clamp_granularity(n, candidate.len());
            rounds += 1;
            let partition = Partition::new(candidate.len(), n)?;
            let transition = self
                .run_round(&adapter, &candidate, &partition, cancel)
                .await
                .map_err(|err| abort(err, rounds, &candidate))?;

            match transition {
                Transition::Subset {
                    index,
                    candidate: part,
                } => {
                    debug!(
                        round = rounds,
                        granularity = n,
                        index,
                        from = candidate.len(),
                        to = part.len(),
                        "reduced to subset"
                    );
                    candidate = part;
                    adapter.reset_cache();
                    n = min;
                }
                Transition::Complement {
                    index,
                    candidate: rest,
                } => {
                    debug!(
                        round = rounds,
                        granularity = n,
                        index,
                        from = candidate.len(),
                        to = rest.len(),
                        "reduced to complement"
                    );
                    candidate = rest;
                    adapter.reset_cache();
                    n = n.saturating_sub(1).max(min);
                }
                Transition::Stay if n < candidate.len() => {
                    n = n.saturating_mul(2).min(candidate.len());
                    trace!(round = rounds, granularity = n, "increasing granularity");
                }
                Transition::Stay => break,
            }
        }

        match adapter.classify_uncached(&candidate, cancel).await {
            Ok(Verdict::Fail) => {}
            Ok(Verdict::Pass) => {
                return Err(ReductionError::UnstableOracle {
                    len: candidate.len(),
                })
            }
            Err(err) => return Err(abort(err, rounds, &candidate)),
        }

        let counters = adapter.counters();
        let stats = ReductionStats {
            run_id,
            started_at,
            elapsed_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            initial_len,
            final_len: candidate.len(),
            rounds,
            oracle_calls: counters.calls,
            cache_hits: counters.cache_hits,
            timeouts: counters.timeouts,
        };
        info!(
            oracle = adapter.oracle_name(),
            initial_len,
            final_len = stats.final_len,
            rounds,
            oracle_calls = stats.oracle_calls,
            cache_hits = stats.cache_hits,
            "reduction finished"
        );

        Ok(ReductionReport {
            output: candidate,
            stats,
        })
    }

    /// Try parts and complements in order and return the first failing one.
    async fn run_round(
        &self,
        adapter: &OracleAdapter<U>,
        candidate: &UnitSequence<U>,
        partition: &Partition,
        cancel: &CancellationToken,
    ) -> Result<Transition<U>, TrialError> {
        let trials = partition
            .bounds()
            .iter()
            .enumerate()
            .flat_map(|(index, range)| {
                [
                    (Trial::Part(index), range.clone()),
                    (Trial::Complement(index), range.clone()),
                ]
            });

        let mut verdicts = stream::iter(trials)
            .map(|(trial, range)| async move {
                let sequence = match trial {
                    Trial::Part(_) => candidate.slice(range),
                    Trial::Complement(_) => candidate.without(range),
                };
                let verdict = adapter.classify(&sequence, cancel).await?;
                Ok::<_, TrialError>((trial, sequence, verdict))
            })
            .buffered(self.options.max_workers);

        while let Some(result) = verdicts.next().await {
            let (trial, sequence, verdict) = result?;
            if verdict.is_fail() {
                return Ok(match trial {
                    Trial::Part(index) => Transition::Subset {
                        index,
                        candidate: sequence,
                    },
                    Trial::Complement(index) => Transition::Complement {
                        index,
                        candidate: sequence,
                    },
                });
            }
        }

        trace!(granularity = partition.granularity(), "no failing trial");
        Ok(Transition::Stay)
    }
}

/// Turn a trial failure into the caller-facing error, attaching the best candidate.
fn abort<U: Unit>(err: TrialError, round: usize, best: &UnitSequence<U>) -> ReductionError {
    match err {
        TrialError::Cancelled => {
            warn!(round, best_len = best.len(), "reduction cancelled");
            ReductionError::Cancelled {
                round,
                best_candidate_len: best.len(),
                best_candidate: best.to_bytes(),
            }
        }
        TrialError::Oracle(source) => {
            error!(round, best_len = best.len(), error = %source, "oracle failed");
            ReductionError::OracleFailed {
                round,
                best_candidate_len: best.len(),
                best_candidate: best.to_bytes(),
                source: source.into(),
            }
        }
    }
}

/// Reduce `input` against `oracle` with default options.
pub async fn reduce<U, O>(input: UnitSequence<U>, oracle: O) -> Result<UnitSequence<U>, ReductionError>
where
    U: Unit,
    O: Oracle<U> + 'static,
{
    let oracle: Arc<dyn Oracle<U>> = Arc::new(oracle);
    let controller = ReductionController::new(oracle, ReductionOptions::default())?;
    Ok(controller.reduce(input).await?.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::oracles::PredicateOracle;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn contains(needle: char) -> PredicateOracle<char> {
        PredicateOracle::new(move |input: &UnitSequence<char>| {
            Verdict::fail_if(input.iter().any(|c| *c == needle))
        })
    }

    fn controller(
        oracle: impl Oracle<char> + 'static,
        options: ReductionOptions,
    ) -> ReductionController<char> {
        let oracle: Arc<dyn Oracle<char>> = Arc::new(oracle);
        ReductionController::new(oracle, options).expect("valid options")
    }

    /// Counts calls and fails whenever the input is non-empty.
    struct CountingAlwaysFail {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Oracle<char> for CountingAlwaysFail {
        async fn test(&self, input: &UnitSequence<char>) -> Result<Verdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Verdict::fail_if(!input.is_empty()))
        }
    }

    #[tokio::test]
    async fn test_reduces_to_single_failing_character() {
        let output = reduce(UnitSequence::from("aXbY"), contains('b'))
            .await
            .unwrap();
        assert_eq!(output.to_string(), "b");
    }

    #[tokio::test]
    async fn test_length_threshold_reduces_to_exact_threshold() {
        let at_least_three =
            PredicateOracle::new(|input: &UnitSequence<char>| Verdict::fail_if(input.len() >= 3));
        let output = reduce(UnitSequence::from("abcdef"), at_least_three)
            .await
            .unwrap();
        assert_eq!(output.len(), 3);
    }

    #[tokio::test]
    async fn test_single_unit_input_returned_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reducer = controller(
            CountingAlwaysFail {
                calls: Arc::clone(&calls),
            },
            ReductionOptions::default(),
        );

        let report = reducer.reduce(UnitSequence::from("x")).await.unwrap();
        assert_eq!(report.output.to_string(), "x");
        assert_eq!(report.stats.rounds, 0);
        // Initial check plus final verification
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_passing_input_is_rejected_before_any_round() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let always_pass = PredicateOracle::new(move |_: &UnitSequence<char>| {
            counted.fetch_add(1, Ordering::SeqCst);
            Verdict::Pass
        });

        let err = reduce(UnitSequence::from("abcdef"), always_pass)
            .await
            .unwrap_err();
        assert!(matches!(err, ReductionError::NoInitialFailure));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_result_is_one_minimal() {
        // Fails when both '<' and '>' are present, '<' first
        let tag = PredicateOracle::new(|input: &UnitSequence<char>| {
            let text: String = input.iter().collect();
            Verdict::fail_if(text.find('<').is_some_and(|open| text[open..].contains('>')))
        });
        let reducer = controller(tag.clone(), ReductionOptions::default());
        let report = reducer
            .reduce(UnitSequence::from("xx<select name=a>yy"))
            .await
            .unwrap();
        assert_eq!(report.output.to_string(), "<>");

        let output = report.output;
        for i in 0..output.len() {
            let verdict = tag.test(&output.without(i..i + 1)).await.unwrap();
            assert_eq!(verdict, Verdict::Pass, "removing unit {i} should pass");
        }
    }

    #[tokio::test]
    async fn test_minimum_granularity_is_validated() {
        let oracle: Arc<dyn Oracle<char>> = Arc::new(contains('b'));
        let options = ReductionOptions {
            min_granularity: 1,
            ..ReductionOptions::default()
        };
        assert!(matches!(
            ReductionController::new(Arc::clone(&oracle), options),
            Err(ReductionError::InvalidArgument(_))
        ));

        let options = ReductionOptions {
            max_workers: 0,
            ..ReductionOptions::default()
        };
        assert!(matches!(
            ReductionController::new(oracle, options),
            Err(ReductionError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_larger_minimum_granularity_still_minimizes() {
        let reducer = controller(
            contains('q'),
            ReductionOptions {
                min_granularity: 8,
                ..ReductionOptions::default()
            },
        );
        let report = reducer
            .reduce(UnitSequence::from("the quick brown fox"))
            .await
            .unwrap();
        assert_eq!(report.output.to_string(), "q");
    }

    struct ErrorsOnShortInput;

    #[async_trait]
    impl Oracle<char> for ErrorsOnShortInput {
        async fn test(&self, input: &UnitSequence<char>) -> Result<Verdict> {
            if input.len() < 3 {
                anyhow::bail!("renderer crashed on {} units", input.len());
            }
            Ok(Verdict::fail_if(input.iter().any(|c| *c == 'b')))
        }
    }

    #[tokio::test]
    async fn test_oracle_error_carries_best_candidate() {
        let reducer = controller(ErrorsOnShortInput, ReductionOptions::default());
        let err = reducer
            .reduce(UnitSequence::from("aXbY"))
            .await
            .unwrap_err();

        match err {
            ReductionError::OracleFailed {
                round,
                best_candidate_len,
                ref best_candidate,
                ..
            } => {
                assert_eq!(round, 1);
                assert_eq!(best_candidate_len, 4);
                assert_eq!(best_candidate.as_slice(), b"aXbY");
            }
            other => panic!("expected OracleFailed, got {other:?}"),
        }
    }

    /// Hangs on single units, otherwise fails when 'b' is present.
    struct HangsOnSingleUnits;

    #[async_trait]
    impl Oracle<char> for HangsOnSingleUnits {
        async fn test(&self, input: &UnitSequence<char>) -> Result<Verdict> {
            if input.len() == 1 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(Verdict::fail_if(input.iter().any(|c| *c == 'b')))
        }
    }

    #[tokio::test]
    async fn test_timed_out_calls_count_as_pass() {
        let reducer = controller(
            HangsOnSingleUnits,
            ReductionOptions {
                oracle_timeout: Some(Duration::from_millis(20)),
                ..ReductionOptions::default()
            },
        );
        let report = reducer.reduce(UnitSequence::from("aXbY")).await.unwrap();
        assert_eq!(report.output.to_string(), "bY");
        assert_eq!(report.stats.timeouts, 4);
    }

    /// Cancels the run from inside its third call.
    struct CancelsOnThirdCall {
        calls: AtomicUsize,
        token: CancellationToken,
    }

    #[async_trait]
    impl Oracle<char> for CancelsOnThirdCall {
        async fn test(&self, input: &UnitSequence<char>) -> Result<Verdict> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 2 {
                self.token.cancel();
            }
            Ok(Verdict::fail_if(input.iter().any(|c| *c == 'b')))
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_reduction() {
        let token = CancellationToken::new();
        let reducer = controller(
            CancelsOnThirdCall {
                calls: AtomicUsize::new(0),
                token: token.clone(),
            },
            ReductionOptions::default(),
        );

        let err = reducer
            .reduce_with_cancellation(UnitSequence::from("aaaaaaab"), token)
            .await
            .unwrap_err();
        assert!(matches!(err, ReductionError::Cancelled { .. }));
        assert!(err.best_candidate().is_some_and(|c| c.contains(&b'b')));
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_result() {
        let inputs = [
            "<html><body><SELECT name=x></body></html>",
            "abcdefghijklmnopqrstuvwxyz",
            "zzzzzzzzzzzzzzzzzzzzbzzzzzzzzzzz",
        ];
        for input in inputs {
            let oracle = PredicateOracle::new(|seq: &UnitSequence<char>| {
                let text: String = seq.iter().collect();
                Verdict::fail_if(text.contains('b') || text.contains("SE"))
            });
            let sequential = controller(oracle.clone(), ReductionOptions::default());
            let parallel = controller(
                oracle,
                ReductionOptions {
                    max_workers: 4,
                    ..ReductionOptions::default()
                },
            );

            let a = sequential.reduce(UnitSequence::from(input)).await.unwrap();
            let b = parallel.reduce(UnitSequence::from(input)).await.unwrap();
            assert_eq!(a.output, b.output, "input {input:?}");
            assert_eq!(a.stats.rounds, b.stats.rounds);
        }
    }

    /// Fails only on its first call.
    struct FailsOnce {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Oracle<char> for FailsOnce {
        async fn test(&self, _input: &UnitSequence<char>) -> Result<Verdict> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Verdict::fail_if(call == 0))
        }
    }

    #[tokio::test]
    async fn test_final_check_bypasses_cache_and_detects_unstable_oracle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reducer = controller(
            FailsOnce {
                calls: Arc::clone(&calls),
            },
            ReductionOptions::default(),
        );

        // The initial check and the final check see the same sequence, so a
        // cached answer would have hidden the flip.
        let err = reducer.reduce(UnitSequence::from("x")).await.unwrap_err();
        assert!(matches!(err, ReductionError::UnstableOracle { len: 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Fails on inputs containing 'b' for its first `budget` calls, then always passes.
    struct FlakyAfter {
        calls: AtomicUsize,
        budget: usize,
    }

    #[async_trait]
    impl Oracle<char> for FlakyAfter {
        async fn test(&self, input: &UnitSequence<char>) -> Result<Verdict> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Verdict::fail_if(
                call < self.budget && input.iter().any(|c| *c == 'b'),
            ))
        }
    }

    #[tokio::test]
    async fn test_unstable_oracle_after_reduction() {
        let reference = controller(contains('b'), ReductionOptions::default())
            .reduce(UnitSequence::from("aXbY"))
            .await
            .unwrap();
        // Every call made by the loop itself, excluding the final check
        let loop_calls = usize::try_from(reference.stats.oracle_calls).unwrap() - 1;

        let reducer = controller(
            FlakyAfter {
                calls: AtomicUsize::new(0),
                budget: loop_calls,
            },
            ReductionOptions::default(),
        );
        let err = reducer.reduce(UnitSequence::from("aXbY")).await.unwrap_err();
        assert!(matches!(err, ReductionError::UnstableOracle { len: 1 }));
        assert!(err.best_candidate().is_none());
    }

    #[tokio::test]
    async fn test_cache_hits_recorded() {
        let both = PredicateOracle::new(|input: &UnitSequence<char>| {
            Verdict::fail_if(input.iter().any(|c| *c == 'a') && input.iter().any(|c| *c == 'b'))
        });
        let reducer = controller(both, ReductionOptions::default());
        let report = reducer.reduce(UnitSequence::from("aXYb")).await.unwrap();
        assert_eq!(report.output.to_string(), "ab");
        // At n = 2 each complement equals the other part
        assert!(report.stats.cache_hits > 0);
        assert_eq!(report.stats.initial_len, 4);
        assert_eq!(report.stats.final_len, 2);
    }
}
