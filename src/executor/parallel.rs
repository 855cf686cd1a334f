//! Parallel query execution.
//!
//! Candidates are independent, so a query fans out over a small pool of
//! worker threads. The calling thread feeds candidates into a bounded queue
//! (so a huge or lazy population is never materialized) and workers report
//! back through a result channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::error::{HistoryError, HistoryResult, ValidationError};
use crate::expr::Expression;
use crate::identity::ObjectIdentity;
use crate::oracle::LifePeriodOracle;
use crate::range_set::RangeSet;

use super::{evaluate_candidate, log_completion, record, CandidateOutcome, QueryOutcome};

/// Parallel executor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum queued candidates.
    pub queue_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

impl ExecutorConfig {
    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// `ValidationError::InvalidExecutorConfig` naming the offending field.
    pub const fn validate(&self) -> Result<(), ValidationError> {
        if self.workers == 0 {
            return Err(ValidationError::InvalidExecutorConfig { field: "workers" });
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidExecutorConfig {
                field: "queue_capacity",
            });
        }
        Ok(())
    }
}

type Job = (usize, ObjectIdentity);
type Reply = (usize, ObjectIdentity, HistoryResult<CandidateOutcome>);

/// Query executor that evaluates candidates on a pool of worker threads.
///
/// Produces the same [`QueryOutcome`] as the sequential
/// [`QueryExecutor`](super::QueryExecutor); failures are still reported in
/// input order.
#[derive(Debug, Clone)]
pub struct ParallelQueryExecutor {
    oracle: LifePeriodOracle,
    config: ExecutorConfig,
}

impl ParallelQueryExecutor {
    /// Creates an executor over `oracle`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unusable configuration.
    pub fn new(oracle: LifePeriodOracle, config: ExecutorConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { oracle, config })
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Evaluates `expr` for every candidate on the worker pool.
    ///
    /// After the first fatal error no new candidates are dispatched. Queued
    /// work still drains, and the fatal error of the lowest input index is
    /// returned, as the sequential executor would.
    ///
    /// # Errors
    ///
    /// The fatal (store) error of the earliest failing candidate, or an
    /// internal error if a worker thread cannot be spawned.
    pub fn run<I>(&self, candidates: I, expr: &Expression, universe: &RangeSet) -> HistoryResult<QueryOutcome>
    where
        I: IntoIterator<Item = ObjectIdentity>,
    {
        let (job_tx, job_rx) = bounded::<Job>(self.config.queue_capacity);
        let (reply_tx, reply_rx) = unbounded::<Reply>();
        let aborted = AtomicBool::new(false);

        let mut replies = thread::scope(|scope| -> HistoryResult<Vec<Reply>> {
            let mut spawned = Ok(());
            for idx in 0..self.config.workers {
                let job_rx: Receiver<Job> = job_rx.clone();
                let reply_tx: Sender<Reply> = reply_tx.clone();
                let oracle = &self.oracle;
                let aborted = &aborted;
                let worker = thread::Builder::new()
                    .name(format!("histql-query-{idx}"))
                    .spawn_scoped(scope, move || {
                        // Every dequeued job is answered so the lowest failing index wins.
                        for (index, candidate) in job_rx {
                            let result = evaluate_candidate(oracle, &candidate, expr, universe);
                            if result.is_err() {
                                aborted.store(true, Ordering::Relaxed);
                            }
                            if reply_tx.send((index, candidate, result)).is_err() {
                                break;
                            }
                        }
                    });
                if let Err(e) = worker {
                    aborted.store(true, Ordering::Relaxed);
                    spawned = Err(HistoryError::internal(format!(
                        "failed to spawn query worker: {e}"
                    )));
                    break;
                }
            }
            // Workers own the remaining handles; the channels close when they exit.
            drop(job_rx);
            drop(reply_tx);

            for (index, candidate) in candidates.into_iter().enumerate() {
                if aborted.load(Ordering::Relaxed) || job_tx.send((index, candidate)).is_err() {
                    break;
                }
            }
            drop(job_tx);

            let replies: Vec<Reply> = reply_rx.iter().collect();
            spawned.map(|()| replies)
        })?;

        replies.sort_by_key(|(index, _, _)| *index);

        let mut outcome = QueryOutcome::default();
        for (_, candidate, result) in replies {
            record(&mut outcome, candidate, result?);
        }
        log_completion(expr, &outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        assert!(ExecutorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_workers() {
        let config = ExecutorConfig {
            workers: 0,
            queue_capacity: 8,
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidExecutorConfig { field: "workers" })
        );
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let config = ExecutorConfig {
            workers: 2,
            queue_capacity: 0,
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidExecutorConfig {
                field: "queue_capacity"
            })
        );
    }
}
