//! Query execution over a candidate population.
//!
//! The executors call the oracle once per candidate and assemble the match
//! map. A candidate whose expression is malformed is recorded as a failure
//! and skipped; a failing store aborts the whole batch, since partial results
//! over an inconsistent store would be misleading.

mod parallel;

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::{CandidateFailure, EvaluationError, HistoryError, HistoryResult};
use crate::expr::Expression;
use crate::identity::ObjectIdentity;
use crate::oracle::{scoped_universe, LifePeriodOracle};
use crate::range_set::RangeSet;

pub use parallel::{ExecutorConfig, ParallelQueryExecutor};

/// Result of running a query over a candidate population.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Matching candidates and the revisions during which they match.
    /// Candidates that never match are absent.
    pub matches: HashMap<ObjectIdentity, RangeSet>,
    /// Candidates whose evaluation failed, in input order.
    pub failures: Vec<CandidateFailure>,
    /// Number of candidates evaluated.
    pub evaluated: usize,
}

impl QueryOutcome {
    /// Revisions during which `candidate` matched, if it ever did.
    #[must_use]
    pub fn get(&self, candidate: &ObjectIdentity) -> Option<&RangeSet> {
        self.matches.get(candidate)
    }

    /// True if no candidate matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// What evaluating one candidate produced.
#[derive(Debug)]
pub(crate) enum CandidateOutcome {
    Matched(RangeSet),
    NoMatch,
    Failed(EvaluationError),
}

/// Evaluates one candidate, clipping the universe to its lifetime first.
///
/// Only fatal errors are returned as `Err`.
pub(crate) fn evaluate_candidate(
    oracle: &LifePeriodOracle,
    candidate: &ObjectIdentity,
    expr: &Expression,
    universe: &RangeSet,
) -> HistoryResult<CandidateOutcome> {
    let lifetime = oracle.history().lifetime(candidate)?;
    let scoped = scoped_universe(universe, lifetime);
    if scoped.is_empty() {
        return Ok(CandidateOutcome::NoMatch);
    }

    match oracle.evaluate(candidate, expr, &scoped) {
        Ok(result) if result.is_empty() => Ok(CandidateOutcome::NoMatch),
        Ok(result) => Ok(CandidateOutcome::Matched(result)),
        Err(HistoryError::Evaluation(error)) => Ok(CandidateOutcome::Failed(error)),
        Err(e) => Err(e),
    }
}

/// Folds one candidate's outcome into the query outcome.
pub(crate) fn record(outcome: &mut QueryOutcome, candidate: ObjectIdentity, result: CandidateOutcome) {
    outcome.evaluated += 1;
    match result {
        CandidateOutcome::Matched(ranges) => {
            debug!(target: "histql::executor", candidate = %candidate, ranges = %ranges, "candidate matched");
            outcome.matches.insert(candidate, ranges);
        }
        CandidateOutcome::NoMatch => {}
        CandidateOutcome::Failed(error) => {
            warn!(target: "histql::executor", candidate = %candidate, error = %error, "candidate evaluation failed");
            outcome.failures.push(CandidateFailure { candidate, error });
        }
    }
}

fn log_completion(expr: &Expression, outcome: &QueryOutcome) {
    info!(
        target: "histql::executor",
        expression = %expr,
        evaluated = outcome.evaluated,
        matched = outcome.matches.len(),
        failed = outcome.failures.len(),
        "history query completed"
    );
}

/// Sequential query executor.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use histql::{
///     AttributeId, BranchId, Expression, InMemoryHistoryStore, LifePeriodOracle, ObjectIdentity,
///     QueryExecutor, RangeSet, Revision,
/// };
///
/// let store = Arc::new(InMemoryHistoryStore::new());
/// let name = AttributeId::new("name").unwrap();
/// let e1 = ObjectIdentity::random(BranchId::TRUNK, "E");
/// store.create_object(e1.clone(), Revision::new(1)).unwrap();
/// store.set_attribute(&e1, &name, "e1", Revision::new(1)).unwrap();
///
/// let executor = QueryExecutor::new(LifePeriodOracle::from_store(store));
/// let expr = Expression::eq(Expression::own(name), Expression::literal("e1"));
/// let outcome = executor.run([e1.clone()], &expr, &RangeSet::universe()).unwrap();
///
/// assert!(outcome.get(&e1).unwrap().contains(Revision::new(1)));
/// ```
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    oracle: LifePeriodOracle,
}

impl QueryExecutor {
    /// Creates an executor over `oracle`.
    #[must_use]
    pub const fn new(oracle: LifePeriodOracle) -> Self {
        Self { oracle }
    }

    /// The oracle used per candidate.
    #[must_use]
    pub const fn oracle(&self) -> &LifePeriodOracle {
        &self.oracle
    }

    /// Evaluates `expr` for every candidate, in input order.
    ///
    /// Stopping the candidate iterator early ends the query early.
    ///
    /// # Errors
    ///
    /// Returns the first fatal (store) error; per-candidate evaluation
    /// errors are reported in [`QueryOutcome::failures`] instead.
    pub fn run<I>(&self, candidates: I, expr: &Expression, universe: &RangeSet) -> HistoryResult<QueryOutcome>
    where
        I: IntoIterator<Item = ObjectIdentity>,
    {
        let mut outcome = QueryOutcome::default();
        for candidate in candidates {
            let result = evaluate_candidate(&self.oracle, &candidate, expr, universe)?;
            record(&mut outcome, candidate, result);
        }
        log_completion(expr, &outcome);
        Ok(outcome)
    }
}
