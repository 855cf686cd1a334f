//! The life period oracle.
//!
//! Given a root object and an [`Expression`], the oracle computes the exact
//! [`RangeSet`] of revisions during which the expression holds for that root.
//!
//! Logical connectives map onto the range algebra. Comparisons are where the
//! work is: both operands are decomposed into breakpoints (every revision at
//! which a value on either side, or the target of any reference on either
//! path, may change). Between two consecutive breakpoints everything is
//! constant, so each stretch is decided by evaluating it once at its first
//! revision.

mod cache;
mod path;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::{EvaluationError, HistoryResult};
use crate::expr::{CompareOp, Expression};
use crate::identity::ObjectIdentity;
use crate::range_set::RangeSet;
use crate::revision::{Revision, RevisionRange};
use crate::storage::{AttributeHistoryProvider, ReferenceResolver};
use crate::value::Value;

use cache::HistoryCache;

/// Evaluates historic predicates against the store collaborators.
///
/// Cloning is cheap; clones share the collaborators.
#[derive(Clone)]
pub struct LifePeriodOracle {
    history: Arc<dyn AttributeHistoryProvider>,
    references: Arc<dyn ReferenceResolver>,
}

impl std::fmt::Debug for LifePeriodOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifePeriodOracle").finish_non_exhaustive()
    }
}

impl LifePeriodOracle {
    /// Builds an oracle over separate collaborators.
    #[must_use]
    pub fn new(
        history: Arc<dyn AttributeHistoryProvider>,
        references: Arc<dyn ReferenceResolver>,
    ) -> Self {
        Self {
            history,
            references,
        }
    }

    /// Builds an oracle over a store implementing both collaborator traits.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AttributeHistoryProvider + ReferenceResolver + 'static,
    {
        Self {
            history: store.clone(),
            references: store,
        }
    }

    /// The history collaborator.
    #[must_use]
    pub fn history(&self) -> &dyn AttributeHistoryProvider {
        self.history.as_ref()
    }

    /// The set of revisions within `universe` during which `expr` holds for
    /// `root`.
    ///
    /// # Errors
    ///
    /// `HistoryError::Evaluation` for malformed expressions (type mismatch,
    /// non-value comparison operands, path steps that are not references),
    /// `HistoryError::Store` if a collaborator fails.
    pub fn evaluate(
        &self,
        root: &ObjectIdentity,
        expr: &Expression,
        universe: &RangeSet,
    ) -> HistoryResult<RangeSet> {
        let mut evaluation = Evaluation {
            root,
            cache: HistoryCache::new(self.history.as_ref(), self.references.as_ref()),
        };
        let result = evaluation.eval(expr, universe)?;
        debug!(
            target: "histql::oracle",
            root = %root,
            ranges = result.len(),
            fetches = evaluation.cache.fetches(),
            "evaluated expression"
        );
        Ok(result)
    }
}

/// State of one `evaluate` call.
struct Evaluation<'a> {
    root: &'a ObjectIdentity,
    cache: HistoryCache<'a>,
}

impl Evaluation<'_> {
    fn eval(&mut self, expr: &Expression, universe: &RangeSet) -> HistoryResult<RangeSet> {
        match expr {
            Expression::Literal { value } => Ok(if value.as_bool() == Some(true) {
                universe.clone()
            } else {
                RangeSet::empty()
            }),

            // A bare attribute is read as a boolean flag.
            Expression::AttributeOf { .. } => {
                let flag = Expression::literal(true);
                self.sweep(&[expr, &flag], universe, |values| {
                    Value::compare(values[0].as_ref(), CompareOp::Eq, values[1].as_ref())
                })
            }

            Expression::Compare { lhs, op, rhs } => {
                let op = *op;
                self.sweep(&[lhs.as_ref(), rhs.as_ref()], universe, |values| {
                    Value::compare(values[0].as_ref(), op, values[1].as_ref())
                })
            }

            Expression::IsNull { operand } => {
                self.sweep(&[operand.as_ref()], universe, |values| Ok(values[0].is_none()))
            }

            // Membership is equality against each element; incomparable
            // elements are simply not members.
            Expression::InSet { operand, values } => {
                self.sweep(&[operand.as_ref()], universe, |current| {
                    Ok(values.iter().any(|value| {
                        matches!(
                            Value::compare(current[0].as_ref(), CompareOp::Eq, Some(value)),
                            Ok(true)
                        )
                    }))
                })
            }

            Expression::And { children } => {
                let mut acc = universe.clone();
                for child in children {
                    acc = acc.intersect(&self.eval(child, universe)?);
                    if acc.is_empty() {
                        break;
                    }
                }
                Ok(acc)
            }

            Expression::Or { children } => {
                let mut acc = RangeSet::empty();
                for child in children {
                    acc = acc.union(&self.eval(child, universe)?);
                }
                Ok(acc)
            }

            Expression::Not { child } => Ok(self.eval(child, universe)?.complement(universe)),
        }
    }

    /// Partitions `universe` at the joint breakpoints of `operands` and keeps
    /// every stretch on which `holds` accepts the operands' values.
    fn sweep<F>(
        &mut self,
        operands: &[&Expression],
        universe: &RangeSet,
        holds: F,
    ) -> HistoryResult<RangeSet>
    where
        F: Fn(&[Option<Value>]) -> Result<bool, EvaluationError>,
    {
        for operand in operands {
            if !operand.is_operand() {
                return Err(EvaluationError::InvalidOperand {
                    kind: operand.kind(),
                }
                .into());
            }
        }

        let mut matching = Vec::new();
        let mut values = Vec::with_capacity(operands.len());
        for window in universe {
            let mut cuts = BTreeSet::new();
            for operand in operands {
                if let Expression::AttributeOf {
                    path: steps,
                    attribute,
                } = operand
                {
                    path::collect_breakpoints(
                        &mut self.cache,
                        self.root,
                        steps.steps(),
                        attribute,
                        *window,
                        &mut cuts,
                    )?;
                }
            }

            debug!(target: "histql::oracle", window = %window, breakpoints = cuts.len(), "partitioned window");
            for stretch in path::partition(*window, &cuts) {
                values.clear();
                for operand in operands {
                    values.push(self.operand_value(operand, stretch.start())?);
                }
                if holds(&values)? {
                    matching.push(stretch);
                }
            }
        }
        Ok(matching.into_iter().collect())
    }

    fn operand_value(&mut self, operand: &Expression, at: Revision) -> HistoryResult<Option<Value>> {
        match operand {
            Expression::Literal { value } => Ok((!value.is_null()).then(|| value.clone())),
            Expression::AttributeOf {
                path: steps,
                attribute,
            } => path::value_at(&mut self.cache, self.root, steps.steps(), attribute, at),
            other => Err(EvaluationError::InvalidOperand { kind: other.kind() }.into()),
        }
    }
}

/// Clips `universe` to a candidate's lifetime, if the store reports one.
pub(crate) fn scoped_universe(universe: &RangeSet, lifetime: Option<RevisionRange>) -> RangeSet {
    match lifetime {
        Some(range) => universe.intersect(&RangeSet::from_range(range)),
        None => universe.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{AttributeId, BranchId};
    use crate::storage::{AttributeLife, ReferenceKind, StoreError};
    use std::collections::HashMap;

    /// Collaborator stub backed by literal lives.
    #[derive(Default)]
    struct FixtureStore {
        lives: HashMap<(ObjectIdentity, AttributeId), AttributeLife>,
        kinds: HashMap<AttributeId, ReferenceKind>,
    }

    impl AttributeHistoryProvider for FixtureStore {
        fn history(
            &self,
            object: &ObjectIdentity,
            attribute: &AttributeId,
        ) -> Result<AttributeLife, StoreError> {
            Ok(self
                .lives
                .get(&(object.clone(), attribute.clone()))
                .cloned()
                .unwrap_or_default())
        }
    }

    impl ReferenceResolver for FixtureStore {
        fn resolve(
            &self,
            object: &ObjectIdentity,
            reference: &AttributeId,
            at: Revision,
        ) -> Result<Option<ObjectIdentity>, StoreError> {
            Ok(self
                .history(object, reference)?
                .value_at(at)
                .and_then(Value::as_reference)
                .cloned())
        }

        fn kind(&self, reference: &AttributeId) -> Result<ReferenceKind, StoreError> {
            self.kinds
                .get(reference)
                .copied()
                .ok_or_else(|| StoreError::UnknownReference(reference.clone()))
        }
    }

    fn rev(n: u64) -> Revision {
        Revision::new(n)
    }

    fn r(a: u64, b: u64) -> RevisionRange {
        RevisionRange::new(rev(a), rev(b)).unwrap()
    }

    fn attr(name: &str) -> AttributeId {
        AttributeId::new(name).unwrap()
    }

    fn set(bounds: &[(u64, u64)]) -> RangeSet {
        bounds.iter().map(|&(a, b)| r(a, b)).collect()
    }

    fn object(name: &str) -> ObjectIdentity {
        ObjectIdentity::random(BranchId::TRUNK, name)
    }

    fn oracle(store: FixtureStore) -> LifePeriodOracle {
        LifePeriodOracle::from_store(Arc::new(store))
    }

    #[test]
    fn test_compare_splits_at_value_change() {
        let a = object("A");
        let mut store = FixtureStore::default();
        store.lives.insert(
            (a.clone(), attr("name")),
            AttributeLife::new(vec![(r(0, 5), "x".into()), (r(5, 10), "y".into())]).unwrap(),
        );

        let expr = Expression::eq(Expression::own(attr("name")), Expression::literal("x"));
        let result = oracle(store).evaluate(&a, &expr, &set(&[(0, 10)])).unwrap();
        assert_eq!(result, set(&[(0, 5)]));
    }

    #[test]
    fn test_compare_pulls_breakpoints_through_references() {
        let (a, b, c) = (object("A"), object("B"), object("C"));
        let mut store = FixtureStore::default();
        store.kinds.insert(attr("ref"), ReferenceKind::CurrentGlobal);
        store.lives.insert(
            (a.clone(), attr("ref")),
            AttributeLife::new(vec![
                (r(0, 5), Value::Reference(b.clone())),
                (r(5, 10), Value::Reference(c.clone())),
            ])
            .unwrap(),
        );
        // B changes its name inside A's [0, 5) stretch.
        store.lives.insert(
            (b, attr("name")),
            AttributeLife::new(vec![(r(0, 2), "foo".into()), (r(2, 10), "baz".into())]).unwrap(),
        );
        store
            .lives
            .insert((c, attr("name")), AttributeLife::constant(r(0, 10), "foo".into()));

        let expr = Expression::eq(
            Expression::attribute(crate::expr::Path::root().then(attr("ref")), attr("name")),
            Expression::literal("foo"),
        );
        let result = oracle(store).evaluate(&a, &expr, &set(&[(0, 10)])).unwrap();
        assert_eq!(result, set(&[(0, 2), (5, 10)]));
    }

    #[test]
    fn test_literal_root() {
        let a = object("A");
        let o = oracle(FixtureStore::default());
        let universe = set(&[(0, 10)]);
        assert_eq!(o.evaluate(&a, &Expression::literal(true), &universe).unwrap(), universe);
        assert!(o.evaluate(&a, &Expression::literal(false), &universe).unwrap().is_empty());
        assert!(o.evaluate(&a, &Expression::literal(1), &universe).unwrap().is_empty());
    }

    #[test]
    fn test_bare_attribute_is_a_flag() {
        let a = object("A");
        let mut store = FixtureStore::default();
        store.lives.insert(
            (a.clone(), attr("active")),
            AttributeLife::new(vec![(r(0, 3), true.into()), (r(3, 6), false.into())]).unwrap(),
        );
        let result = oracle(store)
            .evaluate(&a, &Expression::own(attr("active")), &set(&[(0, 10)]))
            .unwrap();
        assert_eq!(result, set(&[(0, 3)]));
    }

    #[test]
    fn test_undefined_never_matches_any_operator() {
        let a = object("A");
        let o = oracle(FixtureStore::default());
        for op in CompareOp::ALL {
            let expr = Expression::compare(Expression::own(attr("missing")), op, Expression::literal(1));
            assert!(o.evaluate(&a, &expr, &set(&[(0, 10)])).unwrap().is_empty());
        }
    }

    #[test]
    fn test_is_null_covers_gaps() {
        let a = object("A");
        let mut store = FixtureStore::default();
        store.lives.insert(
            (a.clone(), attr("size")),
            AttributeLife::new(vec![(r(2, 4), 1.into()), (r(6, 8), Value::Null)]).unwrap(),
        );
        let expr = Expression::is_null(Expression::own(attr("size")));
        let result = oracle(store).evaluate(&a, &expr, &set(&[(0, 10)])).unwrap();
        assert_eq!(result, set(&[(0, 2), (4, 10)]));
    }

    #[test]
    fn test_in_set_matches_members_only() {
        let a = object("A");
        let mut store = FixtureStore::default();
        store.lives.insert(
            (a.clone(), attr("size")),
            AttributeLife::new(vec![
                (r(0, 2), 1.into()),
                (r(2, 4), 2.into()),
                (r(4, 6), "big".into()),
                (r(8, 10), 3.into()),
            ])
            .unwrap(),
        );
        let o = oracle(store);
        let universe = set(&[(0, 10)]);

        let expr = Expression::in_set(Expression::own(attr("size")), [1, 3]);
        assert_eq!(o.evaluate(&a, &expr, &universe).unwrap(), set(&[(0, 2), (8, 10)]));

        let with_null = Expression::in_set(Expression::own(attr("size")), [Value::Null]);
        assert!(o.evaluate(&a, &with_null, &universe).unwrap().is_empty());

        let empty = Expression::in_set(Expression::own(attr("size")), Vec::<Value>::new());
        assert!(o.evaluate(&a, &empty, &universe).unwrap().is_empty());
    }

    #[test]
    fn test_not_complements_within_universe() {
        let a = object("A");
        let mut store = FixtureStore::default();
        store
            .lives
            .insert((a.clone(), attr("name")), AttributeLife::constant(r(3, 5), "x".into()));
        let expr = Expression::not(Expression::eq(
            Expression::own(attr("name")),
            Expression::literal("x"),
        ));
        let result = oracle(store).evaluate(&a, &expr, &set(&[(0, 4), (6, 8)])).unwrap();
        assert_eq!(result, set(&[(0, 3), (6, 8)]));
    }

    #[test]
    fn test_empty_connectives() {
        let a = object("A");
        let o = oracle(FixtureStore::default());
        let universe = set(&[(0, 10)]);
        assert_eq!(o.evaluate(&a, &Expression::and([]), &universe).unwrap(), universe);
        assert!(o.evaluate(&a, &Expression::or([]), &universe).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_operand_is_evaluation_error() {
        let a = object("A");
        let expr = Expression::eq(Expression::and([]), Expression::literal(true));
        let err = oracle(FixtureStore::default())
            .evaluate(&a, &expr, &set(&[(0, 10)]))
            .unwrap_err();
        assert!(err.is_evaluation());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_non_reference_path_step_is_evaluation_error() {
        let a = object("A");
        let expr = Expression::eq(
            Expression::attribute(crate::expr::Path::root().then(attr("name")), attr("x")),
            Expression::literal(1),
        );
        let err = oracle(FixtureStore::default())
            .evaluate(&a, &expr, &set(&[(0, 10)]))
            .unwrap_err();
        assert!(err.is_evaluation());
    }

    #[test]
    fn test_type_mismatch_reported() {
        let a = object("A");
        let mut store = FixtureStore::default();
        store
            .lives
            .insert((a.clone(), attr("name")), AttributeLife::constant(r(0, 10), "x".into()));
        let expr = Expression::compare(Expression::own(attr("name")), CompareOp::Lt, Expression::literal(3));
        let err = oracle(store).evaluate(&a, &expr, &set(&[(0, 10)])).unwrap_err();
        assert!(err.is_evaluation());
    }

    #[test]
    fn test_scoped_universe() {
        let universe = set(&[(0, 10)]);
        assert_eq!(scoped_universe(&universe, Some(r(4, 20))), set(&[(4, 10)]));
        assert_eq!(scoped_universe(&universe, None), universe);
    }
}
