//! # histql - Historic Predicate Evaluation
//!
//! histql answers *when* questions against a versioned, branched object
//! store: given a predicate over an object's attributes (possibly reached
//! through chains of references) it computes the exact set of revisions
//! during which the predicate held.
//!
//! ## Core Concepts
//!
//! - **Revision**: a point in the store's version sequence
//! - **RangeSet**: a normalized set of half-open revision ranges, with union,
//!   intersection and complement
//! - **AttributeLife**: the piecewise-constant history of one attribute
//! - **Expression**: the predicate tree (literals, attribute paths,
//!   comparisons and logical connectives)
//! - **LifePeriodOracle**: evaluates an expression for one root object
//! - **QueryExecutor**: runs an expression over a candidate population
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use histql::{
//!     AttributeId, BranchId, Expression, InMemoryHistoryStore, LifePeriodOracle, ObjectIdentity,
//!     Path, RangeSet, ReferenceKind, Revision,
//! };
//!
//! let store = Arc::new(InMemoryHistoryStore::new());
//! let owner = AttributeId::new("owner").unwrap();
//! let name = AttributeId::new("name").unwrap();
//! store.declare_reference(owner.clone(), ReferenceKind::CurrentGlobal).unwrap();
//!
//! let team = ObjectIdentity::random(BranchId::TRUNK, "Team");
//! let task = ObjectIdentity::random(BranchId::TRUNK, "Task");
//! store.create_object(team.clone(), Revision::new(0)).unwrap();
//! store.create_object(task.clone(), Revision::new(0)).unwrap();
//! store.set_attribute(&team, &name, "core", Revision::new(0)).unwrap();
//! store.set_attribute(&team, &name, "infra", Revision::new(5)).unwrap();
//! store.set_attribute(&task, &owner, team, Revision::new(2)).unwrap();
//!
//! let expr = Expression::eq(
//!     Expression::attribute(Path::root().then(owner), name),
//!     Expression::literal("core"),
//! );
//! let oracle = LifePeriodOracle::from_store(store);
//! let when = oracle.evaluate(&task, &expr, &RangeSet::universe()).unwrap();
//! assert_eq!(when.to_string(), "{[2, 5)}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod executor;
pub mod expr;
pub mod identity;
pub mod oracle;
pub mod range_set;
pub mod revision;
pub mod storage;
pub mod value;

pub use error::{
    CandidateFailure, EvaluationError, HistoryError, HistoryResult, ValidationError,
};
pub use executor::{ExecutorConfig, ParallelQueryExecutor, QueryExecutor, QueryOutcome};
pub use expr::{CompareOp, Expression, Path};
pub use identity::{AttributeId, BranchId, ObjectIdentity, ObjectKey, TypeName};
pub use oracle::LifePeriodOracle;
pub use range_set::RangeSet;
pub use revision::{Revision, RevisionRange};
pub use storage::{
    AttributeHistoryProvider, AttributeLife, InMemoryHistoryStore, LifeEntry, ReferenceKind,
    ReferenceResolver, StoreError,
};
pub use value::Value;
