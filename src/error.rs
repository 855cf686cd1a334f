//! Error types for histql.
//!
//! All errors are strongly typed using thiserror. Missing data is never an
//! error here: an unset attribute or an unresolvable reference simply makes
//! the affected value undefined for the revisions concerned.

use thiserror::Error;

use crate::identity::ObjectIdentity;
use crate::revision::Revision;
use crate::storage::StoreError;

/// Validation errors that occur while constructing inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ValidationError {
    #[error("Invalid revision range: start ({start}) must be before stop ({stop})")]
    InvalidRevisionRange {
        start: Revision,
        stop: Revision,
    },

    #[error("Attribute life entries must be sorted and disjoint: entry {index} starts at {start}, previous entry stops at {previous_stop}")]
    UnorderedAttributeLife {
        index: usize,
        start: Revision,
        previous_stop: Revision,
    },

    #[error("Attribute name cannot be empty")]
    EmptyAttributeName,

    #[error("Executor configuration '{field}' must be at least 1")]
    InvalidExecutorConfig {
        field: &'static str,
    },
}

/// Errors raised while evaluating an expression for a single candidate.
///
/// These are scoped to one candidate and never abort a whole query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum EvaluationError {
    #[error("Type mismatch: cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        op: String,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("Operator '{op}' is not supported for {kind} values")]
    UnsupportedOperator {
        op: String,
        kind: &'static str,
    },

    #[error("Attribute '{attribute}' is used as a path step but is not a reference")]
    NotAReference {
        attribute: String,
    },

    #[error("Expression of kind '{kind}' cannot be used as a comparison operand")]
    InvalidOperand {
        kind: &'static str,
    },
}

/// Top-level error type for histql.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum HistoryError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl HistoryError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an evaluation error.
    #[must_use]
    pub const fn is_evaluation(&self) -> bool {
        matches!(self, Self::Evaluation(_))
    }

    /// Returns true if this is a collaborator (store) error.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error must abort a whole query batch.
    ///
    /// Evaluation errors are scoped to a single candidate; everything else
    /// means the store can no longer be read consistently.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_evaluation()
    }
}

/// A per-candidate failure recorded by the query executors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// The candidate whose evaluation failed.
    pub candidate: ObjectIdentity,
    /// Why it failed.
    pub error: EvaluationError,
}

/// Result type alias for histql operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
