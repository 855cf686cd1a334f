//! Attribute values and their comparison rules.
//!
//! Comparison is three-valued: if either side is undefined (`Null`, a gap in
//! the attribute's life, or an unresolvable path) no operator holds, not even
//! `!=`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::expr::CompareOp;
use crate::identity::ObjectIdentity;

/// Possible values an attribute can hold.
///
/// # Examples
///
/// ```
/// use histql::Value;
///
/// let name = Value::from("foo");
/// assert!(name.is_string());
/// assert!(Value::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Reference(ObjectIdentity),
    Null,
}

impl Value {
    /// True for `Bool`.
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// True for `String`.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// True for `Reference`.
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    /// True for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The string, if this is a `String`.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// The target identity, if this is a `Reference`.
    #[must_use]
    pub const fn as_reference(&self) -> Option<&ObjectIdentity> {
        match self {
            Self::Reference(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Reference(_) => "reference",
            Self::Null => "null",
        }
    }

    /// Applies `op` to two possibly undefined values.
    ///
    /// Returns `Ok(false)` when either side is undefined.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` when the kinds are incomparable, `UnsupportedOperator`
    /// for an ordering operator on booleans or references.
    pub fn compare(
        lhs: Option<&Self>,
        op: CompareOp,
        rhs: Option<&Self>,
    ) -> Result<bool, EvaluationError> {
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return Ok(false);
        };
        if lhs.is_null() || rhs.is_null() {
            return Ok(false);
        }

        let ordering = match (lhs, rhs) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                numeric(lhs).partial_cmp(&numeric(rhs))
            }
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => {
                return equality_only(op, lhs.type_name(), a == b);
            }
            (Self::Reference(a), Self::Reference(b)) => {
                return equality_only(op, lhs.type_name(), a == b);
            }
            _ => {
                return Err(EvaluationError::TypeMismatch {
                    op: op.to_string(),
                    lhs: lhs.type_name(),
                    rhs: rhs.type_name(),
                })
            }
        };

        // NaN compares false for everything, like the store's SQL backend.
        Ok(ordering.is_some_and(|ord| op.accepts(ord)))
    }
}

#[allow(clippy::cast_precision_loss)]
fn numeric(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

fn equality_only(op: CompareOp, kind: &'static str, equal: bool) -> Result<bool, EvaluationError> {
    match op {
        CompareOp::Eq => Ok(equal),
        CompareOp::Ne => Ok(!equal),
        _ => Err(EvaluationError::UnsupportedOperator {
            op: op.to_string(),
            kind,
        }),
    }
}

impl CompareOp {
    /// True if an operand ordering satisfies this operator.
    #[must_use]
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ordering, Ordering::Equal),
            Self::Ne => !matches!(ordering, Ordering::Equal),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::Le => !matches!(ordering, Ordering::Greater),
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::Ge => !matches!(ordering, Ordering::Less),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Reference(v) => write!(f, "ref:{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<ObjectIdentity> for Value {
    fn from(v: ObjectIdentity) -> Self {
        Self::Reference(v)
    }
}
