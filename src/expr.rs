//! Expression AST for historic predicates.
//!
//! Expressions are pure data: they are built once by the caller (usually a
//! query front end) and evaluated once per candidate root object.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::AttributeId;
use crate::value::Value;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 6] = [Self::Eq, Self::Ne, Self::Lt, Self::Le, Self::Gt, Self::Ge];

    /// Operator symbol as used in `Display`.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A chain of reference attributes followed from the query root.
///
/// The empty path denotes the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<AttributeId>);

impl Path {
    /// The empty path (the root object).
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// A path following `steps` in order.
    #[must_use]
    pub fn new(steps: Vec<AttributeId>) -> Self {
        Self(steps)
    }

    /// Returns this path extended by one more reference step.
    #[must_use]
    pub fn then(mut self, reference: AttributeId) -> Self {
        self.0.push(reference);
        self
    }

    /// The reference steps, root first.
    #[must_use]
    pub fn steps(&self) -> &[AttributeId] {
        &self.0
    }

    /// True for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<AttributeId> for Path {
    fn from_iter<I: IntoIterator<Item = AttributeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A boolean expression over the versioned object graph.
///
/// # Examples
///
/// ```
/// use histql::{AttributeId, CompareOp, Expression, Path};
///
/// let reference = AttributeId::new("ref").unwrap();
/// let name = AttributeId::new("name").unwrap();
///
/// // root.ref.name = "foo"
/// let expr = Expression::compare(
///     Expression::attribute(Path::root().then(reference), name),
///     CompareOp::Eq,
///     Expression::literal("foo"),
/// );
/// assert_eq!(expr.to_string(), "(ref.name = \"foo\")");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Expression {
    /// A constant value.
    Literal { value: Value },

    /// The value of `attribute` on the object reached via `path`.
    AttributeOf { path: Path, attribute: AttributeId },

    /// A binary comparison of two value operands.
    Compare {
        lhs: Box<Expression>,
        op: CompareOp,
        rhs: Box<Expression>,
    },

    /// Holds where every child holds.
    And { children: Vec<Expression> },

    /// Holds where any child holds.
    Or { children: Vec<Expression> },

    /// Holds where the child does not.
    Not { child: Box<Expression> },

    /// Holds wherever the operand has no defined value.
    IsNull { operand: Box<Expression> },

    /// Holds wherever the operand equals one of `values`.
    InSet {
        operand: Box<Expression>,
        values: Vec<Value>,
    },
}

impl Expression {
    /// A constant operand.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// `attribute` on the object reached via `path`.
    #[must_use]
    pub const fn attribute(path: Path, attribute: AttributeId) -> Self {
        Self::AttributeOf { path, attribute }
    }

    /// An attribute of the root object itself.
    #[must_use]
    pub const fn own(attribute: AttributeId) -> Self {
        Self::AttributeOf {
            path: Path::root(),
            attribute,
        }
    }

    /// `lhs op rhs`.
    #[must_use]
    pub fn compare(lhs: Self, op: CompareOp, rhs: Self) -> Self {
        Self::Compare {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }

    /// `lhs = rhs`.
    #[must_use]
    pub fn eq(lhs: Self, rhs: Self) -> Self {
        Self::compare(lhs, CompareOp::Eq, rhs)
    }

    /// Conjunction; empty holds everywhere.
    #[must_use]
    pub fn and(children: impl IntoIterator<Item = Self>) -> Self {
        Self::And {
            children: children.into_iter().collect(),
        }
    }

    /// Disjunction; empty holds nowhere.
    #[must_use]
    pub fn or(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Or {
            children: children.into_iter().collect(),
        }
    }

    /// Negation within the evaluation universe.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Self) -> Self {
        Self::Not {
            child: Box::new(child),
        }
    }

    /// Holds where `operand` is undefined.
    #[must_use]
    pub fn is_null(operand: Self) -> Self {
        Self::IsNull {
            operand: Box::new(operand),
        }
    }

    /// Holds where `operand` equals any of `values`; an empty set never
    /// holds.
    #[must_use]
    pub fn in_set(operand: Self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::InSet {
            operand: Box::new(operand),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Short name of the node kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Literal { .. } => "literal",
            Self::AttributeOf { .. } => "attribute",
            Self::Compare { .. } => "compare",
            Self::And { .. } => "and",
            Self::Or { .. } => "or",
            Self::Not { .. } => "not",
            Self::IsNull { .. } => "is_null",
            Self::InSet { .. } => "in_set",
        }
    }

    /// True for nodes that denote a value rather than a truth value.
    #[must_use]
    pub const fn is_operand(&self) -> bool {
        matches!(self, Self::Literal { .. } | Self::AttributeOf { .. })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value } => write!(f, "{value}"),
            Self::AttributeOf { path, attribute } => {
                for step in path.steps() {
                    write!(f, "{step}.")?;
                }
                write!(f, "{attribute}")
            }
            Self::Compare { lhs, op, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Self::And { children } => write_list(f, "and", children),
            Self::Or { children } => write_list(f, "or", children),
            Self::Not { child } => write!(f, "not({child})"),
            Self::IsNull { operand } => write!(f, "is_null({operand})"),
            Self::InSet { operand, values } => {
                write!(f, "({operand} in {{")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "}})")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, children: &[Expression]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}
