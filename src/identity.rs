//! Object and attribute identities.
//!
//! Identities are owned by the surrounding store. This crate only copies,
//! hashes and compares them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Identifier of a branch of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(u64);

impl BranchId {
    /// The trunk every other branch descends from.
    pub const TRUNK: Self = Self(1);

    /// Wraps a raw branch number.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw branch number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of an object's type (table).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Creates a type name.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Primary key of an object within its type.
///
/// # Examples
///
/// ```
/// use histql::ObjectKey;
///
/// let key = ObjectKey::new();
/// assert!(!key.is_nil());
/// assert_eq!(ObjectKey::from_u128(7), ObjectKey::from_u128(7));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(Uuid);

impl ObjectKey {
    /// Creates a new random key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic key, mostly useful for fixtures.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Wraps an existing uuid.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying uuid.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// True for the all-zero key.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for ObjectKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a versioned object: `(branch, type, primary key)`.
///
/// Two identities are equal iff all three components match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectIdentity {
    /// Branch the object lives on.
    pub branch: BranchId,
    /// The object's type.
    pub type_name: TypeName,
    /// Primary key within the type.
    pub key: ObjectKey,
}

impl ObjectIdentity {
    /// Creates an identity from its three components.
    #[must_use]
    pub fn new(branch: BranchId, type_name: impl Into<TypeName>, key: ObjectKey) -> Self {
        Self {
            branch,
            type_name: type_name.into(),
            key,
        }
    }

    /// Creates an identity with a fresh random key.
    #[must_use]
    pub fn random(branch: BranchId, type_name: impl Into<TypeName>) -> Self {
        Self::new(branch, type_name, ObjectKey::new())
    }

    /// The same object as seen on another branch.
    #[must_use]
    pub fn on_branch(&self, branch: BranchId) -> Self {
        Self {
            branch,
            type_name: self.type_name.clone(),
            key: self.key,
        }
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.type_name, self.branch, self.key)
    }
}

/// Name of an attribute, including reference attributes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(Arc<str>);

impl AttributeId {
    /// Creates an attribute id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyAttributeName` for a blank name.
    pub fn new(name: impl AsRef<str>) -> Result<Self, ValidationError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyAttributeName);
        }
        Ok(Self(Arc::from(name)))
    }

    /// The trimmed name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for AttributeId {
    type Error = ValidationError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}
