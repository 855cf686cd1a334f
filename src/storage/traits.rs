//! Collaborator traits consumed by the oracle.
//!
//! The physical store lives outside this crate. It only has to expose raw
//! per-object, per-attribute histories and reference resolution; everything
//! else is computed here. Implementations carry their own store or session
//! handle, so no process-wide state is needed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{AttributeId, ObjectIdentity};
use crate::revision::{Revision, RevisionRange};

use super::life::AttributeLife;

/// Errors reported by the store collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Object not known to the store.
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectIdentity),

    /// Attribute is not declared as a reference.
    #[error("Not a reference attribute: {0}")]
    UnknownReference(AttributeId),

    /// Backend error.
    #[error("Store backend error: {0}")]
    BackendError(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Flavor of a reference attribute.
///
/// *Current* references track the target's live state at the revision being
/// queried. *Historic* references are stabilized when set: they keep pointing
/// at the target as it was at that revision. *Global* references may cross
/// branches; *local* ones stay within the referring object's branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ReferenceKind {
    CurrentGlobal,
    CurrentLocal,
    HistoricGlobal,
    HistoricLocal,
}

impl ReferenceKind {
    /// True for references stabilized at assignment.
    #[must_use]
    pub const fn is_historic(self) -> bool {
        matches!(self, Self::HistoricGlobal | Self::HistoricLocal)
    }

    /// True for references that may point into another branch.
    #[must_use]
    pub const fn is_branch_global(self) -> bool {
        matches!(self, Self::CurrentGlobal | Self::HistoricGlobal)
    }
}

/// Yields the change history of object attributes.
pub trait AttributeHistoryProvider: Send + Sync {
    /// The life of `attribute` on `object`.
    ///
    /// Entries must be sorted ascending, disjoint, and coalesced per distinct
    /// value. An attribute that was never set yields an empty life.
    fn history(
        &self,
        object: &ObjectIdentity,
        attribute: &AttributeId,
    ) -> Result<AttributeLife, StoreError>;

    /// The revisions during which `object` exists, if the store tracks it.
    ///
    /// `Ok(None)` places no restriction on the object's lifetime.
    fn lifetime(&self, object: &ObjectIdentity) -> Result<Option<RevisionRange>, StoreError> {
        let _ = object;
        Ok(None)
    }
}

/// Resolves reference attributes to target identities.
pub trait ReferenceResolver: Send + Sync {
    /// The object `reference` on `object` points to at revision `at`.
    fn resolve(
        &self,
        object: &ObjectIdentity,
        reference: &AttributeId,
        at: Revision,
    ) -> Result<Option<ObjectIdentity>, StoreError>;

    /// The declared kind of a reference attribute.
    ///
    /// # Errors
    ///
    /// `StoreError::UnknownReference` if `reference` is not a reference.
    fn kind(&self, reference: &AttributeId) -> Result<ReferenceKind, StoreError>;

    /// Maps a stabilization revision read on `source`'s branch to the
    /// revision at which `target` must be viewed.
    ///
    /// Identity by default, which is right whenever both objects share a
    /// branch.
    fn translate_revision(
        &self,
        kind: ReferenceKind,
        source: &ObjectIdentity,
        target: &ObjectIdentity,
        revision: Revision,
    ) -> Result<Revision, StoreError> {
        let _ = (kind, source, target);
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::BranchId;

    // Compile-time test: ensure traits are object-safe
    fn _assert_history_provider_object_safe(_: &dyn AttributeHistoryProvider) {}
    fn _assert_reference_resolver_object_safe(_: &dyn ReferenceResolver) {}

    #[test]
    fn test_reference_kind_flags() {
        assert!(ReferenceKind::HistoricLocal.is_historic());
        assert!(!ReferenceKind::HistoricLocal.is_branch_global());
        assert!(ReferenceKind::CurrentGlobal.is_branch_global());
        assert!(!ReferenceKind::CurrentGlobal.is_historic());
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::ObjectNotFound(ObjectIdentity::random(BranchId::TRUNK, "E"));
        assert!(err.to_string().contains("Object not found"));

        let err = StoreError::BackendError("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
