//! In-memory history store.
//!
//! Thread-safe reference implementation of both collaborator traits. Writes
//! are recorded as a change log per `(object, attribute)`; lives are derived
//! from that log on read. Intended for embedded usage and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tracing::debug;

use crate::identity::{AttributeId, BranchId, ObjectIdentity};
use crate::revision::{Revision, RevisionRange};
use crate::value::Value;

use super::life::AttributeLife;
use super::traits::{AttributeHistoryProvider, ReferenceKind, ReferenceResolver, StoreError};

fn lock_err(context: &'static str) -> StoreError {
    StoreError::BackendError(format!("poisoned lock: {context}"))
}

type ChangeLog = BTreeMap<Revision, Value>;

#[derive(Debug, Default)]
struct StoreState {
    lifetimes: HashMap<ObjectIdentity, RevisionRange>,
    changes: HashMap<(ObjectIdentity, AttributeId), ChangeLog>,
    reference_kinds: HashMap<AttributeId, ReferenceKind>,
    /// child branch -> (parent branch, fork revision)
    branches: HashMap<BranchId, (BranchId, Revision)>,
}

impl StoreState {
    fn lifetime(&self, object: &ObjectIdentity) -> Result<RevisionRange, StoreError> {
        self.lifetimes
            .get(object)
            .copied()
            .ok_or_else(|| StoreError::ObjectNotFound(object.clone()))
    }

    fn life(&self, object: &ObjectIdentity, attribute: &AttributeId) -> Result<AttributeLife, StoreError> {
        let lifetime = self.lifetime(object)?;
        match self.changes.get(&(object.clone(), attribute.clone())) {
            Some(log) => build_life(log, lifetime),
            None => Ok(AttributeLife::undefined()),
        }
    }

    /// The copy of `target` visible from `branch`: the one on `branch` itself,
    /// else the nearest one up the branch's ancestry.
    fn visible_copy(&self, target: &ObjectIdentity, branch: BranchId) -> Option<ObjectIdentity> {
        let mut current = branch;
        for _ in 0..=self.branches.len() {
            let copy = target.on_branch(current);
            if self.lifetimes.contains_key(&copy) {
                return Some(copy);
            }
            current = self.branches.get(&current)?.0;
        }
        None
    }

    /// Fork revision on the path from `branch` up to `ancestor`, if
    /// `ancestor` is a proper ancestor of `branch`.
    fn fork_revision(&self, branch: BranchId, ancestor: BranchId) -> Option<Revision> {
        let mut current = branch;
        let mut fork = Revision::MAX;
        // Ancestry is acyclic by construction; the hop bound only guards
        // against a corrupted map.
        for _ in 0..=self.branches.len() {
            let (parent, base) = *self.branches.get(&current)?;
            fork = fork.min(base);
            if parent == ancestor {
                return Some(fork);
            }
            current = parent;
        }
        None
    }
}

/// Turns a change log into a coalesced life clipped to the object's lifetime.
fn build_life(log: &ChangeLog, lifetime: RevisionRange) -> Result<AttributeLife, StoreError> {
    let mut entries: Vec<(RevisionRange, Value)> = Vec::with_capacity(log.len());
    let mut changes = log.iter().peekable();
    while let Some((&at, value)) = changes.next() {
        let stop = changes
            .peek()
            .map_or(lifetime.stop(), |(&next, _)| next)
            .min(lifetime.stop());
        if value.is_null() {
            continue;
        }
        let Some(range) = RevisionRange::try_new(at.max(lifetime.start()), stop) else {
            continue;
        };
        match entries.last_mut() {
            Some((last, last_value)) if last.stop() == range.start() && *last_value == *value => {
                *last = last.span(&range);
            }
            _ => entries.push((range, value.clone())),
        }
    }
    AttributeLife::new(entries).map_err(|e| StoreError::BackendError(e.to_string()))
}

/// In-memory implementation of [`AttributeHistoryProvider`] and
/// [`ReferenceResolver`].
///
/// # Examples
///
/// ```
/// use histql::{AttributeHistoryProvider, AttributeId, BranchId, InMemoryHistoryStore, ObjectIdentity, Revision};
///
/// let store = InMemoryHistoryStore::new();
/// let e1 = ObjectIdentity::random(BranchId::TRUNK, "E");
/// let name = AttributeId::new("name").unwrap();
///
/// store.create_object(e1.clone(), Revision::new(1)).unwrap();
/// store.set_attribute(&e1, &name, "e1", Revision::new(1)).unwrap();
///
/// let life = store.history(&e1, &name).unwrap();
/// assert_eq!(life.entries().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryHistoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `attribute` as a reference of the given kind.
    pub fn declare_reference(&self, attribute: AttributeId, kind: ReferenceKind) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("store.declare_reference"))?;
        state.reference_kinds.insert(attribute, kind);
        Ok(())
    }

    /// Records that `branch` was forked from `parent` at revision `base`.
    pub fn declare_branch(&self, branch: BranchId, parent: BranchId, base: Revision) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("store.declare_branch"))?;
        if branch == parent || state.fork_revision(parent, branch).is_some() {
            return Err(StoreError::BackendError(format!(
                "branch {branch} cannot descend from {parent}: ancestry would be cyclic"
            )));
        }
        state.branches.insert(branch, (parent, base));
        debug!(target: "histql::store", branch = %branch, parent = %parent, base = %base, "branch declared");
        Ok(())
    }

    /// Creates `object`, alive from revision `at` on.
    pub fn create_object(&self, object: ObjectIdentity, at: Revision) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("store.create_object"))?;
        if state.lifetimes.contains_key(&object) {
            return Err(StoreError::BackendError(format!("object already exists: {object}")));
        }
        let lifetime = RevisionRange::starting_at(at).ok_or_else(|| {
            StoreError::BackendError(format!("cannot create {object} at the end of history"))
        })?;
        debug!(target: "histql::store", object = %object, at = %at, "object created");
        state.lifetimes.insert(object, lifetime);
        Ok(())
    }

    /// Deletes `object` at revision `at`; it no longer exists from `at` on.
    pub fn delete_object(&self, object: &ObjectIdentity, at: Revision) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("store.delete_object"))?;
        let lifetime = state.lifetime(object)?;
        let Some(shortened) = RevisionRange::try_new(lifetime.start(), at.min(lifetime.stop())) else {
            return Err(StoreError::BackendError(format!(
                "cannot delete {object} at {at}: it was created at {}",
                lifetime.start()
            )));
        };
        state.lifetimes.insert(object.clone(), shortened);
        debug!(target: "histql::store", object = %object, at = %at, "object deleted");
        Ok(())
    }

    /// Sets `attribute` of `object` to `value` from revision `at` on.
    ///
    /// Setting `Value::Null` unsets the attribute. Reference attributes only
    /// accept `Value::Reference` or `Value::Null`.
    pub fn set_attribute(
        &self,
        object: &ObjectIdentity,
        attribute: &AttributeId,
        value: impl Into<Value>,
        at: Revision,
    ) -> Result<(), StoreError> {
        let value = value.into();
        let mut state = self.state.write().map_err(|_| lock_err("store.set_attribute"))?;
        let lifetime = state.lifetime(object)?;
        if !lifetime.contains(at) {
            return Err(StoreError::BackendError(format!(
                "{object} does not exist at revision {at}"
            )));
        }
        if state.reference_kinds.contains_key(attribute)
            && !(value.is_reference() || value.is_null())
        {
            return Err(StoreError::BackendError(format!(
                "reference attribute {attribute} cannot hold a {} value",
                value.type_name()
            )));
        }
        debug!(target: "histql::store", object = %object, attribute = %attribute, at = %at, "attribute written");
        state
            .changes
            .entry((object.clone(), attribute.clone()))
            .or_default()
            .insert(at, value);
        Ok(())
    }

    /// Unsets `attribute` of `object` from revision `at` on.
    pub fn unset_attribute(
        &self,
        object: &ObjectIdentity,
        attribute: &AttributeId,
        at: Revision,
    ) -> Result<(), StoreError> {
        self.set_attribute(object, attribute, Value::Null, at)
    }
}

impl AttributeHistoryProvider for InMemoryHistoryStore {
    fn history(&self, object: &ObjectIdentity, attribute: &AttributeId) -> Result<AttributeLife, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("store.history"))?;
        state.life(object, attribute)
    }

    fn lifetime(&self, object: &ObjectIdentity) -> Result<Option<RevisionRange>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("store.lifetime"))?;
        state.lifetime(object).map(Some)
    }
}

impl ReferenceResolver for InMemoryHistoryStore {
    fn resolve(
        &self,
        object: &ObjectIdentity,
        reference: &AttributeId,
        at: Revision,
    ) -> Result<Option<ObjectIdentity>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("store.resolve"))?;
        let kind = *state
            .reference_kinds
            .get(reference)
            .ok_or_else(|| StoreError::UnknownReference(reference.clone()))?;
        let life = state.life(object, reference)?;
        let Some(target) = life.value_at(at).and_then(Value::as_reference) else {
            return Ok(None);
        };

        // Targets the store does not hold resolve to nothing. Local references
        // never leave the referring object's branch line.
        if kind.is_branch_global() || target.branch == object.branch {
            Ok(state.lifetimes.contains_key(target).then(|| target.clone()))
        } else {
            Ok(state.visible_copy(target, object.branch))
        }
    }

    fn kind(&self, reference: &AttributeId) -> Result<ReferenceKind, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("store.kind"))?;
        state
            .reference_kinds
            .get(reference)
            .copied()
            .ok_or_else(|| StoreError::UnknownReference(reference.clone()))
    }

    /// A branch only sees its ancestors up to the fork revision, so a
    /// historic reference into an ancestor branch is pinned no later than
    /// that fork.
    fn translate_revision(
        &self,
        kind: ReferenceKind,
        source: &ObjectIdentity,
        target: &ObjectIdentity,
        revision: Revision,
    ) -> Result<Revision, StoreError> {
        if !kind.is_historic() || source.branch == target.branch {
            return Ok(revision);
        }
        let state = self.state.read().map_err(|_| lock_err("store.translate_revision"))?;
        Ok(state
            .fork_revision(source.branch, target.branch)
            .map_or(revision, |fork| revision.min(fork)))
    }
}
