//! Per-evaluation memo over the store collaborators.
//!
//! Breakpoint collection and value resolution both walk the same paths, so
//! every history, kind and resolution is fetched at most once per candidate.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EvaluationError, HistoryResult};
use crate::identity::{AttributeId, ObjectIdentity};
use crate::revision::Revision;
use crate::storage::{
    AttributeHistoryProvider, AttributeLife, ReferenceKind, ReferenceResolver, StoreError,
};

type ResolutionKey = (ObjectIdentity, AttributeId, Revision);

pub(crate) struct HistoryCache<'a> {
    history: &'a dyn AttributeHistoryProvider,
    references: &'a dyn ReferenceResolver,
    lives: HashMap<(ObjectIdentity, AttributeId), Arc<AttributeLife>>,
    kinds: HashMap<AttributeId, ReferenceKind>,
    resolutions: HashMap<ResolutionKey, Option<ObjectIdentity>>,
    fetches: usize,
}

impl<'a> HistoryCache<'a> {
    pub(crate) fn new(
        history: &'a dyn AttributeHistoryProvider,
        references: &'a dyn ReferenceResolver,
    ) -> Self {
        Self {
            history,
            references,
            lives: HashMap::new(),
            kinds: HashMap::new(),
            resolutions: HashMap::new(),
            fetches: 0,
        }
    }

    pub(crate) fn life(
        &mut self,
        object: &ObjectIdentity,
        attribute: &AttributeId,
    ) -> HistoryResult<Arc<AttributeLife>> {
        let key = (object.clone(), attribute.clone());
        if let Some(life) = self.lives.get(&key) {
            return Ok(Arc::clone(life));
        }
        self.fetches += 1;
        let life = Arc::new(self.history.history(object, attribute)?);
        self.lives.insert(key, Arc::clone(&life));
        Ok(life)
    }

    /// Kind of a path step. An attribute the store does not know as a
    /// reference makes the expression malformed, not the store unreadable.
    pub(crate) fn kind(&mut self, reference: &AttributeId) -> HistoryResult<ReferenceKind> {
        if let Some(kind) = self.kinds.get(reference) {
            return Ok(*kind);
        }
        let kind = match self.references.kind(reference) {
            Ok(kind) => kind,
            Err(StoreError::UnknownReference(attribute)) => {
                return Err(EvaluationError::NotAReference {
                    attribute: attribute.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        self.kinds.insert(reference.clone(), kind);
        Ok(kind)
    }

    pub(crate) fn resolve(
        &mut self,
        object: &ObjectIdentity,
        reference: &AttributeId,
        at: Revision,
    ) -> HistoryResult<Option<ObjectIdentity>> {
        let key = (object.clone(), reference.clone(), at);
        if let Some(target) = self.resolutions.get(&key) {
            return Ok(target.clone());
        }
        self.fetches += 1;
        let target = self.references.resolve(object, reference, at)?;
        self.resolutions.insert(key, target.clone());
        Ok(target)
    }

    pub(crate) fn translate(
        &self,
        kind: ReferenceKind,
        source: &ObjectIdentity,
        target: &ObjectIdentity,
        revision: Revision,
    ) -> HistoryResult<Revision> {
        Ok(self
            .references
            .translate_revision(kind, source, target, revision)?)
    }

    /// Number of collaborator round trips so far.
    pub(crate) const fn fetches(&self) -> usize {
        self.fetches
    }
}
