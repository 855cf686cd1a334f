//! Path navigation and breakpoint collection.
//!
//! A path is walked one reference step at a time. *Current* steps follow the
//! reference as of the revision being viewed. *Historic* steps pin the view:
//! the stabilization revision is the start of the reference attribute's life
//! entry, and every later step and the final attribute are read there.

use std::collections::BTreeSet;

use crate::error::HistoryResult;
use crate::identity::{AttributeId, ObjectIdentity};
use crate::revision::{Revision, RevisionRange};
use crate::value::Value;

use super::cache::HistoryCache;

/// Where a path ends up when followed from a root at one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Landing {
    pub(crate) object: ObjectIdentity,
    /// Revision at which the landing object must be read.
    pub(crate) view: Revision,
}

/// Follows `path` from `root` at revision `at`.
///
/// Returns `None` as soon as a step cannot be resolved.
pub(crate) fn land(
    cache: &mut HistoryCache<'_>,
    root: &ObjectIdentity,
    path: &[AttributeId],
    at: Revision,
) -> HistoryResult<Option<Landing>> {
    let mut object = root.clone();
    let mut view = at;
    for step in path {
        let kind = cache.kind(step)?;
        if kind.is_historic() {
            let life = cache.life(&object, step)?;
            let Some(entry) = life.entry_at(view) else {
                return Ok(None);
            };
            let pin = entry.range.start();
            let Some(target) = cache.resolve(&object, step, pin)? else {
                return Ok(None);
            };
            view = cache.translate(kind, &object, &target, pin)?;
            object = target;
        } else {
            let Some(target) = cache.resolve(&object, step, view)? else {
                return Ok(None);
            };
            object = target;
        }
    }
    Ok(Some(Landing { object, view }))
}

/// The defined value of `attribute` on the object reached via `path` at `at`.
///
/// `Null` values are reported as undefined.
pub(crate) fn value_at(
    cache: &mut HistoryCache<'_>,
    root: &ObjectIdentity,
    path: &[AttributeId],
    attribute: &AttributeId,
    at: Revision,
) -> HistoryResult<Option<Value>> {
    let Some(landing) = land(cache, root, path, at)? else {
        return Ok(None);
    };
    let life = cache.life(&landing.object, attribute)?;
    Ok(life
        .value_at(landing.view)
        .filter(|v| !v.is_null())
        .cloned())
}

/// Adds to `out` every revision inside `window` at which the value of
/// `path.attribute`, or the identity of any object on the path, may change.
///
/// Breakpoints are pulled in transitively: for each stretch of `window` over
/// which a reference keeps its target, the target's own breakpoints within
/// that stretch are collected as well.
pub(crate) fn collect_breakpoints(
    cache: &mut HistoryCache<'_>,
    object: &ObjectIdentity,
    path: &[AttributeId],
    attribute: &AttributeId,
    window: RevisionRange,
    out: &mut BTreeSet<Revision>,
) -> HistoryResult<()> {
    let Some((step, rest)) = path.split_first() else {
        let life = cache.life(object, attribute)?;
        out.extend(life.breakpoints_within(window));
        return Ok(());
    };

    let kind = cache.kind(step)?;
    let life = cache.life(object, step)?;
    let cuts: BTreeSet<Revision> = life.breakpoints_within(window).collect();
    out.extend(cuts.iter().copied());

    // Past a historic step the view is pinned: nothing downstream changes
    // within a stretch where the reference entry stays the same.
    if kind.is_historic() {
        return Ok(());
    }

    for stretch in partition(window, &cuts) {
        if let Some(target) = cache.resolve(object, step, stretch.start())? {
            collect_breakpoints(cache, &target, rest, attribute, stretch, out)?;
        }
    }
    Ok(())
}

/// Splits `window` at each of `cuts` (which must lie strictly inside it).
pub(crate) fn partition(window: RevisionRange, cuts: &BTreeSet<Revision>) -> Vec<RevisionRange> {
    let mut stretches = Vec::with_capacity(cuts.len() + 1);
    let mut start = window.start();
    for &cut in cuts.iter().chain(std::iter::once(&window.stop())) {
        if let Some(stretch) = RevisionRange::try_new(start, cut) {
            stretches.push(stretch);
            start = cut;
        }
    }
    stretches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(n: u64) -> Revision {
        Revision::new(n)
    }

    #[test]
    fn test_partition_without_cuts() {
        let window = RevisionRange::new(rev(0), rev(10)).unwrap();
        assert_eq!(partition(window, &BTreeSet::new()), vec![window]);
    }

    #[test]
    fn test_partition_with_cuts() {
        let window = RevisionRange::new(rev(0), rev(10)).unwrap();
        let cuts: BTreeSet<_> = [rev(3), rev(5)].into_iter().collect();
        let stretches: Vec<(u64, u64)> = partition(window, &cuts)
            .iter()
            .map(|r| (r.start().get(), r.stop().get()))
            .collect();
        assert_eq!(stretches, vec![(0, 3), (3, 5), (5, 10)]);
    }
}
