//! Interval-set algebra over revisions.
//!
//! A [`RangeSet`] is a finite union of disjoint half-open revision ranges. It
//! is kept sorted and maximally coalesced: no two stored ranges overlap or
//! share a boundary. That invariant lets membership use binary search and
//! keeps every binary operation a single linear sweep.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::revision::{Revision, RevisionRange};

/// Sorted, coalesced set of revision ranges.
///
/// Values are immutable; every operation returns a new set.
///
/// # Examples
///
/// ```
/// use histql::{RangeSet, Revision, RevisionRange};
///
/// let a = RangeSet::from_range(RevisionRange::new(Revision::new(0), Revision::new(5)).unwrap());
/// let b = RangeSet::from_range(RevisionRange::new(Revision::new(5), Revision::new(9)).unwrap());
///
/// let merged = a.union(&b);
/// assert_eq!(merged.len(), 1);
/// assert!(merged.contains(Revision::new(7)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<RevisionRange>", into = "Vec<RevisionRange>")]
pub struct RangeSet {
    ranges: Vec<RevisionRange>,
}

impl RangeSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    /// The single range `[MIN, MAX)`.
    #[must_use]
    pub fn universe() -> Self {
        Self::from_range(RevisionRange::universe())
    }

    /// The set holding exactly `range`.
    #[must_use]
    pub fn from_range(range: RevisionRange) -> Self {
        Self {
            ranges: vec![range],
        }
    }

    /// Returns a new set with `range` added, coalescing with every range it
    /// touches or overlaps.
    #[must_use]
    pub fn insert(&self, range: RevisionRange) -> Self {
        let mut builder = RangeSetBuilder::with_capacity(self.ranges.len() + 1);
        let mut pending = Some(range);
        for existing in &self.ranges {
            if let Some(r) = pending {
                if r.start() <= existing.start() {
                    builder.push(r);
                    pending = None;
                }
            }
            builder.push(*existing);
        }
        if let Some(r) = pending {
            builder.push(r);
        }
        builder.finish()
    }

    /// Like [`insert`](Self::insert) but from raw bounds; `start >= stop` is a
    /// no-op.
    #[must_use]
    pub fn insert_bounds(&self, start: Revision, stop: Revision) -> Self {
        match RevisionRange::try_new(start, stop) {
            Some(range) => self.insert(range),
            None => self.clone(),
        }
    }

    /// Union of two sets, computed as a merge sweep in `O(|a| + |b|)`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut builder = RangeSetBuilder::with_capacity(self.ranges.len() + other.ranges.len());
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            if self.ranges[i].start() <= other.ranges[j].start() {
                builder.push(self.ranges[i]);
                i += 1;
            } else {
                builder.push(other.ranges[j]);
                j += 1;
            }
        }
        for r in self.ranges[i..].iter().chain(&other.ranges[j..]) {
            builder.push(*r);
        }
        builder.finish()
    }

    /// Intersection of two sets.
    ///
    /// Classic sweep: emit the overlap of the two current ranges, then
    /// advance whichever one ends first.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let mut builder = RangeSetBuilder::default();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let a = self.ranges[i];
            let b = other.ranges[j];
            if let Some(overlap) = a.intersection(&b) {
                builder.push(overlap);
            }
            if a.stop() <= b.stop() {
                i += 1;
            } else {
                j += 1;
            }
        }
        builder.finish()
    }

    /// The revisions of `universe` not covered by `self`.
    #[must_use]
    pub fn complement(&self, universe: &Self) -> Self {
        let mut gaps = RangeSetBuilder::with_capacity(self.ranges.len() + 1);
        let mut cursor = Revision::MIN;
        for r in &self.ranges {
            if let Some(gap) = RevisionRange::try_new(cursor, r.start()) {
                gaps.push(gap);
            }
            cursor = r.stop();
        }
        if let Some(gap) = RevisionRange::try_new(cursor, Revision::MAX) {
            gaps.push(gap);
        }
        gaps.finish().intersect(universe)
    }

    /// Membership test by binary search over the sorted starts.
    #[must_use]
    pub fn contains(&self, revision: Revision) -> bool {
        // Index of the first range starting after `revision`; the candidate is
        // the one just before it.
        let idx = self.ranges.partition_point(|r| r.start() <= revision);
        idx > 0 && self.ranges[idx - 1].contains(revision)
    }

    /// True if the set holds no revision.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of disjoint ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// The stored ranges, sorted and coalesced.
    #[must_use]
    pub fn ranges(&self) -> &[RevisionRange] {
        &self.ranges
    }

    /// Iterates the stored ranges in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, RevisionRange> {
        self.ranges.iter()
    }

    /// First revision in the set.
    #[must_use]
    pub fn first(&self) -> Option<Revision> {
        self.ranges.first().map(RevisionRange::start)
    }
}

impl FromIterator<RevisionRange> for RangeSet {
    fn from_iter<I: IntoIterator<Item = RevisionRange>>(iter: I) -> Self {
        let mut ranges: Vec<RevisionRange> = iter.into_iter().collect();
        ranges.sort_by_key(RevisionRange::start);
        let mut builder = RangeSetBuilder::with_capacity(ranges.len());
        for r in ranges {
            builder.push(r);
        }
        builder.finish()
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = &'a RevisionRange;
    type IntoIter = std::slice::Iter<'a, RevisionRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

// Deserialized ranges are normalized like any other input.
impl From<Vec<RevisionRange>> for RangeSet {
    fn from(ranges: Vec<RevisionRange>) -> Self {
        ranges.into_iter().collect()
    }
}

impl From<RangeSet> for Vec<RevisionRange> {
    fn from(set: RangeSet) -> Self {
        set.ranges
    }
}

impl From<RevisionRange> for RangeSet {
    fn from(range: RevisionRange) -> Self {
        Self::from_range(range)
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, r) in self.ranges.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{r}")?;
        }
        write!(f, "}}")
    }
}

/// Accumulates ranges pushed in ascending start order, coalescing as it goes.
///
/// Pushing out of order is a logic error; every caller in this module feeds it
/// from already sorted input.
#[derive(Debug, Default)]
struct RangeSetBuilder {
    ranges: Vec<RevisionRange>,
}

impl RangeSetBuilder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ranges: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, range: RevisionRange) {
        debug_assert!(self
            .ranges
            .last()
            .map_or(true, |last| last.start() <= range.start()));

        if let Some(last) = self.ranges.last_mut() {
            // Touching counts as overlapping.
            if range.start() <= last.stop() {
                *last = last.span(&range);
                return;
            }
        }
        self.ranges.push(range);
    }

    fn finish(self) -> RangeSet {
        RangeSet {
            ranges: self.ranges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, stop: u64) -> RevisionRange {
        RevisionRange::new(Revision::new(start), Revision::new(stop)).unwrap()
    }

    fn set(bounds: &[(u64, u64)]) -> RangeSet {
        bounds.iter().map(|&(a, b)| range(a, b)).collect()
    }

    #[test]
    fn test_deserialize_normalizes_ranges() {
        let parsed: RangeSet =
            serde_json::from_str(r#"[{"start":5,"stop":9},{"start":0,"stop":3},{"start":2,"stop":4}]"#).unwrap();
        assert_eq!(parsed, set(&[(0, 4), (5, 9)]));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"[{"start":0,"stop":4},{"start":5,"stop":9}]"#);
    }

    #[test]
    fn test_deserialize_rejects_inverted_range() {
        let parsed = serde_json::from_str::<RangeSet>(
            r#"[{"start":5,"stop":9},{"start":0,"stop":3},{"start":9,"stop":2}]"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_insert_coalesces_touching_ranges() {
        let s = RangeSet::empty().insert(range(0, 5)).insert(range(5, 10));
        assert_eq!(s.ranges(), &[range(0, 10)]);

        // Reverse order gives the same result.
        let s = RangeSet::empty().insert(range(5, 10)).insert(range(0, 5));
        assert_eq!(s.ranges(), &[range(0, 10)]);
    }

    #[test]
    fn test_insert_bridges_multiple_ranges() {
        let s = set(&[(0, 2), (4, 6), (8, 10)]).insert(range(1, 9));
        assert_eq!(s.ranges(), &[range(0, 10)]);
    }

    #[test]
    fn test_insert_keeps_gaps() {
        let s = set(&[(0, 2), (8, 10)]).insert(range(4, 6));
        assert_eq!(s.ranges(), &[range(0, 2), range(4, 6), range(8, 10)]);
    }

    #[test]
    fn test_insert_bounds_empty_is_noop() {
        let s = set(&[(0, 2)]);
        assert_eq!(s.insert_bounds(Revision::new(5), Revision::new(5)), s);
        assert_eq!(s.insert_bounds(Revision::new(6), Revision::new(5)), s);
    }

    #[test]
    fn test_union() {
        let a = set(&[(0, 3), (10, 12)]);
        let b = set(&[(2, 5), (7, 8), (12, 15)]);
        assert_eq!(a.union(&b), set(&[(0, 5), (7, 8), (10, 15)]));
        assert_eq!(a.union(&RangeSet::empty()), a);
    }

    #[test]
    fn test_intersect() {
        let a = set(&[(0, 5), (8, 12)]);
        let b = set(&[(3, 9), (11, 20)]);
        assert_eq!(a.intersect(&b), set(&[(3, 5), (8, 9), (11, 12)]));
        assert!(a.intersect(&RangeSet::empty()).is_empty());
    }

    #[test]
    fn test_intersect_touching_is_empty() {
        let a = set(&[(0, 5)]);
        let b = set(&[(5, 9)]);
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn test_complement_within_universe() {
        let universe = set(&[(0, 10)]);
        let a = set(&[(2, 4), (6, 7)]);
        assert_eq!(a.complement(&universe), set(&[(0, 2), (4, 6), (7, 10)]));
        assert_eq!(RangeSet::empty().complement(&universe), universe);
        assert!(universe.complement(&universe).is_empty());
    }

    #[test]
    fn test_complement_of_full_universe() {
        let a = set(&[(3, 4)]);
        let c = a.complement(&RangeSet::universe());
        assert_eq!(c.len(), 2);
        assert_eq!(c.first(), Some(Revision::MIN));
        assert!(!c.contains(Revision::new(3)));
        assert!(c.contains(Revision::new(4)));
    }

    #[test]
    fn test_contains() {
        let s = set(&[(0, 2), (5, 7)]);
        assert!(s.contains(Revision::new(0)));
        assert!(s.contains(Revision::new(1)));
        assert!(!s.contains(Revision::new(2)));
        assert!(!s.contains(Revision::new(4)));
        assert!(s.contains(Revision::new(6)));
        assert!(!s.contains(Revision::new(7)));
        assert!(!RangeSet::empty().contains(Revision::new(0)));
    }

    #[test]
    fn test_from_iter_sorts_and_coalesces() {
        let s = set(&[(8, 9), (0, 3), (2, 5), (5, 6)]);
        assert_eq!(s.ranges(), &[range(0, 6), range(8, 9)]);
    }

    #[test]
    fn test_display() {
        let s = set(&[(3, 4), (5, 6)]);
        assert_eq!(s.to_string(), "{[3, 4), [5, 6)}");
        assert_eq!(RangeSet::empty().to_string(), "{}");
    }
}
