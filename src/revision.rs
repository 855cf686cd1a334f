//! Revision numbers and half-open revision ranges.
//!
//! A revision identifies a committed state of the object store. Revisions are
//! totally ordered and grow monotonically with every commit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of a committed store state.
///
/// # Examples
///
/// ```
/// use histql::Revision;
///
/// let r = Revision::new(3);
/// assert!(Revision::MIN < r && r < Revision::MAX);
/// assert_eq!(r.next(), Revision::new(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Lower bound of the revision universe.
    pub const MIN: Self = Self(0);

    /// Upper bound of the revision universe (exclusive in ranges).
    pub const MAX: Self = Self(u64::MAX);

    /// Wraps a raw revision number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw revision number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the following revision, saturating at `MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAX {
            write!(f, "∞")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<u64> for Revision {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A half-open interval of revisions: `[start, stop)`.
///
/// A range is never empty; `start < stop` always holds, including for
/// deserialized ranges.
///
/// # Examples
///
/// ```
/// use histql::{Revision, RevisionRange};
///
/// let range = RevisionRange::new(Revision::new(2), Revision::new(5)).unwrap();
/// assert!(range.contains(Revision::new(2)));
/// assert!(!range.contains(Revision::new(5)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRevisionRange")]
pub struct RevisionRange {
    start: Revision,
    stop: Revision,
}

/// Unchecked wire form of a [`RevisionRange`].
#[derive(Deserialize)]
struct RawRevisionRange {
    start: Revision,
    stop: Revision,
}

impl TryFrom<RawRevisionRange> for RevisionRange {
    type Error = ValidationError;

    fn try_from(raw: RawRevisionRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.stop)
    }
}

impl RevisionRange {
    /// Creates a range from two revisions.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidRevisionRange` if `start >= stop`.
    pub fn new(start: Revision, stop: Revision) -> Result<Self, ValidationError> {
        Self::try_new(start, stop).ok_or(ValidationError::InvalidRevisionRange { start, stop })
    }

    /// Creates a range, or `None` if it would be empty.
    #[must_use]
    pub fn try_new(start: Revision, stop: Revision) -> Option<Self> {
        (start < stop).then_some(Self { start, stop })
    }

    /// The range covering exactly `revision`.
    ///
    /// `None` for `Revision::MAX`, which is an exclusive bound only and never
    /// a member of any range.
    #[must_use]
    pub const fn try_single(revision: Revision) -> Option<Self> {
        if revision.0 == u64::MAX {
            return None;
        }
        Some(Self {
            start: revision,
            stop: revision.next(),
        })
    }

    /// The open-ended range `[start, MAX)`, or `None` for `start == MAX`.
    #[must_use]
    pub const fn starting_at(start: Revision) -> Option<Self> {
        if start.0 == u64::MAX {
            return None;
        }
        Some(Self {
            start,
            stop: Revision::MAX,
        })
    }

    /// The whole revision universe `[MIN, MAX)`.
    #[must_use]
    pub const fn universe() -> Self {
        Self {
            start: Revision::MIN,
            stop: Revision::MAX,
        }
    }

    /// First revision in the range.
    #[must_use]
    pub const fn start(&self) -> Revision {
        self.start
    }

    /// First revision after the range.
    #[must_use]
    pub const fn stop(&self) -> Revision {
        self.stop
    }

    /// True if the range runs to `Revision::MAX`.
    #[must_use]
    pub const fn is_open_ended(&self) -> bool {
        self.stop.0 == u64::MAX
    }

    /// Check if a revision falls within this range `[start, stop)`.
    #[must_use]
    pub fn contains(&self, revision: Revision) -> bool {
        revision >= self.start && revision < self.stop
    }

    /// True if the two ranges share at least one revision.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.stop && other.start < self.stop
    }

    /// True if the two ranges overlap or share a boundary.
    #[must_use]
    pub fn touches(&self, other: &Self) -> bool {
        self.start <= other.stop && other.start <= self.stop
    }

    /// Returns the intersection of two ranges, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        Self::try_new(self.start.max(other.start), self.stop.min(other.stop))
    }

    /// The smallest range covering both `self` and `other`.
    #[must_use]
    pub fn span(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }

    /// Number of revisions covered.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.stop.0 - self.start.0
    }
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(n: u64) -> Revision {
        Revision::new(n)
    }

    #[test]
    fn test_revision_range_new_valid() {
        let range = RevisionRange::new(rev(1), rev(4)).unwrap();
        assert_eq!(range.start(), rev(1));
        assert_eq!(range.stop(), rev(4));
        assert_eq!(range.len(), 3);
        assert!(!range.is_open_ended());
    }

    #[test]
    fn test_revision_range_new_invalid() {
        assert!(RevisionRange::new(rev(4), rev(1)).is_err());
        assert!(RevisionRange::new(rev(4), rev(4)).is_err()); // Empty is invalid
        assert!(RevisionRange::try_new(rev(4), rev(4)).is_none());
    }

    #[test]
    fn test_revision_range_single() {
        let range = RevisionRange::try_single(rev(3)).unwrap();
        assert!(range.contains(rev(3)));
        assert!(!range.contains(rev(4)));
        assert_eq!(range.len(), 1);

        let last = RevisionRange::try_single(rev(u64::MAX - 1)).unwrap();
        assert_eq!(last.stop(), Revision::MAX);
        assert!(RevisionRange::try_single(Revision::MAX).is_none());
    }

    #[test]
    fn test_revision_range_starting_at() {
        assert!(RevisionRange::starting_at(Revision::MAX).is_none());
        let range = RevisionRange::starting_at(rev(7)).unwrap();
        assert!(range.is_open_ended());
        assert!(range.contains(rev(7)));
        assert!(range.contains(rev(1_000_000)));
        assert!(!range.contains(rev(6)));
    }

    #[test]
    fn test_revision_range_overlaps_and_touches() {
        let a = RevisionRange::new(rev(0), rev(5)).unwrap();
        let b = RevisionRange::new(rev(5), rev(8)).unwrap();
        let c = RevisionRange::new(rev(3), rev(6)).unwrap();

        assert!(!a.overlaps(&b));
        assert!(a.touches(&b));
        assert!(b.touches(&a));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_revision_range_intersection() {
        let a = RevisionRange::new(rev(0), rev(5)).unwrap();
        let b = RevisionRange::new(rev(3), rev(8)).unwrap();
        assert_eq!(
            a.intersection(&b),
            Some(RevisionRange::new(rev(3), rev(5)).unwrap())
        );

        let c = RevisionRange::new(rev(5), rev(8)).unwrap();
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn test_revision_range_span() {
        let a = RevisionRange::new(rev(0), rev(2)).unwrap();
        let b = RevisionRange::new(rev(5), rev(8)).unwrap();
        assert_eq!(a.span(&b), RevisionRange::new(rev(0), rev(8)).unwrap());
        assert_eq!(b.span(&a), a.span(&b));
    }

    #[test]
    fn test_revision_range_display() {
        let range = RevisionRange::new(rev(3), rev(4)).unwrap();
        assert_eq!(range.to_string(), "[3, 4)");
        assert_eq!(RevisionRange::starting_at(rev(2)).unwrap().to_string(), "[2, ∞)");
    }

    #[test]
    fn test_revision_range_serialization() {
        let range = RevisionRange::new(rev(3), rev(9)).unwrap();
        let json = serde_json::to_string(&range).unwrap();
        let deserialized: RevisionRange = serde_json::from_str(&json).unwrap();
        assert_eq!(range, deserialized);
    }

    #[test]
    fn test_revision_range_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<RevisionRange>(r#"{"start":9,"stop":2}"#).is_err());
        assert!(serde_json::from_str::<RevisionRange>(r#"{"start":4,"stop":4}"#).is_err());
    }
}
