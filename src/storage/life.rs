//! Attribute lives: the validity history of one attribute of one object.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::revision::{Revision, RevisionRange};
use crate::value::Value;

/// One `(range, value)` entry of an [`AttributeLife`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeEntry {
    /// Revisions over which `value` holds.
    pub range: RevisionRange,
    /// The value held.
    pub value: Value,
}

/// Ordered, non-overlapping history of an attribute's values.
///
/// Gaps between entries mean the attribute was undefined during those
/// revisions.
///
/// # Examples
///
/// ```
/// use histql::{AttributeLife, Revision, RevisionRange, Value};
///
/// let r = |a, b| RevisionRange::new(Revision::new(a), Revision::new(b)).unwrap();
/// let life = AttributeLife::new(vec![
///     (r(0, 5), Value::from("x")),
///     (r(5, 10), Value::from("y")),
/// ])
/// .unwrap();
///
/// assert_eq!(life.value_at(Revision::new(7)), Some(&Value::from("y")));
/// assert_eq!(life.value_at(Revision::new(12)), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LifeEntry>", into = "Vec<LifeEntry>")]
pub struct AttributeLife {
    entries: Vec<LifeEntry>,
}

impl TryFrom<Vec<LifeEntry>> for AttributeLife {
    type Error = ValidationError;

    fn try_from(entries: Vec<LifeEntry>) -> Result<Self, Self::Error> {
        Self::new(entries.into_iter().map(|e| (e.range, e.value)).collect())
    }
}

impl From<AttributeLife> for Vec<LifeEntry> {
    fn from(life: AttributeLife) -> Self {
        life.entries
    }
}

impl AttributeLife {
    /// Creates a life from entries in ascending order.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnorderedAttributeLife` if two entries are
    /// out of order or overlap. Touching entries are fine.
    pub fn new(entries: Vec<(RevisionRange, Value)>) -> Result<Self, ValidationError> {
        let mut previous_stop = Revision::MIN;
        for (index, (range, _)) in entries.iter().enumerate() {
            if index > 0 && range.start() < previous_stop {
                return Err(ValidationError::UnorderedAttributeLife {
                    index,
                    start: range.start(),
                    previous_stop,
                });
            }
            previous_stop = range.stop();
        }

        Ok(Self {
            entries: entries
                .into_iter()
                .map(|(range, value)| LifeEntry { range, value })
                .collect(),
        })
    }

    /// A life without any value: the attribute was never set.
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// A single value held over one range.
    #[must_use]
    pub fn constant(range: RevisionRange, value: Value) -> Self {
        Self {
            entries: vec![LifeEntry { range, value }],
        }
    }

    /// All entries in ascending order.
    #[must_use]
    pub fn entries(&self) -> &[LifeEntry] {
        &self.entries
    }

    /// True if the attribute was never defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry in effect at `revision`, if any.
    #[must_use]
    pub fn entry_at(&self, revision: Revision) -> Option<&LifeEntry> {
        let idx = self.entries.partition_point(|e| e.range.start() <= revision);
        let entry = self.entries.get(idx.checked_sub(1)?)?;
        entry.range.contains(revision).then_some(entry)
    }

    /// The value in effect at `revision`, if any.
    #[must_use]
    pub fn value_at(&self, revision: Revision) -> Option<&Value> {
        self.entry_at(revision).map(|e| &e.value)
    }

    /// Every entry boundary strictly inside `window`, ascending.
    ///
    /// These are the revisions at which the attribute may change its value
    /// (including changes to or from undefined).
    pub fn breakpoints_within(&self, window: RevisionRange) -> impl Iterator<Item = Revision> + '_ {
        self.entries
            .iter()
            .flat_map(|e| [e.range.start(), e.range.stop()])
            .filter(move |r| *r > window.start() && *r < window.stop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(a: u64, b: u64) -> RevisionRange {
        RevisionRange::new(Revision::new(a), Revision::new(b)).unwrap()
    }

    #[test]
    fn test_life_rejects_overlap() {
        let err = AttributeLife::new(vec![(r(0, 5), Value::Int(1)), (r(4, 8), Value::Int(2))]);
        assert!(matches!(
            err,
            Err(ValidationError::UnorderedAttributeLife { index: 1, .. })
        ));
    }

    #[test]
    fn test_life_deserialize_validates_order() {
        let life = AttributeLife::new(vec![(r(0, 5), Value::Int(1)), (r(5, 8), Value::Int(2))]).unwrap();
        let json = serde_json::to_string(&life).unwrap();
        assert_eq!(serde_json::from_str::<AttributeLife>(&json).unwrap(), life);

        let overlapping = r#"[
            {"range":{"start":0,"stop":5},"value":{"type":"int","value":1}},
            {"range":{"start":3,"stop":8},"value":{"type":"int","value":2}}
        ]"#;
        assert!(serde_json::from_str::<AttributeLife>(overlapping).is_err());
    }

    #[test]
    fn test_life_accepts_touching_and_gaps() {
        let life = AttributeLife::new(vec![
            (r(0, 5), Value::Int(1)),
            (r(5, 8), Value::Int(2)),
            (r(10, 12), Value::Int(3)),
        ])
        .unwrap();
        assert_eq!(life.entries().len(), 3);
        assert_eq!(life.value_at(Revision::new(4)), Some(&Value::Int(1)));
        assert_eq!(life.value_at(Revision::new(5)), Some(&Value::Int(2)));
        assert_eq!(life.value_at(Revision::new(9)), None);
        assert_eq!(life.value_at(Revision::new(12)), None);
    }

    #[test]
    fn test_entry_at_before_first() {
        let life = AttributeLife::constant(r(3, 6), Value::Bool(true));
        assert!(life.entry_at(Revision::new(2)).is_none());
        assert_eq!(life.entry_at(Revision::new(3)).map(|e| e.range), Some(r(3, 6)));
        assert!(AttributeLife::undefined().entry_at(Revision::new(0)).is_none());
    }

    #[test]
    fn test_breakpoints_within_window() {
        let life = AttributeLife::new(vec![
            (r(0, 5), Value::Int(1)),
            (r(5, 8), Value::Int(2)),
            (r(10, 12), Value::Int(3)),
        ])
        .unwrap();
        let cuts: Vec<u64> = life.breakpoints_within(r(2, 11)).map(Revision::get).collect();
        assert_eq!(cuts, vec![5, 5, 8, 10]);
    }
}
