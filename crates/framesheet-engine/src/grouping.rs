//! Contiguous-run grouping.
//!
//! An ordered key sequence is cut into maximal runs of equal consecutive
//! keys; runs sharing a key are folded under that key in scan order. Input is
//! never sorted first, so a key that reappears after a different key gets a
//! second interval rather than one merged block.

use std::fmt;
use std::hash::Hash;

use framesheet_common::{CellValue, FrameError, FrameResult, Labels, format_labels};
use rustc_hash::FxHashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` position span.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    pub fn new(start: u32, end: u32) -> Self {
        Interval {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn point(at: u32) -> Self {
        Interval { start: at, end: at }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Never true; an interval holds at least one position.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, pos: u32) -> bool {
        pos >= self.start && pos <= self.end
    }

    pub fn shift(self, by: u32) -> Self {
        Interval {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

impl From<(u32, u32)> for Interval {
    fn from((start, end): (u32, u32)) -> Self {
        Interval::new(start, end)
    }
}

/// Order of groups in a [`GroupIndex`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupOrder {
    #[default]
    FirstOccurrence,
    Sorted,
}

/// One maximal run of equal keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run<'a, K> {
    pub key: &'a K,
    pub interval: Interval,
}

/// Every maximal run of `keys`, in scan order.
pub fn find_runs<K: PartialEq>(keys: &[K]) -> Vec<Run<'_, K>> {
    let mut runs: Vec<Run<'_, K>> = Vec::new();
    for (pos, key) in keys.iter().enumerate() {
        let pos = pos as u32;
        match runs.last_mut() {
            Some(run) if run.key == key => run.interval.end = pos,
            _ => runs.push(Run {
                key,
                interval: Interval::point(pos),
            }),
        }
    }
    runs
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group<K> {
    pub key: K,
    pub intervals: Vec<Interval>,
}

/// Key tuple to its run intervals. Rebuilt on every grouping call.
#[derive(Clone, Debug)]
pub struct GroupIndex<K = Labels> {
    groups: Vec<Group<K>>,
    lookup: FxHashMap<K, usize>,
}

impl<K: PartialEq> PartialEq for GroupIndex<K> {
    fn eq(&self, other: &Self) -> bool {
        self.groups == other.groups
    }
}

/// Partition `keys` into runs and fold the runs by key.
pub fn group_runs<K>(keys: &[K], order: GroupOrder) -> GroupIndex<K>
where
    K: Eq + Hash + Ord + Clone,
{
    let mut groups: Vec<Group<K>> = Vec::new();
    let mut lookup: FxHashMap<K, usize> = FxHashMap::default();
    for run in find_runs(keys) {
        match lookup.get(run.key) {
            Some(&slot) => groups[slot].intervals.push(run.interval),
            None => {
                lookup.insert(run.key.clone(), groups.len());
                groups.push(Group {
                    key: run.key.clone(),
                    intervals: vec![run.interval],
                });
            }
        }
    }
    let mut index = GroupIndex { groups, lookup };
    if order == GroupOrder::Sorted {
        index.sort();
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(rows = keys.len(), groups = index.len(), "grouped runs");
    index
}

impl<K> GroupIndex<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn empty() -> Self {
        GroupIndex {
            groups: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[Group<K>] {
        &self.groups
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.iter().map(|g| &g.key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&[Interval]>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.lookup.get(key)?;
        Some(&self.groups[slot].intervals)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Group<K>> {
        self.groups.iter()
    }

    /// Translate every interval by `by` positions (0-based scan positions to
    /// absolute sheet rows or columns).
    pub fn shifted(mut self, by: u32) -> Self {
        for group in &mut self.groups {
            for interval in &mut group.intervals {
                *interval = interval.shift(by);
            }
        }
        self
    }

    fn sort(&mut self) {
        self.groups.sort_by(|a, b| a.key.cmp(&b.key));
        for (slot, group) in self.groups.iter().enumerate() {
            if let Some(entry) = self.lookup.get_mut(&group.key) {
                *entry = slot;
            }
        }
    }
}

impl GroupIndex<Labels> {
    /// The only interval of `key`; several runs are rejected.
    pub fn single_interval(&self, key: &[CellValue]) -> FrameResult<Interval> {
        let intervals = self
            .get(key)
            .ok_or_else(|| FrameError::KeyNotFound(format_labels(key)))?;
        match intervals {
            [only] => Ok(*only),
            many => Err(FrameError::NonContiguousSelection {
                key: format_labels(key),
                intervals: many.len(),
            }),
        }
    }
}

impl<'a, K> IntoIterator for &'a GroupIndex<K> {
    type Item = &'a Group<K>;
    type IntoIter = std::slice::Iter<'a, Group<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn iv(start: u32, end: u32) -> Interval {
        Interval::new(start, end)
    }

    #[test]
    fn repeated_key_keeps_both_runs() {
        let index = group_runs(&[1, 1, 1, 2, 2, 1, 1], GroupOrder::FirstOccurrence);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&1), Some(&[iv(0, 2), iv(5, 6)][..]));
        assert_eq!(index.get(&2), Some(&[iv(3, 4)][..]));
        assert_eq!(index.keys().copied().collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn edge_cases() {
        let empty: GroupIndex<i32> = group_runs(&[], GroupOrder::FirstOccurrence);
        assert!(empty.is_empty());

        let one = group_runs(&["x"], GroupOrder::FirstOccurrence);
        assert_eq!(one.get("x"), Some(&[iv(0, 0)][..]));

        let same = group_runs(&[7; 5], GroupOrder::FirstOccurrence);
        assert_eq!(same.get(&7), Some(&[iv(0, 4)][..]));
    }

    #[test]
    fn sorted_order() {
        let keys = ["b", "a", "b", "c", "a"];
        let first = group_runs(&keys, GroupOrder::FirstOccurrence);
        assert_eq!(first.keys().copied().collect::<Vec<_>>(), ["b", "a", "c"]);
        let sorted = group_runs(&keys, GroupOrder::Sorted);
        assert_eq!(sorted.keys().copied().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(sorted.get("a"), Some(&[iv(1, 1), iv(4, 4)][..]));
        assert_eq!(sorted.get("c"), Some(&[iv(3, 3)][..]));
    }

    #[test]
    fn shift_to_sheet_rows() {
        let index = group_runs(&['p', 'p', 'q'], GroupOrder::FirstOccurrence).shifted(4);
        assert_eq!(index.get(&'p'), Some(&[iv(4, 5)][..]));
        assert_eq!(index.get(&'q'), Some(&[iv(6, 6)][..]));
    }

    #[test]
    fn single_interval_checks_contiguity() {
        let keys: Vec<Labels> = ["A", "A", "B", "A"]
            .iter()
            .map(|k| smallvec![CellValue::from(*k)])
            .collect();
        let index = group_runs(&keys, GroupOrder::FirstOccurrence);
        assert_eq!(
            index.single_interval(&[CellValue::from("B")]).unwrap(),
            iv(2, 2)
        );
        assert!(matches!(
            index.single_interval(&[CellValue::from("A")]),
            Err(FrameError::NonContiguousSelection { intervals: 2, .. })
        ));
        assert!(matches!(
            index.single_interval(&[CellValue::from("Z")]),
            Err(FrameError::KeyNotFound(_))
        ));
    }

    #[test]
    fn runs_in_scan_order() {
        let runs = find_runs(&[3, 3, 4, 3]);
        let spans: Vec<(i32, Interval)> = runs.iter().map(|r| (*r.key, r.interval)).collect();
        assert_eq!(spans, [(3, iv(0, 1)), (4, iv(2, 2)), (3, iv(3, 3))]);
    }
}
