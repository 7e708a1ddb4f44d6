//! Logical column and row index of a frame.
//!
//! The column index is an ordered list of slots. A simple slot is one
//! physical column labelled by a tuple with one entry per header level. A
//! wide slot is a named group that spans one physical column per recorded
//! sub-value. On the sheet a wide group shows its name once, followed by
//! blank header cells for its extra width; [`ColumnIndex::measure`] discovers
//! that width from a freshly read header segment.

use framesheet_common::{CellValue, FrameError, FrameResult, Labels, format_labels};
use rustc_hash::FxHashMap;
use smallvec::smallvec;

use crate::grouping::{GroupOrder, Interval, group_runs};

/// Reference to a logical column.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    /// Plain name; only unambiguous with a single header level.
    Name(String),
    /// Full header tuple, one entry per level.
    Key(Labels),
    /// A wide group as a whole.
    Wide(String),
    /// One sub-column of a wide group.
    WideSub(String, CellValue),
}

impl ColumnRef {
    pub fn name(name: impl Into<String>) -> Self {
        ColumnRef::Name(name.into())
    }

    pub fn key<I, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        ColumnRef::Key(labels.into_iter().map(Into::into).collect())
    }

    pub fn wide(name: impl Into<String>) -> Self {
        ColumnRef::Wide(name.into())
    }

    pub fn wide_sub(name: impl Into<String>, sub: impl Into<CellValue>) -> Self {
        ColumnRef::WideSub(name.into(), sub.into())
    }

    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            ColumnRef::Name(n) | ColumnRef::Wide(n) => n.clone(),
            ColumnRef::Key(labels) => format_labels(labels),
            ColumnRef::WideSub(n, sub) => format!("{n}[{sub}]"),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        ColumnRef::Name(value.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(value: String) -> Self {
        ColumnRef::Name(value)
    }
}

impl From<Labels> for ColumnRef {
    fn from(value: Labels) -> Self {
        ColumnRef::Key(value)
    }
}

/// Physical columns of a resolved reference, as a 0-based offset from the
/// first data column plus a width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColumnSpan {
    pub offset: u32,
    pub width: u32,
}

impl ColumnSpan {
    pub fn single(offset: u32) -> Self {
        ColumnSpan { offset, width: 1 }
    }

    pub fn last(&self) -> u32 {
        self.offset + self.width - 1
    }
}

/// A label followed by its run of blank cells in a header segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WideSpan {
    pub label: CellValue,
    pub start: u32,
    pub width: u32,
}

/// Cut a header segment into label-plus-blanks spans. Leading blanks belong
/// to no span; a span never extends past the end of the segment.
pub fn wide_spans(segment: &[Option<CellValue>]) -> Vec<WideSpan> {
    let mut spans: Vec<WideSpan> = Vec::new();
    for (pos, cell) in segment.iter().enumerate() {
        match cell.as_ref().filter(|v| !v.is_blank()) {
            Some(label) => spans.push(WideSpan {
                label: label.clone(),
                start: pos as u32,
                width: 1,
            }),
            None => {
                if let Some(open) = spans.last_mut() {
                    open.width += 1;
                }
            }
        }
    }
    spans
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSlot {
    Simple(Labels),
    Wide(String),
}

/// Widths of every slot as measured against the live header row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    spans: Vec<ColumnSpan>,
}

impl ColumnLayout {
    pub fn spans(&self) -> &[ColumnSpan] {
        &self.spans
    }

    /// Physical width of all slots together.
    pub fn width(&self) -> u32 {
        self.spans.last().map_or(0, |s| s.offset + s.width)
    }
}

#[derive(Clone, Debug)]
pub struct ColumnIndex {
    header_levels: usize,
    slots: Vec<ColumnSlot>,
    wide: FxHashMap<String, Vec<CellValue>>,
}

impl ColumnIndex {
    pub fn new(header_levels: usize) -> Self {
        ColumnIndex {
            header_levels: header_levels.max(1),
            slots: Vec::new(),
            wide: FxHashMap::default(),
        }
    }

    /// Index of simple columns only.
    pub fn from_labels(
        header_levels: usize,
        labels: impl IntoIterator<Item = Labels>,
    ) -> FrameResult<Self> {
        let mut index = ColumnIndex::new(header_levels);
        for label in labels {
            index.append(label, None)?;
        }
        Ok(index)
    }

    pub fn header_levels(&self) -> usize {
        self.header_levels
    }

    pub fn slots(&self) -> &[ColumnSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn wide_values(&self, name: &str) -> Option<&[CellValue]> {
        self.wide.get(name).map(Vec::as_slice)
    }

    /// Physical width implied by the recorded sub-value lists.
    pub fn recorded_width(&self) -> u32 {
        self.slots
            .iter()
            .map(|slot| match slot {
                ColumnSlot::Simple(_) => 1,
                ColumnSlot::Wide(name) => self.wide.get(name).map_or(1, |v| v.len() as u32),
            })
            .sum()
    }

    /// Add a simple column (`values` is `None`), or create or grow a wide
    /// group (`values` non-empty).
    ///
    /// A wide group can only grow while it is the right-most slot, since
    /// growing it anywhere else would shift the columns after it.
    pub fn append(&mut self, labels: Labels, values: Option<Vec<CellValue>>) -> FrameResult<()> {
        match values {
            Some(values) if !values.is_empty() => {
                let [name] = labels.as_slice() else {
                    return Err(FrameError::ShapeMismatch {
                        what: "wide group name",
                        expected: 1,
                        found: labels.len(),
                    });
                };
                self.append_wide(&name.to_string(), values)
            }
            _ => self.append_simple(labels),
        }
    }

    fn append_simple(&mut self, labels: Labels) -> FrameResult<()> {
        if labels.len() != self.header_levels {
            return Err(FrameError::ShapeMismatch {
                what: "column labels",
                expected: self.header_levels,
                found: labels.len(),
            });
        }
        let taken_simple = self
            .slots
            .iter()
            .any(|slot| matches!(slot, ColumnSlot::Simple(l) if *l == labels));
        let taken_wide = labels.len() == 1 && self.wide.contains_key(&labels[0].to_string());
        if taken_simple || taken_wide {
            return Err(FrameError::DuplicateGroup(format_labels(&labels)));
        }
        self.slots.push(ColumnSlot::Simple(labels));
        Ok(())
    }

    fn append_wide(&mut self, name: &str, values: Vec<CellValue>) -> FrameResult<()> {
        let clashes_simple = self.slots.iter().any(|slot| {
            matches!(slot, ColumnSlot::Simple(l) if l.iter().any(|v| v.matches_name(name)))
        });
        if clashes_simple {
            return Err(FrameError::DuplicateGroup(name.to_string()));
        }
        for (i, v) in values.iter().enumerate() {
            if values[..i].contains(v) {
                return Err(FrameError::DuplicateGroup(format!("{name}[{v}]")));
            }
        }
        match self.wide.get_mut(name) {
            None => {
                self.slots.push(ColumnSlot::Wide(name.to_string()));
                self.wide.insert(name.to_string(), values);
            }
            Some(existing) => {
                let is_last = matches!(self.slots.last(), Some(ColumnSlot::Wide(n)) if n == name);
                if !is_last {
                    return Err(FrameError::DuplicateGroup(name.to_string()));
                }
                if let Some(dup) = values.iter().find(|v| existing.contains(v)) {
                    return Err(FrameError::DuplicateGroup(format!("{name}[{dup}]")));
                }
                existing.extend(values);
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(group = name, width = self.wide.get(name).map_or(0, Vec::len), "wide group appended");
        Ok(())
    }

    /// Measure every slot against the leaf header row, read from the first
    /// data column for [`ColumnIndex::recorded_width`] cells.
    ///
    /// A wide slot takes the width of the label-plus-blanks run found where
    /// it starts; if the cell there no longer carries the group's name the
    /// recorded width is used.
    pub fn measure(&self, leaf_header: &[Option<CellValue>]) -> ColumnLayout {
        let found = wide_spans(leaf_header);
        let mut spans = Vec::with_capacity(self.slots.len());
        let mut cursor = 0u32;
        for slot in &self.slots {
            let width = match slot {
                ColumnSlot::Simple(_) => 1,
                ColumnSlot::Wide(name) => found
                    .iter()
                    .find(|s| s.start == cursor && s.label.matches_name(name))
                    .map(|s| s.width)
                    .unwrap_or_else(|| self.wide.get(name).map_or(1, |v| v.len() as u32)),
            };
            spans.push(ColumnSpan {
                offset: cursor,
                width,
            });
            cursor += width;
        }
        ColumnLayout { spans }
    }

    pub fn resolve_one(&self, layout: &ColumnLayout, column: &ColumnRef) -> FrameResult<ColumnSpan> {
        let not_found = || FrameError::ColumnNotFound(column.describe());
        let slot_span = |slot: usize| layout.spans.get(slot).copied().ok_or_else(not_found);
        match column {
            ColumnRef::Name(name) => {
                if let Some(slot) = self.wide_slot(name) {
                    return slot_span(slot);
                }
                if self.header_levels > 1 {
                    let mentioned = self.slots.iter().any(|slot| {
                        matches!(slot, ColumnSlot::Simple(l) if l.iter().any(|v| v.matches_name(name)))
                    });
                    return Err(if mentioned {
                        FrameError::AmbiguousColumn(name.clone())
                    } else {
                        not_found()
                    });
                }
                let slot = self
                    .slots
                    .iter()
                    .position(|slot| matches!(slot, ColumnSlot::Simple(l) if l[0].matches_name(name)))
                    .ok_or_else(not_found)?;
                slot_span(slot)
            }
            ColumnRef::Key(labels) => {
                let slot = self
                    .slots
                    .iter()
                    .position(|slot| matches!(slot, ColumnSlot::Simple(l) if labels_match(l, labels)))
                    .or_else(|| match labels.as_slice() {
                        [only] => self.wide_slot(&only.to_string()),
                        _ => None,
                    })
                    .ok_or_else(not_found)?;
                slot_span(slot)
            }
            ColumnRef::Wide(name) => slot_span(self.wide_slot(name).ok_or_else(not_found)?),
            ColumnRef::WideSub(name, sub) => {
                let span = slot_span(self.wide_slot(name).ok_or_else(not_found)?)?;
                let pos = self
                    .wide
                    .get(name)
                    .and_then(|values| values.iter().position(|v| v == sub))
                    .ok_or_else(not_found)? as u32;
                if pos >= span.width {
                    return Err(not_found());
                }
                Ok(ColumnSpan::single(span.offset + pos))
            }
        }
    }

    pub fn resolve_many(
        &self,
        layout: &ColumnLayout,
        columns: &[ColumnRef],
    ) -> FrameResult<Vec<ColumnSpan>> {
        columns
            .iter()
            .map(|c| self.resolve_one(layout, c))
            .collect()
    }

    fn wide_slot(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, ColumnSlot::Wide(n) if n == name))
    }

    /// Header labels at `level` for every physical column, wide padding included,
    /// as it would be written to the sheet.
    pub fn header_row(&self, level: usize) -> Vec<CellValue> {
        let mut row = Vec::new();
        for slot in &self.slots {
            match slot {
                ColumnSlot::Simple(labels) => {
                    row.push(labels.get(level).cloned().unwrap_or_default())
                }
                ColumnSlot::Wide(name) => {
                    row.push(CellValue::from(name.as_str()));
                    let extra = self.wide.get(name).map_or(0, |v| v.len().saturating_sub(1));
                    row.extend(std::iter::repeat_n(CellValue::Empty, extra));
                }
            }
        }
        row
    }
}

/// Tuple equality; a text entry in `wanted` also matches a header label with
/// the same display name (`"2020"` finds the number 2020).
fn labels_match(header: &[CellValue], wanted: &[CellValue]) -> bool {
    header.len() == wanted.len()
        && header
            .iter()
            .zip(wanted)
            .all(|(h, w)| h == w || w.as_text().is_some_and(|t| h.matches_name(t)))
}

/// Names of the row index levels. Index tuples themselves are always read
/// fresh from the sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowIndex {
    names: Vec<String>,
}

impl RowIndex {
    pub fn new(names: Vec<String>) -> Self {
        RowIndex { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn levels(&self) -> usize {
        self.names.len()
    }

    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Rows (0-based, relative to the first data row) whose index matches
    /// every `(level, value)` filter. The matching rows must form exactly one
    /// contiguous block.
    pub fn locate(&self, tuples: &[Labels], filters: &[(String, CellValue)]) -> FrameResult<Interval> {
        if filters.is_empty() {
            return Err(FrameError::InvalidSlice("empty index filter".into()));
        }
        let levels = filters
            .iter()
            .map(|(name, _)| {
                self.level_of(name)
                    .ok_or_else(|| FrameError::ColumnNotFound(name.clone()))
            })
            .collect::<FrameResult<Vec<_>>>()?;
        let projected: Vec<Labels> = tuples
            .iter()
            .map(|t| {
                levels
                    .iter()
                    .map(|&l| t.get(l).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        let wanted: Labels = filters.iter().map(|(_, v)| v.clone()).collect();
        group_runs(&projected, GroupOrder::FirstOccurrence).single_interval(&wanted)
    }
}

/// Single-level label tuple.
pub fn label(value: impl Into<CellValue>) -> Labels {
    smallvec![value.into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[Option<&str>]) -> Vec<Option<CellValue>> {
        cells.iter().map(|c| c.map(CellValue::from)).collect()
    }

    #[test]
    fn wide_spans_from_blank_runs() {
        let spans = wide_spans(&header(&[Some("u"), None, None, Some("v"), None]));
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].width), (0, 3));
        assert_eq!((spans[1].start, spans[1].width), (3, 2));
        assert!(wide_spans(&header(&[None, None])).is_empty());
    }

    #[test]
    fn resolves_wide_and_sub_columns() {
        let mut index = ColumnIndex::new(1);
        index
            .append(label("u"), Some(vec![0.into(), 1.into(), 2.into()]))
            .unwrap();
        index
            .append(label("v"), Some(vec!["x".into(), "y".into()]))
            .unwrap();
        let layout = index.measure(&header(&[Some("u"), None, None, Some("v"), None]));
        assert_eq!(
            index.resolve_one(&layout, &ColumnRef::name("u")).unwrap(),
            ColumnSpan { offset: 0, width: 3 }
        );
        assert_eq!(
            index.resolve_one(&layout, &ColumnRef::wide("v")).unwrap(),
            ColumnSpan { offset: 3, width: 2 }
        );
        assert_eq!(
            index.resolve_one(&layout, &ColumnRef::wide_sub("u", 1)).unwrap(),
            ColumnSpan::single(1)
        );
        assert_eq!(
            index.resolve_one(&layout, &ColumnRef::wide_sub("v", "y")).unwrap(),
            ColumnSpan::single(4)
        );
        assert!(matches!(
            index.resolve_one(&layout, &ColumnRef::wide_sub("v", "z")),
            Err(FrameError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn measured_width_follows_the_sheet() {
        let mut index = ColumnIndex::new(1);
        index.append(label("a"), None).unwrap();
        index
            .append(label("w"), Some(vec![1.into(), 2.into(), 3.into()]))
            .unwrap();
        index.append(label("b"), None).unwrap();
        assert_eq!(index.recorded_width(), 5);
        // someone typed a label into the third wide column
        let layout = index.measure(&header(&[Some("a"), Some("w"), None, Some("x"), Some("b")]));
        assert_eq!(layout.spans()[1], ColumnSpan { offset: 1, width: 2 });
        assert_eq!(layout.spans()[2], ColumnSpan::single(3));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut index = ColumnIndex::new(1);
        index.append(label("a"), None).unwrap();
        assert!(matches!(
            index.append(label("a"), None),
            Err(FrameError::DuplicateGroup(_))
        ));
        assert!(matches!(
            index.append(label("a"), Some(vec![1.into()])),
            Err(FrameError::DuplicateGroup(_))
        ));
        index.append(label("w"), Some(vec![1.into()])).unwrap();
        assert!(matches!(
            index.append(label("w"), None),
            Err(FrameError::DuplicateGroup(_))
        ));
        // growing the last wide group is fine
        index.append(label("w"), Some(vec![2.into()])).unwrap();
        assert_eq!(index.wide_values("w").unwrap().len(), 2);
        assert!(index.append(label("w"), Some(vec![2.into()])).is_err());
        index.append(label("b"), None).unwrap();
        assert!(index.append(label("w"), Some(vec![3.into()])).is_err());
    }

    #[test]
    fn plain_names_are_ambiguous_with_hierarchical_headers() {
        let mut index = ColumnIndex::from_labels(
            2,
            [
                smallvec!["x".into(), "a".into()],
                smallvec!["x".into(), "b".into()],
            ],
        )
        .unwrap();
        let layout = index.measure(&header(&[Some("a"), Some("b")]));
        assert!(matches!(
            index.resolve_one(&layout, &ColumnRef::name("a")),
            Err(FrameError::AmbiguousColumn(_))
        ));
        assert!(matches!(
            index.resolve_one(&layout, &ColumnRef::name("nope")),
            Err(FrameError::ColumnNotFound(_))
        ));
        assert_eq!(
            index
                .resolve_many(&layout, &[ColumnRef::key(["x", "b"]), ColumnRef::key(["x", "a"])])
                .unwrap(),
            [ColumnSpan::single(1), ColumnSpan::single(0)]
        );
        assert!(matches!(
            index.append(label("c"), None),
            Err(FrameError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn header_row_pads_wide_groups() {
        let mut index = ColumnIndex::new(1);
        index
            .append(label("w"), Some(vec![1.into(), 2.into()]))
            .unwrap();
        index.append(label("z"), None).unwrap();
        assert_eq!(
            index.header_row(0),
            [CellValue::from("w"), CellValue::Empty, CellValue::from("z")]
        );
    }

    #[test]
    fn index_lookup_needs_one_block() {
        let rows = RowIndex::new(vec!["region".into(), "year".into()]);
        let tuples: Vec<Labels> = [("n", 1), ("n", 2), ("s", 1), ("n", 3)]
            .iter()
            .map(|&(r, y)| smallvec![r.into(), y.into()])
            .collect();
        let filter = |name: &str, v: CellValue| vec![(name.to_string(), v)];

        assert_eq!(
            rows.locate(&tuples, &filter("region", "s".into())).unwrap(),
            Interval::new(2, 2)
        );
        assert!(matches!(
            rows.locate(&tuples, &filter("region", "n".into())),
            Err(FrameError::NonContiguousSelection { intervals: 2, .. })
        ));
        assert_eq!(
            rows.locate(
                &tuples,
                &[("region".into(), "n".into()), ("year".into(), 2.into())]
            )
            .unwrap(),
            Interval::new(1, 1)
        );
        assert!(matches!(
            rows.locate(&tuples, &filter("month", 1.into())),
            Err(FrameError::ColumnNotFound(_))
        ));
        assert!(matches!(
            rows.locate(&tuples, &filter("year", 9.into())),
            Err(FrameError::KeyNotFound(_))
        ));
    }
}
