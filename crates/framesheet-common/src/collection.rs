//! Discontinuous selections.
//!
//! A [`RangeCollection`] is an ordered union of rectangles on one sheet. Member
//! order is construction order and is what `address` renders; nothing is
//! sorted or merged here.

use crate::address::{AddressStyle, SheetRef};
use crate::coord::Bounds;
use crate::error::{FrameError, FrameResult};
use crate::range::CellRange;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One entry on the list side of a row/column selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    At(u32),
    /// Inclusive `(start, end)`; reversed pairs are normalised.
    Span(u32, u32),
}

impl Line {
    fn bounds(self) -> (u32, u32) {
        match self {
            Line::At(n) => (n, n),
            Line::Span(a, b) => (a.min(b), a.max(b)),
        }
    }
}

impl From<u32> for Line {
    fn from(value: u32) -> Self {
        Line::At(value)
    }
}

impl From<(u32, u32)> for Line {
    fn from((start, end): (u32, u32)) -> Self {
        Line::Span(start, end)
    }
}

/// Row or column side of a selection: a single index or a list of lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lines {
    One(u32),
    Many(Vec<Line>),
}

impl From<u32> for Lines {
    fn from(value: u32) -> Self {
        Lines::One(value)
    }
}

impl From<Vec<Line>> for Lines {
    fn from(value: Vec<Line>) -> Self {
        Lines::Many(value)
    }
}

impl From<&[Line]> for Lines {
    fn from(value: &[Line]) -> Self {
        Lines::Many(value.to_vec())
    }
}

/// Non-empty, single-sheet, ordered union of rectangular regions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawCollection"))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RangeCollection {
    members: Vec<CellRange>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawCollection {
    members: Vec<CellRange>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCollection> for RangeCollection {
    type Error = FrameError;

    fn try_from(raw: RawCollection) -> Result<Self, Self::Error> {
        RangeCollection::new(raw.members)
    }
}

impl RangeCollection {
    pub fn new(members: Vec<CellRange>) -> FrameResult<Self> {
        let first = members.first().ok_or(FrameError::EmptySelection)?;
        if let Some(stray) = members.iter().find(|m| m.sheet() != first.sheet()) {
            return Err(FrameError::CrossSheet {
                first: first.sheet().to_string(),
                second: stray.sheet().to_string(),
            });
        }
        Ok(Self { members })
    }

    pub fn single(range: CellRange) -> Self {
        Self {
            members: vec![range],
        }
    }

    /// Rows on the list side at a fixed column.
    pub fn from_rows(sheet: &SheetRef, rows: impl Into<Lines>, column: u32) -> FrameResult<Self> {
        Self::from_lines(sheet, rows.into(), Lines::One(column))
    }

    /// Columns on the list side at a fixed row.
    pub fn from_columns(
        sheet: &SheetRef,
        row: u32,
        columns: impl Into<Lines>,
    ) -> FrameResult<Self> {
        Self::from_lines(sheet, Lines::One(row), columns.into())
    }

    /// General form; at most one side may be [`Lines::Many`].
    pub fn from_lines(sheet: &SheetRef, rows: Lines, columns: Lines) -> FrameResult<Self> {
        let members = match (rows, columns) {
            (Lines::Many(_), Lines::Many(_)) => return Err(FrameError::MixedSelection),
            (Lines::One(row), Lines::One(col)) => vec![CellRange::cell(sheet.clone(), row, col)?],
            (Lines::Many(rows), Lines::One(col)) => rows
                .into_iter()
                .map(|line| {
                    let (start, end) = line.bounds();
                    CellRange::new(sheet.clone(), start, col, end, col)
                })
                .collect::<FrameResult<Vec<_>>>()?,
            (Lines::One(row), Lines::Many(cols)) => cols
                .into_iter()
                .map(|line| {
                    let (start, end) = line.bounds();
                    CellRange::new(sheet.clone(), row, start, row, end)
                })
                .collect::<FrameResult<Vec<_>>>()?,
        };
        Self::new(members)
    }

    /// Parse a comma-separated list such as `A1:A3,A7:A9`.
    pub fn parse(sheet: &SheetRef, addresses: &str) -> FrameResult<Self> {
        let members = addresses
            .split(',')
            .map(|part| CellRange::parse(sheet, part))
            .collect::<FrameResult<Vec<_>>>()?;
        Self::new(members)
    }

    pub fn sheet(&self) -> &SheetRef {
        self.members[0].sheet()
    }

    pub fn members(&self) -> &[CellRange] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with other collections.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member addresses joined with commas, in member order.
    pub fn address(&self, style: &AddressStyle) -> String {
        let mut out = String::new();
        if style.formula {
            out.push('=');
        }
        let member_style = style.without_formula();
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&member.address(&member_style));
        }
        out
    }

    pub fn first_cell(&self) -> CellRange {
        self.members[0].first_cell()
    }

    /// Smallest rectangle enclosing every member.
    pub fn envelope(&self) -> CellRange {
        let bounds = self
            .members
            .iter()
            .skip(1)
            .fold(self.members[0].bounds(), |acc: Bounds, m| acc.union(&m.bounds()));
        CellRange::from_bounds(self.sheet().clone(), bounds)
    }

    /// Every unit cell, member by member.
    pub fn cells(&self) -> impl Iterator<Item = CellRange> + '_ {
        self.members.iter().flat_map(|m| m.iter())
    }

    pub fn push(&mut self, range: CellRange) -> FrameResult<()> {
        if range.sheet() != self.sheet() {
            return Err(FrameError::CrossSheet {
                first: self.sheet().to_string(),
                second: range.sheet().to_string(),
            });
        }
        self.members.push(range);
        Ok(())
    }
}

impl From<CellRange> for RangeCollection {
    fn from(value: CellRange) -> Self {
        RangeCollection::single(value)
    }
}

impl<'a> IntoIterator for &'a RangeCollection {
    type Item = &'a CellRange;
    type IntoIter = std::slice::Iter<'a, CellRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
