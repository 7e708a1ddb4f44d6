use crate::address::{AddressStyle, SheetRef};
use crate::coord::{parse_qualified_address, render_address, Bounds};
use crate::error::{FrameError, FrameResult};

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rectangular cell region anchored to one sheet.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    sheet: SheetRef,
    bounds: Bounds,
}

/// One corner specifier accepted by [`CellRange::between`].
#[derive(Clone, Debug)]
pub enum Corner {
    Coord(u32, u32),
    Address(String),
    Range(CellRange),
}

impl From<(u32, u32)> for Corner {
    fn from((row, col): (u32, u32)) -> Self {
        Corner::Coord(row, col)
    }
}

impl From<&str> for Corner {
    fn from(value: &str) -> Self {
        Corner::Address(value.to_string())
    }
}

impl From<CellRange> for Corner {
    fn from(value: CellRange) -> Self {
        Corner::Range(value)
    }
}

impl From<&CellRange> for Corner {
    fn from(value: &CellRange) -> Self {
        Corner::Range(value.clone())
    }
}

impl CellRange {
    pub fn new(
        sheet: SheetRef,
        row: u32,
        col: u32,
        row_end: u32,
        col_end: u32,
    ) -> FrameResult<Self> {
        Ok(Self {
            sheet,
            bounds: Bounds::new(row, col, row_end, col_end)?,
        })
    }

    pub fn cell(sheet: SheetRef, row: u32, col: u32) -> FrameResult<Self> {
        Self::new(sheet, row, col, row, col)
    }

    pub fn from_bounds(sheet: SheetRef, bounds: Bounds) -> Self {
        Self { sheet, bounds }
    }

    /// Parse an address; a qualifier inside the string overrides `sheet`.
    pub fn parse(sheet: &SheetRef, address: &str) -> FrameResult<Self> {
        let (qualifier, bounds) = parse_qualified_address(address)?;
        Ok(Self {
            sheet: resolve_sheet(sheet, qualifier),
            bounds,
        })
    }

    /// Minimal bounding rectangle of two corner specifiers.
    ///
    /// Plain coordinates and unqualified addresses live on `sheet`; qualified
    /// addresses and existing ranges bring their own sheet. Corners landing on
    /// different sheets fail with [`FrameError::CrossSheet`].
    pub fn between(
        sheet: &SheetRef,
        first: impl Into<Corner>,
        second: impl Into<Corner>,
    ) -> FrameResult<Self> {
        let (sheet_a, a) = resolve_corner(sheet, first.into())?;
        let (sheet_b, b) = resolve_corner(sheet, second.into())?;
        if sheet_a != sheet_b {
            return Err(FrameError::CrossSheet {
                first: sheet_a.to_string(),
                second: sheet_b.to_string(),
            });
        }
        Ok(Self {
            sheet: sheet_a,
            bounds: a.union(&b),
        })
    }

    pub fn sheet(&self) -> &SheetRef {
        &self.sheet
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn row(&self) -> u32 {
        self.bounds.row
    }

    pub fn col(&self) -> u32 {
        self.bounds.col
    }

    pub fn row_end(&self) -> u32 {
        self.bounds.row_end
    }

    pub fn col_end(&self) -> u32 {
        self.bounds.col_end
    }

    pub fn height(&self) -> u32 {
        self.bounds.height()
    }

    pub fn width(&self) -> u32 {
        self.bounds.width()
    }

    pub fn is_cell(&self) -> bool {
        self.bounds.is_cell()
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.bounds.contains(row, col)
    }

    pub fn address(&self, style: &AddressStyle) -> String {
        render_address(&self.bounds, style, Some(&self.sheet))
    }

    pub fn offset(&self, drow: i64, dcol: i64) -> FrameResult<Self> {
        Ok(Self {
            sheet: self.sheet.clone(),
            bounds: self.bounds.offset(drow, dcol)?,
        })
    }

    /// Same top-left corner, new size.
    pub fn resize(&self, rows: u32, cols: u32) -> FrameResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(FrameError::OutOfBounds {
                row: rows as i64,
                col: cols as i64,
            });
        }
        Self::new(
            self.sheet.clone(),
            self.row(),
            self.col(),
            self.row() + rows - 1,
            self.col() + cols - 1,
        )
    }

    pub fn first_cell(&self) -> CellRange {
        Self {
            sheet: self.sheet.clone(),
            bounds: Bounds {
                row: self.row(),
                col: self.col(),
                row_end: self.row(),
                col_end: self.col(),
            },
        }
    }

    /// `index`-th row (0-based) of this range, as a one-row range.
    pub fn row_at(&self, index: u32) -> FrameResult<Self> {
        if index >= self.height() {
            return Err(FrameError::OutOfBounds {
                row: (self.row() + index) as i64,
                col: self.col() as i64,
            });
        }
        let row = self.row() + index;
        Self::new(self.sheet.clone(), row, self.col(), row, self.col_end())
    }

    /// `index`-th column (0-based) of this range, as a one-column range.
    pub fn column_at(&self, index: u32) -> FrameResult<Self> {
        if index >= self.width() {
            return Err(FrameError::OutOfBounds {
                row: self.row() as i64,
                col: (self.col() + index) as i64,
            });
        }
        let col = self.col() + index;
        Self::new(self.sheet.clone(), self.row(), col, self.row_end(), col)
    }

    /// Unit cells in row-major order. Calling `iter` again restarts.
    pub fn iter(&self) -> Cells<'_> {
        Cells {
            range: self,
            next: Some((self.row(), self.col())),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address(&AddressStyle::absolute().with_sheetname()))
    }
}

impl<'a> IntoIterator for &'a CellRange {
    type Item = CellRange;
    type IntoIter = Cells<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy row-major walk over the unit cells of a [`CellRange`].
#[derive(Clone, Debug)]
pub struct Cells<'a> {
    range: &'a CellRange,
    next: Option<(u32, u32)>,
}

impl Iterator for Cells<'_> {
    type Item = CellRange;

    fn next(&mut self) -> Option<Self::Item> {
        let (row, col) = self.next?;
        let b = self.range.bounds;
        self.next = if col < b.col_end {
            Some((row, col + 1))
        } else if row < b.row_end {
            Some((row + 1, b.col))
        } else {
            None
        };
        Some(CellRange {
            sheet: self.range.sheet.clone(),
            bounds: Bounds {
                row,
                col,
                row_end: row,
                col_end: col,
            },
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let Some((row, col)) = self.next else {
            return (0, Some(0));
        };
        let b = self.range.bounds;
        let width = b.width() as usize;
        let rows_after = (b.row_end - row) as usize;
        let left = rows_after * width + (b.col_end - col + 1) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Cells<'_> {}

fn resolve_sheet(default: &SheetRef, qualifier: Option<SheetRef>) -> SheetRef {
    match qualifier {
        Some(q) if !default.accepts(&q) => q,
        _ => default.clone(),
    }
}

fn resolve_corner(default: &SheetRef, corner: Corner) -> FrameResult<(SheetRef, Bounds)> {
    match corner {
        Corner::Coord(row, col) => Ok((default.clone(), Bounds::cell(row, col)?)),
        Corner::Address(address) => {
            let (qualifier, bounds) = parse_qualified_address(&address)?;
            Ok((resolve_sheet(default, qualifier), bounds))
        }
        Corner::Range(range) => Ok((range.sheet, range.bounds)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SheetRef {
        SheetRef::new("Sheet1")
    }

    #[test]
    fn between_normalises_any_corner_kinds() {
        let a = CellRange::between(&sheet(), (5u32, 4u32), "B2").unwrap();
        assert_eq!(a.bounds(), Bounds::new(2, 2, 5, 4).unwrap());

        let existing = CellRange::new(sheet(), 10, 1, 12, 1).unwrap();
        let b = CellRange::between(&sheet(), &existing, "C3:D4").unwrap();
        assert_eq!(b.bounds(), Bounds::new(3, 1, 12, 4).unwrap());
        assert_eq!(b.address(&AddressStyle::relative()), "A3:D12");
    }

    #[test]
    fn between_rejects_two_sheets() {
        let other = CellRange::cell(SheetRef::new("Other"), 1, 1).unwrap();
        let err = CellRange::between(&sheet(), (1u32, 1u32), other).unwrap_err();
        assert!(matches!(err, FrameError::CrossSheet { .. }));

        let err = CellRange::between(&sheet(), "Other!A1", "B2").unwrap_err();
        assert!(matches!(err, FrameError::CrossSheet { .. }));

        // a qualifier naming the default sheet is not a second sheet
        let same = CellRange::between(&sheet(), "Sheet1!A1", (2u32, 2u32)).unwrap();
        assert_eq!(same.sheet(), &sheet());
    }

    #[test]
    fn iteration_is_row_major_and_restartable() {
        let range = CellRange::new(sheet(), 1, 1, 2, 3).unwrap();
        let cells: Vec<String> = range
            .iter()
            .map(|c| c.address(&AddressStyle::relative()))
            .collect();
        assert_eq!(cells, ["A1", "B1", "C1", "A2", "B2", "C2"]);
        assert_eq!(range.iter().len(), 6);
        assert_eq!((&range).into_iter().count(), 6);
    }

    #[test]
    fn offsets_and_slices() {
        let range = CellRange::new(sheet(), 2, 2, 4, 3).unwrap();
        assert_eq!(
            range.offset(1, 1).unwrap().address(&AddressStyle::relative()),
            "C3:D5"
        );
        assert_eq!(
            range.row_at(2).unwrap().address(&AddressStyle::relative()),
            "B4:C4"
        );
        assert_eq!(
            range.column_at(1).unwrap().address(&AddressStyle::relative()),
            "C2:C4"
        );
        assert!(range.row_at(3).is_err());
        assert_eq!(
            range.resize(1, 1).unwrap(),
            range.first_cell()
        );
    }

    #[test]
    fn display_is_sheet_qualified() {
        let range = CellRange::new(SheetRef::new("Q 1"), 1, 1, 2, 2).unwrap();
        assert_eq!(range.to_string(), "'Q 1'!$A$1:$B$2");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_rejects_row_zero_range() {
        let json = r#"{"sheet":{"name":"Sheet1","workbook":null},"bounds":{"row":0,"col":1,"row_end":3,"col_end":1}}"#;
        assert!(serde_json::from_str::<CellRange>(json).is_err());

        let ok = r#"{"sheet":{"name":"Sheet1","workbook":null},"bounds":{"row":1,"col":1,"row_end":3,"col_end":1}}"#;
        let range: CellRange = serde_json::from_str(ok).unwrap();
        assert_eq!(range.address(&AddressStyle::relative()), "A1:A3");
    }
}
