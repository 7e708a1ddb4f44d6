//! A1 address codec.
//!
//! Columns use bijective base-26 (`A` = 1, `Z` = 26, `AA` = 27, no zero
//! digit). Rows and columns are 1-based throughout. `Bounds` is the
//! sheet-less `(row, column, row_end, column_end)` tuple every other layer
//! builds on; the rendering side honours independent row/column `$` anchors
//! and optional sheet/workbook qualification.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::{AddressStyle, SheetRef};
use crate::error::{FrameError, FrameResult};

/// Largest row the grid accepts (Excel limit).
pub const MAX_ROW: u32 = 1_048_576;
/// Largest column the grid accepts (`XFD`).
pub const MAX_COL: u32 = 16_384;

static A1_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$?([A-Za-z]+)\$?([0-9]+)(?::\$?([A-Za-z]+)\$?([0-9]+))?$")
        .expect("static A1 pattern")
});

static BARE_SHEET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("static sheet pattern"));

static LOOKS_LIKE_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,3}[0-9]+$").expect("static cell pattern"));

/// Convert a 1-based column index to its letter name (`1 -> "A"`, `27 -> "AA"`).
pub fn column_index_to_name(col: u32) -> FrameResult<String> {
    if col == 0 {
        return Err(FrameError::OutOfBounds { row: 1, col: 0 });
    }
    let mut n = col;
    let mut buf = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        buf.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    buf.reverse();
    Ok(buf.into_iter().map(char::from).collect())
}

/// Inverse of [`column_index_to_name`]; letters are case-insensitive.
pub fn name_to_index(name: &str) -> FrameResult<u32> {
    if name.is_empty() {
        return Err(FrameError::address(name, "empty column name"));
    }
    let mut col: u32 = 0;
    for ch in name.bytes() {
        if !ch.is_ascii_alphabetic() {
            return Err(FrameError::address(name, "column names use letters A-Z only"));
        }
        let digit = (ch.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(digit))
            .ok_or_else(|| FrameError::address(name, "column name overflows"))?;
    }
    Ok(col)
}

/// Inclusive rectangle of 1-based coordinates, always normalised so that
/// `row <= row_end` and `col <= col_end`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawBounds"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bounds {
    pub row: u32,
    pub col: u32,
    pub row_end: u32,
    pub col_end: u32,
}

/// Unchecked wire shape of [`Bounds`]; deserialization goes through
/// [`Bounds::new`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawBounds {
    row: u32,
    col: u32,
    row_end: u32,
    col_end: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<RawBounds> for Bounds {
    type Error = FrameError;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Bounds::new(raw.row, raw.col, raw.row_end, raw.col_end)
    }
}

impl Bounds {
    /// Build from any two corners; the result is the bounding rectangle.
    pub fn new(row: u32, col: u32, row_end: u32, col_end: u32) -> FrameResult<Self> {
        for (r, c) in [(row, col), (row_end, col_end)] {
            if r == 0 || c == 0 || r > MAX_ROW || c > MAX_COL {
                return Err(FrameError::OutOfBounds {
                    row: r as i64,
                    col: c as i64,
                });
            }
        }
        Ok(Self {
            row: row.min(row_end),
            col: col.min(col_end),
            row_end: row.max(row_end),
            col_end: col.max(col_end),
        })
    }

    pub fn cell(row: u32, col: u32) -> FrameResult<Self> {
        Self::new(row, col, row, col)
    }

    pub fn height(&self) -> u32 {
        self.row_end - self.row + 1
    }

    pub fn width(&self) -> u32 {
        self.col_end - self.col + 1
    }

    pub fn is_cell(&self) -> bool {
        self.row == self.row_end && self.col == self.col_end
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            row: self.row.min(other.row),
            col: self.col.min(other.col),
            row_end: self.row_end.max(other.row_end),
            col_end: self.col_end.max(other.col_end),
        }
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.row && row <= self.row_end && col >= self.col && col <= self.col_end
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.row <= other.row_end
            && other.row <= self.row_end
            && self.col <= other.col_end
            && other.col <= self.col_end
    }

    /// Shift by signed deltas, failing if the result leaves the grid.
    pub fn offset(&self, drow: i64, dcol: i64) -> FrameResult<Self> {
        let shift = |v: u32, d: i64, max: u32| -> Option<u32> {
            let moved = v as i64 + d;
            (moved >= 1 && moved <= max as i64).then_some(moved as u32)
        };
        match (
            shift(self.row, drow, MAX_ROW),
            shift(self.col, dcol, MAX_COL),
            shift(self.row_end, drow, MAX_ROW),
            shift(self.col_end, dcol, MAX_COL),
        ) {
            (Some(row), Some(col), Some(row_end), Some(col_end)) => Ok(Bounds {
                row,
                col,
                row_end,
                col_end,
            }),
            _ => Err(FrameError::OutOfBounds {
                row: self.row as i64 + drow,
                col: self.col as i64 + dcol,
            }),
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_address(self, &AddressStyle::relative(), None))
    }
}

/// Parse `C5`, `$C$5`, `C5:E9` (optionally `=`-prefixed or sheet-qualified)
/// into bounds. Any qualifier is discarded; see [`parse_qualified_address`].
pub fn parse_address(address: &str) -> FrameResult<Bounds> {
    parse_qualified_address(address).map(|(_, bounds)| bounds)
}

/// Like [`parse_address`] but also returns the sheet qualifier, if present.
pub fn parse_qualified_address(address: &str) -> FrameResult<(Option<SheetRef>, Bounds)> {
    let trimmed = address.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed);
    let (sheet, local) = split_qualifier(address, trimmed)?;
    let caps = A1_PATTERN
        .captures(local)
        .ok_or_else(|| FrameError::address(address, "expected A1 or A1:B2"))?;

    let col = name_to_index(&caps[1])?;
    let row = parse_row(address, &caps[2])?;
    let (row_end, col_end) = match (caps.get(3), caps.get(4)) {
        (Some(c), Some(r)) => (parse_row(address, r.as_str())?, name_to_index(c.as_str())?),
        _ => (row, col),
    };
    let bounds = Bounds::new(row, col, row_end, col_end)
        .map_err(|_| FrameError::address(address, "coordinates outside the grid"))?;
    Ok((sheet, bounds))
}

fn parse_row(address: &str, digits: &str) -> FrameResult<u32> {
    digits
        .parse::<u32>()
        .map_err(|_| FrameError::address(address, "row number overflows"))
}

fn split_qualifier<'a>(
    original: &str,
    address: &'a str,
) -> FrameResult<(Option<SheetRef>, &'a str)> {
    if let Some(quoted) = address.strip_prefix('\'') {
        let bytes = quoted.as_bytes();
        let mut i = 0;
        let mut name = String::new();
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    name.push('\'');
                    i += 2;
                    continue;
                }
                let rest = &quoted[i + 1..];
                let local = rest
                    .strip_prefix('!')
                    .ok_or_else(|| FrameError::address(original, "expected '!' after sheet"))?;
                return Ok((Some(sheet_from_qualifier(&name)), local));
            }
            let ch = quoted[i..].chars().next().unwrap_or_default();
            name.push(ch);
            i += ch.len_utf8().max(1);
        }
        return Err(FrameError::address(original, "unterminated sheet quote"));
    }
    match address.rsplit_once('!') {
        Some((qualifier, local)) if !qualifier.is_empty() => {
            Ok((Some(sheet_from_qualifier(qualifier)), local))
        }
        Some(_) => Err(FrameError::address(original, "empty sheet qualifier")),
        None => Ok((None, address)),
    }
}

fn sheet_from_qualifier(qualifier: &str) -> SheetRef {
    if let Some(rest) = qualifier.strip_prefix('[') {
        if let Some((book, sheet)) = rest.split_once(']') {
            return SheetRef::new(sheet).with_workbook(book);
        }
    }
    SheetRef::new(qualifier)
}

/// Render bounds as `A1` or `A1:B2` according to `style`.
///
/// The sheet qualifier is emitted only when `style.include_sheetname` is set
/// and a sheet is supplied; the workbook part additionally needs
/// `style.external` and a sheet that knows its workbook.
pub fn render_address(bounds: &Bounds, style: &AddressStyle, sheet: Option<&SheetRef>) -> String {
    let mut out = String::new();
    if style.formula {
        out.push('=');
    }
    if let Some(sheet) = sheet.filter(|_| style.include_sheetname) {
        out.push_str(&qualifier(sheet, style.external));
        out.push('!');
    }
    push_cell(&mut out, bounds.row, bounds.col, style);
    if !bounds.is_cell() {
        out.push(':');
        push_cell(&mut out, bounds.row_end, bounds.col_end, style);
    }
    out
}

fn push_cell(out: &mut String, row: u32, col: u32, style: &AddressStyle) {
    if style.column_absolute {
        out.push('$');
    }
    // Bounds guarantee col >= 1, so the letter conversion cannot fail.
    if let Ok(letters) = column_index_to_name(col) {
        out.push_str(&letters);
    }
    if style.row_absolute {
        out.push('$');
    }
    out.push_str(&row.to_string());
}

/// Sheet prefix without the trailing `!`, quoted when the name requires it.
pub fn qualifier(sheet: &SheetRef, external: bool) -> String {
    let mut raw = String::new();
    if external {
        if let Some(book) = sheet.workbook() {
            raw.push('[');
            raw.push_str(book);
            raw.push(']');
        }
    }
    raw.push_str(sheet.name());
    let bare = BARE_SHEET_NAME.is_match(sheet.name())
        && !LOOKS_LIKE_CELL.is_match(sheet.name())
        && sheet
            .workbook()
            .filter(|_| external)
            .is_none_or(|b| BARE_SHEET_NAME.is_match(b));
    if bare {
        raw
    } else {
        format!("'{}'", raw.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names() {
        assert_eq!(column_index_to_name(1).unwrap(), "A");
        assert_eq!(column_index_to_name(26).unwrap(), "Z");
        assert_eq!(column_index_to_name(27).unwrap(), "AA");
        assert_eq!(column_index_to_name(702).unwrap(), "ZZ");
        assert_eq!(column_index_to_name(703).unwrap(), "AAA");
        assert_eq!(column_index_to_name(731).unwrap(), "ABC");
        assert!(column_index_to_name(0).is_err());
    }

    #[test]
    fn column_indices_are_case_insensitive() {
        assert_eq!(name_to_index("ABC").unwrap(), 731);
        assert_eq!(name_to_index("abc").unwrap(), 731);
        assert_eq!(name_to_index("xfd").unwrap(), MAX_COL);
        assert!(name_to_index("A1").is_err());
        assert!(name_to_index("").is_err());
    }

    #[test]
    fn parse_single_and_range() {
        assert_eq!(parse_address("C5").unwrap(), Bounds::cell(5, 3).unwrap());
        assert_eq!(
            parse_address("C5:E9").unwrap(),
            Bounds::new(5, 3, 9, 5).unwrap()
        );
        assert_eq!(
            parse_address("$C$5:E$9").unwrap(),
            Bounds::new(5, 3, 9, 5).unwrap()
        );
        // reversed corners normalise
        assert_eq!(
            parse_address("E9:C5").unwrap(),
            Bounds::new(5, 3, 9, 5).unwrap()
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "5C", "C", "C0", "C5:", "C5:E", "C5-E9", "Sheet1!"] {
            assert!(
                matches!(parse_address(bad), Err(FrameError::AddressFormat { .. })),
                "{bad} should fail"
            );
        }
    }

    #[test]
    fn parse_qualified() {
        let (sheet, bounds) = parse_qualified_address("'My Data'!$A$1:B2").unwrap();
        assert_eq!(sheet, Some(SheetRef::new("My Data")));
        assert_eq!(bounds, Bounds::new(1, 1, 2, 2).unwrap());

        let (sheet, _) = parse_qualified_address("=[Book1.xlsx]Data!A1").unwrap();
        let sheet = sheet.unwrap();
        assert_eq!(sheet.name(), "Data");
        assert_eq!(sheet.workbook(), Some("Book1.xlsx"));

        let (sheet, _) = parse_qualified_address("'it''s'!A1").unwrap();
        assert_eq!(sheet.unwrap().name(), "it's");
    }

    #[test]
    fn render_flags() {
        let cell = Bounds::cell(3, 5).unwrap();
        assert_eq!(render_address(&cell, &AddressStyle::absolute(), None), "$E$3");
        assert_eq!(render_address(&cell, &AddressStyle::relative(), None), "E3");
        let mixed = AddressStyle {
            row_absolute: true,
            column_absolute: false,
            ..AddressStyle::default()
        };
        let range = Bounds::new(1, 1, 4, 2).unwrap();
        assert_eq!(render_address(&range, &mixed, None), "A$1:B$4");
        assert_eq!(
            render_address(&range, &AddressStyle::relative().as_formula(), None),
            "=A1:B4"
        );
    }

    #[test]
    fn render_qualified() {
        let sheet = SheetRef::new("Q1 Sales").with_workbook("Report.xlsx");
        let cell = Bounds::cell(2, 2).unwrap();
        let style = AddressStyle::absolute().with_sheetname();
        assert_eq!(render_address(&cell, &style, Some(&sheet)), "'Q1 Sales'!$B$2");
        assert_eq!(
            render_address(&cell, &style.with_external(), Some(&sheet)),
            "'[Report.xlsx]Q1 Sales'!$B$2"
        );
        let plain = SheetRef::new("Data");
        assert_eq!(render_address(&cell, &style, Some(&plain)), "Data!$B$2");
        // cell-like sheet names must be quoted
        assert_eq!(
            render_address(&cell, &style, Some(&SheetRef::new("AB12"))),
            "'AB12'!$B$2"
        );
        // sheet ignored unless requested
        assert_eq!(
            render_address(&cell, &AddressStyle::absolute(), Some(&plain)),
            "$B$2"
        );
    }

    #[test]
    fn offset_stays_on_grid() {
        let b = Bounds::new(2, 2, 3, 3).unwrap();
        assert_eq!(b.offset(1, -1).unwrap(), Bounds::new(3, 1, 4, 2).unwrap());
        assert!(matches!(
            b.offset(-2, 0),
            Err(FrameError::OutOfBounds { .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_rejects_off_grid_bounds() {
        let zero = r#"{"row":0,"col":0,"row_end":0,"col_end":0}"#;
        assert!(serde_json::from_str::<Bounds>(zero).is_err());
        let row_zero = r#"{"row":0,"col":2,"row_end":4,"col_end":2}"#;
        assert!(serde_json::from_str::<Bounds>(row_zero).is_err());

        let reversed = r#"{"row":5,"col":4,"row_end":2,"col_end":2}"#;
        let b: Bounds = serde_json::from_str(reversed).unwrap();
        assert_eq!(b, Bounds::new(2, 2, 5, 4).unwrap());
    }
}
