//! In-memory [`SheetHost`] used by tests and by callers that want to build a
//! layout before handing it to a real application.

use std::collections::BTreeMap;

use framesheet_common::{CellRange, CellValue, SheetRef};

use crate::error::HostError;
use crate::style::{BorderStyle, ChartId, Color, ColorScale, FontStyle};
use crate::traits::SheetHost;

#[derive(Clone, Debug, PartialEq)]
pub struct ChartRecord {
    pub id: ChartId,
    pub sheet: SheetRef,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, Default)]
struct SheetStore {
    values: BTreeMap<(u32, u32), CellValue>,
    formulas: BTreeMap<(u32, u32), String>,
    merged: Vec<CellRange>,
    autofit: Vec<CellRange>,
    number_formats: Vec<(CellRange, String)>,
    fonts: Vec<(CellRange, FontStyle)>,
    borders: Vec<(CellRange, BorderStyle)>,
    fills: Vec<(CellRange, Color)>,
    color_scales: Vec<(CellRange, ColorScale)>,
}

impl SheetStore {
    fn clear(&mut self, row: u32, col: u32) {
        self.values.remove(&(row, col));
        self.formulas.remove(&(row, col));
    }
}

/// Workbook held entirely in memory. Sheets are addressed by name; the
/// workbook part of a [`SheetRef`] is ignored.
#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    sheets: BTreeMap<String, SheetStore>,
    charts: Vec<ChartRecord>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with a single empty sheet.
    pub fn with_sheet(name: &str) -> (Self, SheetRef) {
        let mut host = Self::new();
        host.sheets.insert(name.to_string(), SheetStore::default());
        (host, SheetRef::new(name))
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<SheetRef, HostError> {
        if self.sheets.contains_key(name) {
            return Err(HostError::DuplicateSheet(name.to_string()));
        }
        self.sheets.insert(name.to_string(), SheetStore::default());
        Ok(SheetRef::new(name))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }

    fn store(&self, sheet: &SheetRef) -> Result<&SheetStore, HostError> {
        self.sheets
            .get(sheet.name())
            .ok_or_else(|| HostError::UnknownSheet(sheet.name().to_string()))
    }

    fn store_mut(&mut self, sheet: &SheetRef) -> Result<&mut SheetStore, HostError> {
        self.sheets
            .get_mut(sheet.name())
            .ok_or_else(|| HostError::UnknownSheet(sheet.name().to_string()))
    }

    /// Smallest range covering every non-empty value or formula.
    pub fn used_range(&self, sheet: &SheetRef) -> Option<CellRange> {
        let store = self.sheets.get(sheet.name())?;
        let coords = store.values.keys().chain(store.formulas.keys());
        let (mut r0, mut c0, mut r1, mut c1) = (u32::MAX, u32::MAX, 0, 0);
        for &(r, c) in coords {
            r0 = r0.min(r);
            c0 = c0.min(c);
            r1 = r1.max(r);
            c1 = c1.max(c);
        }
        if r1 == 0 {
            return None;
        }
        CellRange::new(sheet.clone(), r0, c0, r1, c1).ok()
    }

    pub fn merged_ranges(&self, sheet: &SheetRef) -> &[CellRange] {
        self.sheets
            .get(sheet.name())
            .map_or(&[], |s| s.merged.as_slice())
    }

    pub fn autofitted(&self, sheet: &SheetRef) -> &[CellRange] {
        self.sheets
            .get(sheet.name())
            .map_or(&[], |s| s.autofit.as_slice())
    }

    pub fn color_scales(&self, sheet: &SheetRef) -> &[(CellRange, ColorScale)] {
        self.sheets
            .get(sheet.name())
            .map_or(&[], |s| s.color_scales.as_slice())
    }

    /// Number format most recently applied to a range covering the cell.
    pub fn number_format_at(&self, sheet: &SheetRef, row: u32, col: u32) -> Option<&str> {
        let store = self.sheets.get(sheet.name())?;
        latest_covering(&store.number_formats, row, col).map(String::as_str)
    }

    pub fn font_at(&self, sheet: &SheetRef, row: u32, col: u32) -> Option<&FontStyle> {
        latest_covering(&self.sheets.get(sheet.name())?.fonts, row, col)
    }

    pub fn border_at(&self, sheet: &SheetRef, row: u32, col: u32) -> Option<&BorderStyle> {
        latest_covering(&self.sheets.get(sheet.name())?.borders, row, col)
    }

    pub fn fill_at(&self, sheet: &SheetRef, row: u32, col: u32) -> Option<Color> {
        latest_covering(&self.sheets.get(sheet.name())?.fills, row, col).copied()
    }

    pub fn charts(&self) -> &[ChartRecord] {
        &self.charts
    }
}

fn latest_covering<T>(entries: &[(CellRange, T)], row: u32, col: u32) -> Option<&T> {
    entries
        .iter()
        .rev()
        .find(|(range, _)| range.contains(row, col))
        .map(|(_, v)| v)
}

impl SheetHost for MemoryHost {
    type Error = HostError;

    fn cell_value(&self, sheet: &SheetRef, row: u32, col: u32) -> Result<CellValue, Self::Error> {
        Ok(self
            .store(sheet)?
            .values
            .get(&(row, col))
            .cloned()
            .unwrap_or_default())
    }

    fn set_cell_value(
        &mut self,
        sheet: &SheetRef,
        row: u32,
        col: u32,
        value: CellValue,
    ) -> Result<(), Self::Error> {
        let store = self.store_mut(sheet)?;
        store.clear(row, col);
        if !matches!(value, CellValue::Empty) {
            store.values.insert((row, col), value);
        }
        Ok(())
    }

    fn set_range_values(
        &mut self,
        range: &CellRange,
        values: &[Vec<CellValue>],
    ) -> Result<(), Self::Error> {
        let (rows, cols) = (range.height() as usize, range.width() as usize);
        let found_cols = values.iter().map(Vec::len).max().unwrap_or(0);
        if values.len() != rows || values.iter().any(|line| line.len() != cols) {
            return Err(HostError::Shape {
                rows,
                cols,
                found_rows: values.len(),
                found_cols,
            });
        }
        let store = self.store_mut(range.sheet())?;
        for (row, line) in (range.row()..).zip(values) {
            for (col, value) in (range.col()..).zip(line) {
                store.clear(row, col);
                if !matches!(value, CellValue::Empty) {
                    store.values.insert((row, col), value.clone());
                }
            }
        }
        Ok(())
    }

    fn set_formula(
        &mut self,
        sheet: &SheetRef,
        row: u32,
        col: u32,
        formula: &str,
    ) -> Result<(), Self::Error> {
        let store = self.store_mut(sheet)?;
        store.clear(row, col);
        store.formulas.insert((row, col), formula.to_string());
        Ok(())
    }

    fn formula(&self, sheet: &SheetRef, row: u32, col: u32) -> Result<Option<String>, Self::Error> {
        Ok(self.store(sheet)?.formulas.get(&(row, col)).cloned())
    }

    /// Keeps the top-left value and clears the rest of the region.
    fn merge(&mut self, range: &CellRange) -> Result<(), Self::Error> {
        let store = self.store_mut(range.sheet())?;
        if let Some(existing) = store
            .merged
            .iter()
            .find(|m| m.bounds().intersects(&range.bounds()))
        {
            return Err(HostError::MergeConflict {
                requested: range.to_string(),
                existing: existing.to_string(),
            });
        }
        for cell in range.iter().skip(1) {
            store.clear(cell.row(), cell.col());
        }
        store.merged.push(range.clone());
        #[cfg(feature = "tracing")]
        tracing::debug!(range = %range, "merged");
        Ok(())
    }

    fn autofit(&mut self, range: &CellRange) -> Result<(), Self::Error> {
        self.store_mut(range.sheet())?.autofit.push(range.clone());
        Ok(())
    }

    fn set_number_format(&mut self, range: &CellRange, format: &str) -> Result<(), Self::Error> {
        self.store_mut(range.sheet())?
            .number_formats
            .push((range.clone(), format.to_string()));
        Ok(())
    }

    fn set_font(&mut self, range: &CellRange, font: &FontStyle) -> Result<(), Self::Error> {
        self.store_mut(range.sheet())?
            .fonts
            .push((range.clone(), font.clone()));
        Ok(())
    }

    fn set_border(&mut self, range: &CellRange, border: &BorderStyle) -> Result<(), Self::Error> {
        self.store_mut(range.sheet())?
            .borders
            .push((range.clone(), *border));
        Ok(())
    }

    fn set_fill(&mut self, range: &CellRange, color: Color) -> Result<(), Self::Error> {
        self.store_mut(range.sheet())?
            .fills
            .push((range.clone(), color));
        Ok(())
    }

    fn apply_color_scale(
        &mut self,
        range: &CellRange,
        scale: &ColorScale,
    ) -> Result<(), Self::Error> {
        self.store_mut(range.sheet())?
            .color_scales
            .push((range.clone(), *scale));
        Ok(())
    }

    fn create_chart(
        &mut self,
        sheet: &SheetRef,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> Result<ChartId, Self::Error> {
        self.store(sheet)?;
        let id = ChartId(self.charts.len() as u32 + 1);
        self.charts.push(ChartRecord {
            id,
            sheet: sheet.clone(),
            left,
            top,
            width,
            height,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_and_formulas_replace_each_other() {
        let (mut host, sheet) = MemoryHost::with_sheet("S");
        host.set_cell_value(&sheet, 1, 1, 5.0.into()).unwrap();
        host.set_formula(&sheet, 1, 1, "=A2*2").unwrap();
        assert_eq!(host.cell_value(&sheet, 1, 1).unwrap(), CellValue::Empty);
        assert_eq!(host.formula(&sheet, 1, 1).unwrap().as_deref(), Some("=A2*2"));

        host.set_cell_value(&sheet, 1, 1, "x".into()).unwrap();
        assert_eq!(host.formula(&sheet, 1, 1).unwrap(), None);
        assert_eq!(host.cell_value(&sheet, 1, 1).unwrap(), CellValue::from("x"));
    }

    #[test]
    fn unknown_sheet_is_an_error() {
        let mut host = MemoryHost::new();
        let ghost = SheetRef::new("Ghost");
        assert!(matches!(
            host.cell_value(&ghost, 1, 1),
            Err(HostError::UnknownSheet(name)) if name == "Ghost"
        ));
        host.add_sheet("Ghost").unwrap();
        assert!(matches!(
            host.add_sheet("Ghost"),
            Err(HostError::DuplicateSheet(_))
        ));
        assert_eq!(host.sheet_names(), ["Ghost"]);
    }

    #[test]
    fn merge_keeps_top_left_and_rejects_overlap() {
        let (mut host, sheet) = MemoryHost::with_sheet("S");
        let block = CellRange::new(sheet.clone(), 1, 1, 1, 3).unwrap();
        host.set_range_values(&block, &[vec!["a".into(), "b".into(), "c".into()]])
            .unwrap();
        host.merge(&block).unwrap();
        let row = host.range_values(&block).unwrap();
        assert_eq!(row, vec![vec!["a".into(), CellValue::Empty, CellValue::Empty]]);

        let overlapping = CellRange::new(sheet.clone(), 1, 3, 2, 4).unwrap();
        assert!(matches!(
            host.merge(&overlapping),
            Err(HostError::MergeConflict { .. })
        ));
        assert_eq!(host.merged_ranges(&sheet), [block]);
    }

    #[test]
    fn range_writes_check_shape() {
        let (mut host, sheet) = MemoryHost::with_sheet("S");
        let block = CellRange::new(sheet.clone(), 2, 2, 3, 3).unwrap();
        let err = host
            .set_range_values(&block, &[vec![1.0.into(), 2.0.into()]])
            .unwrap_err();
        assert!(matches!(err, HostError::Shape { rows: 2, found_rows: 1, .. }));
        host.set_range_values(
            &block,
            &[vec![1.0.into(), 2.0.into()], vec![3.0.into(), 4.0.into()]],
        )
        .unwrap();
        assert_eq!(host.used_range(&sheet), Some(block));
    }

    #[test]
    fn latest_style_wins() {
        let (mut host, sheet) = MemoryHost::with_sheet("S");
        let wide = CellRange::new(sheet.clone(), 1, 1, 5, 5).unwrap();
        let cell = CellRange::cell(sheet.clone(), 2, 2).unwrap();
        host.set_number_format(&wide, "0.00").unwrap();
        host.set_number_format(&cell, "0%").unwrap();
        assert_eq!(host.number_format_at(&sheet, 2, 2), Some("0%"));
        assert_eq!(host.number_format_at(&sheet, 3, 3), Some("0.00"));
        assert_eq!(host.number_format_at(&sheet, 9, 9), None);

        host.set_fill(&cell, Color::YELLOW).unwrap();
        assert_eq!(host.fill_at(&sheet, 2, 2), Some(Color::YELLOW));
        host.set_font(&wide, &FontStyle::bold()).unwrap();
        assert!(host.font_at(&sheet, 5, 5).is_some_and(|f| f.bold));
    }

    #[test]
    fn charts_get_sequential_ids() {
        let (mut host, sheet) = MemoryHost::with_sheet("S");
        let a = host.create_chart(&sheet, 0.0, 0.0, 300.0, 200.0).unwrap();
        let b = host.create_chart(&sheet, 10.0, 0.0, 300.0, 200.0).unwrap();
        assert_eq!((a, b), (ChartId(1), ChartId(2)));
        assert_eq!(host.charts()[1].left, 10.0);
        assert!(host
            .create_chart(&SheetRef::new("nope"), 0.0, 0.0, 1.0, 1.0)
            .is_err());
    }
}
