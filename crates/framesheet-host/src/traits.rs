use framesheet_common::{AddressStyle, CellRange, CellValue, FrameResult, RangeCollection, SheetRef};

use crate::style::{BorderStyle, ChartId, Color, ColorScale, FontStyle};

/// Narrow view of a spreadsheet application's object model.
///
/// Every call is synchronous and goes straight to the live document; callers
/// must serialise access to one host instance themselves. Only the cell
/// accessors and the styling calls that have no sensible fallback are
/// required. Range reads and writes default to cell-by-cell loops.
pub trait SheetHost {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Current value of one cell. Cells holding a formula report the host's
    /// last computed value, which for a host without a calculation engine is
    /// [`CellValue::Empty`].
    fn cell_value(&self, sheet: &SheetRef, row: u32, col: u32) -> Result<CellValue, Self::Error>;

    fn set_cell_value(
        &mut self,
        sheet: &SheetRef,
        row: u32,
        col: u32,
        value: CellValue,
    ) -> Result<(), Self::Error>;

    /// Values of `range` as rows of columns.
    fn range_values(&self, range: &CellRange) -> Result<Vec<Vec<CellValue>>, Self::Error> {
        (range.row()..=range.row_end())
            .map(|row| {
                (range.col()..=range.col_end())
                    .map(|col| self.cell_value(range.sheet(), row, col))
                    .collect()
            })
            .collect()
    }

    /// Write a block of values starting at the top-left corner of `range`.
    /// Rows or columns of `values` beyond the range are ignored.
    fn set_range_values(
        &mut self,
        range: &CellRange,
        values: &[Vec<CellValue>],
    ) -> Result<(), Self::Error> {
        for (row, line) in (range.row()..=range.row_end()).zip(values) {
            for (col, value) in (range.col()..=range.col_end()).zip(line) {
                self.set_cell_value(range.sheet(), row, col, value.clone())?;
            }
        }
        Ok(())
    }

    /// Store a formula (with its leading `=`) in one cell.
    fn set_formula(
        &mut self,
        sheet: &SheetRef,
        row: u32,
        col: u32,
        formula: &str,
    ) -> Result<(), Self::Error>;

    fn formula(&self, sheet: &SheetRef, row: u32, col: u32) -> Result<Option<String>, Self::Error>;

    /// Address of `range` as the host would print it.
    fn address(&self, range: &CellRange, style: &AddressStyle) -> String {
        range.address(style)
    }

    /// Discontinuous union of regions on one sheet.
    fn union(&self, ranges: &[CellRange]) -> FrameResult<RangeCollection> {
        RangeCollection::new(ranges.to_vec())
    }

    fn merge(&mut self, range: &CellRange) -> Result<(), Self::Error>;

    fn autofit(&mut self, _range: &CellRange) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_number_format(&mut self, range: &CellRange, format: &str) -> Result<(), Self::Error>;

    fn set_font(&mut self, range: &CellRange, font: &FontStyle) -> Result<(), Self::Error>;

    fn set_border(&mut self, range: &CellRange, border: &BorderStyle) -> Result<(), Self::Error>;

    fn set_fill(&mut self, range: &CellRange, color: Color) -> Result<(), Self::Error>;

    fn apply_color_scale(
        &mut self,
        _range: &CellRange,
        _scale: &ColorScale,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Create an empty chart object at the given position (points).
    fn create_chart(
        &mut self,
        sheet: &SheetRef,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> Result<ChartId, Self::Error>;
}
