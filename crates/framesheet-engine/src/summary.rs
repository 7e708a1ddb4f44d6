//! Grouped summary tables built from aggregate formulas.

use framesheet_common::{CellValue, FrameError, FrameResult, Labels};
use framesheet_host::SheetHost;
use smallvec::smallvec;

use crate::formula::{AggFunc, Selection};
use crate::frame::{Anchor, Frame, Slice};
use crate::grouping::GroupOrder;
use crate::index::ColumnRef;
use crate::table::DataFrame;

impl Frame {
    /// Write one row per group of `by` at `at`. Each cell of the summary is a
    /// formula aggregating `func` over that group's rows of one of
    /// `columns`, so the summary stays live when the source changes.
    pub fn write_summary<H: SheetHost>(
        &self,
        host: &mut H,
        by: &[ColumnRef],
        columns: &[ColumnRef],
        func: &AggFunc,
        at: Anchor,
    ) -> FrameResult<Frame> {
        if columns.is_empty() {
            return Err(FrameError::EmptySelection);
        }
        let groups = self.group_by(host, by, GroupOrder::FirstOccurrence)?;
        if groups.is_empty() {
            return Err(FrameError::EmptyFrame);
        }

        let mut index_names = Vec::with_capacity(by.len());
        for column in by {
            let width = self.range_for(host, column, &Slice::Header)?.width();
            if width == 1 {
                index_names.push(column.describe());
            } else {
                index_names.extend((0..width).map(|j| format!("{}[{j}]", column.describe())));
            }
        }
        let labels: Vec<Labels> = columns
            .iter()
            .map(|c| smallvec![CellValue::from(c.describe())])
            .collect();
        let keys: Vec<Labels> = groups.keys().cloned().collect();
        let blank = vec![vec![CellValue::Empty; columns.len()]; keys.len()];
        let df = DataFrame::new(index_names, keys, vec![func.label()], labels, blank)?;

        let sheet = at.sheet.clone();
        let summary = Frame::write(host, at, &df, self.config().clone())?;
        let builder = self.config().formula_builder().writing_to(sheet.clone());
        let (top, left) = (summary.data_start_row(), summary.data_start_col());
        for (row, group) in (top..).zip(groups.iter()) {
            let collections = self.collections_for(host, &groups, &group.key, columns)?;
            for (col, collection) in (left..).zip(collections) {
                let formula = builder.formula(func, &[Selection::from(collection)])?;
                host.set_formula(&sheet, row, col, &formula)
                    .map_err(FrameError::host)?;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            groups = groups.len(),
            columns = columns.len(),
            func = %func,
            "summary written"
        );
        Ok(summary)
    }
}
