//! Projection of a logical table onto a sheet region.
//!
//! A [`Frame`] owns its anchor and its logical index. Everything else (the
//! number of data rows, the width of wide groups, index tuples) is read back
//! from the host on every call, so edits made to the sheet between calls are
//! always seen.
//!
//! Layout, with `H` header levels and `I` index levels:
//!
//! ```text
//!            anchor.col         anchor.col + I
//! anchor.row [level names]      [header level 0 ...]
//!            ...                ...
//!            [index names]      [header level H-1 ...]
//! data row   [index values]     [values ...]
//! ```
//!
//! When `H > 1` and `I == 1` the frame is transposed: the single index column
//! carries the column level names (one per header row) and the index name
//! moves to an extra row below the header, so data starts at
//! `anchor.row + H + 1`.

use framesheet_common::{
    AddressStyle, CellRange, CellValue, FrameError, FrameResult, Labels, MAX_COL, MAX_ROW,
    RangeCollection, SheetRef, column_index_to_name, format_labels,
};
use framesheet_host::SheetHost;
use smallvec::smallvec;

use crate::config::FrameConfig;
use crate::grouping::{GroupIndex, GroupOrder, group_runs};
use crate::index::{ColumnIndex, ColumnLayout, ColumnRef, ColumnSlot, RowIndex, wide_spans};
use crate::table::DataFrame;
use crate::template::Template;

/// Top-left cell of a frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub sheet: SheetRef,
    pub row: u32,
    pub col: u32,
}

impl Anchor {
    pub fn new(sheet: SheetRef, row: u32, col: u32) -> FrameResult<Self> {
        let cell = CellRange::cell(sheet, row, col)?;
        Ok(Anchor {
            row: cell.row(),
            col: cell.col(),
            sheet: cell.sheet().clone(),
        })
    }

    /// Anchor at the top-left cell of `address`.
    pub fn parse(sheet: &SheetRef, address: &str) -> FrameResult<Self> {
        let range = CellRange::parse(sheet, address)?;
        Ok(Anchor {
            row: range.row(),
            col: range.col(),
            sheet: range.sheet().clone(),
        })
    }
}

/// Which rows of a column to address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slice {
    Header,
    FirstDataRow,
    /// Data rows only.
    AllData,
    /// Header and data rows.
    Full,
    /// One absolute sheet row.
    Row(u32),
    /// Absolute sheet rows, inclusive.
    Rows(u32, u32),
    /// Rows whose index matches every `(level name, value)` pair. They must
    /// form one contiguous block.
    Where(Vec<(String, CellValue)>),
}

/// What a column reference landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Index(u32),
    /// A column level name in the side panel of a transposed frame.
    HeaderLevel(u32),
    Data { offset: u32, width: u32 },
}

#[derive(Clone, Debug)]
pub struct Frame {
    anchor: Anchor,
    rows: RowIndex,
    level_names: Vec<String>,
    columns: ColumnIndex,
    config: FrameConfig,
}

fn name_cell(name: &str) -> CellValue {
    if name.is_empty() {
        CellValue::Empty
    } else {
        CellValue::from(name)
    }
}

/// A cell counts as occupied when it holds a value or a formula.
fn occupied<H: SheetHost>(host: &H, sheet: &SheetRef, row: u32, col: u32) -> FrameResult<bool> {
    if !host
        .cell_value(sheet, row, col)
        .map_err(FrameError::host)?
        .is_blank()
    {
        return Ok(true);
    }
    Ok(host
        .formula(sheet, row, col)
        .map_err(FrameError::host)?
        .is_some())
}

/// Fill blank labels from the previous position when the labels above them
/// (the prefix) are unchanged. Restores values cleared by merged cells.
/// `lines[p][k]` is the label of position `p` at level `k`.
fn fill_down(lines: Vec<Vec<CellValue>>) -> Vec<Labels> {
    let mut filled: Vec<Labels> = Vec::with_capacity(lines.len());
    for line in lines {
        let mut key = Labels::with_capacity(line.len());
        for (level, value) in line.into_iter().enumerate() {
            let inherited = match filled.last() {
                Some(prev) if value.is_blank() && prev[..level] == key[..level] => {
                    prev.get(level).cloned()
                }
                _ => None,
            };
            key.push(inherited.unwrap_or(value));
        }
        filled.push(key);
    }
    filled
}

/// Rows of `block` become positions; used to read header rows column-wise.
fn transpose(block: Vec<Vec<CellValue>>, width: usize) -> Vec<Vec<CellValue>> {
    (0..width)
        .map(|c| {
            block
                .iter()
                .map(|row| row.get(c).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

impl Frame {
    fn assemble(
        anchor: Anchor,
        rows: RowIndex,
        level_names: Vec<String>,
        columns: ColumnIndex,
        config: FrameConfig,
    ) -> Self {
        let mut level_names = level_names;
        level_names.resize(columns.header_levels(), String::new());
        Frame {
            anchor,
            rows,
            level_names,
            columns,
            config,
        }
    }

    /// Write `df` with its top-left corner at `anchor`.
    pub fn write<H: SheetHost>(
        host: &mut H,
        anchor: Anchor,
        df: &DataFrame,
        config: FrameConfig,
    ) -> FrameResult<Frame> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "frame_write",
            sheet = %anchor.sheet,
            row = anchor.row,
            col = anchor.col,
            rows = df.height(),
            cols = df.width()
        )
        .entered();

        let columns = ColumnIndex::from_labels(df.header_levels(), df.columns().iter().cloned())?;
        let frame = Frame::assemble(
            anchor,
            RowIndex::new(df.index_names().to_vec()),
            df.column_names().to_vec(),
            columns,
            config,
        );
        let sheet = frame.sheet().clone();
        let (h, i) = (frame.header_levels(), frame.index_levels());
        let (top, left) = (frame.anchor.row, frame.anchor.col);
        let (dsr, dsc) = (frame.data_start_row(), frame.data_start_col());
        let (height, width) = (df.height() as u32, df.width() as u32);

        if width > 0 {
            let labels: Vec<Vec<CellValue>> =
                (0..h as usize).map(|k| frame.columns.header_row(k)).collect();
            let block = CellRange::new(sheet.clone(), top, dsc, top + h - 1, dsc + width - 1)?;
            host.set_range_values(&block, &labels)
                .map_err(FrameError::host)?;
        }

        if frame.is_transposed() {
            for (k, name) in frame.level_names.iter().enumerate() {
                host.set_cell_value(&sheet, top + k as u32, left, name_cell(name))
                    .map_err(FrameError::host)?;
            }
        } else if i > 0 && h > 1 {
            for (k, name) in frame.level_names[..h as usize - 1].iter().enumerate() {
                host.set_cell_value(&sheet, top + k as u32, left + i - 1, name_cell(name))
                    .map_err(FrameError::host)?;
            }
        }
        for (level, name) in df.index_names().iter().enumerate() {
            host.set_cell_value(&sheet, frame.index_name_row(), left + level as u32, name_cell(name))
                .map_err(FrameError::host)?;
        }

        if height > 0 && i > 0 {
            let tuples: Vec<Vec<CellValue>> = df.index().iter().map(|t| t.to_vec()).collect();
            let block = CellRange::new(sheet.clone(), dsr, left, dsr + height - 1, left + i - 1)?;
            host.set_range_values(&block, &tuples)
                .map_err(FrameError::host)?;
        }
        if height > 0 && width > 0 {
            let block = CellRange::new(sheet.clone(), dsr, dsc, dsr + height - 1, dsc + width - 1)?;
            host.set_range_values(&block, df.values())
                .map_err(FrameError::host)?;
        }

        frame.decorate(host)?;
        Ok(frame)
    }

    /// Rebuild a frame from what is already on the sheet.
    ///
    /// The right edge is the first column where both the leaf header cell
    /// and the first data cell are empty. A header label followed by blank
    /// header cells becomes a wide group whose sub-values are `0..width`.
    pub fn attach<H: SheetHost>(
        host: &H,
        anchor: Anchor,
        index_levels: u32,
        header_levels: u32,
        config: FrameConfig,
    ) -> FrameResult<Frame> {
        let h = header_levels.max(1);
        let i = index_levels;
        let mut frame = Frame::assemble(
            anchor,
            RowIndex::new(vec![String::new(); i as usize]),
            Vec::new(),
            ColumnIndex::new(h as usize),
            config,
        );
        let sheet = frame.sheet().clone();
        let read = |row: u32, col: u32| -> FrameResult<String> {
            Ok(host
                .cell_value(&sheet, row, col)
                .map_err(FrameError::host)?
                .to_string())
        };

        let (top, left) = (frame.anchor.row, frame.anchor.col);
        let index_names = (0..i)
            .map(|level| read(frame.index_name_row(), left + level))
            .collect::<FrameResult<Vec<_>>>()?;
        let level_names = (0..h)
            .map(|k| {
                if frame.is_transposed() {
                    read(top + k, left)
                } else if i > 0 && k + 1 < h {
                    read(top + k, left + i - 1)
                } else {
                    Ok(String::new())
                }
            })
            .collect::<FrameResult<Vec<_>>>()?;

        let (dsr, dsc) = (frame.data_start_row(), frame.data_start_col());
        let leaf_row = top + h - 1;
        let mut end = dsc;
        while end <= MAX_COL && (occupied(host, &sheet, leaf_row, end)? || occupied(host, &sheet, dsr, end)?) {
            end += 1;
        }

        let mut columns = ColumnIndex::new(h as usize);
        if end > dsc {
            let header = host
                .range_values(&CellRange::new(sheet.clone(), top, dsc, leaf_row, end - 1)?)
                .map_err(FrameError::host)?;
            let leaf: Vec<Option<CellValue>> = header
                .last()
                .map(|row| row.iter().map(|v| (!v.is_blank()).then(|| v.clone())).collect())
                .unwrap_or_default();
            if leaf.first().is_some_and(Option::is_none) {
                return Err(FrameError::ColumnNotFound(format!(
                    "header of column {}",
                    column_index_to_name(dsc)?
                )));
            }
            let labels = fill_down(transpose(header, (end - dsc) as usize));
            for span in wide_spans(&leaf) {
                if span.width == 1 {
                    columns.append(labels[span.start as usize].clone(), None)?;
                } else {
                    let subs = (0..span.width).map(CellValue::from).collect();
                    columns.append(smallvec![CellValue::from(span.label.to_string())], Some(subs))?;
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sheet = %sheet,
            index_levels = i,
            header_levels = h,
            columns = columns.len(),
            width = end - dsc,
            "frame attached"
        );
        frame.rows = RowIndex::new(index_names);
        frame.level_names = level_names;
        frame.columns = columns;
        Ok(frame)
    }

    /// Read the live region back into a table.
    pub fn read<H: SheetHost>(&self, host: &H) -> FrameResult<DataFrame> {
        let layout = self.layout(host)?;
        let count = self.row_count(host)?;
        let width = layout.width();
        let h = self.header_levels() as usize;

        let mut labels: Vec<Labels> = Vec::with_capacity(width as usize);
        for (slot, span) in self.columns.slots().iter().zip(layout.spans()) {
            match slot {
                ColumnSlot::Simple(l) => labels.push(l.clone()),
                ColumnSlot::Wide(name) => {
                    let subs = self.columns.wide_values(name).unwrap_or_default();
                    for j in 0..span.width {
                        let sub = subs.get(j as usize).cloned().unwrap_or(CellValue::from(j));
                        let mut tuple: Labels = (1..h).map(|_| CellValue::from(name.as_str())).collect();
                        tuple.push(CellValue::from(format!("{name}[{sub}]")));
                        labels.push(tuple);
                    }
                }
            }
        }

        let values = if count > 0 && width > 0 {
            let (dsr, dsc) = (self.data_start_row(), self.data_start_col());
            host.range_values(&CellRange::new(
                self.sheet().clone(),
                dsr,
                dsc,
                dsr + count - 1,
                dsc + width - 1,
            )?)
            .map_err(FrameError::host)?
        } else {
            vec![Vec::new(); count as usize]
        };
        let index = if self.index_levels() > 0 {
            self.index_tuples(host, count)?
        } else {
            Vec::new()
        };
        DataFrame::new(
            self.rows.names().to_vec(),
            index,
            self.level_names.clone(),
            labels,
            values,
        )
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn sheet(&self) -> &SheetRef {
        &self.anchor.sheet
    }

    pub fn index_levels(&self) -> u32 {
        self.rows.levels() as u32
    }

    pub fn header_levels(&self) -> u32 {
        self.columns.header_levels() as u32
    }

    pub fn index_names(&self) -> &[String] {
        self.rows.names()
    }

    pub fn level_names(&self) -> &[String] {
        &self.level_names
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Column level names live in a side panel and are addressed by row.
    pub fn is_transposed(&self) -> bool {
        self.header_levels() > 1 && self.index_levels() == 1
    }

    pub fn data_start_row(&self) -> u32 {
        self.anchor.row + self.header_levels() + u32::from(self.is_transposed())
    }

    pub fn data_start_col(&self) -> u32 {
        self.anchor.col + self.index_levels()
    }

    fn index_name_row(&self) -> u32 {
        if self.is_transposed() {
            self.anchor.row + self.header_levels()
        } else {
            self.anchor.row + self.header_levels() - 1
        }
    }

    /// Number of data rows: a fresh scan that stops at the first empty cell.
    /// The innermost index column is probed since outer levels may be
    /// merged; without an index the first data column is.
    pub fn row_count<H: SheetHost>(&self, host: &H) -> FrameResult<u32> {
        let start = self.data_start_row();
        let probe = self.data_start_col().saturating_sub(1).max(self.anchor.col);
        let mut row = start;
        while row <= MAX_ROW && occupied(host, self.sheet(), row, probe)? {
            row += 1;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(sheet = %self.sheet(), start, probe, rows = row - start, "row count probe");
        Ok(row - start)
    }

    /// Slot widths measured against the live leaf header row.
    pub fn layout<H: SheetHost>(&self, host: &H) -> FrameResult<ColumnLayout> {
        let width = self.columns.recorded_width();
        if width == 0 {
            return Ok(self.columns.measure(&[]));
        }
        let row = self.anchor.row + self.header_levels() - 1;
        let start = self.data_start_col();
        let segment = CellRange::new(
            self.sheet().clone(),
            row,
            start,
            row,
            (start + width - 1).min(MAX_COL),
        )?;
        let cells = host.range_values(&segment).map_err(FrameError::host)?;
        let leaf: Vec<Option<CellValue>> = cells
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|v| (!v.is_blank()).then_some(v))
            .collect();
        Ok(self.columns.measure(&leaf))
    }

    fn target(&self, layout: &ColumnLayout, column: &ColumnRef) -> FrameResult<Target> {
        if let ColumnRef::Name(name) = column {
            if !name.is_empty() {
                if let Some(level) = self.rows.level_of(name) {
                    return Ok(Target::Index(level as u32));
                }
                if self.is_transposed() {
                    if let Some(k) = self.level_names.iter().position(|n| n == name) {
                        return Ok(Target::HeaderLevel(k as u32));
                    }
                }
            }
        }
        let span = self.columns.resolve_one(layout, column)?;
        Ok(Target::Data {
            offset: span.offset,
            width: span.width,
        })
    }

    fn target_columns(&self, layout: &ColumnLayout, target: Target) -> FrameResult<(u32, u32)> {
        let dsc = self.data_start_col();
        match target {
            Target::Index(level) => Ok((self.anchor.col + level, self.anchor.col + level)),
            Target::Data { offset, width } => Ok((dsc + offset, dsc + offset + width - 1)),
            Target::HeaderLevel(_) => match layout.width() {
                0 => Err(FrameError::EmptySelection),
                w => Ok((dsc, dsc + w - 1)),
            },
        }
    }

    fn target_rows<H: SheetHost>(
        &self,
        host: &H,
        target: Target,
        slice: &Slice,
    ) -> FrameResult<(u32, u32)> {
        let top = self.anchor.row;
        let header = match target {
            Target::Index(_) => (self.index_name_row(), self.index_name_row()),
            Target::HeaderLevel(k) => (top + k, top + k),
            Target::Data { .. } => (top, top + self.header_levels() - 1),
        };
        if matches!(target, Target::HeaderLevel(_)) && *slice != Slice::Header {
            return Err(FrameError::InvalidSlice(
                "column level names only have a header row".into(),
            ));
        }
        let dsr = self.data_start_row();
        let rows = match slice {
            Slice::Header => header,
            Slice::FirstDataRow => match self.row_count(host)? {
                0 => return Err(FrameError::EmptyFrame),
                _ => (dsr, dsr),
            },
            Slice::AllData => match self.row_count(host)? {
                0 => return Err(FrameError::EmptyFrame),
                n => (dsr, dsr + n - 1),
            },
            Slice::Full => match self.row_count(host)? {
                0 => header,
                n => (header.0, dsr + n - 1),
            },
            Slice::Row(r) => (*r, *r),
            Slice::Rows(a, b) => (*a.min(b), *a.max(b)),
            Slice::Where(filters) => {
                let count = self.row_count(host)?;
                let tuples = self.index_tuples(host, count)?;
                let found = self.rows.locate(&tuples, filters)?;
                (dsr + found.start, dsr + found.end)
            }
        };
        Ok(rows)
    }

    /// Exact region of one column for `slice`. Wide columns give their full
    /// multi-column span.
    pub fn range_for<H: SheetHost>(
        &self,
        host: &H,
        column: &ColumnRef,
        slice: &Slice,
    ) -> FrameResult<CellRange> {
        let layout = self.layout(host)?;
        self.range_with(host, &layout, column, slice)
    }

    fn range_with<H: SheetHost>(
        &self,
        host: &H,
        layout: &ColumnLayout,
        column: &ColumnRef,
        slice: &Slice,
    ) -> FrameResult<CellRange> {
        let target = self.target(layout, column)?;
        let (c0, c1) = self.target_columns(layout, target)?;
        let (r0, r1) = self.target_rows(host, target, slice)?;
        CellRange::new(self.sheet().clone(), r0, c0, r1, c1)
    }

    /// One member per column, in the order given.
    pub fn ranges_for<H: SheetHost>(
        &self,
        host: &H,
        columns: &[ColumnRef],
        slice: &Slice,
    ) -> FrameResult<RangeCollection> {
        let layout = self.layout(host)?;
        let ranges = columns
            .iter()
            .map(|c| self.range_with(host, &layout, c, slice))
            .collect::<FrameResult<Vec<_>>>()?;
        host.union(&ranges)
    }

    /// Whole data block (all columns, data rows only).
    pub fn data_range<H: SheetHost>(&self, host: &H) -> FrameResult<CellRange> {
        let width = self.layout(host)?.width();
        let count = self.row_count(host)?;
        if count == 0 {
            return Err(FrameError::EmptyFrame);
        }
        if width == 0 {
            return Err(FrameError::EmptySelection);
        }
        let (dsr, dsc) = (self.data_start_row(), self.data_start_col());
        CellRange::new(self.sheet().clone(), dsr, dsc, dsr + count - 1, dsc + width - 1)
    }

    /// Everything the frame occupies: panels, header and data.
    pub fn region<H: SheetHost>(&self, host: &H) -> FrameResult<CellRange> {
        let width = self.layout(host)?.width();
        let count = self.row_count(host)?;
        let bottom = (self.data_start_row() + count).saturating_sub(1).max(self.index_name_row());
        let right = (self.data_start_col() + width).saturating_sub(1).max(self.anchor.col);
        CellRange::new(self.sheet().clone(), self.anchor.row, self.anchor.col, bottom, right)
    }

    /// Index tuples of every data row, merged blanks filled in.
    fn index_tuples<H: SheetHost>(&self, host: &H, count: u32) -> FrameResult<Vec<Labels>> {
        let i = self.index_levels();
        if i == 0 || count == 0 {
            return Ok(Vec::new());
        }
        let dsr = self.data_start_row();
        let block = host
            .range_values(&CellRange::new(
                self.sheet().clone(),
                dsr,
                self.anchor.col,
                dsr + count - 1,
                self.anchor.col + i - 1,
            )?)
            .map_err(FrameError::host)?;
        Ok(fill_down(block))
    }

    /// Group data rows by the values of `by` (several columns concatenate
    /// into one key). Intervals are absolute sheet rows.
    pub fn group_by<H: SheetHost>(
        &self,
        host: &H,
        by: &[ColumnRef],
        order: GroupOrder,
    ) -> FrameResult<GroupIndex> {
        if by.is_empty() {
            return Err(FrameError::EmptySelection);
        }
        let layout = self.layout(host)?;
        let count = self.row_count(host)?;
        let targets = by
            .iter()
            .map(|c| self.target(&layout, c))
            .collect::<FrameResult<Vec<_>>>()?;
        if count == 0 {
            return Ok(GroupIndex::empty());
        }
        let dsr = self.data_start_row();
        let mut keys: Vec<Labels> = vec![Labels::new(); count as usize];
        let mut index: Option<Vec<Labels>> = None;
        for target in targets {
            match target {
                Target::HeaderLevel(_) => {
                    return Err(FrameError::InvalidSlice(
                        "cannot group rows by a column level name".into(),
                    ));
                }
                Target::Index(level) => {
                    if index.is_none() {
                        index = Some(self.index_tuples(host, count)?);
                    }
                    for (key, tuple) in keys.iter_mut().zip(index.iter().flatten()) {
                        key.push(tuple[level as usize].clone());
                    }
                }
                Target::Data { .. } => {
                    let (c0, c1) = self.target_columns(&layout, target)?;
                    let block = host
                        .range_values(&CellRange::new(
                            self.sheet().clone(),
                            dsr,
                            c0,
                            dsr + count - 1,
                            c1,
                        )?)
                        .map_err(FrameError::host)?;
                    for (key, row) in keys.iter_mut().zip(block) {
                        key.extend(row);
                    }
                }
            }
        }
        Ok(group_runs(&keys, order).shifted(dsr))
    }

    /// For each of `columns`, the union of the rows `groups` holds for `key`.
    pub fn collections_for<H: SheetHost>(
        &self,
        host: &H,
        groups: &GroupIndex,
        key: &[CellValue],
        columns: &[ColumnRef],
    ) -> FrameResult<Vec<RangeCollection>> {
        let intervals = groups
            .get(key)
            .ok_or_else(|| FrameError::KeyNotFound(format_labels(key)))?;
        let layout = self.layout(host)?;
        columns
            .iter()
            .map(|column| {
                let target = self.target(&layout, column)?;
                if matches!(target, Target::HeaderLevel(_)) {
                    return Err(FrameError::InvalidSlice(column.describe()));
                }
                let (c0, c1) = self.target_columns(&layout, target)?;
                let ranges = intervals
                    .iter()
                    .map(|iv| CellRange::new(self.sheet().clone(), iv.start, c0, iv.end, c1))
                    .collect::<FrameResult<Vec<_>>>()?;
                host.union(&ranges)
            })
            .collect()
    }

    /// Group by `by`, then compose one collection per column for `key`.
    pub fn aggregated_range<H: SheetHost>(
        &self,
        host: &H,
        by: &[ColumnRef],
        key: &[CellValue],
        columns: &[ColumnRef],
    ) -> FrameResult<Vec<RangeCollection>> {
        let groups = self.group_by(host, by, GroupOrder::FirstOccurrence)?;
        self.collections_for(host, &groups, key, columns)
    }

    /// Runs of equal header labels at `level` across the data columns, keyed
    /// by the label prefix down to that level. Intervals are absolute
    /// columns.
    pub fn group_header<H: SheetHost>(&self, host: &H, level: u32) -> FrameResult<GroupIndex> {
        if level >= self.header_levels() {
            return Err(FrameError::ColumnNotFound(format!("header level {level}")));
        }
        let width = self.layout(host)?.width();
        if width == 0 {
            return Ok(GroupIndex::empty());
        }
        let dsc = self.data_start_col();
        let block = host
            .range_values(&CellRange::new(
                self.sheet().clone(),
                self.anchor.row,
                dsc,
                self.anchor.row + level,
                dsc + width - 1,
            )?)
            .map_err(FrameError::host)?;
        let keys = fill_down(transpose(block, width as usize));
        Ok(group_runs(&keys, GroupOrder::FirstOccurrence).shifted(dsc))
    }

    /// Runs of equal index labels at `level` down the data rows, keyed by the
    /// index prefix. Intervals are absolute rows.
    pub fn group_index<H: SheetHost>(&self, host: &H, level: u32) -> FrameResult<GroupIndex> {
        if level >= self.index_levels() {
            return Err(FrameError::ColumnNotFound(format!("index level {level}")));
        }
        let count = self.row_count(host)?;
        let keys: Vec<Labels> = self
            .index_tuples(host, count)?
            .into_iter()
            .map(|mut t| {
                t.truncate(level as usize + 1);
                t
            })
            .collect();
        Ok(group_runs(&keys, GroupOrder::FirstOccurrence).shifted(self.data_start_row()))
    }

    /// Append a simple column to the right of the frame.
    pub fn add_column<H: SheetHost>(
        &mut self,
        host: &mut H,
        labels: Labels,
        values: &[CellValue],
    ) -> FrameResult<()> {
        let layout = self.layout(host)?;
        let count = self.row_count(host)?;
        if count > 0 && values.len() != count as usize {
            return Err(FrameError::ShapeMismatch {
                what: "column values",
                expected: count as usize,
                found: values.len(),
            });
        }
        let col = self.data_start_col() + layout.width();
        self.columns.append(labels.clone(), None)?;
        self.write_header_cells(host, col, &labels)?;
        if !values.is_empty() {
            let dsr = self.data_start_row();
            let block = CellRange::new(
                self.sheet().clone(),
                dsr,
                col,
                dsr + values.len() as u32 - 1,
                col,
            )?;
            let rows: Vec<Vec<CellValue>> = values.iter().map(|v| vec![v.clone()]).collect();
            host.set_range_values(&block, &rows)
                .map_err(FrameError::host)?;
        }
        self.style_header(host, col, col)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(column = %format_labels(&labels), col, "column added");
        Ok(())
    }

    /// Create a wide group, or grow the right-most one, with one physical
    /// column per sub-value. Each entry of `rows` holds one value per
    /// sub-value.
    pub fn add_wide_column<H: SheetHost>(
        &mut self,
        host: &mut H,
        name: &str,
        sub_values: Vec<CellValue>,
        rows: &[Vec<CellValue>],
    ) -> FrameResult<()> {
        let width = sub_values.len();
        if width == 0 {
            return Err(FrameError::EmptySelection);
        }
        let layout = self.layout(host)?;
        let count = self.row_count(host)?;
        if count > 0 && rows.len() != count as usize {
            return Err(FrameError::ShapeMismatch {
                what: "wide column rows",
                expected: count as usize,
                found: rows.len(),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(FrameError::ShapeMismatch {
                what: "wide column values",
                expected: width,
                found: bad.len(),
            });
        }
        let growing = self.columns.wide_values(name).is_some();
        let col = self.data_start_col() + layout.width();
        let last = col + width as u32 - 1;
        self.columns
            .append(smallvec![CellValue::from(name)], Some(sub_values))?;

        let top = self.anchor.row;
        let h = self.header_levels();
        let mut header: Vec<Vec<CellValue>> = vec![vec![CellValue::Empty; width]; h as usize];
        if !growing {
            for row in &mut header {
                row[0] = CellValue::from(name);
            }
        }
        host.set_range_values(
            &CellRange::new(self.sheet().clone(), top, col, top + h - 1, last)?,
            &header,
        )
        .map_err(FrameError::host)?;
        if !rows.is_empty() {
            let dsr = self.data_start_row();
            let block = CellRange::new(
                self.sheet().clone(),
                dsr,
                col,
                dsr + rows.len() as u32 - 1,
                last,
            )?;
            host.set_range_values(&block, rows)
                .map_err(FrameError::host)?;
        }
        self.style_header(host, col, last)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(group = name, col, width, growing, "wide column added");
        Ok(())
    }

    /// Append a column whose cells are formulas built from `template`.
    /// `{name}` refers to the same row of another column, `{$name}` to that
    /// column's whole data range.
    pub fn add_formula_column<H: SheetHost>(
        &mut self,
        host: &mut H,
        labels: Labels,
        template: &str,
    ) -> FrameResult<()> {
        let template = Template::parse(template);
        let layout = self.layout(host)?;
        let count = self.row_count(host)?;
        let mut spans = Vec::with_capacity(template.placeholders().len());
        for ph in template.placeholders() {
            let target = self.target(&layout, &ph.column)?;
            if matches!(target, Target::HeaderLevel(_)) {
                return Err(FrameError::InvalidSlice(ph.column.describe()));
            }
            spans.push(self.target_columns(&layout, target)?);
        }
        let col = self.data_start_col() + layout.width();
        self.columns.append(labels.clone(), None)?;
        self.write_header_cells(host, col, &labels)?;

        let sheet = self.sheet().clone();
        let dsr = self.data_start_row();
        let relative = AddressStyle::relative();
        let absolute = AddressStyle::absolute();
        for row in dsr..dsr + count {
            let mut pending = spans.iter();
            let formula = template.render(|ph| {
                let &(c0, c1) = pending
                    .next()
                    .ok_or_else(|| FrameError::ColumnNotFound(ph.column.describe()))?;
                Ok(if ph.absolute {
                    CellRange::new(sheet.clone(), dsr, c0, dsr + count - 1, c1)?.address(&absolute)
                } else {
                    CellRange::new(sheet.clone(), row, c0, row, c1)?.address(&relative)
                })
            })?;
            host.set_formula(&sheet, row, col, &formula)
                .map_err(FrameError::host)?;
        }
        self.style_header(host, col, col)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(column = %format_labels(&labels), col, rows = count, "formula column added");
        Ok(())
    }

    fn write_header_cells<H: SheetHost>(
        &self,
        host: &mut H,
        col: u32,
        labels: &[CellValue],
    ) -> FrameResult<()> {
        for (k, label) in labels.iter().enumerate() {
            host.set_cell_value(self.sheet(), self.anchor.row + k as u32, col, label.clone())
                .map_err(FrameError::host)?;
        }
        Ok(())
    }

    fn style_header<H: SheetHost>(&self, host: &mut H, c0: u32, c1: u32) -> FrameResult<()> {
        let top = self.anchor.row;
        let bottom = self.index_name_row().max(top + self.header_levels() - 1);
        let range = CellRange::new(self.sheet().clone(), top, c0, bottom, c1)?;
        if let Some(font) = &self.config.header_font {
            host.set_font(&range, font).map_err(FrameError::host)?;
        }
        if let Some(border) = &self.config.header_border {
            host.set_border(&range, border).map_err(FrameError::host)?;
        }
        if let Some(color) = self.config.header_fill {
            host.set_fill(&range, color).map_err(FrameError::host)?;
        }
        if let Some(format) = &self.config.header_number_format {
            host.set_number_format(&range, format)
                .map_err(FrameError::host)?;
        }
        Ok(())
    }

    /// Merged header runs, header styling and autofit after a full write.
    fn decorate<H: SheetHost>(&self, host: &mut H) -> FrameResult<()> {
        let sheet = self.sheet().clone();
        if self.config.merge_headers {
            for level in 0..self.header_levels().saturating_sub(1) {
                let row = self.anchor.row + level;
                for group in &self.group_header(host, level)? {
                    for iv in group.intervals.iter().filter(|iv| iv.len() > 1) {
                        host.merge(&CellRange::new(sheet.clone(), row, iv.start, row, iv.end)?)
                            .map_err(FrameError::host)?;
                    }
                }
            }
            for level in 0..self.index_levels().saturating_sub(1) {
                let col = self.anchor.col + level;
                for group in &self.group_index(host, level)? {
                    for iv in group.intervals.iter().filter(|iv| iv.len() > 1) {
                        host.merge(&CellRange::new(sheet.clone(), iv.start, col, iv.end, col)?)
                            .map_err(FrameError::host)?;
                    }
                }
            }
        }
        let right = (self.data_start_col() + self.layout(host)?.width())
            .saturating_sub(1)
            .max(self.anchor.col);
        self.style_header(host, self.anchor.col, right)?;
        if self.config.autofit {
            let region = self.region(host)?;
            host.autofit(&region).map_err(FrameError::host)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::from(*v)).collect()
    }

    #[test]
    fn fill_down_respects_parent_boundaries() {
        let lines = vec![
            line(&["a", "x"]),
            line(&["", "y"]),
            line(&["b", ""]),
            line(&["", ""]),
        ];
        let filled = fill_down(lines);
        let flat: Vec<String> = filled.iter().map(|l| format_labels(l)).collect();
        assert_eq!(flat, ["(a, x)", "(a, y)", "(b, )", "(b, )"]);
    }

    #[test]
    fn transpose_reads_columns() {
        let block = vec![line(&["a", "b"]), line(&["c", "d"])];
        assert_eq!(transpose(block, 2), vec![line(&["a", "c"]), line(&["b", "d"])]);
    }
}
