//! Lays logical tables out on spreadsheet regions and assembles the
//! aggregate formulas that summarise them.
//!
//! A [`Frame`] projects column names and row slices onto sheet ranges. The
//! grouping engine turns runs of equal keys into row intervals, which the
//! frame composes into [`RangeCollection`]s for [`FormulaBuilder`].

pub mod config;
pub mod formula;
pub mod frame;
pub mod grouping;
pub mod heatmap;
pub mod index;
pub mod summary;
pub mod table;
pub mod template;

pub use config::FrameConfig;
#[cfg(feature = "serde")]
pub use config::ConfigError;
pub use formula::{AggFunc, Derived, FormulaBuilder, HidePolicy, Selection, Stat, aggregate};
pub use frame::{Anchor, Frame, Slice};
pub use grouping::{Group, GroupIndex, GroupOrder, Interval, Run, find_runs, group_runs};
pub use heatmap::{Extrema, Heatmap, HeatmapLayout};
pub use index::{ColumnIndex, ColumnLayout, ColumnRef, ColumnSlot, ColumnSpan, RowIndex, WideSpan, label, wide_spans};
pub use table::DataFrame;
pub use template::{Placeholder, Template};

pub use framesheet_common::{CellRange, CellValue, FrameError, FrameResult, Labels, RangeCollection, SheetRef};
