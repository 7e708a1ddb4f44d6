//! Meta crate that re-exports the framesheet building blocks. Depend on this
//! crate for the common path, or on the individual crates when only the
//! address codec or the host trait is needed.

pub mod doc_examples;

pub use framesheet_common as common;
pub use framesheet_engine as engine;
pub use framesheet_host as host;

pub use framesheet_common::{
    AddressStyle, CellRange, CellValue, FrameError, FrameResult, Labels, RangeCollection,
    SheetRef, column_index_to_name, name_to_index, parse_address, render_address,
};
pub use framesheet_engine::{
    AggFunc, Anchor, ColumnRef, DataFrame, Frame, FrameConfig, FormulaBuilder, GroupIndex,
    GroupOrder, Heatmap, HeatmapLayout, HidePolicy, Slice, Stat,
};
pub use framesheet_host::{MemoryHost, SheetHost};
