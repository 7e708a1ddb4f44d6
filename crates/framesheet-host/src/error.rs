use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("sheet '{0}' does not exist")]
    UnknownSheet(String),

    #[error("sheet '{0}' already exists")]
    DuplicateSheet(String),

    /// New merge region overlaps one that is already merged.
    #[error("cannot merge {requested}: overlaps merged region {existing}")]
    MergeConflict { requested: String, existing: String },

    #[error("value block is {found_rows}x{found_cols}, range is {rows}x{cols}")]
    Shape {
        rows: usize,
        cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
}
