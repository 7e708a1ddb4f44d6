//! Error taxonomy shared by every framesheet layer.
//!
//! Nothing in the workspace recovers locally from these: each variant is a
//! usage error from the caller's point of view and is surfaced as-is. Errors
//! raised by the host application binding are boxed into [`FrameError::Host`]
//! so their `source()` chain survives.

use std::error::Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    /// Address string did not match `A1` / `A1:B2` (with optional `$` markers).
    #[error("malformed address '{address}': {reason}")]
    AddressFormat { address: String, reason: String },

    /// Row or column outside the 1-based grid (zero or overflowing).
    #[error("coordinate out of bounds: row {row}, column {col}")]
    OutOfBounds { row: i64, col: i64 },

    /// Two corners or members of one region resolve to different sheets.
    #[error("region spans two sheets: '{first}' and '{second}'")]
    CrossSheet { first: String, second: String },

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// A plain name was given where hierarchical headers need a full tuple.
    #[error("column reference '{0}' is ambiguous; pass the full header tuple")]
    AmbiguousColumn(String),

    /// Lookup required exactly one contiguous block but found several.
    #[error("selection {key} must be continuous, found {intervals} separate blocks")]
    NonContiguousSelection { key: String, intervals: usize },

    #[error("column or group '{0}' is already defined")]
    DuplicateGroup(String),

    #[error("frame has no data rows")]
    EmptyFrame,

    #[error("selection is empty")]
    EmptySelection,

    /// Both the row and the column side of a selection were lists.
    #[error("only one side of a row/column selection may be a list")]
    MixedSelection,

    #[error("key {0} not found")]
    KeyNotFound(String),

    #[error("slice not valid here: {0}")]
    InvalidSlice(String),

    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("unknown aggregate function '{0}'")]
    UnknownFunction(String),

    #[error("host call failed: {0}")]
    Host(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl FrameError {
    /// Box an error raised by the host application binding.
    pub fn host<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        FrameError::Host(Box::new(err))
    }

    pub(crate) fn address(address: &str, reason: impl Into<String>) -> Self {
        FrameError::AddressFormat {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

pub type FrameResult<T> = Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("sheet locked")]
    struct Locked;

    #[test]
    fn host_errors_keep_their_source() {
        let err = FrameError::host(Locked);
        assert_eq!(err.to_string(), "host call failed: sheet locked");
        assert_eq!(err.source().map(|s| s.to_string()), Some("sheet locked".into()));
    }

    #[test]
    fn non_contiguous_message_names_the_key() {
        let err = FrameError::NonContiguousSelection {
            key: "(A)".into(),
            intervals: 2,
        };
        assert_eq!(
            err.to_string(),
            "selection (A) must be continuous, found 2 separate blocks"
        );
    }
}
