use chrono::{NaiveDate, NaiveDateTime};
use smallvec::SmallVec;
use std::{
    cmp::Ordering,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A scalar read from or written to a single cell.
///
/// Unlike an `f64`, a `CellValue` is totally ordered and hashable so it can be
/// used directly as a grouping key: numbers compare with `total_cmp` and hash
/// by bit pattern, so `NaN == NaN` here.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Error(String),
}

/// Label or key tuple: one entry per header/index level or grouping column.
pub type Labels = SmallVec<[CellValue; 2]>;

impl CellValue {
    /// Blank cells terminate row probes and mark wide-group padding.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True when this label is addressed by the plain column name `name`.
    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            CellValue::Text(s) => s == name,
            CellValue::Empty => false,
            other => other.to_string() == name,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Empty => 0,
            CellValue::Bool(_) => 1,
            CellValue::Number(_) => 2,
            CellValue::DateTime(_) => 3,
            CellValue::Text(_) => 4,
            CellValue::Error(_) => 5,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellValue::Empty, CellValue::Empty) => Ordering::Equal,
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Error(a), CellValue::Error(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            CellValue::Empty => {}
            CellValue::Bool(b) => b.hash(state),
            CellValue::Number(n) => n.to_bits().hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
            CellValue::Text(s) | CellValue::Error(s) => s.hash(state),
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Error(e) => f.write_str(e),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::DateTime(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// Render a key tuple as `(a, b)` for error messages and logs.
pub fn format_labels(labels: &[CellValue]) -> String {
    let parts: Vec<String> = labels.iter().map(|v| v.to_string()).collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn numbers_are_hashable_keys() {
        let mut seen = HashSet::new();
        seen.insert(CellValue::Number(1.0));
        seen.insert(CellValue::Number(f64::NAN));
        assert!(seen.contains(&CellValue::Number(1.0)));
        assert!(seen.contains(&CellValue::Number(f64::NAN)));
        assert!(!seen.contains(&CellValue::Number(2.0)));
    }

    #[test]
    fn ordering_groups_by_kind_first() {
        let mut values = vec![
            CellValue::from("b"),
            CellValue::from(3.0),
            CellValue::Empty,
            CellValue::from("a"),
            CellValue::from(true),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                CellValue::Empty,
                CellValue::from(true),
                CellValue::from(3.0),
                CellValue::from("a"),
                CellValue::from("b"),
            ]
        );
    }

    #[test]
    fn blanks() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from("").is_blank());
        assert!(!CellValue::from(0.0).is_blank());
    }

    #[test]
    fn labels_match_by_display_name() {
        assert!(CellValue::from("price").matches_name("price"));
        assert!(CellValue::from(2020.0).matches_name("2020"));
        assert!(!CellValue::Empty.matches_name(""));
    }

    #[test]
    fn format_key_tuple() {
        let key = [CellValue::from("A"), CellValue::from(2.0)];
        assert_eq!(format_labels(&key), "(A, 2)");
    }
}
