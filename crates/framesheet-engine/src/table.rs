use framesheet_common::{CellValue, FrameError, FrameResult, Labels};
use smallvec::smallvec;

/// In-memory table with a (possibly hierarchical) row index and column
/// header. Values are stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrame {
    index_names: Vec<String>,
    index: Vec<Labels>,
    column_names: Vec<String>,
    columns: Vec<Labels>,
    values: Vec<Vec<CellValue>>,
}

impl DataFrame {
    pub fn new(
        index_names: Vec<String>,
        index: Vec<Labels>,
        column_names: Vec<String>,
        columns: Vec<Labels>,
        values: Vec<Vec<CellValue>>,
    ) -> FrameResult<Self> {
        let header_levels = column_names.len().max(1);
        if let Some(bad) = columns.iter().find(|c| c.len() != header_levels) {
            return Err(FrameError::ShapeMismatch {
                what: "column labels",
                expected: header_levels,
                found: bad.len(),
            });
        }
        if !index_names.is_empty() && index.len() != values.len() {
            return Err(FrameError::ShapeMismatch {
                what: "index rows",
                expected: values.len(),
                found: index.len(),
            });
        }
        if let Some(bad) = index.iter().find(|t| t.len() != index_names.len()) {
            return Err(FrameError::ShapeMismatch {
                what: "index tuple",
                expected: index_names.len(),
                found: bad.len(),
            });
        }
        if let Some(bad) = values.iter().find(|row| row.len() != columns.len()) {
            return Err(FrameError::ShapeMismatch {
                what: "row values",
                expected: columns.len(),
                found: bad.len(),
            });
        }
        Ok(DataFrame {
            column_names: if column_names.is_empty() {
                vec![String::new()]
            } else {
                column_names
            },
            index_names,
            index,
            columns,
            values,
        })
    }

    /// Single header level, no row index.
    pub fn from_rows<I, V>(columns: I, values: Vec<Vec<CellValue>>) -> FrameResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let columns: Vec<Labels> = columns.into_iter().map(|c| smallvec![c.into()]).collect();
        DataFrame::new(Vec::new(), Vec::new(), Vec::new(), columns, values)
    }

    /// Replace the row index.
    pub fn with_index(self, names: Vec<String>, index: Vec<Labels>) -> FrameResult<Self> {
        DataFrame::new(names, index, self.column_names, self.columns, self.values)
    }

    /// Replace the header with hierarchical labels.
    pub fn with_columns(self, level_names: Vec<String>, columns: Vec<Labels>) -> FrameResult<Self> {
        DataFrame::new(self.index_names, self.index, level_names, columns, self.values)
    }

    pub fn height(&self) -> usize {
        self.values.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index_levels(&self) -> usize {
        self.index_names.len()
    }

    pub fn header_levels(&self) -> usize {
        self.column_names.len()
    }

    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    pub fn index(&self) -> &[Labels] {
        &self.index
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn columns(&self) -> &[Labels] {
        &self.columns
    }

    pub fn values(&self) -> &[Vec<CellValue>] {
        &self.values
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.values.get(row)?.get(col)
    }

    /// Numeric view of the value block; non-numbers become `None`.
    pub fn numbers(&self) -> Vec<Vec<Option<f64>>> {
        self.values
            .iter()
            .map(|row| row.iter().map(CellValue::as_number).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_are_checked() {
        let ok = DataFrame::from_rows(["a", "b"], vec![vec![1.into(), 2.into()]]).unwrap();
        assert_eq!((ok.height(), ok.width(), ok.header_levels()), (1, 2, 1));

        let ragged = DataFrame::from_rows(["a", "b"], vec![vec![1.into()]]);
        assert!(matches!(
            ragged,
            Err(FrameError::ShapeMismatch { what: "row values", .. })
        ));

        let short_index = ok.clone().with_index(vec!["k".into()], Vec::new());
        assert!(matches!(
            short_index,
            Err(FrameError::ShapeMismatch { what: "index rows", .. })
        ));

        let hier = ok.with_columns(
            vec!["outer".into(), "inner".into()],
            vec![smallvec!["x".into(), "a".into()], smallvec!["x".into()]],
        );
        assert!(matches!(
            hier,
            Err(FrameError::ShapeMismatch { what: "column labels", .. })
        ));
    }

    #[test]
    fn numeric_view() {
        let df = DataFrame::from_rows(["a", "b"], vec![vec![1.5.into(), "x".into()]]).unwrap();
        assert_eq!(df.numbers(), vec![vec![Some(1.5), None]]);
        assert_eq!(df.value(0, 1), Some(&CellValue::from("x")));
    }
}
