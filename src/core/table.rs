//! Column-oriented tabular container for drillhole datasets.
//!
//! A [`Table`] holds named columns of homogeneous type: numeric columns
//! store `f64` with NaN marking missing values, text columns store
//! `Option<String>`. Engines receive already-parsed tables from the caller
//! and append derived columns to them; no parsing happens here.

use std::collections::HashMap;

use thiserror::Error;

/// Errors that can occur when manipulating tables.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("column '{name}' has {actual} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column name: '{0}'")]
    DuplicateColumn(String),
}

/// A single table column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric values; NaN marks a missing entry.
    Number(Vec<f64>),
    /// Text values; `None` marks a missing entry.
    Text(Vec<Option<String>>),
}

impl Column {
    /// Number of rows in this column.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Column::Number(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    /// Returns true if the column has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric value at `row`, if this is a numeric column and the value
    /// is present (non-NaN text columns do not parse here).
    pub fn number(&self, row: usize) -> Option<f64> {
        match self {
            Column::Number(v) => v.get(row).copied().filter(|x| x.is_finite()),
            Column::Text(_) => None,
        }
    }

    /// Row value rendered as text. Numeric values print with minimal
    /// formatting; missing values return `None`.
    pub fn text(&self, row: usize) -> Option<String> {
        match self {
            Column::Number(v) => v.get(row).and_then(|x| {
                if x.is_finite() {
                    Some(format_number(*x))
                } else {
                    None
                }
            }),
            Column::Text(v) => v.get(row).and_then(|s| s.clone()),
        }
    }

    /// Extracts the rows at `indices` into a new column of the same type.
    pub fn take_rows(&self, indices: &[usize]) -> Column {
        match self {
            Column::Number(v) => Column::Number(
                indices
                    .iter()
                    .map(|&i| v.get(i).copied().unwrap_or(f64::NAN))
                    .collect(),
            ),
            Column::Text(v) => Column::Text(
                indices
                    .iter()
                    .map(|&i| v.get(i).and_then(|s| s.clone()))
                    .collect(),
            ),
        }
    }
}

/// Render a float the way CSV output expects: integral values without a
/// trailing `.0` would be ambiguous against text, so keep standard Display.
fn format_number(x: f64) -> String {
    if x == x.trunc() && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// Column-oriented table with ordered, uniquely named columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    lookup: HashMap<String, usize>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows (0 for a table with no columns).
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Iterates columns with their names, in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.lookup.get(name).map(|&i| &self.columns[i])
    }

    /// Returns the numeric data of a column, or `None` if the column is
    /// missing or textual.
    pub fn numbers(&self, name: &str) -> Option<&[f64]> {
        match self.column(name)? {
            Column::Number(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    /// Renders every row of a column as text. Used for hole identifiers,
    /// which may arrive as either text or numeric columns.
    pub fn values_as_text(&self, name: &str) -> Option<Vec<Option<String>>> {
        let col = self.column(name)?;
        let n = col.len();
        Some((0..n).map(|i| col.text(i)).collect())
    }

    /// Appends a column. Fails if the name is taken or the length does not
    /// match existing columns.
    pub fn push_column(&mut self, name: &str, column: Column) -> Result<(), TableError> {
        if self.lookup.contains_key(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        if !self.columns.is_empty() && column.len() != self.num_rows() {
            return Err(TableError::LengthMismatch {
                name: name.to_string(),
                expected: self.num_rows(),
                actual: column.len(),
            });
        }
        self.lookup.insert(name.to_string(), self.columns.len());
        self.names.push(name.to_string());
        self.columns.push(column);
        Ok(())
    }

    /// Inserts a column, replacing an existing one of the same name in
    /// place. The replacement keeps its position and must match the table's
    /// row count.
    pub fn put_column(&mut self, name: &str, column: Column) -> Result<(), TableError> {
        match self.lookup.get(name) {
            Some(&i) => {
                if column.len() != self.num_rows() {
                    return Err(TableError::LengthMismatch {
                        name: name.to_string(),
                        expected: self.num_rows(),
                        actual: column.len(),
                    });
                }
                self.columns[i] = column;
                Ok(())
            }
            None => self.push_column(name, column),
        }
    }

    /// Builds a new table containing the given rows of every column, in
    /// the order listed. Indices may repeat.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let mut out = Table::new();
        for (name, col) in self.names.iter().zip(&self.columns) {
            // Names are already unique and lengths match by construction.
            let _ = out.push_column(name, col.take_rows(indices));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut t = Table::new();
        t.push_column("hole_id", Column::Text(vec![
            Some("DH001".to_string()),
            Some("DH002".to_string()),
            None,
        ]))
        .unwrap();
        t.push_column("depth", Column::Number(vec![0.0, 25.5, f64::NAN]))
            .unwrap();
        t
    }

    #[test]
    fn test_basic_shape() {
        let t = sample_table();
        assert_eq!(t.num_rows(), 3);
        assert_eq!(t.num_columns(), 2);
        assert_eq!(t.column_names(), &["hole_id", "depth"]);
    }

    #[test]
    fn test_number_access() {
        let t = sample_table();
        let depths = t.numbers("depth").unwrap();
        assert_eq!(depths[1], 25.5);
        assert!(depths[2].is_nan());
        assert!(t.numbers("hole_id").is_none());
        assert!(t.numbers("missing").is_none());
    }

    #[test]
    fn test_values_as_text_numeric_column() {
        let t = sample_table();
        let ids = t.values_as_text("depth").unwrap();
        assert_eq!(ids[0].as_deref(), Some("0"));
        assert_eq!(ids[1].as_deref(), Some("25.5"));
        assert_eq!(ids[2], None);
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut t = sample_table();
        let err = t.push_column("x", Column::Number(vec![1.0])).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));
    }

    #[test]
    fn test_push_column_duplicate() {
        let mut t = sample_table();
        let err = t
            .push_column("depth", Column::Number(vec![0.0, 0.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn(_)));
    }

    #[test]
    fn test_put_column_replaces_in_place() {
        let mut t = sample_table();
        t.put_column("depth", Column::Number(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(t.num_columns(), 2);
        assert_eq!(t.column_names(), &["hole_id", "depth"]);
        assert_eq!(t.numbers("depth").unwrap(), &[1.0, 2.0, 3.0]);

        // A new name still appends.
        t.put_column("grade", Column::Number(vec![0.5, 0.6, 0.7]))
            .unwrap();
        assert_eq!(t.num_columns(), 3);

        let err = t.put_column("depth", Column::Number(vec![1.0])).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));
    }

    #[test]
    fn test_take_rows() {
        let t = sample_table();
        let sub = t.take_rows(&[1, 0]);
        assert_eq!(sub.num_rows(), 2);
        let ids = sub.values_as_text("hole_id").unwrap();
        assert_eq!(ids[0].as_deref(), Some("DH002"));
        assert_eq!(ids[1].as_deref(), Some("DH001"));
        assert_eq!(sub.numbers("depth").unwrap()[0], 25.5);
    }
}
