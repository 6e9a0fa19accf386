//! CSV loader producing column-oriented [`Table`]s.
//!
//! The engines themselves never touch the filesystem; this loader exists
//! for the CLI, which plays the role of the surrounding application.
//! Column types are inferred per column: if every non-empty cell parses
//! as a number the column becomes numeric (empty cells as NaN), otherwise
//! it stays text (empty cells as None).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

use crate::core::table::{Column, Table};

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("table construction failed: {0}")]
    Table(#[from] crate::core::table::TableError),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Load a CSV file into a typed table.
///
/// The first row is taken as the header. Rows shorter than the header are
/// padded with missing values; longer rows are truncated. A file with no
/// data rows is an error.
pub fn load_table_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    // Collect raw cells column-wise before deciding types.
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for result in reader.records() {
        let record = result?;
        for (i, column) in cells.iter_mut().enumerate() {
            let value = record.get(i).map(str::trim).filter(|s| !s.is_empty());
            column.push(value.map(str::to_string));
        }
    }

    if cells.first().map_or(true, |c| c.is_empty()) {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    let mut table = Table::new();
    for (name, raw) in headers.iter().zip(cells) {
        table.push_column(name, infer_column(raw))?;
    }

    log::debug!(
        "loaded {}: {} rows x {} columns",
        path.display(),
        table.num_rows(),
        table.num_columns()
    );
    Ok(table)
}

/// Decides a column's type from its raw cells.
fn infer_column(raw: Vec<Option<String>>) -> Column {
    let mut any_value = false;
    let all_numeric = raw.iter().all(|cell| match cell {
        Some(s) => {
            any_value = true;
            s.parse::<f64>().is_ok()
        }
        None => true,
    });

    if all_numeric && any_value {
        Column::Number(
            raw.into_iter()
                .map(|cell| {
                    cell.and_then(|s| s.parse::<f64>().ok())
                        .unwrap_or(f64::NAN)
                })
                .collect(),
        )
    } else {
        Column::Text(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_typed_columns() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hole_id,depth,comment").unwrap();
        writeln!(file, "DH001,0.0,collar").unwrap();
        writeln!(file, "DH001,25.5,").unwrap();
        writeln!(file, "DH002,10,deep").unwrap();
        file.flush().unwrap();

        let table = load_table_csv(file.path())?;
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column_names(), &["hole_id", "depth", "comment"]);

        let depths = table.numbers("depth").unwrap();
        assert_eq!(depths[1], 25.5);

        let comments = table.values_as_text("comment").unwrap();
        assert_eq!(comments[0].as_deref(), Some("collar"));
        assert_eq!(comments[1], None);

        Ok(())
    }

    #[test]
    fn test_numeric_with_missing_cells() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hole_id,rl").unwrap();
        writeln!(file, "DH001,").unwrap();
        writeln!(file, "DH002,150.5").unwrap();
        file.flush().unwrap();

        let table = load_table_csv(file.path())?;
        let rl = table.numbers("rl").unwrap();
        assert!(rl[0].is_nan());
        assert_eq!(rl[1], 150.5);

        Ok(())
    }

    #[test]
    fn test_mixed_column_stays_text() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "code").unwrap();
        writeln!(file, "12").unwrap();
        writeln!(file, "AB3").unwrap();
        file.flush().unwrap();

        let table = load_table_csv(file.path())?;
        assert!(table.numbers("code").is_none());
        let codes = table.values_as_text("code").unwrap();
        assert_eq!(codes[0].as_deref(), Some("12"));

        Ok(())
    }

    #[test]
    fn test_short_rows_padded() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hole_id,from,to").unwrap();
        writeln!(file, "DH001,0,10").unwrap();
        writeln!(file, "DH001,10").unwrap();
        file.flush().unwrap();

        let table = load_table_csv(file.path())?;
        assert_eq!(table.num_rows(), 2);
        assert!(table.numbers("to").unwrap()[1].is_nan());

        Ok(())
    }

    #[test]
    fn test_header_only_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hole_id,depth").unwrap();
        file.flush().unwrap();

        let err = load_table_csv(file.path()).unwrap_err();
        assert!(matches!(err, LoaderError::EmptyFile(_)));
    }
}
