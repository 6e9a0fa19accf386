//! Writers for enriched tables (CSV) and reports (JSON).

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::core::table::Table;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// JSON serialization error.
    #[error("JSON write error for '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write a table to CSV with a header row.
///
/// Missing values (NaN numbers, absent text) become empty cells.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<()> {
    ensure_parent_dirs(path)?;
    let path_str = path.display().to_string();

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer
        .write_record(table.column_names())
        .map_err(|e| WriteError::Csv {
            path: path_str.clone(),
            source: e,
        })?;

    let columns: Vec<_> = table.columns().map(|(_, col)| col).collect();

    for row in 0..table.num_rows() {
        let record: Vec<String> = columns
            .iter()
            .map(|col| col.text(row).unwrap_or_default())
            .collect();
        writer.write_record(&record).map_err(|e| WriteError::Csv {
            path: path_str.clone(),
            source: e,
        })?;
    }

    writer.flush().map_err(|e| WriteError::CreateFile {
        path: path_str,
        source: e,
    })?;
    Ok(())
}

/// Write a report structure as pretty-printed JSON.
pub fn write_report_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    ensure_parent_dirs(path)?;
    let path_str = path.display().to_string();

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), report).map_err(|e| WriteError::Json {
        path: path_str,
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::load_table_csv;
    use crate::core::table::Column;
    use tempfile::TempDir;

    #[test]
    fn test_csv_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.csv");

        let mut table = Table::new();
        table
            .push_column(
                "hole_id",
                Column::Text(vec![Some("DH001".to_string()), None]),
            )
            .unwrap();
        table
            .push_column("depth", Column::Number(vec![12.5, f64::NAN]))
            .unwrap();
        write_table_csv(&path, &table).unwrap();

        let loaded = load_table_csv(&path).unwrap();
        assert_eq!(loaded.num_rows(), 2);
        assert_eq!(loaded.numbers("depth").unwrap()[0], 12.5);
        assert!(loaded.numbers("depth").unwrap()[1].is_nan());
        assert_eq!(loaded.values_as_text("hole_id").unwrap()[1], None);
    }

    #[test]
    fn test_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/out.csv");

        let mut table = Table::new();
        table
            .push_column("x", Column::Number(vec![1.0]))
            .unwrap();
        write_table_csv(&path, &table).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_report_json() {
        #[derive(Serialize)]
        struct Report {
            matched_rows: usize,
        }

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");
        write_report_json(&path, &Report { matched_rows: 7 }).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"matched_rows\": 7"));
    }
}
