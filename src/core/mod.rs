//! Core data types and I/O operations.

pub mod index;
pub mod loaders;
pub mod resolver;
pub mod table;
pub mod writers;

pub use loaders::{load_table_csv, LoaderError};
pub use table::{Column, Table, TableError};
pub use writers::{write_report_json, write_table_csv, WriteError};
