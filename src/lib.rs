//! Drillhole desurvey and interval-matching pipeline.
//!
//! This crate provides tools for:
//! - Loading drilling tables (collar, survey, assay, logging) from CSV
//! - Resolving column roles across inconsistent naming conventions
//! - Desurveying interval samples to 3D coordinates (balanced tangential,
//!   parallelized across holes)
//! - Merging categorical logging intervals onto assay intervals by depth
//!   overlap, with QAQC reporting
//! - Detecting internally overlapping logging intervals
//!
//! # Example
//!
//! ```no_run
//! use drillhole_pipeline::{core::loaders::load_table_csv, DesurveyEngine};
//!
//! let collars = load_table_csv("collar.csv").unwrap();
//! let surveys = load_table_csv("survey.csv").unwrap();
//! let assays = load_table_csv("assay.csv").unwrap();
//!
//! let engine = DesurveyEngine::default();
//! let out = engine.desurvey(&collars, &surveys, &assays, None).unwrap();
//! println!("{} rows desurveyed", out.table.num_rows());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{DesurveyConfig, MatchConfig, PipelineConfig};
pub use core::table::{Column, Table};
pub use processors::{DesurveyEngine, IntervalMatcher, MergeStrategy};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
