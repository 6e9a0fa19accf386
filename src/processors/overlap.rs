//! Detection of internally overlapping logging intervals.
//!
//! Logging data is supposed to partition each hole's depth range; two
//! intervals claiming the same depths make any category merge ambiguous.
//! This scan reports such conflicts before matching so users can clean
//! their logging table or pick a strategy that tolerates overlaps.

use serde::Serialize;
use thiserror::Error;

use crate::core::index::{group_intervals, IntervalColumns};
use crate::core::resolver::{ColumnResolver, ResolveError, Role};
use crate::core::table::Table;

/// Number of concrete overlap examples included in a report.
const MAX_SAMPLE_OVERLAPS: usize = 5;

#[derive(Error, Debug)]
pub enum OverlapError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("category column '{0}' not found in logging table")]
    MissingCategoryColumn(String),
}

/// One concrete pair of overlapping intervals.
#[derive(Debug, Clone, Serialize)]
pub struct OverlapExample {
    pub hole_id: String,
    /// Depth range both intervals claim.
    pub overlap_from: f64,
    pub overlap_to: f64,
    pub log_values: Vec<String>,
    pub log_froms: Vec<f64>,
    pub log_tos: Vec<f64>,
}

/// Summary of internal overlaps across a logging table.
#[derive(Debug, Clone, Serialize)]
pub struct OverlapReport {
    pub has_overlaps: bool,
    pub overlap_count: usize,
    pub holes_with_overlaps: Vec<String>,
    /// Sorted distinct category values involved in any overlap.
    pub overlapping_values: Vec<String>,
    pub sample_overlaps: Vec<OverlapExample>,
}

/// Scans a logging table for intervals that overlap within the same hole.
///
/// Each hole's intervals are sorted by start depth; for every interval the
/// forward scan stops at the first later interval starting at or past its
/// end, which sortedness guarantees is the last possible overlap.
pub fn detect_internal_overlaps(
    logging: &Table,
    category_column: Option<&str>,
) -> Result<OverlapReport, OverlapError> {
    let resolved = ColumnResolver::resolve(
        logging.column_names(),
        &[Role::HoleId, Role::From, Role::To],
        None,
    )?;
    let cols = IntervalColumns {
        hole: resolved[&Role::HoleId].clone(),
        from: resolved[&Role::From].clone(),
        to: resolved[&Role::To].clone(),
    };

    let category_col = match category_column {
        Some(name) => {
            if logging.column(name).is_none() {
                return Err(OverlapError::MissingCategoryColumn(name.to_string()));
            }
            name.to_string()
        }
        None => {
            ColumnResolver::resolve(logging.column_names(), &[Role::Category], None)?
                [&Role::Category]
                .clone()
        }
    };

    let groups = group_intervals(logging, &cols);
    let mut holes: Vec<&String> = groups.keys().collect();
    holes.sort();

    let category = |row: usize| -> String {
        logging
            .column(&category_col)
            .and_then(|c| c.text(row))
            .unwrap_or_default()
    };

    let mut overlap_count = 0usize;
    let mut holes_with_overlaps: Vec<String> = Vec::new();
    let mut overlapping_values = std::collections::BTreeSet::new();
    let mut sample_overlaps = Vec::new();

    for hole_id in holes {
        let intervals = &groups[hole_id];

        for i in 0..intervals.len().saturating_sub(1) {
            for j in (i + 1)..intervals.len() {
                // Sorted by from, so once an interval starts at or past
                // to[i] nothing further can overlap interval i.
                if intervals[j].from_depth >= intervals[i].to_depth {
                    break;
                }

                overlap_count += 1;
                if holes_with_overlaps.last() != Some(hole_id) {
                    holes_with_overlaps.push(hole_id.clone());
                }
                let cat_i = category(intervals[i].row);
                let cat_j = category(intervals[j].row);
                overlapping_values.insert(cat_i.clone());
                overlapping_values.insert(cat_j.clone());

                if sample_overlaps.len() < MAX_SAMPLE_OVERLAPS {
                    sample_overlaps.push(OverlapExample {
                        hole_id: hole_id.clone(),
                        overlap_from: intervals[j].from_depth,
                        overlap_to: intervals[i].to_depth.min(intervals[j].to_depth),
                        log_values: vec![cat_i, cat_j],
                        log_froms: vec![intervals[i].from_depth, intervals[j].from_depth],
                        log_tos: vec![intervals[i].to_depth, intervals[j].to_depth],
                    });
                }
            }
        }
    }

    log::info!(
        "overlap scan: {} overlaps across {} holes",
        overlap_count,
        holes_with_overlaps.len()
    );

    Ok(OverlapReport {
        has_overlaps: overlap_count > 0,
        overlap_count,
        holes_with_overlaps,
        overlapping_values: overlapping_values.into_iter().collect(),
        sample_overlaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Column;

    fn logging_table(rows: &[(&str, f64, f64, &str)]) -> Table {
        let mut t = Table::new();
        t.push_column(
            "hole_id",
            Column::Text(rows.iter().map(|r| Some(r.0.to_string())).collect()),
        )
        .unwrap();
        t.push_column("from", Column::Number(rows.iter().map(|r| r.1).collect()))
            .unwrap();
        t.push_column("to", Column::Number(rows.iter().map(|r| r.2).collect()))
            .unwrap();
        t.push_column(
            "lithology",
            Column::Text(rows.iter().map(|r| Some(r.3.to_string())).collect()),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_detects_single_overlap() {
        let logging = logging_table(&[("DH001", 0.0, 10.0, "A"), ("DH001", 5.0, 15.0, "B")]);

        let report = detect_internal_overlaps(&logging, Some("lithology")).unwrap();
        assert!(report.has_overlaps);
        assert_eq!(report.overlap_count, 1);
        assert_eq!(report.holes_with_overlaps, vec!["DH001"]);
        assert_eq!(report.overlapping_values, vec!["A", "B"]);

        let example = &report.sample_overlaps[0];
        assert_eq!(example.overlap_from, 5.0);
        assert_eq!(example.overlap_to, 10.0);
        assert_eq!(example.log_values, vec!["A", "B"]);
    }

    #[test]
    fn test_clean_partition_has_no_overlaps() {
        let logging = logging_table(&[
            ("DH001", 0.0, 10.0, "A"),
            ("DH001", 10.0, 20.0, "B"),
            ("DH002", 0.0, 5.0, "C"),
        ]);

        let report = detect_internal_overlaps(&logging, Some("lithology")).unwrap();
        assert!(!report.has_overlaps);
        assert_eq!(report.overlap_count, 0);
        assert!(report.holes_with_overlaps.is_empty());
        assert!(report.sample_overlaps.is_empty());
    }

    #[test]
    fn test_overlaps_do_not_cross_holes() {
        // Same depth ranges in different holes never conflict.
        let logging = logging_table(&[("DH001", 0.0, 10.0, "A"), ("DH002", 5.0, 15.0, "B")]);

        let report = detect_internal_overlaps(&logging, Some("lithology")).unwrap();
        assert_eq!(report.overlap_count, 0);
    }

    #[test]
    fn test_one_interval_spanning_many() {
        let logging = logging_table(&[
            ("DH001", 0.0, 30.0, "Cover"),
            ("DH001", 5.0, 10.0, "A"),
            ("DH001", 10.0, 20.0, "B"),
        ]);

        let report = detect_internal_overlaps(&logging, Some("lithology")).unwrap();
        // Cover overlaps A and B; A and B touch but do not overlap.
        assert_eq!(report.overlap_count, 2);
        assert_eq!(report.overlapping_values, vec!["A", "B", "Cover"]);
    }

    #[test]
    fn test_sample_overlaps_capped_at_five() {
        let mut rows = Vec::new();
        for i in 0..10 {
            let start = i as f64 * 10.0;
            rows.push(("DH001", start, start + 15.0, "X"));
        }
        let logging = logging_table(&rows);

        let report = detect_internal_overlaps(&logging, Some("lithology")).unwrap();
        assert!(report.overlap_count > 5);
        assert_eq!(report.sample_overlaps.len(), 5);
    }

    #[test]
    fn test_missing_category_column() {
        let logging = logging_table(&[("DH001", 0.0, 10.0, "A")]);
        let err = detect_internal_overlaps(&logging, Some("nope")).unwrap_err();
        assert!(matches!(err, OverlapError::MissingCategoryColumn(_)));
    }
}
