//! Interval matching engine: merges categorical logging intervals onto
//! assay intervals by depth-range overlap.
//!
//! For every hole common to both datasets an n_assay × n_log overlap
//! matrix is computed and one of three merge strategies applied. A QAQC
//! report (match rates, low-overlap counts, logging gaps and internal
//! overlaps) is produced on every call regardless of strategy.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MatchConfig;
use crate::core::index::{group_intervals, IntervalColumns, IntervalRow};
use crate::core::resolver::{ColumnResolver, ResolveError, Role};
use crate::core::table::{Column, Table, TableError};

/// Depth tolerance for gap/overlap detection between adjacent logging
/// intervals.
pub const DEPTH_EPSILON: f64 = 0.001;

/// Errors that fail a whole match call.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("category column '{0}' not found in logging table")]
    MissingCategoryColumn(String),

    #[error("no holes shared between assay and logging tables")]
    EmptyResult,
}

/// How overlapping logging categories are merged onto an assay row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Single column holding the category with the greatest overlap.
    #[default]
    MaxOverlap,
    /// One Yes/No column per distinct category value.
    SplitColumns,
    /// Single column with all matching categories joined by `" | "`.
    CombineCodes,
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max_overlap" => Ok(MergeStrategy::MaxOverlap),
            "split_columns" => Ok(MergeStrategy::SplitColumns),
            "combine_codes" => Ok(MergeStrategy::CombineCodes),
            other => Err(format!(
                "unknown strategy '{other}' (expected max_overlap, split_columns, or combine_codes)"
            )),
        }
    }
}

/// Per-hole match statistics.
#[derive(Debug, Clone, Serialize)]
pub struct HoleMatchSummary {
    pub hole_id: String,
    pub assay_count: usize,
    pub matched_count: usize,
    pub match_pct: f64,
    pub avg_overlap_pct: f64,
    pub gaps: usize,
    pub overlaps: usize,
}

/// Gap and internal-overlap diagnostics over the logging intervals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoggingIntegrity {
    pub total_gaps: usize,
    pub total_overlaps: usize,
    pub holes_with_gaps: Vec<String>,
    pub holes_with_overlaps: Vec<String>,
}

/// Aggregate data-quality report for one match call.
#[derive(Debug, Clone, Serialize)]
pub struct QaqcReport {
    pub holes_in_logging_not_in_assay: Vec<String>,
    pub holes_in_assay_not_in_logging: Vec<String>,
    pub total_assay_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    /// Matched rows whose best overlap is below 50%.
    pub low_overlap_count: usize,
    pub avg_overlap_pct: f64,
    pub per_hole_summary: Vec<HoleMatchSummary>,
    pub logging_integrity: LoggingIntegrity,
}

/// Result of an interval matching run.
#[derive(Debug)]
pub struct MatchOutput {
    /// Generated column names, in output order.
    pub columns_added: Vec<String>,
    /// Column name -> values aligned to assay rows.
    pub new_columns: Vec<(String, Vec<Option<String>>)>,
    /// Best overlap percentage per assay row (0 when unmatched).
    pub overlap_pcts: Vec<f64>,
    /// Non-fatal conditions (malformed intervals excluded from matching).
    pub warnings: Vec<String>,
    pub qaqc: QaqcReport,
}

impl MatchOutput {
    /// Appends the generated columns to a copy of the assay table. A
    /// generated column whose name already exists there replaces it, so
    /// re-running a match over previously enriched output is safe.
    pub fn apply_to(&self, assays: &Table) -> Result<Table, TableError> {
        let mut table = assays.clone();
        for (name, values) in &self.new_columns {
            table.put_column(name, Column::Text(values.clone()))?;
        }
        Ok(table)
    }
}

/// Interval matching engine. Construct one per request.
#[derive(Debug, Default)]
pub struct IntervalMatcher {
    config: MatchConfig,
}

/// Valid (positive-length) intervals of one hole with their categories.
struct HoleLogging {
    from: Vec<f64>,
    to: Vec<f64>,
    categories: Vec<Option<String>>,
}

impl IntervalMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Matches logging intervals onto assay intervals.
    ///
    /// Hole/from/to columns are resolved heuristically on both tables.
    /// `category_column` names the logging column carrying the categorical
    /// label; when `None` it is resolved heuristically too.
    pub fn match_intervals(
        &self,
        assays: &Table,
        logging: &Table,
        category_column: Option<&str>,
    ) -> Result<MatchOutput, MatchError> {
        let assay_cols = resolve_interval_columns(assays)?;
        let log_cols = resolve_interval_columns(logging)?;
        let category_col = resolve_category_column(logging, category_column)?;

        log::info!(
            "matching intervals: {} assay rows, {} logging rows, strategy={:?}",
            assays.num_rows(),
            logging.num_rows(),
            self.config.strategy
        );

        let assay_groups = group_intervals(assays, &assay_cols);
        let log_groups = group_intervals(logging, &log_cols);

        let assay_holes: HashSet<&String> = assay_groups.keys().collect();
        let log_holes: HashSet<&String> = log_groups.keys().collect();

        let mut holes_in_log_not_assay: Vec<String> =
            log_holes.difference(&assay_holes).map(|s| (*s).clone()).collect();
        holes_in_log_not_assay.sort();
        let mut holes_in_assay_not_log: Vec<String> =
            assay_holes.difference(&log_holes).map(|s| (*s).clone()).collect();
        holes_in_assay_not_log.sort();
        let mut common_holes: Vec<String> =
            assay_holes.intersection(&log_holes).map(|s| (*s).clone()).collect();
        common_holes.sort();

        if common_holes.is_empty() {
            return Err(MatchError::EmptyResult);
        }

        let n_assay = assays.num_rows();
        let unique_values = distinct_categories(logging, &category_col);
        let base_name = if self.config.column_prefix.is_empty() {
            category_col.clone()
        } else {
            self.config.column_prefix.clone()
        };

        // Generated columns, pre-filled with the per-strategy default.
        // Distinct category values can collide after space stripping
        // ("Qtz Vein" and "QtzVein"); colliding values share one column.
        let mut col_data: Vec<(String, Vec<Option<String>>)> = match self.config.strategy {
            MergeStrategy::SplitColumns => {
                let mut cols: Vec<(String, Vec<Option<String>>)> = Vec::new();
                let mut seen: HashSet<String> = HashSet::new();
                for val in &unique_values {
                    let name = split_column_name(&base_name, val);
                    if seen.insert(name.clone()) {
                        cols.push((name, vec![Some("No".to_string()); n_assay]));
                    }
                }
                cols
            }
            _ => vec![(base_name.clone(), vec![None; n_assay])],
        };
        let col_index: HashMap<String, usize> = col_data
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();

        let mut overlap_pcts = vec![0.0f64; n_assay];
        let mut warnings = Vec::new();
        let mut per_hole_summaries = Vec::new();
        let mut integrity = LoggingIntegrity::default();
        let mut total_matched = 0usize;
        let mut total_low_overlap = 0usize;
        let mut sum_overlap = 0.0f64;
        let mut sum_overlap_count = 0usize;

        for hole_id in &common_holes {
            let assay_intervals = &assay_groups[hole_id];
            let log_intervals = &log_groups[hole_id];

            let (valid_assays, dropped_assays) = split_valid(assay_intervals);
            let hole_log = collect_hole_logging(log_intervals, logging, &category_col);
            let dropped_logs = log_intervals.len() - hole_log.from.len();
            if dropped_assays > 0 || dropped_logs > 0 {
                warnings.push(format!(
                    "hole {}: excluded {} assay and {} logging intervals with to <= from",
                    hole_id, dropped_assays, dropped_logs
                ));
            }

            let (gaps, overlaps) = logging_integrity(log_intervals);
            integrity.total_gaps += gaps;
            integrity.total_overlaps += overlaps;
            if gaps > 0 {
                integrity.holes_with_gaps.push(hole_id.clone());
            }
            if overlaps > 0 {
                integrity.holes_with_overlaps.push(hole_id.clone());
            }

            if !hole_log.from.is_empty() {
                self.match_hole(
                    &valid_assays,
                    &hole_log,
                    &base_name,
                    &col_index,
                    &mut col_data,
                    &mut overlap_pcts,
                );
            }

            // Per-hole stats over this hole's assay rows.
            let mut matched = 0usize;
            let mut low = 0usize;
            let mut sum = 0.0f64;
            for iv in assay_intervals {
                let pct = overlap_pcts[iv.row];
                if pct > 0.0 {
                    matched += 1;
                    sum += pct;
                    if pct < 50.0 {
                        low += 1;
                    }
                }
            }
            total_matched += matched;
            total_low_overlap += low;
            sum_overlap += sum;
            sum_overlap_count += matched;

            let n_a = assay_intervals.len();
            per_hole_summaries.push(HoleMatchSummary {
                hole_id: hole_id.clone(),
                assay_count: n_a,
                matched_count: matched,
                match_pct: if n_a > 0 {
                    round1(matched as f64 / n_a as f64 * 100.0)
                } else {
                    0.0
                },
                avg_overlap_pct: if matched > 0 {
                    round1(sum / matched as f64)
                } else {
                    0.0
                },
                gaps,
                overlaps,
            });
        }

        // Holes with assays but no logging still appear in the summary.
        for hole_id in &holes_in_assay_not_log {
            per_hole_summaries.push(HoleMatchSummary {
                hole_id: hole_id.clone(),
                assay_count: assay_groups[hole_id].len(),
                matched_count: 0,
                match_pct: 0.0,
                avg_overlap_pct: 0.0,
                gaps: 0,
                overlaps: 0,
            });
        }

        let avg_overlap = if sum_overlap_count > 0 {
            round1(sum_overlap / sum_overlap_count as f64)
        } else {
            0.0
        };

        let qaqc = QaqcReport {
            holes_in_logging_not_in_assay: holes_in_log_not_assay,
            holes_in_assay_not_in_logging: holes_in_assay_not_log,
            total_assay_rows: n_assay,
            matched_rows: total_matched,
            unmatched_rows: n_assay - total_matched,
            low_overlap_count: total_low_overlap,
            avg_overlap_pct: avg_overlap,
            per_hole_summary: per_hole_summaries,
            logging_integrity: integrity,
        };

        log::info!(
            "matching complete: {}/{} rows matched, avg overlap {:.1}%, {} columns added",
            total_matched,
            n_assay,
            avg_overlap,
            col_data.len()
        );

        Ok(MatchOutput {
            columns_added: col_data.iter().map(|(name, _)| name.clone()).collect(),
            new_columns: col_data,
            overlap_pcts,
            warnings,
            qaqc,
        })
    }

    /// Matches one hole, sub-chunking the assay rows when the overlap
    /// matrix would exceed the configured cell budget. Chunking never
    /// changes results; it only bounds peak memory.
    fn match_hole(
        &self,
        assay_intervals: &[IntervalRow],
        hole_log: &HoleLogging,
        base_name: &str,
        col_index: &HashMap<String, usize>,
        col_data: &mut [(String, Vec<Option<String>>)],
        overlap_pcts: &mut [f64],
    ) {
        let n_log = hole_log.from.len();
        let chunk_rows = (self.config.matrix_cell_budget / n_log).max(1);

        for chunk in assay_intervals.chunks(chunk_rows) {
            let matrix = overlap_pct_matrix(chunk, &hole_log.from, &hole_log.to);
            for (interval, row_pcts) in chunk.iter().zip(&matrix) {
                self.apply_strategy(
                    interval.row,
                    row_pcts,
                    hole_log,
                    base_name,
                    col_index,
                    col_data,
                    overlap_pcts,
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_strategy(
        &self,
        row: usize,
        row_pcts: &[f64],
        hole_log: &HoleLogging,
        base_name: &str,
        col_index: &HashMap<String, usize>,
        col_data: &mut [(String, Vec<Option<String>>)],
        overlap_pcts: &mut [f64],
    ) {
        let min_pct = self.config.min_overlap_pct;

        match self.config.strategy {
            MergeStrategy::MaxOverlap => {
                // First maximum wins: equal overlaps resolve to the lowest
                // logging index.
                let mut best_idx = 0usize;
                let mut best_pct = f64::MIN;
                for (j, &pct) in row_pcts.iter().enumerate() {
                    if pct > best_pct {
                        best_pct = pct;
                        best_idx = j;
                    }
                }
                if best_pct > min_pct {
                    if let Some(cat) = &hole_log.categories[best_idx] {
                        overlap_pcts[row] = best_pct;
                        col_data[0].1[row] = Some(cat.clone());
                    }
                }
            }
            MergeStrategy::SplitColumns => {
                let mut best = 0.0f64;
                for (j, &pct) in row_pcts.iter().enumerate() {
                    if pct > min_pct {
                        best = best.max(pct);
                        if let Some(cat) = &hole_log.categories[j] {
                            let name = split_column_name(base_name, cat);
                            if let Some(&ci) = col_index.get(&name) {
                                col_data[ci].1[row] = Some("Yes".to_string());
                            }
                        }
                    }
                }
                if best > 0.0 {
                    overlap_pcts[row] = best;
                }
            }
            MergeStrategy::CombineCodes => {
                let mut best = 0.0f64;
                let mut matched: BTreeSet<String> = BTreeSet::new();
                for (j, &pct) in row_pcts.iter().enumerate() {
                    if pct > min_pct {
                        best = best.max(pct);
                        if let Some(cat) = &hole_log.categories[j] {
                            matched.insert(cat.clone());
                        }
                    }
                }
                if !matched.is_empty() {
                    overlap_pcts[row] = best;
                    let joined: Vec<String> = matched.into_iter().collect();
                    col_data[0].1[row] = Some(joined.join(" | "));
                }
            }
        }
    }
}

fn split_column_name(base: &str, value: &str) -> String {
    format!("{}_{}", base, split_column_name_raw(value))
}

fn split_column_name_raw(value: &str) -> String {
    value.replace(' ', "")
}

/// Percentage overlap matrix for a chunk of assay intervals against all
/// logging intervals:
/// `pct[i][j] = max(0, min(a_to, l_to) - max(a_from, l_from)) / a_len * 100`.
fn overlap_pct_matrix(assays: &[IntervalRow], l_from: &[f64], l_to: &[f64]) -> Vec<Vec<f64>> {
    assays
        .iter()
        .map(|a| {
            let len = a.length();
            l_from
                .iter()
                .zip(l_to)
                .map(|(&lf, &lt)| {
                    let overlap = (a.to_depth.min(lt) - a.from_depth.max(lf)).max(0.0);
                    overlap / len * 100.0
                })
                .collect()
        })
        .collect()
}

/// Counts gaps and internal overlaps between adjacent sorted logging
/// intervals, with a small tolerance for numeric noise. Runs over every
/// interval of the hole; malformed rows are excluded from matching but
/// still count toward integrity, since a broken row is itself a data
/// quality problem.
fn logging_integrity(intervals: &[IntervalRow]) -> (usize, usize) {
    let mut gaps = 0;
    let mut overlaps = 0;
    for w in intervals.windows(2) {
        if w[1].from_depth > w[0].to_depth + DEPTH_EPSILON {
            gaps += 1;
        } else if w[1].from_depth < w[0].to_depth - DEPTH_EPSILON {
            overlaps += 1;
        }
    }
    (gaps, overlaps)
}

/// Separates well-formed intervals from malformed (`to <= from`) ones,
/// returning the kept set and the dropped count.
fn split_valid(intervals: &[IntervalRow]) -> (Vec<IntervalRow>, usize) {
    let valid: Vec<IntervalRow> = intervals
        .iter()
        .filter(|iv| iv.length() > 0.0 && iv.from_depth.is_finite() && iv.to_depth.is_finite())
        .cloned()
        .collect();
    let dropped = intervals.len() - valid.len();
    (valid, dropped)
}

/// Gathers one hole's valid logging intervals with their category labels,
/// preserving sorted-by-from order.
fn collect_hole_logging(
    intervals: &[IntervalRow],
    logging: &Table,
    category_col: &str,
) -> HoleLogging {
    let cat = logging.column(category_col);
    let mut from = Vec::with_capacity(intervals.len());
    let mut to = Vec::with_capacity(intervals.len());
    let mut categories = Vec::with_capacity(intervals.len());

    for iv in intervals {
        if iv.length() <= 0.0 || !iv.from_depth.is_finite() || !iv.to_depth.is_finite() {
            continue;
        }
        from.push(iv.from_depth);
        to.push(iv.to_depth);
        categories.push(cat.and_then(|c| c.text(iv.row)));
    }

    HoleLogging { from, to, categories }
}

/// Sorted distinct category values across the logging table.
fn distinct_categories(logging: &Table, category_col: &str) -> Vec<String> {
    let mut values = BTreeSet::new();
    if let Some(col) = logging.column(category_col) {
        for row in 0..col.len() {
            if let Some(v) = col.text(row) {
                values.insert(v);
            }
        }
    }
    values.into_iter().collect()
}

fn resolve_interval_columns(table: &Table) -> Result<IntervalColumns, ResolveError> {
    let resolved = ColumnResolver::resolve(
        table.column_names(),
        &[Role::HoleId, Role::From, Role::To],
        None,
    )?;
    Ok(IntervalColumns {
        hole: resolved[&Role::HoleId].clone(),
        from: resolved[&Role::From].clone(),
        to: resolved[&Role::To].clone(),
    })
}

fn resolve_category_column(
    logging: &Table,
    category_column: Option<&str>,
) -> Result<String, MatchError> {
    match category_column {
        Some(name) => {
            if logging.column(name).is_none() {
                return Err(MatchError::MissingCategoryColumn(name.to_string()));
            }
            Ok(name.to_string())
        }
        None => {
            let resolved =
                ColumnResolver::resolve(logging.column_names(), &[Role::Category], None)?;
            Ok(resolved[&Role::Category].clone())
        }
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
