//! Per-hole lookup structures built once from raw tables.
//!
//! Desurvey and interval matching both iterate holes; scanning the full
//! tables per hole would be O(M×N). The [`HoleIndex`] groups each table by
//! hole id in a single pass so all per-hole lookups are O(1) amortized.
//! Holes present in one table but absent in another stay queryable and
//! simply yield empty results.

use std::collections::HashMap;

use crate::core::table::Table;

/// Surface location where a drillhole begins.
#[derive(Debug, Clone, PartialEq)]
pub struct Collar {
    pub hole_id: String,
    pub easting: f64,
    pub northing: f64,
    pub elevation: f64,
}

/// A depth-tagged directional reading along a hole.
///
/// Dip is in degrees with negative meaning downward; azimuth is in degrees
/// clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurveyStation {
    pub depth: f64,
    pub dip: f64,
    pub azimuth: f64,
}

/// A depth interval row (assay or logging), keeping its source row index
/// so derived values can be written back against the original table.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRow {
    /// Row index in the source table.
    pub row: usize,
    pub from_depth: f64,
    pub to_depth: f64,
}

impl IntervalRow {
    /// Interval length; may be non-positive for malformed rows.
    #[inline]
    pub fn length(&self) -> f64 {
        self.to_depth - self.from_depth
    }

    /// Depth midpoint used for coordinate interpolation.
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.from_depth + self.to_depth) / 2.0
    }
}

/// Resolved column names for a collar table.
#[derive(Debug, Clone)]
pub struct CollarColumns {
    pub hole: String,
    pub easting: String,
    pub northing: String,
    pub elevation: String,
}

/// Resolved column names for a survey table.
#[derive(Debug, Clone)]
pub struct SurveyColumns {
    pub hole: String,
    pub depth: String,
    pub dip: String,
    pub azimuth: String,
}

/// Resolved column names for an interval table (assay or logging).
#[derive(Debug, Clone)]
pub struct IntervalColumns {
    pub hole: String,
    pub from: String,
    pub to: String,
}

/// Pulls a numeric value out of any column type at `row`.
fn numeric_at(table: &Table, column: &str, row: usize) -> f64 {
    match table.column(column) {
        Some(col) => match col.number(row) {
            Some(v) => v,
            // Text columns may still hold parseable numbers.
            None => col
                .text(row)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN),
        },
        None => f64::NAN,
    }
}

/// Groups collar rows by hole id. Rows with a missing hole id are dropped;
/// a hole appearing twice keeps its first row.
pub fn group_collars(table: &Table, cols: &CollarColumns) -> HashMap<String, Collar> {
    let ids = table.values_as_text(&cols.hole).unwrap_or_default();
    let mut collars = HashMap::with_capacity(ids.len());

    for (row, id) in ids.iter().enumerate() {
        let Some(id) = id else { continue };
        collars.entry(id.clone()).or_insert_with(|| Collar {
            hole_id: id.clone(),
            easting: numeric_at(table, &cols.easting, row),
            northing: numeric_at(table, &cols.northing, row),
            elevation: numeric_at(table, &cols.elevation, row),
        });
    }

    collars
}

/// Groups survey rows by hole id, sorting each hole's stations by depth.
pub fn group_stations(table: &Table, cols: &SurveyColumns) -> HashMap<String, Vec<SurveyStation>> {
    let ids = table.values_as_text(&cols.hole).unwrap_or_default();
    let mut stations: HashMap<String, Vec<SurveyStation>> = HashMap::new();

    for (row, id) in ids.iter().enumerate() {
        let Some(id) = id else { continue };
        stations.entry(id.clone()).or_default().push(SurveyStation {
            depth: numeric_at(table, &cols.depth, row),
            dip: numeric_at(table, &cols.dip, row),
            azimuth: numeric_at(table, &cols.azimuth, row),
        });
    }

    for group in stations.values_mut() {
        group.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    }

    stations
}

/// Groups interval rows by hole id, sorting each hole's intervals by their
/// start depth while retaining original row indices.
pub fn group_intervals(table: &Table, cols: &IntervalColumns) -> HashMap<String, Vec<IntervalRow>> {
    let ids = table.values_as_text(&cols.hole).unwrap_or_default();
    let mut intervals: HashMap<String, Vec<IntervalRow>> = HashMap::new();

    for (row, id) in ids.iter().enumerate() {
        let Some(id) = id else { continue };
        intervals.entry(id.clone()).or_default().push(IntervalRow {
            row,
            from_depth: numeric_at(table, &cols.from, row),
            to_depth: numeric_at(table, &cols.to, row),
        });
    }

    for group in intervals.values_mut() {
        group.sort_by(|a, b| a.from_depth.total_cmp(&b.from_depth));
    }

    intervals
}

/// Combined per-hole index over collar, survey, and interval tables.
#[derive(Debug, Default)]
pub struct HoleIndex {
    collars: HashMap<String, Collar>,
    stations: HashMap<String, Vec<SurveyStation>>,
    intervals: HashMap<String, Vec<IntervalRow>>,
}

impl HoleIndex {
    /// Builds the index from already-grouped tables. O(n log n) overall
    /// (one sort per hole group); lookups afterwards are O(1) amortized.
    pub fn build(
        collar_table: &Table,
        collar_cols: &CollarColumns,
        survey_table: &Table,
        survey_cols: &SurveyColumns,
        interval_table: &Table,
        interval_cols: &IntervalColumns,
    ) -> Self {
        Self {
            collars: group_collars(collar_table, collar_cols),
            stations: group_stations(survey_table, survey_cols),
            intervals: group_intervals(interval_table, interval_cols),
        }
    }

    /// Collar for a hole, if the collar table has it.
    pub fn collar(&self, hole_id: &str) -> Option<&Collar> {
        self.collars.get(hole_id)
    }

    /// Survey stations for a hole, sorted by depth. Empty slice for
    /// unknown holes.
    pub fn stations(&self, hole_id: &str) -> &[SurveyStation] {
        self.stations.get(hole_id).map_or(&[], |v| v.as_slice())
    }

    /// Intervals for a hole, sorted by start depth. Empty slice for
    /// unknown holes.
    pub fn intervals(&self, hole_id: &str) -> &[IntervalRow] {
        self.intervals.get(hole_id).map_or(&[], |v| v.as_slice())
    }

    /// Hole ids present in the collar table, sorted for deterministic
    /// iteration order.
    pub fn collar_holes(&self) -> Vec<String> {
        let mut holes: Vec<String> = self.collars.keys().cloned().collect();
        holes.sort();
        holes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Column;

    fn collar_cols() -> CollarColumns {
        CollarColumns {
            hole: "hole_id".into(),
            easting: "easting".into(),
            northing: "northing".into(),
            elevation: "rl".into(),
        }
    }

    fn survey_cols() -> SurveyColumns {
        SurveyColumns {
            hole: "hole_id".into(),
            depth: "depth".into(),
            dip: "dip".into(),
            azimuth: "azimuth".into(),
        }
    }

    fn interval_cols() -> IntervalColumns {
        IntervalColumns {
            hole: "hole_id".into(),
            from: "from".into(),
            to: "to".into(),
        }
    }

    fn text(values: &[&str]) -> Column {
        Column::Text(values.iter().map(|s| Some(s.to_string())).collect())
    }

    fn build_index() -> HoleIndex {
        let mut collars = Table::new();
        collars.push_column("hole_id", text(&["DH001", "DH002"])).unwrap();
        collars
            .push_column("easting", Column::Number(vec![1000.0, 2000.0]))
            .unwrap();
        collars
            .push_column("northing", Column::Number(vec![5000.0, 6000.0]))
            .unwrap();
        collars
            .push_column("rl", Column::Number(vec![100.0, 200.0]))
            .unwrap();

        // Survey rows intentionally out of depth order.
        let mut surveys = Table::new();
        surveys
            .push_column("hole_id", text(&["DH001", "DH001", "DH001"]))
            .unwrap();
        surveys
            .push_column("depth", Column::Number(vec![50.0, 0.0, 25.0]))
            .unwrap();
        surveys
            .push_column("dip", Column::Number(vec![-62.0, -60.0, -61.0]))
            .unwrap();
        surveys
            .push_column("azimuth", Column::Number(vec![92.0, 90.0, 91.0]))
            .unwrap();

        let mut assays = Table::new();
        assays.push_column("hole_id", text(&["DH001", "DH001"])).unwrap();
        assays
            .push_column("from", Column::Number(vec![10.0, 0.0]))
            .unwrap();
        assays
            .push_column("to", Column::Number(vec![20.0, 10.0]))
            .unwrap();

        HoleIndex::build(
            &collars,
            &collar_cols(),
            &surveys,
            &survey_cols(),
            &assays,
            &interval_cols(),
        )
    }

    #[test]
    fn test_collar_lookup() {
        let index = build_index();
        let collar = index.collar("DH002").unwrap();
        assert_eq!(collar.easting, 2000.0);
        assert!(index.collar("DH999").is_none());
    }

    #[test]
    fn test_stations_sorted_by_depth() {
        let index = build_index();
        let stations = index.stations("DH001");
        let depths: Vec<f64> = stations.iter().map(|s| s.depth).collect();
        assert_eq!(depths, vec![0.0, 25.0, 50.0]);
    }

    #[test]
    fn test_intervals_sorted_with_row_indices() {
        let index = build_index();
        let intervals = index.intervals("DH001");
        assert_eq!(intervals[0].from_depth, 0.0);
        assert_eq!(intervals[0].row, 1);
        assert_eq!(intervals[1].row, 0);
        assert_eq!(intervals[1].midpoint(), 15.0);
    }

    #[test]
    fn test_missing_hole_yields_empty_not_error() {
        let index = build_index();
        assert!(index.stations("DH002").is_empty());
        assert!(index.intervals("DH002").is_empty());
        assert!(index.collar("DH002").is_some());
    }

    #[test]
    fn test_collar_holes_sorted() {
        let index = build_index();
        assert_eq!(index.collar_holes(), vec!["DH001", "DH002"]);
    }
}
