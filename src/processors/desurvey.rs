//! Desurvey engine: converts depth-interval samples into absolute 3D
//! coordinates by integrating each hole's directional survey.
//!
//! Per hole the engine sorts survey stations, synthesizes a surface
//! station when absent, integrates the trajectory with the balanced
//! tangential method, and interpolates interval midpoints against the
//! trajectory's depth axis. Holes are independent, so above a size
//! threshold they are dispatched in contiguous chunks across a rayon
//! worker pool. A failure inside one hole is recorded as a warning and
//! never aborts the run; only a run with zero output rows is an error.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::config::DesurveyConfig;
use crate::core::index::{CollarColumns, HoleIndex, IntervalColumns, SurveyColumns};
use crate::core::resolver::{ColumnResolver, ResolveError, Role};
use crate::core::table::{Column, Table, TableError};
use crate::processors::trajectory::{
    ensure_surface_station, integrate, position_at, TrajectoryError,
};

/// Errors that fail a whole desurvey call.
#[derive(Error, Debug)]
pub enum DesurveyError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("unknown role name '{0}' in column mapping")]
    UnknownRole(String),

    #[error("no matching holes found between collar, survey, and assay tables")]
    EmptyResult,

    #[error("failed to build worker pool: {0}")]
    Scheduler(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Errors scoped to a single hole; recovered as warnings.
#[derive(Error, Debug)]
enum HoleError {
    #[error("no survey stations")]
    NoStations,

    #[error("no sample intervals")]
    NoIntervals,

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
}

/// Explicit role-to-column mappings per input table, all optional.
/// Tables without a mapping fall back to heuristic resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesurveyMapping {
    #[serde(default)]
    pub collar: Option<HashMap<String, String>>,
    #[serde(default)]
    pub survey: Option<HashMap<String, String>>,
    #[serde(default)]
    pub assay: Option<HashMap<String, String>>,
}

/// Result of a desurvey run.
#[derive(Debug)]
pub struct DesurveyOutput {
    /// The assay rows that desurveyed successfully, with geometry columns
    /// appended, ordered by (hole id, original row index).
    pub table: Table,
    /// One entry per skipped hole.
    pub warnings: Vec<String>,
    /// Holes that contributed rows.
    pub holes_processed: usize,
    /// Holes skipped with a warning.
    pub holes_skipped: usize,
}

/// Enriched rows for one hole, kept separate until final assembly so
/// workers never touch shared output buffers.
struct HoleRows {
    hole_id: String,
    rows: Vec<usize>,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    collar: (f64, f64, f64),
}

/// Desurvey engine. Construct one per request; holds no cross-call state.
#[derive(Debug, Default)]
pub struct DesurveyEngine {
    config: DesurveyConfig,
}

impl DesurveyEngine {
    pub fn new(config: DesurveyConfig) -> Self {
        Self { config }
    }

    /// Runs the desurvey over three raw tables.
    ///
    /// Column roles are resolved per table, explicit mappings taking
    /// precedence over heuristics. Returns the enriched assay table plus
    /// per-hole warnings; fails only when no hole produces output or when
    /// an explicit mapping is unusable.
    pub fn desurvey(
        &self,
        collars: &Table,
        surveys: &Table,
        assays: &Table,
        mapping: Option<&DesurveyMapping>,
    ) -> Result<DesurveyOutput, DesurveyError> {
        log::info!(
            "desurvey starting: {} collar rows, {} survey rows, {} assay rows",
            collars.num_rows(),
            surveys.num_rows(),
            assays.num_rows()
        );

        let (collar_cols, survey_cols, assay_cols) =
            resolve_columns(collars, surveys, assays, mapping)?;

        log::debug!(
            "using columns: collar={:?} survey={:?} assay={:?}",
            collar_cols,
            survey_cols,
            assay_cols
        );

        let index = HoleIndex::build(
            collars,
            &collar_cols,
            surveys,
            &survey_cols,
            assays,
            &assay_cols,
        );
        let holes = index.collar_holes();
        log::info!("grouped {} holes", holes.len());

        let workers = self.config.effective_workers();
        let parallel = self.config.use_parallel
            && workers > 1
            && holes.len() > self.config.parallel_threshold;

        let (mut results, warnings) = if parallel {
            log::info!("processing {} holes on {} workers", holes.len(), workers);
            run_parallel(&holes, &index, workers)?
        } else {
            log::info!("processing {} holes sequentially", holes.len());
            run_chunk(&holes, &index)
        };

        if results.is_empty() {
            return Err(DesurveyError::EmptyResult);
        }

        // Deterministic output order regardless of chunk scheduling.
        results.sort_by(|a, b| a.hole_id.cmp(&b.hole_id));

        let holes_processed = results.len();
        let holes_skipped = warnings.len();

        let mut indices = Vec::new();
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut z = Vec::new();
        let mut ce = Vec::new();
        let mut cn = Vec::new();
        let mut cz = Vec::new();

        for hole in &results {
            indices.extend_from_slice(&hole.rows);
            x.extend_from_slice(&hole.x);
            y.extend_from_slice(&hole.y);
            z.extend_from_slice(&hole.z);
            ce.extend(std::iter::repeat(hole.collar.0).take(hole.rows.len()));
            cn.extend(std::iter::repeat(hole.collar.1).take(hole.rows.len()));
            cz.extend(std::iter::repeat(hole.collar.2).take(hole.rows.len()));
        }

        let mut table = assays.take_rows(&indices);
        table.push_column("x", Column::Number(x))?;
        table.push_column("y", Column::Number(y))?;
        table.push_column("z", Column::Number(z))?;
        table.push_column("collar_easting", Column::Number(ce))?;
        table.push_column("collar_northing", Column::Number(cn))?;
        table.push_column("collar_elevation", Column::Number(cz))?;

        log::info!(
            "desurvey complete: {} rows from {} holes ({} skipped)",
            table.num_rows(),
            holes_processed,
            holes_skipped
        );

        Ok(DesurveyOutput {
            table,
            warnings,
            holes_processed,
            holes_skipped,
        })
    }
}

fn role_map(
    raw: Option<&HashMap<String, String>>,
) -> Result<Option<HashMap<Role, String>>, DesurveyError> {
    let Some(raw) = raw else { return Ok(None) };
    let mut map = HashMap::with_capacity(raw.len());
    for (name, column) in raw {
        let role = Role::from_name(name).ok_or_else(|| DesurveyError::UnknownRole(name.clone()))?;
        map.insert(role, column.clone());
    }
    Ok(Some(map))
}

fn resolve_columns(
    collars: &Table,
    surveys: &Table,
    assays: &Table,
    mapping: Option<&DesurveyMapping>,
) -> Result<(CollarColumns, SurveyColumns, IntervalColumns), DesurveyError> {
    let collar_explicit = role_map(mapping.and_then(|m| m.collar.as_ref()))?;
    let survey_explicit = role_map(mapping.and_then(|m| m.survey.as_ref()))?;
    let assay_explicit = role_map(mapping.and_then(|m| m.assay.as_ref()))?;

    let collar = ColumnResolver::resolve(
        collars.column_names(),
        &[Role::HoleId, Role::Easting, Role::Northing, Role::Elevation],
        collar_explicit.as_ref(),
    )?;
    let survey = ColumnResolver::resolve(
        surveys.column_names(),
        &[Role::HoleId, Role::Depth, Role::Dip, Role::Azimuth],
        survey_explicit.as_ref(),
    )?;
    let assay = ColumnResolver::resolve(
        assays.column_names(),
        &[Role::HoleId, Role::From, Role::To],
        assay_explicit.as_ref(),
    )?;

    Ok((
        CollarColumns {
            hole: collar[&Role::HoleId].clone(),
            easting: collar[&Role::Easting].clone(),
            northing: collar[&Role::Northing].clone(),
            elevation: collar[&Role::Elevation].clone(),
        },
        SurveyColumns {
            hole: survey[&Role::HoleId].clone(),
            depth: survey[&Role::Depth].clone(),
            dip: survey[&Role::Dip].clone(),
            azimuth: survey[&Role::Azimuth].clone(),
        },
        IntervalColumns {
            hole: assay[&Role::HoleId].clone(),
            from: assay[&Role::From].clone(),
            to: assay[&Role::To].clone(),
        },
    ))
}

/// Processes one contiguous chunk of holes sequentially, collecting
/// per-hole successes and skip warnings.
fn run_chunk(holes: &[String], index: &HoleIndex) -> (Vec<HoleRows>, Vec<String>) {
    let mut results = Vec::with_capacity(holes.len());
    let mut warnings = Vec::new();

    for hole_id in holes {
        match process_hole(hole_id, index) {
            Ok(rows) => results.push(rows),
            Err(e) => {
                log::debug!("skipping hole {}: {}", hole_id, e);
                warnings.push(format!("hole {}: {}", hole_id, e));
            }
        }
    }

    (results, warnings)
}

/// Splits the hole list into contiguous chunks and runs them on a
/// dedicated rayon pool. Chunks share only immutable borrows of the
/// index; each returns its own buffers, merged after the join.
fn run_parallel(
    holes: &[String],
    index: &HoleIndex,
    workers: usize,
) -> Result<(Vec<HoleRows>, Vec<String>), DesurveyError> {
    let chunk_size = (holes.len() / (workers * 4)).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| DesurveyError::Scheduler(e.to_string()))?;

    log::info!(
        "dispatching {} holes in {} chunks of ~{}",
        holes.len(),
        holes.len().div_ceil(chunk_size),
        chunk_size
    );

    let chunk_outputs: Vec<(Vec<HoleRows>, Vec<String>)> = pool.install(|| {
        holes
            .par_chunks(chunk_size)
            .map(|chunk| run_chunk(chunk, index))
            .collect()
    });

    let mut results = Vec::with_capacity(holes.len());
    let mut warnings = Vec::new();
    for (chunk_results, chunk_warnings) in chunk_outputs {
        results.extend(chunk_results);
        warnings.extend(chunk_warnings);
    }

    Ok((results, warnings))
}

/// Desurveys a single hole: trajectory integration plus midpoint
/// interpolation for every interval, in original row order.
fn process_hole(hole_id: &str, index: &HoleIndex) -> Result<HoleRows, HoleError> {
    let stations = index.stations(hole_id);
    if stations.is_empty() {
        return Err(HoleError::NoStations);
    }
    let mut intervals: Vec<_> = index.intervals(hole_id).to_vec();
    if intervals.is_empty() {
        return Err(HoleError::NoIntervals);
    }

    // Collar holes always have a collar record; treat a vanished one as a
    // missing-station condition rather than panicking.
    let collar = index.collar(hole_id).ok_or(HoleError::NoStations)?;
    let origin = (collar.easting, collar.northing, collar.elevation);

    let stations = ensure_surface_station(stations);
    let trajectory = integrate(origin, &stations)?;

    // Output rows follow the source table's order within the hole.
    intervals.sort_by_key(|iv| iv.row);

    let n = intervals.len();
    let mut rows = Vec::with_capacity(n);
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);

    for interval in &intervals {
        let (px, py, pz) = position_at(&trajectory, interval.midpoint());
        rows.push(interval.row);
        x.push(px);
        y.push(py);
        z.push(pz);
    }

    Ok(HoleRows {
        hole_id: hole_id.to_string(),
        rows,
        x,
        y,
        z,
        collar: origin,
    })
}
