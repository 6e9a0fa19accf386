//! Trajectory integration using the balanced tangential method.
//!
//! Converts a hole's directional survey (depth, dip, azimuth) into
//! absolute 3D station coordinates by averaging adjacent stations' angles
//! over each depth segment and accumulating the increments from the collar
//! origin.
//!
//! The accumulation is a strict sequential recurrence: each station's
//! position depends on the previous one. It must never be parallelized
//! within a hole; parallelism belongs at the per-hole level (see the
//! desurvey engine).

use std::borrow::Cow;

use thiserror::Error;

use crate::core::index::SurveyStation;

/// Errors scoped to a single hole's trajectory.
#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("non-finite survey value at depth {0}")]
    NonFinite(f64),

    #[error("survey depths not strictly increasing ({prev} then {next})")]
    NonMonotonicDepths { prev: f64, next: f64 },
}

/// One computed point along a hole's path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub depth: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Guarantees a depth-0 station at the start of the sequence.
///
/// Directional surveys often begin below the collar; the missing surface
/// station is synthesized from the shallowest real station's dip and
/// azimuth. Returns the input unchanged (borrowed) when already present.
pub fn ensure_surface_station(stations: &[SurveyStation]) -> Cow<'_, [SurveyStation]> {
    match stations.first() {
        Some(first) if first.depth > 0.0 => {
            let mut extended = Vec::with_capacity(stations.len() + 1);
            extended.push(SurveyStation {
                depth: 0.0,
                dip: first.dip,
                azimuth: first.azimuth,
            });
            extended.extend_from_slice(stations);
            Cow::Owned(extended)
        }
        _ => Cow::Borrowed(stations),
    }
}

/// Integrates survey stations into absolute coordinates.
///
/// For consecutive stations the averaged dip/azimuth (in radians) over the
/// segment gives the increments:
///
/// ```text
/// dx = seg * cos(avg_dip) * sin(avg_azi)   (east)
/// dy = seg * cos(avg_dip) * cos(avg_azi)   (north)
/// dz = seg * sin(avg_dip)                  (vertical)
/// ```
///
/// Dip is negative for downward holes, so `sin(avg_dip)` is negative and z
/// decreases with depth. Azimuth is measured clockwise from north.
///
/// `stations` must be sorted by depth with strictly increasing, finite
/// values; violations are reported as per-hole errors. Fewer than two
/// stations degenerate to the single origin point.
///
/// Takes an immutable slice and returns a fresh vector; callers running
/// holes in parallel share nothing mutable.
pub fn integrate(
    origin: (f64, f64, f64),
    stations: &[SurveyStation],
) -> Result<Vec<TrajectoryPoint>, TrajectoryError> {
    let (x0, y0, z0) = origin;

    if stations.len() < 2 {
        let depth = stations.first().map_or(0.0, |s| s.depth);
        return Ok(vec![TrajectoryPoint {
            depth,
            x: x0,
            y: y0,
            z: z0,
        }]);
    }

    for s in stations {
        if !(s.depth.is_finite() && s.dip.is_finite() && s.azimuth.is_finite()) {
            return Err(TrajectoryError::NonFinite(s.depth));
        }
    }

    let mut trajectory = Vec::with_capacity(stations.len());
    trajectory.push(TrajectoryPoint {
        depth: stations[0].depth,
        x: x0,
        y: y0,
        z: z0,
    });

    for window in stations.windows(2) {
        let (prev, curr) = (&window[0], &window[1]);
        let seg = curr.depth - prev.depth;
        if seg <= 0.0 {
            return Err(TrajectoryError::NonMonotonicDepths {
                prev: prev.depth,
                next: curr.depth,
            });
        }

        let avg_dip = ((prev.dip + curr.dip) * 0.5).to_radians();
        let avg_azi = ((prev.azimuth + curr.azimuth) * 0.5).to_radians();

        let cos_dip = avg_dip.cos();
        let dx = seg * cos_dip * avg_azi.sin();
        let dy = seg * cos_dip * avg_azi.cos();
        let dz = seg * avg_dip.sin();

        let last = trajectory[trajectory.len() - 1];
        trajectory.push(TrajectoryPoint {
            depth: curr.depth,
            x: last.x + dx,
            y: last.y + dy,
            z: last.z + dz,
        });
    }

    Ok(trajectory)
}

/// Linearly interpolates (x, y, z) at `depth` along a trajectory.
///
/// Outside the trajectory's depth range the nearest endpoint is returned;
/// linear extrapolation is not performed.
pub fn position_at(trajectory: &[TrajectoryPoint], depth: f64) -> (f64, f64, f64) {
    debug_assert!(!trajectory.is_empty(), "trajectory must have at least one point");

    let first = trajectory[0];
    let last = trajectory[trajectory.len() - 1];

    if depth <= first.depth {
        return (first.x, first.y, first.z);
    }
    if depth >= last.depth {
        return (last.x, last.y, last.z);
    }

    // Binary search for the bracketing segment.
    let i = trajectory.partition_point(|p| p.depth < depth);
    let lo = trajectory[i - 1];
    let hi = trajectory[i];

    let span = hi.depth - lo.depth;
    if span <= 0.0 {
        return (lo.x, lo.y, lo.z);
    }
    let t = (depth - lo.depth) / span;

    (
        lo.x + t * (hi.x - lo.x),
        lo.y + t * (hi.y - lo.y),
        lo.z + t * (hi.z - lo.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(depth: f64, dip: f64, azimuth: f64) -> SurveyStation {
        SurveyStation { depth, dip, azimuth }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "expected {b}, got {a}");
    }

    #[test]
    fn test_horizontal_hole_due_east() {
        // dip=0, azi=90: all displacement goes into x.
        let stations = vec![station(0.0, 0.0, 90.0), station(50.0, 0.0, 90.0)];
        let traj = integrate((0.0, 0.0, 0.0), &stations).unwrap();

        assert_eq!(traj.len(), 2);
        assert_close(traj[1].x, 50.0);
        assert_close(traj[1].y, 0.0);
        assert_close(traj[1].z, 0.0);
    }

    #[test]
    fn test_vertical_hole() {
        // dip=-90: straight down regardless of azimuth.
        let stations = vec![station(0.0, -90.0, 123.0), station(50.0, -90.0, 123.0)];
        let traj = integrate((0.0, 0.0, 0.0), &stations).unwrap();

        assert_close(traj[1].x, 0.0);
        assert_close(traj[1].y, 0.0);
        assert_close(traj[1].z, -50.0);
    }

    #[test]
    fn test_inclined_hole_midpoint() {
        // Collar at (100000, 200000, 500), constant dip -60 / azi 90.
        // At depth 100: x offset 100*cos(60)=50, z offset 100*sin(-60)=-86.60.
        let stations = vec![station(0.0, -60.0, 90.0), station(100.0, -60.0, 90.0)];
        let traj = integrate((100000.0, 200000.0, 500.0), &stations).unwrap();

        assert_close(traj[1].x, 100050.0);
        assert_close(traj[1].y, 200000.0);
        assert!((traj[1].z - (500.0 - 86.602540)).abs() < 1e-4);

        // Interval midpoint depth 50 interpolates halfway.
        let (x, y, z) = position_at(&traj, 50.0);
        assert_close(x, 100025.0);
        assert_close(y, 200000.0);
        assert!((z - (500.0 - 43.301270)).abs() < 1e-4);
    }

    #[test]
    fn test_z_monotone_for_downward_dips() {
        let stations = vec![
            station(0.0, -45.0, 10.0),
            station(30.0, -50.0, 15.0),
            station(60.0, -70.0, 20.0),
            station(90.0, -88.0, 25.0),
        ];
        let traj = integrate((0.0, 0.0, 1000.0), &stations).unwrap();
        for w in traj.windows(2) {
            assert!(w[1].z <= w[0].z, "z must not increase when dip <= 0");
        }
    }

    #[test]
    fn test_z_monotone_for_upward_dips() {
        let stations = vec![
            station(0.0, 10.0, 0.0),
            station(40.0, 20.0, 0.0),
            station(80.0, 15.0, 0.0),
        ];
        let traj = integrate((0.0, 0.0, 0.0), &stations).unwrap();
        for w in traj.windows(2) {
            assert!(w[1].z >= w[0].z, "z must not decrease when dip >= 0");
        }
    }

    #[test]
    fn test_single_station_degenerates_to_origin() {
        let stations = vec![station(15.0, -60.0, 90.0)];
        let traj = integrate((10.0, 20.0, 30.0), &stations).unwrap();
        assert_eq!(traj.len(), 1);
        assert_eq!((traj[0].x, traj[0].y, traj[0].z), (10.0, 20.0, 30.0));
    }

    #[test]
    fn test_non_monotonic_depths_rejected() {
        let stations = vec![
            station(0.0, -60.0, 90.0),
            station(50.0, -60.0, 90.0),
            station(50.0, -60.0, 90.0),
        ];
        let err = integrate((0.0, 0.0, 0.0), &stations).unwrap_err();
        assert!(matches!(err, TrajectoryError::NonMonotonicDepths { .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let stations = vec![station(0.0, -60.0, 90.0), station(50.0, f64::NAN, 90.0)];
        let err = integrate((0.0, 0.0, 0.0), &stations).unwrap_err();
        assert!(matches!(err, TrajectoryError::NonFinite(_)));
    }

    #[test]
    fn test_ensure_surface_station_synthesizes() {
        let stations = vec![station(30.0, -55.0, 45.0), station(60.0, -58.0, 47.0)];
        let extended = ensure_surface_station(&stations);
        assert_eq!(extended.len(), 3);
        assert_eq!(extended[0].depth, 0.0);
        assert_eq!(extended[0].dip, -55.0);
        assert_eq!(extended[0].azimuth, 45.0);
    }

    #[test]
    fn test_ensure_surface_station_borrows_when_present() {
        let stations = vec![station(0.0, -55.0, 45.0), station(60.0, -58.0, 47.0)];
        let extended = ensure_surface_station(&stations);
        assert!(matches!(extended, Cow::Borrowed(_)));
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn test_position_clamps_outside_range() {
        let stations = vec![station(0.0, 0.0, 90.0), station(100.0, 0.0, 90.0)];
        let traj = integrate((0.0, 0.0, 0.0), &stations).unwrap();

        let below = position_at(&traj, -10.0);
        assert_eq!(below, (0.0, 0.0, 0.0));

        let beyond = position_at(&traj, 250.0);
        assert_close(beyond.0, 100.0);
    }
}
