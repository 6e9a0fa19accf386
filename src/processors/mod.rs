//! Data processing engines.

pub mod desurvey;
pub mod matching;
pub mod overlap;
pub mod trajectory;

// Re-export key types for convenience
pub use desurvey::{DesurveyEngine, DesurveyError, DesurveyMapping, DesurveyOutput};
pub use matching::{
    IntervalMatcher, MatchError, MatchOutput, MergeStrategy, QaqcReport,
};
pub use overlap::{detect_internal_overlaps, OverlapError, OverlapReport};
pub use trajectory::{ensure_surface_station, integrate, position_at, TrajectoryPoint};
