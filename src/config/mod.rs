//! Configuration types for the drillhole pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::processors::matching::MergeStrategy;

/// Configuration for the desurvey engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesurveyConfig {
    /// Whether to fan work out across worker threads
    #[serde(default = "default_use_parallel")]
    pub use_parallel: bool,

    /// Worker thread count; 0 means detect from available parallelism
    #[serde(default)]
    pub worker_count: usize,

    /// Minimum hole count before parallel dispatch pays off
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_use_parallel() -> bool {
    true
}

fn default_parallel_threshold() -> usize {
    100
}

impl Default for DesurveyConfig {
    fn default() -> Self {
        Self {
            use_parallel: default_use_parallel(),
            worker_count: 0,
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl DesurveyConfig {
    /// Effective worker count, resolving 0 to (cores - 1) capped at 8.
    pub fn effective_workers(&self) -> usize {
        if self.worker_count > 0 {
            return self.worker_count;
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cores.saturating_sub(1).clamp(1, 8)
    }
}

/// Configuration for the interval matching engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Merge strategy applied to overlapping logging intervals
    #[serde(default)]
    pub strategy: MergeStrategy,

    /// Minimum overlap percentage (exclusive) for a match to count
    #[serde(default)]
    pub min_overlap_pct: f64,

    /// Prefix for generated column names; empty uses the category column name
    #[serde(default)]
    pub column_prefix: String,

    /// Maximum overlap-matrix cells per hole before sub-chunking assay rows
    #[serde(default = "default_matrix_cell_budget")]
    pub matrix_cell_budget: usize,
}

fn default_matrix_cell_budget() -> usize {
    10_000_000
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::default(),
            min_overlap_pct: 0.0,
            column_prefix: String::new(),
            matrix_cell_budget: default_matrix_cell_budget(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub desurvey: DesurveyConfig,

    #[serde(default)]
    pub matching: MatchConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
