//! Error types for trace analysis and experiment tracking
//!
//! Only fatal conditions live here. Malformed trace lines, metrics without
//! enough samples and a corrupt experiment store are recoverable and are
//! reported through `tracing` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop an analysis or comparison
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Trace file not found: {}", .0.display())]
    TraceNotFound(PathBuf),

    #[error("No valid entries in {}", .0.display())]
    EmptyTrace(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("Need at least 2 experiments to compare, found {found}")]
    NotEnoughExperiments { found: usize },

    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Failed to parse thresholds file {}: {message}", path.display())]
    ThresholdsParse { path: PathBuf, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
