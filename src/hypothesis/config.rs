// Pass/fail limits for the six soak-test hypotheses
//
// Overrides are partial: any field missing from a thresholds file keeps its
// default, so a file containing only `{"p95_latency_ms": 2500}` is valid.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hypothesis thresholds
///
/// # Example
/// ```
/// use soaktrace::hypothesis::Thresholds;
///
/// let thresholds = Thresholds::default();
/// assert_eq!(thresholds.p95_latency_ms, 3000.0);
/// assert_eq!(thresholds.min_safe_thermal_pct(), 90.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Shortest run (minutes) that can prove stability
    pub min_duration_min: f64,

    /// Inter-frame gap (seconds) counted as a stall
    pub max_gap_seconds: f64,

    /// Ceiling for total_inference p95
    pub p95_latency_ms: f64,

    /// Largest tolerated |drift| between run halves, percent
    pub max_drift_pct: f64,

    /// RSS growth ceiling after warm-up
    pub max_rss_slope_mb_per_min: f64,

    /// Share of run time allowed at serious or worse
    ///
    /// H4 passes when nominal + fair time exceeds `100 - max_thermal_serious_pct`.
    pub max_thermal_serious_pct: f64,

    /// Battery drain ceiling, percentage points per 10 minutes
    pub max_drain_per_10min: f64,

    /// Degrades caused by the memory ceiling that still count as a pass
    pub max_memory_triggered_degrades: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_duration_min: 10.0,
            max_gap_seconds: 30.0,
            p95_latency_ms: 3000.0,
            max_drift_pct: 20.0,
            max_rss_slope_mb_per_min: 5.0,
            max_thermal_serious_pct: 10.0,
            max_drain_per_10min: 5.0,
            max_memory_triggered_degrades: 0,
        }
    }
}

impl Thresholds {
    /// Minimum share of run time at fair or below for H4
    pub fn min_safe_thermal_pct(&self) -> f64 {
        100.0 - self.max_thermal_serious_pct
    }

    /// Load overrides from a `.json` or `.toml` file
    ///
    /// Files with any other extension are parsed as JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalysisError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let thresholds: Thresholds = if is_toml {
            toml::from_str(&text).map_err(|e| AnalysisError::ThresholdsParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&text).map_err(|e| AnalysisError::ThresholdsParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        thresholds
            .validate()
            .map_err(AnalysisError::InvalidThresholds)?;
        tracing::debug!("loaded thresholds from {}: {:?}", path.display(), thresholds);
        Ok(thresholds)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        let limits = [
            ("min_duration_min", self.min_duration_min),
            ("max_gap_seconds", self.max_gap_seconds),
            ("p95_latency_ms", self.p95_latency_ms),
            ("max_drift_pct", self.max_drift_pct),
            ("max_rss_slope_mb_per_min", self.max_rss_slope_mb_per_min),
            ("max_drain_per_10min", self.max_drain_per_10min),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be non-negative, got {}", name, value));
            }
        }

        if !(0.0..=100.0).contains(&self.max_thermal_serious_pct) {
            return Err(format!(
                "max_thermal_serious_pct must be in [0, 100], got {}",
                self.max_thermal_serious_pct
            ));
        }

        Ok(())
    }
}
