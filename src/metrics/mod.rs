// Derived metrics over a complete soak-test trace
//
// Every computer here is a pure function over the parsed entry sequence and
// runs independently of the others. A metric that lacks enough samples
// returns `None`; the hypothesis evaluator turns that into INCONCLUSIVE.
//
// Reported values are rounded the same way the stored experiment records
// are, so a verdict re-derived from a stored record matches the stored one.

mod battery;
mod drift;
mod frames;
mod memory;
mod scheduler;
mod series;
mod stability;
mod thermal;
mod throughput;
mod tokens;

pub use battery::{compute_battery, BatteryMetrics};
pub use drift::{compute_latency_drift, LatencyDrift, MIN_DRIFT_SAMPLES, MIN_HALF_SAMPLES};
pub use frames::{distinct_frame_count, dropped_frame_count, duration_minutes, rss_peak_mb};
pub use memory::{compute_rss_slope, RssSlope, BYTES_PER_MB, DEFAULT_WARMUP_SECONDS, MIN_RSS_SAMPLES};
pub use scheduler::{compute_scheduler_actions, SchedulerTally, MEMORY_CEILING_REASON};
pub use series::{extract_time_series, TimeSeries};
pub use stability::{
    compute_stability, compute_stability_with_limit, StabilityReport, DEFAULT_GAP_LIMIT_SECONDS,
};
pub use thermal::{
    compute_thermal_distribution, thermal_label, ThermalDistribution, LAST_SAMPLE_SECONDS,
};
pub use throughput::{compute_throughput, ThroughputSample, ThroughputSummary};
pub use tokens::{compute_token_metrics, TokenMetrics};

/// Round to a fixed number of decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
