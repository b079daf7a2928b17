//! Experiment Record - one analyzed soak-test run
//!
//! A record is assembled once from a trace and never mutated afterwards. All
//! values are stored with the precision they are reported at, so evaluating
//! the stored metrics again reproduces the stored verdicts.

use crate::backend::{BackendKind, NumericBackend};
use crate::hypothesis::{evaluate_hypotheses, EvaluationInputs, Hypotheses, Thresholds};
use crate::metrics::{
    compute_battery, compute_latency_drift, compute_rss_slope, compute_scheduler_actions,
    compute_stability_with_limit, compute_thermal_distribution, compute_throughput,
    compute_token_metrics, distinct_frame_count, dropped_frame_count, duration_minutes, round_to,
    rss_peak_mb, BatteryMetrics, LatencyDrift, SchedulerTally, StabilityReport,
    ThermalDistribution, ThroughputSummary, TokenMetrics, DEFAULT_WARMUP_SECONDS,
};
use crate::stats::{compute_stats_with, Summary};
use crate::trace::{Stage, TraceEntry};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Device the run was captured on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub os_version: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            model: "unknown".to_string(),
            os_version: "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunDuration {
    pub actual_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounts {
    pub total: usize,
    pub dropped: u64,
}

/// Headline percentiles of `total_inference`, rounded to 0.1 ms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub mean: f64,
}

impl From<&Summary> for LatencyPercentiles {
    fn from(summary: &Summary) -> Self {
        Self {
            p50: round_to(summary.p50, 1),
            p95: round_to(summary.p95, 1),
            p99: round_to(summary.p99, 1),
            mean: round_to(summary.mean, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_inference: Option<LatencyPercentiles>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub rss_peak_mb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rss_slope_mb_per_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rss_slope_r_squared: Option<f64>,
}

/// Every metric derived from a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    pub frames: FrameCounts,
    pub latency: LatencyMetrics,
    pub drift: Option<LatencyDrift>,
    pub throughput: ThroughputSummary,
    pub tokens: TokenMetrics,
    pub memory: MemoryMetrics,
    pub thermal: Option<ThermalDistribution>,
    /// Older stores write `{}` for a run without battery samples
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub battery: Option<BatteryMetrics>,
    pub scheduler: SchedulerTally,
    pub stability: StabilityReport,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeEmpty<T> {
    Present(T),
    Empty(EmptyObject),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyObject {}

/// Decode `null`, a missing key or `{}` as `None`
fn empty_object_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<MaybeEmpty<T>>::deserialize(deserializer)? {
        Some(MaybeEmpty::Present(value)) => Some(value),
        Some(MaybeEmpty::Empty(_)) | None => None,
    })
}

/// Metrics plus verdicts for one trace
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub duration_min: f64,
    pub metrics: MetricsBundle,
    pub hypotheses: Hypotheses,
}

/// Compute every metric and evaluate the hypotheses
pub fn assess(
    entries: &[TraceEntry],
    thresholds: &Thresholds,
    backend: &dyn NumericBackend,
) -> Assessment {
    let duration_min = duration_minutes(entries);
    let total_frames = distinct_frame_count(entries);

    let latency = compute_stats_with(entries, Stage::TotalInference.as_str(), backend);
    let drift = compute_latency_drift(entries);
    let throughput = ThroughputSummary::from_samples(&compute_throughput(entries));
    let tokens = compute_token_metrics(entries, backend);
    let rss_slope = compute_rss_slope(entries, DEFAULT_WARMUP_SECONDS);
    let thermal = compute_thermal_distribution(entries);
    let battery = compute_battery(entries, duration_min);
    let scheduler = compute_scheduler_actions(entries);
    let stability = compute_stability_with_limit(entries, thresholds.max_gap_seconds);

    let hypotheses = evaluate_hypotheses(
        &EvaluationInputs {
            duration_min,
            total_frames,
            latency: &latency,
            stability: &stability,
            drift: drift.as_ref(),
            rss_slope: rss_slope.as_ref(),
            thermal: thermal.as_ref(),
            battery_drain_per_10min: battery.and_then(|b| b.drain_per_10min),
            scheduler: &scheduler,
        },
        thresholds,
    );

    let metrics = MetricsBundle {
        frames: FrameCounts {
            total: total_frames,
            dropped: dropped_frame_count(entries),
        },
        latency: LatencyMetrics {
            total_inference: latency.populated().map(LatencyPercentiles::from),
        },
        drift,
        throughput,
        tokens,
        memory: MemoryMetrics {
            rss_peak_mb: rss_peak_mb(entries),
            rss_slope_mb_per_min: rss_slope.map(|s| s.slope_mb_per_min),
            rss_slope_r_squared: rss_slope.map(|s| s.r_squared),
        },
        thermal,
        battery,
        scheduler,
        stability,
    };

    tracing::debug!(
        "assessed {} entries: {} frames over {:.1} min, {}",
        entries.len(),
        total_frames,
        duration_min,
        hypotheses.summary()
    );

    Assessment {
        duration_min,
        metrics,
        hypotheses,
    }
}

impl MetricsBundle {
    pub fn latency_p95(&self) -> Option<f64> {
        self.latency.total_inference.map(|l| l.p95)
    }

    pub fn latency_p50(&self) -> Option<f64> {
        self.latency.total_inference.map(|l| l.p50)
    }

    pub fn battery_drain_per_10min(&self) -> Option<f64> {
        self.battery.and_then(|b| b.drain_per_10min)
    }
}

/// `YYYYMMDD_HHMMSS` in local time, suffixed with `_<hash>` when known
pub fn generate_experiment_id(now: DateTime<Local>, git_hash: Option<&str>) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    match git_hash {
        Some(hash) => format!("{}_{}", stamp, hash),
        None => stamp,
    }
}

/// One persisted experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    id: String,
    tag: String,
    timestamp: String,
    git_hash: Option<String>,
    trace_file: String,
    device: DeviceInfo,
    duration: RunDuration,
    metrics: MetricsBundle,
    hypotheses: Hypotheses,
    summary: String,
}

impl ExperimentRecord {
    /// Create a builder for a record with the given id
    #[must_use]
    pub fn builder(id: impl Into<String>) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(id)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Free-form label (may be empty)
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// UTC creation time, `YYYY-MM-DDTHH:MM:SSZ`
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Calendar date part of the timestamp
    #[must_use]
    pub fn date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }

    #[must_use]
    pub fn git_hash(&self) -> Option<&str> {
        self.git_hash.as_deref()
    }

    /// File name of the analyzed trace
    #[must_use]
    pub fn trace_file(&self) -> &str {
        &self.trace_file
    }

    #[must_use]
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    #[must_use]
    pub fn duration_min(&self) -> f64 {
        self.duration.actual_min
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricsBundle {
        &self.metrics
    }

    #[must_use]
    pub fn hypotheses(&self) -> &Hypotheses {
        &self.hypotheses
    }

    /// "k/6 PASS"
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    id: String,
    tag: String,
    git_hash: Option<String>,
    trace_file: String,
    device: DeviceInfo,
    thresholds: Thresholds,
    backend: BackendKind,
    created_at: Option<DateTime<Utc>>,
}

impl ExperimentRecordBuilder {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: String::new(),
            git_hash: None,
            trace_file: String::new(),
            device: DeviceInfo::default(),
            thresholds: Thresholds::default(),
            backend: BackendKind::default(),
            created_at: None,
        }
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn git_hash(mut self, git_hash: Option<String>) -> Self {
        self.git_hash = git_hash;
        self
    }

    /// Trace path; only the file name is recorded
    #[must_use]
    pub fn trace_path(mut self, path: &Path) -> Self {
        self.trace_file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self
    }

    /// Device model, "unknown" when not given
    #[must_use]
    pub fn device_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model {
            self.device.model = model;
        }
        self
    }

    /// Device OS version, "unknown" when not given
    #[must_use]
    pub fn device_os(mut self, os_version: Option<String>) -> Self {
        if let Some(os_version) = os_version {
            self.device.os_version = os_version;
        }
        self
    }

    #[must_use]
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Override the creation time (defaults to now)
    #[must_use]
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Analyze `entries` and build the record
    #[must_use]
    pub fn build(self, entries: &[TraceEntry]) -> ExperimentRecord {
        let backend = self.backend.build();
        let assessment = assess(entries, &self.thresholds, backend.as_ref());
        let created_at = self.created_at.unwrap_or_else(Utc::now);

        ExperimentRecord {
            id: self.id,
            tag: self.tag,
            timestamp: created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            git_hash: self.git_hash,
            trace_file: self.trace_file,
            device: self.device,
            duration: RunDuration {
                actual_min: round_to(assessment.duration_min, 1),
            },
            summary: assessment.hypotheses.summary(),
            metrics: assessment.metrics,
            hypotheses: assessment.hypotheses,
        }
    }
}
