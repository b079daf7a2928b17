//! Side-by-side comparison of two runs
//!
//! Two entry points share one delta model: stored experiment records
//! (selected by id or recency) and raw trace files (analyzed on the fly).

use super::record::{assess, ExperimentRecord};
use super::store::{find, latest};
use crate::backend::NumericBackend;
use crate::charts::{Chart, Series};
use crate::error::{AnalysisError, Result};
use crate::hypothesis::{HypothesisId, Thresholds, Verdict};
use crate::metrics::{
    compute_throughput, extract_time_series, TimeSeries, ThroughputSample, BYTES_PER_MB,
};
use crate::trace::{benchmark_mode, load_nonempty_trace, Stage, TraceEntry};
use std::path::Path;

/// Deltas smaller than this are reported without annotation
pub const DELTA_EPSILON: f64 = 0.01;

/// Which direction of change is an improvement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Classification of a non-negligible delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Improved,
    Regressed,
}

impl Change {
    pub fn as_str(self) -> &'static str {
        match self {
            Change::Improved => "IMPROVED",
            Change::Regressed => "REGRESSED",
        }
    }
}

/// One metric on both sides
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDelta {
    pub label: &'static str,
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub polarity: Polarity,
}

impl MetricDelta {
    /// `b - a` when both sides are present
    pub fn delta(&self) -> Option<f64> {
        Some(self.b? - self.a?)
    }

    /// `None` when a side is missing or |delta| < [`DELTA_EPSILON`]
    pub fn change(&self) -> Option<Change> {
        let delta = self.delta()?;
        if delta.abs() < DELTA_EPSILON {
            return None;
        }
        let went_up = delta > 0.0;
        let improved = match self.polarity {
            Polarity::HigherIsBetter => went_up,
            Polarity::LowerIsBetter => !went_up,
        };
        Some(if improved {
            Change::Improved
        } else {
            Change::Regressed
        })
    }
}

/// Collect rows, dropping metrics absent on both sides
fn delta_rows(rows: Vec<MetricDelta>) -> Vec<MetricDelta> {
    rows.into_iter()
        .filter(|row| row.a.is_some() || row.b.is_some())
        .collect()
}

/// Two stored experiments and their metric deltas
#[derive(Debug, Clone)]
pub struct RecordComparison<'a> {
    pub a: &'a ExperimentRecord,
    pub b: &'a ExperimentRecord,
    pub deltas: Vec<MetricDelta>,
}

impl RecordComparison<'_> {
    /// Verdicts of both sides in H1..H6 order
    pub fn verdicts(&self) -> Vec<(HypothesisId, Verdict, Verdict)> {
        HypothesisId::ALL
            .into_iter()
            .map(|id| {
                (
                    id,
                    self.a.hypotheses().get(id).verdict,
                    self.b.hypotheses().get(id).verdict,
                )
            })
            .collect()
    }
}

/// Pick the two records to compare
///
/// - no ids: the two most recent records
/// - one id: that record against the most recent
/// - two ids: both resolved by exact id or prefix
pub fn select_pair<'a>(
    records: &'a [ExperimentRecord],
    first: Option<&str>,
    second: Option<&str>,
) -> Result<(&'a ExperimentRecord, &'a ExperimentRecord)> {
    if records.len() < 2 {
        return Err(AnalysisError::NotEnoughExperiments {
            found: records.len(),
        });
    }
    let resolve = |id: &str| {
        find(records, id).ok_or_else(|| AnalysisError::ExperimentNotFound(id.to_string()))
    };

    match (first, second) {
        (None, _) => Ok((&records[records.len() - 2], &records[records.len() - 1])),
        (Some(id), None) => {
            let a = resolve(id)?;
            let b = latest(records).ok_or(AnalysisError::NotEnoughExperiments { found: 0 })?;
            Ok((a, b))
        }
        (Some(id1), Some(id2)) => Ok((resolve(id1)?, resolve(id2)?)),
    }
}

/// Compare two stored records
pub fn compare_records<'a>(a: &'a ExperimentRecord, b: &'a ExperimentRecord) -> RecordComparison<'a> {
    let (ma, mb) = (a.metrics(), b.metrics());
    let rows = vec![
        MetricDelta {
            label: "Duration (min)",
            a: Some(a.duration_min()),
            b: Some(b.duration_min()),
            polarity: Polarity::HigherIsBetter,
        },
        MetricDelta {
            label: "Frames",
            a: Some(ma.frames.total as f64),
            b: Some(mb.frames.total as f64),
            polarity: Polarity::HigherIsBetter,
        },
        MetricDelta {
            label: "p50 latency (ms)",
            a: ma.latency_p50(),
            b: mb.latency_p50(),
            polarity: Polarity::LowerIsBetter,
        },
        MetricDelta {
            label: "p95 latency (ms)",
            a: ma.latency_p95(),
            b: mb.latency_p95(),
            polarity: Polarity::LowerIsBetter,
        },
        MetricDelta {
            label: "Drift (%)",
            a: ma.drift.map(|d| d.drift_pct),
            b: mb.drift.map(|d| d.drift_pct),
            polarity: Polarity::LowerIsBetter,
        },
        MetricDelta {
            label: "RSS peak (MB)",
            a: Some(ma.memory.rss_peak_mb),
            b: Some(mb.memory.rss_peak_mb),
            polarity: Polarity::LowerIsBetter,
        },
        MetricDelta {
            label: "RSS slope (MB/min)",
            a: ma.memory.rss_slope_mb_per_min,
            b: mb.memory.rss_slope_mb_per_min,
            polarity: Polarity::LowerIsBetter,
        },
        MetricDelta {
            label: "Battery drain/10min",
            a: ma.battery_drain_per_10min(),
            b: mb.battery_drain_per_10min(),
            polarity: Polarity::LowerIsBetter,
        },
        MetricDelta {
            label: "Memory degrades",
            a: Some(ma.scheduler.memory_triggered_degrades as f64),
            b: Some(mb.scheduler.memory_triggered_degrades as f64),
            polarity: Polarity::LowerIsBetter,
        },
    ];

    RecordComparison {
        a,
        b,
        deltas: delta_rows(rows),
    }
}

/// Headline numbers and chart series of one raw trace
#[derive(Debug, Clone)]
pub struct TraceProfile {
    pub label: String,
    pub duration_min: f64,
    pub frames: usize,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub avg_fpm: f64,
    pub drift_pct: Option<f64>,
    pub rss_peak_mb: f64,
    pub rss_slope_mb_per_min: Option<f64>,
    pub thermal_peak: Option<i64>,
    pub latency_series: TimeSeries,
    pub throughput_series: Vec<ThroughputSample>,
    pub rss_mb_series: TimeSeries,
}

impl TraceProfile {
    /// Profile already-loaded entries
    pub fn from_entries(
        label: impl Into<String>,
        entries: &[TraceEntry],
        backend: &dyn NumericBackend,
    ) -> Self {
        let assessment = assess(entries, &Thresholds::default(), backend);
        let metrics = &assessment.metrics;

        Self {
            label: label.into(),
            duration_min: assessment.duration_min,
            frames: metrics.frames.total,
            p50_ms: metrics.latency_p50(),
            p95_ms: metrics.latency_p95(),
            avg_fpm: metrics.throughput.avg_fpm,
            drift_pct: metrics.drift.map(|d| d.drift_pct),
            rss_peak_mb: metrics.memory.rss_peak_mb,
            rss_slope_mb_per_min: metrics.memory.rss_slope_mb_per_min,
            thermal_peak: metrics.thermal.map(|t| t.peak_state),
            latency_series: extract_time_series(entries, Stage::TotalInference),
            throughput_series: compute_throughput(entries),
            rss_mb_series: extract_time_series(entries, Stage::RssBytes)
                .map_values(|bytes| bytes / BYTES_PER_MB),
        }
    }

    /// Load and profile a trace file (fatal if missing or empty)
    pub fn load(path: &Path, backend: &dyn NumericBackend) -> Result<Self> {
        let entries = load_nonempty_trace(path)?;
        Ok(Self::from_entries(trace_label(path, &entries), &entries, backend))
    }
}

/// Benchmark mode named in the trace header, else the file stem
pub fn trace_label(path: &Path, entries: &[TraceEntry]) -> String {
    if let Some(mode) = benchmark_mode(entries) {
        return mode.to_string();
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Two profiled traces and their metric deltas
#[derive(Debug, Clone)]
pub struct TraceComparison {
    pub a: TraceProfile,
    pub b: TraceProfile,
    pub deltas: Vec<MetricDelta>,
}

impl TraceComparison {
    pub fn new(a: TraceProfile, b: TraceProfile) -> Self {
        let rows = vec![
            MetricDelta {
                label: "Duration (min)",
                a: Some(a.duration_min),
                b: Some(b.duration_min),
                polarity: Polarity::HigherIsBetter,
            },
            MetricDelta {
                label: "Frames",
                a: Some(a.frames as f64),
                b: Some(b.frames as f64),
                polarity: Polarity::HigherIsBetter,
            },
            MetricDelta {
                label: "p50 latency (ms)",
                a: a.p50_ms,
                b: b.p50_ms,
                polarity: Polarity::LowerIsBetter,
            },
            MetricDelta {
                label: "p95 latency (ms)",
                a: a.p95_ms,
                b: b.p95_ms,
                polarity: Polarity::LowerIsBetter,
            },
            MetricDelta {
                label: "Throughput (fpm)",
                a: Some(a.avg_fpm),
                b: Some(b.avg_fpm),
                polarity: Polarity::HigherIsBetter,
            },
            MetricDelta {
                label: "Drift (%)",
                a: a.drift_pct,
                b: b.drift_pct,
                polarity: Polarity::LowerIsBetter,
            },
            MetricDelta {
                label: "RSS peak (MB)",
                a: Some(a.rss_peak_mb),
                b: Some(b.rss_peak_mb),
                polarity: Polarity::LowerIsBetter,
            },
            MetricDelta {
                label: "RSS slope (MB/min)",
                a: a.rss_slope_mb_per_min,
                b: b.rss_slope_mb_per_min,
                polarity: Polarity::LowerIsBetter,
            },
            MetricDelta {
                label: "Thermal peak",
                a: a.thermal_peak.map(|p| p as f64),
                b: b.thermal_peak.map(|p| p as f64),
                polarity: Polarity::LowerIsBetter,
            },
        ];

        Self {
            deltas: delta_rows(rows),
            a,
            b,
        }
    }

    /// Overlay charts with one series per trace
    pub fn overlay_charts(&self) -> Vec<Chart> {
        let sides = [&self.a, &self.b];

        let mut latency = Chart::new(
            "compare_latency",
            "Total Inference Latency Over Time",
            "minutes",
            "latency_ms",
        );
        let mut throughput = Chart::new(
            "compare_throughput",
            "Throughput Over Time",
            "minutes",
            "frames_per_minute",
        );
        let mut rss = Chart::new("compare_rss", "RSS Over Time", "minutes", "rss_mb");

        for side in sides {
            latency = latency.with_series(Series::from_time_series(&side.label, &side.latency_series));
            throughput = throughput.with_series(Series::new(
                side.label.as_str(),
                side.throughput_series.iter().map(|s| s.minute).collect(),
                side.throughput_series
                    .iter()
                    .map(|s| s.frames_per_minute)
                    .collect(),
            ));
            rss = rss.with_series(Series::from_time_series(&side.label, &side.rss_mb_series));
        }

        vec![latency, throughput, rss]
    }
}

/// Load and compare two trace files
pub fn compare_traces(
    path_a: &Path,
    path_b: &Path,
    backend: &dyn NumericBackend,
) -> Result<TraceComparison> {
    let a = TraceProfile::load(path_a, backend)?;
    let b = TraceProfile::load(path_b, backend)?;
    tracing::debug!("comparing traces '{}' and '{}'", a.label, b.label);
    Ok(TraceComparison::new(a, b))
}
