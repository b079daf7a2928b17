//! Longitudinal experiment tracking
//!
//! ```text
//! trace.jsonl ──assess──> ExperimentRecord ──append──> experiments.json
//!                                                  └──> EXPERIMENTS.md
//! ```
//!
//! Records are immutable once built. Comparison works either on two stored
//! records or directly on two raw traces.

mod compare;
mod record;
mod store;

pub use compare::{
    compare_records, compare_traces, select_pair, trace_label, Change, MetricDelta, Polarity,
    RecordComparison, TraceComparison, TraceProfile, DELTA_EPSILON,
};
pub use record::{
    assess, generate_experiment_id, Assessment, DeviceInfo, ExperimentRecord,
    ExperimentRecordBuilder, FrameCounts, LatencyMetrics, LatencyPercentiles, MemoryMetrics,
    MetricsBundle, RunDuration,
};
pub use store::{
    find, format_markdown_section, latest, ExperimentStore, EXPERIMENTS_JSON, EXPERIMENTS_MD,
};

#[cfg(test)]
mod tests;
