// Tail-latency drift between the first and second half of a run
//
// The split is at the temporal midpoint between the first and last frame,
// not at the median frame, so a run whose frame rate changes halfway still
// compares equal wall-clock spans.

use super::round_to;
use crate::stats::{rank_percentile, sorted_values};
use crate::trace::{stage_in_time_order, Stage, TraceEntry};
use serde::{Deserialize, Serialize};

/// Minimum `total_inference` entries before drift is computed
pub const MIN_DRIFT_SAMPLES: usize = 20;

/// Minimum entries required in each half
pub const MIN_HALF_SAMPLES: usize = 5;

/// p95 of each half and the change between them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyDrift {
    pub first_half_p95: f64,
    pub second_half_p95: f64,
    pub drift_ms: f64,
    /// Drift relative to the first half p95 (0 when that p95 is 0)
    pub drift_pct: f64,
}

/// Compare p95 latency before and after the temporal midpoint
///
/// Returns `None` with fewer than [`MIN_DRIFT_SAMPLES`] frames or fewer than
/// [`MIN_HALF_SAMPLES`] frames on either side of the midpoint.
pub fn compute_latency_drift(entries: &[TraceEntry]) -> Option<LatencyDrift> {
    let inference = stage_in_time_order(entries, Stage::TotalInference);
    if inference.len() < MIN_DRIFT_SAMPLES {
        return None;
    }

    let t_start = inference.first()?.ts_ms as f64;
    let t_end = inference.last()?.ts_ms as f64;
    let t_mid = (t_start + t_end) / 2.0;

    let (first, second): (Vec<&TraceEntry>, Vec<&TraceEntry>) =
        inference.into_iter().partition(|e| (e.ts_ms as f64) < t_mid);
    if first.len() < MIN_HALF_SAMPLES || second.len() < MIN_HALF_SAMPLES {
        return None;
    }

    let p95 = |half: &[&TraceEntry]| {
        let values: Vec<f64> = half.iter().filter_map(|e| e.value()).collect();
        rank_percentile(&sorted_values(&values), 0.95)
    };
    let p95_first = p95(&first);
    let p95_second = p95(&second);

    let drift_ms = p95_second - p95_first;
    let drift_pct = if p95_first > 0.0 {
        drift_ms / p95_first * 100.0
    } else {
        0.0
    };

    Some(LatencyDrift {
        first_half_p95: round_to(p95_first, 1),
        second_half_p95: round_to(p95_second, 1),
        drift_ms: round_to(drift_ms, 1),
        drift_pct: round_to(drift_pct, 1),
    })
}
