//! Per-stage latency statistics
//!
//! Percentiles use the lower nearest-rank rule: sort ascending and take
//! index `floor(n * fraction)`, clamped to the last element. This matches the
//! recorded baselines exactly; do not swap in an interpolating percentile.

use crate::backend::{NumericBackend, ScalarBackend};
use crate::trace::TraceEntry;

/// Statistics for a populated stage
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Stage statistics, or the distinct "no matching entries" state
#[derive(Debug, Clone, PartialEq)]
pub enum StatsSummary {
    /// No entry matched the stage (`{count: 0}`)
    Empty,
    Populated(Summary),
}

impl StatsSummary {
    pub fn count(&self) -> usize {
        match self {
            StatsSummary::Empty => 0,
            StatsSummary::Populated(s) => s.count,
        }
    }

    /// Populated statistics, `None` for the empty state
    pub fn populated(&self) -> Option<&Summary> {
        match self {
            StatsSummary::Empty => None,
            StatsSummary::Populated(s) => Some(s),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, StatsSummary::Empty)
    }
}

/// Percentile of ascending-sorted data by rank index
///
/// `sorted` must be non-empty.
pub fn rank_percentile(sorted: &[f64], fraction: f64) -> f64 {
    let index = ((sorted.len() as f64) * fraction).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

/// Sort f64 values ascending (NaN-tolerant)
pub fn sorted_values(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Summarize raw values with the given backend
pub fn summarize(values: &[f64], backend: &dyn NumericBackend) -> StatsSummary {
    let Some(moments) = backend.moments(values) else {
        return StatsSummary::Empty;
    };
    let sorted = sorted_values(values);
    StatsSummary::Populated(Summary {
        count: values.len(),
        min: moments.min,
        max: moments.max,
        mean: moments.mean,
        std: moments.std,
        p50: rank_percentile(&sorted, 0.50),
        p95: rank_percentile(&sorted, 0.95),
        p99: rank_percentile(&sorted, 0.99),
    })
}

/// Values of every entry whose stage tag equals `stage`
pub fn stage_values(entries: &[TraceEntry], stage: &str) -> Vec<f64> {
    entries
        .iter()
        .filter(|e| e.stage_name() == stage)
        .filter_map(TraceEntry::value)
        .collect()
}

/// Statistics for one stage using the scalar backend
pub fn compute_stats(entries: &[TraceEntry], stage: &str) -> StatsSummary {
    compute_stats_with(entries, stage, &ScalarBackend)
}

/// Statistics for one stage using an injected backend
pub fn compute_stats_with(
    entries: &[TraceEntry],
    stage: &str,
    backend: &dyn NumericBackend,
) -> StatsSummary {
    summarize(&stage_values(entries, stage), backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimdBackend;
    use crate::trace::parse_trace_str;

    fn decode_trace(values: &[f64]) -> Vec<TraceEntry> {
        let text: String = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{{\"ts_ms\": {}, \"stage\": \"decode\", \"value\": {}}}\n", i, v))
            .collect();
        parse_trace_str(&text)
    }

    #[test]
    fn test_rank_percentiles_five_values() {
        let entries = decode_trace(&[50.0, 10.0, 40.0, 20.0, 30.0]);
        let stats = compute_stats(&entries, "decode");
        let s = stats.populated().unwrap();

        assert_eq!(s.count, 5);
        assert_eq!(s.p50, 30.0); // index 2
        assert_eq!(s.p95, 50.0); // index 4
        assert_eq!(s.p99, 50.0);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 50.0);
        assert_eq!(s.mean, 30.0);
    }

    #[test]
    fn test_p50_of_four_values_is_third_element() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(rank_percentile(&sorted, 0.5), 3.0);
    }

    #[test]
    fn test_rank_percentile_single_value() {
        assert_eq!(rank_percentile(&[7.0], 0.99), 7.0);
    }

    #[test]
    fn test_empty_stage_is_distinct_from_zero() {
        let entries = decode_trace(&[0.0, 0.0]);

        let missing = compute_stats(&entries, "prompt_eval");
        assert!(missing.is_empty());
        assert_eq!(missing.count(), 0);
        assert!(missing.populated().is_none());

        let zeros = compute_stats(&entries, "decode");
        assert!(!zeros.is_empty());
        assert_eq!(zeros.populated().unwrap().max, 0.0);
    }

    #[test]
    fn test_population_std() {
        let entries = decode_trace(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let s = compute_stats(&entries, "decode");
        assert!((s.populated().unwrap().std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_simd_backend_keeps_exact_percentiles() {
        let entries = decode_trace(&[12.5, 99.0, 3.25, 47.0]);
        let scalar = compute_stats(&entries, "decode");
        let simd = compute_stats_with(&entries, "decode", &SimdBackend);

        let (a, b) = (scalar.populated().unwrap(), simd.populated().unwrap());
        assert_eq!(a.p50, b.p50);
        assert_eq!(a.p95, b.p95);
        assert_eq!(a.p99, b.p99);
        assert!((a.mean - b.mean).abs() < 1e-3);
    }
}
