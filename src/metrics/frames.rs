// Run-level accounting: duration, distinct frames, dropped frames, RSS peak

use super::memory::BYTES_PER_MB;
use super::round_to;
use crate::trace::{elapsed_ms, Stage, TraceEntry};
use std::collections::HashSet;

/// Wall-clock span of the trace in minutes (0 with fewer than two entries)
pub fn duration_minutes(entries: &[TraceEntry]) -> f64 {
    if entries.len() < 2 {
        return 0.0;
    }
    let min = entries.iter().map(|e| e.ts_ms).min().unwrap_or(0);
    let max = entries.iter().map(|e| e.ts_ms).max().unwrap_or(0);
    elapsed_ms(min, max) / 60_000.0
}

/// Number of distinct frame ids among `total_inference` entries
pub fn distinct_frame_count(entries: &[TraceEntry]) -> usize {
    entries
        .iter()
        .filter(|e| e.is_stage(Stage::TotalInference))
        .filter_map(TraceEntry::frame_id)
        .collect::<HashSet<_>>()
        .len()
}

/// Dropped frames: the runtime reports a running counter, so take its maximum
pub fn dropped_frame_count(entries: &[TraceEntry]) -> u64 {
    entries
        .iter()
        .filter(|e| e.is_stage(Stage::DroppedFrames))
        .filter_map(TraceEntry::value)
        .fold(None, |peak: Option<f64>, v| Some(peak.map_or(v, |p| p.max(v))))
        .map_or(0, |peak| peak as u64)
}

/// Peak resident set size in MB (0.0 without samples)
pub fn rss_peak_mb(entries: &[TraceEntry]) -> f64 {
    entries
        .iter()
        .filter(|e| e.is_stage(Stage::RssBytes))
        .filter_map(TraceEntry::value)
        .fold(None, |peak: Option<f64>, v| Some(peak.map_or(v, |p| p.max(v))))
        .map_or(0.0, |peak| round_to(peak / BYTES_PER_MB, 1))
}
