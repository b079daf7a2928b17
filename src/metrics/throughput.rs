// Frames-per-minute in overlapping one-minute windows

use super::round_to;
use crate::trace::{elapsed_ms, Stage, TraceEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const WINDOW_MINUTES: f64 = 1.0;
const STEP_MINUTES: f64 = 0.5;

/// Frame count of one window, keyed by the window centre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    /// Window centre, minutes since the first frame
    pub minute: f64,
    pub frames_per_minute: f64,
}

/// Average / min / max over all windows
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThroughputSummary {
    pub avg_fpm: f64,
    pub min_fpm: f64,
    pub max_fpm: f64,
}

impl ThroughputSummary {
    /// Summarize window samples (all zeros without samples)
    pub fn from_samples(samples: &[ThroughputSample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let fpm: Vec<f64> = samples.iter().map(|s| s.frames_per_minute).collect();
        let avg = fpm.iter().sum::<f64>() / fpm.len() as f64;
        let min = fpm.iter().copied().fold(f64::INFINITY, f64::min);
        let max = fpm.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            avg_fpm: round_to(avg, 1),
            min_fpm: round_to(min, 1),
            max_fpm: round_to(max, 1),
        }
    }
}

/// Slide a 1-minute window in 0.5-minute steps over unique frame completions
///
/// Consecutive windows overlap by half on purpose (smoothing). Only the first
/// `total_inference` entry of each frame id counts.
pub fn compute_throughput(entries: &[TraceEntry]) -> Vec<ThroughputSample> {
    let mut first_seen: HashMap<i64, i64> = HashMap::new();
    for entry in entries.iter().filter(|e| e.is_stage(Stage::TotalInference)) {
        if let Some(frame_id) = entry.frame_id() {
            first_seen.entry(frame_id).or_insert(entry.ts_ms);
        }
    }

    let mut timestamps: Vec<i64> = first_seen.into_values().collect();
    if timestamps.is_empty() {
        return Vec::new();
    }
    timestamps.sort_unstable();

    let t0 = timestamps[0];
    let minutes: Vec<f64> = timestamps
        .iter()
        .map(|&t| elapsed_ms(t0, t) / 60_000.0)
        .collect();
    let last = minutes[minutes.len() - 1];

    let mut samples = Vec::new();
    let mut step = 0u64;
    loop {
        let start = step as f64 * STEP_MINUTES;
        if start > last {
            break;
        }
        let end = start + WINDOW_MINUTES;
        let count = minutes.iter().filter(|&&m| start <= m && m < end).count();
        samples.push(ThroughputSample {
            minute: start + WINDOW_MINUTES / 2.0,
            frames_per_minute: count as f64,
        });
        step += 1;
    }
    samples
}
