// RSS growth after warm-up, fitted as a least-squares line
//
// Warm-up is measured from the first entry of the whole trace, not from the
// first RSS sample: model loading dominates the first minute regardless of
// when the sampler starts.

use super::round_to;
use crate::trace::{elapsed_ms, first_timestamp, Stage, TraceEntry};
use serde::{Deserialize, Serialize};

/// Bytes in one megabyte (binary)
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Seconds ignored at the start of a run
pub const DEFAULT_WARMUP_SECONDS: f64 = 60.0;

/// RSS samples required both before and after the warm-up filter
pub const MIN_RSS_SAMPLES: usize = 5;

/// Linear fit of RSS (MB) against run time (minutes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RssSlope {
    pub slope_mb_per_min: f64,
    /// Coefficient of determination (0 for a flat series)
    pub r_squared: f64,
    pub sample_count: usize,
}

/// Fit RSS growth after `warmup_seconds`
pub fn compute_rss_slope(entries: &[TraceEntry], warmup_seconds: f64) -> Option<RssSlope> {
    let rss: Vec<&TraceEntry> = entries
        .iter()
        .filter(|e| e.is_stage(Stage::RssBytes))
        .collect();
    if rss.len() < MIN_RSS_SAMPLES {
        return None;
    }

    let t0 = first_timestamp(entries)?;
    let (minutes, mb): (Vec<f64>, Vec<f64>) = rss
        .iter()
        .filter(|e| elapsed_ms(t0, e.ts_ms) / 1000.0 >= warmup_seconds)
        .filter_map(|e| Some((elapsed_ms(t0, e.ts_ms) / 60_000.0, e.value()? / BYTES_PER_MB)))
        .unzip();
    if minutes.len() < MIN_RSS_SAMPLES {
        return None;
    }

    let (slope, intercept) = least_squares(&minutes, &mb)?;

    let mean_mb = mb.iter().sum::<f64>() / mb.len() as f64;
    let ss_res: f64 = minutes
        .iter()
        .zip(&mb)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = mb.iter().map(|y| (y - mean_mb).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    Some(RssSlope {
        slope_mb_per_min: round_to(slope, 2),
        r_squared: round_to(r_squared, 3),
        sample_count: minutes.len(),
    })
}

/// Degree-1 least squares, `None` when every x is identical
fn least_squares(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}
