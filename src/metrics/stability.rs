// Session stability: long gaps between frames and frame id regressions

use super::round_to;
use crate::trace::{elapsed_ms, stage_in_time_order, Stage, TraceEntry, NO_FRAME_ID};
use serde::{Deserialize, Serialize};

/// Inter-frame gap (seconds) above which the session counts as stalled
pub const DEFAULT_GAP_LIMIT_SECONDS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub gap_count: u64,
    pub max_gap_seconds: f64,
    pub frame_id_breaks: u64,
    pub is_stable: bool,
}

impl StabilityReport {
    fn trivially_stable() -> Self {
        Self {
            gap_count: 0,
            max_gap_seconds: 0.0,
            frame_id_breaks: 0,
            is_stable: true,
        }
    }
}

/// Scan frames with the default 30 s gap limit
pub fn compute_stability(entries: &[TraceEntry]) -> StabilityReport {
    compute_stability_with_limit(entries, DEFAULT_GAP_LIMIT_SECONDS)
}

/// Scan consecutive frames (time order) for gaps above `gap_limit_seconds`
/// and for frame ids that fail to strictly increase
pub fn compute_stability_with_limit(
    entries: &[TraceEntry],
    gap_limit_seconds: f64,
) -> StabilityReport {
    let inference = stage_in_time_order(entries, Stage::TotalInference);
    if inference.is_empty() {
        return StabilityReport::trivially_stable();
    }

    let mut gap_count = 0;
    let mut max_gap = 0.0_f64;
    let mut frame_id_breaks = 0;

    for pair in inference.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);

        let gap = elapsed_ms(prev.ts_ms, cur.ts_ms) / 1000.0;
        max_gap = max_gap.max(gap);
        if gap > gap_limit_seconds {
            gap_count += 1;
        }

        if cur.frame_id != NO_FRAME_ID && prev.frame_id != NO_FRAME_ID && cur.frame_id <= prev.frame_id
        {
            frame_id_breaks += 1;
        }
    }

    StabilityReport {
        gap_count,
        max_gap_seconds: round_to(max_gap, 1),
        frame_id_breaks,
        is_stable: gap_count == 0 && frame_id_breaks == 0,
    }
}
