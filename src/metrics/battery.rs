// Battery drain from battery_level samples (fractions 0-1)

use super::round_to;
use crate::trace::{stage_in_time_order, Stage, TraceEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryMetrics {
    pub start_pct: f64,
    pub end_pct: f64,
    pub drain_pct: f64,
    /// Drain normalized to ten minutes, absent for a zero-length run
    pub drain_per_10min: Option<f64>,
}

/// Start/end level and drain rate, `None` with fewer than two samples
pub fn compute_battery(entries: &[TraceEntry], duration_min: f64) -> Option<BatteryMetrics> {
    let levels: Vec<f64> = stage_in_time_order(entries, Stage::BatteryLevel)
        .into_iter()
        .filter_map(TraceEntry::value)
        .collect();
    if levels.len() < 2 {
        return None;
    }

    let start_pct = levels[0] * 100.0;
    let end_pct = levels[levels.len() - 1] * 100.0;
    let drain_pct = start_pct - end_pct;
    let drain_per_10min = (duration_min > 0.0).then(|| round_to(drain_pct / duration_min * 10.0, 2));

    Some(BatteryMetrics {
        start_pct: round_to(start_pct, 1),
        end_pct: round_to(end_pct, 1),
        drain_pct: round_to(drain_pct, 1),
        drain_per_10min,
    })
}
