// Time-weighted thermal state distribution
//
// Thermal state is a right-continuous step function: each sample holds until
// the next one. The last sample has nothing to bound it and is credited with
// LAST_SAMPLE_SECONDS. That figure is a known approximation kept for
// compatibility with existing records, not a measurement.

use super::round_to;
use crate::trace::{elapsed_ms, stage_in_time_order, Stage, TraceEntry};
use serde::{Deserialize, Serialize};

/// Duration credited to the final thermal sample
pub const LAST_SAMPLE_SECONDS: f64 = 1.0;

/// Share of run time spent in each thermal state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalDistribution {
    pub nominal_pct: f64,
    pub fair_pct: f64,
    pub serious_pct: f64,
    pub critical_pct: f64,
    /// Highest state observed, including states outside 0-3
    pub peak_state: i64,
}

impl ThermalDistribution {
    /// Time spent at fair or below
    pub fn safe_pct(&self) -> f64 {
        self.nominal_pct + self.fair_pct
    }
}

/// Human label for a thermal state
pub fn thermal_label(state: i64) -> String {
    match state {
        0 => "nominal".to_string(),
        1 => "fair".to_string(),
        2 => "serious".to_string(),
        3 => "critical".to_string(),
        other => format!("unknown({})", other),
    }
}

/// Accumulate held time per thermal state
///
/// `None` without thermal samples or when no time accrued to states 0-3.
pub fn compute_thermal_distribution(entries: &[TraceEntry]) -> Option<ThermalDistribution> {
    let thermal = stage_in_time_order(entries, Stage::ThermalState);
    if thermal.is_empty() {
        return None;
    }

    let mut state_seconds = [0.0_f64; 4];
    let mut peak_state = 0_i64;

    for (i, sample) in thermal.iter().enumerate() {
        let state = sample.value().unwrap_or_default() as i64;
        peak_state = peak_state.max(state);

        let held = match thermal.get(i + 1) {
            Some(next) => elapsed_ms(sample.ts_ms, next.ts_ms) / 1000.0,
            None => LAST_SAMPLE_SECONDS,
        };
        if let Some(slot) = usize::try_from(state)
            .ok()
            .and_then(|s| state_seconds.get_mut(s))
        {
            *slot += held;
        }
    }

    let total: f64 = state_seconds.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let pct = |seconds: f64| round_to(seconds / total * 100.0, 1);

    Some(ThermalDistribution {
        nominal_pct: pct(state_seconds[0]),
        fair_pct: pct(state_seconds[1]),
        serious_pct: pct(state_seconds[2]),
        critical_pct: pct(state_seconds[3]),
        peak_state,
    })
}
