// Verdicts for the six soak-test hypotheses
//
// Evaluation is a pure function of already-computed metrics. A metric that
// could not be computed yields INCONCLUSIVE for the hypothesis that needs it,
// never FAIL.

use crate::hypothesis::config::Thresholds;
use crate::metrics::{LatencyDrift, RssSlope, SchedulerTally, StabilityReport, ThermalDistribution};
use crate::stats::StatsSummary;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frames below which stability cannot be judged
pub const MIN_STABILITY_FRAMES: usize = 10;

/// Latency samples below which H2 cannot be judged
pub const MIN_LATENCY_SAMPLES: usize = 20;

/// Outcome of one hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    Inconclusive,
}

impl Verdict {
    fn from_check(passed: bool) -> Self {
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Inconclusive => "INCONCLUSIVE",
        }
    }

    /// One-character console marker
    pub fn marker(self) -> char {
        match self {
            Verdict::Pass => '+',
            Verdict::Fail => 'X',
            Verdict::Inconclusive => '?',
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict with the rule that was applied and the numbers it saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisVerdict {
    pub verdict: Verdict,
    pub criteria: String,
    pub evidence: String,
}

impl HypothesisVerdict {
    fn new(verdict: Verdict, criteria: String, evidence: String) -> Self {
        Self {
            verdict,
            criteria,
            evidence,
        }
    }
}

/// The six hypotheses in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypothesisId {
    Stability,
    Latency,
    Memory,
    Thermal,
    Battery,
    Budget,
}

impl HypothesisId {
    pub const ALL: [HypothesisId; 6] = [
        HypothesisId::Stability,
        HypothesisId::Latency,
        HypothesisId::Memory,
        HypothesisId::Thermal,
        HypothesisId::Battery,
        HypothesisId::Budget,
    ];

    /// Key used in stored records
    pub fn key(self) -> &'static str {
        match self {
            HypothesisId::Stability => "H1_stability",
            HypothesisId::Latency => "H2_latency",
            HypothesisId::Memory => "H3_memory",
            HypothesisId::Thermal => "H4_thermal",
            HypothesisId::Battery => "H5_battery",
            HypothesisId::Budget => "H6_budget",
        }
    }

    /// Short label for tables
    pub fn label(self) -> &'static str {
        match self {
            HypothesisId::Stability => "H1: Stability",
            HypothesisId::Latency => "H2: Latency",
            HypothesisId::Memory => "H3: Memory",
            HypothesisId::Thermal => "H4: Thermal",
            HypothesisId::Battery => "H5: Battery",
            HypothesisId::Budget => "H6: Budget",
        }
    }

    /// Descriptive label for the console verdict listing
    pub fn title(self) -> &'static str {
        match self {
            HypothesisId::Stability => "H1: Stability",
            HypothesisId::Latency => "H2: Latency consistency",
            HypothesisId::Memory => "H3: Memory discipline",
            HypothesisId::Thermal => "H4: Thermal safety",
            HypothesisId::Battery => "H5: Battery respect",
            HypothesisId::Budget => "H6: Budget enforcement",
        }
    }
}

/// All six verdicts, serialized under their record keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypotheses {
    #[serde(rename = "H1_stability")]
    pub stability: HypothesisVerdict,
    #[serde(rename = "H2_latency")]
    pub latency: HypothesisVerdict,
    #[serde(rename = "H3_memory")]
    pub memory: HypothesisVerdict,
    #[serde(rename = "H4_thermal")]
    pub thermal: HypothesisVerdict,
    #[serde(rename = "H5_battery")]
    pub battery: HypothesisVerdict,
    #[serde(rename = "H6_budget")]
    pub budget: HypothesisVerdict,
}

impl Hypotheses {
    pub fn get(&self, id: HypothesisId) -> &HypothesisVerdict {
        match id {
            HypothesisId::Stability => &self.stability,
            HypothesisId::Latency => &self.latency,
            HypothesisId::Memory => &self.memory,
            HypothesisId::Thermal => &self.thermal,
            HypothesisId::Battery => &self.battery,
            HypothesisId::Budget => &self.budget,
        }
    }

    /// Verdicts in H1..H6 order
    pub fn iter(&self) -> impl Iterator<Item = (HypothesisId, &HypothesisVerdict)> {
        HypothesisId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    pub fn pass_count(&self) -> usize {
        self.iter()
            .filter(|(_, h)| h.verdict == Verdict::Pass)
            .count()
    }

    /// "k/6 PASS"
    pub fn summary(&self) -> String {
        format!("{}/{} PASS", self.pass_count(), HypothesisId::ALL.len())
    }
}

/// Metrics consumed by [`evaluate_hypotheses`]
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInputs<'a> {
    pub duration_min: f64,
    pub total_frames: usize,
    pub latency: &'a StatsSummary,
    pub stability: &'a StabilityReport,
    pub drift: Option<&'a LatencyDrift>,
    pub rss_slope: Option<&'a RssSlope>,
    pub thermal: Option<&'a ThermalDistribution>,
    pub battery_drain_per_10min: Option<f64>,
    pub scheduler: &'a SchedulerTally,
}

/// Evaluate all six hypotheses against `thresholds`
pub fn evaluate_hypotheses(inputs: &EvaluationInputs<'_>, thresholds: &Thresholds) -> Hypotheses {
    Hypotheses {
        stability: evaluate_stability(inputs, thresholds),
        latency: evaluate_latency(inputs, thresholds),
        memory: evaluate_memory(inputs, thresholds),
        thermal: evaluate_thermal(inputs, thresholds),
        battery: evaluate_battery(inputs, thresholds),
        budget: evaluate_budget(inputs, thresholds),
    }
}

fn evaluate_stability(inputs: &EvaluationInputs<'_>, t: &Thresholds) -> HypothesisVerdict {
    let criteria = format!(
        "duration >= {:.0} min, 0 gaps > {:.0}s, 0 frame_id breaks",
        t.min_duration_min, t.max_gap_seconds
    );
    if inputs.total_frames < MIN_STABILITY_FRAMES {
        return HypothesisVerdict::new(
            Verdict::Inconclusive,
            criteria,
            format!("{} frames, insufficient data", inputs.total_frames),
        );
    }

    let stability = inputs.stability;
    let passed = inputs.duration_min >= t.min_duration_min
        && stability.gap_count == 0
        && stability.frame_id_breaks == 0;
    let evidence = format!(
        "{} frames, {:.1} min, {} gaps, {} breaks",
        inputs.total_frames, inputs.duration_min, stability.gap_count, stability.frame_id_breaks
    );
    HypothesisVerdict::new(Verdict::from_check(passed), criteria, evidence)
}

fn evaluate_latency(inputs: &EvaluationInputs<'_>, t: &Thresholds) -> HypothesisVerdict {
    let criteria = format!(
        "p95 < {:.0}ms AND drift < {:.0}%",
        t.p95_latency_ms, t.max_drift_pct
    );
    let summary = match inputs.latency.populated() {
        Some(s) if s.count >= MIN_LATENCY_SAMPLES => s,
        _ => {
            return HypothesisVerdict::new(
                Verdict::Inconclusive,
                criteria,
                "insufficient latency data".to_string(),
            )
        }
    };

    let p95_ok = summary.p95 < t.p95_latency_ms;
    match inputs.drift {
        None => HypothesisVerdict::new(
            Verdict::from_check(p95_ok),
            criteria,
            format!("p95={:.0}ms, drift=N/A", summary.p95),
        ),
        Some(drift) => HypothesisVerdict::new(
            Verdict::from_check(p95_ok && drift.drift_pct.abs() < t.max_drift_pct),
            criteria,
            format!("p95={:.0}ms, drift={:.1}%", summary.p95, drift.drift_pct),
        ),
    }
}

fn evaluate_memory(inputs: &EvaluationInputs<'_>, t: &Thresholds) -> HypothesisVerdict {
    let criteria = format!(
        "RSS slope < {:.1} MB/min after 60s warmup",
        t.max_rss_slope_mb_per_min
    );
    match inputs.rss_slope {
        None => HypothesisVerdict::new(
            Verdict::Inconclusive,
            criteria,
            "no RSS slope data".to_string(),
        ),
        Some(slope) => HypothesisVerdict::new(
            Verdict::from_check(slope.slope_mb_per_min < t.max_rss_slope_mb_per_min),
            criteria,
            format!(
                "slope={:.2} MB/min (R\u{b2}={:.3})",
                slope.slope_mb_per_min, slope.r_squared
            ),
        ),
    }
}

fn evaluate_thermal(inputs: &EvaluationInputs<'_>, t: &Thresholds) -> HypothesisVerdict {
    let criteria = format!(
        "fair(1) or below for > {:.0}% of run time",
        t.min_safe_thermal_pct()
    );
    match inputs.thermal {
        None => HypothesisVerdict::new(
            Verdict::Inconclusive,
            criteria,
            "no thermal data".to_string(),
        ),
        Some(dist) => HypothesisVerdict::new(
            Verdict::from_check(dist.safe_pct() > t.min_safe_thermal_pct()),
            criteria,
            format!(
                "nominal={:.0}%, fair={:.0}%",
                dist.nominal_pct, dist.fair_pct
            ),
        ),
    }
}

fn evaluate_battery(inputs: &EvaluationInputs<'_>, t: &Thresholds) -> HypothesisVerdict {
    let criteria = format!("drain < {:.1}% per 10 min", t.max_drain_per_10min);
    match inputs.battery_drain_per_10min {
        None => HypothesisVerdict::new(
            Verdict::Inconclusive,
            criteria,
            "no battery data".to_string(),
        ),
        Some(drain) => HypothesisVerdict::new(
            Verdict::from_check(drain < t.max_drain_per_10min),
            criteria,
            format!("{:.2}%/10min", drain),
        ),
    }
}

fn evaluate_budget(inputs: &EvaluationInputs<'_>, t: &Thresholds) -> HypothesisVerdict {
    let degrades = inputs.scheduler.memory_triggered_degrades;
    HypothesisVerdict::new(
        Verdict::from_check(degrades <= t.max_memory_triggered_degrades),
        format!(
            "{} degrades triggered by memoryCeiling",
            t.max_memory_triggered_degrades
        ),
        format!("memory_degrades={}", degrades),
    )
}
