// Soak-test hypothesis evaluation
//
// Six hypotheses decide whether a long-running on-device inference session
// was healthy:
//
// - H1 stability: long enough, no stalls, frame ids strictly increasing
// - H2 latency: p95 under the ceiling and no large drift between halves
// - H3 memory: RSS does not keep growing after warm-up
// - H4 thermal: the device stays at fair or below
// - H5 battery: drain rate under the ceiling
// - H6 budget: the memory ceiling did not force quality downgrades
//
// Thresholds are data (see `Thresholds`), so a team can tighten a limit
// without touching the evaluator.

mod config;
mod verdict;

pub use config::Thresholds;
pub use verdict::{
    evaluate_hypotheses, EvaluationInputs, Hypotheses, HypothesisId, HypothesisVerdict, Verdict,
    MIN_LATENCY_SAMPLES, MIN_STABILITY_FRAMES,
};
