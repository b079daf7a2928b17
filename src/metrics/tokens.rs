// Token generation totals and decode throughput

use crate::backend::NumericBackend;
use crate::trace::{Payload, Stage, TraceEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenMetrics {
    pub total_generated: u64,
    /// Generated tokens over total decode time (0 without decode samples)
    pub tokens_per_sec: f64,
}

/// Sum generated tokens and divide by the time spent in `decode`
pub fn compute_token_metrics(entries: &[TraceEntry], backend: &dyn NumericBackend) -> TokenMetrics {
    let total_generated: u64 = entries
        .iter()
        .map(|e| match e.payload {
            Payload::TotalInference {
                generated_tokens, ..
            } => generated_tokens,
            _ => 0,
        })
        .sum();

    let decode_ms: Vec<f64> = entries
        .iter()
        .filter(|e| e.is_stage(Stage::Decode))
        .filter_map(TraceEntry::value)
        .collect();
    let total_decode_ms = backend.sum(&decode_ms);

    let tokens_per_sec = if total_decode_ms > 0.0 {
        total_generated as f64 / (total_decode_ms / 1000.0)
    } else {
        0.0
    };

    TokenMetrics {
        total_generated,
        tokens_per_sec,
    }
}
