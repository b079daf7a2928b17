//! Trace ingestion for soak-test JSONL files
//!
//! Each non-blank line of a trace is one JSON object. Lines become
//! [`TraceEntry`] values: a common envelope (`frame_id`, `ts_ms`) plus a
//! [`Payload`] selected by the `stage` tag. Lines that cannot be parsed are
//! skipped with a warning; the caller decides whether an empty result is fatal.

use crate::error::{AnalysisError, Result};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Sentinel stored when a line carries no `frame_id`
pub const NO_FRAME_ID: i64 = -1;

/// Stage vocabulary emitted by the on-device trace writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    ImageEncode,
    PromptEval,
    Decode,
    TotalInference,
    RssBytes,
    ThermalState,
    BatteryLevel,
    AvailableMemory,
    DroppedFrames,
    SchedulerDecision,
    BudgetViolation,
    BenchmarkMode,
}

impl Stage {
    /// Stages whose `value` is a latency in milliseconds
    pub const LATENCY: [Stage; 4] = [
        Stage::ImageEncode,
        Stage::PromptEval,
        Stage::Decode,
        Stage::TotalInference,
    ];

    /// Wire name of the stage
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::ImageEncode => "image_encode",
            Stage::PromptEval => "prompt_eval",
            Stage::Decode => "decode",
            Stage::TotalInference => "total_inference",
            Stage::RssBytes => "rss_bytes",
            Stage::ThermalState => "thermal_state",
            Stage::BatteryLevel => "battery_level",
            Stage::AvailableMemory => "available_memory",
            Stage::DroppedFrames => "dropped_frames",
            Stage::SchedulerDecision => "scheduler_decision",
            Stage::BudgetViolation => "budget_violation",
            Stage::BenchmarkMode => "benchmark_mode",
        }
    }

    /// Resolve a wire name, `None` for tags outside the vocabulary
    pub fn from_name(name: &str) -> Option<Self> {
        let stage = match name {
            "image_encode" => Stage::ImageEncode,
            "prompt_eval" => Stage::PromptEval,
            "decode" => Stage::Decode,
            "total_inference" => Stage::TotalInference,
            "rss_bytes" => Stage::RssBytes,
            "thermal_state" => Stage::ThermalState,
            "battery_level" => Stage::BatteryLevel,
            "available_memory" => Stage::AvailableMemory,
            "dropped_frames" => Stage::DroppedFrames,
            "scheduler_decision" => Stage::SchedulerDecision,
            "budget_violation" => Stage::BudgetViolation,
            "benchmark_mode" => Stage::BenchmarkMode,
            _ => return None,
        };
        Some(stage)
    }

    /// Whether lines of this stage must carry a numeric `value`
    fn requires_value(self) -> bool {
        !matches!(
            self,
            Stage::SchedulerDecision | Stage::BudgetViolation | Stage::BenchmarkMode
        )
    }
}

/// Stage-specific part of a trace entry
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain numeric sample (latencies other than total, RSS, thermal, battery, ...)
    Measurement { stage: Stage, value: f64 },

    /// End-to-end latency of one frame
    TotalInference {
        latency_ms: f64,
        generated_tokens: u64,
        prompt_tokens: Option<u64>,
    },

    /// Runtime scheduler changed (or restored) the quality level
    SchedulerDecision {
        action: Option<String>,
        reason: Option<String>,
    },

    /// Runtime budget was exceeded
    BudgetViolation {
        observe_only: bool,
        constraint: Option<String>,
    },

    /// Header line naming the benchmark configuration
    BenchmarkMode { mode: Option<String> },

    /// Stage tag outside the known vocabulary
    Unrecognized { stage: String, value: Option<f64> },
}

/// One parsed trace line
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    /// Sequential frame counter, [`NO_FRAME_ID`] when absent
    pub frame_id: i64,
    /// Milliseconds since the Unix epoch
    pub ts_ms: i64,
    pub payload: Payload,
}

impl TraceEntry {
    /// Known stage of this entry, `None` for unrecognized tags
    pub fn stage(&self) -> Option<Stage> {
        match &self.payload {
            Payload::Measurement { stage, .. } => Some(*stage),
            Payload::TotalInference { .. } => Some(Stage::TotalInference),
            Payload::SchedulerDecision { .. } => Some(Stage::SchedulerDecision),
            Payload::BudgetViolation { .. } => Some(Stage::BudgetViolation),
            Payload::BenchmarkMode { .. } => Some(Stage::BenchmarkMode),
            Payload::Unrecognized { .. } => None,
        }
    }

    /// Stage tag exactly as it appeared on the wire
    pub fn stage_name(&self) -> &str {
        match &self.payload {
            Payload::Unrecognized { stage, .. } => stage,
            _ => self.stage().map_or("", Stage::as_str),
        }
    }

    pub fn is_stage(&self, stage: Stage) -> bool {
        self.stage() == Some(stage)
    }

    /// Numeric measurement carried by the entry
    pub fn value(&self) -> Option<f64> {
        match &self.payload {
            Payload::Measurement { value, .. } => Some(*value),
            Payload::TotalInference { latency_ms, .. } => Some(*latency_ms),
            Payload::Unrecognized { value, .. } => *value,
            _ => None,
        }
    }

    /// Frame id, `None` for the sentinel
    pub fn frame_id(&self) -> Option<i64> {
        (self.frame_id != NO_FRAME_ID).then_some(self.frame_id)
    }
}

/// Why a single trace line was rejected
#[derive(Error, Debug)]
pub enum LineError {
    #[error("malformed JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("stage '{0}' requires a numeric value")]
    MissingValue(&'static str),
}

/// Wire shape of a line before the stage payload is selected
#[derive(Debug, Deserialize)]
struct RawEntry {
    frame_id: Option<i64>,
    ts_ms: i64,
    stage: String,
    value: Option<f64>,
    generated_tokens: Option<u64>,
    prompt_tokens: Option<u64>,
    action: Option<String>,
    reason: Option<String>,
    observe_only: Option<bool>,
    constraint: Option<String>,
    mode: Option<String>,
}

impl TryFrom<RawEntry> for TraceEntry {
    type Error = LineError;

    fn try_from(raw: RawEntry) -> std::result::Result<Self, Self::Error> {
        let payload = match Stage::from_name(&raw.stage) {
            None => Payload::Unrecognized {
                stage: raw.stage,
                value: raw.value,
            },
            Some(stage) => {
                let value = match (stage.requires_value(), raw.value) {
                    (true, None) => return Err(LineError::MissingValue(stage.as_str())),
                    (_, value) => value.unwrap_or_default(),
                };
                match stage {
                    Stage::TotalInference => Payload::TotalInference {
                        latency_ms: value,
                        generated_tokens: raw.generated_tokens.unwrap_or(0),
                        prompt_tokens: raw.prompt_tokens,
                    },
                    Stage::SchedulerDecision => Payload::SchedulerDecision {
                        action: raw.action,
                        reason: raw.reason,
                    },
                    Stage::BudgetViolation => Payload::BudgetViolation {
                        observe_only: raw.observe_only.unwrap_or(false),
                        constraint: raw.constraint,
                    },
                    Stage::BenchmarkMode => Payload::BenchmarkMode { mode: raw.mode },
                    _ => Payload::Measurement { stage, value },
                }
            }
        };

        Ok(TraceEntry {
            frame_id: raw.frame_id.unwrap_or(NO_FRAME_ID),
            ts_ms: raw.ts_ms,
            payload,
        })
    }
}

/// Parse a single JSONL line
pub fn parse_line(line: &str) -> std::result::Result<TraceEntry, LineError> {
    let raw: RawEntry = serde_json::from_str(line)?;
    TraceEntry::try_from(raw)
}

/// Parse trace text, skipping blank and malformed lines
pub fn parse_trace_str(text: &str) -> Vec<TraceEntry> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!("skipping trace line {}: {}", index + 1, e),
        }
    }
    entries
}

/// Load a JSONL trace file
///
/// An empty result is not an error here; callers that need entries check
/// for it themselves.
pub fn load_trace(path: &Path) -> Result<Vec<TraceEntry>> {
    if !path.is_file() {
        return Err(AnalysisError::TraceNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = parse_trace_str(&text);
    tracing::debug!("loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Load a trace that must contain at least one entry
pub fn load_nonempty_trace(path: &Path) -> Result<Vec<TraceEntry>> {
    let entries = load_trace(path)?;
    if entries.is_empty() {
        return Err(AnalysisError::EmptyTrace(path.to_path_buf()));
    }
    Ok(entries)
}

/// Entries of one stage in timestamp order (stable for equal timestamps)
pub fn stage_in_time_order(entries: &[TraceEntry], stage: Stage) -> Vec<&TraceEntry> {
    let mut selected: Vec<&TraceEntry> = entries.iter().filter(|e| e.is_stage(stage)).collect();
    selected.sort_by_key(|e| e.ts_ms);
    selected
}

/// Milliseconds from `from` to `to`, exact for any pair of `i64` timestamps
pub fn elapsed_ms(from: i64, to: i64) -> f64 {
    (i128::from(to) - i128::from(from)) as f64
}

/// Earliest timestamp across all entries
pub fn first_timestamp(entries: &[TraceEntry]) -> Option<i64> {
    entries.iter().map(|e| e.ts_ms).min()
}

/// Mode named by the first `benchmark_mode` header entry
pub fn benchmark_mode(entries: &[TraceEntry]) -> Option<&str> {
    entries.iter().find_map(|e| match &e.payload {
        Payload::BenchmarkMode { mode } => mode.as_deref(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_total_inference_line() {
        let entry = parse_line(
            r#"{"frame_id": 3, "ts_ms": 1000, "stage": "total_inference", "value": 812.5, "generated_tokens": 24}"#,
        )
        .unwrap();

        assert_eq!(entry.frame_id(), Some(3));
        assert_eq!(entry.stage(), Some(Stage::TotalInference));
        assert_eq!(entry.value(), Some(812.5));
        match entry.payload {
            Payload::TotalInference {
                generated_tokens, ..
            } => assert_eq!(generated_tokens, 24),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_missing_frame_id_uses_sentinel() {
        let entry = parse_line(r#"{"ts_ms": 5, "stage": "rss_bytes", "value": 1048576}"#).unwrap();
        assert_eq!(entry.frame_id, NO_FRAME_ID);
        assert_eq!(entry.frame_id(), None);
    }

    #[test]
    fn test_scheduler_decision_needs_no_value() {
        let entry = parse_line(
            r#"{"ts_ms": 5, "stage": "scheduler_decision", "action": "degrade", "reason": "memoryCeiling"}"#,
        )
        .unwrap();
        assert_eq!(
            entry.payload,
            Payload::SchedulerDecision {
                action: Some("degrade".to_string()),
                reason: Some("memoryCeiling".to_string()),
            }
        );
        assert_eq!(entry.value(), None);
    }

    #[test]
    fn test_budget_violation_observe_only_defaults_false() {
        let entry = parse_line(r#"{"ts_ms": 5, "stage": "budget_violation"}"#).unwrap();
        assert_eq!(
            entry.payload,
            Payload::BudgetViolation {
                observe_only: false,
                constraint: None,
            }
        );
    }

    #[test]
    fn test_measurement_without_value_is_rejected() {
        let err = parse_line(r#"{"ts_ms": 5, "stage": "decode"}"#).unwrap_err();
        assert!(matches!(err, LineError::MissingValue("decode")));
    }

    #[test]
    fn test_unknown_stage_is_kept() {
        let entry = parse_line(r#"{"ts_ms": 5, "stage": "gpu_temp", "value": 41.0}"#).unwrap();
        assert_eq!(entry.stage(), None);
        assert_eq!(entry.stage_name(), "gpu_temp");
        assert_eq!(entry.value(), Some(41.0));
    }

    #[test]
    fn test_parse_trace_skips_blank_and_malformed_lines() {
        let text = "\
{\"frame_id\": 1, \"ts_ms\": 0, \"stage\": \"decode\", \"value\": 10}

not json at all
{\"frame_id\": 1, \"ts_ms\": 10, \"stage\": \"total_inference\", \"value\": 20}
{\"ts_ms\": \"late\", \"stage\": \"decode\", \"value\": 1}
";
        let entries = parse_trace_str(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stage_name(), "decode");
        assert_eq!(entries[1].stage_name(), "total_inference");
    }

    #[test]
    fn test_load_trace_missing_file() {
        let err = load_trace(Path::new("/nonexistent/soak.jsonl")).unwrap_err();
        assert!(matches!(err, AnalysisError::TraceNotFound(_)));
    }

    #[test]
    fn test_load_nonempty_trace_rejects_garbage_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file, "{{ also garbage").unwrap();

        let err = load_nonempty_trace(file.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyTrace(_)));
    }

    #[test]
    fn test_stage_in_time_order_sorts_by_timestamp() {
        let entries = parse_trace_str(
            "{\"ts_ms\": 30, \"stage\": \"thermal_state\", \"value\": 2}\n\
             {\"ts_ms\": 10, \"stage\": \"thermal_state\", \"value\": 0}\n\
             {\"ts_ms\": 20, \"stage\": \"decode\", \"value\": 5}\n",
        );
        let thermal = stage_in_time_order(&entries, Stage::ThermalState);
        assert_eq!(thermal.len(), 2);
        assert_eq!(thermal[0].ts_ms, 10);
        assert_eq!(thermal[1].ts_ms, 30);
    }

    #[test]
    fn test_benchmark_mode_header() {
        let entries = parse_trace_str(
            "{\"ts_ms\": 0, \"stage\": \"benchmark_mode\", \"mode\": \"cpu_only\"}\n\
             {\"ts_ms\": 1, \"stage\": \"decode\", \"value\": 5}\n",
        );
        assert_eq!(benchmark_mode(&entries), Some("cpu_only"));
        assert_eq!(first_timestamp(&entries), Some(0));
    }

    #[test]
    fn test_stage_names_round_trip() {
        for stage in [
            Stage::ImageEncode,
            Stage::PromptEval,
            Stage::Decode,
            Stage::TotalInference,
            Stage::RssBytes,
            Stage::ThermalState,
            Stage::BatteryLevel,
            Stage::AvailableMemory,
            Stage::DroppedFrames,
            Stage::SchedulerDecision,
            Stage::BudgetViolation,
            Stage::BenchmarkMode,
        ] {
            assert_eq!(Stage::from_name(stage.as_str()), Some(stage));
        }
    }

    #[test]
    fn test_elapsed_ms_spans_full_i64_range() {
        assert_eq!(elapsed_ms(1_000, 61_000), 60_000.0);
        assert_eq!(elapsed_ms(61_000, 1_000), -60_000.0);
        assert_eq!(elapsed_ms(i64::MIN, i64::MAX), u64::MAX as f64);
        assert_eq!(elapsed_ms(i64::MAX, i64::MIN), -(u64::MAX as f64));
    }
}
