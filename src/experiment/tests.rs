// Tests for experiment records, the store and comparisons
//
// Traces are generated as JSONL text so the same fixtures exercise the
// parser, the record builder and the file-based comparison paths.

use super::*;
use crate::backend::{BackendKind, ScalarBackend};
use crate::error::AnalysisError;
use crate::hypothesis::{Thresholds, Verdict};
use crate::trace::{parse_trace_str, TraceEntry};
use chrono::{Local, TimeZone, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// A healthy soak run: one frame every 2 s, latency `base_ms` + jitter,
/// flat RSS, nominal thermal, slow battery drain
fn soak_jsonl(minutes: i64, base_ms: f64, mode: Option<&str>) -> String {
    let mut text = String::new();
    if let Some(mode) = mode {
        writeln!(text, r#"{{"ts_ms": 0, "stage": "benchmark_mode", "mode": "{}"}}"#, mode).unwrap();
    }

    let end_ms = minutes * 60_000;
    let mut frame_id: i64 = 0;
    let mut ts = 0;
    while ts <= end_ms {
        let latency = base_ms + (frame_id % 5) as f64 * 10.0;
        writeln!(
            text,
            r#"{{"frame_id": {}, "ts_ms": {}, "stage": "decode", "value": {}}}"#,
            frame_id,
            ts,
            latency / 2.0
        )
        .unwrap();
        writeln!(
            text,
            r#"{{"frame_id": {}, "ts_ms": {}, "stage": "total_inference", "value": {}, "generated_tokens": 16}}"#,
            frame_id, ts, latency
        )
        .unwrap();

        if ts % 10_000 == 0 {
            writeln!(
                text,
                r#"{{"ts_ms": {}, "stage": "rss_bytes", "value": {}}}"#,
                ts,
                200 * 1024 * 1024
            )
            .unwrap();
        }
        if ts % 30_000 == 0 {
            writeln!(text, r#"{{"ts_ms": {}, "stage": "thermal_state", "value": 0}}"#, ts).unwrap();
        }
        if ts % 60_000 == 0 {
            let level = 0.9 - 0.001 * (ts / 60_000) as f64;
            writeln!(text, r#"{{"ts_ms": {}, "stage": "battery_level", "value": {}}}"#, ts, level)
                .unwrap();
        }

        frame_id += 1;
        ts += 2_000;
    }
    text
}

fn soak_entries(minutes: i64, base_ms: f64) -> Vec<TraceEntry> {
    parse_trace_str(&soak_jsonl(minutes, base_ms, None))
}

fn record(id: &str, entries: &[TraceEntry]) -> ExperimentRecord {
    ExperimentRecord::builder(id)
        .tag("baseline")
        .git_hash(Some("abc1234".to_string()))
        .trace_path(Path::new("/data/traces/soak.jsonl"))
        .device_model(Some("Pixel 9".to_string()))
        .created_at(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap())
        .build(entries)
}

fn write_trace(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

// ── Records ─────────────────────────────────────────────────────────────

#[test]
fn test_healthy_run_record() {
    let rec = record("20260314_093000_abc1234", &soak_entries(12, 1000.0));

    assert_eq!(rec.summary(), "6/6 PASS");
    assert_eq!(rec.timestamp(), "2026-03-14T09:30:00Z");
    assert_eq!(rec.date(), "2026-03-14");
    assert_eq!(rec.trace_file(), "soak.jsonl");
    assert_eq!(rec.device().model, "Pixel 9");
    assert_eq!(rec.device().os_version, "unknown");
    assert_eq!(rec.duration_min(), 12.0);

    let m = rec.metrics();
    assert_eq!(m.frames.total, 361);
    assert_eq!(m.frames.dropped, 0);
    assert_eq!(m.latency_p95(), Some(1040.0));
    assert_eq!(m.memory.rss_peak_mb, 200.0);
    assert_eq!(m.memory.rss_slope_mb_per_min, Some(0.0));
    assert_eq!(m.thermal.map(|t| t.nominal_pct), Some(100.0));
    assert_eq!(m.battery_drain_per_10min(), Some(1.0));
    assert_eq!(m.tokens.total_generated, 361 * 16);
    assert!(m.stability.is_stable);
}

#[test]
fn test_short_run_is_inconclusive_not_failed() {
    let entries = parse_trace_str(
        "{\"frame_id\": 1, \"ts_ms\": 0, \"stage\": \"total_inference\", \"value\": 900}\n\
         {\"frame_id\": 2, \"ts_ms\": 1000, \"stage\": \"total_inference\", \"value\": 950}\n",
    );
    let rec = ExperimentRecord::builder("x").build(&entries);
    let h = rec.hypotheses();

    assert_eq!(h.stability.verdict, Verdict::Inconclusive);
    assert_eq!(h.latency.verdict, Verdict::Inconclusive);
    assert_eq!(h.memory.verdict, Verdict::Inconclusive);
    assert_eq!(h.thermal.verdict, Verdict::Inconclusive);
    assert_eq!(h.battery.verdict, Verdict::Inconclusive);
    assert_eq!(h.budget.verdict, Verdict::Pass);
    assert_eq!(rec.summary(), "1/6 PASS");
    assert_eq!(rec.tag(), "");
    assert_eq!(rec.git_hash(), None);
}

#[test]
fn test_thresholds_change_verdicts() {
    let strict = Thresholds {
        p95_latency_ms: 1000.0,
        ..Thresholds::default()
    };
    let rec = ExperimentRecord::builder("x")
        .thresholds(strict)
        .build(&soak_entries(12, 1000.0));
    assert_eq!(rec.hypotheses().latency.verdict, Verdict::Fail);
    assert_eq!(rec.summary(), "5/6 PASS");
}

#[test]
fn test_simd_backend_builds_same_verdicts() {
    let entries = soak_entries(12, 1000.0);
    let scalar = ExperimentRecord::builder("x").build(&entries);
    let simd = ExperimentRecord::builder("x")
        .backend(BackendKind::Simd)
        .build(&entries);
    assert_eq!(scalar.hypotheses(), simd.hypotheses());
    assert_eq!(scalar.metrics().latency, simd.metrics().latency);
}

#[test]
fn test_generate_experiment_id() {
    let now = Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(
        generate_experiment_id(now, Some("abc1234")),
        "20260102_030405_abc1234"
    );
    assert_eq!(generate_experiment_id(now, None), "20260102_030405");
}

#[test]
fn test_absent_metrics_serialize_as_null() {
    let entries = parse_trace_str("{\"ts_ms\": 0, \"stage\": \"decode\", \"value\": 5}\n");
    let rec = ExperimentRecord::builder("x").build(&entries);
    let json = serde_json::to_value(&rec).unwrap();

    assert!(json["metrics"]["drift"].is_null());
    assert!(json["metrics"]["thermal"].is_null());
    assert!(json["metrics"]["battery"].is_null());
    assert!(json["metrics"]["latency"].get("total_inference").is_none());
    assert!(json["metrics"]["memory"].get("rss_slope_mb_per_min").is_none());
    assert_eq!(json["hypotheses"]["H3_memory"]["verdict"], "INCONCLUSIVE");
}

// ── Store ───────────────────────────────────────────────────────────────

#[test]
fn test_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = ExperimentStore::new(dir.path().join("store"));
    let rec = record("20260314_093000_abc1234", &soak_entries(12, 1000.0));

    store.append(&rec).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded.len(), 1);
    let found = find(&loaded, "20260314_093000_abc1234").unwrap();
    assert_eq!(found, &rec);
}

#[test]
fn test_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = ExperimentStore::new(dir.path());
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_corrupt_store_is_reset() {
    let dir = tempfile::tempdir().unwrap();
    let store = ExperimentStore::new(dir.path());
    std::fs::write(store.json_path(), "{ this is not an array").unwrap();

    store.append(&record("a", &soak_entries(1, 1000.0))).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id(), "a");

    let text = std::fs::read_to_string(store.json_path()).unwrap();
    assert!(text.starts_with('['));
    assert!(text.ends_with("]\n"));
}

#[test]
fn test_foreign_elements_are_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let store = ExperimentStore::new(dir.path());
    std::fs::write(store.json_path(), r#"[{"id": "legacy", "note": "old schema"}]"#).unwrap();

    store.append(&record("new", &soak_entries(1, 1000.0))).unwrap();

    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(store.json_path()).unwrap()).unwrap();
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0], serde_json::json!({"id": "legacy", "note": "old schema"}));

    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id(), "new");
}

/// Record as written by the earlier analyzer: no latency samples, no drift,
/// no thermal data and `{}` for the battery block
const EARLY_FORMAT_RECORD: &str = r#"[{
  "id": "20250901_120000_1a2b3c4",
  "tag": "cold-start",
  "timestamp": "2025-09-01T10:00:00Z",
  "git_hash": "1a2b3c4",
  "trace_file": "run.jsonl",
  "device": {"model": "unknown", "os_version": "unknown"},
  "duration": {"actual_min": 0.5},
  "metrics": {
    "frames": {"total": 0, "dropped": 0},
    "latency": {},
    "drift": null,
    "throughput": {"avg_fpm": 0.0, "min_fpm": 0.0, "max_fpm": 0.0},
    "tokens": {"total_generated": 0, "tokens_per_sec": 0},
    "memory": {"rss_peak_mb": 0.0},
    "thermal": null,
    "battery": {},
    "scheduler": {"degrade_count": 0, "restore_count": 0, "degrade_reasons": {},
                  "actionable_violations": 0, "observe_only_violations": 0,
                  "memory_triggered_degrades": 0},
    "stability": {"gap_count": 0, "max_gap_seconds": 0.0, "frame_id_breaks": 0, "is_stable": true}
  },
  "hypotheses": {
    "H1_stability": {"verdict": "INCONCLUSIVE", "criteria": "c", "evidence": "0 frames, insufficient data"},
    "H2_latency": {"verdict": "INCONCLUSIVE", "criteria": "c", "evidence": "insufficient latency data"},
    "H3_memory": {"verdict": "INCONCLUSIVE", "criteria": "c", "evidence": "no RSS slope data"},
    "H4_thermal": {"verdict": "INCONCLUSIVE", "criteria": "c", "evidence": "no thermal data"},
    "H5_battery": {"verdict": "INCONCLUSIVE", "criteria": "c", "evidence": "no battery data"},
    "H6_budget": {"verdict": "PASS", "criteria": "c", "evidence": "memory_degrades=0"}
  },
  "summary": "1/6 PASS"
}]"#;

#[test]
fn test_empty_battery_object_loads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = ExperimentStore::new(dir.path());
    std::fs::write(store.json_path(), EARLY_FORMAT_RECORD).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 1);
    let early = &loaded[0];
    assert_eq!(early.id(), "20250901_120000_1a2b3c4");
    assert_eq!(early.metrics().battery, None);
    assert_eq!(early.metrics().battery_drain_per_10min(), None);
    assert_eq!(early.metrics().latency_p95(), None);
    assert_eq!(early.summary(), "1/6 PASS");

    // Still listed and comparable next to a new record
    store.append(&record("20260101_000000", &soak_entries(12, 1000.0))).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 2);
    let (a, b) = select_pair(&loaded, Some("20250901"), None).unwrap();
    assert_eq!(a.id(), "20250901_120000_1a2b3c4");
    assert_eq!(b.id(), "20260101_000000");
}

#[test]
fn test_battery_block_round_trips() {
    let rec = record("b", &soak_entries(12, 1000.0));
    assert!(rec.metrics().battery.is_some());

    let json = serde_json::to_string(&rec).unwrap();
    let back: ExperimentRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.metrics().battery, rec.metrics().battery);

    let mut value = serde_json::to_value(&rec).unwrap();
    value["metrics"]["battery"] = serde_json::Value::Null;
    let nulled: ExperimentRecord = serde_json::from_value(value).unwrap();
    assert_eq!(nulled.metrics().battery, None);
}

#[test]
fn test_markdown_log() {
    let dir = tempfile::tempdir().unwrap();
    let store = ExperimentStore::new(dir.path());
    let entries = soak_entries(12, 1000.0);

    store.append(&record("run_one", &entries)).unwrap();
    store.append(&record("run_two", &entries)).unwrap();

    let md = std::fs::read_to_string(store.markdown_path()).unwrap();
    assert!(md.starts_with("# Soak Test Experiments\n\n## Run: run_one [baseline]\n"));
    assert_eq!(md.matches("# Soak Test Experiments").count(), 1);
    assert!(md.contains("## Run: run_two [baseline]"));
    assert!(md.contains(
        "**Date:** 2026-03-14 | **Git:** `abc1234` | **Duration:** 12.0 min | **Frames:** 361"
    ));
    assert!(md.contains("| H1: Stability | PASS | 361 frames, 12.0 min, 0 gaps, 0 breaks |"));
    assert!(md.contains("**Result: 6/6 PASS**"));
    assert!(md.contains("<details><summary>Full Metrics</summary>"));
    assert!(md.contains("\"rss_peak_mb\": 200.0"));
}

#[test]
fn test_markdown_without_tag_or_hash() {
    let rec = ExperimentRecord::builder("plain").build(&soak_entries(1, 1000.0));
    let section = format_markdown_section(&rec).unwrap();
    assert!(section.starts_with("## Run: plain\n"));
    assert!(section.contains("**Git:** N/A"));
    assert!(section.ends_with("---\n"));
}

// ── Comparison ──────────────────────────────────────────────────────────

#[test]
fn test_find_by_prefix_first_match() {
    let entries = soak_entries(1, 1000.0);
    let records = vec![
        record("20260301_100000_aaa", &entries),
        record("20260301_110000_bbb", &entries),
    ];
    assert_eq!(find(&records, "20260301").unwrap().id(), "20260301_100000_aaa");
    assert_eq!(find(&records, "20260301_11").unwrap().id(), "20260301_110000_bbb");
    assert!(find(&records, "2025").is_none());
}

#[test]
fn test_select_pair_rules() {
    let entries = soak_entries(1, 1000.0);
    let records = vec![
        record("r1", &entries),
        record("r2", &entries),
        record("r3", &entries),
    ];

    let (a, b) = select_pair(&records, None, None).unwrap();
    assert_eq!((a.id(), b.id()), ("r2", "r3"));

    let (a, b) = select_pair(&records, Some("r1"), None).unwrap();
    assert_eq!((a.id(), b.id()), ("r1", "r3"));

    let (a, b) = select_pair(&records, Some("r3"), Some("r2")).unwrap();
    assert_eq!((a.id(), b.id()), ("r3", "r2"));

    let err = select_pair(&records, Some("r9"), None).unwrap_err();
    assert!(matches!(err, AnalysisError::ExperimentNotFound(id) if id == "r9"));

    let err = select_pair(&records[..1], None, None).unwrap_err();
    assert!(matches!(err, AnalysisError::NotEnoughExperiments { found: 1 }));
}

#[test]
fn test_compare_records_polarity() {
    let fast = record("fast", &soak_entries(12, 1000.0));
    let slow = record("slow", &soak_entries(12, 1300.0));
    let cmp = compare_records(&fast, &slow);

    let p95 = cmp
        .deltas
        .iter()
        .find(|d| d.label == "p95 latency (ms)")
        .unwrap();
    assert_eq!(p95.delta(), Some(300.0));
    assert_eq!(p95.change(), Some(Change::Regressed));

    let frames = cmp.deltas.iter().find(|d| d.label == "Frames").unwrap();
    assert_eq!(frames.change(), None);

    let reverse = compare_records(&slow, &fast);
    let p95 = reverse
        .deltas
        .iter()
        .find(|d| d.label == "p95 latency (ms)")
        .unwrap();
    assert_eq!(p95.change(), Some(Change::Improved));

    assert_eq!(cmp.verdicts().len(), 6);
}

#[test]
fn test_metric_delta_absent_sides() {
    let one_sided = MetricDelta {
        label: "Drift (%)",
        a: None,
        b: Some(4.0),
        polarity: Polarity::LowerIsBetter,
    };
    assert_eq!(one_sided.delta(), None);
    assert_eq!(one_sided.change(), None);

    let tiny = MetricDelta {
        label: "RSS slope (MB/min)",
        a: Some(1.000),
        b: Some(1.005),
        polarity: Polarity::LowerIsBetter,
    };
    assert_eq!(tiny.change(), None);

    let higher = MetricDelta {
        label: "Frames",
        a: Some(100.0),
        b: Some(120.0),
        polarity: Polarity::HigherIsBetter,
    };
    assert_eq!(higher.change(), Some(Change::Improved));
}

#[test]
fn test_compare_records_omits_metrics_absent_on_both_sides() {
    let entries = parse_trace_str("{\"ts_ms\": 0, \"stage\": \"decode\", \"value\": 5}\n");
    let a = ExperimentRecord::builder("a").build(&entries);
    let b = ExperimentRecord::builder("b").build(&entries);
    let cmp = compare_records(&a, &b);

    let labels: Vec<&str> = cmp.deltas.iter().map(|d| d.label).collect();
    assert!(!labels.contains(&"Drift (%)"));
    assert!(!labels.contains(&"p95 latency (ms)"));
    assert!(labels.contains(&"Duration (min)"));
    assert!(labels.contains(&"Memory degrades"));
}

#[test]
fn test_compare_traces_labels_and_overlays() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_trace(dir.path(), "cpu_run.jsonl", &soak_jsonl(3, 1000.0, None));
    let b = write_trace(dir.path(), "gpu_run.jsonl", &soak_jsonl(3, 700.0, Some("metal")));

    let cmp = compare_traces(&a, &b, &ScalarBackend).unwrap();
    assert_eq!(cmp.a.label, "cpu_run");
    assert_eq!(cmp.b.label, "metal");

    let p50 = cmp
        .deltas
        .iter()
        .find(|d| d.label == "p50 latency (ms)")
        .unwrap();
    assert_eq!(p50.change(), Some(Change::Improved));

    let charts = cmp.overlay_charts();
    assert_eq!(charts.len(), 3);
    for chart in &charts {
        assert_eq!(chart.series.len(), 2, "{}", chart.name);
    }
    assert_eq!(charts[2].series[0].y[0], 200.0);
}

#[test]
fn test_compare_traces_missing_or_empty_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_trace(dir.path(), "good.jsonl", &soak_jsonl(1, 1000.0, None));
    let empty = write_trace(dir.path(), "empty.jsonl", "\n\n");

    let err = compare_traces(&good, &dir.path().join("nope.jsonl"), &ScalarBackend).unwrap_err();
    assert!(matches!(err, AnalysisError::TraceNotFound(_)));

    let err = compare_traces(&empty, &good, &ScalarBackend).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyTrace(_)));
}
