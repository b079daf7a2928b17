//! Console reports
//!
//! Every printer writes to a caller-supplied `io::Write` so the binary can
//! target stdout while tests capture into a buffer.

use crate::backend::NumericBackend;
use crate::experiment::{ExperimentRecord, MetricDelta, RecordComparison, TraceComparison};
use crate::hypothesis::{Hypotheses, Verdict};
use crate::metrics::{
    compute_throughput, compute_token_metrics, distinct_frame_count, dropped_frame_count,
    duration_minutes, thermal_label, ThroughputSummary, BYTES_PER_MB,
};
use crate::stats::compute_stats_with;
use crate::trace::{stage_in_time_order, Stage, TraceEntry};
use std::io::{self, Write};
use std::path::PathBuf;

/// Full statistics block for one trace
pub fn write_trace_summary<W: Write>(
    out: &mut W,
    entries: &[TraceEntry],
    backend: &dyn NumericBackend,
) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "No trace entries found.");
    }

    writeln!(out, "=== Soak Test Analysis ===")?;
    writeln!(out, "Duration: {:.1} minutes", duration_minutes(entries))?;
    writeln!(out, "Total frames: {}", distinct_frame_count(entries))?;
    writeln!(out, "Dropped frames: {}", dropped_frame_count(entries))?;

    writeln!(out)?;
    writeln!(out, "Latency (ms):")?;
    for stage in Stage::LATENCY {
        let label = format!("{}:", stage.as_str());
        match compute_stats_with(entries, stage.as_str(), backend).populated() {
            None => writeln!(out, "  {:<18} (no data)", label)?,
            Some(s) => writeln!(
                out,
                "  {:<18} p50={:<8.1} p95={:<8.1} p99={:<8.1} mean={:.1}",
                label, s.p50, s.p95, s.p99, s.mean
            )?,
        }
    }

    let throughput = ThroughputSummary::from_samples(&compute_throughput(entries));
    writeln!(out)?;
    writeln!(out, "Throughput:")?;
    writeln!(out, "  Avg frames/min: {:.1}", throughput.avg_fpm)?;
    writeln!(out, "  Min frames/min: {:.1}", throughput.min_fpm)?;
    writeln!(out, "  Max frames/min: {:.1}", throughput.max_fpm)?;

    let tokens = compute_token_metrics(entries, backend);
    writeln!(out)?;
    writeln!(out, "Tokens:")?;
    writeln!(out, "  Total generated: {}", tokens.total_generated)?;
    writeln!(out, "  Avg tokens/sec: {:.1}", tokens.tokens_per_sec)?;

    writeln!(out)?;
    writeln!(out, "System:")?;
    write_system_lines(out, entries, backend)
}

fn write_system_lines<W: Write>(
    out: &mut W,
    entries: &[TraceEntry],
    backend: &dyn NumericBackend,
) -> io::Result<()> {
    match compute_stats_with(entries, Stage::ThermalState.as_str(), backend).populated() {
        Some(thermal) => {
            let peak = thermal.max as i64;
            writeln!(out, "  Thermal peak: {} ({})", peak, thermal_label(peak))?;
        }
        None => writeln!(out, "  Thermal peak: (no data)")?,
    }

    let battery: Vec<f64> = stage_in_time_order(entries, Stage::BatteryLevel)
        .into_iter()
        .filter_map(TraceEntry::value)
        .collect();
    match (battery.first(), battery.last()) {
        (Some(start), Some(end)) if battery.len() >= 2 => {
            let (start, end) = (start * 100.0, end * 100.0);
            writeln!(
                out,
                "  Battery drain: {:.1}% ({:.0}% -> {:.0}%)",
                start - end,
                start,
                end
            )?;
        }
        _ => writeln!(out, "  Battery drain: (no data)")?,
    }

    let rss_peak = entries
        .iter()
        .filter(|e| e.is_stage(Stage::RssBytes))
        .filter_map(TraceEntry::value)
        .reduce(f64::max);
    match rss_peak {
        Some(bytes) => writeln!(out, "  RSS peak: {:.0} MB", bytes / BYTES_PER_MB),
        None => writeln!(out, "  RSS peak: (no data)"),
    }
}

/// Paths written by the chart renderer
pub fn write_chart_paths<W: Write>(out: &mut W, paths: &[PathBuf]) -> io::Result<()> {
    if paths.is_empty() {
        return writeln!(out, "No chart data written.");
    }
    writeln!(out, "Charts generated:")?;
    for path in paths {
        writeln!(out, "  {}", path.display())?;
    }
    Ok(())
}

/// Marker, title and evidence for each hypothesis
pub fn write_verdicts<W: Write>(out: &mut W, hypotheses: &Hypotheses) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "=== Hypothesis Verdicts ===")?;
    writeln!(out)?;
    for (id, h) in hypotheses.iter() {
        writeln!(
            out,
            "  [{}] {:<28} {}",
            h.verdict.marker(),
            id.title(),
            h.evidence
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Result: {}", hypotheses.summary())
}

/// One line per stored experiment
pub fn write_experiment_list<W: Write>(out: &mut W, records: &[ExperimentRecord]) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No experiments recorded.");
    }

    writeln!(
        out,
        "{:<28} {:<14} {:>8} {:>6} {:>8}  Result",
        "ID", "Tag", "Duration", "Frames", "p95(ms)"
    )?;
    writeln!(out, "{}", "-".repeat(80))?;
    for record in records {
        let tag: String = record.tag().chars().take(14).collect();
        writeln!(
            out,
            "{:<28} {:<14} {:>7.1}m {:>6} {:>8.0}  {}",
            record.id(),
            tag,
            record.duration_min(),
            record.metrics().frames.total,
            record.metrics().latency_p95().unwrap_or(0.0),
            record.summary()
        )?;
    }
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.1}", v))
}

fn write_delta_rows<W: Write>(out: &mut W, deltas: &[MetricDelta]) -> io::Result<()> {
    for row in deltas {
        let delta = row.delta().map(|d| format!("{:+.1}", d)).unwrap_or_default();
        let annotation = row.change().map(|c| c.as_str()).unwrap_or_default();
        writeln!(
            out,
            "  {:<24} {:>10} {:>10} {:>10}  {}",
            row.label,
            format_value(row.a),
            format_value(row.b),
            delta,
            annotation
        )?;
    }
    Ok(())
}

/// Delta table, verdict table and summaries of two stored experiments
pub fn write_record_comparison<W: Write>(out: &mut W, cmp: &RecordComparison<'_>) -> io::Result<()> {
    writeln!(out, "=== Experiment Comparison ===")?;
    writeln!(out)?;
    writeln!(out, "  A: {} [{}]", cmp.a.id(), cmp.a.tag())?;
    writeln!(out, "  B: {} [{}]", cmp.b.id(), cmp.b.tag())?;
    writeln!(out)?;

    write_delta_rows(out, &cmp.deltas)?;

    writeln!(out)?;
    writeln!(out, "{:<16} {:>12} {:>12}", "Hypothesis", "A", "B")?;
    writeln!(out, "{}", "-".repeat(42))?;
    for (id, a, b) in cmp.verdicts() {
        writeln!(out, "{:<16} {:>12} {:>12}", id.key(), a.as_str(), b.as_str())?;
    }

    writeln!(out)?;
    writeln!(out, "Summary:  A={}  B={}", cmp.a.summary(), cmp.b.summary())
}

/// Delta table of two raw traces
pub fn write_trace_comparison<W: Write>(out: &mut W, cmp: &TraceComparison) -> io::Result<()> {
    writeln!(out, "=== Trace Comparison ===")?;
    writeln!(out)?;
    writeln!(out, "  A: {}", cmp.a.label)?;
    writeln!(out, "  B: {}", cmp.b.label)?;
    writeln!(out)?;
    write_delta_rows(out, &cmp.deltas)
}

/// Count of verdicts per outcome, for the final log line
pub fn verdict_counts(hypotheses: &Hypotheses) -> (usize, usize, usize) {
    hypotheses
        .iter()
        .fold((0, 0, 0), |(pass, fail, unknown), (_, h)| match h.verdict {
            Verdict::Pass => (pass + 1, fail, unknown),
            Verdict::Fail => (pass, fail + 1, unknown),
            Verdict::Inconclusive => (pass, fail, unknown + 1),
        })
}
