//! Chart data export
//!
//! Charts are described as named collections of numeric series and handed to
//! a [`ChartRenderer`]. The bundled [`CsvChartRenderer`] writes one long-form
//! CSV file per chart (`series,<x>,<y>` rows) that any plotting tool can read.

use crate::error::{AnalysisError, Result};
use crate::metrics::{compute_throughput, extract_time_series, TimeSeries};
use crate::stats::sorted_values;
use crate::trace::{Stage, TraceEntry};
use std::fs;
use std::path::{Path, PathBuf};

/// One named line of a chart
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn new(label: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            x,
            y,
        }
    }

    /// Time series with seconds converted to minutes
    pub fn from_time_series(label: impl Into<String>, series: &TimeSeries) -> Self {
        Self::new(
            label,
            series.seconds.iter().map(|s| s / 60.0).collect(),
            series.values.clone(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Chart description independent of any rendering backend
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// File stem of the rendered artifact
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl Chart {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
        }
    }

    /// Add a series unless it has no points
    pub fn with_series(mut self, series: Series) -> Self {
        if !series.is_empty() {
            self.series.push(series);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Turns chart descriptions into artifacts on disk
pub trait ChartRenderer {
    /// Render one chart, returning the written path (`None` if nothing was written)
    fn render(&self, chart: &Chart, output_dir: &Path) -> Result<Option<PathBuf>>;

    /// Render every non-empty chart, creating `output_dir` if needed
    fn render_all(&self, charts: &[Chart], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for chart in charts.iter().filter(|c| !c.is_empty()) {
            if let Some(path) = self.render(chart, output_dir)? {
                written.push(path);
            }
        }
        Ok(written)
    }
}

/// Chart output selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ChartFormat {
    /// One CSV file per chart
    #[default]
    Csv,
    /// Skip chart output
    None,
}

impl ChartFormat {
    pub fn renderer(self) -> Box<dyn ChartRenderer> {
        match self {
            ChartFormat::Csv => Box::new(CsvChartRenderer),
            ChartFormat::None => Box::new(NoopRenderer),
        }
    }
}

/// Long-form CSV writer
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvChartRenderer;

impl CsvChartRenderer {
    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// Generate CSV text for a chart
    pub fn to_csv(chart: &Chart) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "series,{},{}\n",
            Self::escape_field(&chart.x_label),
            Self::escape_field(&chart.y_label)
        ));

        for series in &chart.series {
            let label = Self::escape_field(&series.label);
            for (x, y) in series.x.iter().zip(&series.y) {
                output.push_str(&format!("{},{},{}\n", label, x, y));
            }
        }

        output
    }
}

impl ChartRenderer for CsvChartRenderer {
    fn render(&self, chart: &Chart, output_dir: &Path) -> Result<Option<PathBuf>> {
        fs::create_dir_all(output_dir).map_err(|source| AnalysisError::Write {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let path = output_dir.join(format!("{}.csv", chart.name));
        fs::write(&path, Self::to_csv(chart)).map_err(|source| AnalysisError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("wrote chart '{}' to {}", chart.title, path.display());
        Ok(Some(path))
    }
}

/// Renderer that writes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRenderer;

impl ChartRenderer for NoopRenderer {
    fn render(&self, _chart: &Chart, _output_dir: &Path) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Standard charts for a single trace
///
/// Latency over time, throughput over time, thermal state with battery level,
/// and the per-stage latency distribution (sorted values against quantile).
pub fn trace_charts(entries: &[TraceEntry]) -> Vec<Chart> {
    let latency = Chart::new(
        "latency_timeseries",
        "Total Inference Latency Over Time",
        "minutes",
        "latency_ms",
    )
    .with_series(Series::from_time_series(
        Stage::TotalInference.as_str(),
        &extract_time_series(entries, Stage::TotalInference),
    ));

    let samples = compute_throughput(entries);
    let throughput = Chart::new(
        "throughput_timeseries",
        "Throughput Over Time",
        "minutes",
        "frames_per_minute",
    )
    .with_series(Series::new(
        "frames_per_minute",
        samples.iter().map(|s| s.minute).collect(),
        samples.iter().map(|s| s.frames_per_minute).collect(),
    ));

    let battery_pct = extract_time_series(entries, Stage::BatteryLevel).map_values(|v| v * 100.0);
    let thermal_battery = Chart::new(
        "thermal_battery_overlay",
        "Thermal State & Battery Level Over Time",
        "minutes",
        "value",
    )
    .with_series(Series::from_time_series(
        "thermal_state",
        &extract_time_series(entries, Stage::ThermalState),
    ))
    .with_series(Series::from_time_series("battery_pct", &battery_pct));

    let mut distribution = Chart::new(
        "latency_distribution",
        "Latency Distribution by Stage",
        "quantile",
        "latency_ms",
    );
    for stage in Stage::LATENCY {
        let values: Vec<f64> = entries
            .iter()
            .filter(|e| e.is_stage(stage))
            .filter_map(TraceEntry::value)
            .collect();
        distribution = distribution.with_series(quantile_series(stage.as_str(), &values));
    }

    vec![latency, throughput, thermal_battery, distribution]
}

/// Empirical distribution: i-th sorted value at quantile i / (n - 1)
fn quantile_series(label: &str, values: &[f64]) -> Series {
    let sorted = sorted_values(values);
    let last = sorted.len().saturating_sub(1).max(1) as f64;
    let quantiles = (0..sorted.len()).map(|i| i as f64 / last).collect();
    Series::new(label, quantiles, sorted)
}
