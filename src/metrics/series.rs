// Raw (seconds, value) series for chart rendering

use crate::trace::{elapsed_ms, first_timestamp, Stage, TraceEntry};

/// Parallel time/value columns in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    /// Seconds since the first entry of the whole trace
    pub seconds: Vec<f64>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    /// Copy with each value passed through `f`
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            seconds: self.seconds.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Extract one stage's samples, timestamps relative to the global t0
pub fn extract_time_series(entries: &[TraceEntry], stage: Stage) -> TimeSeries {
    let Some(t0) = first_timestamp(entries) else {
        return TimeSeries::default();
    };

    let mut series = TimeSeries::default();
    for entry in entries.iter().filter(|e| e.is_stage(stage)) {
        if let Some(value) = entry.value() {
            series.seconds.push(elapsed_ms(t0, entry.ts_ms) / 1000.0);
            series.values.push(value);
        }
    }
    series
}
