//! Numeric backend selection for moment computations
//!
//! Mean, population standard deviation, min, max and sums go through a
//! [`NumericBackend`] chosen once at startup:
//!
//! - [`ScalarBackend`]: plain f64 loops. Bit-exact against recorded baselines,
//!   the default.
//! - [`SimdBackend`]: trueno SIMD vectors (f32 lanes). Faster on very large
//!   traces, results agree with scalar within f32 precision.
//!
//! Percentiles never go through the backend; they are rank-indexed on the
//! sorted f64 values so both backends report identical p50/p95/p99.

use std::fmt;

/// Location and spread of a non-empty sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    /// Population standard deviation (divide by n)
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Strategy for the numeric kernels used by the metric computers
pub trait NumericBackend: fmt::Debug {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Moments of `values`, `None` when empty
    fn moments(&self, values: &[f64]) -> Option<Moments>;

    /// Sum of `values` (0.0 when empty)
    fn sum(&self, values: &[f64]) -> f64;
}

/// Backend kind selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackendKind {
    /// Pure f64 arithmetic (bit-exact)
    #[default]
    Scalar,
    /// trueno SIMD vectors
    Simd,
}

impl BackendKind {
    /// Instantiate the backend
    pub fn build(self) -> Box<dyn NumericBackend> {
        match self {
            BackendKind::Scalar => Box::new(ScalarBackend),
            BackendKind::Simd => Box::new(SimdBackend),
        }
    }
}

/// Pure f64 implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarBackend;

impl NumericBackend for ScalarBackend {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn moments(&self, values: &[f64]) -> Option<Moments> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Moments {
            mean,
            std: variance.sqrt(),
            min,
            max,
        })
    }

    fn sum(&self, values: &[f64]) -> f64 {
        values.iter().sum()
    }
}

/// trueno SIMD implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SimdBackend;

impl SimdBackend {
    fn vector(values: &[f64]) -> trueno::Vector<f32> {
        let lanes: Vec<f32> = values.iter().map(|&v| v as f32).collect();
        trueno::Vector::from_slice(&lanes)
    }
}

impl NumericBackend for SimdBackend {
    fn name(&self) -> &'static str {
        "simd"
    }

    fn moments(&self, values: &[f64]) -> Option<Moments> {
        if values.is_empty() {
            return None;
        }
        let v = Self::vector(values);
        Some(Moments {
            mean: f64::from(v.mean().unwrap_or(0.0)),
            std: f64::from(v.stddev().unwrap_or(0.0)),
            min: f64::from(v.min().unwrap_or(0.0)),
            max: f64::from(v.max().unwrap_or(0.0)),
        })
    }

    fn sum(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        f64::from(Self::vector(values).sum().unwrap_or(0.0))
    }
}
