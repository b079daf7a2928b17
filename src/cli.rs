//! CLI argument parsing for soaktrace

use crate::backend::BackendKind;
use crate::charts::ChartFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "soaktrace")]
#[command(version)]
#[command(
    about = "Analyze soak-test JSONL traces, evaluate stability hypotheses and track experiments",
    long_about = None
)]
pub struct Cli {
    /// JSONL trace file to analyze
    #[arg(value_name = "TRACE")]
    pub trace: Option<PathBuf>,

    /// Directory for chart files (default: the trace's directory)
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Chart output format
    #[arg(long = "charts", value_enum, default_value = "csv")]
    pub charts: ChartFormat,

    /// Evaluate hypotheses and append the run to the experiment store
    #[arg(long = "experiment")]
    pub experiment: bool,

    /// Free-form label stored with the experiment
    #[arg(long = "tag", value_name = "TAG", default_value = "")]
    pub tag: String,

    /// Device model stored with the experiment
    #[arg(long = "device-model", value_name = "MODEL")]
    pub device_model: Option<String>,

    /// Device OS version stored with the experiment
    #[arg(long = "device-os", value_name = "VERSION")]
    pub device_os: Option<String>,

    /// JSON or TOML file overriding hypothesis thresholds
    #[arg(long = "thresholds", value_name = "FILE")]
    pub thresholds: Option<PathBuf>,

    /// Directory holding experiments.json and EXPERIMENTS.md
    #[arg(long = "store-dir", value_name = "DIR", default_value = ".")]
    pub store_dir: PathBuf,

    /// Numeric backend for summary statistics
    #[arg(long = "backend", value_enum, default_value = "scalar")]
    pub backend: BackendKind,

    /// Enable trace-level diagnostics on stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// List stored experiments
    #[arg(long = "list", conflicts_with_all = ["compare", "compare_traces"])]
    pub list: bool,

    /// Compare two stored experiments (default: the last two)
    #[arg(
        long = "compare",
        value_name = "ID",
        num_args = 0..=2,
        conflicts_with = "compare_traces"
    )]
    pub compare: Option<Vec<String>>,

    /// Compare two raw trace files
    #[arg(long = "compare-traces", value_names = ["A", "B"], num_args = 2)]
    pub compare_traces: Option<Vec<PathBuf>>,
}

/// What the invocation asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode<'a> {
    List,
    Compare {
        first: Option<&'a str>,
        second: Option<&'a str>,
    },
    CompareTraces {
        a: &'a PathBuf,
        b: &'a PathBuf,
    },
    Analyze(&'a PathBuf),
    /// No trace and no other mode
    Usage,
}

impl Cli {
    pub fn mode(&self) -> Mode<'_> {
        if self.list {
            return Mode::List;
        }
        if let Some(ids) = &self.compare {
            return Mode::Compare {
                first: ids.first().map(String::as_str),
                second: ids.get(1).map(String::as_str),
            };
        }
        if let Some([a, b]) = self.compare_traces.as_deref() {
            return Mode::CompareTraces { a, b };
        }
        match &self.trace {
            Some(trace) => Mode::Analyze(trace),
            None => Mode::Usage,
        }
    }
}
