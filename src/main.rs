use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use soaktrace::backend::NumericBackend;
use soaktrace::charts::{trace_charts, ChartRenderer};
use soaktrace::cli::{Cli, Mode};
use soaktrace::experiment::{
    compare_records, compare_traces, generate_experiment_id, select_pair, ExperimentRecord,
    ExperimentStore,
};
use soaktrace::hypothesis::Thresholds;
use soaktrace::report;
use soaktrace::revision::{GitRevision, RevisionSource};
use soaktrace::trace::load_nonempty_trace;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber on stderr (warnings by default, everything with --debug)
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn list_experiments(store: &ExperimentStore, out: &mut impl Write) -> Result<()> {
    let records = store
        .load()
        .with_context(|| format!("Failed to load experiments from {}", store.dir().display()))?;
    report::write_experiment_list(out, &records)?;
    Ok(())
}

fn compare_experiments(
    store: &ExperimentStore,
    first: Option<&str>,
    second: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let records = store
        .load()
        .with_context(|| format!("Failed to load experiments from {}", store.dir().display()))?;
    let (a, b) = select_pair(&records, first, second)?;
    report::write_record_comparison(out, &compare_records(a, b))?;
    Ok(())
}

fn compare_trace_files(
    a: &Path,
    b: &Path,
    args: &Cli,
    backend: &dyn NumericBackend,
    out: &mut impl Write,
) -> Result<()> {
    let comparison = compare_traces(a, b, backend)?;
    report::write_trace_comparison(out, &comparison)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| parent_dir(a));
    let written = args
        .charts
        .renderer()
        .render_all(&comparison.overlay_charts(), &output_dir)
        .context("Failed to write comparison charts")?;
    writeln!(out)?;
    report::write_chart_paths(out, &written)?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn analyze(trace: &Path, args: &Cli, backend: &dyn NumericBackend, out: &mut impl Write) -> Result<()> {
    // Threshold files are validated before anything is written
    let thresholds = match (&args.thresholds, args.experiment) {
        (Some(path), true) => Thresholds::from_file(path)
            .with_context(|| format!("Failed to load thresholds from {}", path.display()))?,
        (Some(path), false) => {
            tracing::warn!("--thresholds {} ignored without --experiment", path.display());
            Thresholds::default()
        }
        (None, _) => Thresholds::default(),
    };

    let entries = load_nonempty_trace(trace)?;
    writeln!(out, "Loaded {} entries from {}", entries.len(), trace.display())?;
    writeln!(out)?;
    report::write_trace_summary(out, &entries, backend)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| parent_dir(trace));
    let written = args
        .charts
        .renderer()
        .render_all(&trace_charts(&entries), &output_dir)
        .context("Failed to write charts")?;
    writeln!(out)?;
    report::write_chart_paths(out, &written)?;

    if !args.experiment {
        return Ok(());
    }

    let git_hash = GitRevision::new().revision();
    let id = generate_experiment_id(Local::now(), git_hash.as_deref());
    let record = ExperimentRecord::builder(id)
        .tag(args.tag.clone())
        .git_hash(git_hash)
        .trace_path(trace)
        .device_model(args.device_model.clone())
        .device_os(args.device_os.clone())
        .thresholds(thresholds)
        .backend(args.backend)
        .build(&entries);

    report::write_verdicts(out, record.hypotheses())?;

    let store = ExperimentStore::new(&args.store_dir);
    store
        .append(&record)
        .with_context(|| format!("Failed to record experiment in {}", store.dir().display()))?;

    let (pass, fail, inconclusive) = report::verdict_counts(record.hypotheses());
    tracing::info!(
        "experiment {} recorded: {} pass, {} fail, {} inconclusive",
        record.id(),
        pass,
        fail,
        inconclusive
    );
    writeln!(out)?;
    writeln!(out, "Experiment recorded: {}", record.id())?;
    writeln!(out, "  JSON: {}", store.json_path().display())?;
    writeln!(out, "  Log:  {}", store.markdown_path().display())?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let backend = args.backend.build();
    let store = ExperimentStore::new(&args.store_dir);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.mode() {
        Mode::List => list_experiments(&store, &mut out),
        Mode::Compare { first, second } => compare_experiments(&store, first, second, &mut out),
        Mode::CompareTraces { a, b } => compare_trace_files(a, b, &args, backend.as_ref(), &mut out),
        Mode::Analyze(trace) => analyze(trace, &args, backend.as_ref(), &mut out),
        Mode::Usage => anyhow::bail!("No trace file given. Usage: soaktrace <trace.jsonl> (see --help)"),
    }
}
