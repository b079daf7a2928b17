//! Experiment Store - append-only persistence of experiment records
//!
//! Two sinks share one directory:
//!
//! - `experiments.json`: a pretty-printed JSON array, rewritten whole on
//!   every append
//! - `EXPERIMENTS.md`: a human-readable log, one section per run
//!
//! The store assumes a single writer and is not transactional.

use super::record::ExperimentRecord;
use crate::error::{AnalysisError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Structured store file name
pub const EXPERIMENTS_JSON: &str = "experiments.json";

/// Markdown log file name
pub const EXPERIMENTS_MD: &str = "EXPERIMENTS.md";

const MARKDOWN_HEADER: &str = "# Soak Test Experiments\n\n";

/// File-backed experiment store rooted at a directory
#[derive(Debug, Clone)]
pub struct ExperimentStore {
    dir: PathBuf,
}

impl ExperimentStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn json_path(&self) -> PathBuf {
        self.dir.join(EXPERIMENTS_JSON)
    }

    #[must_use]
    pub fn markdown_path(&self) -> PathBuf {
        self.dir.join(EXPERIMENTS_MD)
    }

    /// Append to both sinks
    pub fn append(&self, record: &ExperimentRecord) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| AnalysisError::Write {
            path: self.dir.clone(),
            source,
        })?;
        self.append_json(record)?;
        self.append_markdown(record)?;
        Ok(())
    }

    /// Append to `experiments.json`
    ///
    /// Existing elements are kept as raw JSON, so records written by other
    /// tool versions survive untouched. A file that is not a JSON array is
    /// replaced by a fresh array (with a warning).
    pub fn append_json(&self, record: &ExperimentRecord) -> Result<()> {
        let path = self.json_path();
        let mut elements = self.read_raw_elements()?.unwrap_or_default();
        elements.push(serde_json::to_value(record)?);

        let mut text = serde_json::to_string_pretty(&elements)?;
        text.push('\n');
        fs::write(&path, text).map_err(|source| AnalysisError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!("saved experiment {} to {}", record.id(), path.display());
        Ok(())
    }

    /// Append a section to `EXPERIMENTS.md`, creating it with a header
    pub fn append_markdown(&self, record: &ExperimentRecord) -> Result<()> {
        let path = self.markdown_path();
        let section = format_markdown_section(record)?;
        let is_new = !path.is_file();

        let write_err = |source| AnalysisError::Write {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(write_err)?;
        if is_new {
            file.write_all(MARKDOWN_HEADER.as_bytes())
                .map_err(write_err)?;
        }
        file.write_all(section.as_bytes()).map_err(write_err)?;

        tracing::info!("saved experiment {} to {}", record.id(), path.display());
        Ok(())
    }

    /// Load every record that decodes, in append order
    ///
    /// A missing or corrupt store yields an empty list.
    pub fn load(&self) -> Result<Vec<ExperimentRecord>> {
        let Some(elements) = self.read_raw_elements()? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            match serde_json::from_value::<ExperimentRecord>(element) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("skipping stored experiment #{}: {}", index + 1, e),
            }
        }
        Ok(records)
    }

    /// Raw array elements, `None` when the file is missing or corrupt
    fn read_raw_elements(&self) -> Result<Option<Vec<serde_json::Value>>> {
        let path = self.json_path();
        if !path.is_file() {
            tracing::debug!("no experiment store at {}", path.display());
            return Ok(None);
        }

        let text = fs::read_to_string(&path).map_err(|source| AnalysisError::Read {
            path: path.clone(),
            source,
        })?;
        match serde_json::from_str::<Vec<serde_json::Value>>(&text) {
            Ok(elements) => Ok(Some(elements)),
            Err(e) => {
                tracing::warn!(
                    "experiment store {} is not a JSON array ({}); starting a new one",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }
}

/// Resolve an experiment by exact id or id prefix (first match wins)
pub fn find<'a>(records: &'a [ExperimentRecord], id: &str) -> Option<&'a ExperimentRecord> {
    records
        .iter()
        .find(|r| r.id() == id || r.id().starts_with(id))
}

/// Most recently appended record
pub fn latest(records: &[ExperimentRecord]) -> Option<&ExperimentRecord> {
    records.last()
}

/// Render one `## Run:` section of the markdown log
pub fn format_markdown_section(record: &ExperimentRecord) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();

    let tag_suffix = if record.tag().is_empty() {
        String::new()
    } else {
        format!(" [{}]", record.tag())
    };
    lines.push(format!("## Run: {}{}\n", record.id(), tag_suffix));

    let git = record
        .git_hash()
        .map_or_else(|| "N/A".to_string(), |hash| format!("`{}`", hash));
    lines.push(format!(
        "**Date:** {} | **Git:** {} | **Duration:** {:.1} min | **Frames:** {}\n",
        record.date(),
        git,
        record.duration_min(),
        record.metrics().frames.total
    ));

    lines.push("| Hypothesis | Verdict | Evidence |".to_string());
    lines.push("|:-----------|:-------:|:---------|".to_string());
    for (id, h) in record.hypotheses().iter() {
        lines.push(format!("| {} | {} | {} |", id.label(), h.verdict, h.evidence));
    }

    lines.push(String::new());
    lines.push(format!("**Result: {}**\n", record.summary()));

    lines.push("<details><summary>Full Metrics</summary>\n".to_string());
    lines.push("```json".to_string());
    lines.push(serde_json::to_string_pretty(record.metrics())?);
    lines.push("```\n".to_string());
    lines.push("</details>\n".to_string());
    lines.push("---\n".to_string());

    Ok(lines.join("\n"))
}
