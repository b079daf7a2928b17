//! Source-control revision lookup for experiment ids
//!
//! The revision is best-effort: a missing `git` binary, a directory outside a
//! repository or a non-zero exit all produce `None` and the experiment is
//! recorded without a hash.

use std::path::PathBuf;
use std::process::Command;

/// Supplies the short revision of the code under test
pub trait RevisionSource {
    fn revision(&self) -> Option<String>;
}

/// `git rev-parse --short HEAD`, optionally run in a specific directory
#[derive(Debug, Clone, Default)]
pub struct GitRevision {
    workdir: Option<PathBuf>,
}

impl GitRevision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(workdir.into()),
        }
    }
}

impl RevisionSource for GitRevision {
    fn revision(&self) -> Option<String> {
        let mut cmd = Command::new("git");
        cmd.args(["rev-parse", "--short", "HEAD"]);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("git unavailable: {}", e);
                return None;
            }
        };
        if !output.status.success() {
            tracing::debug!("git rev-parse exited with {}", output.status);
            return None;
        }

        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!hash.is_empty()).then_some(hash)
    }
}

/// Fixed revision, for tests and for callers that already know the hash
#[derive(Debug, Clone, Default)]
pub struct FixedRevision(pub Option<String>);

impl RevisionSource for FixedRevision {
    fn revision(&self) -> Option<String> {
        self.0.clone()
    }
}
