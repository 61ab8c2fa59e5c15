// crates/mcp-conformance-harness/src/artifacts.rs
// ============================================================================
// Module: Run Artifacts
// Description: Per-run artifact directory with canonical JSON output.
// Purpose: Persist reports and backend logs for post-run diagnosis.
// Dependencies: serde, serde_jcs
// ============================================================================

//! ## Overview
//! [`RunArtifacts`] owns one run directory (default
//! `target/mcp-conformance/run_<ms>`). JSON is written with JCS
//! canonicalization so reports diff cleanly across runs.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::HarnessError;
use crate::events::now_millis;
use crate::report::ConformanceReport;

/// Report file names inside the run root.
pub const REPORT_JSON: &str = "report.json";
/// Markdown summary file name.
pub const REPORT_MARKDOWN: &str = "report.md";

/// Returns `target/mcp-conformance/run_<ms>`.
#[must_use]
pub fn default_run_root() -> PathBuf {
    PathBuf::from("target/mcp-conformance").join(format!("run_{}", now_millis()))
}

/// Artifact directory for one run.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// Run root.
    root: PathBuf,
}

impl RunArtifacts {
    /// Creates the run root (`root` or the default).
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Artifact`] when the directory cannot be created.
    pub fn create(root: Option<&Path>) -> Result<Self, HarnessError> {
        let root = root.map_or_else(default_run_root, Path::to_path_buf);
        fs::create_dir_all(&root).map_err(|err| artifact_error(&root, &err))?;
        Ok(Self {
            root,
        })
    }

    /// Returns the run root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the backend log directory.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Artifact`] on serialization or I/O failure.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, HarnessError> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| HarnessError::Artifact {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        fs::write(&path, bytes).map_err(|err| artifact_error(&path, &err))?;
        Ok(path)
    }

    /// Writes a UTF-8 text artifact.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Artifact`] on I/O failure.
    pub fn write_text(&self, name: &str, value: &str) -> Result<PathBuf, HarnessError> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes()).map_err(|err| artifact_error(&path, &err))?;
        Ok(path)
    }

    /// Writes `report.json` and `report.md`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Artifact`] on serialization or I/O failure.
    pub fn write_report(&self, report: &ConformanceReport) -> Result<Vec<PathBuf>, HarnessError> {
        Ok(vec![
            self.write_json(REPORT_JSON, report)?,
            self.write_text(REPORT_MARKDOWN, &report.to_markdown())?,
        ])
    }
}

/// Maps an I/O error at `path`.
fn artifact_error(path: &Path, err: &std::io::Error) -> HarnessError {
    HarnessError::Artifact {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
