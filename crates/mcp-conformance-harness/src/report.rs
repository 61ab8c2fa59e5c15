// crates/mcp-conformance-harness/src/report.rs
// ============================================================================
// Module: Conformance Report
// Description: Run-level summary of scenario outcomes.
// Purpose: Render results as canonical JSON and markdown.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ConformanceReport`] aggregates [`ScenarioOutcome`] values for one run.
//! The run passes only when no scenario failed.

use std::fmt::Write as _;

use serde::Serialize;

use crate::scenarios::ScenarioOutcome;
use crate::scenarios::ScenarioStatus;

/// Summary of a conformance run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConformanceReport {
    /// Manifest `name` (`unnamed` when absent).
    pub manifest: String,
    /// Inference model, when the backend ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Run start (milliseconds since epoch).
    pub started_at_ms: u128,
    /// Run end (milliseconds since epoch).
    pub ended_at_ms: u128,
    /// Scenario outcomes in execution order.
    pub scenarios: Vec<ScenarioOutcome>,
}

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Passed scenarios.
    pub passed: usize,
    /// Failed scenarios.
    pub failed: usize,
    /// Skipped scenarios.
    pub skipped: usize,
}

impl ConformanceReport {
    /// Returns true when no scenario failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(|outcome| outcome.status != ScenarioStatus::Failed)
    }

    /// Counts outcomes by status.
    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for outcome in &self.scenarios {
            match outcome.status {
                ScenarioStatus::Passed => counts.passed += 1,
                ScenarioStatus::Failed => counts.failed += 1,
                ScenarioStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Returns run duration in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> u128 {
        self.ended_at_ms.saturating_sub(self.started_at_ms)
    }

    /// Returns the outcome for one scenario.
    #[must_use]
    pub fn outcome(&self, scenario: mcp_conformance_config::ScenarioId) -> Option<&ScenarioOutcome> {
        self.scenarios.iter().find(|outcome| outcome.scenario == scenario)
    }

    /// Renders a markdown summary.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let counts = self.counts();
        let mut out = String::new();
        out.push_str("# MCP Conformance Summary\n\n");
        out.push_str("## Run\n\n");
        let _ = writeln!(out, "- Manifest: {}", self.manifest);
        if let Some(model) = &self.model {
            let _ = writeln!(out, "- Model: {model}");
        }
        let _ = writeln!(out, "- Verdict: {}", if self.passed() { "passed" } else { "failed" });
        let _ = writeln!(
            out,
            "- Scenarios: {} passed, {} failed, {} skipped",
            counts.passed, counts.failed, counts.skipped
        );
        let _ = writeln!(out, "- Duration (ms): {}", self.duration_ms());
        out.push_str("\n## Scenarios\n\n");
        out.push_str("| Scenario | Status | Duration (ms) | Detail |\n");
        out.push_str("|----------|--------|---------------|--------|\n");
        for outcome in &self.scenarios {
            let detail = outcome.failure.as_ref().map_or_else(
                || outcome.notes.first().cloned().unwrap_or_default(),
                |failure| format!("{}: {}", failure.kind, failure.message),
            );
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                outcome.scenario.as_str(),
                outcome.status.as_str(),
                outcome.duration_ms,
                detail.replace('|', "\\|").replace('\n', " ")
            );
        }
        out
    }
}
