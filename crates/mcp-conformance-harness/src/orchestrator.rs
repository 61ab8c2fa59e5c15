// crates/mcp-conformance-harness/src/orchestrator.rs
// ============================================================================
// Module: Conformance Orchestrator
// Description: Session-scoped backend ownership and ordered scenario execution.
// Purpose: Start what the plan needs, run scenarios, and always tear down.
// Dependencies: mcp-conformance-config, mcp-conformance-manifest
// ============================================================================

//! ## Overview
//! [`ConformanceSession`] exclusively owns the inference backend and the tool
//! server for one run. `start` launches only the backends the enabled
//! scenarios need and stops whatever it started if a later step fails.
//! `run` executes scenarios in canonical order; scenario failures never stop
//! later scenarios unless the chat failure policy is `fatal`. `shutdown` is
//! the single teardown routine and is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use mcp_conformance_config::ChatFailurePolicy;
use mcp_conformance_config::ConformanceConfig;
use mcp_conformance_config::ScenarioId;
use mcp_conformance_manifest::ManifestDocument;

use crate::artifacts::RunArtifacts;
use crate::chat::ChatClient;
use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedEventSink;
use crate::events::now_millis;
use crate::inference::InferenceBackend;
use crate::report::ConformanceReport;
use crate::scenarios::ScenarioContext;
use crate::scenarios::ScenarioOutcome;
use crate::scenarios::ScenarioSettings;
use crate::scenarios::run_scenario;
use crate::tool_server::ToolServerManager;

/// Component label for events.
const COMPONENT: &str = "orchestrator";

// ============================================================================
// SECTION: Plan
// ============================================================================

/// Scenarios to run and the backends they need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    /// Enabled scenarios in canonical order.
    pub scenarios: Vec<ScenarioId>,
    /// Any scenario needs the inference backend.
    pub needs_inference: bool,
    /// Any scenario needs the tool server.
    pub needs_tool_server: bool,
}

impl SessionPlan {
    /// Derives the plan from `[scenarios].enabled`.
    #[must_use]
    pub fn from_config(config: &ConformanceConfig) -> Self {
        let scenarios = config.scenarios.ordered();
        Self {
            needs_inference: scenarios.iter().any(|id| id.needs_inference()),
            needs_tool_server: scenarios.iter().any(|id| id.needs_tool_server()),
            scenarios,
        }
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// One conformance run's backends and shared manifest.
pub struct ConformanceSession {
    /// Manifest under test, shared read-only.
    manifest: Arc<ManifestDocument>,
    /// Resolved scenario fixtures.
    settings: ScenarioSettings,
    /// Scenario plan.
    plan: SessionPlan,
    /// Inference backend, when planned.
    inference: Option<InferenceBackend>,
    /// Chat client bound to the ready backend.
    chat: Option<ChatClient>,
    /// Tool server, when planned.
    tool_server: Option<ToolServerManager>,
    /// Event sink.
    events: SharedEventSink,
}

impl ConformanceSession {
    /// Starts the planned backends.
    ///
    /// # Errors
    ///
    /// Returns the first lifecycle failure after stopping everything started.
    pub async fn start(
        config: &ConformanceConfig,
        manifest: Arc<ManifestDocument>,
        log_dir: Option<PathBuf>,
        events: SharedEventSink,
    ) -> Result<Self, HarnessError> {
        let mut session = Self {
            manifest,
            settings: ScenarioSettings::from_config(config),
            plan: SessionPlan::from_config(config),
            inference: None,
            chat: None,
            tool_server: None,
            events,
        };
        if let Err(err) = session.start_backends(config, log_dir).await {
            session.events.record(
                &HarnessEvent::new(COMPONENT, "start", EventOutcome::Failed)
                    .with_detail(err.to_string()),
            );
            session.shutdown().await;
            return Err(err);
        }
        session.events.record(&HarnessEvent::new(COMPONENT, "start", EventOutcome::Ok));
        Ok(session)
    }

    /// Returns the shared manifest.
    #[must_use]
    pub const fn manifest(&self) -> &Arc<ManifestDocument> {
        &self.manifest
    }

    /// Returns the scenario plan.
    #[must_use]
    pub const fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    /// Returns the inference backend, when running.
    #[must_use]
    pub const fn inference(&self) -> Option<&InferenceBackend> {
        self.inference.as_ref()
    }

    /// Returns the tool server, when started.
    #[must_use]
    pub const fn tool_server(&self) -> Option<&ToolServerManager> {
        self.tool_server.as_ref()
    }

    /// Runs planned scenarios in order.
    pub async fn run(&self) -> ConformanceReport {
        let started_at_ms = now_millis();
        let context = ScenarioContext {
            manifest: &self.manifest,
            settings: &self.settings,
            chat: self.chat.as_ref(),
            tool_server: self.tool_server.as_ref(),
            events: &self.events,
        };
        let mut outcomes = Vec::with_capacity(self.plan.scenarios.len());
        let mut halted: Option<String> = None;
        for id in &self.plan.scenarios {
            if let Some(reason) = &halted {
                outcomes.push(ScenarioOutcome::skipped(*id, reason.clone()));
                continue;
            }
            let outcome = run_scenario(*id, &context).await;
            if outcome.failed_on_chat() && self.settings.chat_failure == ChatFailurePolicy::Fatal {
                halted = Some(format!("skipped after fatal chat failure in {}", id.as_str()));
            }
            outcomes.push(outcome);
        }
        ConformanceReport {
            manifest: self.manifest.name().unwrap_or("unnamed").to_string(),
            model: self.inference.as_ref().map(|backend| backend.model().to_string()),
            started_at_ms,
            ended_at_ms: now_millis(),
            scenarios: outcomes,
        }
    }

    /// Stops every backend; idempotent.
    pub async fn shutdown(&mut self) {
        self.chat = None;
        if let Some(backend) = self.inference.as_mut() {
            backend.stop().await;
        }
        if let Some(server) = self.tool_server.as_mut() {
            server.stop();
        }
        self.events.record(&HarnessEvent::new(COMPONENT, "shutdown", EventOutcome::Ok));
    }

    /// Starts the tool server (validation only), then the inference backend.
    async fn start_backends(
        &mut self,
        config: &ConformanceConfig,
        log_dir: Option<PathBuf>,
    ) -> Result<(), HarnessError> {
        if self.plan.needs_tool_server {
            let mut server = ToolServerManager::new(config.tool_server.clone(), self.events.clone());
            server.start()?;
            self.tool_server = Some(server);
        }
        if self.plan.needs_inference {
            let backend = self.inference.insert(InferenceBackend::new(
                config.inference.clone(),
                log_dir,
                self.events.clone(),
            ));
            backend.start().await?;
            self.chat = Some(backend.chat_client()?);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Loads the manifest, runs every planned scenario, tears down, and writes
/// the report into `artifacts` when provided.
///
/// # Errors
///
/// Returns manifest load failures, lifecycle failures from
/// [`ConformanceSession::start`], and artifact write failures. Scenario
/// failures are reported in the returned [`ConformanceReport`].
pub async fn run_conformance(
    config: &ConformanceConfig,
    artifacts: Option<&RunArtifacts>,
    events: SharedEventSink,
) -> Result<ConformanceReport, HarnessError> {
    let manifest = Arc::new(load_manifest(&config.manifest.path)?);
    let log_dir = artifacts
        .filter(|_| config.artifacts.capture_backend_logs)
        .map(RunArtifacts::logs_dir);
    let mut session = ConformanceSession::start(config, manifest, log_dir, events).await?;
    let report = session.run().await;
    session.shutdown().await;
    if let Some(artifacts) = artifacts {
        artifacts.write_report(&report)?;
    }
    Ok(report)
}

/// Reads the manifest document.
fn load_manifest(path: &Path) -> Result<ManifestDocument, HarnessError> {
    Ok(ManifestDocument::load(path)?)
}
