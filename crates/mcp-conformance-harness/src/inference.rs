// crates/mcp-conformance-harness/src/inference.rs
// ============================================================================
// Module: Inference Backend
// Description: Ollama lifecycle: serve, version-probe, ensure model present.
// Purpose: Provide a ready chat endpoint for model-driven scenarios.
// Dependencies: tokio, reqwest
// ============================================================================

//! ## Overview
//! [`InferenceBackend`] wraps a [`ManagedProcess`] running `ollama serve` with
//! a two-phase readiness gate:
//!
//! 1. `GET /api/version` must answer 200 before the readiness deadline.
//! 2. `ollama list` must show the model; otherwise `ollama pull` runs under
//!    its own, much longer deadline.
//!
//! With `reuse_running`, an endpoint that is already healthy is attached to
//! without spawning, and `stop` leaves that daemon alone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::process::Output;
use std::process::Stdio;
use std::time::Duration;

use mcp_conformance_config::InferenceConfig;
use tokio::process::Command;
use tokio::time::Instant;

use crate::chat::ChatClient;
use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedEventSink;
use crate::process::HttpStatusProbe;
use crate::process::ManagedProcess;
use crate::process::ProcessConfig;
use crate::process::ReadinessProbe;
use crate::process::TerminationOutcome;
use crate::process::locate_executable;

/// Component label for events and errors.
const COMPONENT: &str = "inference";
/// Environment key the backend reads its bind address from.
pub const HOST_ENV: &str = "OLLAMA_HOST";

// ============================================================================
// SECTION: Model Provisioning
// ============================================================================

/// How the model became available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    /// Already listed.
    Present,
    /// Pulled during startup.
    Pulled,
}

/// Returns true when `listing` (output of `ollama list`) names `model`.
///
/// Matches the first column exactly, skipping the `NAME` header; an untagged
/// model also matches its `:latest` entry.
#[must_use]
pub fn model_listed(listing: &str, model: &str) -> bool {
    let latest = (!model.contains(':')).then(|| format!("{model}:latest"));
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|name| *name != "NAME")
        .any(|name| name == model || latest.as_deref() == Some(name))
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Managed Ollama backend.
pub struct InferenceBackend {
    /// Backend settings.
    config: InferenceConfig,
    /// Owned `serve` process.
    process: ManagedProcess,
    /// True when attached to a daemon this handle does not own.
    attached: bool,
    /// Both readiness phases completed.
    ready: bool,
    /// Event sink.
    events: SharedEventSink,
}

impl InferenceBackend {
    /// Creates an unstarted backend; `log_dir` receives server output.
    #[must_use]
    pub fn new(config: InferenceConfig, log_dir: Option<PathBuf>, events: SharedEventSink) -> Self {
        let mut env = BTreeMap::new();
        env.insert(HOST_ENV.to_string(), host_port(&config));
        let process = ManagedProcess::new(
            ProcessConfig {
                name: COMPONENT.to_string(),
                program: config.program.clone(),
                args: vec!["serve".to_string()],
                env,
                readiness_timeout: config.readiness_timeout(),
                poll_interval: config.poll_interval(),
                shutdown_grace: config.shutdown_grace(),
                log_dir,
            },
            events.clone(),
        );
        Self {
            config,
            process,
            attached: false,
            ready: false,
            events,
        }
    }

    /// Returns `http://host:port`.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Returns true after both readiness phases succeeded.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns true when attached to an existing daemon.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Returns the owned server process id.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    /// Builds a chat client for this backend.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Chat`] when the HTTP client cannot be built.
    pub fn chat_client(&self) -> Result<ChatClient, HarnessError> {
        Ok(ChatClient::new(&self.base_url(), &self.config.model, self.config.chat_timeout())?)
    }

    /// Starts (or attaches to) the backend and ensures the model exists.
    ///
    /// # Errors
    ///
    /// Returns lifecycle errors; the caller must still call [`Self::stop`].
    pub async fn start(&mut self) -> Result<ModelStatus, HarnessError> {
        let probe = HttpStatusProbe::new(
            format!("{}/api/version", self.base_url()),
            self.config.probe_timeout(),
        )?;
        if self.config.reuse_running && probe.probe().await.is_ok() {
            self.attached = true;
            self.events.record(
                &HarnessEvent::new(COMPONENT, "attach", EventOutcome::Ok)
                    .with_detail(self.base_url()),
            );
        } else {
            self.process.start(&probe).await?;
        }
        let status = self.ensure_model().await?;
        self.ready = true;
        Ok(status)
    }

    /// Lists installed models and pulls the configured one when absent.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DependencyMissing`] when the CLI is not
    /// locatable, [`HarnessError::ModelPullTimeout`] on deadline, and
    /// [`HarnessError::ModelPullFailed`] on non-zero exit.
    pub async fn ensure_model(&self) -> Result<ModelStatus, HarnessError> {
        let program = locate_executable(&self.config.program).ok_or_else(|| {
            HarnessError::DependencyMissing {
                component: COMPONENT.to_string(),
                target: self.config.program.clone(),
            }
        })?;
        let listing = self.run_cli(&program, &["list"], self.config.list_timeout()).await?;
        self.require_success("list", &listing)?;
        if model_listed(&String::from_utf8_lossy(&listing.stdout), &self.config.model) {
            self.events.record(
                &HarnessEvent::new(COMPONENT, "model_check", EventOutcome::Ok)
                    .with_detail(format!("{} present", self.config.model)),
            );
            return Ok(ModelStatus::Present);
        }
        self.events.record(
            &HarnessEvent::new(COMPONENT, "model_pull", EventOutcome::Started)
                .with_detail(self.config.model.clone()),
        );
        let started = Instant::now();
        let model = self.config.model.clone();
        let pull = self.run_cli(&program, &["pull", &model], self.config.pull_timeout()).await;
        let outcome = pull.and_then(|output| self.require_success("pull", &output));
        let (event_outcome, detail) = match &outcome {
            Ok(()) => (EventOutcome::Ok, model),
            Err(err) => (EventOutcome::Failed, err.to_string()),
        };
        self.events.record(
            &HarnessEvent::new(COMPONENT, "model_pull", event_outcome)
                .with_detail(detail)
                .with_elapsed_ms(started.elapsed().as_millis()),
        );
        outcome.map(|()| ModelStatus::Pulled)
    }

    /// Stops an owned server; attached daemons are left running.
    pub async fn stop(&mut self) -> TerminationOutcome {
        self.ready = false;
        if self.attached {
            self.attached = false;
            return TerminationOutcome::NotRunning;
        }
        self.process.stop().await
    }

    /// Runs one backend CLI subcommand against this backend's address.
    async fn run_cli(
        &self,
        program: &Path,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output, HarnessError> {
        let step = args.first().copied().unwrap_or_default();
        let mut command = Command::new(program);
        command
            .args(args)
            .env(HOST_ENV, host_port(&self.config))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = command.spawn().map_err(|err| HarnessError::ModelPullFailed {
            model: self.config.model.clone(),
            step: step.to_string(),
            reason: format!("failed to spawn `{} {}`: {err}", program.display(), args.join(" ")),
        })?;
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(HarnessError::ModelPullFailed {
                model: self.config.model.clone(),
                step: step.to_string(),
                reason: format!("`{}` failed: {err}", args.join(" ")),
            }),
            Err(_) => Err(HarnessError::ModelPullTimeout {
                model: self.config.model.clone(),
                step: step.to_string(),
                timeout,
            }),
        }
    }

    /// Maps a non-zero CLI exit to [`HarnessError::ModelPullFailed`].
    fn require_success(&self, subcommand: &str, output: &Output) -> Result<(), HarnessError> {
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(HarnessError::ModelPullFailed {
            model: self.config.model.clone(),
            step: subcommand.to_string(),
            reason: format!("exited with {}: {}", output.status, stderr.trim()),
        })
    }
}

/// Returns `host:port` for [`HOST_ENV`].
fn host_port(config: &InferenceConfig) -> String {
    format!("{}:{}", config.host, config.port)
}
