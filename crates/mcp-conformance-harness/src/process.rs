// crates/mcp-conformance-harness/src/process.rs
// ============================================================================
// Module: Managed Process
// Description: Subprocess lifecycle with bounded readiness and staged shutdown.
// Purpose: Start, health-poll, and reclaim backend processes without leaks.
// Dependencies: async-trait, nix, reqwest, tokio
// ============================================================================

//! ## Overview
//! [`ManagedProcess`] spawns an executable with an environment overlay, polls
//! a caller-supplied [`ReadinessProbe`] until it succeeds or a deadline
//! elapses, and stops the child with SIGTERM, a grace period, then SIGKILL.
//!
//! A readiness timeout leaves the child running; callers always follow a
//! failed `start` with `stop`. Children are spawned with `kill_on_drop` so a
//! dropped handle never orphans a process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Child;
use tokio::process::Command;
use tokio::time::Instant;

use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedEventSink;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Launch and lifecycle settings for a managed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    /// Component label used in events, errors, and log file names.
    pub name: String,
    /// Executable name (PATH lookup) or path.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Keys added to or overriding the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Overall readiness deadline.
    pub readiness_timeout: Duration,
    /// Delay between readiness probes.
    pub poll_interval: Duration,
    /// Wait after SIGTERM before SIGKILL.
    pub shutdown_grace: Duration,
    /// Directory receiving `<name>.stdout.log` and `<name>.stderr.log`.
    pub log_dir: Option<PathBuf>,
}

// ============================================================================
// SECTION: Readiness
// ============================================================================

/// Health check polled until a process is ready.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Performs one probe attempt.
    async fn probe(&self) -> Result<(), String>;

    /// Describes the probe target for diagnostics.
    fn describe(&self) -> String;
}

/// Probe that succeeds only on an HTTP 200 response.
pub struct HttpStatusProbe {
    /// HTTP client with the per-attempt timeout applied.
    client: reqwest::Client,
    /// Probe URL.
    url: String,
}

impl HttpStatusProbe {
    /// Builds a probe for `url` with a per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, attempt_timeout: Duration) -> Result<Self, HarnessError> {
        let client = reqwest::Client::builder()
            .timeout(attempt_timeout)
            .build()
            .map_err(|err| HarnessError::transport("readiness probe", err.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReadinessProbe for HttpStatusProbe {
    async fn probe(&self) -> Result<(), String> {
        let response = self.client.get(&self.url).send().await.map_err(|err| err.to_string())?;
        let status = response.status();
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(format!("{} returned {status}", self.url))
        }
    }

    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }
}

/// Successful readiness summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessReport {
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Time until the successful attempt completed.
    pub elapsed: Duration,
}

/// Polls `probe` every `interval` until it succeeds or `timeout` elapses.
///
/// Each attempt is cut off at the remaining deadline, so a hanging probe can
/// never extend the wait past `timeout`.
///
/// # Errors
///
/// Returns [`HarnessError::ReadinessTimeout`] with the attempt count and the
/// last probe error.
pub async fn wait_until_ready(
    component: &str,
    probe: &dyn ReadinessProbe,
    timeout: Duration,
    interval: Duration,
) -> Result<ReadinessReport, HarnessError> {
    let start = Instant::now();
    let deadline = start + timeout;
    let mut attempts = 0u32;
    let mut last_error = format!("{} never attempted", probe.describe());
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        attempts = attempts.saturating_add(1);
        match tokio::time::timeout(remaining, probe.probe()).await {
            Ok(Ok(())) => {
                return Ok(ReadinessReport {
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            Ok(Err(err)) => last_error = err,
            Err(_) => last_error = format!("{} still pending at deadline", probe.describe()),
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(interval.min(remaining)).await;
    }
    Err(HarnessError::ReadinessTimeout {
        component: component.to_string(),
        timeout,
        attempts,
        last_error,
    })
}

// ============================================================================
// SECTION: Executable Lookup
// ============================================================================

/// Resolves `program` to an executable path.
///
/// Bare names are searched on `PATH`; anything containing a path separator is
/// checked for existence as given.
#[must_use]
pub fn locate_executable(program: &str) -> Option<PathBuf> {
    if program.trim().is_empty() {
        return None;
    }
    let candidate = Path::new(program);
    if candidate.is_absolute() || candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

/// Returns true when `path` is a file with an execute bit.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Returns true when `path` is a file.
#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ============================================================================
// SECTION: Termination
// ============================================================================

/// How a child process ended during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationOutcome {
    /// No process was running.
    NotRunning,
    /// Exited within the grace period.
    Graceful,
    /// Force-killed after the grace period.
    Forced,
}

impl TerminationOutcome {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotRunning => "not_running",
            Self::Graceful => "graceful",
            Self::Forced => "forced",
        }
    }
}

/// Terminates `child`: SIGTERM, wait up to `grace`, then kill and reap.
pub async fn terminate_child(child: &mut Child, grace: Duration) -> TerminationOutcome {
    if matches!(child.try_wait(), Ok(Some(_))) {
        return TerminationOutcome::NotRunning;
    }
    send_terminate(child);
    if matches!(tokio::time::timeout(grace, child.wait()).await, Ok(Ok(_))) {
        return TerminationOutcome::Graceful;
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
    TerminationOutcome::Forced
}

/// Sends SIGTERM to the child.
#[cfg(unix)]
fn send_terminate(child: &mut Child) {
    use nix::sys::signal::Signal;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match child.id().and_then(|id| i32::try_from(id).ok()) {
        Some(raw) => {
            let _ = kill(Pid::from_raw(raw), Signal::SIGTERM);
        }
        None => {
            let _ = child.start_kill();
        }
    }
}

/// Requests a forced kill; no graceful signal exists on this platform.
#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
    let _ = child.start_kill();
}

// ============================================================================
// SECTION: Managed Process
// ============================================================================

/// Owned subprocess with readiness tracking.
pub struct ManagedProcess {
    /// Launch settings.
    config: ProcessConfig,
    /// Running child, if started.
    child: Option<Child>,
    /// Last-known readiness.
    ready: bool,
    /// Event sink.
    events: SharedEventSink,
}

impl ManagedProcess {
    /// Creates an unstarted process handle.
    #[must_use]
    pub fn new(config: ProcessConfig, events: SharedEventSink) -> Self {
        Self {
            config,
            child: None,
            ready: false,
            events,
        }
    }

    /// Returns the launch settings.
    #[must_use]
    pub const fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Returns last-known readiness without probing.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns the child process id while it is owned.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Returns true when an owned child has not exited.
    pub fn is_running(&mut self) -> bool {
        self.child.as_mut().is_some_and(|child| matches!(child.try_wait(), Ok(None)))
    }

    /// Spawns the process and waits for `probe` to succeed.
    ///
    /// On readiness timeout the child keeps running; call [`Self::stop`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DependencyMissing`], [`HarnessError::Spawn`],
    /// or [`HarnessError::ReadinessTimeout`].
    pub async fn start(
        &mut self,
        probe: &dyn ReadinessProbe,
    ) -> Result<ReadinessReport, HarnessError> {
        self.spawn()?;
        let name = self.config.name.clone();
        match wait_until_ready(
            &name,
            probe,
            self.config.readiness_timeout,
            self.config.poll_interval,
        )
        .await
        {
            Ok(report) => {
                self.ready = true;
                self.events.record(
                    &HarnessEvent::new(&name, "readiness", EventOutcome::Ok)
                        .with_pid(self.pid())
                        .with_detail(format!("{} attempts", report.attempts))
                        .with_elapsed_ms(report.elapsed.as_millis()),
                );
                Ok(report)
            }
            Err(err) => {
                self.events.record(
                    &HarnessEvent::new(&name, "readiness", EventOutcome::Failed)
                        .with_pid(self.pid())
                        .with_detail(err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Spawns the child without waiting for readiness.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DependencyMissing`] when the executable is not
    /// locatable and [`HarnessError::Spawn`] when it is already running or
    /// the OS refuses to start it.
    pub fn spawn(&mut self) -> Result<u32, HarnessError> {
        let name = self.config.name.clone();
        if self.child.is_some() {
            return Err(HarnessError::Spawn {
                component: name,
                program: PathBuf::from(&self.config.program),
                reason: "process already started".to_string(),
            });
        }
        let program = locate_executable(&self.config.program).ok_or_else(|| {
            HarnessError::DependencyMissing {
                component: name.clone(),
                target: self.config.program.clone(),
            }
        })?;
        let (stdout, stderr) = self.output_targets()?;
        let mut command = Command::new(&program);
        command
            .args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);
        let child = command.spawn().map_err(|err| HarnessError::Spawn {
            component: name.clone(),
            program: program.clone(),
            reason: err.to_string(),
        })?;
        let pid = child.id().unwrap_or_default();
        self.child = Some(child);
        self.events.record(
            &HarnessEvent::new(&name, "spawn", EventOutcome::Ok)
                .with_pid(Some(pid))
                .with_detail(program.display().to_string()),
        );
        Ok(pid)
    }

    /// Stops the process; idempotent and infallible.
    pub async fn stop(&mut self) -> TerminationOutcome {
        self.ready = false;
        let Some(mut child) = self.child.take() else {
            return TerminationOutcome::NotRunning;
        };
        let pid = child.id();
        let started = Instant::now();
        let outcome = terminate_child(&mut child, self.config.shutdown_grace).await;
        self.events.record(
            &HarnessEvent::new(&self.config.name, "stop", EventOutcome::Ok)
                .with_pid(pid)
                .with_detail(outcome.as_str())
                .with_elapsed_ms(started.elapsed().as_millis()),
        );
        outcome
    }

    /// Opens per-process log files, or discards output when no log dir is set.
    fn output_targets(&self) -> Result<(Stdio, Stdio), HarnessError> {
        let Some(dir) = &self.config.log_dir else {
            return Ok((Stdio::null(), Stdio::null()));
        };
        fs::create_dir_all(dir).map_err(|err| HarnessError::Artifact {
            path: dir.clone(),
            reason: err.to_string(),
        })?;
        let open = |suffix: &str| {
            let path = dir.join(format!("{}.{suffix}.log", self.config.name));
            File::create(&path).map(Stdio::from).map_err(|err| HarnessError::Artifact {
                path,
                reason: err.to_string(),
            })
        };
        Ok((open("stdout")?, open("stderr")?))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
