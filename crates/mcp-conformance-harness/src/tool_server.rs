// crates/mcp-conformance-harness/src/tool_server.rs
// ============================================================================
// Module: Tool Server Manager
// Description: On-demand stdio tool server: validation and session factory.
// Purpose: Hand each scenario a fresh server process and launch spec.
// Dependencies: mcp-conformance-config
// ============================================================================

//! ## Overview
//! The tool server is spawned per connection, not per run. `start` only
//! validates that the script and program exist; [`ToolServerManager::launch_spec`]
//! exposes the command line and environment, and
//! [`ToolServerManager::with_session`] scopes one fresh process to one body.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ffi::OsString;

use mcp_conformance_config::ToolServerConfig;

use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedEventSink;
use crate::process::locate_executable;
use crate::session::LaunchSpec;
use crate::session::SessionRun;
use crate::session::SessionTimeouts;
use crate::session::StdioSession;
use crate::session::with_session;

/// Component label for events and errors.
const COMPONENT: &str = "tool_server";

/// On-demand tool server handle.
pub struct ToolServerManager {
    /// Server settings.
    config: ToolServerConfig,
    /// Validation passed and not stopped.
    ready: bool,
    /// Event sink shared with spawned sessions.
    events: SharedEventSink,
}

impl ToolServerManager {
    /// Creates an unstarted manager.
    #[must_use]
    pub fn new(config: ToolServerConfig, events: SharedEventSink) -> Self {
        Self {
            config,
            ready: false,
            events,
        }
    }

    /// Validates the script and program, then marks the manager ready.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DependencyMissing`] naming the absent file.
    pub fn start(&mut self) -> Result<(), HarnessError> {
        if let Some(script) = &self.config.script
            && !script.is_file()
        {
            return Err(self.missing(script.display().to_string()));
        }
        if locate_executable(&self.config.program).is_none() {
            return Err(self.missing(self.config.program.clone()));
        }
        self.ready = true;
        self.events.record(
            &HarnessEvent::new(COMPONENT, "start", EventOutcome::Ok)
                .with_detail(self.config.program.clone()),
        );
        Ok(())
    }

    /// Clears readiness; there is no long-lived process to stop.
    pub fn stop(&mut self) {
        self.ready = false;
    }

    /// Returns last-known readiness.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns the per-session deadlines.
    #[must_use]
    pub const fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts::from_config(&self.config)
    }

    /// Returns the command line and environment for one server process.
    ///
    /// The environment is the ambient one, plus the module search path under
    /// `module_path_var`, plus the configured overlay.
    #[must_use]
    pub fn launch_spec(&self) -> LaunchSpec {
        let mut args = Vec::with_capacity(self.config.args.len() + 1);
        if let Some(script) = &self.config.script {
            args.push(script.display().to_string());
        }
        args.extend(self.config.args.iter().cloned());
        LaunchSpec {
            program: self.config.program.clone(),
            args,
            env: child_environment(std::env::vars_os(), &self.config),
        }
    }

    /// Returns a new unopened session.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ProtocolViolation`] before `start`.
    pub fn open_session(&self) -> Result<StdioSession, HarnessError> {
        self.ensure_ready()?;
        Ok(StdioSession::new(self.launch_spec(), self.timeouts(), self.events.clone()))
    }

    /// Runs `body` against a fresh, scoped session.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ProtocolViolation`] before `start`; body and
    /// session failures are reported in [`SessionRun::result`].
    pub async fn with_session<T, F>(&self, body: F) -> Result<SessionRun<T>, HarnessError>
    where
        F: AsyncFnOnce(&mut StdioSession) -> Result<T, HarnessError>,
    {
        self.ensure_ready()?;
        Ok(with_session(self.launch_spec(), self.timeouts(), self.events.clone(), body).await)
    }

    /// Rejects use before `start`.
    fn ensure_ready(&self) -> Result<(), HarnessError> {
        if self.ready {
            Ok(())
        } else {
            Err(HarnessError::ProtocolViolation("tool server manager is not started".to_string()))
        }
    }

    /// Builds a dependency-missing error.
    fn missing(&self, target: String) -> HarnessError {
        self.events.record(
            &HarnessEvent::new(COMPONENT, "start", EventOutcome::Failed)
                .with_detail(format!("missing {target}")),
        );
        HarnessError::DependencyMissing {
            component: COMPONENT.to_string(),
            target,
        }
    }
}

/// Layers the module search path and the configured overlay over `ambient`.
///
/// Ambient pairs stay raw OS strings so non-UTF-8 values still reach the
/// child.
fn child_environment(
    ambient: impl IntoIterator<Item = (OsString, OsString)>,
    config: &ToolServerConfig,
) -> BTreeMap<OsString, OsString> {
    let mut env: BTreeMap<OsString, OsString> = ambient.into_iter().collect();
    if let Some(module_path) = &config.module_path {
        env.insert(
            OsString::from(&config.module_path_var),
            module_path.as_os_str().to_os_string(),
        );
    }
    env.extend(config.env.iter().map(|(key, value)| (OsString::from(key), OsString::from(value))));
    env
}
