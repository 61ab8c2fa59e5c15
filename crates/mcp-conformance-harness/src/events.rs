// crates/mcp-conformance-harness/src/events.rs
// ============================================================================
// Module: Harness Events
// Description: Structured lifecycle events and JSON-lines sinks.
// Purpose: Record spawn, readiness, session, and scenario activity.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every component records [`HarnessEvent`] payloads through a shared
//! [`HarnessEventSink`]. Sinks are deliberately small so events can be routed
//! to stderr, an append-only file, memory (tests), or nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use mcp_conformance_config::LogSinkKind;
use mcp_conformance_config::LoggingConfig;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Phase started.
    Started,
    /// Phase succeeded.
    Ok,
    /// Phase failed.
    Failed,
    /// Phase was skipped.
    Skipped,
}

/// Structured harness event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Emitting component (`inference`, `tool_server`, `session`, ...).
    pub component: String,
    /// Lifecycle phase (`spawn`, `readiness`, `model_pull`, ...).
    pub phase: &'static str,
    /// Phase outcome.
    pub outcome: EventOutcome,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Child process id when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Elapsed time for completed phases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u128>,
}

impl HarnessEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(component: &str, phase: &'static str, outcome: EventOutcome) -> Self {
        Self {
            event: "mcp_conformance",
            timestamp_ms: now_millis(),
            component: component.to_string(),
            phase,
            outcome,
            detail: None,
            pid: None,
            elapsed_ms: None,
        }
    }

    /// Attaches a detail string.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches a process id.
    #[must_use]
    pub const fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches an elapsed duration in milliseconds.
    #[must_use]
    pub const fn with_elapsed_ms(mut self, elapsed_ms: u128) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }
}

/// Returns milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink interface.
pub trait HarnessEventSink: Send + Sync {
    /// Records a harness event.
    fn record(&self, event: &HarnessEvent);
}

/// Shared sink handle passed to every component.
pub type SharedEventSink = Arc<dyn HarnessEventSink>;

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl HarnessEventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// Output file guarded for concurrent writers.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens a file sink at the provided path.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened for append.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl HarnessEventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink.
pub struct NoopEventSink;

impl HarnessEventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

/// In-memory sink used to assert on emitted events.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().map_or_else(|_| Vec::new(), |events| events.clone())
    }

    /// Returns recorded events for one component and phase.
    #[must_use]
    pub fn matching(&self, component: &str, phase: &str) -> Vec<HarnessEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.component == component && event.phase == phase)
            .collect()
    }
}

impl HarnessEventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Builds the sink selected by `[logging]`.
///
/// # Errors
///
/// Returns an error when the file sink cannot be opened.
pub fn sink_from_config(config: &LoggingConfig) -> io::Result<SharedEventSink> {
    match (config.sink, &config.path) {
        (LogSinkKind::Stderr, _) => Ok(Arc::new(StderrEventSink)),
        (LogSinkKind::None, _) => Ok(Arc::new(NoopEventSink)),
        (LogSinkKind::File, Some(path)) => Ok(Arc::new(FileEventSink::new(path)?)),
        (LogSinkKind::File, None) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "logging.path is required for the file sink",
        )),
    }
}
