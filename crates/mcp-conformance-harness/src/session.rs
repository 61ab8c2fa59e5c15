// crates/mcp-conformance-harness/src/session.rs
// ============================================================================
// Module: Stdio MCP Session
// Description: Newline-delimited JSON-RPC client over a spawned server's stdio.
// Purpose: Open, use, and reclaim one per-scenario tool server process.
// Dependencies: serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! A [`StdioSession`] moves through `Unopened -> Opening -> Open -> Closed`.
//! Opening spawns the server and performs the `initialize` handshake followed
//! by `notifications/initialized`. While open, `tools/list` and `tools/call`
//! may be issued any number of times. Closing is terminal: stdin is closed,
//! the process gets a grace period to exit, then SIGTERM, then SIGKILL.
//!
//! [`with_session`] scopes a session to one async body and closes it on both
//! success and failure. Every request and response lands in the session
//! transcript.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use mcp_conformance_config::ToolServerConfig;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::Lines;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;

use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedEventSink;
use crate::process::TerminationOutcome;
use crate::process::locate_executable;
use crate::process::terminate_child;
use crate::transcript::Transcript;
use crate::transcript::TranscriptChannel;

/// Protocol revision offered during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
/// Component label for events.
const COMPONENT: &str = "session";

// ============================================================================
// SECTION: Launch Settings
// ============================================================================

/// Command line and full environment for a tool server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Complete child environment, including non-UTF-8 ambient pairs.
    pub env: BTreeMap<OsString, OsString>,
}

/// Per-session deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// Deadline for the `initialize` response.
    pub handshake: Duration,
    /// Deadline for each subsequent request.
    pub request: Duration,
    /// Wait after stdin EOF before signalling.
    pub close_grace: Duration,
}

impl SessionTimeouts {
    /// Reads deadlines from `[tool_server]`.
    #[must_use]
    pub const fn from_config(config: &ToolServerConfig) -> Self {
        Self {
            handshake: config.handshake_timeout(),
            request: config.request_timeout(),
            close_grace: config.close_grace(),
        }
    }
}

// ============================================================================
// SECTION: Protocol Types
// ============================================================================

/// Tool as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    /// Tool name.
    pub name: String,
    /// Tool description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input JSON schema.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// `tools/list` result payload.
#[derive(Debug, Deserialize)]
struct ToolListResult {
    /// Listed tools.
    tools: Vec<McpTool>,
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Text block.
    Text {
        /// Text payload.
        text: String,
    },
    /// Any other block kind (image, resource, ...).
    #[serde(other)]
    Other,
}

/// `tools/call` result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallOutput {
    /// Content blocks.
    #[serde(default)]
    pub content: Vec<ToolContent>,
    /// Tool-level failure flag.
    #[serde(rename = "isError", default)]
    pub is_error: bool,
    /// Structured result, when the server provides one.
    #[serde(rename = "structuredContent", default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
}

impl ToolCallOutput {
    /// Concatenates text blocks with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ToolContent::Text {
                    text,
                } => Some(text.as_str()),
                ToolContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the text blocks, or the serialized result when there are none.
    #[must_use]
    pub fn textual_form(&self) -> String {
        let text = self.text();
        if text.is_empty() { serde_json::to_string(self).unwrap_or_default() } else { text }
    }
}

// ============================================================================
// SECTION: Session State
// ============================================================================

/// Transport session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet opened.
    Unopened,
    /// Spawned; handshake in progress.
    Opening,
    /// Handshake complete.
    Open,
    /// Terminal; process reclaimed.
    Closed,
}

impl SessionState {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unopened => "unopened",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Line-delimited stdout reader.
type StdoutLines = Lines<BufReader<ChildStdout>>;

/// One stdio MCP session bound to a freshly spawned server.
pub struct StdioSession {
    /// Launch settings.
    spec: LaunchSpec,
    /// Deadlines.
    timeouts: SessionTimeouts,
    /// Lifecycle state.
    state: SessionState,
    /// Server process.
    child: Option<Child>,
    /// Request writer; dropped to signal EOF.
    stdin: Option<ChildStdin>,
    /// Response reader.
    stdout: Option<StdoutLines>,
    /// Next JSON-RPC request id.
    next_id: u64,
    /// Recorded exchanges.
    transcript: Transcript,
    /// `initialize` result.
    server_info: Option<Value>,
    /// Server process id, retained after close.
    pid: Option<u32>,
    /// How the process ended, once closed.
    termination: Option<TerminationOutcome>,
    /// Event sink.
    events: SharedEventSink,
}

impl StdioSession {
    /// Creates an unopened session.
    #[must_use]
    pub fn new(spec: LaunchSpec, timeouts: SessionTimeouts, events: SharedEventSink) -> Self {
        Self {
            spec,
            timeouts,
            state: SessionState::Unopened,
            child: None,
            stdin: None,
            stdout: None,
            next_id: 1,
            transcript: Transcript::new(),
            server_info: None,
            pid: None,
            termination: None,
            events,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the server process id once spawned.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Returns the `initialize` result once open.
    #[must_use]
    pub const fn server_info(&self) -> Option<&Value> {
        self.server_info.as_ref()
    }

    /// Returns the recorded transcript.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Takes the recorded transcript, leaving an empty one.
    pub fn take_transcript(&mut self) -> Transcript {
        std::mem::take(&mut self.transcript)
    }

    /// Spawns the server and performs the capability handshake.
    ///
    /// A failed handshake closes the session before returning.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SessionClosed`] after close, lifecycle errors
    /// when the server cannot be spawned, and transport or RPC errors when the
    /// handshake fails.
    pub async fn open(&mut self) -> Result<(), HarnessError> {
        match self.state {
            SessionState::Unopened => {}
            SessionState::Closed => {
                return Err(HarnessError::SessionClosed {
                    operation: "open".to_string(),
                });
            }
            other => {
                return Err(HarnessError::SessionNotOpen {
                    operation: "open".to_string(),
                    state: other.as_str(),
                });
            }
        }
        self.state = SessionState::Opening;
        if let Err(err) = self.spawn() {
            self.state = SessionState::Closed;
            self.termination = Some(TerminationOutcome::NotRunning);
            return Err(err);
        }
        match self.handshake().await {
            Ok(()) => {
                self.state = SessionState::Open;
                self.events.record(
                    &HarnessEvent::new(COMPONENT, "open", EventOutcome::Ok).with_pid(self.pid),
                );
                Ok(())
            }
            Err(err) => {
                self.events.record(
                    &HarnessEvent::new(COMPONENT, "open", EventOutcome::Failed)
                        .with_pid(self.pid)
                        .with_detail(err.to_string()),
                );
                self.close().await;
                Err(err)
            }
        }
    }

    /// Lists the server's tools.
    ///
    /// # Errors
    ///
    /// Returns state, transport, or RPC errors.
    pub async fn list_tools(&mut self) -> Result<Vec<McpTool>, HarnessError> {
        self.ensure_open("list tools")?;
        let result = self.request("tools/list", json!({}), self.timeouts.request).await?;
        let parsed: ToolListResult = serde_json::from_value(result).map_err(|err| {
            HarnessError::transport("tools/list", format!("invalid tools/list payload: {err}"))
        })?;
        Ok(parsed.tools)
    }

    /// Invokes `name` with `arguments`.
    ///
    /// # Errors
    ///
    /// Returns state, transport, or RPC errors. Tool-level failures are
    /// reported through [`ToolCallOutput::is_error`].
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallOutput, HarnessError> {
        self.ensure_open("call tool")?;
        let params = json!({
            "name": name,
            "arguments": arguments,
        });
        let result = self.request("tools/call", params, self.timeouts.request).await?;
        serde_json::from_value(result).map_err(|err| {
            HarnessError::transport("tools/call", format!("invalid tools/call payload: {err}"))
        })
    }

    /// Closes the session and reclaims the process; idempotent.
    pub async fn close(&mut self) -> TerminationOutcome {
        if self.state == SessionState::Closed {
            return self.termination.unwrap_or(TerminationOutcome::NotRunning);
        }
        self.state = SessionState::Closed;
        drop(self.stdin.take());
        self.stdout = None;
        let outcome = match self.child.take() {
            Some(mut child) => {
                match tokio::time::timeout(self.timeouts.close_grace, child.wait()).await {
                    Ok(Ok(_)) => TerminationOutcome::Graceful,
                    _ => terminate_child(&mut child, self.timeouts.close_grace).await,
                }
            }
            None => TerminationOutcome::NotRunning,
        };
        self.termination = Some(outcome);
        self.events.record(
            &HarnessEvent::new(COMPONENT, "close", EventOutcome::Ok)
                .with_pid(self.pid)
                .with_detail(outcome.as_str()),
        );
        outcome
    }

    /// Spawns the server with piped stdio.
    fn spawn(&mut self) -> Result<(), HarnessError> {
        let program = locate_executable(&self.spec.program).ok_or_else(|| {
            HarnessError::DependencyMissing {
                component: "tool_server".to_string(),
                target: self.spec.program.clone(),
            }
        })?;
        let mut command = Command::new(&program);
        command
            .args(&self.spec.args)
            .env_clear()
            .envs(&self.spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let mut child = command.spawn().map_err(|err| HarnessError::Spawn {
            component: "tool_server".to_string(),
            program: program.clone(),
            reason: err.to_string(),
        })?;
        self.pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        self.child = Some(child);
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            return Err(HarnessError::transport("open", "child stdio was not piped"));
        };
        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout).lines());
        self.events.record(
            &HarnessEvent::new(COMPONENT, "spawn", EventOutcome::Ok)
                .with_pid(self.pid)
                .with_detail(program.display().to_string()),
        );
        Ok(())
    }

    /// Sends `initialize` and `notifications/initialized`.
    async fn handshake(&mut self) -> Result<(), HarnessError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "mcp-conformance",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let result = self.request("initialize", params, self.timeouts.handshake).await?;
        if result.get("protocolVersion").and_then(Value::as_str).is_none() {
            return Err(HarnessError::ProtocolViolation(format!(
                "initialize result lacks protocolVersion: {result}"
            )));
        }
        self.server_info = Some(result);
        self.notify("notifications/initialized").await
    }

    /// Rejects operations outside the open state.
    fn ensure_open(&self, operation: &str) -> Result<(), HarnessError> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(HarnessError::SessionClosed {
                operation: operation.to_string(),
            }),
            other => Err(HarnessError::SessionNotOpen {
                operation: operation.to_string(),
                state: other.as_str(),
            }),
        }
    }

    /// Sends a request and waits for the response with the matching id.
    async fn request(
        &mut self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, HarnessError> {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let outcome = match self.write_line(method, &request).await {
            Ok(()) => {
                let reader = self.stdout.as_mut().ok_or_else(|| {
                    HarnessError::transport(method, "stdout reader unavailable")
                })?;
                match tokio::time::timeout(timeout, read_response(reader, id, method)).await {
                    Ok(response) => response,
                    Err(_) => Err(HarnessError::transport(
                        method,
                        format!("no response within {}ms", timeout.as_millis()),
                    )),
                }
            }
            Err(err) => Err(err),
        };
        match outcome {
            Ok(response) => {
                let rpc_error = response.get("error").map(|error| HarnessError::Rpc {
                    method: method.to_string(),
                    code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                });
                self.transcript.record(
                    TranscriptChannel::Rpc,
                    method,
                    request,
                    response.clone(),
                    rpc_error.as_ref().map(ToString::to_string),
                );
                if let Some(err) = rpc_error {
                    return Err(err);
                }
                response
                    .get("result")
                    .cloned()
                    .ok_or_else(|| HarnessError::transport(method, "response lacks result"))
            }
            Err(err) => {
                self.transcript.record(
                    TranscriptChannel::Rpc,
                    method,
                    request,
                    Value::Null,
                    Some(err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Sends a notification (no response expected).
    async fn notify(&mut self, method: &str) -> Result<(), HarnessError> {
        let message = json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        let outcome = self.write_line(method, &message).await;
        self.transcript.record(
            TranscriptChannel::Rpc,
            method,
            message,
            Value::Null,
            outcome.as_ref().err().map(ToString::to_string),
        );
        outcome
    }

    /// Writes one JSON message followed by a newline.
    async fn write_line(&mut self, method: &str, message: &Value) -> Result<(), HarnessError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| HarnessError::transport(method, "stdin already closed"))?;
        let mut line = serde_json::to_vec(message)
            .map_err(|err| HarnessError::transport(method, err.to_string()))?;
        line.push(b'\n');
        stdin.write_all(&line).await.map_err(|err| HarnessError::transport(method, err.to_string()))?;
        stdin.flush().await.map_err(|err| HarnessError::transport(method, err.to_string()))
    }
}

/// Reads lines until the response for `id`; notifications and other ids are
/// skipped.
async fn read_response(
    reader: &mut StdoutLines,
    id: u64,
    method: &str,
) -> Result<Value, HarnessError> {
    loop {
        let line = reader
            .next_line()
            .await
            .map_err(|err| HarnessError::transport(method, err.to_string()))?
            .ok_or_else(|| HarnessError::transport(method, "server closed stdout"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|err| {
            HarnessError::transport(method, format!("invalid json-rpc line `{trimmed}`: {err}"))
        })?;
        if value.get("id").and_then(Value::as_u64) == Some(id) {
            return Ok(value);
        }
    }
}

// ============================================================================
// SECTION: Scoped Sessions
// ============================================================================

/// Result of a scoped session.
#[derive(Debug)]
pub struct SessionRun<T> {
    /// Body result, or the open failure.
    pub result: Result<T, HarnessError>,
    /// Everything exchanged with the server.
    pub transcript: Transcript,
    /// Server process id, if it was spawned.
    pub pid: Option<u32>,
    /// How the server process ended.
    pub termination: TerminationOutcome,
}

/// Opens a session, runs `body`, and closes the session on every path.
pub async fn with_session<T, F>(
    spec: LaunchSpec,
    timeouts: SessionTimeouts,
    events: SharedEventSink,
    body: F,
) -> SessionRun<T>
where
    F: AsyncFnOnce(&mut StdioSession) -> Result<T, HarnessError>,
{
    let mut session = StdioSession::new(spec, timeouts, events);
    let result = match session.open().await {
        Ok(()) => body(&mut session).await,
        Err(err) => Err(err),
    };
    let termination = session.close().await;
    SessionRun {
        result,
        transcript: session.take_transcript(),
        pid: session.pid(),
        termination,
    }
}
