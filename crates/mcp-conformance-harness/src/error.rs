// crates/mcp-conformance-harness/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Failure taxonomy for backend lifecycle and scenario execution.
// Purpose: Carry literal diagnostics (timeouts, attempts, mismatches).
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`HarnessError`] covers every failure the harness can raise. Lifecycle
//! variants (`DependencyMissing`, `Spawn`, `ReadinessTimeout`, model
//! provisioning) abort a session; protocol and assertion variants are
//! captured per scenario.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use mcp_conformance_config::ConfigError;
use mcp_conformance_manifest::ManifestError;
use mcp_conformance_manifest::MatchError;
use mcp_conformance_manifest::ToolCallError;

use crate::chat::ChatError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Harness failures.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Required executable or script is not locatable.
    #[error("{component}: required dependency not found: {target}")]
    DependencyMissing {
        /// Component requiring the dependency.
        component: String,
        /// Executable name or path.
        target: String,
    },
    /// Process spawn failed after the executable was located.
    #[error("{component}: failed to spawn {program}: {reason}")]
    Spawn {
        /// Component owning the process.
        component: String,
        /// Resolved program path.
        program: PathBuf,
        /// OS error text.
        reason: String,
    },
    /// Readiness probe never succeeded before the deadline.
    #[error(
        "{component}: not ready after {}ms ({attempts} attempts): {last_error}",
        .timeout.as_millis()
    )]
    ReadinessTimeout {
        /// Component being probed.
        component: String,
        /// Overall readiness deadline.
        timeout: Duration,
        /// Probe attempts made.
        attempts: u32,
        /// Last probe failure.
        last_error: String,
    },
    /// A model provisioning step (`list` or `pull`) exceeded its deadline.
    #[error("model `{model}`: `{step}` did not finish within {}ms", .timeout.as_millis())]
    ModelPullTimeout {
        /// Model name.
        model: String,
        /// Backend CLI subcommand that stalled.
        step: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// A model provisioning step (`list` or `pull`) failed.
    #[error("model `{model}`: `{step}` failed: {reason}")]
    ModelPullFailed {
        /// Model name.
        model: String,
        /// Backend CLI subcommand that failed.
        step: String,
        /// Exit status or spawn error.
        reason: String,
    },
    /// Manifest or transport violated a protocol precondition.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// Model output was not a structurally valid tool call.
    #[error("malformed tool call: {0}")]
    MalformedToolCall(#[from] ToolCallError),
    /// Requested tool is not listed by the server or declared by the manifest.
    #[error("tool `{tool}` not found; available [{}]", .available.join(", "))]
    ToolNotFound {
        /// Requested tool.
        tool: String,
        /// Tools the server listed or the manifest declared.
        available: Vec<String>,
    },
    /// Transport-level failure on the stdio session.
    #[error("transport error during {operation}: {reason}")]
    Transport {
        /// Operation in flight.
        operation: String,
        /// Failure detail.
        reason: String,
    },
    /// JSON-RPC error response from the tool server.
    #[error("{method} returned json-rpc error {code}: {message}")]
    Rpc {
        /// Request method.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },
    /// Operation attempted on a closed session.
    #[error("session closed; cannot {operation}")]
    SessionClosed {
        /// Rejected operation.
        operation: String,
    },
    /// Operation attempted before the session finished opening.
    #[error("session is {state}; cannot {operation}")]
    SessionNotOpen {
        /// Rejected operation.
        operation: String,
        /// Current state label.
        state: &'static str,
    },
    /// Scenario assertion failed.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),
    /// Manifest loading or validation failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Chat call to the inference backend failed.
    #[error(transparent)]
    Chat(#[from] ChatError),
    /// Artifact or log file I/O failed.
    #[error("artifact io error at {path}: {reason}")]
    Artifact {
        /// Target path.
        path: PathBuf,
        /// I/O error text.
        reason: String,
    },
}

impl HarnessError {
    /// Returns a stable label for reports and event logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DependencyMissing {
                ..
            } => "dependency_missing",
            Self::Spawn {
                ..
            } => "spawn",
            Self::ReadinessTimeout {
                ..
            } => "readiness_timeout",
            Self::ModelPullTimeout {
                ..
            } => "model_pull_timeout",
            Self::ModelPullFailed {
                ..
            } => "model_pull_failed",
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::MalformedToolCall(_) => "malformed_tool_call",
            Self::ToolNotFound {
                ..
            } => "tool_not_found",
            Self::Transport {
                ..
            } => "transport",
            Self::Rpc {
                ..
            } => "rpc",
            Self::SessionClosed {
                ..
            } => "session_closed",
            Self::SessionNotOpen {
                ..
            } => "session_not_open",
            Self::AssertionFailed(_) => "assertion_failed",
            Self::Manifest(_) => "manifest",
            Self::Config(_) => "config",
            Self::Chat(_) => "chat",
            Self::Artifact {
                ..
            } => "artifact",
        }
    }

    /// Classifies a rejected model tool call.
    ///
    /// Structural defects stay [`HarnessError::MalformedToolCall`], an
    /// undeclared tool becomes [`HarnessError::ToolNotFound`] naming the
    /// `declared` tools, and shape or schema deviations are protocol
    /// violations.
    #[must_use]
    pub fn rejected_tool_call(err: MatchError, declared: &[String]) -> Self {
        match err {
            MatchError::Malformed(defect) => Self::MalformedToolCall(defect),
            MatchError::UnknownTool(tool) => Self::ToolNotFound {
                tool,
                available: declared.to_vec(),
            },
            other @ (MatchError::Mismatch {
                ..
            }
            | MatchError::InvalidSchema {
                ..
            }
            | MatchError::SchemaViolation {
                ..
            }) => Self::ProtocolViolation(other.to_string()),
        }
    }

    /// Builds a transport error for `operation`.
    pub(crate) fn transport(operation: &str, reason: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
