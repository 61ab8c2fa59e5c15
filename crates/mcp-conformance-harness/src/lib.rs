// crates/mcp-conformance-harness/src/lib.rs
// ============================================================================
// Module: MCP Conformance Harness
// Description: Backend lifecycle, stdio MCP sessions, and scenario orchestration.
// Purpose: Validate an MCP manifest end to end against live backends.
// Dependencies: async-trait, nix, reqwest, serde, serde_jcs, tokio
// ============================================================================

//! ## Overview
//! The harness drives two independently managed backends:
//!
//! - an inference backend ([`InferenceBackend`]) started once per run and
//!   gated on `/api/version` plus model availability;
//! - an on-demand tool server ([`ToolServerManager`]) spawned fresh for each
//!   stdio session.
//!
//! [`ConformanceSession`] owns both, runs the enabled scenarios in order, and
//! tears everything down through one `shutdown` routine. Scenario outcomes
//! carry full transcripts; lifecycle failures abort the run.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifacts;
pub mod chat;
pub mod error;
pub mod events;
pub mod inference;
pub mod orchestrator;
pub mod process;
pub mod report;
pub mod scenarios;
pub mod session;
pub mod tool_server;
pub mod transcript;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::RunArtifacts;
pub use artifacts::default_run_root;
pub use chat::ChatClient;
pub use chat::ChatError;
pub use chat::ChatMessage;
pub use chat::ChatRole;
pub use error::HarnessError;
pub use events::EventOutcome;
pub use events::FileEventSink;
pub use events::HarnessEvent;
pub use events::HarnessEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::SharedEventSink;
pub use events::StderrEventSink;
pub use events::sink_from_config;
pub use inference::InferenceBackend;
pub use inference::ModelStatus;
pub use inference::model_listed;
pub use orchestrator::ConformanceSession;
pub use orchestrator::SessionPlan;
pub use orchestrator::run_conformance;
pub use process::HttpStatusProbe;
pub use process::ManagedProcess;
pub use process::ProcessConfig;
pub use process::ReadinessProbe;
pub use process::ReadinessReport;
pub use process::TerminationOutcome;
pub use process::locate_executable;
pub use process::terminate_child;
pub use process::wait_until_ready;
pub use report::ConformanceReport;
pub use report::StatusCounts;
pub use scenarios::ScenarioFailure;
pub use scenarios::ScenarioOutcome;
pub use scenarios::ScenarioSettings;
pub use scenarios::ScenarioStatus;
pub use scenarios::parse_tool_result;
pub use session::LaunchSpec;
pub use session::McpTool;
pub use session::SessionRun;
pub use session::SessionState;
pub use session::SessionTimeouts;
pub use session::StdioSession;
pub use session::ToolCallOutput;
pub use session::ToolContent;
pub use session::with_session;
pub use tool_server::ToolServerManager;
pub use transcript::Transcript;
pub use transcript::TranscriptChannel;
pub use transcript::TranscriptEntry;
