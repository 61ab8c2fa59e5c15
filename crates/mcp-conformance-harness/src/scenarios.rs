// crates/mcp-conformance-harness/src/scenarios.rs
// ============================================================================
// Module: Conformance Scenarios
// Description: Manifest checks, comprehension, direct invocation, round trip.
// Purpose: Turn each scenario into a ScenarioOutcome with a full transcript.
// Dependencies: mcp-conformance-manifest, serde, serde_json
// ============================================================================

//! ## Overview
//! Scenarios run against one shared [`ManifestDocument`]:
//!
//! - `manifest_structure`, `server_config`, `tools_structure`: pure manifest
//!   checks with one message per defective field.
//! - `comprehension`: the model must mention the transport, the target tool,
//!   and its parameter. A smoke check, not a semantic guarantee.
//! - `direct_invocation`: list tools and call the target tool on a fresh
//!   stdio session; the result text must carry the success marker.
//! - `round_trip`: the model emits a tool call, the configured matcher
//!   accepts or rejects it, the call runs on a fresh session, the result is
//!   fed back to the model, and the result `message` must carry the marker.
//!
//! Stdio scenarios refuse to run unless the manifest declares the stdio
//! transport.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use mcp_conformance_config::ChatFailurePolicy;
use mcp_conformance_config::ConformanceConfig;
use mcp_conformance_config::ScenarioId;
use mcp_conformance_config::ToolCallMatchMode;
use mcp_conformance_manifest::ManifestDocument;
use mcp_conformance_manifest::STDIO_TRANSPORT;
use mcp_conformance_manifest::ToolCallMatcher;
use mcp_conformance_manifest::ToolCallRequest;
use mcp_conformance_manifest::function_definitions_json;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::chat::ChatClient;
use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedEventSink;
use crate::process::TerminationOutcome;
use crate::session::StdioSession;
use crate::session::ToolCallOutput;
use crate::tool_server::ToolServerManager;
use crate::transcript::Transcript;
use crate::transcript::TranscriptChannel;
use crate::transcript::TranscriptEntry;

// ============================================================================
// SECTION: Prompts
// ============================================================================

/// System prompt for the comprehension scenario.
pub const COMPREHENSION_SYSTEM_PROMPT: &str = "You are a test assistant. You will be given an MCP \
     manifest in JSON format. Your job is to understand what tools are available and how to use \
     them.\n\nBe precise and factual. Format your response clearly.";

/// Builds the comprehension prompt around the pretty-printed manifest.
#[must_use]
pub fn comprehension_prompt(manifest_json: &str) -> String {
    format!(
        "Here is an MCP manifest:\n\n{manifest_json}\n\nPlease analyze this manifest and tell \
         me:\n1. What is the server transport type?\n2. What tools are available and what do \
         they do?\n3. For each tool, what input parameters are required?\n4. What is the \
         expected output format?\n\nPlease be specific and structured in your response."
    )
}

/// Builds the round-trip system prompt listing function definitions.
#[must_use]
pub fn tool_calling_system_prompt(definitions_json: &str) -> String {
    format!(
        "You are an AI assistant with access to tools. You have the following tools \
         available:\n\n{definitions_json}\n\nThese tools use the MCP (Model Context Protocol) \
         for communication.\nWhen you want to use a tool, respond with a JSON object in this \
         format:\n{{\n    \"tool_call\": {{\n        \"name\": \"tool_name\",\n        \
         \"arguments\": {{\"param\": \"value\"}}\n    }}\n}}\n\nBe sure to use the exact tool \
         names and parameter names as defined."
    )
}

/// Builds the follow-up prompt that feeds a tool result back to the model.
#[must_use]
pub fn follow_up_prompt(request: &ToolCallRequest, result: &Map<String, Value>) -> String {
    let arguments = Value::Object(request.arguments.clone());
    let rendered = serde_json::to_string_pretty(result).unwrap_or_default();
    format!(
        "You previously made a tool call to \"{}\" with arguments {arguments}.\n\nThe tool \
         returned the following result:\n{rendered}\n\nPlease analyze this response and tell \
         me:\n1. What did the tool return?\n2. Does this result make sense for the task you \
         were trying to accomplish?\n\nPlease provide a brief, clear summary of what happened.",
        request.name
    )
}

/// Parses a tool result as a JSON object, wrapping anything else as
/// `{"message": raw}`.
#[must_use]
pub fn parse_tool_result(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("message".to_string(), Value::String(raw.to_string()));
            map
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Scenario fixtures resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSettings {
    /// Tool exercised by comprehension and direct invocation.
    pub target_tool: String,
    /// Parameter the comprehension response must mention.
    pub target_parameter: String,
    /// Arguments for direct invocation.
    pub direct_arguments: Map<String, Value>,
    /// Round-trip user prompt.
    pub round_trip_prompt: String,
    /// Tool-call acceptance strategy.
    pub matcher: ToolCallMatcher,
    /// Literal the tool server returns on success.
    pub success_marker: String,
    /// Transport literal the manifest must declare.
    pub expected_transport: String,
    /// Inference failure policy.
    pub chat_failure: ChatFailurePolicy,
}

impl ScenarioSettings {
    /// Resolves settings from `[scenarios]` and `[manifest]`.
    #[must_use]
    pub fn from_config(config: &ConformanceConfig) -> Self {
        let scenarios = &config.scenarios;
        let matcher = match scenarios.tool_call_match {
            ToolCallMatchMode::Exact => ToolCallMatcher::exact(&ToolCallRequest::new(
                scenarios.expected_call.name.clone(),
                scenarios.expected_call.arguments.clone(),
            )),
            ToolCallMatchMode::Schema => ToolCallMatcher::Schema,
        };
        Self {
            target_tool: scenarios.target_tool.clone(),
            target_parameter: scenarios.target_parameter.clone(),
            direct_arguments: scenarios.direct_arguments.clone(),
            round_trip_prompt: scenarios.round_trip_prompt.clone(),
            matcher,
            success_marker: scenarios.success_marker.clone(),
            expected_transport: config.manifest.expected_transport.clone(),
            chat_failure: scenarios.chat_failure,
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Scenario verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// All assertions held.
    Passed,
    /// An assertion or step failed.
    Failed,
    /// Not executed.
    Skipped,
}

impl ScenarioStatus {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Failure detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioFailure {
    /// Error kind label (see [`HarnessError::kind`]).
    pub kind: String,
    /// Literal failure message.
    pub message: String,
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario identifier.
    pub scenario: ScenarioId,
    /// Verdict.
    pub status: ScenarioStatus,
    /// Failure detail for failed scenarios.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ScenarioFailure>,
    /// Wall time in milliseconds.
    pub duration_ms: u128,
    /// Prompts, responses, parsed structures, and RPC exchanges.
    pub transcript: Vec<TranscriptEntry>,
    /// Informational notes.
    pub notes: Vec<String>,
}

impl ScenarioOutcome {
    /// Builds a skipped outcome.
    #[must_use]
    pub fn skipped(scenario: ScenarioId, reason: impl Into<String>) -> Self {
        Self {
            scenario,
            status: ScenarioStatus::Skipped,
            failure: None,
            duration_ms: 0,
            transcript: Vec::new(),
            notes: vec![reason.into()],
        }
    }

    /// Returns true when the scenario passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Returns true when the failure came from the chat backend.
    #[must_use]
    pub fn failed_on_chat(&self) -> bool {
        self.failure.as_ref().is_some_and(|failure| failure.kind == "chat")
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Shared inputs for one scenario.
pub struct ScenarioContext<'a> {
    /// Manifest under test.
    pub manifest: &'a ManifestDocument,
    /// Resolved fixtures.
    pub settings: &'a ScenarioSettings,
    /// Chat client, when the inference backend is running.
    pub chat: Option<&'a ChatClient>,
    /// Tool server, when started.
    pub tool_server: Option<&'a ToolServerManager>,
    /// Event sink.
    pub events: &'a SharedEventSink,
}

/// Runs one scenario and captures its outcome.
pub async fn run_scenario(id: ScenarioId, context: &ScenarioContext<'_>) -> ScenarioOutcome {
    context.events.record(
        &HarnessEvent::new("scenario", "run", EventOutcome::Started).with_detail(id.as_str()),
    );
    let started = Instant::now();
    let mut transcript = Transcript::new();
    let mut notes = Vec::new();
    let result = match id {
        ScenarioId::ManifestStructure => check_manifest_structure(context.manifest, &mut notes),
        ScenarioId::ServerConfig => check_server_config(context, &mut notes),
        ScenarioId::ToolsStructure => check_tools_structure(context.manifest, &mut notes),
        ScenarioId::Comprehension => comprehension(context, &mut transcript, &mut notes).await,
        ScenarioId::DirectInvocation => {
            direct_invocation(context, &mut transcript, &mut notes).await
        }
        ScenarioId::RoundTrip => round_trip(context, &mut transcript, &mut notes).await,
    };
    let duration_ms = started.elapsed().as_millis();
    let (status, failure) = match result {
        Ok(()) => (ScenarioStatus::Passed, None),
        Err(err) => (
            ScenarioStatus::Failed,
            Some(ScenarioFailure {
                kind: err.kind().to_string(),
                message: err.to_string(),
            }),
        ),
    };
    let mut event = HarnessEvent::new(
        "scenario",
        "run",
        if status == ScenarioStatus::Passed { EventOutcome::Ok } else { EventOutcome::Failed },
    )
    .with_elapsed_ms(duration_ms);
    event = match &failure {
        Some(failure) => event.with_detail(format!("{}: {}", id.as_str(), failure.message)),
        None => event.with_detail(id.as_str()),
    };
    context.events.record(&event);
    ScenarioOutcome {
        scenario: id,
        status,
        failure,
        duration_ms,
        transcript: transcript.into_entries(),
        notes,
    }
}

/// Required top-level fields; one message per missing field.
fn check_manifest_structure(
    manifest: &ManifestDocument,
    notes: &mut Vec<String>,
) -> Result<(), HarnessError> {
    let missing = manifest.missing_fields();
    if missing.is_empty() {
        notes.push(format!("protocolVersion {}", manifest.protocol_version().unwrap_or("?")));
        return Ok(());
    }
    let messages: Vec<String> =
        missing.iter().map(|field| format!("missing required field: {field}")).collect();
    Err(HarnessError::ProtocolViolation(messages.join("; ")))
}

/// `server.transport.type` equals the expected literal.
fn check_server_config(
    context: &ScenarioContext<'_>,
    notes: &mut Vec<String>,
) -> Result<(), HarnessError> {
    context.manifest.check_server(&context.settings.expected_transport)?;
    notes.push(format!("transport {}", context.settings.expected_transport));
    Ok(())
}

/// Non-empty tools, each complete.
fn check_tools_structure(
    manifest: &ManifestDocument,
    notes: &mut Vec<String>,
) -> Result<(), HarnessError> {
    manifest.check_tools()?;
    let names: Vec<String> = manifest.tools()?.into_iter().map(|tool| tool.name).collect();
    notes.push(format!("tools: {}", names.join(", ")));
    Ok(())
}

/// The model must mention transport, tool, and parameter.
async fn comprehension(
    context: &ScenarioContext<'_>,
    transcript: &mut Transcript,
    notes: &mut Vec<String>,
) -> Result<(), HarnessError> {
    let chat = require_chat(context)?;
    let prompt = comprehension_prompt(&context.manifest.to_pretty_json());
    let response =
        recorded_chat(chat, transcript, "comprehension", &prompt, Some(COMPREHENSION_SYSTEM_PROMPT))
            .await?;
    let settings = context.settings;
    let transport =
        context.manifest.transport_type().unwrap_or(settings.expected_transport.as_str());
    let markers =
        [transport, settings.target_tool.as_str(), settings.target_parameter.as_str()];
    let lowered = response.to_lowercase();
    let absent: Vec<&str> = markers
        .iter()
        .copied()
        .filter(|marker| !lowered.contains(&marker.to_lowercase()))
        .collect();
    if !absent.is_empty() {
        return Err(HarnessError::AssertionFailed(format!(
            "model response does not mention {}",
            absent.join(", ")
        )));
    }
    notes.push(format!("model mentioned {}", markers.join(", ")));
    Ok(())
}

/// List tools and call the target tool directly.
async fn direct_invocation(
    context: &ScenarioContext<'_>,
    transcript: &mut Transcript,
    notes: &mut Vec<String>,
) -> Result<(), HarnessError> {
    require_stdio(context.manifest)?;
    let server = require_tool_server(context)?;
    let tool = context.settings.target_tool.clone();
    let arguments = context.settings.direct_arguments.clone();
    let run = server
        .with_session(async move |session: &mut StdioSession| {
            let tools = session.list_tools().await?;
            if !tools.iter().any(|listed| listed.name == tool) {
                return Err(HarnessError::ToolNotFound {
                    tool,
                    available: tools.into_iter().map(|listed| listed.name).collect(),
                });
            }
            session.call_tool(&tool, arguments).await
        })
        .await?;
    transcript.extend(run.transcript);
    notes.push(session_note(run.pid, run.termination));
    let output = run.result?;
    require_marker_in_text(&output, &context.settings.success_marker)
}

/// Model-driven tool call, execution, and result feedback.
async fn round_trip(
    context: &ScenarioContext<'_>,
    transcript: &mut Transcript,
    notes: &mut Vec<String>,
) -> Result<(), HarnessError> {
    require_stdio(context.manifest)?;
    let chat = require_chat(context)?;
    let server = require_tool_server(context)?;
    let tools = context.manifest.tools()?;
    let system_prompt = tool_calling_system_prompt(&function_definitions_json(&tools));
    let response = recorded_chat(
        chat,
        transcript,
        "tool_call_request",
        &context.settings.round_trip_prompt,
        Some(&system_prompt),
    )
    .await?;
    let request = match context.settings.matcher.evaluate(&response, &tools) {
        Ok(request) => {
            transcript.record(
                TranscriptChannel::Parse,
                "tool_call",
                Value::String(response),
                request.to_envelope(),
                None,
            );
            request
        }
        Err(err) => {
            transcript.record(
                TranscriptChannel::Parse,
                "tool_call",
                Value::String(response),
                Value::Null,
                Some(err.to_string()),
            );
            let declared: Vec<String> = tools.iter().map(|tool| tool.name.clone()).collect();
            return Err(HarnessError::rejected_tool_call(err, &declared));
        }
    };
    notes.push(format!("matcher {} accepted {}", context.settings.matcher.as_str(), request.name));
    let call = request.clone();
    let run = server
        .with_session(async move |session: &mut StdioSession| {
            session.call_tool(&call.name, call.arguments).await
        })
        .await?;
    transcript.extend(run.transcript);
    notes.push(session_note(run.pid, run.termination));
    let output = run.result?;
    let raw = output.textual_form();
    let result = parse_tool_result(&raw);
    transcript.record(
        TranscriptChannel::Parse,
        "tool_result",
        Value::String(raw),
        Value::Object(result.clone()),
        None,
    );
    let follow_up = follow_up_prompt(&request, &result);
    match recorded_chat(chat, transcript, "result_summary", &follow_up, None).await {
        Ok(summary) => notes.push(format!("model summary: {}", summary.trim())),
        Err(err) => notes.push(format!("model summary unavailable: {err}")),
    }
    let marker = &context.settings.success_marker;
    let message = result.get("message").and_then(Value::as_str).unwrap_or_default();
    if message.contains(marker.as_str()) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed(format!(
            "tool result message lacks `{marker}`: {}",
            Value::Object(result.clone())
        )))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Session pid and close outcome for notes.
fn session_note(pid: Option<u32>, termination: TerminationOutcome) -> String {
    let pid = pid.map_or_else(|| "none".to_string(), |pid| pid.to_string());
    format!("session pid {pid} closed {}", termination.as_str())
}

/// Stdio scenarios require the stdio transport literal.
fn require_stdio(manifest: &ManifestDocument) -> Result<(), HarnessError> {
    match manifest.transport_type() {
        Some(STDIO_TRANSPORT) => Ok(()),
        Some(other) => Err(HarnessError::ProtocolViolation(format!(
            "server.transport.type must be `{STDIO_TRANSPORT}` to open a stdio session, found \
             `{other}`"
        ))),
        None => Err(HarnessError::ProtocolViolation(format!(
            "server.transport.type must be `{STDIO_TRANSPORT}` to open a stdio session, found \
             nothing"
        ))),
    }
}

/// Returns the chat client or explains its absence.
fn require_chat<'a>(context: &ScenarioContext<'a>) -> Result<&'a ChatClient, HarnessError> {
    context.chat.ok_or_else(|| {
        HarnessError::ProtocolViolation("inference backend was not started".to_string())
    })
}

/// Returns the tool server or explains its absence.
fn require_tool_server<'a>(
    context: &ScenarioContext<'a>,
) -> Result<&'a ToolServerManager, HarnessError> {
    context.tool_server.ok_or_else(|| {
        HarnessError::ProtocolViolation("tool server was not started".to_string())
    })
}

/// Sends one chat prompt and records the exchange.
async fn recorded_chat(
    chat: &ChatClient,
    transcript: &mut Transcript,
    step: &str,
    prompt: &str,
    system_prompt: Option<&str>,
) -> Result<String, HarnessError> {
    let request = json!({
        "model": chat.model(),
        "system": system_prompt,
        "prompt": prompt,
    });
    match chat.chat(prompt, system_prompt).await {
        Ok(content) => {
            transcript.record(
                TranscriptChannel::Chat,
                step,
                request,
                Value::String(content.clone()),
                None,
            );
            Ok(content)
        }
        Err(err) => {
            transcript.record(
                TranscriptChannel::Chat,
                step,
                request,
                Value::Null,
                Some(err.to_string()),
            );
            Err(err.into())
        }
    }
}

/// Fails unless the tool result text carries `marker` and is not an error.
fn require_marker_in_text(output: &ToolCallOutput, marker: &str) -> Result<(), HarnessError> {
    let text = output.textual_form();
    if output.is_error {
        return Err(HarnessError::AssertionFailed(format!("tool reported isError: {text}")));
    }
    if text.contains(marker) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed(format!("tool result lacks `{marker}`: {text}")))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
