// system-tests/tests/suites/round_trip.rs
// ============================================================================
// Module: Round-Trip Tests
// Description: Model-driven tool calls executed against the greeter.
// Purpose: Ensure matching gates execution and results flow back to the model.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! The inference stub answers the round-trip prompt with a scripted tool
//! call. Conforming calls reach the greeter; deviations fail before any
//! session process is spawned.

use std::sync::Arc;

use helpers::artifacts::TestReporter;
use helpers::fake_backend::stub_inference_config;
use helpers::fake_backend::write_fake_ollama;
use helpers::greeter::hello_manifest_path;
use helpers::greeter::run_config;
use helpers::inference_stub::StubScript;
use helpers::inference_stub::spawn_inference_stub;
use helpers::inference_stub::tool_call_reply;
use helpers::processes::assert_no_leaks;
use mcp_conformance_config::ConformanceConfig;
use mcp_conformance_config::ScenarioId;
use mcp_conformance_config::ToolCallMatchMode;
use mcp_conformance_harness::ConformanceReport;
use mcp_conformance_harness::MemoryEventSink;
use mcp_conformance_harness::ScenarioOutcome;
use mcp_conformance_harness::ScenarioStatus;
use mcp_conformance_harness::TranscriptChannel;
use mcp_conformance_harness::run_conformance;
use serde_json::json;
use tempfile::TempDir;

use crate::helpers;

struct RoundTripRun {
    report: ConformanceReport,
    events: Arc<MemoryEventSink>,
    prompts: Vec<String>,
}

impl RoundTripRun {
    fn outcome(&self) -> Result<&ScenarioOutcome, String> {
        self.report.outcome(ScenarioId::RoundTrip).ok_or_else(|| "missing round_trip".to_string())
    }

    fn sessions_spawned(&self) -> usize {
        self.events.matching("session", "spawn").len()
    }
}

async fn run_round_trip(
    script: StubScript,
    configure: impl FnOnce(&mut ConformanceConfig),
) -> Result<RoundTripRun, Box<dyn std::error::Error>> {
    let stub = spawn_inference_stub(script).await?;
    let temp_dir = TempDir::new()?;
    let program = write_fake_ollama(temp_dir.path())?;
    let mut config = run_config(hello_manifest_path(), &[ScenarioId::RoundTrip]);
    config.inference = stub_inference_config(&stub, &program);
    configure(&mut config);
    let events = Arc::new(MemoryEventSink::default());
    let report = run_conformance(&config, None, events.clone()).await?;
    assert_no_leaks(&events.events())?;
    Ok(RoundTripRun {
        report,
        events,
        prompts: stub.user_prompts(),
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn conforming_call_reaches_the_greeter_and_is_summarized()
-> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("conforming_round_trip")?;
    let run = run_round_trip(StubScript::conforming(), |_| {}).await?;
    let artifacts = reporter.artifacts().write_report(&run.report)?;
    let outcome = run.outcome()?;

    assert_eq!(outcome.status, ScenarioStatus::Passed, "{:?}", outcome.failure);
    assert_eq!(run.sessions_spawned(), 1);
    let parsed: Vec<&str> = outcome
        .transcript
        .iter()
        .filter(|entry| entry.channel == TranscriptChannel::Parse)
        .map(|entry| entry.method.as_str())
        .collect();
    assert_eq!(parsed, vec!["tool_call", "tool_result"]);
    let result = outcome
        .transcript
        .iter()
        .find(|entry| entry.method == "tool_result")
        .ok_or("missing tool_result entry")?;
    assert_eq!(result.response["message"], "Hello, MCPUser! TEST_MARKER_SUCCESS");

    assert_eq!(run.prompts.len(), 2);
    assert!(run.prompts[1].contains("You previously made a tool call to \"say_hello\""));
    assert!(run.prompts[1].contains("TEST_MARKER_SUCCESS"));
    assert!(outcome.notes.iter().any(|note| note.starts_with("model summary: The tool greeted")));

    reporter.finish("pass", vec!["round trip passed".to_string()], artifacts)?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn deviating_calls_fail_before_any_session() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("deviating_calls_fail_before_any_session")?;
    let deviations = [
        (
            "extra argument",
            tool_call_reply(&json!({"name": "MCPUser", "greeting": "hi"})),
            "protocol_violation",
        ),
        ("different argument", tool_call_reply(&json!({"name": "Someone"})), "protocol_violation"),
        ("prose", "I would call say_hello with name MCPUser.".to_string(), "malformed_tool_call"),
        (
            "bare call",
            json!({"name": "say_hello", "arguments": {"name": "MCPUser"}}).to_string(),
            "malformed_tool_call",
        ),
    ];
    let mut notes = Vec::new();
    for (label, reply, kind) in deviations {
        let run = run_round_trip(StubScript::with_tool_call(reply), |_| {}).await?;
        let outcome = run.outcome()?;
        let failure = outcome.failure.as_ref().ok_or_else(|| format!("{label} should fail"))?;
        assert_eq!(failure.kind, kind, "{label}: {}", failure.message);
        assert_eq!(run.sessions_spawned(), 0, "{label}");
        assert_eq!(run.prompts.len(), 1, "{label}");
        notes.push(format!("{label}: {}", failure.message));
    }
    reporter.finish("pass", notes, vec!["summary.json".to_string(), "summary.md".to_string()])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn schema_matching_accepts_any_valid_arguments() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("schema_matching_accepts_any_valid_arguments")?;
    let schema = |config: &mut ConformanceConfig| {
        config.scenarios.tool_call_match = ToolCallMatchMode::Schema;
    };

    let accepted =
        run_round_trip(StubScript::with_tool_call(tool_call_reply(&json!({"name": "Someone"}))), schema)
            .await?;
    let outcome = accepted.outcome()?;
    assert_eq!(outcome.status, ScenarioStatus::Passed, "{:?}", outcome.failure);
    assert_eq!(accepted.sessions_spawned(), 1);

    let rejected = run_round_trip(
        StubScript::with_tool_call(tool_call_reply(&json!({"name": "Someone", "greeting": "hi"}))),
        schema,
    )
    .await?;
    let failure = rejected.outcome()?.failure.clone().ok_or("extra argument should fail")?;
    assert_eq!(failure.kind, "protocol_violation");
    assert!(failure.message.contains("violate inputSchema"), "{}", failure.message);
    assert_eq!(rejected.sessions_spawned(), 0);

    let undeclared = json!({"tool_call": {"name": "say_goodbye", "arguments": {}}}).to_string();
    let unknown = run_round_trip(StubScript::with_tool_call(undeclared), schema).await?;
    let failure = unknown.outcome()?.failure.clone().ok_or("undeclared tool should fail")?;
    assert_eq!(failure.kind, "tool_not_found");
    assert!(failure.message.contains("available [say_hello]"), "{}", failure.message);
    assert_eq!(unknown.sessions_spawned(), 0);

    let nameless = json!({"tool_call": {"arguments": {"name": "Someone"}}}).to_string();
    let malformed = run_round_trip(StubScript::with_tool_call(nameless), schema).await?;
    let failure = malformed.outcome()?.failure.clone().ok_or("nameless call should fail")?;
    assert_eq!(failure.kind, "malformed_tool_call");
    assert_eq!(malformed.sessions_spawned(), 0);

    reporter.finish(
        "pass",
        vec!["schema matcher accepted Someone and classified each rejection".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string()],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn summary_failure_is_noted_without_failing() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("summary_failure_is_noted_without_failing")?;
    let script = StubScript {
        summary: None,
        ..StubScript::conforming()
    };
    let run = run_round_trip(script, |_| {}).await?;
    let outcome = run.outcome()?;

    assert_eq!(outcome.status, ScenarioStatus::Passed, "{:?}", outcome.failure);
    assert!(!outcome.failed_on_chat());
    assert!(outcome.notes.iter().any(|note| note.starts_with("model summary unavailable")));
    reporter.finish(
        "pass",
        vec!["failed summary chat recorded in notes only".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string()],
    )?;
    Ok(())
}
