// system-tests/tests/suites/tool_transport.rs
// ============================================================================
// Module: Tool Transport Tests
// Description: Stdio sessions against the compiled greeter binary.
// Purpose: Ensure handshake, listing, calls, and close behave over stdio.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Drives [`StdioSession`] directly and through scoped sessions, then runs
//! the direct-invocation scenario against manifests with other transports.

use std::sync::Arc;

use helpers::artifacts::TestReporter;
use helpers::greeter::hello_manifest_value;
use helpers::greeter::run_config;
use helpers::greeter::started_greeter;
use helpers::greeter::write_manifest;
use helpers::processes::assert_no_leaks;
use helpers::processes::pid_alive;
use mcp_conformance_config::ScenarioId;
use mcp_conformance_harness::HarnessError;
use mcp_conformance_harness::MemoryEventSink;
use mcp_conformance_harness::ScenarioStatus;
use mcp_conformance_harness::SessionState;
use mcp_conformance_harness::StdioSession;
use mcp_conformance_harness::TerminationOutcome;
use mcp_conformance_harness::run_conformance;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

use crate::helpers;

fn arguments(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn direct_session_greets_and_closes_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("direct_session_greets_and_closes_once")?;
    let events = Arc::new(MemoryEventSink::default());
    let manager = started_greeter(events.clone())?;
    let mut session = manager.open_session()?;
    assert_eq!(session.state(), SessionState::Unopened);

    session.open().await?;
    assert_eq!(session.state(), SessionState::Open);
    let server_name =
        session.server_info().and_then(|info| info.get("name")).and_then(Value::as_str);
    assert_eq!(server_name, Some("mcp-conformance-greeter"));

    let tools = session.list_tools().await?;
    let say_hello = tools.iter().find(|tool| tool.name == "say_hello").ok_or("say_hello missing")?;
    assert_eq!(say_hello.input_schema["required"], json!(["name"]));

    let output = session.call_tool("say_hello", arguments(json!({"name": "TestUser"}))).await?;
    assert!(!output.is_error);
    assert!(output.text().contains("Hello, TestUser! TEST_MARKER_SUCCESS"));

    let pid = session.pid().ok_or("session never spawned")?;
    assert_eq!(session.close().await, TerminationOutcome::Graceful);
    assert_eq!(session.close().await, TerminationOutcome::Graceful);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!pid_alive(pid));
    assert_eq!(events.matching("session", "close").len(), 1);

    let Err(err) = session.list_tools().await else {
        return Err("closed session must reject requests".into());
    };
    assert_eq!(err.kind(), "session_closed");

    let transcript = session.take_transcript();
    assert_eq!(transcript.by_method("initialize").count(), 1);
    assert_eq!(transcript.by_method("tools/call").count(), 1);
    reporter.artifacts().write_json("transcript.json", &transcript.entries())?;
    reporter.finish(
        "pass",
        vec!["greeter answered initialize, tools/list, and tools/call".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string(), "transcript.json".to_string()],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_and_protocol_errors_are_distinguished() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("tool_and_protocol_errors_are_distinguished")?;
    let events = Arc::new(MemoryEventSink::default());
    let manager = started_greeter(events.clone())?;

    let run = manager
        .with_session(async |session: &mut StdioSession| {
            let unknown = session.call_tool("say_goodbye", arguments(json!({"name": "x"}))).await?;
            let invalid = session.call_tool("say_hello", arguments(json!({"name": 42}))).await;
            Ok((unknown, invalid.map(|_| ()).map_err(|err| err.kind())))
        })
        .await?;
    let (unknown, invalid) = run.result?;

    assert!(unknown.is_error);
    assert!(unknown.text().contains("unknown tool: say_goodbye"));
    assert_eq!(invalid, Err("rpc"));
    assert_eq!(run.termination, TerminationOutcome::Graceful);
    assert_no_leaks(&events.events())?;
    reporter.finish(
        "pass",
        vec!["unknown tool is isError; bad arguments are a JSON-RPC error".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string()],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn scoped_session_closes_when_the_body_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("scoped_session_closes_when_the_body_fails")?;
    let events = Arc::new(MemoryEventSink::default());
    let manager = started_greeter(events.clone())?;

    let run = manager
        .with_session(async |session: &mut StdioSession| -> Result<(), HarnessError> {
            session.list_tools().await?;
            Err(HarnessError::AssertionFailed("body gave up".to_string()))
        })
        .await?;

    let Err(err) = run.result else {
        return Err("body error must surface".into());
    };
    assert_eq!(err.kind(), "assertion_failed");
    let pid = run.pid.ok_or("session never spawned")?;
    assert!(!pid_alive(pid));
    assert_eq!(run.transcript.by_method("tools/list").count(), 1);
    reporter.finish(
        "pass",
        vec![format!("session {pid} closed {}", run.termination.as_str())],
        vec!["summary.json".to_string(), "summary.md".to_string()],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn non_stdio_manifest_never_spawns_a_session() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("non_stdio_manifest_never_spawns_a_session")?;
    let temp_dir = TempDir::new()?;
    let mut manifest = hello_manifest_value()?;
    manifest["server"]["transport"]["type"] = json!("sse");
    let path = write_manifest(temp_dir.path(), "sse.mcp.json", &manifest)?;
    let config = run_config(path, &[ScenarioId::ServerConfig, ScenarioId::DirectInvocation]);
    let events = Arc::new(MemoryEventSink::default());

    let report = run_conformance(&config, None, events.clone()).await?;
    let artifacts = reporter.artifacts().write_report(&report)?;

    assert_eq!(report.counts().failed, 2);
    for outcome in &report.scenarios {
        assert_eq!(outcome.status, ScenarioStatus::Failed);
        let failure = outcome.failure.as_ref().ok_or("missing failure")?;
        assert_eq!(failure.kind, "protocol_violation");
        assert!(failure.message.contains("sse"), "{}", failure.message);
    }
    assert!(events.matching("session", "spawn").is_empty());
    reporter.finish("pass", vec!["sse manifest rejected before spawn".to_string()], artifacts)?;
    Ok(())
}
