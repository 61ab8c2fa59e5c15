// system-tests/tests/suites/lifecycle.rs
// ============================================================================
// Module: Lifecycle Tests
// Description: Full runs, idempotent shutdown, and failed startup teardown.
// Purpose: Ensure every spawned backend and session process is reclaimed.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Runs the harness against the inference stub, a scripted `ollama`, and the
//! compiled greeter, then checks that each pid from a `spawn` event is gone.

use std::sync::Arc;
use std::time::Duration;

use helpers::artifacts::TestReporter;
use helpers::fake_backend::STUB_MODEL;
use helpers::fake_backend::stub_inference_config;
use helpers::fake_backend::write_fake_ollama;
use helpers::greeter::hello_manifest_path;
use helpers::greeter::run_config;
use helpers::inference_stub::StubScript;
use helpers::inference_stub::spawn_inference_stub;
use helpers::processes::assert_no_leaks;
use helpers::processes::pid_alive;
use mcp_conformance_config::ScenarioId;
use mcp_conformance_harness::ConformanceSession;
use mcp_conformance_harness::EventOutcome;
use mcp_conformance_harness::MemoryEventSink;
use mcp_conformance_harness::RunArtifacts;
use mcp_conformance_harness::run_conformance;
use mcp_conformance_manifest::ManifestDocument;
use tempfile::TempDir;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn full_run_passes_every_scenario_and_reclaims_processes()
-> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("full_run_passes_every_scenario")?;
    let stub = spawn_inference_stub(StubScript::conforming()).await?;
    let temp_dir = TempDir::new()?;
    let program = write_fake_ollama(temp_dir.path())?;
    let mut config = run_config(hello_manifest_path(), &ScenarioId::ALL);
    config.inference = stub_inference_config(&stub, &program);
    let run_artifacts = RunArtifacts::create(Some(&reporter.artifacts().harness_root()))?;
    let events = Arc::new(MemoryEventSink::default());

    let report = run_conformance(&config, Some(&run_artifacts), events.clone()).await?;
    let mut artifacts = reporter.artifacts().write_report(&report)?;
    reporter.artifacts().write_events(&events.events())?;
    artifacts.push("events.json".to_string());

    if !report.passed() {
        return Err(format!("run failed:\n{}", report.to_markdown()).into());
    }
    let order: Vec<ScenarioId> = report.scenarios.iter().map(|outcome| outcome.scenario).collect();
    assert_eq!(order, ScenarioId::ALL.to_vec());
    assert_eq!(report.counts().passed, 6);
    assert_eq!(report.model.as_deref(), Some(STUB_MODEL));
    assert_eq!(stub.user_prompts().len(), 3);

    let spawned = assert_no_leaks(&events.events())?;
    assert_eq!(spawned, 3, "inference plus one session per tool scenario");
    assert!(run_artifacts.root().join("report.json").is_file());
    assert!(run_artifacts.logs_dir().join("inference.stderr.log").is_file());

    reporter.finish(
        "pass",
        vec![format!("6 scenarios passed, {spawned} processes reclaimed")],
        artifacts,
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn session_shutdown_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("session_shutdown_is_idempotent")?;
    let stub = spawn_inference_stub(StubScript::conforming()).await?;
    let temp_dir = TempDir::new()?;
    let program = write_fake_ollama(temp_dir.path())?;
    let mut config = run_config(hello_manifest_path(), &[ScenarioId::Comprehension]);
    config.inference = stub_inference_config(&stub, &program);
    let manifest = Arc::new(ManifestDocument::load(&config.manifest.path)?);
    let events = Arc::new(MemoryEventSink::default());

    let mut session = ConformanceSession::start(&config, manifest, None, events.clone()).await?;
    assert!(session.plan().needs_inference);
    assert!(session.tool_server().is_none());
    let pid = session.inference().and_then(|backend| backend.pid()).ok_or("backend not spawned")?;
    assert!(pid_alive(pid));

    let report = session.run().await;
    assert!(report.passed(), "{}", report.to_markdown());
    session.shutdown().await;
    session.shutdown().await;

    assert!(!pid_alive(pid));
    assert_eq!(events.matching("orchestrator", "shutdown").len(), 2);
    reporter.artifacts().write_events(&events.events())?;
    reporter.finish(
        "pass",
        vec![format!("backend pid {pid} reclaimed; second shutdown was a no-op")],
        vec!["summary.json".to_string(), "summary.md".to_string(), "events.json".to_string()],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_startup_reclaims_the_backend() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("failed_startup_reclaims_the_backend")?;
    let stub = spawn_inference_stub(StubScript::conforming()).await?;
    let temp_dir = TempDir::new()?;
    let program = write_fake_ollama(temp_dir.path())?;
    let mut config = run_config(hello_manifest_path(), &[
        ScenarioId::ManifestStructure,
        ScenarioId::Comprehension,
    ]);
    config.inference = stub_inference_config(&stub, &program);
    let closed = std::net::TcpListener::bind("127.0.0.1:0")?;
    config.inference.port = closed.local_addr()?.port();
    drop(closed);
    config.inference.readiness_timeout_ms = 500;
    let events = Arc::new(MemoryEventSink::default());

    let started = std::time::Instant::now();
    let Err(err) = run_conformance(&config, None, events.clone()).await else {
        return Err("startup should fail without a reachable backend".into());
    };
    assert_eq!(err.kind(), "readiness_timeout");
    assert!(started.elapsed() < Duration::from_secs(10));

    let start = events.matching("orchestrator", "start");
    assert_eq!(start.len(), 1);
    assert_eq!(start[0].outcome, EventOutcome::Failed);
    let spawned = assert_no_leaks(&events.events())?;
    assert_eq!(spawned, 1);
    assert!(stub.requests().is_empty());

    reporter.artifacts().write_events(&events.events())?;
    reporter.finish(
        "pass",
        vec![format!("startup failed with {} and the backend was reclaimed", err.kind())],
        vec!["summary.json".to_string(), "summary.md".to_string(), "events.json".to_string()],
    )?;
    Ok(())
}
