// system-tests/tests/suites/live_ollama.rs
// ============================================================================
// Module: Live Ollama Tests
// Description: Every scenario against a real `ollama` and the greeter.
// Purpose: Catch drift between the stubs and a real inference backend.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Skips when `ollama` is not on `PATH` unless
//! `MCP_CONFORMANCE_SYSTEM_TEST_REQUIRE_LIVE=1`. Model answers vary, so only
//! the deterministic scenarios must pass; the model-driven ones must finish
//! with a verdict and leave no processes behind.

use std::sync::Arc;
use std::time::Duration;

use helpers::artifacts::TestReporter;
use helpers::greeter::hello_manifest_path;
use helpers::greeter::run_config;
use helpers::processes::assert_no_leaks;
use helpers::timeouts::resolve_timeout_ms;
use mcp_conformance_config::DEFAULT_MODEL;
use mcp_conformance_config::ScenarioId;
use mcp_conformance_harness::MemoryEventSink;
use mcp_conformance_harness::RunArtifacts;
use mcp_conformance_harness::ScenarioStatus;
use mcp_conformance_harness::locate_executable;
use mcp_conformance_harness::run_conformance;
use system_tests::config::SystemTestConfig;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn live_backend_runs_every_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("live_backend_runs_every_scenario")?;
    let env = SystemTestConfig::load()?;
    if locate_executable("ollama").is_none() {
        if env.require_live {
            return Err("ollama is required but not on PATH".into());
        }
        reporter.finish(
            "skip",
            vec!["ollama not on PATH".to_string()],
            vec!["summary.json".to_string(), "summary.md".to_string()],
        )?;
        return Ok(());
    }

    let mut config = run_config(hello_manifest_path(), &ScenarioId::ALL);
    config.inference.model = env.live_model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
    config.inference.reuse_running = true;
    config.inference.readiness_timeout_ms = resolve_timeout_ms(Duration::from_secs(30));
    config.inference.pull_timeout_ms = resolve_timeout_ms(Duration::from_secs(900));
    config.inference.chat_timeout_ms = resolve_timeout_ms(Duration::from_secs(180));
    let run_artifacts = RunArtifacts::create(Some(&reporter.artifacts().harness_root()))?;
    let events = Arc::new(MemoryEventSink::default());

    let report = run_conformance(&config, Some(&run_artifacts), events.clone()).await?;
    let mut artifacts = reporter.artifacts().write_report(&report)?;
    reporter.artifacts().write_events(&events.events())?;
    artifacts.push("events.json".to_string());

    for id in [
        ScenarioId::ManifestStructure,
        ScenarioId::ServerConfig,
        ScenarioId::ToolsStructure,
        ScenarioId::DirectInvocation,
    ] {
        let status = report.outcome(id).map(|outcome| outcome.status);
        if status != Some(ScenarioStatus::Passed) {
            return Err(format!("{} did not pass:\n{}", id.as_str(), report.to_markdown()).into());
        }
    }
    assert_eq!(report.scenarios.len(), 6);
    assert_no_leaks(&events.events())?;

    let counts = report.counts();
    reporter.finish(
        "pass",
        vec![format!(
            "{} passed, {} failed against {}",
            counts.passed,
            counts.failed,
            report.model.as_deref().unwrap_or("unknown model")
        )],
        artifacts,
    )?;
    Ok(())
}
