// system-tests/tests/helpers/greeter.rs
// ============================================================================
// Module: Greeter Fixtures
// Description: Tool server configuration and manifests for the greeter binary.
// Purpose: Point the harness at the compiled greeter and its manifest.
// Dependencies: mcp-conformance-config, mcp-conformance-harness
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use mcp_conformance_config::ConformanceConfig;
use mcp_conformance_config::ScenarioId;
use mcp_conformance_config::ToolServerConfig;
use mcp_conformance_harness::SharedEventSink;
use mcp_conformance_harness::ToolServerManager;
use serde_json::Value;

use super::timeouts::resolve_timeout_ms;

/// Path to the compiled greeter binary.
pub fn greeter_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mcp_conformance_greeter"))
}

/// Path to the checked-in `hello_service` manifest.
pub fn hello_manifest_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../fixtures/hello_service.proto.mcp.json")
}

/// Loads the `hello_service` manifest as raw JSON.
pub fn hello_manifest_value() -> Result<Value, String> {
    let raw = std::fs::read_to_string(hello_manifest_path()).map_err(|err| err.to_string())?;
    serde_json::from_str(&raw).map_err(|err| err.to_string())
}

/// Tool server settings launching the greeter binary.
pub fn greeter_config() -> ToolServerConfig {
    ToolServerConfig {
        program: greeter_binary().display().to_string(),
        handshake_timeout_ms: resolve_timeout_ms(Duration::from_secs(5)),
        request_timeout_ms: resolve_timeout_ms(Duration::from_secs(5)),
        close_grace_ms: 2_000,
        ..ToolServerConfig::default()
    }
}

/// A started manager for the greeter.
pub fn started_greeter(events: SharedEventSink) -> Result<ToolServerManager, String> {
    let mut manager = ToolServerManager::new(greeter_config(), events);
    manager.start().map_err(|err| err.to_string())?;
    Ok(manager)
}

/// Harness configuration targeting the greeter and `manifest_path`.
pub fn run_config(manifest_path: PathBuf, enabled: &[ScenarioId]) -> ConformanceConfig {
    let mut config = ConformanceConfig::default();
    config.manifest.path = manifest_path;
    config.scenarios.enabled = enabled.to_vec();
    config.tool_server = greeter_config();
    config
}

/// Writes `manifest` as pretty JSON to `dir/name`.
pub fn write_manifest(dir: &Path, name: &str, manifest: &Value) -> Result<PathBuf, String> {
    let path = dir.join(name);
    let rendered = serde_json::to_string_pretty(manifest).map_err(|err| err.to_string())?;
    std::fs::write(&path, rendered).map_err(|err| err.to_string())?;
    Ok(path)
}
