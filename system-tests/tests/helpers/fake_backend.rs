// system-tests/tests/helpers/fake_backend.rs
// ============================================================================
// Module: Scripted Backend CLI
// Description: Shell stand-in for the `ollama` executable.
// Purpose: Exercise spawn, model listing, and teardown without a real backend.
// Dependencies: mcp-conformance-config
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use mcp_conformance_config::InferenceConfig;

use super::inference_stub::InferenceStubHandle;
use super::timeouts::resolve_timeout_ms;

/// Model every system test requests.
pub const STUB_MODEL: &str = "llama3.2:3b";

/// Writes an executable `ollama` script into `dir`.
///
/// `serve` sleeps until terminated, `list` reports [`STUB_MODEL`], and
/// `pull` is refused so tests notice unexpected downloads.
#[cfg(unix)]
pub fn write_fake_ollama(dir: &Path) -> Result<PathBuf, String> {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        "#!/bin/sh\ncase \"$1\" in\n  serve) exec sleep 60 ;;\n  list) printf 'NAME ID SIZE \
         MODIFIED\\n{STUB_MODEL} 0123abcd 2.0GB now\\n' ;;\n  pull) echo \"unexpected pull: $2\" \
         >&2; exit 1 ;;\n  *) exit 2 ;;\nesac\n"
    );
    let path = dir.join("ollama");
    fs::write(&path, script).map_err(|err| err.to_string())?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).map_err(|err| err.to_string())?;
    Ok(path)
}

/// Inference settings that spawn `program` and talk to `stub`.
pub fn stub_inference_config(stub: &InferenceStubHandle, program: &Path) -> InferenceConfig {
    InferenceConfig {
        program: program.display().to_string(),
        host: "127.0.0.1".to_string(),
        port: stub.port(),
        model: STUB_MODEL.to_string(),
        readiness_timeout_ms: resolve_timeout_ms(Duration::from_secs(5)),
        poll_interval_ms: 25,
        probe_timeout_ms: 500,
        list_timeout_ms: resolve_timeout_ms(Duration::from_secs(5)),
        pull_timeout_ms: resolve_timeout_ms(Duration::from_secs(5)),
        chat_timeout_ms: resolve_timeout_ms(Duration::from_secs(5)),
        shutdown_grace_ms: 2_000,
        ..InferenceConfig::default()
    }
}
