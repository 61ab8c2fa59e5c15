// crates/mcp-conformance-manifest/tests/common/mod.rs
// ============================================================================
// Module: Manifest Test Fixtures
// Description: Shared manifest fixtures for integration tests.
// ============================================================================

#![allow(dead_code, reason = "Fixtures are shared across several test binaries.")]

use serde_json::Value;
use serde_json::json;

/// Returns the four-field reference manifest with one `say_hello` tool.
pub fn hello_manifest() -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "name": "hello_service",
        "server": {"transport": {"type": "stdio"}},
        "tools": [{
            "name": "say_hello",
            "description": "Calls Greeter.SayHello and returns the greeting message.",
            "inputSchema": {
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"],
                "additionalProperties": false
            },
            "outputSchema": {
                "type": "object",
                "properties": {"message": {"type": "string"}}
            }
        }]
    })
}

/// Returns the reference manifest with one top-level field removed.
pub fn without_field(field: &str) -> Value {
    let mut manifest = hello_manifest();
    if let Some(object) = manifest.as_object_mut() {
        object.remove(field);
    }
    manifest
}
