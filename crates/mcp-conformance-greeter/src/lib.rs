// crates/mcp-conformance-greeter/src/lib.rs
// ============================================================================
// Module: MCP Conformance Greeter
// Description: Reference stdio MCP tool server for conformance runs.
// Purpose: Answer `say_hello` deterministically with a success marker.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The greeter is the tool backend the harness launches per session. It
//! speaks newline-delimited JSON-RPC 2.0 over stdio, exposes a single
//! `say_hello` tool, and exits cleanly when stdin closes. The library form
//! lets tests and other binaries embed the same dispatch loop.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use server::GreeterError;
pub use server::JsonRpcError;
pub use server::JsonRpcRequest;
pub use server::JsonRpcResponse;
pub use server::SUCCESS_MARKER;
pub use server::TOOL_NAME;
pub use server::greeting;
pub use server::handle_line;
pub use server::handle_request;
pub use server::serve;
pub use server::tool_definitions;

/// Serves the process's stdin/stdout until EOF.
///
/// # Errors
///
/// Returns [`GreeterError`] when the transport fails.
pub fn serve_stdio() -> Result<(), GreeterError> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    serve(stdin.lock(), stdout.lock())
}
