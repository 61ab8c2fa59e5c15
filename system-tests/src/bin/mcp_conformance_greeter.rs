// system-tests/src/bin/mcp_conformance_greeter.rs
// ============================================================================
// Module: Greeter Stdio Server
// Description: Greeter tool server runner for system-tests.
// Purpose: Provide a tool server binary reachable via `CARGO_BIN_EXE_*`.
// Dependencies: mcp-conformance-greeter
// ============================================================================

//! Stdio greeter binary for system-tests.

use std::io::Write;
use std::process::ExitCode;

/// Greeter entry point returning an exit code.
fn main() -> ExitCode {
    match mcp_conformance_greeter::serve_stdio() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "mcp_conformance_greeter: {err}");
            ExitCode::FAILURE
        }
    }
}
