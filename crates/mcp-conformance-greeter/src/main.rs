// crates/mcp-conformance-greeter/src/main.rs
// ============================================================================
// Module: Greeter Entry Point
// Description: Binary wrapper around the greeter stdio loop.
// Purpose: Launchable tool server for the conformance harness.
// Dependencies: mcp-conformance-greeter
// ============================================================================

//! ## Overview
//! Runs the greeter over stdio and maps transport failures to a non-zero exit.

use std::io::Write;
use std::process::ExitCode;

/// Greeter entry point returning an exit code.
fn main() -> ExitCode {
    match mcp_conformance_greeter::serve_stdio() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "mcp-conformance-greeter: {err}");
            ExitCode::FAILURE
        }
    }
}
