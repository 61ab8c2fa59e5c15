// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for MCP conformance system-tests.
// Purpose: Provide backend stand-ins, the greeter tool server, and artifacts.
// Dependencies: system-tests, mcp-conformance-harness, axum, nix
// ============================================================================

//! ## Overview
//! Suites run the real harness against an HTTP inference stub, a scripted
//! `ollama` CLI, and the compiled greeter binary. Every test writes a summary
//! under `target/system-tests` even when it panics.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod fake_backend;
pub mod greeter;
pub mod inference_stub;
pub mod timeouts;
