// system-tests/src/lib.rs
// ============================================================================
// Module: MCP Conformance System Tests Library
// Description: Shared configuration for end-to-end conformance suites.
// Purpose: Provide common knobs for the system-test binaries.
// Dependencies: mcp-conformance-config
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the end-to-end suites in
//! `system-tests/tests` and the greeter binary they launch as a tool server.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
