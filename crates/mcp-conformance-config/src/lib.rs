// crates/mcp-conformance-config/src/lib.rs
// ============================================================================
// Module: MCP Conformance Config Library
// Description: Canonical config model, env overrides, and validation.
// Purpose: Single source of truth for mcp-conformance.toml semantics.
// Dependencies: serde, serde_json, toml
// ============================================================================

//! ## Overview
//! `mcp-conformance-config` defines the configuration model for the
//! conformance harness: how the inference backend and tool server are
//! launched, which manifest is checked, and which scenarios run. Loading is
//! strict and fail-closed; environment overrides are applied after the file
//! is parsed and before validation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::ConformanceEnv;
pub use env::read_env_strict;
