// crates/mcp-conformance-manifest/src/lib.rs
// ============================================================================
// Module: MCP Conformance Manifest
// Description: Manifest model, structural validation, and tool-call matching.
// Purpose: Single source of truth for manifest semantics used by the harness.
// Dependencies: jsonschema, serde, serde_json
// ============================================================================

//! ## Overview
//! `mcp-conformance-manifest` loads MCP manifests, validates their structure
//! field by field, renders declared tools as function-calling schemas, and
//! decides whether a model-emitted tool call matches what a scenario expects.
//!
//! Manifest inputs are untrusted; every check fails closed with the literal
//! field or value that was wrong.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod functions;
pub mod manifest;
pub mod tool_call;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use functions::FunctionDefinition;
pub use functions::FunctionParameters;
pub use functions::function_definitions;
pub use functions::function_definitions_json;
pub use manifest::ManifestDocument;
pub use manifest::ManifestError;
pub use manifest::REQUIRED_FIELDS;
pub use manifest::REQUIRED_TOOL_FIELDS;
pub use manifest::STDIO_TRANSPORT;
pub use manifest::ToolEntry;
pub use tool_call::MatchError;
pub use tool_call::TOOL_CALL_KEY;
pub use tool_call::ToolCallError;
pub use tool_call::ToolCallMatcher;
pub use tool_call::ToolCallRequest;
pub use tool_call::parse_envelope;
