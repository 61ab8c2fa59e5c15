// crates/mcp-conformance-manifest/src/functions.rs
// ============================================================================
// Module: Function Definitions
// Description: Renders manifest tools as function-calling schemas.
// Purpose: Give models a compact, deterministic view of the tool surface.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Converts [`ToolEntry`] values into the `{name, description, parameters}`
//! shape used by function-calling prompts. Parameters always declare
//! `type: "object"`; missing `properties`/`required` become empty values.

use serde::Serialize;
use serde_json::Value;

use crate::manifest::ToolEntry;

/// Function-calling definition for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Parameter schema.
    pub parameters: FunctionParameters,
}

/// Parameter block of a [`FunctionDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionParameters {
    /// Always `"object"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Property schemas keyed by parameter name.
    pub properties: Value,
    /// Required parameter names.
    pub required: Vec<String>,
}

impl From<&ToolEntry> for FunctionDefinition {
    fn from(tool: &ToolEntry) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: FunctionParameters {
                kind: "object",
                properties: tool.input_properties(),
                required: tool.required_parameters(),
            },
        }
    }
}

/// Renders every tool as a function definition, preserving manifest order.
#[must_use]
pub fn function_definitions(tools: &[ToolEntry]) -> Vec<FunctionDefinition> {
    tools.iter().map(FunctionDefinition::from).collect()
}

/// Renders function definitions as indented JSON for prompt embedding.
#[must_use]
pub fn function_definitions_json(tools: &[ToolEntry]) -> String {
    serde_json::to_string_pretty(&function_definitions(tools)).unwrap_or_else(|_| "[]".to_string())
}
