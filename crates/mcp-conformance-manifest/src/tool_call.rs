// crates/mcp-conformance-manifest/src/tool_call.rs
// ============================================================================
// Module: Tool Call Requests
// Description: Structured tool-call model and model-output matching.
// Purpose: Decide whether a model's emitted tool call is acceptable.
// Dependencies: jsonschema, serde, serde_json
// ============================================================================

//! ## Overview
//! Models are asked to answer with
//! `{"tool_call": {"name": "...", "arguments": {...}}}`. This module parses
//! that envelope into a [`ToolCallRequest`] and applies a
//! [`ToolCallMatcher`]:
//!
//! - [`ToolCallMatcher::Exact`] pins the whole envelope by strict JSON
//!   equality. Extra keys, different argument values, or non-JSON text all
//!   fail before any tool is invoked.
//! - [`ToolCallMatcher::Schema`] accepts any call naming a declared tool whose
//!   arguments satisfy that tool's `inputSchema`.
//!
//! Structural defects (missing envelope, missing name, non-object arguments)
//! are reported as [`ToolCallError`] in both modes, before any comparison, and
//! kept distinct from unknown-tool failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::manifest::ToolEntry;

/// Envelope key wrapping the emitted tool call.
pub const TOOL_CALL_KEY: &str = "tool_call";

// ============================================================================
// SECTION: Request Model
// ============================================================================

/// Tool invocation requested by test code or a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    /// Builds a request from a name and argument map.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Parses the inner `{name, arguments}` object.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCallError`] when the value is not an object, the name is
    /// missing or not a string, or the arguments are not an object.
    pub fn from_value(value: &Value) -> Result<Self, ToolCallError> {
        let object = value.as_object().ok_or(ToolCallError::NotAnObject)?;
        let name = match object.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
            _ => return Err(ToolCallError::MissingName),
        };
        let arguments = match object.get("arguments") {
            Some(Value::Object(arguments)) => arguments.clone(),
            Some(other) => {
                return Err(ToolCallError::InvalidArguments(json_kind(other).to_string()));
            }
            None => return Err(ToolCallError::InvalidArguments("missing".to_string())),
        };
        Ok(Self {
            name,
            arguments,
        })
    }

    /// Returns the `{"tool_call": {...}}` envelope for this request.
    #[must_use]
    pub fn to_envelope(&self) -> Value {
        let mut inner = Map::new();
        inner.insert("name".to_string(), Value::String(self.name.clone()));
        inner.insert("arguments".to_string(), Value::Object(self.arguments.clone()));
        let mut outer = Map::new();
        outer.insert(TOOL_CALL_KEY.to_string(), Value::Object(inner));
        Value::Object(outer)
    }
}

/// Parses model output text as a tool-call envelope.
///
/// # Errors
///
/// Returns [`ToolCallError`] when the text is not JSON, lacks the
/// `tool_call` object, or the inner call is malformed.
pub fn parse_envelope(text: &str) -> Result<(Value, ToolCallRequest), ToolCallError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| ToolCallError::NotJson(err.to_string()))?;
    let inner = value.get(TOOL_CALL_KEY).ok_or(ToolCallError::MissingEnvelope)?;
    let request = ToolCallRequest::from_value(inner)?;
    Ok((value, request))
}

/// Returns a short JSON type label for diagnostics.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Strategy for accepting a model-emitted tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallMatcher {
    /// Strict equality with a pinned envelope.
    Exact {
        /// Expected envelope value.
        expected: Value,
    },
    /// Declared tool plus `inputSchema` conformance.
    Schema,
}

impl ToolCallMatcher {
    /// Builds an exact matcher pinned to `expected`.
    #[must_use]
    pub fn exact(expected: &ToolCallRequest) -> Self {
        Self::Exact {
            expected: expected.to_envelope(),
        }
    }

    /// Returns a stable label for the strategy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact {
                ..
            } => "exact",
            Self::Schema => "schema",
        }
    }

    /// Evaluates model output against the strategy.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError`] describing the literal mismatch.
    pub fn evaluate(&self, text: &str, tools: &[ToolEntry]) -> Result<ToolCallRequest, MatchError> {
        match self {
            Self::Exact {
                expected,
            } => {
                let actual: Value = serde_json::from_str(text).map_err(|err| {
                    MatchError::Malformed(ToolCallError::NotJson(err.to_string()))
                })?;
                let inner = actual.get(TOOL_CALL_KEY).ok_or(ToolCallError::MissingEnvelope)?;
                let request = ToolCallRequest::from_value(inner)?;
                if &actual != expected {
                    return Err(MatchError::Mismatch {
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    });
                }
                Ok(request)
            }
            Self::Schema => {
                let (_, request) = parse_envelope(text)?;
                let tool = tools
                    .iter()
                    .find(|tool| tool.name == request.name)
                    .ok_or_else(|| MatchError::UnknownTool(request.name.clone()))?;
                validate_arguments(tool, &request)?;
                Ok(request)
            }
        }
    }
}

/// Validates call arguments against the tool's `inputSchema`.
fn validate_arguments(tool: &ToolEntry, request: &ToolCallRequest) -> Result<(), MatchError> {
    let validator = jsonschema::validator_for(&tool.input_schema).map_err(|err| {
        MatchError::InvalidSchema {
            tool: tool.name.clone(),
            reason: err.to_string(),
        }
    })?;
    let instance = Value::Object(request.arguments.clone());
    let errors: Vec<String> = validator.iter_errors(&instance).map(|err| err.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MatchError::SchemaViolation {
            tool: tool.name.clone(),
            errors,
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural tool-call defects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolCallError {
    /// Output was not JSON.
    #[error("tool call is not valid JSON: {0}")]
    NotJson(String),
    /// Output lacked the `tool_call` object.
    #[error("tool call envelope missing `tool_call` key")]
    MissingEnvelope,
    /// Inner call was not an object.
    #[error("tool call must be a JSON object")]
    NotAnObject,
    /// Name missing, empty, or not a string.
    #[error("tool call missing `name`")]
    MissingName,
    /// Arguments missing or not an object.
    #[error("tool call `arguments` must be an object (found {0})")]
    InvalidArguments(String),
}

/// Matching failures for model-emitted tool calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// Structurally invalid output.
    #[error(transparent)]
    Malformed(#[from] ToolCallError),
    /// Output differed from the pinned envelope.
    #[error("tool call mismatch: expected {expected}, got {actual}")]
    Mismatch {
        /// Expected envelope as compact JSON.
        expected: String,
        /// Actual envelope as compact JSON.
        actual: String,
    },
    /// Named tool is not declared in the manifest.
    #[error("tool call names undeclared tool `{0}`")]
    UnknownTool(String),
    /// Declared `inputSchema` could not be compiled.
    #[error("tool `{tool}` has an invalid inputSchema: {reason}")]
    InvalidSchema {
        /// Tool name.
        tool: String,
        /// Compilation error.
        reason: String,
    },
    /// Arguments violate the declared schema.
    #[error("tool `{tool}` arguments violate inputSchema: {}", .errors.join("; "))]
    SchemaViolation {
        /// Tool name.
        tool: String,
        /// Validation messages.
        errors: Vec<String>,
    },
}

// ============================================================================
// SECTION: Tests
// ============================================================================
