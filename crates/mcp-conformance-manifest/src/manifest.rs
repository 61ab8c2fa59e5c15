// crates/mcp-conformance-manifest/src/manifest.rs
// ============================================================================
// Module: Manifest Document
// Description: Immutable MCP manifest model with structural checks.
// Purpose: Load a manifest once and validate it field by field.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ManifestDocument`] wraps the raw JSON manifest and exposes typed views
//! over it. Structural validation is split into three independent checks so a
//! missing field is always reported by the check named for it:
//! [`ManifestDocument::check_structure`], [`ManifestDocument::check_server`]
//! and [`ManifestDocument::check_tools`].
//!
//! The document is never mutated after load; sessions share it behind an
//! `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Top-level fields every manifest must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 4] = ["protocolVersion", "name", "server", "tools"];

/// Fields every tool entry must carry, in reporting order.
pub const REQUIRED_TOOL_FIELDS: [&str; 4] = ["name", "description", "inputSchema", "outputSchema"];

/// Transport literal identifying a standard-input/standard-output server.
pub const STDIO_TRANSPORT: &str = "stdio";

/// Maximum manifest file size in bytes.
pub const MAX_MANIFEST_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parsed, read-only MCP manifest.
///
/// # Invariants
/// - The wrapped value is always a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    /// Raw manifest object as loaded.
    raw: Map<String, Value>,
}

/// Tool entry declared by a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for tool arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// JSON schema for tool results.
    #[serde(rename = "outputSchema")]
    pub output_schema: Value,
}

impl ToolEntry {
    /// Returns the `inputSchema.properties` object, or an empty object.
    #[must_use]
    pub fn input_properties(&self) -> Value {
        self.input_schema
            .get("properties")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Returns the `inputSchema.required` names, skipping non-string entries.
    #[must_use]
    pub fn required_parameters(&self) -> Vec<String> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ManifestDocument {
    /// Loads a manifest from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the file cannot be read, exceeds the
    /// size limit, is not valid JSON, or is not a JSON object.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let bytes = fs::read(path)
            .map_err(|err| ManifestError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_MANIFEST_BYTES {
            return Err(ManifestError::Invalid(format!(
                "manifest exceeds {MAX_MANIFEST_BYTES} bytes"
            )));
        }
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|err| ManifestError::Parse(err.to_string()))?;
        Self::from_value(value)
    }

    /// Parses a manifest from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the text is not a JSON object.
    pub fn from_json_str(text: &str) -> Result<Self, ManifestError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| ManifestError::Parse(err.to_string()))?;
        Self::from_value(value)
    }

    /// Wraps an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::NotAnObject`] for non-object values.
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        match value {
            Value::Object(raw) => Ok(Self {
                raw,
            }),
            _ => Err(ManifestError::NotAnObject),
        }
    }

    /// Returns the manifest as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.raw.clone())
    }

    /// Renders the manifest as indented JSON for prompts and artifacts.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| Value::Null.to_string())
    }

    // ========================================================================
    // SECTION: Accessors
    // ========================================================================

    /// Returns `protocolVersion` when it is a string.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.raw.get("protocolVersion").and_then(Value::as_str)
    }

    /// Returns `name` when it is a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.raw.get("name").and_then(Value::as_str)
    }

    /// Returns `server.transport.type` when present.
    #[must_use]
    pub fn transport_type(&self) -> Option<&str> {
        self.raw
            .get("server")
            .and_then(|server| server.get("transport"))
            .and_then(|transport| transport.get("type"))
            .and_then(Value::as_str)
    }

    /// Returns the typed tool list.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when `tools` is missing, empty, or any entry
    /// fails [`Self::check_tools`].
    pub fn tools(&self) -> Result<Vec<ToolEntry>, ManifestError> {
        self.check_tools()?;
        let tools = self.raw.get("tools").cloned().unwrap_or(Value::Null);
        serde_json::from_value(tools).map_err(|err| ManifestError::Invalid(format!("tools: {err}")))
    }

    /// Finds a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UnknownTool`] when no entry has the name.
    pub fn tool(&self, name: &str) -> Result<ToolEntry, ManifestError> {
        self.tools()?
            .into_iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| ManifestError::UnknownTool(name.to_string()))
    }

    /// Returns every missing required top-level field in reporting order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS.into_iter().filter(|field| !self.raw.contains_key(*field)).collect()
    }

    // ========================================================================
    // SECTION: Structural Checks
    // ========================================================================

    /// Verifies all required top-level fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MissingField`] naming the first absent field.
    pub fn check_structure(&self) -> Result<(), ManifestError> {
        match self.missing_fields().first().copied() {
            Some(field) => Err(ManifestError::MissingField(field)),
            None => Ok(()),
        }
    }

    /// Verifies the server declares the expected transport.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when `server`, `server.transport`, or
    /// `server.transport.type` is absent, or the type differs from `expected`.
    pub fn check_server(&self, expected: &str) -> Result<(), ManifestError> {
        let server = self.raw.get("server").ok_or(ManifestError::MissingField("server"))?;
        let transport =
            server.get("transport").ok_or(ManifestError::MissingField("server.transport"))?;
        let found = transport
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingField("server.transport.type"))?;
        if found != expected {
            return Err(ManifestError::TransportMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// Verifies `tools` is a non-empty array of complete tool entries.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] describing the first structural defect.
    pub fn check_tools(&self) -> Result<(), ManifestError> {
        let tools = self.raw.get("tools").ok_or(ManifestError::MissingField("tools"))?;
        let entries = tools
            .as_array()
            .ok_or_else(|| ManifestError::Invalid("tools must be an array".to_string()))?;
        if entries.is_empty() {
            return Err(ManifestError::EmptyTools);
        }
        for (index, entry) in entries.iter().enumerate() {
            let object = entry.as_object().ok_or_else(|| {
                ManifestError::Invalid(format!("tools[{index}] must be an object"))
            })?;
            for field in REQUIRED_TOOL_FIELDS {
                if !object.contains_key(field) {
                    let tool = object
                        .get("name")
                        .and_then(Value::as_str)
                        .map_or_else(|| format!("#{index}"), str::to_string);
                    return Err(ManifestError::ToolMissingField {
                        tool,
                        field,
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Manifest loading and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// I/O failure while reading the manifest.
    #[error("manifest io error: {0}")]
    Io(String),
    /// JSON parsing failure.
    #[error("invalid JSON in manifest: {0}")]
    Parse(String),
    /// Manifest root is not an object.
    #[error("manifest root must be a JSON object")]
    NotAnObject,
    /// Required field is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// Declared transport differs from the expected literal.
    #[error("server.transport.type expected `{expected}`, found `{found}`")]
    TransportMismatch {
        /// Expected transport literal.
        expected: String,
        /// Declared transport literal.
        found: String,
    },
    /// Tool list is empty.
    #[error("no tools found in manifest")]
    EmptyTools,
    /// Tool entry is missing a required field.
    #[error("tool `{tool}` missing required field: {field}")]
    ToolMissingField {
        /// Tool name or positional label.
        tool: String,
        /// Missing field name.
        field: &'static str,
    },
    /// Named tool is not declared.
    #[error("tool `{0}` is not declared in the manifest")]
    UnknownTool(String),
    /// Any other structural defect.
    #[error("invalid manifest: {0}")]
    Invalid(String),
}
