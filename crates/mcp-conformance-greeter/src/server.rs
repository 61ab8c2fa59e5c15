// crates/mcp-conformance-greeter/src/server.rs
// ============================================================================
// Module: Greeter MCP Server
// Description: Newline-delimited JSON-RPC 2.0 server exposing `say_hello`.
// Purpose: Provide a deterministic tool backend for conformance scenarios.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One JSON-RPC message per line on stdin, one response per line on stdout.
//! Requests without an `id` are notifications and never answered. Tool-level
//! failures (unknown tool) are reported in the result with `isError: true`;
//! protocol-level failures use JSON-RPC error codes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::Write;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Server name reported in `serverInfo`.
pub const SERVER_NAME: &str = "mcp-conformance-greeter";
/// Protocol version answered when the client does not propose one.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
/// The single tool this server exposes.
pub const TOOL_NAME: &str = "say_hello";
/// Marker embedded in every greeting.
pub const SUCCESS_MARKER: &str = "TEST_MARKER_SUCCESS";
/// Maximum accepted line length in bytes.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;

// ============================================================================
// SECTION: JSON-RPC Types
// ============================================================================

/// Incoming JSON-RPC message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    #[must_use]
    pub const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Tool arguments.
    #[serde(default)]
    arguments: Map<String, Value>,
}

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Returns the greeting text for `name`.
#[must_use]
pub fn greeting(name: &str) -> String {
    format!("Hello, {name}! {SUCCESS_MARKER}")
}

/// Returns the `tools/list` entry for `say_hello`.
#[must_use]
pub fn tool_definitions() -> Value {
    json!([{
        "name": TOOL_NAME,
        "description": "Calls Greeter.SayHello and returns the greeting message.",
        "inputSchema": {
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"],
            "additionalProperties": false
        },
        "outputSchema": {
            "type": "object",
            "properties": {"message": {"type": "string"}}
        }
    }])
}

/// Builds a tool result with text content mirroring `structured`.
fn tool_result(structured: &Value, is_error: bool) -> Value {
    let mut result = json!({
        "content": [{"type": "text", "text": structured.to_string()}],
        "isError": is_error
    });
    if !is_error && let Some(object) = result.as_object_mut() {
        object.insert("structuredContent".to_string(), structured.clone());
    }
    result
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Handles one request; returns `None` for notifications.
#[must_use]
pub fn handle_request(request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = request.id?;
    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::failure(id, INVALID_REQUEST, "invalid json-rpc version"));
    }
    let params = request.params.unwrap_or(Value::Null);
    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(id, initialize_result(&params)),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({"tools": tool_definitions()})),
        "tools/call" => match call_tool(params) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(message) => JsonRpcResponse::failure(id, INVALID_PARAMS, message),
        },
        other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("method not found: {other}")),
    };
    Some(response)
}

/// Parses and handles one line; malformed input yields a parse error reply.
#[must_use]
pub fn handle_line(line: &str) -> Option<JsonRpcResponse> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            return Some(JsonRpcResponse::failure(
                Value::Null,
                PARSE_ERROR,
                format!("parse error: {err}"),
            ));
        }
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) => handle_request(request),
        Err(err) => {
            Some(JsonRpcResponse::failure(id, INVALID_REQUEST, format!("invalid request: {err}")))
        }
    }
}

/// Echoes the client's protocol version when offered.
fn initialize_result(params: &Value) -> Value {
    let version =
        params.get("protocolVersion").and_then(Value::as_str).unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": {"tools": {}},
        "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")}
    })
}

/// Executes `tools/call`; `Err` carries an invalid-params message.
fn call_tool(params: Value) -> Result<Value, String> {
    let call: ToolCallParams =
        serde_json::from_value(params).map_err(|err| format!("invalid tool params: {err}"))?;
    if call.name != TOOL_NAME {
        return Ok(tool_result(&json!({"error": format!("unknown tool: {}", call.name)}), true));
    }
    let Some(name) = call.arguments.get("name").and_then(Value::as_str) else {
        return Err(format!("{TOOL_NAME} requires a string `name` argument"));
    };
    if let Some(extra) = call.arguments.keys().find(|key| key.as_str() != "name") {
        return Err(format!("{TOOL_NAME} does not accept argument `{extra}`"));
    }
    Ok(tool_result(&json!({"message": greeting(name)}), false))
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Serves newline-delimited JSON-RPC until `reader` reaches EOF.
///
/// # Errors
///
/// Returns [`GreeterError`] on I/O failure, oversized lines, or response
/// serialization failure.
pub fn serve<R: BufRead, W: Write>(mut reader: R, mut writer: W) -> Result<(), GreeterError> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).map_err(|err| GreeterError::Io(err.to_string()))?;
        if read == 0 {
            return Ok(());
        }
        if line.len() > MAX_LINE_BYTES {
            return Err(GreeterError::LineTooLong(MAX_LINE_BYTES));
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(response) = handle_line(trimmed) else {
            continue;
        };
        let payload = serde_json::to_string(&response)
            .map_err(|err| GreeterError::Serialization(err.to_string()))?;
        writeln!(writer, "{payload}").map_err(|err| GreeterError::Io(err.to_string()))?;
        writer.flush().map_err(|err| GreeterError::Io(err.to_string()))?;
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Greeter transport failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GreeterError {
    /// Reading stdin or writing stdout failed.
    #[error("greeter io error: {0}")]
    Io(String),
    /// An input line exceeded the size limit.
    #[error("request line exceeds {0} bytes")]
    LineTooLong(usize),
    /// A response could not be serialized.
    #[error("response serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
