// system-tests/tests/helpers/inference_stub.rs
// ============================================================================
// Module: Inference Stub
// Description: Ollama-compatible HTTP stub with prompt-routed replies.
// Purpose: Drive comprehension and round-trip scenarios deterministically.
// Dependencies: axum, serde_json, tokio
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use tokio::task::JoinHandle;

/// Reply used for the comprehension prompt.
pub const COMPREHENSION_REPLY: &str = "1. Transport: the server uses STDIO.\n2. Tools: \
     say_hello calls Greeter.SayHello.\n3. say_hello requires a string `name`.\n4. It returns \
     an object with a `message` string.";

/// Reply used for the result-summary prompt.
pub const SUMMARY_REPLY: &str = "The tool greeted MCPUser and returned the success marker.";

/// Scripted replies keyed by which harness prompt arrived.
#[derive(Clone, Debug)]
pub struct StubScript {
    /// Answer to "Please analyze this manifest".
    pub comprehension: String,
    /// Answer to the round-trip tool request.
    pub tool_call: String,
    /// Answer to the follow-up summary; `None` makes that call fail.
    pub summary: Option<String>,
}

impl StubScript {
    /// Replies that satisfy every scenario with the exact matcher.
    pub fn conforming() -> Self {
        Self {
            comprehension: COMPREHENSION_REPLY.to_string(),
            tool_call: tool_call_reply(&json!({"name": "MCPUser"})),
            summary: Some(SUMMARY_REPLY.to_string()),
        }
    }

    /// Conforming replies with a different tool-call payload.
    pub fn with_tool_call(tool_call: impl Into<String>) -> Self {
        Self {
            tool_call: tool_call.into(),
            ..Self::conforming()
        }
    }
}

/// Renders a `say_hello` tool-call envelope with `arguments`.
pub fn tool_call_reply(arguments: &Value) -> String {
    json!({"tool_call": {"name": "say_hello", "arguments": arguments}}).to_string()
}

#[derive(Clone)]
struct StubState {
    script: Arc<StubScript>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Handle for the inference stub server.
pub struct InferenceStubHandle {
    port: u16,
    join: JoinHandle<()>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl InferenceStubHandle {
    /// Returns the bound port.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns captured `/api/chat` bodies.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Returns the user prompt of each captured chat request.
    pub fn user_prompts(&self) -> Vec<String> {
        self.requests().iter().filter_map(|body| user_prompt(body).map(str::to_string)).collect()
    }
}

impl Drop for InferenceStubHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Spawns the stub on an ephemeral loopback port.
pub async fn spawn_inference_stub(script: StubScript) -> Result<InferenceStubHandle, String> {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        script: Arc::new(script),
        requests: Arc::clone(&requests),
    };
    let app = Router::new()
        .route("/api/version", get(handle_version))
        .route("/api/chat", post(handle_chat))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| format!("inference stub bind failed: {err}"))?;
    let port = listener.local_addr().map_err(|err| err.to_string())?.port();
    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(InferenceStubHandle {
        port,
        join,
        requests,
    })
}

async fn handle_version() -> impl IntoResponse {
    Json(json!({"version": "0.0.0-system-test"}))
}

async fn handle_chat(State(state): State<StubState>, Json(body): Json<Value>) -> impl IntoResponse {
    let model = body.get("model").cloned().unwrap_or(Value::Null);
    let prompt = user_prompt(&body).unwrap_or_default().to_string();
    if let Ok(mut entries) = state.requests.lock() {
        entries.push(body);
    }
    let script = &state.script;
    let reply = if prompt.contains("You previously made a tool call") {
        script.summary.clone()
    } else if prompt.contains("Please analyze this manifest") {
        Some(script.comprehension.clone())
    } else if prompt.contains("Please use the available tools") {
        Some(script.tool_call.clone())
    } else {
        None
    };
    match reply {
        Some(content) => (
            StatusCode::OK,
            Json(json!({
                "model": model,
                "message": {"role": "assistant", "content": content},
                "done": true
            })),
        ),
        None => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "no scripted reply"}))),
    }
}

fn user_prompt(body: &Value) -> Option<&str> {
    body.get("messages")?
        .as_array()?
        .iter()
        .rev()
        .find(|message| message.get("role").and_then(Value::as_str) == Some("user"))?
        .get("content")?
        .as_str()
}
