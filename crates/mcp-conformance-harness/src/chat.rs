// crates/mcp-conformance-harness/src/chat.rs
// ============================================================================
// Module: Chat Client
// Description: Single-shot chat completion calls against the inference backend.
// Purpose: Return model text or a typed failure; never error-as-text.
// Dependencies: reqwest, serde
// ============================================================================

//! ## Overview
//! [`ChatClient::chat`] posts `{model, messages, stream: false}` to
//! `/api/chat` and returns `message.content`. Failures are tagged
//! ([`ChatError`]) so the orchestrator decides whether they are fatal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instruction.
    System,
    /// User turn.
    User,
    /// Model turn.
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

/// Builds the message list: optional system message, then the user prompt.
#[must_use]
pub fn build_messages(prompt: &str, system_prompt: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_prompt.filter(|text| !text.is_empty()) {
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: system.to_string(),
        });
    }
    messages.push(ChatMessage {
        role: ChatRole::User,
        content: prompt.to_string(),
    });
    messages
}

/// `/api/chat` request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    /// Model name.
    model: &'a str,
    /// Conversation.
    messages: &'a [ChatMessage],
    /// Always false; one response object per call.
    stream: bool,
}

/// `/api/chat` response body (fields the harness reads).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// Assistant message.
    message: ChatResponseMessage,
}

/// Assistant message payload.
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    /// Assistant text.
    content: String,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Chat completion client bound to one model.
#[derive(Debug, Clone)]
pub struct ChatClient {
    /// HTTP client with the per-call timeout applied.
    http: reqwest::Client,
    /// Full `/api/chat` URL.
    endpoint: String,
    /// Model name.
    model: String,
}

impl ChatClient {
    /// Creates a client for `base_url` and `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Client`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ChatError::Client(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the chat endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one prompt and returns the assistant's text.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] on transport failure, non-success status, or an
    /// undecodable body.
    pub async fn chat(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, ChatError> {
        let messages = build_messages(prompt, system_prompt);
        let body = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| ChatError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ChatResponse =
            response.json().await.map_err(|err| ChatError::Decode(err.to_string()))?;
        Ok(parsed.message.content)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Chat call failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// HTTP client construction failed.
    #[error("chat client setup failed: {0}")]
    Client(String),
    /// Connection, timeout, or I/O failure.
    #[error("chat transport failed: {0}")]
    Transport(String),
    /// Backend answered with a non-success status.
    #[error("chat returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Response body did not contain `message.content`.
    #[error("chat response undecodable: {0}")]
    Decode(String),
}
