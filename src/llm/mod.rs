//! Tier 2: an LLM second opinion for calls no rule decided.
//!
//! [`discovery::select_provider`] walks the configured provider chain once
//! at startup and returns the first backend that can be constructed. The
//! [`LlmJudge`] then asks that backend to classify a tool call under a hard
//! time bound. Every failure inside the judge (transport, HTTP status,
//! timeout, malformed or unconfident answer) becomes "no decision".

/// Anthropic Messages API backend.
pub mod anthropic;
/// API key resolution from the environment or a helper command.
pub mod credentials;
/// Provider chain walk and liveness probing.
pub mod discovery;
/// Prompt construction, bounded call and strict response parsing.
pub mod judge;
/// Ollama chat backend.
pub mod ollama;
/// OpenAI-compatible chat completions backend (OpenAI, GitHub Models).
pub mod openai;

pub use credentials::{CredentialResolver, StaticCredentials, SystemCredentials};
pub use discovery::{ProviderKind, ProviderSelection, select_provider};
pub use judge::LlmJudge;

pub use crate::error::LlmError;

use std::time::Duration;

use async_trait::async_trait;

use crate::eval::{Decision, ToolCall};

/// A confident verdict from the model.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmDecision {
    pub decision: Decision,
    pub reason: String,
    /// Self-reported certainty in `[0, 1]`.
    pub confidence: f64,
}

/// Anything that can give a second opinion on a tool call.
#[async_trait]
pub trait Judge: Send + Sync {
    /// `None` means no decision; the caller falls through to the default.
    /// `deadline` further bounds the call below the provider's own timeout.
    async fn evaluate(&self, call: &ToolCall, deadline: Option<Duration>) -> Option<LlmDecision>;
}

/// One chat turn sent to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// A single-turn chat completion endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw completion text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Turn a non-success HTTP response into [`LlmError::Status`].
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_else(|_| "unknown".to_string());
    Err(LlmError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Non-empty string at a JSON pointer.
pub(crate) fn completion_text(payload: &serde_json::Value, pointer: &str) -> Result<String, LlmError> {
    payload
        .pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or(LlmError::EmptyCompletion)
}
