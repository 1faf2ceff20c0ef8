use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::config::{LlmFallbackConfig, ProviderConfig};
use crate::eval::{Decision, ToolCall};
use crate::llm::{ChatBackend, ChatRequest, Judge, LlmDecision, LlmError, ProviderSelection};
use crate::rules::canonical_tool_name;

pub const SYSTEM_PROMPT: &str = "You are a safety classifier. Decide if a tool invocation should be allowed or denied. \
Respond ONLY with JSON: {\"decision\":\"allow|deny\",\"reason\":\"...\",\"confidence\":0.0-1.0}. \
Decision must be lowercase.";

/// Substituted when the model gives no reason.
pub const DEFAULT_REASON: &str = "LLM decision";

/// Expected shape of the model's answer.
#[derive(Debug, Deserialize)]
struct Verdict {
    decision: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Asks one chat backend to classify a tool call.
pub struct LlmJudge {
    backend: Box<dyn ChatBackend>,
    timeout: Duration,
    max_tokens: u32,
    confidence_threshold: f64,
}

impl LlmJudge {
    pub fn new(backend: Box<dyn ChatBackend>, provider: &ProviderConfig, fallback: &LlmFallbackConfig) -> Self {
        Self {
            backend,
            timeout: provider.timeout(),
            max_tokens: fallback.max_tokens,
            confidence_threshold: fallback.confidence_threshold,
        }
    }

    pub fn from_selection(selection: ProviderSelection, fallback: &LlmFallbackConfig) -> Self {
        Self::new(selection.backend, &selection.provider, fallback)
    }

    fn request(&self, call: &ToolCall) -> ChatRequest {
        ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt(call),
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn evaluate(&self, call: &ToolCall, deadline: Option<Duration>) -> Option<LlmDecision> {
        let limit = deadline.map_or(self.timeout, |d| d.min(self.timeout));
        let request = self.request(call);
        let raw = match tokio::time::timeout(limit, self.backend.complete(&request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                debug!("{} call failed: {e}", self.backend.name());
                return None;
            }
            Err(_) => {
                debug!("{} call failed: {}", self.backend.name(), LlmError::Timeout(limit));
                return None;
            }
        };
        let parsed = parse_verdict(&raw, self.confidence_threshold);
        if parsed.is_none() {
            debug!("{} answer rejected: {raw:?}", self.backend.name());
        }
        parsed
    }
}

/// `tool_name: <canonical name>` and `tool_input: <json>` on two lines.
pub fn user_prompt(call: &ToolCall) -> String {
    format!(
        "tool_name: {}\ntool_input: {}",
        canonical_tool_name(&call.tool_name),
        call.tool_input.to_json()
    )
}

/// Strictly parse a model answer. Anything but a well-formed, known
/// decision with confidence in `[threshold, 1]` is `None`.
pub fn parse_verdict(raw: &str, threshold: f64) -> Option<LlmDecision> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let verdict: Verdict = serde_json::from_str(raw).ok()?;
    let decision = Decision::parse(verdict.decision.as_deref()?.trim())?;
    let confidence = verdict.confidence.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&confidence) || confidence < threshold {
        return None;
    }
    let reason = match verdict.reason {
        Some(reason) if !reason.trim().is_empty() => reason,
        _ => DEFAULT_REASON.to_string(),
    };
    Some(LlmDecision {
        decision,
        reason,
        confidence,
    })
}
