//! Hook wire formats.
//!
//! Each invoking agent speaks its own JSON dialect. A [`HookAdapter`]
//! recognizes one dialect, decodes it into a [`ToolCall`] and encodes an
//! [`EvaluationResult`] back into the bytes that agent expects.

/// Claude Code: snake_case keys, nested `hookSpecificOutput` verdict.
pub mod claude;
/// GitHub Copilot CLI: camelCase keys, `toolArgs` as a JSON string, flat verdict.
pub mod copilot;
/// Path recovery from apply_patch bodies.
pub mod patch;

pub use claude::ClaudeAdapter;
pub use copilot::CopilotAdapter;

use serde_json::Value;

use crate::eval::{Decision, EvaluationResult, ToolCall};

pub const EXIT_ALLOW: i32 = 0;
pub const EXIT_DENY: i32 = 2;

/// One agent's hook protocol.
pub trait HookAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this adapter understands the payload.
    fn accepts(&self, raw: &Value) -> bool;

    /// Build a tool call, or `None` when the payload lacks a tool name.
    fn decode(&self, raw: &Value) -> Option<ToolCall>;

    /// Verdict bytes written to standard output.
    fn encode(&self, result: &EvaluationResult) -> Vec<u8>;

    fn exit_code(&self, result: &EvaluationResult) -> i32 {
        match result.decision {
            Decision::Allow => EXIT_ALLOW,
            Decision::Deny => EXIT_DENY,
        }
    }
}

/// Ordered adapters; the first one is the fallback when none accepts a payload.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn HookAdapter>>,
}

impl AdapterRegistry {
    /// Claude first, then Copilot.
    pub fn standard() -> Self {
        Self {
            adapters: vec![Box::new(ClaudeAdapter), Box::new(CopilotAdapter)],
        }
    }

    /// Returns `None` for an empty list, since there would be no default.
    pub fn new(adapters: Vec<Box<dyn HookAdapter>>) -> Option<Self> {
        if adapters.is_empty() {
            None
        } else {
            Some(Self { adapters })
        }
    }

    /// First adapter that accepts the payload.
    pub fn select(&self, raw: &Value) -> Option<&dyn HookAdapter> {
        self.adapters
            .iter()
            .find(|a| a.accepts(raw))
            .map(|a| a.as_ref())
    }

    /// Like [`select`](Self::select), falling back to the default adapter.
    pub fn select_or_default(&self, raw: &Value) -> &dyn HookAdapter {
        self.select(raw).unwrap_or_else(|| self.default_adapter())
    }

    pub fn default_adapter(&self) -> &dyn HookAdapter {
        self.adapters[0].as_ref()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Shared by both dialects: a string `cwd` at the top level.
pub(crate) fn read_cwd(raw: &Value) -> Option<String> {
    raw.get("cwd").and_then(Value::as_str).map(str::to_string)
}
