use serde_json::Value;

use crate::adapter::{HookAdapter, read_cwd};
use crate::eval::{EvaluationResult, ToolCall, ToolInput};

/// Input:  `{"tool_name": "Bash", "tool_input": {"command": "..."}, "cwd": "..."}`
/// Output: `{"hookSpecificOutput": {"hookEventName": "PreToolUse", "permissionDecision": ..., "permissionDecisionReason": ...}}`
pub struct ClaudeAdapter;

impl HookAdapter for ClaudeAdapter {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn accepts(&self, raw: &Value) -> bool {
        raw.get("tool_name").is_some()
    }

    fn decode(&self, raw: &Value) -> Option<ToolCall> {
        let tool_name = raw.get("tool_name")?.as_str()?;
        let tool_input = match raw.get("tool_input") {
            Some(Value::Object(map)) => ToolInput::from_map(map.clone()),
            _ => ToolInput::default(),
        };
        Some(ToolCall {
            tool_name: tool_name.to_string(),
            tool_input,
            cwd: read_cwd(raw),
        })
    }

    fn encode(&self, result: &EvaluationResult) -> Vec<u8> {
        let output = serde_json::json!({
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "permissionDecision": result.decision.as_str(),
                "permissionDecisionReason": result.reason,
            }
        });
        output.to_string().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{Decision, Tier};
    use serde_json::json;

    #[test]
    fn decodes_nested_tool_input() {
        let raw = json!({
            "session_id": "abc",
            "tool_name": "Bash",
            "tool_input": {"command": "ls -la", "description": "list"},
            "cwd": "/work"
        });
        let call = ClaudeAdapter.decode(&raw).unwrap();
        assert_eq!(call.tool_name, "Bash");
        assert_eq!(call.tool_input.command.as_deref(), Some("ls -la"));
        assert_eq!(call.tool_input.extensions.get("description"), Some(&json!("list")));
        assert_eq!(call.cwd.as_deref(), Some("/work"));
    }

    #[test]
    fn missing_tool_input_is_empty() {
        let call = ClaudeAdapter.decode(&json!({"tool_name": "Read"})).unwrap();
        assert!(call.tool_input.is_empty());
        assert_eq!(call.cwd, None);
    }

    #[test]
    fn non_string_tool_name_is_rejected() {
        assert!(ClaudeAdapter.decode(&json!({"tool_name": 7})).is_none());
    }

    #[test]
    fn tool_input_round_trips() {
        let tool_input = json!({
            "file_path": "/repo/a.rs",
            "content": "fn main() {}",
            "nested": {"k": [1, 2, 3]},
            "command": 42
        });
        let raw = json!({"tool_name": "Write", "tool_input": tool_input.clone()});
        let call = ClaudeAdapter.decode(&raw).unwrap();
        let back = serde_json::to_value(&call.tool_input).unwrap();
        assert_eq!(back.as_object().unwrap().len(), 4);
        for (key, value) in tool_input.as_object().unwrap() {
            assert_eq!(back.get(key), Some(value), "{key}");
        }
    }

    #[test]
    fn encodes_nested_verdict() {
        let result = EvaluationResult::new(Decision::Deny, Tier::Rules, "Destructive recursive delete");
        let out: Value = serde_json::from_slice(&ClaudeAdapter.encode(&result)).unwrap();
        assert_eq!(
            out,
            json!({
                "hookSpecificOutput": {
                    "hookEventName": "PreToolUse",
                    "permissionDecision": "deny",
                    "permissionDecisionReason": "Destructive recursive delete"
                }
            })
        );
    }
}
