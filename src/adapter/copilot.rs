use log::debug;
use serde_json::{Map, Value};

use crate::adapter::patch::scan_patch_path;
use crate::adapter::{HookAdapter, read_cwd};
use crate::eval::{EvaluationResult, ToolCall, ToolInput};

/// Input:  `{"toolName": "bash", "toolArgs": "{\"command\":\"...\"}", "cwd": "..."}`
/// Output: `{"permissionDecision": ..., "permissionDecisionReason": ...}`
///
/// `toolArgs` is usually a JSON document inside a string. When that string
/// is not a JSON object (apply_patch sends the raw patch body), the target
/// path is recovered from the patch's file header.
pub struct CopilotAdapter;

impl CopilotAdapter {
    fn decode_args(args: Option<&Value>) -> ToolInput {
        match args {
            Some(Value::Object(map)) => ToolInput::from_map(map.clone()),
            Some(Value::String(text)) => match serde_json::from_str::<Map<String, Value>>(text) {
                Ok(map) => ToolInput::from_map(map),
                Err(e) => {
                    debug!("toolArgs is not a JSON object ({e}); scanning for a patch header");
                    scan_patch_path(text)
                        .map(ToolInput::for_path)
                        .unwrap_or_default()
                }
            },
            _ => ToolInput::default(),
        }
    }
}

impl HookAdapter for CopilotAdapter {
    fn name(&self) -> &'static str {
        "copilot"
    }

    fn accepts(&self, raw: &Value) -> bool {
        raw.get("toolName").is_some()
    }

    fn decode(&self, raw: &Value) -> Option<ToolCall> {
        let tool_name = raw.get("toolName")?.as_str()?;
        Some(ToolCall {
            tool_name: tool_name.to_string(),
            tool_input: Self::decode_args(raw.get("toolArgs")),
            cwd: read_cwd(raw),
        })
    }

    fn encode(&self, result: &EvaluationResult) -> Vec<u8> {
        let output = serde_json::json!({
            "permissionDecision": result.decision.as_str(),
            "permissionDecisionReason": result.reason,
        });
        output.to_string().into_bytes()
    }
}
