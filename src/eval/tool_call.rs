//! Canonical, adapter-independent description of a proposed agent action.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rules::ToolField;

const KEY_COMMAND: &str = "command";
const KEY_PATH: &str = "path";
const KEY_CONTENT: &str = "content";
const KEY_PATTERN: &str = "pattern";
const KEY_QUERY: &str = "query";
const KEY_URL: &str = "url";
const KEY_ARGUMENTS: &str = "arguments";

/// Extension key some agents use instead of `path`.
const KEY_FILE_PATH: &str = "file_path";

/// Tool-specific input of a proposed action.
///
/// Recognized keys are lifted into named fields; everything else (including
/// a recognized key whose value has the wrong JSON type) stays in
/// `extensions`, so that re-encoding never drops a key. A decoded input
/// re-encodes in the key order it arrived with.
#[derive(Debug, Clone, Default)]
pub struct ToolInput {
    pub command: Option<String>,
    pub path: Option<String>,
    pub content: Option<String>,
    pub pattern: Option<String>,
    pub query: Option<String>,
    pub url: Option<String>,
    /// Plugin-style tool arguments.
    pub arguments: Option<Map<String, Value>>,
    /// Unrecognized keys, preserved verbatim.
    pub extensions: Map<String, Value>,
    key_order: Vec<String>,
}

/// Key order is presentation only and does not take part in equality.
impl PartialEq for ToolInput {
    fn eq(&self, other: &Self) -> bool {
        self.command == other.command
            && self.path == other.path
            && self.content == other.content
            && self.pattern == other.pattern
            && self.query == other.query
            && self.url == other.url
            && self.arguments == other.arguments
            && self.extensions == other.extensions
    }
}

impl ToolInput {
    pub fn for_command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            ..Self::default()
        }
    }

    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn for_path_and_content(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn for_path_and_pattern(path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn for_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn for_arguments(arguments: Map<String, Value>) -> Self {
        Self {
            arguments: Some(arguments),
            ..Self::default()
        }
    }

    /// Split a JSON object into named fields and extensions.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut input = ToolInput {
            key_order: map.keys().cloned().collect(),
            ..ToolInput::default()
        };
        for (key, value) in map {
            let slot = match key.as_str() {
                KEY_COMMAND => &mut input.command,
                KEY_PATH => &mut input.path,
                KEY_CONTENT => &mut input.content,
                KEY_PATTERN => &mut input.pattern,
                KEY_QUERY => &mut input.query,
                KEY_URL => &mut input.url,
                KEY_ARGUMENTS => {
                    match value {
                        Value::Object(args) => input.arguments = Some(args),
                        other => {
                            input.extensions.insert(key, other);
                        }
                    }
                    continue;
                }
                _ => {
                    input.extensions.insert(key, value);
                    continue;
                }
            };
            match value {
                Value::String(s) => *slot = Some(s),
                other => {
                    input.extensions.insert(key, other);
                }
            }
        }
        input
    }

    /// Merge named fields and extensions back into one JSON object.
    ///
    /// Named fields win over an extension with the same key. Keys seen at
    /// decode time keep their original position; keys set afterwards follow,
    /// named fields first.
    pub fn to_map(&self) -> Map<String, Value> {
        let merged = self.merged_map();
        if self.key_order.is_empty() {
            return merged;
        }
        let mut ordered = Map::new();
        for key in &self.key_order {
            if let Some(value) = merged.get(key) {
                ordered.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in merged {
            if !ordered.contains_key(&key) {
                ordered.insert(key, value);
            }
        }
        ordered
    }

    fn merged_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in self.named_fields() {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
        if let Some(args) = &self.arguments {
            map.insert(KEY_ARGUMENTS.to_string(), Value::Object(args.clone()));
        }
        for (key, value) in &self.extensions {
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        map
    }

    /// Compact JSON rendering, as handed to the LLM judge and the audit log.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.named_fields().next().is_none() && self.arguments.is_none() && self.extensions.is_empty()
    }

    fn named_fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (KEY_COMMAND, &self.command),
            (KEY_PATH, &self.path),
            (KEY_CONTENT, &self.content),
            (KEY_PATTERN, &self.pattern),
            (KEY_QUERY, &self.query),
            (KEY_URL, &self.url),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    }
}

impl Serialize for ToolInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map = self.to_map();
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in &map {
            out.serialize_entry(key, value)?;
        }
        out.end()
    }
}

impl<'de> Deserialize<'de> for ToolInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::deserialize(deserializer)?;
        Ok(Self::from_map(map))
    }
}

/// One proposed action, constructed per invocation and discarded after evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCall {
    /// Tool name exactly as the agent sent it.
    pub tool_name: String,
    pub tool_input: ToolInput,
    /// Working directory of the agent session, if reported.
    pub cwd: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, tool_input: ToolInput) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_input,
            cwd: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn bash(command: &str) -> Self {
        Self::new("bash", ToolInput::for_command(command))
    }

    pub fn write(path: &str, content: &str) -> Self {
        Self::new("write", ToolInput::for_path_and_content(path, content))
    }

    pub fn edit(path: &str, content: &str) -> Self {
        Self::new("edit", ToolInput::for_path_and_content(path, content))
    }

    pub fn read(path: &str) -> Self {
        Self::new("read", ToolInput::for_path(path))
    }

    pub fn web_fetch(url: &str) -> Self {
        Self::new("webfetch", ToolInput::for_url(url))
    }

    pub fn web_search(query: &str) -> Self {
        Self::new("websearch", ToolInput::for_query(query))
    }

    /// The string a rule's field selector inspects, if present.
    pub fn field_value(&self, field: ToolField) -> Option<&str> {
        let input = &self.tool_input;
        match field {
            ToolField::Command => input.command.as_deref(),
            ToolField::Path => input
                .path
                .as_deref()
                .or_else(|| input.extensions.get(KEY_FILE_PATH).and_then(Value::as_str)),
            ToolField::Content => input.content.as_deref(),
            ToolField::Pattern => input.pattern.as_deref(),
            ToolField::Query => input.query.as_deref(),
            ToolField::Url => input.url.as_deref(),
            ToolField::Unknown => None,
        }
    }
}
