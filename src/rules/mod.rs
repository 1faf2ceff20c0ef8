//! Rule definitions and the built-in rule groups.
//!
//! Each built-in group lives in its own module and is returned by
//! [`builtin_groups`] in a fixed declaration order. Within a group, deny
//! rules are declared before the narrow "known safe" allow rules so that a
//! dangerous variant of an otherwise safe command is never waved through.

/// Destructive shell commands and safe informational commands.
pub mod bash;
/// Agent built-in tools: file reads/writes, patches, searches.
pub mod builtins;
/// Compiled rule set and first-match-wins evaluation.
pub mod engine;
/// History-rewriting and work-discarding git commands.
pub mod git;
/// PowerShell equivalents of the bash group.
pub mod powershell;
/// Production-facing destructive operations.
pub mod production;
/// Secret material leaving through the shell or written content.
pub mod secrets;
/// Web fetch and search.
pub mod web;

pub use engine::{CompiledRuleSet, RuleMatch};

use crate::eval::Decision;

/// Which string on a tool call a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolField {
    Command,
    Path,
    Content,
    Pattern,
    Query,
    Url,
    Unknown,
}

impl ToolField {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolField::Command => "command",
            ToolField::Path => "path",
            ToolField::Content => "content",
            ToolField::Pattern => "pattern",
            ToolField::Query => "query",
            ToolField::Url => "url",
            ToolField::Unknown => "unknown",
        }
    }
}

/// Fold a tool name onto its canonical spelling.
///
/// Comparison is case-insensitive, and a handful of synonyms collapse onto
/// the name the rule groups are written against.
pub fn canonical_tool_name(tool_name: &str) -> String {
    let lower = tool_name.trim().to_ascii_lowercase();
    let folded = match lower.as_str() {
        "powershell" => "pwsh",
        "rg" => "grep",
        "web_fetch" => "webfetch",
        "web_search" => "websearch",
        "multiedit" | "str_replace_editor" => "edit",
        "create" => "write",
        _ => return lower,
    };
    folded.to_string()
}

/// The field a tool's rules inspect by default; `Unknown` when the tool is
/// not one we know how to read.
pub fn resolve_field(tool_name: &str) -> ToolField {
    match canonical_tool_name(tool_name).as_str() {
        "bash" | "pwsh" | "todo" => ToolField::Command,
        "write" | "edit" | "read" | "apply_patch" => ToolField::Path,
        "glob" | "grep" => ToolField::Pattern,
        "webfetch" => ToolField::Url,
        "websearch" => ToolField::Query,
        _ => ToolField::Unknown,
    }
}

/// A single pattern rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    pub name: String,
    /// Tool the rule applies to, before canonicalization.
    pub tool_name: String,
    pub field: ToolField,
    /// Case-insensitive regular expression tested against the field value.
    pub pattern: String,
    /// When this also matches the field value, the rule does not apply.
    pub unless: Option<String>,
    pub action: Decision,
    pub reason: String,
}

impl RuleDefinition {
    pub fn deny(name: &str, tool_name: &str, field: ToolField, pattern: &str, reason: &str) -> Self {
        Self::new(name, tool_name, field, pattern, Decision::Deny, reason)
    }

    pub fn allow(name: &str, tool_name: &str, field: ToolField, pattern: &str, reason: &str) -> Self {
        Self::new(name, tool_name, field, pattern, Decision::Allow, reason)
    }

    pub fn new(
        name: &str,
        tool_name: &str,
        field: ToolField,
        pattern: &str,
        action: Decision,
        reason: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            tool_name: tool_name.to_string(),
            field,
            pattern: pattern.to_string(),
            unless: None,
            action,
            reason: reason.to_string(),
        }
    }

    pub fn unless(mut self, pattern: &str) -> Self {
        self.unless = Some(pattern.to_string());
        self
    }
}

/// A named, independently toggleable bundle of rules.
#[derive(Debug, Clone)]
pub struct RuleGroup {
    pub name: &'static str,
    pub rules: Vec<RuleDefinition>,
}

impl RuleGroup {
    pub fn new(name: &'static str, rules: Vec<RuleDefinition>) -> Self {
        Self { name, rules }
    }
}

/// Group name used for rules that come from configuration.
pub const CUSTOM_GROUP: &str = "custom";

/// Every built-in group, in evaluation order.
pub fn builtin_groups() -> Vec<RuleGroup> {
    vec![
        bash::group(),
        powershell::group(),
        builtins::group(),
        git::group(),
        secrets::group(),
        production::group(),
        web::group(),
    ]
}

/// Names of the built-in groups, in evaluation order.
pub fn builtin_group_names() -> Vec<&'static str> {
    builtin_groups().iter().map(|g| g.name).collect()
}

/// Characters that turn a "simple" command into something compound. Safe
/// allow rules refuse any of these, including line breaks.
pub(crate) const SHELL_META: &str = r"[^;&|<>$`\r\n]*";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_is_case_insensitive() {
        assert_eq!(canonical_tool_name("Bash"), "bash");
        assert_eq!(canonical_tool_name("PowerShell"), "pwsh");
        assert_eq!(canonical_tool_name("WebFetch"), "webfetch");
        assert_eq!(canonical_tool_name("web_search"), "websearch");
        assert_eq!(canonical_tool_name("rg"), "grep");
        assert_eq!(canonical_tool_name("mcp.database.query"), "mcp.database.query");
    }

    #[test]
    fn field_lookup_defaults_to_unknown() {
        assert_eq!(resolve_field("bash"), ToolField::Command);
        assert_eq!(resolve_field("powershell"), ToolField::Command);
        assert_eq!(resolve_field("Write"), ToolField::Path);
        assert_eq!(resolve_field("apply_patch"), ToolField::Path);
        assert_eq!(resolve_field("rg"), ToolField::Pattern);
        assert_eq!(resolve_field("web_fetch"), ToolField::Url);
        assert_eq!(resolve_field("websearch"), ToolField::Query);
        assert_eq!(resolve_field("todo"), ToolField::Command);
        assert_eq!(resolve_field("report_intent"), ToolField::Unknown);
    }

    #[test]
    fn builtin_group_order_is_fixed() {
        assert_eq!(
            builtin_group_names(),
            vec![
                "bash",
                "powershell",
                "builtins",
                "git",
                "secrets-exposure",
                "production-risk",
                "web"
            ]
        );
    }

    #[test]
    fn builtin_rule_names_are_unique() {
        let mut names: Vec<String> = builtin_groups()
            .into_iter()
            .flat_map(|g| g.rules.into_iter().map(|r| r.name))
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn builtin_rules_resolve_to_known_fields() {
        for group in builtin_groups() {
            for rule in group.rules {
                assert_ne!(resolve_field(&rule.tool_name), ToolField::Unknown, "{}", rule.name);
                assert_ne!(rule.field, ToolField::Unknown, "{}", rule.name);
            }
        }
    }
}
