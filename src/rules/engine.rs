use log::{debug, warn};
use regex::{Regex, RegexBuilder};

use crate::config::Config;
use crate::eval::{Decision, ToolCall};
use crate::rules::{self, CUSTOM_GROUP, RuleDefinition, RuleGroup, ToolField};

/// A rule with its patterns compiled and its tool name canonicalized.
#[derive(Debug)]
struct CompiledRule {
    group: String,
    tool_name: String,
    pattern: Regex,
    unless: Option<Regex>,
    definition: RuleDefinition,
}

/// The first rule that matched a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub group: String,
    pub rule: RuleDefinition,
    pub decision: Decision,
    pub reason: String,
}

/// Immutable, ordered rule set built once at startup.
#[derive(Debug, Default)]
pub struct CompiledRuleSet {
    rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    /// Built-in groups in declaration order (minus disabled ones), then
    /// custom rules under the `custom` group.
    pub fn build(config: &Config) -> Self {
        let mut set = Self::default();
        for group in rules::builtin_groups() {
            if config.is_group_enabled(group.name) {
                set.push_group(&group);
            } else {
                debug!("rule group '{}' disabled", group.name);
            }
        }
        for custom in &config.custom_rules {
            let field = rules::resolve_field(&custom.tool_match);
            let definition = RuleDefinition::new(
                &custom.name,
                &custom.tool_match,
                field,
                &custom.pattern,
                custom.action,
                &custom.reason(),
            );
            set.push(CUSTOM_GROUP, definition);
        }
        set
    }

    /// Compile explicit groups, in the order given.
    pub fn from_groups(groups: &[RuleGroup]) -> Self {
        let mut set = Self::default();
        for group in groups {
            set.push_group(group);
        }
        set
    }

    fn push_group(&mut self, group: &RuleGroup) {
        for rule in &group.rules {
            self.push(group.name, rule.clone());
        }
    }

    /// Compile and append one rule. Rules on an unknown field or with a
    /// pattern that does not compile are left out.
    fn push(&mut self, group: &str, definition: RuleDefinition) {
        if definition.field == ToolField::Unknown {
            warn!(
                "rule '{}' ({group}): tool '{}' has no inspectable field; skipped",
                definition.name, definition.tool_name
            );
            return;
        }
        let pattern = match compile(&definition.pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!("rule '{}' ({group}): invalid pattern: {e}; skipped", definition.name);
                return;
            }
        };
        let unless = match definition.unless.as_deref().map(compile).transpose() {
            Ok(re) => re,
            Err(e) => {
                warn!("rule '{}' ({group}): invalid exclusion: {e}; skipped", definition.name);
                return;
            }
        };
        self.rules.push(CompiledRule {
            group: group.to_string(),
            tool_name: rules::canonical_tool_name(&definition.tool_name),
            pattern,
            unless,
            definition,
        });
    }

    /// First matching rule in declaration order, or `None`.
    pub fn evaluate(&self, call: &ToolCall) -> Option<RuleMatch> {
        let tool_name = rules::canonical_tool_name(&call.tool_name);
        for rule in &self.rules {
            if rule.tool_name != tool_name {
                continue;
            }
            let Some(value) = call.field_value(rule.definition.field) else {
                continue;
            };
            if value.trim().is_empty() || !rule.pattern.is_match(value) {
                continue;
            }
            if rule.unless.as_ref().is_some_and(|re| re.is_match(value)) {
                continue;
            }
            return Some(RuleMatch {
                group: rule.group.clone(),
                rule: rule.definition.clone(),
                decision: rule.definition.action,
                reason: rule.definition.reason.clone(),
            });
        }
        None
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of compiled rules per group, in evaluation order.
    pub fn group_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for rule in &self.rules {
            match counts.last_mut() {
                Some((name, n)) if *name == rule.group => *n += 1,
                _ => counts.push((rule.group.as_str(), 1)),
            }
        }
        counts
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{ToolCall, ToolInput};

    fn default_set() -> CompiledRuleSet {
        CompiledRuleSet::build(&Config::default_config())
    }

    #[test]
    fn every_builtin_pattern_compiles() {
        let expected: usize = rules::builtin_groups().iter().map(|g| g.rules.len()).sum();
        assert_eq!(default_set().len(), expected);
    }

    #[test]
    fn groups_keep_declaration_order() {
        let set = default_set();
        let names: Vec<&str> = set.group_counts().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, rules::builtin_group_names());
    }

    #[test]
    fn disabled_group_is_skipped() {
        let mut config = Config::default_config();
        config
            .apply_overlay_str("[rule_groups.bash]\nenabled = false\n")
            .unwrap();
        let set = CompiledRuleSet::build(&config);
        assert!(set.evaluate(&ToolCall::bash("rm -rf /")).is_none());
    }

    #[test]
    fn custom_rules_follow_builtins() {
        let mut config = Config::default_config();
        config
            .apply_overlay_str(
                r#"
                [[custom_rules]]
                name = "block-publish"
                tool_match = "Bash"
                pattern = "npm publish"
                reason = "Publishing blocked"
            "#,
            )
            .unwrap();
        let set = CompiledRuleSet::build(&config);
        assert_eq!(set.group_counts().last(), Some(&(CUSTOM_GROUP, 1)));
        let m = set.evaluate(&ToolCall::bash("npm publish")).unwrap();
        assert_eq!(m.group, CUSTOM_GROUP);
        assert_eq!(m.decision, Decision::Deny);
        assert_eq!(m.reason, "Publishing blocked");
    }

    #[test]
    fn unresolvable_custom_rule_is_excluded() {
        let mut config = Config::default_config();
        config
            .apply_overlay_str(
                r#"
                [[custom_rules]]
                name = "intent"
                tool_match = "report_intent"
                pattern = "."
                [[custom_rules]]
                name = "broken"
                tool_match = "bash"
                pattern = "("
            "#,
            )
            .unwrap();
        let set = CompiledRuleSet::build(&config);
        assert_eq!(set.len(), default_set().len());
    }

    #[test]
    fn first_match_wins() {
        let groups = vec![RuleGroup::new(
            "test",
            vec![
                RuleDefinition::deny("first", "bash", ToolField::Command, "deploy", "first reason"),
                RuleDefinition::allow("second", "bash", ToolField::Command, "deploy now", "second"),
            ],
        )];
        let set = CompiledRuleSet::from_groups(&groups);
        let m = set.evaluate(&ToolCall::bash("deploy now")).unwrap();
        assert_eq!(m.rule.name, "first");
        assert_eq!(m.group, "test");
    }

    #[test]
    fn matching_is_case_insensitive_on_tool_and_value() {
        let set = default_set();
        let call = ToolCall::new("BASH", ToolInput::for_command("RM -RF /"));
        assert_eq!(set.evaluate(&call).unwrap().rule.name, "rm-rf-root");
    }

    #[test]
    fn synonym_tool_names_fold() {
        let set = default_set();
        let call = ToolCall::new("PowerShell", ToolInput::for_command("Format-Volume -DriveLetter D"));
        assert_eq!(set.evaluate(&call).unwrap().group, "powershell");
    }

    #[test]
    fn empty_or_missing_value_is_skipped() {
        let groups = vec![RuleGroup::new(
            "test",
            vec![RuleDefinition::deny("anything", "bash", ToolField::Command, ".*", "any")],
        )];
        let set = CompiledRuleSet::from_groups(&groups);
        assert!(set.evaluate(&ToolCall::bash("   ")).is_none());
        assert!(set.evaluate(&ToolCall::new("bash", ToolInput::default())).is_none());
    }

    #[test]
    fn unless_pattern_excludes_match() {
        let set = default_set();
        assert!(set.evaluate(&ToolCall::bash("kubectl apply -f app.yaml --dry-run=client")).is_none());
        let m = set.evaluate(&ToolCall::bash("kubectl apply -f app.yaml # --dry-run")).unwrap();
        assert_eq!(m.rule.name, "kubectl-apply-no-dry-run");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let set = default_set();
        let call = ToolCall::bash("git push --force origin main");
        let first = set.evaluate(&call);
        assert!(set.evaluate(&ToolCall::bash("ls")).is_some());
        assert_eq!(set.evaluate(&call), first);
    }

    #[test]
    fn adversarial_input_completes() {
        let set = default_set();
        let long = format!("rm {} x", "-".repeat(100_000));
        let started = std::time::Instant::now();
        let _ = set.evaluate(&ToolCall::bash(&long));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
