use crate::rules::{RuleDefinition, RuleGroup, SHELL_META, ToolField};

pub const NAME: &str = "git";

const FORCE_PUSH: &str =
    r"\bgit\s+(-C\s+\S+\s+)?push\b.*\s(--force|--force-with-lease|-f)(\s|=|$)";
const RESET_HARD_PROTECTED: &str =
    r"\bgit\s+(-C\s+\S+\s+)?reset\b.*\s--hard\b.*\b(main|master|release)\b";
const CLEAN_FDX: &str = r"\bgit\s+(-C\s+\S+\s+)?clean\b.*\s-(fdx|fxd|dfx|dxf|xfd|xdf)\b";
const CHECKOUT_DISCARD: &str = r"\bgit\s+(-C\s+\S+\s+)?checkout\b.*\s--\s+\.(\s|$)";
const BRANCH_MUTATION: &str = r"\bbranch\b.*\s(-[dmc]|--delete|--move|--copy)\b";

pub fn group() -> RuleGroup {
    let safe_readonly = format!(
        r"^\s*git\s+(status|diff|log|show|branch|rev-parse|describe|blame)\b{SHELL_META}$"
    );

    RuleGroup::new(
        NAME,
        vec![
            RuleDefinition::deny("git-force-push", "bash", ToolField::Command, FORCE_PUSH, "Force push to remote"),
            RuleDefinition::deny(
                "git-reset-hard-protected",
                "bash",
                ToolField::Command,
                RESET_HARD_PROTECTED,
                "Hard reset on protected branch",
            ),
            RuleDefinition::deny("git-clean-fdx", "bash", ToolField::Command, CLEAN_FDX, "Remove untracked files"),
            RuleDefinition::deny(
                "git-checkout-discard",
                "bash",
                ToolField::Command,
                CHECKOUT_DISCARD,
                "Discard working tree changes",
            ),
            RuleDefinition::allow(
                "git-safe-readonly",
                "bash",
                ToolField::Command,
                &safe_readonly,
                "Read-only git command",
            )
            .unless(BRANCH_MUTATION),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn force_push_variants() {
        let re = Regex::new(FORCE_PUSH).unwrap();
        assert!(re.is_match("git push --force"));
        assert!(re.is_match("git -C ../other push -f origin main"));
        assert!(re.is_match("git push --force=true"));
        assert!(!re.is_match("git push --follow-tags"));
        assert!(!re.is_match("git pull --force"));
    }

    #[test]
    fn branch_listing_is_not_mutation() {
        let re = Regex::new(BRANCH_MUTATION).unwrap();
        assert!(re.is_match("git branch -d old"));
        assert!(re.is_match("git branch --move a b"));
        assert!(!re.is_match("git branch --list"));
        assert!(!re.is_match("git branch -vv"));
    }
}
