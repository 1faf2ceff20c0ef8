use crate::rules::{RuleDefinition, RuleGroup, SHELL_META, ToolField};

pub const NAME: &str = "bash";

/// Any absolute, home-relative or wildcard target; `./build` and `dist` are not covered.
const RM_RF_ROOT: &str = r"\brm\s+(-[a-z]*r[a-z]*f[a-z]*|-[a-z]*f[a-z]*r[a-z]*|--recursive\s+--force|--force\s+--recursive)\s+(--no-preserve-root\s+)?(/|~|\*|\$HOME\b|\$\{HOME\})";
const MKFS: &str = r"\bmkfs(\.\w+)?\b";
const DD_IF: &str = r"\bdd\s+if=";
const CHMOD_777: &str = r"\bchmod\s+(-R\s+)?0?777\b";
const TRUNCATE_SYSTEM_FILE: &str =
    r":\s*>\s*/etc/(passwd|shadow)\b|\btruncate\b.*\s/etc/(passwd|shadow)\b";
const PIPE_TO_SHELL: &str = r"\b(curl|wget)\b[^|\r\n]*\|\s*(sudo\s+)?(ba|z|da)?sh\b";
const FORK_BOMB: &str = r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:";

pub fn group() -> RuleGroup {
    let safe_info = format!(r"^\s*(ls|pwd|whoami|uname|date|id|which|hostname)\b{SHELL_META}$");

    RuleGroup::new(
        NAME,
        vec![
            RuleDefinition::deny("rm-rf-root", "bash", ToolField::Command, RM_RF_ROOT, "Destructive recursive delete"),
            RuleDefinition::deny("mkfs", "bash", ToolField::Command, MKFS, "Filesystem format"),
            RuleDefinition::deny("dd-if", "bash", ToolField::Command, DD_IF, "Disk overwrite"),
            RuleDefinition::deny("chmod-777", "bash", ToolField::Command, CHMOD_777, "Permission blowout"),
            RuleDefinition::deny(
                "truncate-system-file",
                "bash",
                ToolField::Command,
                TRUNCATE_SYSTEM_FILE,
                "System file truncation",
            ),
            RuleDefinition::deny(
                "pipe-to-shell",
                "bash",
                ToolField::Command,
                PIPE_TO_SHELL,
                "Remote script piped into a shell",
            ),
            RuleDefinition::deny("fork-bomb", "bash", ToolField::Command, FORK_BOMB, "Fork bomb"),
            RuleDefinition::allow(
                "safe-info",
                "bash",
                ToolField::Command,
                &safe_info,
                "Read-only informational command",
            ),
        ],
    )
}
