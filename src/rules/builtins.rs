use crate::rules::{RuleDefinition, RuleGroup, ToolField};

pub const NAME: &str = "builtins";

/// Project and user configuration of the gateway itself.
pub(crate) const CONFIG_PATH: &str =
    r"(^|[\\/])\.bouncer(\.toml|\.json|[\\/][^\\/]+)$|[\\/]\.config[\\/]bouncer[\\/]";

/// Dotenv files, PEM bundles and private keys.
pub(crate) const SECRET_PATH: &str = r"(^|[\\/])\.env(\.[\w.-]*)?$|\.(pem|key)$";

pub(crate) const SAFE_READ_PATH: &str = r"\.(md|txt|rs|toml|cs|csproj|sln|props|targets|json|ya?ml|xml|ini|cfg|editorconfig|gitignore|lock)$|(^|[\\/])(readme|license|changelog)(\.[a-z0-9]+)?$";

const NON_EMPTY: &str = r"\S";

pub fn group() -> RuleGroup {
    let mut rules = Vec::new();

    for tool in ["write", "edit", "apply_patch"] {
        rules.push(RuleDefinition::deny(
            &format!("config-{}", tool.replace('_', "-")),
            tool,
            ToolField::Path,
            CONFIG_PATH,
            "Gateway configuration is protected",
        ));
    }

    for tool in ["write", "edit", "apply_patch"] {
        rules.push(RuleDefinition::deny(
            &format!("secret-file-{}", tool.replace('_', "-")),
            tool,
            ToolField::Path,
            SECRET_PATH,
            "Secret file modification",
        ));
    }

    rules.push(RuleDefinition::deny(
        "secret-file-read",
        "read",
        ToolField::Path,
        SECRET_PATH,
        "Secret file access",
    ));
    rules.push(RuleDefinition::allow(
        "safe-read",
        "read",
        ToolField::Path,
        SAFE_READ_PATH,
        "Read of a documentation, source or config file",
    ));
    rules.push(RuleDefinition::allow(
        "safe-glob",
        "glob",
        ToolField::Pattern,
        NON_EMPTY,
        "Read-only file search",
    ));
    rules.push(RuleDefinition::allow(
        "safe-grep",
        "grep",
        ToolField::Pattern,
        NON_EMPTY,
        "Read-only content search",
    ));
    rules.push(RuleDefinition::allow(
        "todo-update",
        "todo",
        ToolField::Command,
        NON_EMPTY,
        "Task list update",
    ));

    RuleGroup::new(NAME, rules)
}
