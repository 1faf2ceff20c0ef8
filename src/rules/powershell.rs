use crate::rules::builtins::SAFE_READ_PATH;
use crate::rules::{RuleDefinition, RuleGroup, SHELL_META, ToolField};

pub const NAME: &str = "powershell";

const REMOVE_ITEM_ROOT: &str = r#"\bRemove-Item\b(.*\s-(Recurse|r)\b.*\s-(Force|f)\b|.*\s-(Force|f)\b.*\s-(Recurse|r)\b).*\s["']?([a-z]:\\(windows|system32|program files|users)?|/|\\)["']?(\s|$)"#;
const REMOVE_ITEM_SYSTEM_ROOT: &str =
    r"\bRemove-Item\b.*\s-(Recurse|r)\b.*\$env:(SystemRoot|WinDir)\b";
const DISK_WIPE: &str = r"\b(Format-Volume|Clear-Disk|Initialize-Disk|Reset-PhysicalDisk)\b";
const EXECUTION_POLICY_BYPASS: &str = r"\bSet-ExecutionPolicy\b.*\b(Bypass|Unrestricted)\b";
const INVOKE_EXPRESSION: &str = r"\b(Invoke-Expression|iex)\b";
const REGISTRY_DELETE: &str =
    r"\breg(\.exe)?\s+delete\b.*\b(HKLM|HKEY_LOCAL_MACHINE|HKCU|HKEY_CURRENT_USER)\b";
const STOP_RESTART: &str = r"\b(Stop-Computer|Restart-Computer)\b";
/// A secret file named anywhere on an otherwise safe-looking read.
const SECRET_ARGUMENT: &str = r#"(^|[\s\\/'"])\.env(\.[\w.-]*)?(\s|$)|\.(pem|key)(\s|$)"#;

pub fn group() -> RuleGroup {
    let safe_info = format!(
        r"^\s*(Get-ChildItem|Get-Location|Get-Process|Get-Service|Get-Command|Get-Help|Get-Date|Get-Host|Get-Item|Test-Path|Resolve-Path|Get-PSDrive|Get-PSVersionTable)\b{SHELL_META}$"
    );
    let safe_read = format!(r"^\s*(Get-Content|Select-String)\b{SHELL_META}(?:{SAFE_READ_PATH})");

    RuleGroup::new(
        NAME,
        vec![
            RuleDefinition::deny(
                "remove-item-root",
                "pwsh",
                ToolField::Command,
                REMOVE_ITEM_ROOT,
                "Destructive recursive delete",
            ),
            RuleDefinition::deny(
                "remove-item-system-root",
                "pwsh",
                ToolField::Command,
                REMOVE_ITEM_SYSTEM_ROOT,
                "Destructive recursive delete of the system root",
            ),
            RuleDefinition::deny("disk-wipe", "pwsh", ToolField::Command, DISK_WIPE, "Disk wipe"),
            RuleDefinition::deny(
                "execution-policy-bypass",
                "pwsh",
                ToolField::Command,
                EXECUTION_POLICY_BYPASS,
                "Execution policy bypass",
            ),
            RuleDefinition::deny(
                "invoke-expression",
                "pwsh",
                ToolField::Command,
                INVOKE_EXPRESSION,
                "Dynamic code execution",
            ),
            RuleDefinition::deny(
                "registry-delete",
                "pwsh",
                ToolField::Command,
                REGISTRY_DELETE,
                "Registry hive deletion",
            ),
            RuleDefinition::deny(
                "stop-restart-computer",
                "pwsh",
                ToolField::Command,
                STOP_RESTART,
                "Machine shutdown or restart",
            ),
            RuleDefinition::allow(
                "pwsh-safe-info",
                "pwsh",
                ToolField::Command,
                &safe_info,
                "Read-only informational cmdlet",
            ),
            RuleDefinition::allow(
                "pwsh-safe-read",
                "pwsh",
                ToolField::Command,
                &safe_read,
                "Read of a documentation, source or config file",
            )
            .unless(SECRET_ARGUMENT),
        ],
    )
}
