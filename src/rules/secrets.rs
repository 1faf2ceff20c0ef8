use crate::rules::{RuleDefinition, RuleGroup, ToolField};

pub const NAME: &str = "secrets-exposure";

const SHELL_READ: &str = r#"\b(cat|type|more|less|head|tail|bat|strings)\b.*((^|[\s/\\'"<])\.env(\.[\w.-]*)?|\S\.(pem|key))(\s|$|[;&|<>'"])"#;
const CURL_UPLOAD: &str = r#"\bcurl\b.*\s(--data(-binary|-raw|-urlencode)?|-d|-F|--form|-T|--upload-file)\b.*(\.env(\.[\w.-]*)?|\.pem|\.key)(\s|$|[;&|<>'"])"#;
const PRIVATE_KEY: &str = r"-----BEGIN ([A-Z]+ )?PRIVATE KEY-----";

pub fn group() -> RuleGroup {
    RuleGroup::new(
        NAME,
        vec![
            RuleDefinition::deny(
                "secret-shell-read",
                "bash",
                ToolField::Command,
                SHELL_READ,
                "Secret file access via shell",
            ),
            RuleDefinition::deny(
                "secret-curl-upload",
                "bash",
                ToolField::Command,
                CURL_UPLOAD,
                "Secret content exfiltration",
            ),
            RuleDefinition::deny(
                "private-key-write",
                "write",
                ToolField::Content,
                PRIVATE_KEY,
                "Private key material in written content",
            ),
            RuleDefinition::deny(
                "private-key-edit",
                "edit",
                ToolField::Content,
                PRIVATE_KEY,
                "Private key material in written content",
            ),
        ],
    )
}
