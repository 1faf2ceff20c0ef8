use crate::rules::{RuleDefinition, RuleGroup, ToolField};

pub const NAME: &str = "production-risk";

const CURL_DELETE_PROD: &str = r"\bcurl\b.*\s-X\s*DELETE\b.*\bprod(uction)?\b";
const DB_DROP_TRUNCATE: &str = r"\b(drop\s+database|drop\s+table|truncate\s+table)\b";
const KUBECTL_DELETE_PROD: &str =
    r"\bkubectl\b.*\sdelete\b.*\s(--namespace|-n)(\s+|=)?(prod|production)\b";
const KUBECTL_APPLY: &str = r"\bkubectl\b.*\sapply\b";
/// A dry run only counts when it appears before any comment marker.
const DRY_RUN: &str = r"^[^#]*--dry-run";

pub fn group() -> RuleGroup {
    RuleGroup::new(
        NAME,
        vec![
            RuleDefinition::deny(
                "curl-delete-prod",
                "bash",
                ToolField::Command,
                CURL_DELETE_PROD,
                "Production DELETE request",
            ),
            RuleDefinition::deny(
                "db-drop-truncate",
                "bash",
                ToolField::Command,
                DB_DROP_TRUNCATE,
                "Destructive database command",
            ),
            RuleDefinition::deny(
                "kubectl-delete-prod",
                "bash",
                ToolField::Command,
                KUBECTL_DELETE_PROD,
                "Kubernetes delete in production namespace",
            ),
            RuleDefinition::deny(
                "kubectl-apply-no-dry-run",
                "bash",
                ToolField::Command,
                KUBECTL_APPLY,
                "Kubernetes apply without dry-run",
            )
            .unless(DRY_RUN),
        ],
    )
}
