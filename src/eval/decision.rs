use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Serialized lowercase; any casing is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
        }
    }

    /// Parse a configuration or model token, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("allow") {
            Some(Decision::Allow)
        } else if token.eq_ignore_ascii_case("deny") {
            Some(Decision::Deny)
        } else {
            None
        }
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Decision::parse(&token).ok_or_else(|| {
            de::Error::custom(format!("unknown decision {token:?}, expected \"allow\" or \"deny\""))
        })
    }
}

/// The stage of the pipeline that produced a decision.
///
/// Serialized as its number (1, 2, 3) in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    Rules = 1,
    Llm = 2,
    DefaultAction = 3,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Rules => "Tier 1, rules",
            Tier::Llm => "Tier 2, LLM",
            Tier::DefaultAction => "Tier 3, default",
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier as u8
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::Rules),
            2 => Ok(Tier::Llm),
            3 => Ok(Tier::DefaultAction),
            other => Err(format!("unknown tier {other}")),
        }
    }
}

/// Final verdict of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub decision: Decision,
    pub tier: Tier,
    pub reason: String,
}

impl EvaluationResult {
    pub fn new(decision: Decision, tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            decision,
            tier,
            reason: reason.into(),
        }
    }
}
