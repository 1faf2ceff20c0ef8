use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::eval::Decision;
use crate::llm::ProviderKind;
use crate::rules::{self, ToolField};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Environment variable naming an explicit project config file.
pub const CONFIG_ENV_VAR: &str = "BOUNCER_CONFIG";

/// Project config file looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".bouncer.toml";

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub version: u32,
    #[serde(default = "default_action")]
    pub default_action: Decision,
    #[serde(default)]
    pub rule_groups: BTreeMap<String, RuleGroupConfig>,
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleConfig>,
    #[serde(default)]
    pub llm_fallback: LlmFallbackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RuleGroupConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
}

/// A rule supplied by configuration, appended after every built-in group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomRuleConfig {
    pub name: String,
    pub tool_match: String,
    pub pattern: String,
    #[serde(default = "custom_rule_action")]
    pub action: Decision,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CustomRuleConfig {
    pub fn reason(&self) -> String {
        match &self.reason {
            Some(reason) if !reason.trim().is_empty() => reason.clone(),
            _ => format!("Matched custom rule '{}'", self.name),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmFallbackConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub provider_chain: Vec<ProviderConfig>,
}

impl Default for LlmFallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: default_max_tokens(),
            confidence_threshold: default_confidence_threshold(),
            provider_chain: Vec::new(),
        }
    }
}

/// One candidate backend in the provider chain.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Command printing the API key, run when the provider's env var is unset.
    #[serde(default)]
    pub api_key_command: Option<String>,
}

impl ProviderConfig {
    pub fn new(kind: &str, model: &str) -> Self {
        Self {
            kind: kind.to_string(),
            model: model.to_string(),
            endpoint: None,
            timeout_seconds: default_timeout_seconds(),
            api_key_command: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditLevel {
    /// Only Deny decisions are written.
    DenialsOnly,
    All,
}

impl AuditLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditLevel::DenialsOnly => "denials-only",
            AuditLevel::All => "all",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default = "default_audit_level")]
    pub level: AuditLevel,
    #[serde(default)]
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: AuditLevel::DenialsOnly,
            path: String::new(),
        }
    }
}

fn enabled() -> bool {
    true
}

fn default_action() -> Decision {
    Decision::Allow
}

fn custom_rule_action() -> Decision {
    Decision::Deny
}

fn default_max_tokens() -> u32 {
    150
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_timeout_seconds() -> u64 {
    2
}

fn default_audit_level() -> AuditLevel {
    AuditLevel::DenialsOnly
}

// ── Overlay types (user/project config merged over defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    version: Option<u32>,
    default_action: Option<Decision>,
    #[serde(default)]
    rule_groups: BTreeMap<String, RuleGroupOverlay>,
    #[serde(default)]
    replace_custom_rules: bool,
    #[serde(default)]
    custom_rules: Vec<CustomRuleConfig>,
    #[serde(default)]
    llm_fallback: LlmFallbackOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct RuleGroupOverlay {
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct LlmFallbackOverlay {
    enabled: Option<bool>,
    max_tokens: Option<u32>,
    confidence_threshold: Option<f64>,
    provider_chain: Option<Vec<ProviderConfig>>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingOverlay {
    enabled: Option<bool>,
    level: Option<AuditLevel>,
    path: Option<String>,
}

/// One config file layered over the defaults.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub path: PathBuf,
    /// Missing files are an error only for explicitly named layers.
    pub required: bool,
}

impl ConfigLayer {
    pub fn optional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }

    pub fn required(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/bouncer/config.toml (if exists)
    /// 3. Merge `$BOUNCER_CONFIG`, or else `.bouncer.toml` in the working directory
    ///
    /// Scalars override, `rule_groups` merge per group, `custom_rules` extend
    /// (unless `replace_custom_rules = true`) and a `provider_chain` replaces
    /// the previous chain. The result is validated before it is returned.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_layers(&Self::default_layers())
    }

    /// The user and project layers for the current environment.
    pub fn default_layers() -> Vec<ConfigLayer> {
        let mut layers = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            layers.push(ConfigLayer::optional(
                Path::new(&home).join(".config/bouncer/config.toml"),
            ));
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(explicit) if !explicit.is_empty() => layers.push(ConfigLayer::required(explicit)),
            _ => layers.push(ConfigLayer::optional(PROJECT_CONFIG_FILE)),
        }
        layers
    }

    /// Merge the given layers over the defaults, expand paths and validate.
    pub fn load_layers(layers: &[ConfigLayer]) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        for layer in layers {
            if let Some(overlay) = read_overlay(layer)? {
                debug!("applying config overlay {}", layer.path.display());
                config.apply_overlay(overlay);
            }
        }
        config.logging.path = expand_path(&config.logging.path);
        config.validate()?;
        Ok(config)
    }

    /// Whether a built-in group is enabled. Groups absent from the map are on.
    pub fn is_group_enabled(&self, name: &str) -> bool {
        self.rule_groups.get(name).is_none_or(|g| g.enabled)
    }

    /// Check every constraint and report all failures at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.version < 1 {
            errors.push(format!("version must be >= 1, got {}", self.version));
        }

        let known = rules::builtin_group_names();
        for name in self.rule_groups.keys() {
            if !known.contains(&name.as_str()) {
                warn!("unknown rule group '{name}' in configuration; ignored");
            }
        }

        for (i, rule) in self.custom_rules.iter().enumerate() {
            let label = if rule.name.trim().is_empty() {
                format!("custom_rules[{i}]")
            } else {
                format!("custom rule '{}'", rule.name)
            };
            if rule.name.trim().is_empty() {
                errors.push(format!("{label}: name must not be empty"));
            }
            if rule.tool_match.trim().is_empty() {
                errors.push(format!("{label}: tool_match must not be empty"));
            } else if rules::resolve_field(&rule.tool_match) == ToolField::Unknown {
                errors.push(format!(
                    "{label}: tool_match '{}' is not a tool with an inspectable field",
                    rule.tool_match
                ));
            }
            if rule.pattern.trim().is_empty() {
                errors.push(format!("{label}: pattern must not be empty"));
            } else if let Err(e) = RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
                errors.push(format!("{label}: invalid pattern: {e}"));
            }
        }

        let llm = &self.llm_fallback;
        if llm.enabled {
            if llm.max_tokens == 0 {
                errors.push("llm_fallback.max_tokens must be > 0".to_string());
            }
            if !(0.0..=1.0).contains(&llm.confidence_threshold) {
                errors.push(format!(
                    "llm_fallback.confidence_threshold must be within [0, 1], got {}",
                    llm.confidence_threshold
                ));
            }
            if llm.provider_chain.is_empty() {
                errors.push("llm_fallback.provider_chain must not be empty".to_string());
            }
            for (i, provider) in llm.provider_chain.iter().enumerate() {
                if ProviderKind::parse(&provider.kind).is_none() {
                    errors.push(format!(
                        "llm_fallback.provider_chain[{i}]: unknown provider type '{}'",
                        provider.kind
                    ));
                }
                if provider.timeout_seconds == 0 {
                    errors.push(format!(
                        "llm_fallback.provider_chain[{i}]: timeout_seconds must be > 0"
                    ));
                }
            }
        }

        if self.logging.enabled && self.logging.path.trim().is_empty() {
            errors.push("logging.path must not be empty when logging is enabled".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.version {
            self.version = v;
        }
        if let Some(v) = overlay.default_action {
            self.default_action = v;
        }

        for (name, group) in overlay.rule_groups {
            let entry = self
                .rule_groups
                .entry(name)
                .or_insert(RuleGroupConfig { enabled: true });
            if let Some(v) = group.enabled {
                entry.enabled = v;
            }
        }

        if overlay.replace_custom_rules {
            self.custom_rules = overlay.custom_rules;
        } else {
            self.custom_rules.extend(overlay.custom_rules);
        }

        let l = overlay.llm_fallback;
        if let Some(v) = l.enabled {
            self.llm_fallback.enabled = v;
        }
        if let Some(v) = l.max_tokens {
            self.llm_fallback.max_tokens = v;
        }
        if let Some(v) = l.confidence_threshold {
            self.llm_fallback.confidence_threshold = v;
        }
        if let Some(chain) = l.provider_chain {
            self.llm_fallback.provider_chain = chain;
        }

        let g = overlay.logging;
        if let Some(v) = g.enabled {
            self.logging.enabled = v;
        }
        if let Some(v) = g.level {
            self.logging.level = v;
        }
        if let Some(v) = g.path {
            self.logging.path = v;
        }
    }

    /// Apply an overlay from a TOML string.
    pub fn apply_overlay_str(&mut self, toml_str: &str) -> Result<(), toml::de::Error> {
        let overlay: ConfigOverlay = toml::from_str(toml_str)?;
        self.apply_overlay(overlay);
        Ok(())
    }
}

fn read_overlay(layer: &ConfigLayer) -> Result<Option<ConfigOverlay>, ConfigError> {
    let content = match std::fs::read_to_string(&layer.path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !layer.required => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: layer.path.clone(),
                source,
            });
        }
    };
    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: layer.path.clone(),
            source,
        })
}

/// Expand `~` and `$VAR` references. Unresolvable variables leave the
/// path with only `~` expanded.
fn expand_path(path: &str) -> String {
    match shellexpand::full(path) {
        Ok(expanded) => expanded.into_owned(),
        Err(e) => {
            warn!("cannot expand {path:?}: {e}");
            shellexpand::tilde(path).into_owned()
        }
    }
}
