//! bouncer: a pre-tool-use policy gateway for AI coding agents.
//!
//! The invoking agent hands over one proposed action (run a command, write
//! a file, fetch a URL, call a plugin tool) and gets back an allow or deny
//! verdict in its own wire format. Decisions come from three tiers, tried
//! in order: pattern rules, an LLM second opinion, then the configured
//! default action. Every decision can be written to an append-only audit
//! log.
//!
//! # Architecture
//!
//! - **[`adapter`]**: Hook wire formats (Claude Code, Copilot CLI) and the adapter registry.
//! - **[`eval`]**: Canonical tool call model, decision types and the three-tier [`Pipeline`](eval::Pipeline).
//! - **[`rules`]**: Built-in rule groups and the compiled, first-match-wins rule set.
//! - **[`llm`]**: Provider discovery, credential resolution, chat backends and the LLM judge.
//! - **[`audit`]**: JSONL decision trail with a verbosity filter.
//! - **[`config`]**: Embedded defaults, user/project overlays and validation.
//! - **[`error`]**: Error types.

/// Hook wire formats and adapter selection.
pub mod adapter;
/// Append-only decision log.
pub mod audit;
/// Configuration types, loading, overlay merge and validation.
pub mod config;
/// Error types for configuration, LLM calls and credentials.
pub mod error;
/// Tool call model, decisions and the evaluation pipeline.
pub mod eval;
/// LLM fallback tier.
pub mod llm;
/// Rule definitions, built-in groups and the rule engine.
pub mod rules;

use eval::ToolCall;
use rules::{CompiledRuleSet, RuleMatch};

/// Evaluate a tool call against the rules of the default configuration.
///
/// This is the main entry point for tests and simple usage. Hosts that need
/// the LLM tier or user configuration build a [`eval::Pipeline`] directly.
pub fn evaluate_rules(call: &ToolCall) -> Option<RuleMatch> {
    let config = config::Config::default_config();
    CompiledRuleSet::build(&config).evaluate(call)
}
