/// Decision, tier and evaluation result types.
pub mod decision;
/// Canonical tool call model.
pub mod tool_call;

pub use decision::{Decision, EvaluationResult, Tier};
pub use tool_call::{ToolCall, ToolInput};

use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::adapter::{AdapterRegistry, HookAdapter};
use crate::audit::AuditLog;
use crate::config::Config;
use crate::llm::{CredentialResolver, Judge, LlmJudge, select_provider};
use crate::rules::CompiledRuleSet;

/// Encoded verdict plus the exit status that goes with it.
#[derive(Debug, Clone, PartialEq)]
pub struct HookResponse {
    pub body: Vec<u8>,
    pub exit_code: i32,
    pub result: EvaluationResult,
}

/// Rules, then the LLM judge, then the configured default.
///
/// Built once and shared; every evaluation writes exactly one audit entry
/// (subject to the log's verbosity) after its decision is final.
pub struct Pipeline {
    rules: CompiledRuleSet,
    judge: Option<Box<dyn Judge>>,
    llm_enabled: bool,
    adapters: AdapterRegistry,
    audit: AuditLog,
    default_action: Decision,
}

impl Pipeline {
    /// A pipeline with no LLM tier and no audit trail.
    pub fn new(rules: CompiledRuleSet, default_action: Decision) -> Self {
        Self {
            rules,
            judge: None,
            llm_enabled: false,
            adapters: AdapterRegistry::standard(),
            audit: AuditLog::disabled(),
            default_action,
        }
    }

    /// Enable tier 2 with the given judge.
    pub fn with_judge(mut self, judge: Box<dyn Judge>) -> Self {
        self.judge = Some(judge);
        self.llm_enabled = true;
        self
    }

    /// Turn tier 2 on or off. Enabled without a judge means no provider
    /// could be selected.
    pub fn with_llm_enabled(mut self, enabled: bool) -> Self {
        self.llm_enabled = enabled;
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Compile rules, pick an LLM provider and open the audit log.
    pub async fn from_config(config: &Config, credentials: &dyn CredentialResolver) -> Self {
        let fallback = &config.llm_fallback;
        let mut pipeline = Self::new(CompiledRuleSet::build(config), config.default_action)
            .with_audit(AuditLog::from_config(&config.logging))
            .with_llm_enabled(fallback.enabled);
        if fallback.enabled
            && let Some(selection) = select_provider(fallback, credentials).await
        {
            pipeline = pipeline.with_judge(Box::new(LlmJudge::from_selection(selection, fallback)));
        }
        pipeline
    }

    pub fn rules(&self) -> &CompiledRuleSet {
        &self.rules
    }

    pub fn default_action(&self) -> Decision {
        self.default_action
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm_enabled
    }

    pub fn has_judge(&self) -> bool {
        self.judge.is_some()
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub async fn evaluate(&self, call: &ToolCall) -> EvaluationResult {
        self.evaluate_within(call, None, &CancellationToken::new()).await
    }

    /// Cancelling drops any pending LLM request; the default tier still runs
    /// and the audit entry is still written.
    pub async fn evaluate_with_cancel(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> EvaluationResult {
        self.evaluate_within(call, None, cancel).await
    }

    /// Like [`evaluate_with_cancel`](Self::evaluate_with_cancel), with the
    /// LLM call further bounded by `deadline`.
    pub async fn evaluate_within(
        &self,
        call: &ToolCall,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> EvaluationResult {
        let result = self.decide(call, deadline, cancel).await;
        self.audit.record(call, &result);
        result
    }

    async fn decide(
        &self,
        call: &ToolCall,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> EvaluationResult {
        if let Some(m) = self.rules.evaluate(call) {
            debug!("rule '{}' ({}) matched", m.rule.name, m.group);
            return EvaluationResult::new(m.decision, Tier::Rules, m.reason);
        }

        let why = match (&self.judge, self.llm_enabled) {
            (_, false) => "No rules matched",
            (None, true) => "No rules matched; no LLM provider available",
            (Some(judge), true) => {
                let verdict = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("evaluation cancelled during LLM call");
                        None
                    }
                    verdict = judge.evaluate(call, deadline) => verdict,
                };
                if let Some(v) = verdict {
                    return EvaluationResult::new(v.decision, Tier::Llm, v.reason);
                }
                "No rules matched; LLM returned no decision"
            }
        };
        self.default_result(why)
    }

    fn default_result(&self, why: &str) -> EvaluationResult {
        EvaluationResult::new(
            self.default_action,
            Tier::DefaultAction,
            format!("{why}; defaultAction: {}", self.default_action.as_str()),
        )
    }

    /// Decode raw hook bytes, evaluate, and encode the verdict.
    pub async fn run(&self, raw: &[u8]) -> HookResponse {
        self.run_with_cancel(raw, &CancellationToken::new()).await
    }

    pub async fn run_with_cancel(&self, raw: &[u8], cancel: &CancellationToken) -> HookResponse {
        let value: Value = match serde_json::from_slice(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("invalid hook input: {e}");
                let why = format!("invalid hook input: {e}");
                return self.reject_input(self.adapters.default_adapter(), &why);
            }
        };
        debug!("hook input: {value}");

        let adapter = self.adapters.select_or_default(&value);
        let Some(call) = adapter.decode(&value) else {
            warn!("hook input has no tool name ({} format)", adapter.name());
            return self.reject_input(adapter, "missing hook input");
        };

        let result = self.evaluate_with_cancel(&call, cancel).await;
        respond(adapter, result)
    }

    /// Tier 3 only, for payloads that never became a tool call.
    fn reject_input(&self, adapter: &dyn HookAdapter, why: &str) -> HookResponse {
        let result = self.default_result(why);
        self.audit.record_invalid_input(&result);
        respond(adapter, result)
    }
}

fn respond(adapter: &dyn HookAdapter, result: EvaluationResult) -> HookResponse {
    HookResponse {
        body: adapter.encode(&result),
        exit_code: adapter.exit_code(&result),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::config::AuditLevel;
    use crate::llm::LlmDecision;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedJudge {
        verdict: Option<LlmDecision>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Judge for FixedJudge {
        async fn evaluate(&self, _call: &ToolCall, _deadline: Option<Duration>) -> Option<LlmDecision> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.verdict.clone()
        }
    }

    fn judge(verdict: Option<LlmDecision>) -> (Box<dyn Judge>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let judge = FixedJudge {
            verdict,
            delay: Duration::ZERO,
            calls: calls.clone(),
        };
        (Box::new(judge), calls)
    }

    fn pipeline(default_action: Decision) -> Pipeline {
        Pipeline::new(CompiledRuleSet::build(&Config::default_config()), default_action)
    }

    #[tokio::test]
    async fn rule_match_skips_llm() {
        let (judge, calls) = judge(None);
        let p = pipeline(Decision::Allow).with_judge(judge);
        let result = p.evaluate(&ToolCall::bash("rm -rf /")).await;
        assert_eq!(result.tier, Tier::Rules);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn llm_verdict_used_when_no_rule_matches() {
        let verdict = LlmDecision {
            decision: Decision::Deny,
            reason: "looks like exfiltration".into(),
            confidence: 0.9,
        };
        let (judge, calls) = judge(Some(verdict));
        let p = pipeline(Decision::Allow).with_judge(judge);
        let result = p.evaluate(&ToolCall::bash("make deploy")).await;
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(result.tier, Tier::Llm);
        assert_eq!(result.reason, "looks like exfiltration");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_llm_decision_names_default() {
        let (judge, _) = judge(None);
        let p = pipeline(Decision::Deny).with_judge(judge);
        let result = p.evaluate(&ToolCall::bash("make deploy")).await;
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(result.tier, Tier::DefaultAction);
        assert_eq!(result.reason, "No rules matched; LLM returned no decision; defaultAction: deny");
    }

    #[tokio::test]
    async fn enabled_without_provider_names_default() {
        let p = pipeline(Decision::Allow).with_llm_enabled(true);
        let result = p.evaluate(&ToolCall::bash("make deploy")).await;
        assert_eq!(result.tier, Tier::DefaultAction);
        assert!(result.reason.contains("no LLM provider available"));
        assert!(result.reason.ends_with("defaultAction: allow"));
    }

    #[tokio::test]
    async fn disabled_llm_is_never_called() {
        let (judge, calls) = judge(None);
        let p = pipeline(Decision::Allow).with_judge(judge).with_llm_enabled(false);
        let result = p.evaluate(&ToolCall::bash("make deploy")).await;
        assert_eq!(result.reason, "No rules matched; defaultAction: allow");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_falls_through_and_still_audits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = FixedJudge {
            verdict: Some(LlmDecision {
                decision: Decision::Allow,
                reason: "too late".into(),
                confidence: 1.0,
            }),
            delay: Duration::from_secs(30),
            calls: calls.clone(),
        };
        let sink = Arc::new(MemoryAuditSink::new());
        let p = pipeline(Decision::Deny)
            .with_judge(Box::new(slow))
            .with_audit(AuditLog::new(Box::new(sink.clone()), AuditLevel::All));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let result = p.evaluate_with_cancel(&ToolCall::bash("make deploy"), &cancel).await;
        assert_eq!(result.tier, Tier::DefaultAction);
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.entries().len(), 1);
    }

    #[tokio::test]
    async fn exactly_one_audit_entry_per_evaluation() {
        let sink = Arc::new(MemoryAuditSink::new());
        let p = pipeline(Decision::Allow)
            .with_audit(AuditLog::new(Box::new(sink.clone()), AuditLevel::All));
        p.evaluate(&ToolCall::bash("rm -rf /")).await;
        p.evaluate(&ToolCall::bash("echo ok")).await;
        p.run(b"not json").await;
        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].tier, Tier::Rules);
        assert_eq!(entries[1].tier, Tier::DefaultAction);
        assert_eq!(entries[2].tool_name, crate::audit::INVALID_INPUT_TOOL);
    }

    #[tokio::test]
    async fn missing_tool_name_uses_selected_adapter() {
        let p = pipeline(Decision::Deny);
        let response = p.run(br#"{"toolName": 5}"#).await;
        assert_eq!(response.exit_code, 2);
        assert_eq!(response.result.reason, "missing hook input; defaultAction: deny");
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert!(body.get("hookSpecificOutput").is_none());
        assert_eq!(body["permissionDecision"], "deny");
    }

    #[tokio::test]
    async fn unknown_shape_uses_default_adapter() {
        let p = pipeline(Decision::Allow);
        let response = p.run(br#"{"event": "something"}"#).await;
        assert_eq!(response.exit_code, 0);
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["hookSpecificOutput"]["permissionDecision"], "allow");
    }
}
