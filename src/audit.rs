//! Append-only decision trail, one JSON object per line.
//!
//! Distinct from diagnostic logging: this file is for operators reviewing
//! what the agent tried to do. [`AuditLog::record`] applies the verbosity
//! filter before anything is serialized and never fails the evaluation.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, SecondsFormat};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{AuditLevel, LoggingConfig};
use crate::eval::{Decision, EvaluationResult, Tier, ToolCall};

/// Tool name recorded when the hook input could not be decoded.
pub const INVALID_INPUT_TOOL: &str = "<invalid-input>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// RFC 3339 with a UTC offset.
    pub timestamp: String,
    pub tool_name: String,
    /// Compact JSON of the tool input, extensions included.
    pub tool_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub decision: Decision,
    pub tier: Tier,
    pub reason: String,
}

impl AuditEntry {
    pub fn new(call: &ToolCall, result: &EvaluationResult) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            tool_name: call.tool_name.clone(),
            tool_input: call.tool_input.to_json(),
            cwd: call.cwd.clone(),
            decision: result.decision,
            tier: result.tier,
            reason: result.reason.clone(),
        }
    }

    /// Entry for a hook payload that never became a tool call.
    pub fn invalid_input(result: &EvaluationResult) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            tool_name: INVALID_INPUT_TOOL.to_string(),
            tool_input: "{}".to_string(),
            cwd: None,
            decision: result.decision,
            tier: result.tier,
            reason: result.reason.clone(),
        }
    }
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> io::Result<()>;
}

/// Line-delimited JSON file, opened lazily in append mode.
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("audit log lock poisoned"))?;
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes())?;
            file.flush()?;
        }
        Ok(())
    }
}

/// Keeps entries in memory; for tests and embedding hosts.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("audit sink lock poisoned"))?
            .push(entry.clone());
        Ok(())
    }
}

impl<T: AuditSink + ?Sized> AuditSink for std::sync::Arc<T> {
    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        (**self).append(entry)
    }
}

/// Verbosity filter in front of a sink.
pub struct AuditLog {
    sink: Option<Box<dyn AuditSink>>,
    level: AuditLevel,
}

impl AuditLog {
    pub fn new(sink: Box<dyn AuditSink>, level: AuditLevel) -> Self {
        Self {
            sink: Some(sink),
            level,
        }
    }

    /// Records nothing.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            level: AuditLevel::DenialsOnly,
        }
    }

    /// JSONL file at the configured path, or disabled.
    pub fn from_config(config: &LoggingConfig) -> Self {
        if config.enabled && !config.path.trim().is_empty() {
            Self::new(Box::new(JsonlAuditSink::new(&config.path)), config.level)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    fn wants(&self, decision: Decision) -> bool {
        match self.level {
            AuditLevel::All => true,
            AuditLevel::DenialsOnly => decision == Decision::Deny,
        }
    }

    pub fn record(&self, call: &ToolCall, result: &EvaluationResult) {
        self.write(result, || AuditEntry::new(call, result));
    }

    pub fn record_invalid_input(&self, result: &EvaluationResult) {
        self.write(result, || AuditEntry::invalid_input(result));
    }

    fn write(&self, result: &EvaluationResult, entry: impl FnOnce() -> AuditEntry) {
        let Some(sink) = &self.sink else {
            return;
        };
        if !self.wants(result.decision) {
            return;
        }
        if let Err(e) = sink.append(&entry()) {
            warn!("audit log write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn deny() -> EvaluationResult {
        EvaluationResult::new(Decision::Deny, Tier::Rules, "Destructive recursive delete")
    }

    fn allow() -> EvaluationResult {
        EvaluationResult::new(Decision::Allow, Tier::DefaultAction, "No rules matched; defaultAction: allow")
    }

    #[test]
    fn denials_only_skips_allows() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(Box::new(sink.clone()), AuditLevel::DenialsOnly);
        log.record(&ToolCall::bash("ls"), &allow());
        log.record(&ToolCall::bash("rm -rf /"), &deny());
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].decision, Decision::Deny);
    }

    #[test]
    fn all_records_everything() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(Box::new(sink.clone()), AuditLevel::All);
        log.record(&ToolCall::bash("ls"), &allow());
        log.record(&ToolCall::bash("rm -rf /"), &deny());
        assert_eq!(sink.entries().len(), 2);
    }

    #[test]
    fn entry_serializes_tier_as_number() {
        let call = ToolCall::bash("rm -rf /").with_cwd("/work");
        let entry = AuditEntry::new(&call, &deny());
        let value: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["tier"], 1);
        assert_eq!(value["decision"], "deny");
        assert_eq!(value["tool_input"], r#"{"command":"rm -rf /"}"#);
        assert_eq!(value["cwd"], "/work");
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[test]
    fn cwd_omitted_when_absent() {
        let entry = AuditEntry::new(&ToolCall::bash("x"), &deny());
        let line = serde_json::to_string(&entry).unwrap();
        assert!(!line.contains("cwd"));
    }

    #[test]
    fn jsonl_sink_appends_lines_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        sink.append(&AuditEntry::new(&ToolCall::bash("a"), &deny())).unwrap();
        sink.append(&AuditEntry::invalid_input(&deny())).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: AuditEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.tool_name, INVALID_INPUT_TOOL);
        assert_eq!(second.tool_input, "{}");
    }

    #[test]
    fn jsonl_sink_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        std::fs::write(&path, "{\"earlier\":true}\n").unwrap();
        JsonlAuditSink::new(&path)
            .append(&AuditEntry::new(&ToolCall::bash("a"), &deny()))
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\"earlier\":true}\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn concurrent_writers_produce_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = Arc::new(JsonlAuditSink::new(&path));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        let call = ToolCall::bash(&format!("cmd {i} {j} {}", "x".repeat(512)));
                        sink.append(&AuditEntry::new(&call, &deny())).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 200);
        for line in content.lines() {
            serde_json::from_str::<AuditEntry>(line).unwrap();
        }
    }

    #[test]
    fn write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every open fail.
        let path = dir.path().join("audit.jsonl");
        std::fs::create_dir(&path).unwrap();
        let log = AuditLog::new(Box::new(JsonlAuditSink::new(&path)), AuditLevel::All);
        log.record(&ToolCall::bash("rm -rf /"), &deny());
    }

    #[test]
    fn disabled_config_records_nothing() {
        let config = LoggingConfig {
            enabled: false,
            level: AuditLevel::All,
            path: "/nonexistent/audit.jsonl".into(),
        };
        assert!(!AuditLog::from_config(&config).is_enabled());
    }
}
