use std::collections::HashMap;
use std::process::{Command, Stdio};

use log::debug;

use crate::error::CredentialError;

/// Source of provider API keys.
pub trait CredentialResolver: Send + Sync {
    /// The value of `env_var` when set, else the output of `command`.
    fn resolve(&self, env_var: &str, command: Option<&str>) -> Option<String>;
}

/// Reads the process environment and runs helper commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCredentials;

impl CredentialResolver for SystemCredentials {
    fn resolve(&self, env_var: &str, command: Option<&str>) -> Option<String> {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        let command = command.filter(|c| !c.trim().is_empty())?;
        match run_command(command) {
            Ok(key) => Some(key),
            Err(e) => {
                debug!("credential command for {env_var} failed: {e}");
                None
            }
        }
    }
}

/// Run a command through the platform shell and return its trimmed standard output.
///
/// Expansions and pipelines in `command` are honored. A non-zero exit is a
/// failure even when something was printed.
pub fn run_command(command: &str) -> Result<String, CredentialError> {
    if command.trim().is_empty() {
        return Err(CredentialError::BadCommand(command.to_string()));
    }
    let output = shell(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("credential command exited with {}: {}", output.status, stderr.trim());
        return Err(CredentialError::Failed(output.status));
    }
    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if key.is_empty() {
        return Err(CredentialError::Empty);
    }
    Ok(key)
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd.exe");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Fixed answers keyed by env var name or command string.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    env: HashMap<String, String>,
    commands: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_command(mut self, command: &str, output: &str) -> Self {
        self.commands.insert(command.to_string(), output.to_string());
        self
    }
}

impl CredentialResolver for StaticCredentials {
    fn resolve(&self, env_var: &str, command: Option<&str>) -> Option<String> {
        self.env
            .get(env_var)
            .or_else(|| command.and_then(|c| self.commands.get(c)))
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}
