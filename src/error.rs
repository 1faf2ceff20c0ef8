use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a usable configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

/// Failure talking to an LLM backend. Never leaves the judge.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned no completion text")]
    EmptyCompletion,

    #[error("provider did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Failure resolving a provider credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential command is empty: {0:?}")]
    BadCommand(String),

    #[error("cannot run credential command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("credential command exited with {0}")]
    Failed(std::process::ExitStatus),

    #[error("credential command printed nothing")]
    Empty,
}
