use std::fmt;

use log::{debug, info};

use crate::config::{LlmFallbackConfig, ProviderConfig};
use crate::llm::anthropic::{self, AnthropicBackend};
use crate::llm::ollama::{self, OllamaBackend};
use crate::llm::openai::{self, OpenAiBackend};
use crate::llm::{ChatBackend, CredentialResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    GitHubModels,
    Ollama,
}

impl ProviderKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAi),
            "github-models" => Some(Self::GitHubModels),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::GitHubModels => "github-models",
            Self::Ollama => "ollama",
        }
    }

    /// Environment variable holding the API key; `None` for keyless providers.
    pub fn credential_env_var(self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::GitHubModels => Some("GITHUB_TOKEN"),
            Self::Ollama => None,
        }
    }

    /// Command tried when the env var is unset and none is configured.
    pub fn fallback_command(self) -> Option<&'static str> {
        match self {
            Self::GitHubModels => Some("gh auth token"),
            _ => None,
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::Anthropic => anthropic::DEFAULT_ENDPOINT,
            Self::OpenAi => openai::OPENAI_ENDPOINT,
            Self::GitHubModels => openai::GITHUB_MODELS_ENDPOINT,
            Self::Ollama => ollama::DEFAULT_ENDPOINT,
        }
    }

    pub fn implicit_model(self) -> Option<&'static str> {
        match self {
            Self::GitHubModels => Some("gpt-4o-mini"),
            Self::Ollama => Some("llama3:8b"),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The backend chosen for this process, with model and endpoint resolved.
pub struct ProviderSelection {
    pub kind: ProviderKind,
    pub backend: Box<dyn ChatBackend>,
    pub provider: ProviderConfig,
}

impl fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSelection")
            .field("kind", &self.kind)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

/// First provider in the chain that can be fully constructed.
///
/// Exhausting the chain is not an error; it just leaves tier 2 off.
pub async fn select_provider(
    config: &LlmFallbackConfig,
    credentials: &dyn CredentialResolver,
) -> Option<ProviderSelection> {
    for (i, provider) in config.provider_chain.iter().enumerate() {
        match try_provider(provider, credentials).await {
            Ok(selection) => {
                info!(
                    "LLM fallback using {} model {} at {}",
                    selection.kind,
                    selection.provider.model,
                    selection.provider.endpoint.as_deref().unwrap_or_default()
                );
                return Some(selection);
            }
            Err(why) => debug!("provider_chain[{i}] ({}) skipped: {why}", provider.kind),
        }
    }
    debug!("no usable LLM provider; tier 2 disabled");
    None
}

async fn try_provider(
    provider: &ProviderConfig,
    credentials: &dyn CredentialResolver,
) -> Result<ProviderSelection, String> {
    let kind = ProviderKind::parse(&provider.kind)
        .ok_or_else(|| format!("unknown provider type '{}'", provider.kind))?;

    let model = match provider.model.trim() {
        "" => kind
            .implicit_model()
            .ok_or("no model configured")?
            .to_string(),
        model => model.to_string(),
    };

    let endpoint = provider
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(kind.default_endpoint())
        .to_string();

    let api_key = match kind.credential_env_var() {
        Some(env_var) => {
            let command = provider.api_key_command.as_deref().or(kind.fallback_command());
            let key = credentials
                .resolve(env_var, command)
                .ok_or_else(|| format!("no credential in {env_var} or from a command"))?;
            Some(key)
        }
        None => None,
    };

    let client = reqwest::Client::builder()
        .connect_timeout(provider.timeout())
        .build()
        .map_err(|e| format!("cannot build HTTP client: {e}"))?;

    if kind == ProviderKind::Ollama
        && !ollama::is_available(&client, &endpoint, provider.timeout()).await
    {
        return Err(format!("{endpoint} is not responding"));
    }

    let api_key = api_key.unwrap_or_default();
    let backend: Box<dyn ChatBackend> = match kind {
        ProviderKind::Anthropic => Box::new(AnthropicBackend::new(client, &endpoint, api_key, &model)),
        ProviderKind::OpenAi | ProviderKind::GitHubModels => Box::new(OpenAiBackend::new(
            kind.as_str(),
            client,
            &endpoint,
            api_key,
            &model,
        )),
        ProviderKind::Ollama => Box::new(OllamaBackend::new(client, &endpoint, &model)),
    };

    let mut resolved = provider.clone();
    resolved.kind = kind.as_str().to_string();
    resolved.model = model;
    resolved.endpoint = Some(endpoint);
    Ok(ProviderSelection {
        kind,
        backend,
        provider: resolved,
    })
}
