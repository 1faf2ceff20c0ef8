use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};

use crate::llm::{ChatBackend, ChatRequest, LlmError, check_status, completion_text};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(client: reqwest::Client, endpoint: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn body(&self, request: &ChatRequest) -> Value {
        json!({
            "model": self.model,
            "stream": false,
            "options": {"temperature": 0, "num_predict": request.max_tokens},
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let resp = self
            .client
            .post(format!("{}/api/chat", self.endpoint))
            .json(&self.body(request))
            .send()
            .await?;
        let payload: Value = check_status(resp).await?.json().await?;
        completion_text(&payload, "/message/content")
    }
}

/// `GET /api/tags` answered with a success status within `timeout`.
pub async fn is_available(client: &reqwest::Client, endpoint: &str, timeout: Duration) -> bool {
    let url = format!("{}/api/tags", endpoint.trim_end_matches('/'));
    match client.get(&url).timeout(timeout).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!("ollama liveness check {url} failed: {e}");
            false
        }
    }
}
