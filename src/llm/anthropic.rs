use async_trait::async_trait;
use serde_json::{Value, json};

use crate::llm::{ChatBackend, ChatRequest, LlmError, check_status, completion_text};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    pub fn new(client: reqwest::Client, endpoint: &str, api_key: String, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    fn body(&self, request: &ChatRequest) -> Value {
        json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": 0,
            "system": request.system,
            "messages": [{"role": "user", "content": request.user}],
        })
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let resp = self
            .client
            .post(format!("{}/v1/messages", self.endpoint))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(request))
            .send()
            .await?;
        let payload: Value = check_status(resp).await?.json().await?;
        completion_text(&payload, "/content/0/text")
    }
}
