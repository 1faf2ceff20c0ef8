use async_trait::async_trait;
use serde_json::{Value, json};

use crate::llm::{ChatBackend, ChatRequest, LlmError, check_status, completion_text};

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const GITHUB_MODELS_ENDPOINT: &str = "https://models.inference.ai.azure.com";

/// Chat completions API, shared by OpenAI and GitHub Models.
pub struct OpenAiBackend {
    name: &'static str,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(
        name: &'static str,
        client: reqwest::Client,
        endpoint: &str,
        api_key: String,
        model: &str,
    ) -> Self {
        Self {
            name,
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
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await?;
        let payload: Value = check_status(resp).await?.json().await?;
        completion_text(&payload, "/choices/0/message/content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_is_first_message() {
        let backend = OpenAiBackend::new("openai", reqwest::Client::new(), OPENAI_ENDPOINT, "k".into(), "gpt-4o-mini");
        let body = backend.body(&ChatRequest {
            system: "sys".into(),
            user: "usr".into(),
            max_tokens: 10,
        });
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(backend.name(), "openai");
    }
}
