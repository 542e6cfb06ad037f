//! Anthropic messages-API provider.

use crate::error::{ChatError, Result};
use crate::llm::LlmProvider;
use async_trait::async_trait;
use tracing::info;

pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, temperature: f64, max_tokens: u32) -> Self {
        info!(model = %model, "Initialized Anthropic provider");
        Self {
            api_key,
            base_url: "https://api.anthropic.com/v1".to_string(),
            model,
            temperature,
            max_tokens,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": system_prompt.unwrap_or(""),
            "messages": [{"role": "user", "content": prompt}]
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Llm(format!("Anthropic API call failed: {}", e)))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Llm(format!("Failed to parse Anthropic response: {}", e)))?;

        let content = response_json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| ChatError::Llm("No content in Anthropic response".to_string()))?;

        info!(
            model = %self.model,
            prompt_length = prompt.len(),
            response_length = content.len(),
            "Generated completion"
        );

        Ok(content.to_string())
    }
}
