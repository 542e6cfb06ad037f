//! LLM providers.
//!
//! The pipeline depends only on the `LlmProvider` trait; OpenAI and
//! Anthropic backends are provided, and tests substitute fakes.

pub mod anthropic;
pub mod openai;

use crate::error::{ChatError, Result};
use async_trait::async_trait;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Text-generation capability consumed by the SQL generator and the
/// chart recommender.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Plain completion.
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String>;

    /// JSON completion. `response_format` describes the expected shape and
    /// is embedded into the system prompt. Output that does not parse as
    /// JSON is an error; the caller treats it as a generation failure.
    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        response_format: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let json_instruction = format!(
            "You must respond with valid JSON only. Do not include any text outside \
             the JSON structure. Do not use markdown code blocks or backticks.\n\n\
             The JSON should follow this structure:\n{}",
            serde_json::to_string_pretty(response_format)?
        );
        let full_system = match system_prompt {
            Some(s) => format!("{}\n\n{}", s, json_instruction),
            None => json_instruction,
        };

        let raw = self.generate(prompt, Some(&full_system)).await?;
        let cleaned = strip_code_fences(&raw);
        serde_json::from_str(cleaned)
            .map_err(|e| ChatError::Llm(format!("LLM did not return valid JSON: {}", e)))
    }
}

/// Removes markdown code fences some models wrap JSON output in.
pub(crate) fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
