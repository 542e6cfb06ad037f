//! Application settings loaded from environment variables.

use crate::error::{ChatError, Result};

/// Which LLM backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    Anthropic,
}

/// Application settings. Read once at startup from the environment
/// (a `.env` file is honored when present).
#[derive(Debug, Clone)]
pub struct Settings {
    // LLM
    pub llm_provider: LlmProviderKind,
    pub llm_model: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub llm_temperature: f64,
    pub llm_max_tokens: u32,

    // Database
    pub database_path: String,
    pub database_schema: Option<String>,

    // Application
    pub max_query_rows: usize,
    pub query_timeout_seconds: u64,
    pub schema_cache_ttl_seconds: u64,

    // Security
    pub allow_destructive_queries: bool,

    // Visualization
    pub default_chart_type: String,
    pub max_chart_points: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_provider: LlmProviderKind::Anthropic,
            llm_model: "claude-sonnet-4-20250514".to_string(),
            openai_api_key: None,
            anthropic_api_key: None,
            llm_temperature: 0.1,
            llm_max_tokens: 4000,
            database_path: "data/warehouse.db".to_string(),
            database_schema: None,
            max_query_rows: 10_000,
            query_timeout_seconds: 300,
            schema_cache_ttl_seconds: 3600,
            allow_destructive_queries: false,
            default_chart_type: "bar".to_string(),
            max_chart_points: 1000,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ChatError::Config(format!("Invalid value for {}: {}", name, raw))),
        None => Ok(default),
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Settings::default();

        let llm_provider = match env_var("LLM_PROVIDER").as_deref() {
            Some("openai") => LlmProviderKind::OpenAi,
            Some("anthropic") | None => LlmProviderKind::Anthropic,
            Some(other) => {
                return Err(ChatError::Config(format!(
                    "Unsupported LLM provider: {}",
                    other
                )))
            }
        };

        let llm_model = env_var("LLM_MODEL").unwrap_or_else(|| match llm_provider {
            LlmProviderKind::OpenAi => "gpt-4o".to_string(),
            LlmProviderKind::Anthropic => defaults.llm_model.clone(),
        });

        Ok(Self {
            llm_provider,
            llm_model,
            openai_api_key: env_var("OPENAI_API_KEY"),
            anthropic_api_key: env_var("ANTHROPIC_API_KEY"),
            llm_temperature: env_parse("LLM_TEMPERATURE", defaults.llm_temperature)?,
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", defaults.llm_max_tokens)?,
            database_path: env_var("DATABASE_PATH").unwrap_or(defaults.database_path),
            database_schema: env_var("DATABASE_SCHEMA"),
            max_query_rows: env_parse("MAX_QUERY_ROWS", defaults.max_query_rows)?,
            query_timeout_seconds: env_parse(
                "QUERY_TIMEOUT_SECONDS",
                defaults.query_timeout_seconds,
            )?,
            schema_cache_ttl_seconds: env_parse(
                "SCHEMA_CACHE_TTL_SECONDS",
                defaults.schema_cache_ttl_seconds,
            )?,
            allow_destructive_queries: env_parse(
                "ALLOW_DESTRUCTIVE_QUERIES",
                defaults.allow_destructive_queries,
            )?,
            default_chart_type: env_var("DEFAULT_CHART_TYPE").unwrap_or(defaults.default_chart_type),
            max_chart_points: env_parse("MAX_CHART_POINTS", defaults.max_chart_points)?,
        })
    }

    /// API key for the configured provider, checked up front so a missing
    /// key fails at startup rather than on the first query.
    pub fn llm_api_key(&self) -> Result<String> {
        let key = match self.llm_provider {
            LlmProviderKind::OpenAi => self.openai_api_key.clone(),
            LlmProviderKind::Anthropic => self.anthropic_api_key.clone(),
        };
        key.ok_or_else(|| {
            ChatError::Config(match self.llm_provider {
                LlmProviderKind::OpenAi => "OPENAI_API_KEY not set".to_string(),
                LlmProviderKind::Anthropic => "ANTHROPIC_API_KEY not set".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let settings = Settings::default();
        assert_eq!(settings.max_query_rows, 10_000);
        assert_eq!(settings.query_timeout_seconds, 300);
        assert!(!settings.allow_destructive_queries);
        assert_eq!(settings.max_chart_points, 1000);
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let settings = Settings::default();
        assert!(matches!(
            settings.llm_api_key(),
            Err(ChatError::Config(_))
        ));
    }
}
