use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("SQL generation error: {0}")]
    Generation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Query timed out: {0}")]
    Timeout(String),

    #[error("Visualization error: {0}")]
    Visualization(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatError {
    /// True for timeout errors reported by the execution backend.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChatError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
