use std::time::Duration;
use thiserror::Error;

/// Uniform failure signal of the search and model gateways.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct GatewayError {
    pub reason: String,
}

impl GatewayError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(format!("timed out after {}s", limit.as_secs_f32()))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(format!("http: {err}"))
    }
}

impl From<async_openai::error::OpenAIError> for GatewayError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Self::new(format!("model api: {err}"))
    }
}

/// Why claim extraction produced no claim list.
#[derive(Error, Debug)]
pub enum ExtractionCause {
    #[error("language model call failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("model output is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model output has an unexpected shape: {0}")]
    Shape(String),
}

#[derive(Error, Debug)]
pub enum FactCheckError {
    #[error("document contains no extractable text")]
    EmptyDocument,

    #[error("claim extraction failed: {0}")]
    Extraction(#[from] ExtractionCause),

    #[error("run cancelled after {completed} claim(s)")]
    Cancelled { completed: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FactCheckError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::EmptyDocument => 2,
            Self::Extraction(_) => 3,
            Self::Cancelled { .. } => 130,
            Self::Config(_) => 4,
            Self::Io(_) | Self::Serialization(_) => 10,
        }
    }
}

pub type Result<T> = std::result::Result<T, FactCheckError>;
