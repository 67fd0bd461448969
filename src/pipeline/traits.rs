use crate::error::GatewayError;
use crate::models::EvidenceSet;
use async_trait::async_trait;
use schemars::JsonSchema;
use std::future::Future;
use std::time::Duration;

/// A system instruction plus the user turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// Output budget for this call; the gateway default applies when unset.
    pub max_tokens: Option<u32>,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// JSON schema of the structure a caller expects back from the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl ResponseSchema {
    pub fn of<T: JsonSchema>(name: &str) -> Self {
        let root = schemars::schema_for!(T);
        Self {
            name: name.to_string(),
            schema: serde_json::to_value(root).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Text generation. Performs no semantic work: prompt construction and
/// response validation belong to the caller.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &Prompt,
        schema: Option<&ResponseSchema>,
    ) -> Result<String, GatewayError>;
}

/// Web search. An empty result list is a valid success.
#[async_trait]
pub trait EvidenceSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<EvidenceSet, GatewayError>;
}

/// Bounds a gateway call; an elapsed deadline is a gateway failure.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(GatewayError::timeout(limit)),
    }
}
