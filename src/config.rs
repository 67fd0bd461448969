use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FactCheckError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "factcheck.toml";

/// Everything the pipeline needs, passed explicitly into gateway constructors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub extract: ExtractConfig,
    pub verify: VerifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub extraction_max_tokens: u32,
    pub classification_max_tokens: u32,
    pub timeout_secs: u64,
    /// Send the response schema as a structured-output format instead of
    /// embedding it in the prompt. Not every model behind a compatible API
    /// supports it.
    pub structured_output: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemma-2-9b-it".to_string(),
            temperature: 0.1,
            extraction_max_tokens: 4000,
            classification_max_tokens: 1000,
            timeout_secs: 60,
            structured_output: false,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub max_results: usize,
    pub search_depth: String,
    pub include_answer: bool,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.tavily.com/search".to_string(),
            max_results: 5,
            search_depth: "advanced".to_string(),
            include_answer: true,
            timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    pub const MAX_RESULTS_CAP: usize = 10;

    pub fn result_cap(&self) -> usize {
        self.max_results.clamp(1, Self::MAX_RESULTS_CAP)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub max_document_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_document_chars: 50_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub concurrency: usize,
    pub snippet_chars: usize,
    pub explanation_chars: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            snippet_chars: 600,
            explanation_chars: 600,
        }
    }
}

impl Config {
    /// Reads `path` (or `./factcheck.toml` when present), then applies
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        };
        let config = match file {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FactCheckError::Config(e.to_string()))
    }

    /// `lookup` is injected so tests never touch the process environment.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("OPENROUTER_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(base) = lookup("OPENROUTER_API_BASE") {
            self.llm.api_base = base;
        }
        if let Some(model) = lookup("FACTCHECK_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("TAVILY_API_KEY") {
            self.search.api_key = Some(key);
        }
        self
    }
}
