use crate::config::LlmConfig;
use crate::error::GatewayError;
use crate::pipeline::traits::{LanguageModel, Prompt, ResponseSchema};
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use tracing::debug;

/// Chat-completions model behind any OpenAI-compatible endpoint
/// (OpenRouter by default).
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    structured_output: bool,
}

impl OpenAiModel {
    pub fn new(api_key: &str, config: &LlmConfig) -> Self {
        let openai = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.api_base.trim_end_matches('/'));
        Self {
            client: Client::with_config(openai),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.classification_max_tokens,
            structured_output: config.structured_output,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn system_text(&self, prompt: &Prompt, schema: Option<&ResponseSchema>) -> String {
        match schema {
            Some(s) if !self.structured_output => format!(
                "{}\n\nRespond with JSON only, matching this JSON schema:\n{}",
                prompt.system, s.schema
            ),
            _ => prompt.system.clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn generate(
        &self,
        prompt: &Prompt,
        schema: Option<&ResponseSchema>,
    ) -> Result<String, GatewayError> {
        let system = self.system_text(prompt, schema);
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .temperature(self.temperature)
            .max_tokens(prompt.max_tokens.unwrap_or(self.max_tokens))
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.as_str())
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt.user.clone())
                    .build()?
                    .into(),
            ]);
        if let (true, Some(s)) = (self.structured_output, schema) {
            args.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: s.name.clone(),
                    schema: Some(s.schema.clone()),
                    strict: Some(false),
                },
            });
        }
        let request = args.build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| GatewayError::new("model response missing content"))?;
        debug!(model = %self.model, chars = content.len(), "model responded");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompted_mode_embeds_schema() {
        let model = OpenAiModel::new("sk-test", &LlmConfig::default());
        let schema = ResponseSchema {
            name: "x".to_string(),
            schema: serde_json::json!({"type": "object"}),
        };
        let text = model.system_text(&Prompt::new("be strict", "hi"), Some(&schema));
        assert!(text.starts_with("be strict"));
        assert!(text.contains("\"type\":\"object\""));
    }

    #[test]
    fn structured_mode_leaves_system_prompt_alone() {
        let config = LlmConfig {
            structured_output: true,
            ..LlmConfig::default()
        };
        let model = OpenAiModel::new("sk-test", &config);
        let schema = ResponseSchema {
            name: "x".to_string(),
            schema: serde_json::json!({}),
        };
        assert_eq!(model.system_text(&Prompt::new("sys", "u"), Some(&schema)), "sys");
        assert_eq!(model.model(), "google/gemma-2-9b-it");
    }
}
