use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{Provider, ProviderError, ProviderKind, ProviderResult, SYSTEM_PROMPT, non_empty};
use crate::config::OpenAiConfig;

/// Chat-completion provider backed by the OpenAI SDK
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(cfg: &OpenAiConfig) -> Self {
        let config = OpenAIConfig::new().with_api_key(cfg.api_key.clone());
        Self {
            client: Client::with_config(config),
            model: cfg.model.clone(),
            timeout: Duration::from_secs(cfg.timeout_seconds),
        }
    }

    fn build_request(&self, question: &str) -> Result<CreateChatCompletionRequest, OpenAIError> {
        CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(question)
                    .build()?
                    .into(),
            ])
            .temperature(0.7)
            .build()
    }
}

impl From<OpenAIError> for ProviderError {
    fn from(e: OpenAIError) -> Self {
        match e {
            OpenAIError::Reqwest(inner) => ProviderError::Transport(inner.to_string()),
            OpenAIError::JSONDeserialize(inner) => ProviderError::Protocol(inner.to_string()),
            other => ProviderError::Sdk(other.to_string()),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate(&self, question: &str) -> ProviderResult<String> {
        tracing::debug!(model = %self.model, "Requesting OpenAI chat completion");
        let request = self.build_request(question)?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Protocol("OpenAI returned empty choices".to_string()))?
            .message
            .content
            .ok_or(ProviderError::Empty)?;
        non_empty(content)
    }

    async fn verify(&self) -> ProviderResult<Value> {
        let models = tokio::time::timeout(self.timeout, self.client.models().list())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;
        serde_json::to_value(models).map_err(|e| ProviderError::Protocol(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_system_and_user_messages() {
        let provider = OpenAiProvider::new(&OpenAiConfig {
            api_key: "sk-test".to_string(),
            ..OpenAiConfig::default()
        });
        let request = provider
            .build_request("Which breed sheds least?")
            .expect("request should build");
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Which breed sheds least?");
    }

    #[tokio::test]
    async fn test_openai_live_generate() {
        // Only runs against the real API when a key is present
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            let provider = OpenAiProvider::new(&OpenAiConfig {
                api_key,
                ..OpenAiConfig::default()
            });
            let res = provider.generate("Name one herding breed.").await;
            assert!(res.is_ok());
        }
    }
}
