use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use super::response::parse_gemini;
use super::{Provider, ProviderKind, ProviderResult, SYSTEM_PROMPT, non_empty};
use crate::config::GeminiConfig;
use crate::transport::{Auth, JsonRequest, Transport};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    tx: Arc<dyn Transport>,
    api_key: String,
    model: String,
    api_base: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(tx: Arc<dyn Transport>, cfg: &GeminiConfig) -> Self {
        Self {
            tx,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(cfg.timeout_seconds),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn request(&self, prompt: &str) -> JsonRequest {
        JsonRequest {
            url: self.endpoint(),
            auth: Some(Auth::Header {
                name: API_KEY_HEADER,
                key: self.api_key.clone(),
            }),
            body: json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": { "temperature": 0.7, "maxOutputTokens": 512 }
            }),
            timeout: self.timeout,
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(&self, question: &str) -> ProviderResult<String> {
        tracing::debug!(model = %self.model, "Requesting Gemini completion");
        let prompt = format!("{SYSTEM_PROMPT}\n\nQuestion: {question}");
        let raw = self.tx.post_json(self.request(&prompt)).await?;
        non_empty(parse_gemini(&raw)?.into_text())
    }

    async fn verify(&self) -> ProviderResult<Value> {
        self.tx.post_json(self.request("Reply with the word ok.")).await
    }
}
