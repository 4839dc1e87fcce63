use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use super::response::parse_responses;
use super::{Provider, ProviderKind, ProviderResult, SYSTEM_PROMPT, non_empty};
use crate::config::GrokConfig;
use crate::transport::{Auth, JsonRequest, Transport};

/// Provider for responses-style endpoints that take `{model, input}`
pub struct GrokProvider {
    tx: Arc<dyn Transport>,
    api_key: String,
    api_url: String,
    model: String,
    timeout: Duration,
}

impl GrokProvider {
    pub fn new(tx: Arc<dyn Transport>, cfg: &GrokConfig) -> Self {
        Self {
            tx,
            api_key: cfg.api_key.clone(),
            api_url: cfg.api_url.clone(),
            model: cfg.model.clone(),
            timeout: Duration::from_secs(cfg.timeout_seconds),
        }
    }

    fn request(&self, input: Value) -> JsonRequest {
        JsonRequest {
            url: self.api_url.clone(),
            auth: Some(Auth::Bearer(self.api_key.clone())),
            body: json!({ "model": self.model, "input": input }),
            timeout: self.timeout,
        }
    }
}

#[async_trait]
impl Provider for GrokProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Grok
    }

    async fn generate(&self, question: &str) -> ProviderResult<String> {
        tracing::debug!(model = %self.model, "Requesting Grok completion");
        let input = json!([
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": question }
        ]);
        let raw = self.tx.post_json(self.request(input)).await?;
        non_empty(parse_responses(&raw)?.into_text())
    }

    async fn verify(&self) -> ProviderResult<Value> {
        self.tx
            .post_json(self.request(json!("Reply with the word ok.")))
            .await
    }
}
