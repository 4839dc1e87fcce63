use axum::Json;
use axum::extract::State;
use serde_json::{Map, Value};

use super::AppState;
use crate::error::{PawFinderError, Result};
use crate::providers::ProviderKind;

pub async fn verify_openai(State(state): State<AppState>) -> Result<Json<Value>> {
    verify(&state, ProviderKind::OpenAi).await
}

pub async fn verify_gemini(State(state): State<AppState>) -> Result<Json<Value>> {
    verify(&state, ProviderKind::Gemini).await
}

pub async fn verify_grok(State(state): State<AppState>) -> Result<Json<Value>> {
    verify(&state, ProviderKind::Grok).await
}

/// One upstream round trip with the configured credentials; no retries
async fn verify(state: &AppState, kind: ProviderKind) -> Result<Json<Value>> {
    let entry = state
        .resolver
        .providers()
        .get(kind)
        .ok_or(PawFinderError::ProviderNotConfigured(kind))?;

    let raw = entry
        .provider
        .verify()
        .await
        .map_err(|e| PawFinderError::Upstream {
            provider: kind,
            message: e.to_string(),
        })?;
    tracing::info!(provider = %kind, "Provider credentials verified");

    let mut body = Map::new();
    body.insert("ok".to_string(), Value::Bool(true));
    body.insert(format!("{kind}_raw"), raw);
    Ok(Json(Value::Object(body)))
}
