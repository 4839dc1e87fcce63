use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use super::AppState;
use crate::error::{PawFinderError, Result};
use crate::models::{ChatRequest, ChatResponse};

pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|e| PawFinderError::ClientInput(e.body_text()))?;
    let question = request.question.as_deref().unwrap_or_default();
    let response = state.resolver.resolve(question, request.forced()).await?;
    tracing::info!(source = %response.source, "Chat answered");
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::super::test_handlers::{app_with, post_json, send, single_provider};
    use crate::providers::{ProviderKind, ProviderSet};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;

    #[tokio::test]
    async fn test_chat_answers_from_provider_then_cache() {
        let app = app_with(single_provider(ProviderKind::OpenAi, Ok("Brush weekly.")), None);

        let (status, body) = send(
            &app.router,
            post_json("/chat", json!({"question": "How do I groom a beagle?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"answer": "Brush weekly.", "source": "openai"}));

        let (_, body) = send(
            &app.router,
            post_json("/chat", json!({"question": "how do i groom a beagle?"})),
        )
        .await;
        assert_eq!(
            body,
            json!({"answer": "Brush weekly.", "source": "cache", "cached": true})
        );
    }

    #[tokio::test]
    async fn test_chat_falls_back_when_provider_fails() {
        let app = app_with(single_provider(ProviderKind::Gemini, Err(())), None);
        let (status, body) = send(
            &app.router,
            post_json("/chat", json!({"question": "what should my dog eat"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "fallback");
        assert!(!body["answer"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_question() {
        let app = app_with(ProviderSet::default(), None);
        let (status, body) = send(&app.router, post_json("/chat", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("question"));
    }

    #[tokio::test]
    async fn test_chat_rejects_forcing_unconfigured_provider() {
        let app = app_with(single_provider(ProviderKind::OpenAi, Ok("hi")), None);
        let (status, body) = send(
            &app.router,
            post_json("/chat", json!({"question": "hi", "force_grok": true})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "grok provider is not configured");
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_json() {
        let app = app_with(ProviderSet::default(), None);
        let request = Request::post("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("error").is_some());
    }
}
