/// HTTP handlers for the PawFinder API
pub mod chat;
pub mod orders;
pub mod predict;
pub mod verify;

#[cfg(test)]
mod test_handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::PawFinderError;
use crate::orders::OrderStore;
use crate::predict::Predictor;
use crate::resolver::AnswerResolver;

/// Uploads larger than this are rejected before reaching the predictor
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AnswerResolver>,
    pub predictor: Arc<Predictor>,
    pub orders: Arc<OrderStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict::predict))
        .route("/chat", post(chat::chat))
        .route("/verify-openai", get(verify::verify_openai))
        .route("/verify-gemini", get(verify::verify_gemini))
        .route("/verify-grok", get(verify::verify_grok))
        .route("/order", post(orders::create_order))
        .route("/orders", get(orders::list_orders))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl PawFinderError {
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            return StatusCode::BAD_REQUEST;
        }
        match self {
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PawFinderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{} -> {}", status, self);
        }
        let body = match &self {
            // Keep the best guess so the client can still show it
            Self::LowConfidence { breed, confidence } => json!({
                "error": self.to_string(),
                "breed": breed,
                "confidence": confidence,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
