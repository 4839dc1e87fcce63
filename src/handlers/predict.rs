use axum::Json;
use axum::extract::{Multipart, State};

use super::AppState;
use crate::error::{PawFinderError, Result};
use crate::models::Prediction;

const IMAGE_FIELD: &str = "image";

pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Prediction>> {
    if !state.predictor.is_available() {
        return Err(PawFinderError::ModelUnavailable);
    }

    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PawFinderError::ClientInput(e.body_text()))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| PawFinderError::ClientInput(e.body_text()))?;
            image = Some(bytes);
            break;
        }
    }

    let bytes = image.ok_or_else(|| {
        PawFinderError::ClientInput("No image file provided (field 'image')".to_string())
    })?;
    tracing::debug!(size = bytes.len(), "Received image upload");

    Ok(Json(state.predictor.predict(&bytes).await?))
}
