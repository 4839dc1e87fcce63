use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::FilterType;
#[cfg(test)]
use mockall::automock;
use serde_json::{Value, json};

use crate::breeds::BreedCatalog;
use crate::config::Config;
use crate::error::{PawFinderError, Result};
use crate::models::Prediction;

/// Side length the classifier was trained on
pub const INPUT_SIZE: u32 = 224;

/// One RGB image scaled to 0.0-1.0, laid out as `[1, height, width, 3]`
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pixels: Vec<f32>,
}

impl Tensor {
    pub const SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3];

    pub fn as_slice(&self) -> &[f32] {
        &self.pixels
    }

    /// Nested `[1][h][w][c]` arrays as expected by TensorFlow Serving
    pub fn to_json(&self) -> Value {
        let [_, height, width, channels] = Self::SHAPE;
        let rows: Vec<Value> = self
            .pixels
            .chunks(width * channels)
            .take(height)
            .map(|row| {
                Value::Array(
                    row.chunks(channels)
                        .map(|px| json!(px))
                        .collect(),
                )
            })
            .collect();
        Value::Array(vec![Value::Array(rows)])
    }
}

/// Decode an uploaded image into the classifier's input layout
pub fn preprocess(bytes: &[u8]) -> Result<Tensor> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| PawFinderError::ImageDecode(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let pixels = resized
        .into_raw()
        .into_iter()
        .map(|v| f32::from(v) / 255.0)
        .collect();
    Ok(Tensor { pixels })
}

/// Produces one probability per breed class
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, input: &Tensor) -> Result<Vec<f32>>;
}

/// Classifier served over REST in the TensorFlow Serving `:predict` format
pub struct RemoteClassifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl RemoteClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, input: &Tensor) -> Result<Vec<f32>> {
        let body = json!({ "instances": input.to_json() });
        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| PawFinderError::Inference(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PawFinderError::Inference(format!(
                "inference server returned {status}: {text}"
            )));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| PawFinderError::Inference(e.to_string()))?;
        parse_predictions(&value)
    }
}

/// Read `predictions[0]` as a probability vector
fn parse_predictions(value: &Value) -> Result<Vec<f32>> {
    let row = value
        .get("predictions")
        .and_then(|p| p.get(0))
        .and_then(Value::as_array)
        .ok_or_else(|| PawFinderError::Inference("response has no predictions[0]".to_string()))?;
    row.iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| PawFinderError::Inference(format!("non-numeric score {v}")))
        })
        .collect()
}

pub struct Predictor {
    classifier: Option<Arc<dyn Classifier>>,
    catalog: Arc<BreedCatalog>,
    min_confidence: f32,
}

impl Predictor {
    pub fn new(
        classifier: Option<Arc<dyn Classifier>>,
        catalog: Arc<BreedCatalog>,
        min_confidence: f32,
    ) -> Self {
        Self {
            classifier,
            catalog,
            min_confidence,
        }
    }

    pub fn from_config(config: &Config, catalog: Arc<BreedCatalog>) -> Self {
        let classifier = config.predict.inference_url.as_ref().map(|url| {
            tracing::info!("Breed classifier at {}", url);
            Arc::new(RemoteClassifier::new(
                url.clone(),
                Duration::from_secs(config.predict.timeout_seconds),
            )) as Arc<dyn Classifier>
        });
        if classifier.is_none() {
            tracing::warn!("INFERENCE_URL not set - /predict will report the model as unavailable");
        }
        Self::new(classifier, catalog, config.predict.min_confidence)
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub async fn predict(&self, bytes: &[u8]) -> Result<Prediction> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(PawFinderError::ModelUnavailable)?;

        let input = preprocess(bytes)?;
        let scores = classifier.classify(&input).await?;

        let (index, best) = scores
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| PawFinderError::Inference("classifier returned no scores".to_string()))?;

        let breed = self.catalog.label(index);
        let confidence = best * 100.0;
        tracing::info!(breed = %breed, confidence, "Breed predicted");

        if best < self.min_confidence {
            return Err(PawFinderError::LowConfidence { breed, confidence });
        }
        Ok(Prediction { breed, confidence })
    }
}
