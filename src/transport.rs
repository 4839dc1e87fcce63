use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::providers::{ProviderError, ProviderResult};

#[cfg(test)]
use mockall::automock;

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// How a request carries its credential. Keys never go in the URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    Bearer(String),
    /// API key sent in a named header, e.g. `x-goog-api-key`
    Header { name: &'static str, key: String },
}

/// One JSON POST to an upstream API
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRequest {
    pub url: String,
    pub auth: Option<Auth>,
    pub body: Value,
    pub timeout: Duration,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, req: JsonRequest) -> ProviderResult<Value>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, req: JsonRequest) -> ProviderResult<Value> {
        let mut builder = self
            .client
            .post(&req.url)
            .timeout(req.timeout)
            .header("Content-Type", "application/json")
            .json(&req.body);
        match &req.auth {
            Some(Auth::Bearer(token)) => {
                builder = builder.header("Authorization", format!("Bearer {token}"));
            }
            Some(Auth::Header { name, key }) => {
                builder = builder.header(*name, key.as_str());
            }
            None => {}
        }

        // reqwest errors render the full URL; drop it so nothing sensitive reaches logs
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(req.timeout)
            } else {
                ProviderError::Transport(e.without_url().to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Protocol(format!("response is not JSON: {}", e.without_url())))
    }
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let mut s = "é".repeat(400);
        truncate_at_char_boundary(&mut s, MAX_ERROR_BODY);
        assert!(s.len() <= MAX_ERROR_BODY);
        assert!(s.chars().all(|c| c == 'é'));

        let mut short = "bad request".to_string();
        truncate_at_char_boundary(&mut short, MAX_ERROR_BODY);
        assert_eq!(short, "bad request");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport = HttpTransport::new();
        let res = transport
            .post_json(JsonRequest {
                url: "http://127.0.0.1:9/unreachable".to_string(),
                auth: None,
                body: serde_json::json!({}),
                timeout: Duration::from_secs(2),
            })
            .await;
        assert!(matches!(
            res,
            Err(ProviderError::Transport(_)) | Err(ProviderError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_echo_url() {
        let transport = HttpTransport::new();
        let err = transport
            .post_json(JsonRequest {
                url: "http://127.0.0.1:9/models/m:generateContent?key=SUPERSECRETKEY".to_string(),
                auth: Some(Auth::Header {
                    name: "x-goog-api-key",
                    key: "SUPERSECRETKEY".to_string(),
                }),
                body: serde_json::json!({}),
                timeout: Duration::from_secs(2),
            })
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("SUPERSECRETKEY"), "{err}");
    }
}
