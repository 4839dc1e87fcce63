//! Text-generation providers used to answer chat questions.
//!
//! Each provider wraps one upstream API. Providers are only constructed when
//! their credentials are present, so everything in a [`ProviderSet`] is
//! attemptable.

pub mod gemini;
pub mod grok;
pub mod openai;
pub mod response;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, Transport};

#[cfg(test)]
use mockall::automock;

/// System prompt shared by every provider
pub const SYSTEM_PROMPT: &str = "You are PawFinder, a friendly assistant for dog owners. \
Answer questions about dog breeds, grooming, diet, exercise, training and health. \
Keep answers practical and concise, and recommend a veterinarian for medical concerns.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Grok,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::OpenAi, ProviderKind::Gemini, ProviderKind::Grok];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Grok => "grok",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "grok" => Ok(ProviderKind::Grok),
            other => Err(format!("Unknown provider '{other}'")),
        }
    }
}

/// Why a single provider attempt produced no answer
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Protocol(String),

    #[error("upstream returned an empty answer")]
    Empty,

    #[error("sdk error: {0}")]
    Sdk(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Produce an answer for the question. Empty answers are reported as
    /// [`ProviderError::Empty`].
    async fn generate(&self, question: &str) -> ProviderResult<String>;

    /// Cheap upstream round trip returning the raw JSON
    async fn verify(&self) -> ProviderResult<serde_json::Value>;
}

/// A configured provider paired with its retry policy
#[derive(Clone)]
pub struct ProviderEntry {
    pub provider: Arc<dyn Provider>,
    pub retry: RetryPolicy,
}

/// Configured providers in priority order, plus credentialed providers left
/// out of the priority list that are used only when a request forces them
#[derive(Clone, Default)]
pub struct ProviderSet {
    entries: Vec<ProviderEntry>,
    standby: Vec<ProviderEntry>,
}

impl ProviderSet {
    pub fn new(entries: Vec<ProviderEntry>) -> Self {
        Self {
            entries,
            standby: Vec::new(),
        }
    }

    pub fn with_standby(mut self, standby: Vec<ProviderEntry>) -> Self {
        self.standby = standby;
        self
    }

    /// Build every configured provider from config
    pub fn from_config(config: &Config) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());
        Self::from_config_with_transport(config, transport)
    }

    pub fn from_config_with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let prioritized = config.configured_providers();
        let mut entries = Vec::new();
        let mut standby = Vec::new();
        for kind in ProviderKind::ALL {
            if !config.is_configured(kind) {
                continue;
            }
            let entry = build_entry(config, kind, &transport);
            if prioritized.contains(&kind) {
                tracing::info!(provider = %kind, attempts = entry.retry.attempts(), "Chat provider enabled");
                entries.push(entry);
            } else {
                tracing::info!(provider = %kind, "Chat provider not in priority list, used only when forced");
                standby.push(entry);
            }
        }
        entries.sort_by_key(|e| {
            prioritized
                .iter()
                .position(|k| *k == e.provider.kind())
                .unwrap_or(usize::MAX)
        });
        Self { entries, standby }
    }

    /// Any configured provider, whether or not it is in the priority list
    pub fn get(&self, kind: ProviderKind) -> Option<&ProviderEntry> {
        self.entries
            .iter()
            .chain(self.standby.iter())
            .find(|e| e.provider.kind() == kind)
    }

    /// Providers tried for unforced requests, in priority order
    pub fn iter(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn build_entry(config: &Config, kind: ProviderKind, transport: &Arc<dyn Transport>) -> ProviderEntry {
    let (provider, retry): (Arc<dyn Provider>, _) = match kind {
        ProviderKind::OpenAi => (
            Arc::new(openai::OpenAiProvider::new(&config.providers.openai)),
            config.providers.openai.retry,
        ),
        ProviderKind::Gemini => (
            Arc::new(gemini::GeminiProvider::new(
                Arc::clone(transport),
                &config.providers.gemini,
            )),
            config.providers.gemini.retry,
        ),
        ProviderKind::Grok => (
            Arc::new(grok::GrokProvider::new(
                Arc::clone(transport),
                &config.providers.grok,
            )),
            config.providers.grok.retry,
        ),
    };
    ProviderEntry {
        provider,
        retry: RetryPolicy::from(retry),
    }
}

/// Reject answers that are empty once trimmed
pub(crate) fn non_empty(text: String) -> ProviderResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(trimmed.to_string())
}
