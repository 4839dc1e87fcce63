use std::sync::Arc;

use crate::cache::AnswerCache;
use crate::error::{PawFinderError, Result};
use crate::fallback::FallbackResponder;
use crate::models::{AnswerSource, ChatResponse};
use crate::providers::{ProviderEntry, ProviderKind, ProviderSet};

/// Picks an answer from the cache, the configured providers, or the fallback
/// templates, in that order
pub struct AnswerResolver {
    providers: ProviderSet,
    cache: Arc<dyn AnswerCache>,
    fallback: FallbackResponder,
}

impl AnswerResolver {
    pub fn new(
        providers: ProviderSet,
        cache: Arc<dyn AnswerCache>,
        fallback: FallbackResponder,
    ) -> Self {
        Self {
            providers,
            cache,
            fallback,
        }
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Resolve one question. Only input errors are returned; provider failures
    /// fall through to the next strategy.
    pub async fn resolve(
        &self,
        question: &str,
        force: Option<ProviderKind>,
    ) -> Result<ChatResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PawFinderError::ClientInput(
                "No question provided (field 'question')".to_string(),
            ));
        }

        let forced = match force {
            Some(kind) => Some(
                self.providers
                    .get(kind)
                    .ok_or(PawFinderError::ProviderNotConfigured(kind))?,
            ),
            None => None,
        };

        // A forced provider bypasses the cache so the caller gets a fresh answer
        if forced.is_none() {
            if let Some(answer) = self.cache.get(question).await {
                tracing::info!("Answering from cache");
                return Ok(ChatResponse::cached(answer));
            }
        }

        if let Some(entry) = forced {
            if let Some(response) = self.try_provider(entry, question).await {
                return Ok(response);
            }
        }

        for entry in self.providers.iter() {
            if Some(entry.provider.kind()) == force {
                continue;
            }
            if let Some(response) = self.try_provider(entry, question).await {
                return Ok(response);
            }
        }

        // Another request may have stored an answer while providers were failing
        if let Some(answer) = self.cache.get(question).await {
            tracing::info!("All providers failed, answering from cache");
            return Ok(ChatResponse::cached(answer));
        }

        tracing::info!("No provider answered, using fallback responder");
        let answer = self.fallback.respond(question);
        self.cache.set(question, &answer).await;
        Ok(ChatResponse::fresh(answer, AnswerSource::Fallback))
    }

    /// Run one provider under its retry policy; `None` once attempts are exhausted
    async fn try_provider(&self, entry: &ProviderEntry, question: &str) -> Option<ChatResponse> {
        let kind = entry.provider.kind();
        let result = entry
            .retry
            .run(
                |_| entry.provider.generate(question),
                |attempt, e| {
                    tracing::warn!(
                        provider = %kind,
                        attempt,
                        max_attempts = entry.retry.attempts(),
                        "Provider attempt failed: {}",
                        e
                    );
                },
            )
            .await;

        match result {
            Ok(answer) => {
                tracing::info!(provider = %kind, "Provider answered");
                self.cache.set(question, &answer).await;
                Some(ChatResponse::fresh(answer, AnswerSource::Provider(kind)))
            }
            Err(_) => None,
        }
    }
}
