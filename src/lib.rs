pub mod breeds;
pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod handlers;
pub mod models;
pub mod orders;
pub mod predict;
pub mod providers;
pub mod redis;
pub mod resolver;
pub mod retry;
pub mod transport;

use std::sync::Arc;

use crate::breeds::BreedCatalog;
use crate::cache::{AnswerCache, MemoryCache};
use crate::config::{CacheBackend, Config};
use crate::fallback::FallbackResponder;
use crate::handlers::AppState;
use crate::orders::OrderStore;
use crate::predict::Predictor;
use crate::providers::ProviderSet;
use crate::redis::RedisManager;
use crate::resolver::AnswerResolver;

/// Pick the configured cache backend. An unreachable Redis degrades to the
/// in-process cache instead of failing startup.
pub async fn build_cache(config: &Config) -> Arc<dyn AnswerCache> {
    let memory = || -> Arc<dyn AnswerCache> {
        Arc::new(MemoryCache::new(config.cache_ttl(), config.cache.max_entries))
    };
    match config.cache.backend {
        CacheBackend::Memory => memory(),
        CacheBackend::Redis => match RedisManager::new_with_config(config).await {
            Ok(manager) => Arc::new(manager),
            Err(e) => {
                tracing::warn!("Redis cache unavailable, using in-memory cache: {}", e);
                memory()
            }
        },
    }
}

/// Wire every component from configuration
pub async fn build_state(config: &Config) -> AppState {
    let catalog = Arc::new(BreedCatalog::load(&config.predict.breed_data_dir));
    let providers = ProviderSet::from_config(config);
    if providers.is_empty() {
        tracing::warn!("No chat provider configured - /chat will answer from fallback templates");
    }

    let resolver = AnswerResolver::new(
        providers,
        build_cache(config).await,
        FallbackResponder::new(Arc::clone(&catalog)),
    );

    AppState {
        resolver: Arc::new(resolver),
        predictor: Arc::new(Predictor::from_config(config, catalog)),
        orders: Arc::new(OrderStore::new(&config.orders.path)),
    }
}
