use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool::managed::QueueMode;
use deadpool_redis::{Config as DeadpoolConfig, Pool, PoolConfig, Runtime, Timeouts};
use redis::AsyncCommands;

use crate::cache::{AnswerCache, cache_key};
use crate::config::Config;
use crate::error::{PawFinderError, Result};

/// Redis-backed answer cache shared across server processes
#[derive(Clone)]
pub struct RedisManager {
    pool: Arc<Pool>,
    default_ttl: Duration,
}

impl RedisManager {
    /// Create a new Redis manager with configuration
    pub async fn new_with_config(config: &Config) -> Result<Self> {
        let redis = &config.cache.redis;
        tracing::info!("Connecting to Redis at {}", redact_url(&redis.url));

        let mut cfg = DeadpoolConfig::from_url(redis.url.as_str());
        let timeout = Duration::from_secs(redis.pool.timeout_seconds);
        cfg.pool = Some(PoolConfig {
            max_size: redis.pool.max_size,
            timeouts: Timeouts {
                wait: Some(timeout),
                create: Some(timeout),
                recycle: Some(timeout),
            },
            queue_mode: QueueMode::Fifo,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| PawFinderError::PoolCreation(e.to_string()))?;

        // Test the connection
        let mut conn = pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!("Redis connection established");

        Ok(Self {
            pool: Arc::new(pool),
            default_ttl: config.cache_ttl(),
        })
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    pub async fn get_cached_answer(&self, question: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(answer_key(question)).await?;
        Ok(value)
    }

    pub async fn set_cached_answer(&self, question: &str, answer: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.get_connection().await?;
        // SET EX rejects 0, and a sub-second TTL should still expire
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(answer_key(question), answer, seconds)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AnswerCache for RedisManager {
    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    async fn get(&self, question: &str) -> Option<String> {
        match self.get_cached_answer(question).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Redis cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    async fn set_with_ttl(&self, question: &str, value: &str, ttl: Duration) {
        if let Err(e) = self.set_cached_answer(question, value, ttl).await {
            tracing::warn!("Redis cache write failed: {}", e);
        }
    }
}

fn answer_key(question: &str) -> String {
    format!("answer:{}", cache_key(question))
}

/// Hide the password part of a redis URL for logging
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_key_is_namespaced_hash() {
        let key = answer_key(" Hello ");
        assert!(key.starts_with("answer:"));
        assert_eq!(key, answer_key("hello"));
    }

    #[test]
    fn test_redact_url_hides_credentials() {
        assert_eq!(
            redact_url("redis://:s3cret@cache.local:6379/0"),
            "redis://***@cache.local:6379/0"
        );
        assert_eq!(redact_url("redis://127.0.0.1:6379/0"), "redis://127.0.0.1:6379/0");
    }

    #[tokio::test]
    async fn test_redis_round_trip() {
        // Only runs when a Redis server is provided
        if let Ok(url) = std::env::var("PAWFINDER_TEST_REDIS_URL") {
            let mut config = Config::default();
            config.cache.redis.url = url;
            let manager = match RedisManager::new_with_config(&config).await {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Failed to connect to Redis in test: {e}");
                    return;
                }
            };
            manager
                .set_with_ttl("Redis Question", "redis answer", Duration::from_secs(5))
                .await;
            assert_eq!(
                manager.get("redis question").await.as_deref(),
                Some("redis answer")
            );
        }
    }
}
