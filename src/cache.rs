use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache key for a question: SHA-256 of the trimmed, lowercased text
pub fn cache_key(question: &str) -> String {
    let normalized = question.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Time-bounded store of answers keyed by normalized question
#[async_trait]
pub trait AnswerCache: Send + Sync {
    fn default_ttl(&self) -> Duration;

    async fn get(&self, question: &str) -> Option<String>;

    async fn set_with_ttl(&self, question: &str, value: &str, ttl: Duration);

    async fn set(&self, question: &str, value: &str) {
        self.set_with_ttl(question, value, self.default_ttl()).await
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
    last_used: Instant,
}

/// In-process cache with passive expiry and LRU eviction at capacity
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A poisoned map only means a panic mid-insert; the data is still usable
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up as of `now`; entries at or past their expiry are evicted
    pub(crate) fn get_at(&self, question: &str, now: Instant) -> Option<String> {
        let key = cache_key(question);
        let mut entries = self.lock();
        match entries.get_mut(&key) {
            Some(entry) if now < entry.expires_at => {
                entry.last_used = now;
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub(crate) fn set_at(&self, question: &str, value: &str, ttl: Duration, now: Instant) {
        let key = cache_key(question);
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, e| now < e.expires_at);
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(key = %oldest, "Evicting least recently used answer");
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value: value.to_string(),
                expires_at: now + ttl,
                last_used: now,
            },
        );
    }
}

#[async_trait]
impl AnswerCache for MemoryCache {
    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    async fn get(&self, question: &str) -> Option<String> {
        self.get_at(question, Instant::now())
    }

    async fn set_with_ttl(&self, question: &str, value: &str, ttl: Duration) {
        self.set_at(question, value, ttl, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_case_and_surrounding_whitespace() {
        assert_eq!(cache_key("  How often to BATHE? \n"), cache_key("how often to bathe?"));
        assert_ne!(cache_key("how often to bathe?"), cache_key("how often to bathe"));
        assert_eq!(cache_key("x").len(), 64);
    }

    #[tokio::test]
    async fn test_equivalent_questions_share_entry() {
        let cache = MemoryCache::new(Duration::from_secs(60), 10);
        cache.set("  What should a Beagle EAT? ", "Quality kibble.").await;
        assert_eq!(
            cache.get("what should a beagle eat?").await.as_deref(),
            Some("Quality kibble.")
        );
    }

    #[test]
    fn test_entry_expires_at_ttl_boundary() {
        let cache = MemoryCache::new(Duration::from_secs(60), 10);
        let t0 = Instant::now();
        let ttl = Duration::from_secs(30);
        cache.set_at("q", "a", ttl, t0);

        assert_eq!(cache.get_at("q", t0).as_deref(), Some("a"));
        assert_eq!(
            cache.get_at("q", t0 + ttl - Duration::from_millis(1)).as_deref(),
            Some("a")
        );
        assert_eq!(cache.get_at("q", t0 + ttl), None);
        // expired entry was evicted, not just hidden
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_set_overwrites_and_refreshes_expiry() {
        let cache = MemoryCache::new(Duration::from_secs(60), 10);
        let t0 = Instant::now();
        cache.set_at("q", "old", Duration::from_secs(10), t0);
        cache.set_at("Q ", "new", Duration::from_secs(10), t0 + Duration::from_secs(5));
        assert_eq!(
            cache.get_at("q", t0 + Duration::from_secs(12)).as_deref(),
            Some("new")
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_expired_then_least_recently_used() {
        let cache = MemoryCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        let sec = Duration::from_secs(1);

        cache.set_at("a", "1", Duration::from_secs(100), t0);
        cache.set_at("b", "2", Duration::from_secs(100), t0 + sec);
        // touch "a" so "b" becomes least recently used
        assert!(cache.get_at("a", t0 + 2 * sec).is_some());
        cache.set_at("c", "3", Duration::from_secs(100), t0 + 3 * sec);

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("b", t0 + 4 * sec).is_none());
        assert!(cache.get_at("a", t0 + 4 * sec).is_some());
        assert!(cache.get_at("c", t0 + 4 * sec).is_some());

        // an expired entry is dropped before any live one
        cache.set_at("short", "x", sec, t0 + 5 * sec);
        let later = t0 + 10 * sec;
        cache.set_at("d", "4", Duration::from_secs(100), later);
        assert_eq!(cache.len(), 2);
        let survivors = ["a", "c"]
            .iter()
            .filter(|k| cache.get_at(k, later).is_some())
            .count();
        assert_eq!(survivors, 1);
        assert!(cache.get_at("d", later).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_writers_last_writer_wins() {
        let cache = std::sync::Arc::new(MemoryCache::new(Duration::from_secs(60), 100));
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.set("same question", &format!("answer {i}")).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let value = cache.get("same question").await.unwrap();
        assert!(value.starts_with("answer "));
        assert_eq!(cache.len(), 1);
    }
}
