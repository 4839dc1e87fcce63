use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::providers::ProviderKind;

/// Main configuration structure for PawFinder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub providers: ProvidersConfig,
    pub predict: PredictConfig,
    pub orders: OrdersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub ttl_seconds: u64,
    /// Upper bound on in-memory entries before LRU eviction kicks in
    pub max_entries: usize,
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    /// Base delay in seconds; attempt n waits `base * 2^(n-1)`
    pub backoff_base: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Order in which configured providers are attempted
    pub priority: Vec<ProviderKind>,
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
    pub grok: GrokConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrokConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    /// REST endpoint of the breed classifier; prediction is disabled when unset
    pub inference_url: Option<String>,
    pub breed_data_dir: String,
    /// Minimum top-class probability (0.0-1.0) for a prediction to be accepted
    pub min_confidence: f32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    pub path: String,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = [".env", "../.env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!(
                "No .env file found in any expected location - continuing with env vars only"
            );
        }

        let config_path =
            env::var("PAWFINDER_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok());

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Apply overrides from a key lookup (the process environment in production)
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| -> Option<String> {
            lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };
        fn set<T: FromStr>(target: &mut T, raw: Option<String>) {
            if let Some(value) = raw.and_then(|r| r.parse().ok()) {
                *target = value;
            }
        }

        // Server
        if let Some(host) = parsed("PAWFINDER_HOST") {
            self.server.host = host;
        }
        set(&mut self.server.port, parsed("PORT"));

        // Cache
        set(&mut self.cache.ttl_seconds, parsed("CACHE_TTL_SECONDS"));
        set(&mut self.cache.max_entries, parsed("CACHE_MAX_ENTRIES"));
        if let Some(backend) = parsed("CACHE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "memory" => self.cache.backend = CacheBackend::Memory,
                "redis" => self.cache.backend = CacheBackend::Redis,
                other => tracing::warn!("Unknown CACHE_BACKEND '{}', keeping current", other),
            }
        }
        if let Some(url) = parsed("REDIS_URL") {
            self.cache.redis.url = url;
        }

        // OpenAI
        let openai = &mut self.providers.openai;
        if let Some(key) = parsed("OPENAI_API_KEY") {
            openai.api_key = key;
        }
        if let Some(model) = parsed("OPENAI_MODEL") {
            openai.model = model;
        }
        set(&mut openai.timeout_seconds, parsed("OPENAI_TIMEOUT_SECONDS"));
        set(&mut openai.retry.attempts, parsed("OPENAI_RETRY_ATTEMPTS"));
        set(&mut openai.retry.backoff_base, parsed("OPENAI_BACKOFF_BASE"));

        // Gemini
        let gemini = &mut self.providers.gemini;
        if let Some(key) = parsed("GEMINI_API_KEY") {
            gemini.api_key = key;
        }
        if let Some(model) = parsed("GEMINI_MODEL") {
            gemini.model = model;
        }
        if let Some(base) = parsed("GEMINI_API_BASE") {
            gemini.api_base = base;
        }
        set(&mut gemini.timeout_seconds, parsed("GEMINI_TIMEOUT_SECONDS"));
        set(&mut gemini.retry.attempts, parsed("GEMINI_RETRY_ATTEMPTS"));
        set(&mut gemini.retry.backoff_base, parsed("GEMINI_BACKOFF_BASE"));

        // Grok
        let grok = &mut self.providers.grok;
        if let Some(key) = parsed("GROK_API_KEY") {
            grok.api_key = key;
        }
        if let Some(url) = parsed("GROK_API_URL") {
            grok.api_url = url;
        }
        if let Some(model) = parsed("GROK_MODEL") {
            grok.model = model;
        }
        set(&mut grok.timeout_seconds, parsed("GROK_TIMEOUT_SECONDS"));
        set(&mut grok.retry.attempts, parsed("GROK_RETRY_ATTEMPTS"));
        set(&mut grok.retry.backoff_base, parsed("GROK_BACKOFF_BASE"));

        if let Some(order) = parsed("CHAT_PROVIDER_ORDER") {
            let priority = parse_priority(&order);
            if priority.is_empty() {
                tracing::warn!("CHAT_PROVIDER_ORDER '{}' names no known provider", order);
            } else {
                self.providers.priority = priority;
            }
        }

        // Prediction
        if let Some(url) = parsed("INFERENCE_URL") {
            self.predict.inference_url = Some(url);
        }
        if let Some(dir) = parsed("BREED_DATA_DIR") {
            self.predict.breed_data_dir = dir;
        }
        set(&mut self.predict.min_confidence, parsed("MIN_CONFIDENCE"));

        // Orders
        if let Some(path) = parsed("ORDERS_FILE") {
            self.orders.path = path;
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".into());
        }
        if self.cache.ttl_seconds == 0 {
            return Err("Cache TTL cannot be 0".into());
        }
        if self.cache.max_entries == 0 {
            return Err("Cache max_entries cannot be 0".into());
        }
        if !(0.0..=1.0).contains(&self.predict.min_confidence) {
            return Err("Minimum confidence must be between 0.0 and 1.0".into());
        }
        for (kind, retry) in [
            (ProviderKind::OpenAi, self.providers.openai.retry),
            (ProviderKind::Gemini, self.providers.gemini.retry),
            (ProviderKind::Grok, self.providers.grok.retry),
        ] {
            if retry.attempts == 0 {
                return Err(format!("{kind} retry attempts cannot be 0").into());
            }
            if retry.backoff_base < 0.0 {
                return Err(format!("{kind} backoff base cannot be negative").into());
            }
        }
        if self.configured_providers().is_empty() {
            return Err("No chat provider credentials set - chat will answer from fallback only".into());
        }
        Ok(())
    }

    /// Providers whose credentials are present, in priority order
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        self.providers
            .priority
            .iter()
            .copied()
            .filter(|kind| self.is_configured(*kind))
            .collect()
    }

    /// A provider is configured iff its credential (and for grok, its endpoint) is present
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAi => !self.providers.openai.api_key.is_empty(),
            ProviderKind::Gemini => !self.providers.gemini.api_key.is_empty(),
            ProviderKind::Grok => {
                !self.providers.grok.api_key.is_empty() && !self.providers.grok.api_url.is_empty()
            }
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse a comma separated provider list, dropping unknown and duplicate names
fn parse_priority(raw: &str) -> Vec<ProviderKind> {
    let mut out = Vec::new();
    for name in raw.split(',') {
        match name.trim().parse::<ProviderKind>() {
            Ok(kind) if !out.contains(&kind) => out.push(kind),
            Ok(_) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }
    out
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ttl_seconds: 3600,
            max_entries: 1024,
            redis: RedisConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            pool: PoolConfig::default(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 16,
            timeout_seconds: 5,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff_base: 1.0,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            priority: vec![ProviderKind::OpenAi, ProviderKind::Gemini, ProviderKind::Grok],
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            grok: GrokConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 20,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_seconds: 30,
            retry: RetryConfig {
                attempts: 3,
                backoff_base: 1.0,
            },
        }
    }
}

impl Default for GrokConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: String::new(),
            model: "grok-3-mini".to_string(),
            timeout_seconds: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            inference_url: None,
            breed_data_dir: "images/Images".to_string(),
            min_confidence: 0.35,
            timeout_seconds: 30,
        }
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            path: "orders.json".to_string(),
        }
    }
}
