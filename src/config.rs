use std::env;
use std::path::PathBuf;
use std::time::Duration;

use cricket_feed::CRICAPI_BASE;

/// Runtime settings, read once at startup from the process environment
/// (after `.env` has been loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub store_dir: String,
    pub db_name: String,
    pub cricket_api_key: String,
    pub cricket_api_base: String,
    pub telegram_bot_token: String,
    pub cors_origins: Vec<String>,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub live_update_iterations: u32,
    pub live_update_interval: Duration,
    pub broadcast_delay: Duration,
    pub bind: String,
    /// Empty disables the JSONL event log
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: "data".to_string(),
            db_name: "cricket_live".to_string(),
            cricket_api_key: String::new(),
            cricket_api_base: CRICAPI_BASE.to_string(),
            telegram_bot_token: String::new(),
            cors_origins: vec!["*".to_string()],
            cache_ttl: Duration::from_secs(30),
            http_timeout: Duration::from_secs(15),
            live_update_iterations: 5,
            live_update_interval: Duration::from_secs(30),
            broadcast_delay: Duration::from_millis(100),
            bind: "0.0.0.0:8001".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or unparseable values keep
    /// their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let secs = |key: &str, default: Duration| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            store_dir: get("STORE_DIR").unwrap_or(d.store_dir),
            db_name: get("DB_NAME").unwrap_or(d.db_name),
            cricket_api_key: get("CRICKET_API_KEY").unwrap_or(d.cricket_api_key),
            cricket_api_base: get("CRICKET_API_BASE").unwrap_or(d.cricket_api_base),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN")
                .map(|t| t.trim().to_string())
                .unwrap_or(d.telegram_bot_token),
            cors_origins: get("CORS_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or(d.cors_origins),
            cache_ttl: secs("CACHE_TTL_SECS", d.cache_ttl),
            http_timeout: secs("HTTP_TIMEOUT_SECS", d.http_timeout),
            live_update_iterations: get("LIVE_UPDATE_ITERATIONS")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(d.live_update_iterations),
            live_update_interval: secs("LIVE_UPDATE_INTERVAL_SECS", d.live_update_interval),
            broadcast_delay: get("BROADCAST_DELAY_MS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(d.broadcast_delay),
            bind: get("RELAY_BIND").unwrap_or(d.bind),
            log_dir: get("LOG_DIR").unwrap_or(d.log_dir),
        }
    }

    pub fn telegram_enabled(&self) -> bool {
        !self.telegram_bot_token.is_empty()
    }

    /// `None` means an in-memory store.
    pub fn db_path(&self) -> Option<PathBuf> {
        if self.store_dir == ":memory:" {
            return None;
        }
        Some(PathBuf::from(&self.store_dir).join(format!("{}.db", self.db_name)))
    }

    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();
    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}
