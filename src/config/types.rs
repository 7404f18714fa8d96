use serde::Deserialize;
use std::time::Duration;

/// Browser identities rotated across requests
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Main configuration structure for Sitewalk
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub retry: RetryConfig,
    #[serde(rename = "connection-pool")]
    pub connection_pool: ConnectionPoolConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub sessions: SessionConfig,
}

/// Crawl loop and fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Page cap used when the caller does not supply one
    pub max_pages: usize,

    /// Whole-request budget for a single fetch (seconds)
    pub request_timeout_secs: u64,

    /// TCP/TLS connect budget (seconds)
    pub connect_timeout_secs: u64,

    /// Lower bound of the random pre-request delay (milliseconds)
    pub jitter_min_ms: u64,

    /// Upper bound of the random pre-request delay (milliseconds)
    pub jitter_max_ms: u64,

    /// Concurrency never drops below this while backing off
    pub min_concurrency: usize,

    /// Fixed baseline concurrency; detected from the host when absent
    pub baseline_concurrency: Option<usize>,

    /// Ceiling for the inter-batch backoff delay (milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 10_000,
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
            jitter_min_ms: 10,
            jitter_max_ms: 50,
            min_concurrency: 10,
            baseline_concurrency: None,
            max_backoff_ms: 5_000,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Retry subsystem behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Number of retry rounds after the primary pass
    pub max_rounds: u32,

    /// Gap between sub-batches and rounds, and the per-URL cool-down (milliseconds)
    pub cooldown_ms: u64,

    /// URLs fetched together in one retry sub-batch
    pub sub_batch_size: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            cooldown_ms: 5_000,
            sub_batch_size: 50,
        }
    }
}

impl RetryConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Keep-alive connection pool shared by every fetch
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConnectionPoolConfig {
    /// Idle connections kept per host
    pub max_idle_per_host: usize,

    /// How long an idle connection is kept (seconds)
    pub idle_timeout_secs: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 200,
            idle_timeout_secs: 30,
        }
    }
}

/// Client identities rotated per request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub pool: Vec<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            pool: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}

/// Session registry lifecycle
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Age after which a finished session is dropped (seconds)
    pub ttl_secs: u64,

    /// How often expired sessions are purged (seconds)
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3_600,
            cleanup_interval_secs: 300,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}
