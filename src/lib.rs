//! Sitewalk: a single-domain breadth-first site crawler
//!
//! This crate enumerates the pages reachable inside one web domain, recording
//! each page's title and link health. The engine adapts its parallelism to the
//! target's behaviour and retries failed pages in bounded rounds before
//! handing the final page list to its caller.

pub mod config;
pub mod crawler;
pub mod output;
pub mod registry;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sitewalk operations
///
/// Page-level fetch failures never surface here; they are recorded on the
/// page itself. These errors only stop a crawl from being started.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    #[error("max_pages must be at least 1, got {0}")]
    InvalidMaxPages(usize),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Sitewalk operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    crawl, CrawlHandle, CrawlPhase, CrawlProgress, CrawlReport, CrawlStatus, Crawler,
};
pub use registry::{SessionId, SessionRegistry};
pub use state::{FailureLedger, FailureRecord, PageRecord, PageStatus};
pub use url::{is_crawlable, normalize, same_domain};
