//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier of pending URLs and its visited set
//! - HTTP fetching with browser-like headers and error classification
//! - HTML parsing and link extraction
//! - Adaptive concurrency and backoff
//! - Overall crawl coordination and the retry rounds that follow it

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod request;
mod retry;
pub(crate) mod session;
mod throttle;

pub use fetcher::{build_http_client, FetchFailure, FetchResult, Fetcher};
pub use frontier::Frontier;
pub use parser::{parse_html, ParsedPage};
pub use request::CrawlRequest;
pub use retry::select_eligible;
pub use session::{
    CrawlHandle, CrawlPhase, CrawlProgress, CrawlReport, CrawlStatus, ErrorSummaryEntry,
    ProgressCallback,
};
pub use throttle::{
    baseline_concurrency, detect_baseline_concurrency, AdaptiveThrottle, BatchOutcome,
    MIN_BASELINE_CONCURRENCY,
};

use std::sync::Arc;

use crate::config::{validate, Config};
use crate::Result;
use coordinator::Coordinator;
use session::CrawlSession;

/// Starts crawl sessions that share one HTTP client
///
/// The connection pool and the baseline concurrency are set up once here and
/// reused by every session this crawler starts.
#[derive(Debug, Clone)]
pub struct Crawler {
    config: Arc<Config>,
    fetcher: Arc<Fetcher>,
    baseline: usize,
}

impl Crawler {
    /// Creates a crawler from a configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Configuration valid and HTTP client built
    /// * `Err(CrawlError)` - Invalid configuration or client setup failure
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;

        let fetcher = Fetcher::new(&config)?;
        let baseline = match config.crawler.baseline_concurrency {
            Some(baseline) => {
                tracing::info!("Using configured baseline concurrency {}", baseline);
                baseline
            }
            None => detect_baseline_concurrency(),
        };

        Ok(Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            baseline,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Concurrency each session starts at
    pub fn baseline_concurrency(&self) -> usize {
        self.baseline
    }

    /// Starts crawling `domain` in the background
    ///
    /// Must be called from within a tokio runtime. The input is validated
    /// before anything is spawned.
    pub fn start(&self, domain: &str, max_pages: usize) -> Result<CrawlHandle> {
        let request = CrawlRequest::new(domain, max_pages)?;
        Ok(self.start_request(request, None))
    }

    /// Like [`Crawler::start`], invoking `callback` after every batch and
    /// every retry sub-batch
    pub fn start_with_progress<F>(
        &self,
        domain: &str,
        max_pages: usize,
        callback: F,
    ) -> Result<CrawlHandle>
    where
        F: Fn(CrawlProgress) + Send + Sync + 'static,
    {
        let request = CrawlRequest::new(domain, max_pages)?;
        Ok(self.start_request(request, Some(Arc::new(callback))))
    }

    /// Starts a crawl from an already validated request
    pub fn start_request(
        &self,
        request: CrawlRequest,
        on_progress: Option<ProgressCallback>,
    ) -> CrawlHandle {
        let session = Arc::new(CrawlSession::new(
            request.base_url().clone(),
            request.max_pages(),
        ));

        let throttle = AdaptiveThrottle::new(
            self.baseline,
            self.config.crawler.min_concurrency,
            self.config.crawler.max_backoff(),
        );

        let coordinator = Coordinator::new(
            Arc::clone(&session),
            Arc::clone(&self.fetcher),
            throttle,
            self.config.retry.clone(),
            on_progress,
        );

        tokio::spawn(coordinator.run());
        CrawlHandle::new(session)
    }
}

/// Runs a complete crawl operation
///
/// Convenience wrapper that starts a crawl and waits for it to finish.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `domain` - Domain or root URL to crawl
/// * `max_pages` - Page cap for the primary pass
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran to completion or was stopped
/// * `Err(CrawlError)` - The crawl could not be started
pub async fn crawl(config: Config, domain: &str, max_pages: usize) -> Result<CrawlReport> {
    let crawler = Crawler::new(config)?;
    let handle = crawler.start(domain, max_pages)?;
    Ok(handle.wait().await)
}
