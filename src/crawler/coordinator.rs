//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding and draining the frontier in breadth-first batches
//! - Fanning each batch out to the fetcher and joining it
//! - Folding results into the page list, the frontier and the failure ledger
//! - Feeding batch outcomes to the adaptive throttle
//! - Handing over to the retry subsystem and publishing the final phase

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};

use crate::config::RetryConfig;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::session::{CrawlPhase, CrawlSession, ProgressCallback};
use crate::crawler::throttle::{AdaptiveThrottle, BatchOutcome};
use crate::state::{FailureLedger, PageRecord};
use crate::url::normalize;

/// Main crawler coordinator structure
///
/// Owns the frontier and the failure ledger outright; the page list lives
/// in the shared session so handles can read it while the crawl runs.
pub struct Coordinator {
    pub(super) session: Arc<CrawlSession>,
    pub(super) frontier: Frontier,
    pub(super) failures: FailureLedger,
    pub(super) throttle: AdaptiveThrottle,
    pub(super) fetcher: Arc<Fetcher>,
    pub(super) retry: RetryConfig,
    pub(super) on_progress: Option<ProgressCallback>,

    /// Position of each URL in the session's page list
    pub(super) page_index: HashMap<String, usize>,
}

impl Coordinator {
    pub(crate) fn new(
        session: Arc<CrawlSession>,
        fetcher: Arc<Fetcher>,
        throttle: AdaptiveThrottle,
        retry: RetryConfig,
        on_progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            session,
            frontier: Frontier::new(),
            failures: FailureLedger::new(),
            throttle,
            fetcher,
            retry,
            on_progress,
            page_index: HashMap::new(),
        }
    }

    /// Runs the crawl to completion or until stopped
    ///
    /// 1. Seed the frontier with the crawl root
    /// 2. Drain the frontier in batches until it is empty, the page cap is
    ///    reached, or a stop is requested
    /// 3. Retry failed pages, unless stopped
    /// 4. Publish `Completed` or `Stopped`
    pub async fn run(mut self) {
        let root = self.session.base_url().clone();
        let seed = normalize(root.as_str(), &root).unwrap_or_else(|| root.to_string());
        self.frontier.enqueue_if_new(&seed);
        self.session.set_pages_queued(self.frontier.size());

        tracing::info!(
            "Starting crawl of {} (max {} pages, baseline concurrency {})",
            root,
            self.session.max_pages(),
            self.throttle.baseline()
        );

        let started = std::time::Instant::now();
        self.session.set_phase(CrawlPhase::Running);
        self.crawl_primary().await;

        if self.session.is_running() {
            self.retry_failed_pages().await;
        }

        // Still set means nobody asked us to stop
        let phase = if self.session.clear_running() {
            CrawlPhase::Completed
        } else {
            CrawlPhase::Stopped
        };

        let progress = self.session.progress();
        tracing::info!(
            "Crawl of {} {}: {} pages, {} errors, {} still queued in {:?}",
            root,
            phase,
            progress.pages_found,
            progress.errors,
            progress.pages_queued,
            started.elapsed()
        );

        self.session.finish(phase);
    }

    /// Primary breadth-first pass
    async fn crawl_primary(&mut self) {
        let max_pages = self.session.max_pages();

        while self.session.is_running()
            && !self.frontier.is_empty()
            && self.session.page_count() < max_pages
        {
            let delay = self.throttle.delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
                if !self.session.is_running() {
                    break;
                }
            }

            let batch = self.frontier.dequeue_batch(self.throttle.concurrency());
            self.session.set_pages_queued(self.frontier.size());
            tracing::debug!(
                "Dispatching batch of {} ({} queued)",
                batch.len(),
                self.frontier.size()
            );

            let results = self.fetch_all(&batch).await;
            let outcome = self.record_batch(results, Utc::now());

            self.throttle.observe(outcome);
            self.session.set_pages_queued(self.frontier.size());
            self.emit_progress();
        }

        if !self.session.is_running() {
            tracing::info!("Primary pass halted by stop request");
        } else if self.session.page_count() >= max_pages {
            tracing::info!("Page cap of {} reached", max_pages);
        }
    }

    /// Folds a finished batch into the session, returning its outcome
    fn record_batch(&mut self, results: Vec<FetchResult>, now: DateTime<Utc>) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            size: results.len(),
            errors: 0,
            rate_limited: false,
        };

        for result in results {
            if result.status.is_error() {
                outcome.errors += 1;
                outcome.rate_limited |= result.is_rate_limit_signal();
                let error = result.error_message().unwrap_or_default();
                self.failures.record_failure(&result.url, &error, now);
            } else {
                let added = self.frontier.extend(&result.links);
                tracing::trace!("{} yielded {} new links", result.url, added);
            }

            let index = self.session.push_page(PageRecord::from_fetch(&result, now));
            self.page_index.insert(result.url, index);
        }

        outcome
    }

    /// Fetches every URL concurrently and joins them
    ///
    /// Results come back in completion order. A failed fetch is just another
    /// result, so one bad URL never cancels its siblings.
    pub(super) async fn fetch_all(&self, urls: &[String]) -> Vec<FetchResult> {
        let root = self.session.base_url();

        let mut in_flight: FuturesUnordered<_> = urls
            .iter()
            .map(|url| self.fetcher.fetch(url, root))
            .collect();

        let mut results = Vec::with_capacity(urls.len());
        while let Some(result) = in_flight.next().await {
            results.push(result);
        }
        results
    }

    /// Publishes the current counters
    pub(super) fn emit_progress(&self) {
        let progress = self.session.progress();
        tracing::debug!(
            "Progress: {} found, {} queued, {} errors",
            progress.pages_found,
            progress.pages_queued,
            progress.errors
        );

        if let Some(callback) = &self.on_progress {
            callback(progress);
        }
    }
}

impl Drop for Coordinator {
    // A run that panics or is cancelled must still leave waiters a terminal phase
    fn drop(&mut self) {
        if self.session.phase().is_terminal() {
            return;
        }

        tracing::error!(
            "Crawl of {} ended without finishing, marking it stopped",
            self.session.base_url()
        );
        self.session.clear_running();
        self.session.finish(CrawlPhase::Stopped);
    }
}
