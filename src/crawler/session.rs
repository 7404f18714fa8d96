//! Shared crawl session state and the handle given to callers
//!
//! The coordinator is the only writer. Callers hold a [`CrawlHandle`] and
//! read point-in-time snapshots, or flip the running flag to request a stop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use url::Url;

use crate::state::PageRecord;

/// Lifecycle of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    /// Created, controller not yet running
    Idle,

    /// Primary breadth-first pass
    Running,

    /// Re-attempting failed pages
    Retrying,

    /// Finished normally
    Completed,

    /// Halted by a stop request
    Stopped,
}

impl CrawlPhase {
    /// Returns true once the session will make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrawlStatus {
    pub running: bool,
    pub pages_found: usize,
    pub pages_queued: usize,
    pub errors: usize,
}

/// Payload of the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrawlProgress {
    pub pages_found: usize,
    pub pages_queued: usize,
    pub errors: usize,
}

/// Invoked after every batch and every retry sub-batch
pub type ProgressCallback = Arc<dyn Fn(CrawlProgress) + Send + Sync>;

/// A page still failing when the crawl ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSummaryEntry {
    pub url: String,
    pub error: String,
    pub retry_count: u32,
}

/// Everything a caller needs once a crawl is over
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub base_url: String,
    pub phase: CrawlPhase,
    pub pages: Vec<PageRecord>,
    pub error_summary: Vec<ErrorSummaryEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Builds the error summary from a page list
fn summarize_errors(pages: &[PageRecord]) -> Vec<ErrorSummaryEntry> {
    pages
        .iter()
        .filter(|page| page.status.is_error())
        .map(|page| ErrorSummaryEntry {
            url: page.url.clone(),
            error: page.error.clone().unwrap_or_default(),
            retry_count: page.retry_count,
        })
        .collect()
}

/// State shared between the coordinator and every handle
#[derive(Debug)]
pub(crate) struct CrawlSession {
    base_url: Url,
    max_pages: usize,
    running: AtomicBool,
    pages_queued: AtomicUsize,
    pages: RwLock<Vec<PageRecord>>,
    phase: watch::Sender<CrawlPhase>,
    started_at: DateTime<Utc>,
    finished_at: RwLock<Option<DateTime<Utc>>>,
}

impl CrawlSession {
    pub(crate) fn new(base_url: Url, max_pages: usize) -> Self {
        let (phase, _) = watch::channel(CrawlPhase::Idle);
        Self {
            base_url,
            max_pages,
            running: AtomicBool::new(true),
            pages_queued: AtomicUsize::new(0),
            pages: RwLock::new(Vec::new()),
            phase,
            started_at: Utc::now(),
            finished_at: RwLock::new(None),
        }
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clears the running flag, returning whether it was still set
    pub(crate) fn clear_running(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn phase(&self) -> CrawlPhase {
        *self.phase.borrow()
    }

    pub(crate) fn set_phase(&self, phase: CrawlPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            tracing::info!("Crawl of {} is now {}", self.base_url, phase);
        }
    }

    /// Records the end of the crawl and publishes the terminal phase
    pub(crate) fn finish(&self, phase: CrawlPhase) {
        *self
            .finished_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        self.set_phase(phase);
    }

    pub(crate) fn set_pages_queued(&self, queued: usize) {
        self.pages_queued.store(queued, Ordering::SeqCst);
    }

    /// Appends a page, returning its index
    pub(crate) fn push_page(&self, record: PageRecord) -> usize {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        pages.push(record);
        pages.len() - 1
    }

    /// Rewrites the page at `index` in place
    pub(crate) fn update_page<F>(&self, index: usize, update: F)
    where
        F: FnOnce(&mut PageRecord),
    {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(page) = pages.get_mut(index) {
            update(page);
        }
    }

    pub(crate) fn page_count(&self) -> usize {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// URLs of pages currently in error status, in page order
    pub(crate) fn error_urls(&self) -> Vec<String> {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|page| page.status.is_error())
            .map(|page| page.url.clone())
            .collect()
    }

    pub(crate) fn progress(&self) -> CrawlProgress {
        let pages = self.pages.read().unwrap_or_else(PoisonError::into_inner);
        CrawlProgress {
            pages_found: pages.len(),
            pages_queued: self.pages_queued.load(Ordering::SeqCst),
            errors: pages.iter().filter(|p| p.status.is_error()).count(),
        }
    }
}

/// Caller-side handle to a running or finished crawl
///
/// Cloning is cheap; every clone observes the same session.
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    session: Arc<CrawlSession>,
}

impl CrawlHandle {
    pub(crate) fn new(session: Arc<CrawlSession>) -> Self {
        Self { session }
    }

    /// The crawl root
    pub fn base_url(&self) -> &Url {
        self.session.base_url()
    }

    pub fn max_pages(&self) -> usize {
        self.session.max_pages()
    }

    /// Returns whether the crawl is still dispatching work
    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Point-in-time counters, safe to call while the crawl runs
    pub fn status(&self) -> CrawlStatus {
        let progress = self.session.progress();
        CrawlStatus {
            running: self.session.is_running(),
            pages_found: progress.pages_found,
            pages_queued: progress.pages_queued,
            errors: progress.errors,
        }
    }

    /// Requests a cooperative halt
    ///
    /// No new batch is dispatched after this returns; fetches already in
    /// flight are allowed to finish.
    pub fn stop(&self) {
        if self.session.clear_running() {
            tracing::info!("Stop requested for crawl of {}", self.session.base_url());
        }
    }

    /// Snapshot of every page recorded so far, in completion order
    pub fn pages(&self) -> Vec<PageRecord> {
        self.session
            .pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pages currently in error status
    pub fn error_summary(&self) -> Vec<ErrorSummaryEntry> {
        let pages = self
            .session
            .pages
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        summarize_errors(&pages)
    }

    pub fn phase(&self) -> CrawlPhase {
        self.session.phase()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.session.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        *self
            .session
            .finished_at
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds a report from the current state
    pub fn report(&self) -> CrawlReport {
        let pages = self.pages();
        CrawlReport {
            base_url: self.session.base_url().to_string(),
            phase: self.phase(),
            error_summary: summarize_errors(&pages),
            pages,
            started_at: self.started_at(),
            finished_at: self.finished_at(),
        }
    }

    /// Waits until the crawl is completed or stopped
    pub async fn wait(&self) -> CrawlReport {
        let mut phase = self.session.phase.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here
        let _ = phase.wait_for(CrawlPhase::is_terminal).await;
        self.report()
    }
}
