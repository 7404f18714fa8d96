//! Page records produced by the crawl
//!
//! A record is created the first time a URL is fetched and is only ever
//! rewritten in place by the retry subsystem.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::crawler::FetchResult;

/// Outcome of the most recent fetch of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// HTML page fetched and parsed
    Success,

    /// Fetched, but the content type is not HTML
    NonHtml,

    /// Transport or protocol failure
    Error,
}

impl PageStatus {
    /// Returns true if the page was fetched without error
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success | Self::NonHtml)
    }

    /// Returns true if this represents a failed fetch
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Stable string form used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NonHtml => "non_html",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A page discovered and fetched during a crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    /// Normalized URL; unique within a crawl
    pub url: String,

    /// Page title, or the URL when the page has none
    pub title: String,

    pub status: PageStatus,

    /// Human-readable reason of the latest failure
    pub error: Option<String>,

    /// Retry round that last touched this page (0 if never retried)
    pub retry_count: u32,

    pub discovered_at: DateTime<Utc>,

    pub retried_at: Option<DateTime<Utc>>,
}

impl PageRecord {
    /// Builds the record for a URL's first fetch
    pub fn from_fetch(result: &FetchResult, now: DateTime<Utc>) -> Self {
        Self {
            url: result.url.clone(),
            title: result.title.clone(),
            status: result.status,
            error: result.error_message(),
            retry_count: 0,
            discovered_at: now,
            retried_at: None,
        }
    }

    /// Folds the outcome of a retry attempt into this record
    ///
    /// A recovered page takes the new title and status and is stamped with
    /// the retry time; `discovered_at` never changes. A page that failed
    /// again only has its error and retry count updated.
    pub fn apply_retry(&mut self, result: &FetchResult, round: u32, now: DateTime<Utc>) {
        self.retry_count = round;

        if result.status.is_ok() {
            self.title = result.title.clone();
            self.status = result.status;
            self.error = None;
            self.retried_at = Some(now);
        } else {
            self.error = result.error_message();
        }
    }
}
