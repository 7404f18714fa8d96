//! Failure history for pages that errored
//!
//! The ledger is a small keyed store decoupled from the frontier. Its
//! attempt counts and cool-down timestamps decide which failed pages a retry
//! round may touch, which also keeps a struggling host from being hit twice
//! in quick succession for the same URL.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// Failure history of a single URL
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub url: String,

    /// Number of retry attempts made so far
    pub attempt_count: u32,

    /// When the primary pass first saw this URL fail
    pub first_failed_at: DateTime<Utc>,

    /// When the latest retry attempt finished (`None` if never retried)
    pub last_attempt_at: Option<DateTime<Utc>>,

    pub last_error: String,
}

impl FailureRecord {
    /// Checks whether this URL may be attempted in retry round `round`
    ///
    /// The URL must have fewer than `round` attempts and at least `cooldown`
    /// must have passed since its latest attempt.
    pub fn is_eligible(&self, round: u32, cooldown: Duration, now: DateTime<Utc>) -> bool {
        if self.attempt_count >= round {
            return false;
        }

        match self.last_attempt_at {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map(|elapsed| elapsed >= cooldown)
                .unwrap_or(false),
        }
    }
}

/// Keyed store of failure records, one per URL that ever failed
///
/// Records are retained for the life of a crawl, including after a page
/// recovers.
#[derive(Debug, Default, Clone)]
pub struct FailureLedger {
    records: HashMap<String, FailureRecord>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure seen by the primary pass
    ///
    /// Creates the record on first failure; a later call for the same URL
    /// only refreshes the error text.
    pub fn record_failure(&mut self, url: &str, error: &str, now: DateTime<Utc>) {
        self.records
            .entry(url.to_string())
            .and_modify(|record| record.last_error = error.to_string())
            .or_insert_with(|| FailureRecord {
                url: url.to_string(),
                attempt_count: 0,
                first_failed_at: now,
                last_attempt_at: None,
                last_error: error.to_string(),
            });
    }

    /// Records the outcome of retry round `round` for a URL
    ///
    /// `error` is `None` when the attempt succeeded, in which case the
    /// previous error text is kept for reference.
    pub fn record_attempt(&mut self, url: &str, round: u32, error: Option<&str>, now: DateTime<Utc>) {
        let record = self
            .records
            .entry(url.to_string())
            .or_insert_with(|| FailureRecord {
                url: url.to_string(),
                attempt_count: 0,
                first_failed_at: now,
                last_attempt_at: None,
                last_error: String::new(),
            });

        record.attempt_count = round;
        record.last_attempt_at = Some(now);
        if let Some(error) = error {
            record.last_error = error.to_string();
        }
    }

    /// Checks retry eligibility for `url` in round `round`
    ///
    /// URLs with no record have never been attempted and are eligible.
    pub fn is_eligible(&self, url: &str, round: u32, cooldown: Duration, now: DateTime<Utc>) -> bool {
        self.records
            .get(url)
            .map_or(true, |record| record.is_eligible(round, cooldown, now))
    }

    pub fn get(&self, url: &str) -> Option<&FailureRecord> {
        self.records.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.records.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
