//! Retry subsystem
//!
//! After the primary pass drains, pages still in error are fetched again in
//! a bounded number of rounds. Each round works through its eligible URLs in
//! fixed-size sub-batches separated by a cool-down, and rounds are separated
//! by the same cool-down, so a struggling host is given room to recover.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::crawler::coordinator::Coordinator;
use crate::crawler::fetcher::FetchResult;
use crate::crawler::session::CrawlPhase;
use crate::state::FailureLedger;

/// Picks the URLs retry round `round` may attempt
///
/// `failed_urls` are the pages currently in error status, in page order. A
/// URL is eligible when the ledger allows it for this round.
pub fn select_eligible(
    failed_urls: Vec<String>,
    ledger: &FailureLedger,
    round: u32,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Vec<String> {
    failed_urls
        .into_iter()
        .filter(|url| ledger.is_eligible(url, round, cooldown, now))
        .collect()
}

impl Coordinator {
    /// Runs every retry round
    pub(super) async fn retry_failed_pages(&mut self) {
        let max_rounds = self.retry.max_rounds;
        if max_rounds == 0 {
            return;
        }

        let cooldown = self.retry.cooldown();
        let sub_batch_size = self.retry.sub_batch_size.max(1);
        self.session.set_phase(CrawlPhase::Retrying);

        'rounds: for round in 1..=max_rounds {
            if round > 1 {
                tokio::time::sleep(cooldown).await;
            }
            if !self.session.is_running() {
                break;
            }

            let eligible = select_eligible(
                self.session.error_urls(),
                &self.failures,
                round,
                cooldown,
                Utc::now(),
            );

            if eligible.is_empty() {
                tracing::info!("No pages eligible for retry round {}; done retrying", round);
                break;
            }

            tracing::info!(
                "Retry round {}/{}: {} pages in sub-batches of {}",
                round,
                max_rounds,
                eligible.len(),
                sub_batch_size
            );

            let mut recovered = 0;
            for (i, sub_batch) in eligible.chunks(sub_batch_size).enumerate() {
                if i > 0 {
                    tokio::time::sleep(cooldown).await;
                    if !self.session.is_running() {
                        break 'rounds;
                    }
                }

                let results = self.fetch_all(sub_batch).await;
                let now = Utc::now();
                for result in results {
                    if self.apply_retry_result(result, round, now) {
                        recovered += 1;
                    }
                }

                self.session.set_pages_queued(self.frontier.size());
                self.emit_progress();
            }

            tracing::info!(
                "Retry round {} recovered {} of {} pages",
                round,
                recovered,
                eligible.len()
            );
        }

        let remaining = self.session.progress().errors;
        if remaining > 0 {
            tracing::info!("{} pages still failing after retries", remaining);
        }
    }

    /// Folds one retry result into the ledger, the page list and the frontier
    ///
    /// Returns true if the page recovered.
    fn apply_retry_result(&mut self, result: FetchResult, round: u32, now: DateTime<Utc>) -> bool {
        let error = result.error_message();
        self.failures
            .record_attempt(&result.url, round, error.as_deref(), now);

        if let Some(&index) = self.page_index.get(&result.url) {
            self.session
                .update_page(index, |page| page.apply_retry(&result, round, now));
        }

        if result.status.is_ok() {
            // Recorded for later sessions; this retry pass does not crawl them
            self.frontier.extend(&result.links);
            tracing::debug!("Recovered {} in retry round {}", result.url, round);
            true
        } else {
            tracing::debug!(
                "Retry {} of {} failed: {}",
                round,
                result.url,
                error.unwrap_or_default()
            );
            false
        }
    }
}
