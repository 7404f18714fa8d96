//! Statistics generation from a crawl report
//!
//! This module provides functionality for deriving and displaying crawl
//! statistics once a session has finished.

use std::collections::HashMap;

use crate::crawler::{CrawlPhase, CrawlReport};
use crate::state::PageStatus;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Crawl root
    pub base_url: String,

    /// Phase the session ended in
    pub phase: CrawlPhase,

    /// Total number of pages recorded
    pub total_pages: usize,

    /// Count of pages by status
    pub pages_by_status: HashMap<PageStatus, usize>,

    /// Pages touched by at least one retry round
    pub retried_pages: usize,

    /// Pages that failed first and later recovered
    pub recovered_pages: usize,

    /// Pages still failing at the end
    pub unresolved_errors: usize,

    /// Failure reasons of unresolved pages, most common first
    pub error_reasons: Vec<(String, usize)>,

    /// Wall-clock duration, if the crawl has finished
    pub duration_seconds: Option<i64>,
}

impl CrawlStatistics {
    /// Derives statistics from a report
    pub fn from_report(report: &CrawlReport) -> Self {
        let mut pages_by_status = HashMap::new();
        let mut reasons: HashMap<&str, usize> = HashMap::new();

        for page in &report.pages {
            *pages_by_status.entry(page.status).or_insert(0) += 1;

            if page.status.is_error() {
                let reason = page.error.as_deref().unwrap_or("unknown");
                *reasons.entry(reason).or_insert(0) += 1;
            }
        }

        let mut error_reasons: Vec<(String, usize)> = reasons
            .into_iter()
            .map(|(reason, count)| (reason.to_string(), count))
            .collect();
        error_reasons.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            base_url: report.base_url.clone(),
            phase: report.phase,
            total_pages: report.pages.len(),
            retried_pages: report.pages.iter().filter(|p| p.retry_count > 0).count(),
            recovered_pages: report.pages.iter().filter(|p| p.retried_at.is_some()).count(),
            unresolved_errors: report.error_summary.len(),
            pages_by_status,
            error_reasons,
            duration_seconds: report
                .finished_at
                .map(|finished| (finished - report.started_at).num_seconds()),
        }
    }

    /// Number of pages with the given status
    pub fn count(&self, status: PageStatus) -> usize {
        self.pages_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Percentage of pages fetched without error
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        let ok = self.count(PageStatus::Success) + self.count(PageStatus::NonHtml);
        ok as f64 / self.total_pages as f64 * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Root: {}", stats.base_url);
    println!("  Outcome: {}", stats.phase);
    println!("  Total pages: {}", stats.total_pages);
    if let Some(seconds) = stats.duration_seconds {
        println!("  Duration: {}s", seconds);
    }
    println!();

    println!("Pages by Status:");
    for status in [PageStatus::Success, PageStatus::NonHtml, PageStatus::Error] {
        let count = stats.count(status);
        let percentage = if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!("Retries:");
    println!("  Pages retried: {}", stats.retried_pages);
    println!("  Pages recovered: {}", stats.recovered_pages);
    println!();

    if !stats.error_reasons.is_empty() {
        println!("Unresolved Errors ({}):", stats.unresolved_errors);
        for (reason, count) in &stats.error_reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched without error)",
        stats.success_rate(),
        stats.total_pages - stats.count(PageStatus::Error),
        stats.total_pages
    );
}
