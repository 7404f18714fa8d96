//! Output module for generating crawl summaries and reports
//!
//! This module handles:
//! - Deriving statistics from a finished crawl report
//! - Printing statistics to the terminal
//! - Generating markdown summaries of crawl results
//!
//! Everything here is a read-only transform over a [`CrawlReport`](crate::CrawlReport).

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, CrawlStatistics};

use thiserror::Error;

/// Output-specific errors
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
