//! State module for tracking crawl results
//!
//! # Components
//!
//! - `PageRecord`: One fetched page, keyed by its normalized URL
//! - `PageStatus`: Outcome of the latest fetch of a page
//! - `FailureLedger`: Per-URL failure history that gates retry eligibility

mod failure;
mod page_record;

// Re-export main types
pub use failure::{FailureLedger, FailureRecord};
pub use page_record::{PageRecord, PageStatus};
