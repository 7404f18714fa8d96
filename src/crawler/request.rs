//! Validated crawl parameters

use url::Url;

use crate::url::base_url_from_domain;
use crate::{CrawlError, Result};

/// A `(domain, max_pages)` pair that has passed validation
///
/// The engine only ever starts from one of these, so a bad domain or a zero
/// page cap is rejected before any network activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    base_url: Url,
    max_pages: usize,
}

impl CrawlRequest {
    /// Validates a domain and page cap
    ///
    /// # Arguments
    ///
    /// * `domain` - Host name or URL; `https://` is assumed without a scheme
    /// * `max_pages` - Page cap for the primary pass, at least 1
    pub fn new(domain: &str, max_pages: usize) -> Result<Self> {
        let trimmed = domain.trim();

        if trimmed.is_empty() {
            return Err(CrawlError::InvalidDomain {
                domain: domain.to_string(),
                reason: "domain is empty".to_string(),
            });
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(CrawlError::InvalidDomain {
                domain: domain.to_string(),
                reason: "domain contains whitespace".to_string(),
            });
        }

        if max_pages == 0 {
            return Err(CrawlError::InvalidMaxPages(max_pages));
        }

        let base_url = base_url_from_domain(trimmed).map_err(|e| CrawlError::InvalidDomain {
            domain: domain.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base_url,
            max_pages,
        })
    }

    /// The crawl root
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }
}
