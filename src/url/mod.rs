//! URL handling module for Sitewalk
//!
//! This module provides the URL normalizer used on every discovered link:
//! canonicalization, the exact-host domain boundary, and the filter that
//! rejects non-page resources. All three predicates are total: they run on
//! untrusted markup and must never panic.

mod domain;
mod filter;
mod normalize;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, same_domain};
pub use filter::{is_crawlable, SKIPPED_EXTENSIONS};
pub use normalize::normalize;

/// Turns user-supplied domain input into the crawl root URL
///
/// Input without a scheme is treated as `https://`. Only HTTP and HTTPS roots
/// with a host are accepted.
///
/// # Examples
///
/// ```
/// use sitewalk::url::base_url_from_domain;
///
/// let base = base_url_from_domain("example.com").unwrap();
/// assert_eq!(base.as_str(), "https://example.com/");
/// ```
pub fn base_url_from_domain(domain: &str) -> UrlResult<Url> {
    let domain = domain.trim();
    let candidate = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingDomain),
    }
}
