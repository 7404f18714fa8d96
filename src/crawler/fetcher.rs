//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client and its keep-alive pool
//! - Browser-like request headers and per-request user-agent rotation
//! - A short random delay before each request
//! - Classifying failures into stable, human-readable reasons
//!
//! A fetch never returns `Err`: every failure is captured in the
//! [`FetchResult`] so one bad page cannot abort its batch.

use std::error::Error as _;
use std::io;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, DNT,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{redirect::Policy, Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::crawler::parser::parse_html;
use crate::state::PageStatus;
use crate::url::extract_domain;

/// Maximum redirect hops followed for a single fetch
const MAX_REDIRECTS: usize = 10;

/// TCP keep-alive probe interval for pooled connections
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Why a fetch failed
///
/// The `Display` form is what ends up in `PageRecord::error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("timeout")]
    Timeout,

    #[error("DNS Error - Domain not found")]
    Dns,

    #[error("Connection Refused - Server not accepting connections")]
    ConnectionRefused,

    #[error("Connection Timeout - Could not connect to server")]
    ConnectTimeout,

    #[error("Connection Reset - Server closed connection")]
    ConnectionReset,

    #[error("SSL Certificate Error")]
    Tls,

    /// Non-2xx response
    #[error("{status} {reason}")]
    Http { status: u16, reason: String },

    #[error("{0}")]
    Other(String),
}

impl FetchFailure {
    /// Builds the failure for a non-success HTTP status
    pub fn from_status(status: StatusCode) -> Self {
        Self::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("HTTP Error").to_string(),
        }
    }

    /// Numeric HTTP status, for protocol failures
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the server is signalling that we are too fast
    pub fn is_rate_limit_signal(&self) -> bool {
        matches!(self.http_status(), Some(429) | Some(503))
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: String,

    /// Page title; the URL when there is none
    pub title: String,

    /// Followable links discovered on the page
    pub links: Vec<String>,

    pub status: PageStatus,

    pub error: Option<FetchFailure>,
}

impl FetchResult {
    /// A failed fetch of `url`
    pub fn failed(url: &str, failure: FetchFailure) -> Self {
        Self {
            url: url.to_string(),
            title: url.to_string(),
            links: Vec::new(),
            status: PageStatus::Error,
            error: Some(failure),
        }
    }

    /// A fetch of `url` that returned something other than HTML
    pub fn non_html(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: url.to_string(),
            links: Vec::new(),
            status: PageStatus::NonHtml,
            error: None,
        }
    }

    /// Human-readable failure reason
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Returns true if this result should make the crawl back off
    pub fn is_rate_limit_signal(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(FetchFailure::is_rate_limit_signal)
    }
}

/// Headers a regular browser sends on a top-level navigation
///
/// `Accept-Encoding` is left to the client so that the compression it
/// advertises always matches what it can decode.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers
}

/// Builds the HTTP client shared by every fetch
///
/// The client owns a keep-alive connection pool sized by
/// `[connection-pool]`, independent of crawl concurrency.
///
/// # Example
///
/// ```no_run
/// use sitewalk::config::Config;
/// use sitewalk::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .default_headers(browser_headers())
        .timeout(config.crawler.request_timeout())
        .connect_timeout(config.crawler.connect_timeout())
        .pool_max_idle_per_host(config.connection_pool.max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(
            config.connection_pool.idle_timeout_secs,
        ))
        .tcp_keepalive(TCP_KEEPALIVE)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
}

/// Performs single-page fetches for the crawl controller
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    user_agents: Vec<String>,
    jitter_min_ms: u64,
    jitter_max_ms: u64,
}

impl Fetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, config))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            user_agents: config.user_agent.pool.clone(),
            jitter_min_ms: config.crawler.jitter_min_ms,
            jitter_max_ms: config.crawler.jitter_max_ms,
        }
    }

    /// Picks the identity for the next request
    fn pick_user_agent(&self) -> Option<String> {
        self.user_agents.choose(&mut rand::thread_rng()).cloned()
    }

    /// Random delay applied before each request
    fn jitter(&self) -> Duration {
        let millis = if self.jitter_max_ms <= self.jitter_min_ms {
            self.jitter_min_ms
        } else {
            rand::thread_rng().gen_range(self.jitter_min_ms..=self.jitter_max_ms)
        };
        Duration::from_millis(millis)
    }

    /// Fetches a page and extracts its title and links
    ///
    /// # Request Flow
    ///
    /// 1. Sleep for a random jitter
    /// 2. GET with a rotated user agent (redirects followed, bounded timeout)
    /// 3. Non-2xx → `Error` with a status-derived reason
    /// 4. Non-HTML content type → `NonHtml`, no links
    /// 5. Parse the body; links are resolved against the final URL when the
    ///    redirect stayed on the root's host (the requested URL otherwise)
    ///    and filtered against `root`
    ///
    /// # Arguments
    ///
    /// * `url` - The normalized URL to fetch
    /// * `root` - The crawl root that bounds link discovery
    pub async fn fetch(&self, url: &str, root: &Url) -> FetchResult {
        let delay = self.jitter();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let target = match Url::parse(url) {
            Ok(target) => target,
            Err(e) => {
                return FetchResult::failed(url, FetchFailure::Other(format!("Invalid URL: {}", e)))
            }
        };

        let mut request = self.client.get(target.clone());
        if let Some(user_agent) = self.pick_user_agent() {
            request = request.header(USER_AGENT, user_agent);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let failure = classify_error(&e);
                tracing::debug!("Fetch failed for {}: {} ({})", url, failure, e);
                return FetchResult::failed(url, failure);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Fetch of {} returned HTTP {}", url, status.as_u16());
            return FetchResult::failed(url, FetchFailure::from_status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !content_type.contains("text/html") {
            tracing::debug!("Skipping non-HTML {} ({})", url, content_type);
            return FetchResult::non_html(url);
        }

        let final_url = response.url().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let failure = classify_error(&e);
                tracing::debug!("Reading body of {} failed: {}", url, failure);
                return FetchResult::failed(url, failure);
            }
        };

        let parsed = parse_html(&body, link_base(&final_url, &target, root), root);
        tracing::debug!("Fetched {} ({} links)", url, parsed.links.len());

        FetchResult {
            url: url.to_string(),
            title: parsed.title.unwrap_or_else(|| url.to_string()),
            links: parsed.links,
            status: PageStatus::Success,
            error: None,
        }
    }
}

/// Picks the URL relative links on a fetched page resolve against
///
/// A redirect that leaves the root's host would otherwise push every
/// relative link off-domain, so such pages keep the requested URL as base.
fn link_base<'a>(final_url: &'a Url, requested: &'a Url, root: &Url) -> &'a Url {
    if extract_domain(final_url) == extract_domain(root) {
        final_url
    } else {
        requested
    }
}

/// Finds the first I/O error kind in an error's source chain
fn io_error_kind(error: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = err.source();
    }
    None
}

/// Lowercased messages of the whole error chain
fn chain_text(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        text.push_str(": ");
        text.push_str(&err.to_string());
        source = err.source();
    }
    text.to_lowercase()
}

/// Maps a transport error onto a stable failure reason
fn classify_error(error: &reqwest::Error) -> FetchFailure {
    let text = chain_text(error);
    let kind = io_error_kind(error);

    let looks_like_dns = text.contains("dns error")
        || text.contains("failed to lookup address")
        || text.contains("name or service not known")
        || text.contains("no such host");
    let looks_like_tls =
        text.contains("certificate") || text.contains("tls") || text.contains("ssl");

    if error.is_connect() {
        if looks_like_dns {
            return FetchFailure::Dns;
        }
        match kind {
            Some(io::ErrorKind::ConnectionRefused) => return FetchFailure::ConnectionRefused,
            Some(io::ErrorKind::ConnectionReset) => return FetchFailure::ConnectionReset,
            Some(io::ErrorKind::TimedOut) => return FetchFailure::ConnectTimeout,
            _ => {}
        }
        if looks_like_tls {
            return FetchFailure::Tls;
        }
        if text.contains("connection refused") {
            return FetchFailure::ConnectionRefused;
        }
        if error.is_timeout() || text.contains("timed out") {
            return FetchFailure::ConnectTimeout;
        }
        return FetchFailure::Other(error.to_string());
    }

    if error.is_timeout() {
        return FetchFailure::Timeout;
    }

    match kind {
        Some(io::ErrorKind::ConnectionReset) | Some(io::ErrorKind::ConnectionAborted) => {
            return FetchFailure::ConnectionReset
        }
        Some(io::ErrorKind::TimedOut) => return FetchFailure::Timeout,
        _ => {}
    }

    if looks_like_tls {
        FetchFailure::Tls
    } else if text.contains("connection reset") {
        FetchFailure::ConnectionReset
    } else {
        FetchFailure::Other(error.to_string())
    }
}
