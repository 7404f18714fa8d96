//! HTML parser for extracting the title and crawlable links
//!
//! Every link is pushed through the URL normalizer, so what comes out of
//! this module is ready to hand to the frontier.

use scraper::{Html, Selector};
use url::Url;

use crate::url::{is_crawlable, normalize, same_domain};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Trimmed text of the first `<title>`, if non-empty
    pub title: Option<String>,

    /// Normalized, same-domain, crawlable links in document order
    pub links: Vec<String>,
}

/// Parses HTML content and extracts the title and followable links
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anchors that resolve to a page on exactly
/// the crawl root's host.
///
/// **Exclude:**
/// - Fragment-only links (`#section`)
/// - `javascript:`, `mailto:`, `tel:` links
/// - Links that fail to normalize
/// - Links to other hosts, subdomains included
/// - Links to non-page resources (images, archives, fonts, ...)
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The page's own URL, used to resolve relative links
/// * `root` - The crawl root, used for the domain boundary
///
/// # Example
///
/// ```
/// use sitewalk::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page/">Link</a></body></html>"#;
/// let root = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &root, &root);
/// assert_eq!(parsed.title.as_deref(), Some("Test"));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, page_url: &Url, root: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, page_url, root),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, page_url: &Url, root: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| !is_skipped_href(href))
        .filter_map(|href| normalize(href, page_url))
        .filter(|url| same_domain(url, root) && is_crawlable(url))
        .collect()
}

/// Returns true for hrefs that never lead to another page
fn is_skipped_href(href: &str) -> bool {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();

    href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
}
