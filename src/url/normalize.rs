use url::Url;

/// Normalizes a discovered link against a base URL
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base`; reject if malformed
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Remove the fragment
/// 4. Remove the whole query string
/// 5. Remove a single trailing slash, unless the path is the root `/`
///
/// Host case folding and dot-segment removal come from the WHATWG parser.
///
/// # Returns
///
/// * `Some(String)` - The normalized absolute URL
/// * `None` - The link could not be parsed or is not a web page URL
///
/// # Examples
///
/// ```
/// use sitewalk::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("https://x.com").unwrap();
/// assert_eq!(normalize("https://x.com/a?b=1#c", &base).as_deref(), Some("https://x.com/a"));
/// assert_eq!(normalize("/docs/", &base).as_deref(), Some("https://x.com/docs"));
/// ```
pub fn normalize(raw: &str, base: &Url) -> Option<String> {
    let mut url = base.join(raw.trim()).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;

    url.set_fragment(None);
    url.set_query(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path[..path.len() - 1].to_string();
        url.set_path(&trimmed);
    }

    Some(url.into())
}
