use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitewalk::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether `url` lives on exactly the same host as `base`
///
/// Subdomains and parent domains do not match. Ports are ignored, and a
/// relative `url` is resolved against `base` first. Unparsable input is
/// never on the same domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitewalk::url::same_domain;
///
/// let base = Url::parse("https://x.com").unwrap();
/// assert!(same_domain("https://x.com/p", &base));
/// assert!(!same_domain("https://sub.x.com/p", &base));
/// ```
pub fn same_domain(url: &str, base: &Url) -> bool {
    let Ok(parsed) = base.join(url) else {
        return false;
    };

    match (extract_domain(&parsed), extract_domain(base)) {
        (Some(host), Some(base_host)) => host == base_host,
        _ => false,
    }
}
