use url::Url;

/// File extensions that never point at a crawlable page
pub const SKIPPED_EXTENSIONS: &[&str] = &[
    // Images
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".bmp", ".tif", ".tiff",
    // Stylesheets and scripts
    ".css", ".js", ".mjs",
    // Documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    // Archives
    ".zip", ".rar", ".tar", ".gz", ".tgz", ".bz2", ".7z",
    // Media
    ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm", ".wav", ".ogg",
    // Fonts
    ".woff", ".woff2", ".ttf", ".eot", ".otf",
];

/// Checks whether a URL plausibly points at an HTML page
///
/// Only the path is inspected, so a query string cannot smuggle an
/// extension past the filter. Input that does not parse is checked as-is.
///
/// # Examples
///
/// ```
/// use sitewalk::url::is_crawlable;
///
/// assert!(is_crawlable("https://x.com/about"));
/// assert!(!is_crawlable("https://x.com/logo.PNG"));
/// ```
pub fn is_crawlable(url: &str) -> bool {
    let path = Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase());

    !SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
