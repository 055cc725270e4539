/// URL classification for bookmarking
use url::Url;

/// Schemes the browser uses for its own pages
pub const DEFAULT_INTERNAL_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "chrome-search",
    "chrome-untrusted",
    "devtools",
    "edge",
    "brave",
    "about",
    "view-source",
];

/// Lowercase scheme of a URL, or `None` if it does not parse
pub fn url_scheme(url: &str) -> Option<String> {
    Url::parse(url.trim()).ok().map(|u| u.scheme().to_string())
}

/// True if the URL points at one of the browser's internal pages
pub fn is_internal_url(url: &str, internal_schemes: &[String]) -> bool {
    match url_scheme(url) {
        Some(scheme) => internal_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&scheme)),
        None => false,
    }
}

/// True if the URL can be saved as a bookmark: it parses and is not internal
pub fn is_bookmarkable(url: &str, internal_schemes: &[String]) -> bool {
    url_scheme(url).is_some() && !is_internal_url(url, internal_schemes)
}
