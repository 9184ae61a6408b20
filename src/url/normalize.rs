use crate::UrlError;
use url::Url;

/// Derives the dataset matching key for a product URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Lowercase the whole string (path and query included)
/// 3. Strip every trailing `/`
///
/// The key is a plain string transformation on purpose: dataset cells hold
/// URLs exactly as people pasted them, so parsing would reject rows that
/// still need to be matched.
///
/// # Examples
///
/// ```
/// use shelfwatch::url::normalize_key;
///
/// assert_eq!(normalize_key("  https://X.pl/P/1/ "), "https://x.pl/p/1");
/// ```
pub fn normalize_key(url: &str) -> String {
    url.trim().to_lowercase().trim_end_matches('/').to_string()
}

/// Drops everything from the first `?` onwards
///
/// # Examples
///
/// ```
/// use shelfwatch::url::strip_query;
///
/// assert_eq!(strip_query("https://x.pl/p/1?ref=abc"), "https://x.pl/p/1");
/// assert_eq!(strip_query("https://x.pl/p/1"), "https://x.pl/p/1");
/// ```
pub fn strip_query(url: &str) -> &str {
    match url.split_once('?') {
        Some((base, _)) => base,
        None => url,
    }
}

/// Parses a product URL, accepting only http and https targets with a host
pub fn parse_product_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
