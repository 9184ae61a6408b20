//! URL handling module for Shelfwatch
//!
//! Product URLs are matched against dataset rows by a normalized key, with a
//! query-stripped fallback for rows whose links carry tracking parameters.

mod normalize;

pub use normalize::{normalize_key, parse_product_url, strip_query};

/// Normalized key with the query part removed
///
/// Used by the reconciler's fallback match: `https://x.pl/p/1?ref=abc` and
/// `https://X.pl/p/1/` both reduce to `https://x.pl/p/1`.
pub fn base_key(url: &str) -> String {
    normalize_key(strip_query(url.trim()))
}
