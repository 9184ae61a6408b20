//! Public egress listing: retrieval and parsing
//!
//! The listing page publishes one egress point per table row. Two layouts are
//! in circulation, so the parser tries the striped/bordered table first and
//! falls back to `#proxylisttable` only when the first layout yields nothing.

use crate::config::FetchConfig;
use crate::egress::candidate::EgressCandidate;
use crate::egress::EgressError;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::future::Future;

const PRIMARY_ROWS: &str = "table.table.table-striped.table-bordered tbody tr";
const FALLBACK_ROWS: &str = "table#proxylisttable tbody tr";

// Zero-based cell positions
const IP_COLUMN: usize = 0;
const PORT_COLUMN: usize = 1;
const HTTPS_COLUMN: usize = 6;

/// Source of raw listing pages
pub trait ListingSource {
    /// Fetches the listing page body
    ///
    /// Any transport failure or non-success status is reported as
    /// [`EgressError::ListingUnavailable`].
    fn fetch_listing(&self) -> impl Future<Output = Result<String, EgressError>> + Send;
}

/// Fetches the listing over plain HTTP, without any egress proxy
#[derive(Debug, Clone)]
pub struct HttpListingSource {
    client: Client,
    url: String,
}

impl HttpListingSource {
    pub fn new(url: impl Into<String>, fetch: &FetchConfig) -> Result<Self, EgressError> {
        let client = Client::builder()
            .timeout(fetch.request_timeout())
            .connect_timeout(fetch.connect_timeout())
            .gzip(true)
            .brotli(true)
            .no_proxy()
            .build()
            .map_err(|e| EgressError::Client {
                candidate: "listing".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl ListingSource for HttpListingSource {
    async fn fetch_listing(&self) -> Result<String, EgressError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| EgressError::ListingUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EgressError::ListingUnavailable(format!(
                "{} returned HTTP {}",
                self.url,
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| EgressError::ListingUnavailable(e.to_string()))
    }
}

/// Parses public candidates out of a listing page
///
/// Only rows with an IP, a numeric port and an explicit `yes` in the https
/// column are kept. Duplicates are dropped, first occurrence wins. Row order
/// is preserved; shuffling is the pool's job.
pub fn parse_listing(html: &str) -> Vec<EgressCandidate> {
    let document = Html::parse_document(html);

    let candidates = parse_rows(&document, PRIMARY_ROWS);
    if !candidates.is_empty() {
        return candidates;
    }

    let candidates = parse_rows(&document, FALLBACK_ROWS);
    if candidates.is_empty() {
        tracing::warn!("No https-capable candidates found in listing");
    }
    candidates
}

fn parse_rows(document: &Html, rows: &str) -> Vec<EgressCandidate> {
    let (Ok(row_selector), Ok(cell_selector)) = (Selector::parse(rows), Selector::parse("td"))
    else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut total = 0usize;
    let mut candidates = Vec::new();

    for row in document.select(&row_selector) {
        total += 1;
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();

        let Some(address) = row_address(&cells) else {
            continue;
        };

        let https = cells
            .get(HTTPS_COLUMN)
            .map(cell_text)
            .unwrap_or_default();
        if https != "yes" {
            continue;
        }

        if seen.insert(address.clone()) {
            candidates.push(EgressCandidate::public(address));
        }
    }

    tracing::debug!(
        rows = total,
        https = candidates.len(),
        "Parsed listing table"
    );
    candidates
}

fn row_address(cells: &[ElementRef]) -> Option<String> {
    let ip = cells.get(IP_COLUMN).map(cell_text)?;
    let port = cells.get(PORT_COLUMN).map(cell_text)?;

    if ip.is_empty() {
        return None;
    }
    port.parse::<u16>().ok().filter(|p| *p > 0)?;

    Some(format!("{}:{}", ip, port))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}
