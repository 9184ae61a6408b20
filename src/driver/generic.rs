use crate::config::SiteConfig;
use crate::driver::price::format_pl_price;
use crate::driver::{Classification, ExtractedFields, FetchedPage, PageOutcome, SiteDriver};
use crate::session::{StockStatus, WorkItem};
use crate::ConfigError;
use scraper::{Html, Selector};
use serde_json::Value;

/// Smallest body a real product page can have
const MIN_PAGE_BYTES: usize = 1000;

/// Request header names echoed back by anti-bot interstitials
const HEADER_DUMP_MARKERS: &[&str] = &[
    "user-agent:",
    "accept-encoding:",
    "accept-language:",
    "referer:",
];

const JSON_LD: &str = r#"script[type="application/ld+json"]"#;

/// Selector-driven driver usable for any site
///
/// Price comes from schema.org `offers.price` in JSON-LD when present,
/// otherwise from the first element matching the site's price selector.
/// A configured out-of-stock phrase found in the stock element (or the whole
/// page) turns the result into a confirmed negative.
#[derive(Debug, Clone)]
pub struct GenericDriver {
    site: String,
    price: Selector,
    stock: Option<Selector>,
    json_ld: Selector,
    out_of_stock_markers: Vec<String>,
}

impl GenericDriver {
    pub fn from_site(site: &SiteConfig) -> Result<Self, ConfigError> {
        let price = parse_selector(&site.price_selector)?;
        let stock = site
            .stock_selector
            .as_deref()
            .map(parse_selector)
            .transpose()?;

        Ok(Self {
            site: site.name.clone(),
            price,
            stock,
            json_ld: parse_selector(JSON_LD)?,
            out_of_stock_markers: site
                .out_of_stock_markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        })
    }

    fn selector_price(&self, document: &Html) -> String {
        document
            .select(&self.price)
            .map(|el| format_pl_price(&el.text().collect::<String>()))
            .find(|p| !p.is_empty())
            .unwrap_or_default()
    }

    fn json_ld_price(&self, document: &Html) -> String {
        document
            .select(&self.json_ld)
            .filter_map(|el| serde_json::from_str::<Value>(&el.text().collect::<String>()).ok())
            .filter_map(|value| offer_price(&value))
            .map(|raw| format_pl_price(&raw))
            .find(|p| !p.is_empty())
            .unwrap_or_default()
    }

    fn is_out_of_stock(&self, document: &Html) -> bool {
        if self.out_of_stock_markers.is_empty() {
            return false;
        }

        let text = match &self.stock {
            Some(selector) => document
                .select(selector)
                .map(|el| el.text().collect::<String>())
                .collect::<Vec<_>>()
                .join(" "),
            None => document.root_element().text().collect::<String>(),
        }
        .to_lowercase();

        self.out_of_stock_markers.iter().any(|m| text.contains(m))
    }
}

impl SiteDriver for GenericDriver {
    fn classify(&self, page: &FetchedPage) -> Classification {
        let outcome = match page.status {
            404 | 410 => PageOutcome::NotFound,
            429 => PageOutcome::RateLimited,
            500 | 502 | 504 => PageOutcome::Error,
            200..=299 if is_validation_page(&page.body) => PageOutcome::Blocked,
            200..=299 => PageOutcome::Ok,
            _ => PageOutcome::Blocked,
        };

        if outcome != PageOutcome::Ok {
            tracing::debug!(
                site = %self.site,
                status = page.status,
                bytes = page.body.len(),
                outcome = ?outcome,
                "Response not usable"
            );
        }

        Classification::new(outcome, page.status)
    }

    fn extract_fields(&self, page: &FetchedPage, item: &WorkItem) -> ExtractedFields {
        let document = Html::parse_document(&page.body);

        if self.is_out_of_stock(&document) {
            return ExtractedFields {
                price: "0.00".to_string(),
                stock_status: StockStatus::OutStock,
            };
        }

        let mut price = self.json_ld_price(&document);
        if price.is_empty() {
            price = self.selector_price(&document);
        }

        if price.is_empty() {
            tracing::warn!(
                site = %self.site,
                identifier = %item.identifier(),
                url = %page.url,
                "No price found on product page"
            );
            return ExtractedFields {
                price,
                stock_status: StockStatus::Unknown,
            };
        }

        ExtractedFields {
            price,
            stock_status: StockStatus::InStock,
        }
    }
}

/// Heuristic for interstitials served with a success status
///
/// Tiny bodies, bodies echoing request headers, and bodies lacking both an
/// `<html` and a `<body` tag are not product pages.
pub fn is_validation_page(body: &str) -> bool {
    if body.len() < MIN_PAGE_BYTES {
        return true;
    }

    let lower = body.to_lowercase();
    if HEADER_DUMP_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }

    !(lower.contains("<html") && lower.contains("<body"))
}

/// Finds `offers.price` in a JSON-LD value, descending into arrays and `@graph`
fn offer_price(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(offer_price),
        Value::Object(map) => {
            if let Some(offers) = map.get("offers") {
                let offer = match offers {
                    Value::Array(list) => list.first()?,
                    other => other,
                };
                let price = offer.get("price").or_else(|| offer.get("lowPrice"))?;
                return match price {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                };
            }
            map.get("@graph").and_then(offer_price)
        }
        _ => None,
    }
}

fn parse_selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector(format!("'{}': {}", css, e)))
}
