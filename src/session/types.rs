use crate::driver::ExtractedFields;
use crate::egress::EgressCandidate;
use crate::url::normalize_key;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Availability of a product
///
/// Serialized as `InStock`, `OutStock`, or an empty string when unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StockStatus {
    InStock,
    OutStock,
    #[default]
    Unknown,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "InStock",
            Self::OutStock => "OutStock",
            Self::Unknown => "",
        }
    }
}

impl FromStr for StockStatus {
    type Err = std::convert::Infallible;

    /// Lenient: dataset cells carry historical spellings like `Instock`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "instock" | "in stock" => Self::InStock,
            "outstock" | "outofstock" | "out of stock" => Self::OutStock,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StockStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StockStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or_default())
    }
}

/// A product URL to re-check, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    url: String,
    identifier: String,
    site: String,
    normalized_key: String,
}

impl WorkItem {
    pub fn new(
        url: impl Into<String>,
        identifier: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        let url = url.into().trim().to_string();
        let normalized_key = normalize_key(&url);
        Self {
            url,
            identifier: identifier.into(),
            site: site.into(),
            normalized_key,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn normalized_key(&self) -> &str {
        &self.normalized_key
    }
}

/// One fetch of one item through one route
///
/// Built fresh for every request and never stored.
#[derive(Debug, Clone, Copy)]
pub struct FetchAttempt<'a> {
    pub item: &'a WorkItem,
    /// `None` for a direct fetch
    pub candidate: Option<&'a EgressCandidate>,
    /// 1-based attempt number for this item
    pub attempt_for_item: u32,
    /// 1-based fetch number for the whole session
    pub attempt_for_site: u64,
}

/// Outcome for one work item
///
/// Empty price and stock mean "unknown, retry on a later run";
/// `0.00` with `OutStock` is a confirmed negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub url: String,
    pub identifier: String,
    pub site: String,
    pub price: String,
    pub stock_status: StockStatus,
}

impl ItemResult {
    pub fn from_fields(item: &WorkItem, fields: ExtractedFields) -> Self {
        Self {
            url: item.url().to_string(),
            identifier: item.identifier().to_string(),
            site: item.site().to_string(),
            price: fields.price,
            stock_status: fields.stock_status,
        }
    }

    pub fn confirmed_negative(item: &WorkItem) -> Self {
        Self::from_fields(
            item,
            ExtractedFields {
                price: "0.00".to_string(),
                stock_status: StockStatus::OutStock,
            },
        )
    }

    pub fn unknown(item: &WorkItem) -> Self {
        Self::from_fields(
            item,
            ExtractedFields {
                price: String::new(),
                stock_status: StockStatus::Unknown,
            },
        )
    }

    pub fn is_confirmed_negative(&self) -> bool {
        self.stock_status == StockStatus::OutStock && self.price == "0.00"
    }

    pub fn is_unknown(&self) -> bool {
        self.price.is_empty() && self.stock_status == StockStatus::Unknown
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    /// Every item was processed, or the degraded batch was exhausted
    Completed,
    /// The pool refresh ceiling was hit
    Aborted,
}

/// Everything a session hands to the reconciler and the run summary
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub site: String,
    pub results: Vec<ItemResult>,
    pub outcome: SessionOutcome,
    /// Pool refreshes performed, the initial acquisition excluded
    pub refreshes: u32,
    /// Fetches sent, retries included
    pub fetches: u64,
    /// Items left without a result because the session ran out of route
    pub skipped: usize,
    pub duration: Duration,
}

impl SessionReport {
    /// Report of a run that had nothing due
    pub fn empty(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            results: Vec::new(),
            outcome: SessionOutcome::Completed,
            refreshes: 0,
            fetches: 0,
            skipped: 0,
            duration: Duration::ZERO,
        }
    }

    pub fn items_processed(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == SessionOutcome::Completed && self.skipped == 0
    }
}
