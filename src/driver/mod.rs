//! Site drivers
//!
//! A driver knows how one site answers: which responses are block pages and
//! where price and availability live in a product page. The fetch session
//! only ever talks to sites through this trait.

mod generic;
mod headers;
mod price;

pub use generic::GenericDriver;
pub use headers::{browser_headers, UserAgentRotation, DEFAULT_USER_AGENTS};
pub use price::format_pl_price;

use crate::policy::ErrorClass;
use crate::session::{StockStatus, WorkItem};

/// A response as seen by a driver
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Verdict on a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Ok,
    Blocked,
    RateLimited,
    NotFound,
    /// Server-side failure worth retrying elsewhere
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub outcome: PageOutcome,
    pub status: u16,
}

impl Classification {
    pub fn new(outcome: PageOutcome, status: u16) -> Self {
        Self { outcome, status }
    }

    /// Failure class for the retry policy, `None` for a usable page
    pub fn error_class(&self) -> Option<ErrorClass> {
        match self.outcome {
            PageOutcome::Ok => None,
            PageOutcome::Blocked => Some(ErrorClass::Blocked),
            PageOutcome::RateLimited => Some(ErrorClass::RateLimited),
            PageOutcome::NotFound => Some(ErrorClass::NotFound),
            PageOutcome::Error => Some(ErrorClass::Transport),
        }
    }
}

/// Fields pulled out of a product page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    /// Two-decimal price, empty when not found
    pub price: String,
    pub stock_status: StockStatus,
}

/// Per-site classification and extraction strategy
pub trait SiteDriver {
    /// Decides whether a response is usable
    fn classify(&self, page: &FetchedPage) -> Classification;

    /// Extracts price and availability from a page classified as usable
    fn extract_fields(&self, page: &FetchedPage, item: &WorkItem) -> ExtractedFields;
}
