//! Shelfwatch: resilient price and stock re-checking
//!
//! This crate re-checks prices and stock status for product URLs across many
//! retail sites. Each site runs as an isolated fetch session that rotates
//! through a pool of egress points (one preferred, many public), reacts to
//! block pages and rate limiting, and folds its results back into a shared
//! dataset with an idempotent merge.

pub mod config;
pub mod dataset;
pub mod driver;
pub mod egress;
pub mod policy;
pub mod reconcile;
pub mod session;
pub mod summary;
pub mod supervisor;
pub mod url;

use thiserror::Error;

/// Main error type for Shelfwatch operations
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Egress error: {0}")]
    Egress(#[from] egress::EgressError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] dataset::DatasetError),

    #[error("Run summary error: {0}")]
    Summary(#[from] summary::SummaryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("Worker for site {site} failed: {message}")]
    Worker { site: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Shelfwatch operations
pub type Result<T> = std::result::Result<T, ShelfError>;

// Re-export commonly used types
pub use config::Config;
pub use egress::{EgressCandidate, EgressOrigin, EgressPool, EgressScheme};
pub use policy::{Action, ErrorClass, RetryPolicy, Verdict};
pub use reconcile::{merge, MergeReport, Reconciler};
pub use session::{FetchSession, ItemResult, SessionOutcome, SessionReport, StockStatus, WorkItem};
pub use url::{normalize_key, strip_query};
