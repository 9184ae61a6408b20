//! Egress pool management
//!
//! A pool is one preferred egress point followed by public points parsed from
//! a listing service. Sessions hold a pool by value and replace it on refresh.

mod candidate;
mod listing;
mod pool;

use thiserror::Error;

pub use candidate::{EgressCandidate, EgressOrigin, EgressScheme};
pub use listing::{parse_listing, HttpListingSource, ListingSource};
pub use pool::{EgressPool, PoolSettings};

/// Errors raised while acquiring or using egress points
#[derive(Debug, Error)]
pub enum EgressError {
    /// The listing service could not be reached or refused to answer
    #[error("Listing service unavailable: {0}")]
    ListingUnavailable(String),

    #[error("Failed to build HTTP client for {candidate}: {message}")]
    Client { candidate: String, message: String },
}
