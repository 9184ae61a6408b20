//! Fetch sessions
//!
//! A session owns everything one site needs for a run: its egress pool,
//! retry counters, pacing and the results gathered so far. Nothing is shared
//! between sessions.

mod fetcher;
#[allow(clippy::module_inception)]
mod session;
mod types;

pub use fetcher::{build_http_client, Fetcher, HttpFetcher, TransportError};
pub use session::{FetchSession, SessionSettings};
pub use types::{FetchAttempt, ItemResult, SessionOutcome, SessionReport, StockStatus, WorkItem};
