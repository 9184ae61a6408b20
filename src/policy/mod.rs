//! Retry policy
//!
//! Pure decision logic mapping a classified failure and the session's
//! counters to the next action. Nothing here sleeps or performs I/O; delays
//! are returned to the session, which applies jitter and waits.

mod backoff;

pub use backoff::{exponential, jitter, jitter_with, spread, uniform_between, JITTER_SPREAD};

use crate::config::{EgressConfig, SiteConfig};
use std::time::Duration;

/// Failure classes produced by response classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Block or validation page, or a refused status
    Blocked,
    /// The site asked us to slow down
    RateLimited,
    /// Connection, proxy, TLS or timeout failure
    Transport,
    /// The product page no longer exists
    NotFound,
}

/// What an abandoned item reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// `0.00` and `OutStock`
    ConfirmedNegative,
    /// Empty fields, to be retried on a later run
    Unknown,
}

/// Next step for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Same item, same candidate, after `delay` (jitter applied by the caller)
    RetrySame { delay: Duration },
    /// Same item, next candidate in the pool, after `delay`
    Rotate { delay: Duration },
    /// Same item on a freshly acquired pool, cursor back at 0
    RefreshPool,
    /// Emit a result for the item and move on
    AbandonItem(Verdict),
    /// Stop the session and hand over the results gathered so far
    AbortSession,
}

/// Attempts made for the current item, the failing one included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemAttempts {
    pub total: u32,
    pub rate_limited: u32,
}

/// How the session currently reaches the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the candidate at `index` of a pool of `len`
    Pool { index: usize, len: usize },
    /// Direct fetches, used when the listing service is unavailable
    Direct,
}

/// Retry limits for one site session
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub rate_limit_retries: u32,
    pub rate_limit_base_delay: Duration,
    pub between_retries_delay: Duration,
    pub max_candidates: usize,
    pub max_global_refreshes: u32,
}

impl RetryPolicy {
    pub fn for_site(site: &SiteConfig, egress: &EgressConfig) -> Self {
        Self {
            rate_limit_retries: site.rate_limit_retries,
            rate_limit_base_delay: site.rate_limit_base_delay(),
            between_retries_delay: site.between_retries_delay(),
            max_candidates: egress.max_candidates,
            max_global_refreshes: egress.max_global_refreshes,
        }
    }

    /// Most fetches a single item may consume
    pub fn item_ceiling(&self) -> u32 {
        let candidates = u32::try_from(self.max_candidates).unwrap_or(u32::MAX);
        candidates.saturating_mul(self.max_global_refreshes).max(1)
    }

    /// Decides what to do after a failed fetch
    ///
    /// # Decision order
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | NotFound | abandon, confirmed negative |
    /// | item ceiling reached | abandon, unknown |
    /// | RateLimited within budget | retry same after `base × 2^n` |
    /// | RateLimited over budget | abandon, confirmed negative |
    /// | direct route | abandon, unknown |
    /// | candidates left past the cursor | rotate |
    /// | refresh ceiling reached | abort session |
    /// | otherwise | refresh pool |
    pub fn decide(
        &self,
        class: ErrorClass,
        attempts: &ItemAttempts,
        route: Route,
        global_refreshes: u32,
    ) -> Action {
        if class == ErrorClass::NotFound {
            return Action::AbandonItem(Verdict::ConfirmedNegative);
        }

        if attempts.total >= self.item_ceiling() {
            return Action::AbandonItem(Verdict::Unknown);
        }

        if class == ErrorClass::RateLimited {
            return if attempts.rate_limited <= self.rate_limit_retries {
                let n = attempts.rate_limited.saturating_sub(1);
                Action::RetrySame {
                    delay: exponential(self.rate_limit_base_delay, n),
                }
            } else {
                Action::AbandonItem(Verdict::ConfirmedNegative)
            };
        }

        match route {
            Route::Direct => Action::AbandonItem(Verdict::Unknown),
            Route::Pool { index, len } if index + 1 < len => Action::Rotate {
                delay: self.between_retries_delay,
            },
            Route::Pool { .. } if global_refreshes >= self.max_global_refreshes => {
                Action::AbortSession
            }
            Route::Pool { .. } => Action::RefreshPool,
        }
    }
}
