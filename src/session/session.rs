//! Fetch session
//!
//! Drives the work queue of one site through an explicit state machine:
//!
//! ```text
//! SelectEgress -> Fetching -> Classified -+-> Advance ---------> SelectEgress
//!                    ^                    +-> RetrySame -> Fetching
//!                    |                    +-> Rotate -----------> SelectEgress
//!                    |                    +-> RefreshPool ------> SelectEgress
//!                    |                    +-> AbandonItem -> Advance
//!                    |                    +-> AbortSession (end)
//! ```
//!
//! The active candidate survives `Advance`; only `Rotate` and `RefreshPool`
//! replace it.

use crate::config::{Config, SiteConfig};
use crate::driver::{ExtractedFields, SiteDriver};
use crate::egress::{EgressCandidate, EgressPool, ListingSource, PoolSettings};
use crate::policy::{
    jitter_with, uniform_between, Action, ErrorClass, ItemAttempts, RetryPolicy, Route, Verdict,
};
use crate::session::fetcher::Fetcher;
use crate::session::types::{
    FetchAttempt, ItemResult, SessionOutcome, SessionReport, WorkItem,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// Per-site knobs for a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub site: String,
    pub use_egress_pool: bool,
    /// Bounds of the random pause before every request, when enabled
    pub human_delay: Option<(Duration, Duration)>,
    pub between_items_delay: Duration,
    pub degraded_batch: usize,
    pub degraded_delay: Duration,
    pub pool: PoolSettings,
    pub policy: RetryPolicy,
}

impl SessionSettings {
    pub fn for_site(config: &Config, site: &SiteConfig) -> Self {
        Self {
            site: site.name.clone(),
            use_egress_pool: site.use_egress_pool,
            human_delay: site
                .human_delay
                .then(|| (site.min_sleep(), site.max_sleep())),
            between_items_delay: site.between_items_delay(),
            degraded_batch: config.egress.degraded_batch,
            degraded_delay: config.egress.degraded_delay(),
            pool: PoolSettings::from_config(&config.egress),
            policy: RetryPolicy::for_site(site, &config.egress),
        }
    }
}

#[derive(Debug)]
enum State {
    SelectEgress,
    Fetching,
    Classified(Result<ExtractedFields, ErrorClass>),
    RetrySame(Duration),
    Rotate(Duration),
    RefreshPool,
    AbandonItem(Verdict),
    Advance,
    AbortSession,
}

/// How requests currently leave the process
#[derive(Debug)]
enum Egress {
    Pool { pool: EgressPool, cursor: usize },
    /// Direct fetches; `until` bounds the item index in degraded mode
    Direct { until: Option<usize> },
}

impl Egress {
    fn route(&self) -> Route {
        match self {
            Self::Pool { pool, cursor } => Route::Pool {
                index: *cursor,
                len: pool.len(),
            },
            Self::Direct { .. } => Route::Direct,
        }
    }

    fn admits(&self, index: usize) -> bool {
        match self {
            Self::Direct { until: Some(limit) } => index < *limit,
            _ => true,
        }
    }

    fn is_degraded(&self) -> bool {
        matches!(self, Self::Direct { until: Some(_) })
    }
}

/// Fetch session for one site
pub struct FetchSession<F, L, D> {
    settings: SessionSettings,
    fetcher: F,
    listing: L,
    driver: D,
    rng: StdRng,
}

impl<F, L, D> FetchSession<F, L, D>
where
    F: Fetcher,
    L: ListingSource,
    D: SiteDriver,
{
    pub fn new(settings: SessionSettings, fetcher: F, listing: L, driver: D) -> Self {
        Self {
            settings,
            fetcher,
            listing,
            driver,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Replaces the session RNG, for reproducible pool order and pacing
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Processes `items` in order and returns every result produced
    ///
    /// Never fails: fetch problems become retries or terminal results, and
    /// running out of pool refreshes ends the session early with
    /// [`SessionOutcome::Aborted`].
    pub async fn run(&mut self, items: &[WorkItem]) -> SessionReport {
        let started = Instant::now();
        let site = self.settings.site.clone();
        let total = items.len();

        tracing::info!(site = %site, items = total, "Starting fetch session");

        let mut egress = if self.settings.use_egress_pool {
            self.acquire_egress(0).await
        } else {
            Egress::Direct { until: None }
        };
        let mut active: Option<EgressCandidate> = None;
        let mut results = Vec::with_capacity(total);
        let mut index = 0usize;
        let mut attempts = ItemAttempts::default();
        let mut refreshes = 0u32;
        let mut fetches = 0u64;
        let mut state = State::SelectEgress;

        let outcome = loop {
            state = match state {
                State::SelectEgress => {
                    if index >= total || !egress.admits(index) {
                        break SessionOutcome::Completed;
                    }

                    if active.is_none() {
                        if let Egress::Pool { pool, cursor } = &egress {
                            active = pool.get(*cursor).cloned();
                            if let Some(candidate) = &active {
                                tracing::info!(
                                    site = %site,
                                    candidate = %candidate,
                                    position = *cursor + 1,
                                    pool = pool.len(),
                                    "Using egress candidate"
                                );
                            }
                        }
                    }

                    State::Fetching
                }

                State::Fetching => {
                    self.human_pause().await;

                    let item = &items[index];
                    attempts.total += 1;
                    fetches += 1;

                    let attempt = FetchAttempt {
                        item,
                        candidate: active.as_ref(),
                        attempt_for_item: attempts.total,
                        attempt_for_site: fetches,
                    };

                    let verdict = match self.fetcher.fetch(&attempt).await {
                        Ok(page) => {
                            let classification = self.driver.classify(&page);
                            match classification.error_class() {
                                None => Ok(self.driver.extract_fields(&page, item)),
                                Some(class) => Err(class),
                            }
                        }
                        Err(e) => {
                            tracing::debug!(
                                site = %site,
                                identifier = %item.identifier(),
                                error = %e,
                                "Fetch failed"
                            );
                            Err(ErrorClass::Transport)
                        }
                    };

                    State::Classified(verdict)
                }

                State::Classified(Ok(fields)) => {
                    let result = ItemResult::from_fields(&items[index], fields);
                    tracing::info!(
                        site = %site,
                        identifier = %result.identifier,
                        price = %result.price,
                        stock = %result.stock_status,
                        remaining = total - index - 1,
                        "[{}/{}] Item processed",
                        index + 1,
                        total
                    );
                    results.push(result);
                    State::Advance
                }

                State::Classified(Err(class)) => {
                    if class == ErrorClass::RateLimited {
                        attempts.rate_limited += 1;
                    }

                    let action =
                        self.settings
                            .policy
                            .decide(class, &attempts, egress.route(), refreshes);

                    tracing::warn!(
                        site = %site,
                        identifier = %items[index].identifier(),
                        candidate = %active.as_ref().map_or("direct".to_string(), |c| c.to_string()),
                        attempt = attempts.total,
                        class = ?class,
                        action = ?action,
                        "Fetch not usable"
                    );

                    match action {
                        Action::RetrySame { delay } => {
                            State::RetrySame(jitter_with(delay, &mut self.rng))
                        }
                        Action::Rotate { delay } => State::Rotate(delay),
                        Action::RefreshPool => State::RefreshPool,
                        Action::AbandonItem(verdict) => State::AbandonItem(verdict),
                        Action::AbortSession => State::AbortSession,
                    }
                }

                State::RetrySame(delay) => {
                    pause(delay).await;
                    State::Fetching
                }

                State::Rotate(delay) => {
                    pause(delay).await;
                    if let Egress::Pool { cursor, .. } = &mut egress {
                        *cursor += 1;
                    }
                    active = None;
                    State::SelectEgress
                }

                State::RefreshPool => {
                    refreshes += 1;
                    tracing::info!(
                        site = %site,
                        refresh = refreshes,
                        max = self.settings.policy.max_global_refreshes,
                        "Egress pool exhausted, refreshing"
                    );
                    egress = self.acquire_egress(index).await;
                    active = None;
                    State::SelectEgress
                }

                State::AbandonItem(verdict) => {
                    let item = &items[index];
                    let result = match verdict {
                        Verdict::ConfirmedNegative => ItemResult::confirmed_negative(item),
                        Verdict::Unknown => ItemResult::unknown(item),
                    };
                    tracing::info!(
                        site = %site,
                        identifier = %item.identifier(),
                        verdict = ?verdict,
                        "[{}/{}] Item abandoned",
                        index + 1,
                        total
                    );
                    results.push(result);
                    State::Advance
                }

                State::Advance => {
                    index += 1;
                    attempts = ItemAttempts::default();

                    if index < total && egress.admits(index) {
                        let delay = if egress.is_degraded() {
                            self.settings.degraded_delay
                        } else {
                            self.settings.between_items_delay
                        };
                        pause(delay).await;
                    }

                    State::SelectEgress
                }

                State::AbortSession => {
                    tracing::error!(
                        site = %site,
                        refreshes,
                        processed = results.len(),
                        "Egress pool refresh ceiling reached, aborting session"
                    );
                    break SessionOutcome::Aborted;
                }
            };
        };

        let skipped = total - index.min(total);
        if skipped > 0 {
            tracing::warn!(site = %site, skipped, "Items left without a result");
        }

        let report = SessionReport {
            site,
            results,
            outcome,
            refreshes,
            fetches,
            skipped,
            duration: started.elapsed(),
        };

        tracing::info!(
            site = %report.site,
            processed = report.items_processed(),
            fetches = report.fetches,
            refreshes = report.refreshes,
            outcome = ?report.outcome,
            "Fetch session finished"
        );

        report
    }

    async fn acquire_egress(&mut self, from_index: usize) -> Egress {
        match EgressPool::acquire(&self.listing, &self.settings.pool, &mut self.rng).await {
            Ok(pool) => Egress::Pool { pool, cursor: 0 },
            Err(e) => {
                tracing::warn!(
                    site = %self.settings.site,
                    error = %e,
                    batch = self.settings.degraded_batch,
                    "Falling back to direct fetches"
                );
                Egress::Direct {
                    until: Some(from_index.saturating_add(self.settings.degraded_batch)),
                }
            }
        }
    }

    async fn human_pause(&mut self) {
        if let Some((min, max)) = self.settings.human_delay {
            let delay = uniform_between(min, max, &mut self.rng);
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Human-like pause");
            pause(delay).await;
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
