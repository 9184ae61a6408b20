use crate::config::EgressConfig;
use crate::egress::candidate::EgressCandidate;
use crate::egress::listing::{parse_listing, ListingSource};
use crate::egress::EgressError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Knobs for building a pool
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub preferred: EgressCandidate,
    pub max_candidates: usize,
    pub min_viable: usize,
    pub listing_attempts: u32,
    pub listing_retry_delay: Duration,
}

impl PoolSettings {
    pub fn from_config(config: &EgressConfig) -> Self {
        Self {
            preferred: EgressCandidate::preferred(
                config.preferred_address.clone(),
                config.preferred_scheme,
            ),
            max_candidates: config.max_candidates,
            min_viable: config.min_viable,
            listing_attempts: config.listing_attempts,
            listing_retry_delay: config.listing_retry_delay(),
        }
    }
}

/// Ordered, immutable list of egress candidates
///
/// The preferred candidate is always at index 0, followed by public candidates
/// in random order. A refresh builds a new pool instead of touching this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressPool {
    candidates: Vec<EgressCandidate>,
}

impl EgressPool {
    /// Builds a pool from a preferred candidate and parsed public candidates
    ///
    /// Public candidates are shuffled and truncated so that the whole pool
    /// never exceeds `max_candidates`. A cap of 0 still keeps the preferred
    /// candidate.
    pub fn assemble<R: Rng + ?Sized>(
        preferred: EgressCandidate,
        mut public: Vec<EgressCandidate>,
        max_candidates: usize,
        rng: &mut R,
    ) -> Self {
        public.retain(|c| c.address != preferred.address);
        public.shuffle(rng);
        public.truncate(max_candidates.saturating_sub(1));

        let mut candidates = Vec::with_capacity(public.len() + 1);
        candidates.push(preferred);
        candidates.extend(public);

        Self { candidates }
    }

    /// Acquires a fresh pool from the listing source
    ///
    /// A listing transport failure is returned immediately as
    /// [`EgressError::ListingUnavailable`] so the caller can switch to direct
    /// fetches. A pool shorter than `min_viable` triggers a re-fetch after
    /// `listing_retry_delay`, up to `listing_attempts` fetches in total; the
    /// last short pool is accepted after that.
    pub async fn acquire<S, R>(
        source: &S,
        settings: &PoolSettings,
        rng: &mut R,
    ) -> Result<Self, EgressError>
    where
        S: ListingSource,
        R: Rng + ?Sized,
    {
        let attempts = settings.listing_attempts.max(1);
        let mut pool = Self::assemble(settings.preferred.clone(), Vec::new(), 1, rng);

        for attempt in 1..=attempts {
            let html = source.fetch_listing().await?;
            pool = Self::assemble(
                settings.preferred.clone(),
                parse_listing(&html),
                settings.max_candidates,
                rng,
            );

            if pool.len() >= settings.min_viable {
                tracing::info!(
                    candidates = pool.len(),
                    attempt,
                    "Acquired egress pool"
                );
                return Ok(pool);
            }

            tracing::warn!(
                candidates = pool.len(),
                min_viable = settings.min_viable,
                attempt,
                attempts,
                "Egress pool below minimum"
            );

            if attempt < attempts && !settings.listing_retry_delay.is_zero() {
                tokio::time::sleep(settings.listing_retry_delay).await;
            }
        }

        tracing::warn!(
            candidates = pool.len(),
            "Accepting degraded egress pool"
        );
        Ok(pool)
    }

    pub fn get(&self, index: usize) -> Option<&EgressCandidate> {
        self.candidates.get(index)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Never true for an assembled pool; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[EgressCandidate] {
        &self.candidates
    }
}
