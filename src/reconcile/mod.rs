//! Result reconciliation
//!
//! Folds a session's results back into the shared dataset. Site workers run
//! as separate processes against the same file, so a merge reloads the rows,
//! applies the results and writes back only the rows it changed. A held write
//! lock is retried after a randomized pause, up to a bounded number of times.

mod merge;

pub use merge::{merge, MergeReport};

use crate::config::DatasetConfig;
use crate::dataset::{DatasetResult, DatasetStore};
use crate::policy::spread;
use crate::session::ItemResult;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Merges session results into a dataset store
pub struct Reconciler<S> {
    store: S,
    save_attempts: u32,
    save_base_delay: Duration,
    rng: StdRng,
}

impl<S: DatasetStore> Reconciler<S> {
    pub fn new(store: S, config: &DatasetConfig) -> Self {
        Self {
            store,
            save_attempts: config.save_attempts.max(1),
            save_base_delay: config.save_base_delay(),
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Overrides the retry budget
    pub fn with_retries(mut self, attempts: u32, base_delay: Duration) -> Self {
        self.save_attempts = attempts.max(1);
        self.save_base_delay = base_delay;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Merges `results` into the rows of `site` and returns how many rows
    /// were updated
    ///
    /// Writer contention is retried; once the budget is spent, or on any
    /// other dataset error, the results are dropped with an error log and 0
    /// is returned. A dated snapshot is written after every merge that
    /// updated at least one row.
    pub async fn reconcile(&mut self, site: &str, results: &[ItemResult], today: NaiveDate) -> usize {
        if results.is_empty() {
            tracing::info!(site, "No results to reconcile");
            return 0;
        }

        for attempt in 1..=self.save_attempts {
            match self.merge_once(site, results, today) {
                Ok(report) => {
                    tracing::info!(
                        site,
                        updated = report.updated,
                        missing = report.missing_rows.len(),
                        unmatched = report.unmatched_results.len(),
                        "Reconciled results"
                    );

                    if report.updated > 0 {
                        match self.store.snapshot(today) {
                            Ok(path) => tracing::info!(path = %path.display(), "Wrote dataset snapshot"),
                            Err(e) => tracing::error!(error = %e, "Failed to write dataset snapshot"),
                        }
                    }
                    return report.updated;
                }
                Err(e) if e.is_contention() && attempt < self.save_attempts => {
                    let delay = spread(self.save_base_delay, self.rng.random::<f64>());
                    tracing::warn!(
                        site,
                        attempt,
                        max_attempts = self.save_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Dataset busy, retrying merge"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        site,
                        attempt,
                        results = results.len(),
                        error = %e,
                        "Giving up on merge, results dropped"
                    );
                    return 0;
                }
            }
        }

        0
    }

    fn merge_once(&self, site: &str, results: &[ItemResult], today: NaiveDate) -> DatasetResult<MergeReport> {
        let mut rows = self.store.load_rows()?;
        let report = merge(&mut rows, site, results, today);

        if !report.changed.is_empty() {
            let changed: Vec<_> = report.changed.iter().map(|&i| rows[i].clone()).collect();
            self.store.save_rows(&changed)?;
        }

        Ok(report)
    }
}
