use crate::dataset::DatasetRow;
use crate::session::ItemResult;
use crate::url::{base_key, normalize_key};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Unmatched rows and results logged per merge
const DIAGNOSTIC_SAMPLE: usize = 10;

/// What a merge changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Number of rows written
    pub updated: usize,
    /// Indices of the written rows, in row order
    pub changed: Vec<usize>,
    /// URLs of site rows no result matched
    pub missing_rows: Vec<String>,
    /// URLs of results no row matched
    pub unmatched_results: Vec<String>,
}

/// Folds session results into the rows of `site`
///
/// 1. Results are keyed by normalized URL; a later result for the same key
///    replaces an earlier one and results with an empty URL are dropped.
/// 2. A row whose key matches a result exactly takes its price and stock
///    status and is stamped `today`.
/// 3. Remaining rows are compared, query-stripped, against the results no
///    row matched exactly; the first such result (in result order) wins.
/// 4. Rows still unmatched are reported as missing.
///
/// Applying the same results twice leaves the rows unchanged.
pub fn merge(
    rows: &mut [DatasetRow],
    site: &str,
    results: &[ItemResult],
    today: NaiveDate,
) -> MergeReport {
    let mut keys: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    for (i, result) in results.iter().enumerate() {
        if result.url.trim().is_empty() {
            continue;
        }
        let key = normalize_key(&result.url);
        if by_key.insert(key.clone(), i).is_none() {
            keys.push(key);
        }
    }

    let mut report = MergeReport::default();
    let mut exact_hits: HashSet<&str> = HashSet::new();
    let mut pending: Vec<usize> = Vec::new();

    for (row_idx, row) in rows.iter_mut().enumerate() {
        if row.site != site {
            continue;
        }
        let key = normalize_key(&row.url);
        match by_key.get_key_value(&key) {
            Some((k, &result_idx)) => {
                apply(row, &results[result_idx], today);
                report.changed.push(row_idx);
                exact_hits.insert(k.as_str());
            }
            None => pending.push(row_idx),
        }
    }

    // Query-stripped fallback against results no row matched exactly
    let fallback: Vec<(String, usize)> = keys
        .iter()
        .filter(|k| !exact_hits.contains(k.as_str()))
        .filter_map(|k| by_key.get(k).map(|&i| (base_key(k), i)))
        .collect();
    let mut fuzzy_hits: HashSet<usize> = HashSet::new();

    for row_idx in pending {
        let row = &mut rows[row_idx];
        let row_base = base_key(&row.url);

        match fallback.iter().find(|(base, _)| *base == row_base) {
            Some(&(_, result_idx)) => {
                tracing::debug!(
                    row = %row.url,
                    result = %results[result_idx].url,
                    "Matched via query-stripped comparison"
                );
                apply(row, &results[result_idx], today);
                report.changed.push(row_idx);
                fuzzy_hits.insert(result_idx);
            }
            None => report.missing_rows.push(row.url.clone()),
        }
    }

    report.changed.sort_unstable();
    report.updated = report.changed.len();
    report.unmatched_results = keys
        .iter()
        .filter(|k| !exact_hits.contains(k.as_str()))
        .filter_map(|k| by_key.get(k))
        .filter(|i| !fuzzy_hits.contains(*i))
        .map(|&i| results[i].url.clone())
        .collect();

    log_diagnostics(site, &report);
    report
}

fn apply(row: &mut DatasetRow, result: &ItemResult, today: NaiveDate) {
    row.price = result.price.clone();
    row.stock_status = result.stock_status;
    row.last_updated = Some(today);
}

fn log_diagnostics(site: &str, report: &MergeReport) {
    if !report.unmatched_results.is_empty() {
        tracing::warn!(
            site,
            count = report.unmatched_results.len(),
            sample = ?&report.unmatched_results[..report.unmatched_results.len().min(DIAGNOSTIC_SAMPLE)],
            "Results without a dataset row"
        );
    }

    if !report.missing_rows.is_empty() {
        tracing::debug!(
            site,
            count = report.missing_rows.len(),
            sample = ?&report.missing_rows[..report.missing_rows.len().min(DIAGNOSTIC_SAMPLE)],
            "Dataset rows without a result"
        );
    }
}
