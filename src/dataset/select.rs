use crate::dataset::DatasetRow;
use crate::session::WorkItem;
use crate::url::parse_product_url;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Picks the rows of `site` that still need a check today
///
/// A row is selected when it was not stamped `today`, or when its price is
/// empty regardless of the stamp. Rows with an empty or non-http(s) URL are
/// ignored and duplicate links (by normalized key) are selected once, first
/// row wins.
pub fn select_work_items(rows: &[DatasetRow], site: &str, today: NaiveDate) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    let mut site_rows = 0usize;

    for row in rows.iter().filter(|r| r.site == site) {
        site_rows += 1;

        if row.url.trim().is_empty() {
            continue;
        }

        let stale = row.last_updated != Some(today);
        let unpriced = row.price.trim().is_empty();
        if !(stale || unpriced) {
            continue;
        }

        if let Err(e) = parse_product_url(&row.url) {
            tracing::warn!(site, id = row.id, url = %row.url, error = %e, "Skipping row with invalid URL");
            continue;
        }

        let item = WorkItem::new(row.url.clone(), row.identifier.clone(), row.site.clone());
        if seen.insert(item.normalized_key().to_string()) {
            selected.push(item);
        }
    }

    tracing::info!(
        site,
        rows = site_rows,
        selected = selected.len(),
        "Selected work items"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StockStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn row(id: i64, site: &str, url: &str, price: &str, stamp: Option<NaiveDate>) -> DatasetRow {
        DatasetRow {
            id,
            site: site.to_string(),
            url: url.to_string(),
            identifier: format!("BN-{}", id),
            price: price.to_string(),
            stock_status: StockStatus::Unknown,
            last_updated: stamp,
        }
    }

    #[test]
    fn test_selects_stale_and_unpriced_rows() {
        let yesterday = today().pred_opt().unwrap();
        let rows = vec![
            row(1, "x", "https://x.pl/1", "10.00", Some(today())),
            row(2, "x", "https://x.pl/2", "10.00", Some(yesterday)),
            row(3, "x", "https://x.pl/3", "", Some(today())),
            row(4, "x", "https://x.pl/4", "10.00", None),
            row(5, "y", "https://y.pl/5", "", None),
        ];

        let items = select_work_items(&rows, "x", today());
        let ids: Vec<&str> = items.iter().map(|i| i.identifier()).collect();

        assert_eq!(ids, vec!["BN-2", "BN-3", "BN-4"]);
    }

    #[test]
    fn test_duplicates_selected_once() {
        let rows = vec![
            row(1, "x", "https://x.pl/1", "", None),
            row(2, "x", "https://X.pl/1/", "", None),
            row(3, "x", "https://x.pl/1?ref=a", "", None),
        ];

        let items = select_work_items(&rows, "x", today());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].identifier(), "BN-1");
    }

    #[test]
    fn test_empty_urls_skipped() {
        let rows = vec![row(1, "x", "  ", "", None)];
        assert!(select_work_items(&rows, "x", today()).is_empty());
    }

    #[test]
    fn test_invalid_urls_skipped() {
        let rows = vec![
            row(1, "x", "www.x.pl/p/1", "", None),
            row(2, "x", "ftp://x.pl/p/2", "", None),
            row(3, "x", "https://x.pl/p/3", "", None),
        ];

        let items = select_work_items(&rows, "x", today());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].identifier(), "BN-3");
    }
}
