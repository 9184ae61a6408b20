use chrono::NaiveDate;
use shelfwatch::config::DatasetConfig;
use shelfwatch::dataset::{select_work_items, snapshot_path, DatasetStore, NewRow, SqliteDataset};
use shelfwatch::session::{SessionOutcome, SessionReport};
use shelfwatch::summary::{load_summaries, write_summary, RunSummary};
use shelfwatch::{ItemResult, Reconciler, StockStatus};
use std::time::Duration;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
}

fn dataset_config(path: &str) -> DatasetConfig {
    DatasetConfig {
        path: path.to_string(),
        save_attempts: 3,
        save_base_delay: 0,
    }
}

fn new_row(site: &str, url: &str, identifier: &str) -> NewRow {
    NewRow {
        site: site.to_string(),
        url: url.to_string(),
        identifier: identifier.to_string(),
    }
}

fn result(url: &str, price: &str, stock: StockStatus) -> ItemResult {
    ItemResult {
        url: url.to_string(),
        identifier: String::new(),
        site: "x".to_string(),
        price: price.to_string(),
        stock_status: stock,
    }
}

#[tokio::test]
async fn test_reconcile_query_stripped_row() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Input_prices.db");
    let dataset = SqliteDataset::open(&path).unwrap();
    dataset
        .insert_rows(&[
            new_row("x", "https://x.pl/p/1?ref=abc", "BN-1"),
            new_row("x", "https://x.pl/p/2", "BN-2"),
            new_row("y", "https://x.pl/p/1", "BN-3"),
        ])
        .unwrap();

    let config = dataset_config(&path.to_string_lossy());
    let mut reconciler = Reconciler::new(dataset.clone(), &config);
    let updated = reconciler
        .reconcile(
            "x",
            &[result("https://x.pl/p/1", "129.00", StockStatus::InStock)],
            today(),
        )
        .await;

    assert_eq!(updated, 1);

    let rows = dataset.load_rows().unwrap();
    assert_eq!(rows[0].price, "129.00");
    assert_eq!(rows[0].stock_status, StockStatus::InStock);
    assert_eq!(rows[0].last_updated, Some(today()));
    assert_eq!(rows[1].price, "");
    assert_eq!(rows[2].price, "");
    assert_eq!(rows[2].last_updated, None);

    // Snapshot written next to the dataset
    let snapshot = snapshot_path(&path, today()).unwrap();
    assert!(snapshot.exists());
    assert_eq!(
        snapshot.file_name().unwrap().to_string_lossy(),
        "Output_20240517_Input_prices.db"
    );

    // Only the unpriced row is still due today
    let due = select_work_items(&rows, "x", today());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].identifier(), "BN-2");
}

#[tokio::test]
async fn test_reconcile_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prices.db");
    let dataset = SqliteDataset::open(&path).unwrap();
    dataset
        .insert_rows(&[
            new_row("x", "https://x.pl/p/1", "BN-1"),
            new_row("x", "https://x.pl/p/2", "BN-2"),
        ])
        .unwrap();

    let results = vec![
        result("https://x.pl/p/1", "10.00", StockStatus::InStock),
        result("https://x.pl/p/2", "0.00", StockStatus::OutStock),
    ];
    let config = dataset_config(&path.to_string_lossy());
    let mut reconciler = Reconciler::new(dataset.clone(), &config);

    assert_eq!(reconciler.reconcile("x", &results, today()).await, 2);
    let first = dataset.load_rows().unwrap();
    assert_eq!(reconciler.reconcile("x", &results, today()).await, 2);
    let second = dataset.load_rows().unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_no_snapshot_when_nothing_matches() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prices.db");
    let dataset = SqliteDataset::open(&path).unwrap();
    dataset
        .insert_rows(&[new_row("x", "https://x.pl/p/1", "BN-1")])
        .unwrap();

    let config = dataset_config(&path.to_string_lossy());
    let mut reconciler = Reconciler::new(dataset, &config);
    let updated = reconciler
        .reconcile(
            "x",
            &[result("https://x.pl/p/2", "10.00", StockStatus::InStock)],
            today(),
        )
        .await;

    assert_eq!(updated, 0);
    assert!(!snapshot_path(&path, today()).unwrap().exists());
}

#[test]
fn test_summary_written_per_site() {
    let dir = TempDir::new().unwrap();
    let report = SessionReport {
        site: "x".to_string(),
        results: vec![result("https://x.pl/p/1", "10.00", StockStatus::InStock)],
        outcome: SessionOutcome::Completed,
        refreshes: 0,
        fetches: 1,
        skipped: 0,
        duration: Duration::from_secs(30),
    };

    let summary = RunSummary::from_report(&report, 1, "deadbeef");
    let path = write_summary(dir.path(), &summary).unwrap();
    assert_eq!(path, dir.path().join("x_stats.json"));

    let loaded = load_summaries(dir.path()).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].items_per_minute, 2.0);
    assert_eq!(loaded[0].config_hash, "deadbeef");
}
