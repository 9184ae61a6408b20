//! SQLite dataset implementation
//!
//! Every operation opens its own short-lived connection, so worker processes
//! only hold the file while they actually read or write it.

use crate::dataset::schema::initialize_schema;
use crate::dataset::traits::{DatasetError, DatasetResult, DatasetStore};
use crate::dataset::{format_stamp, parse_stamp, DatasetRow};
use crate::session::StockStatus;
use chrono::NaiveDate;
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A product link to add to the dataset
#[derive(Debug, Clone)]
pub struct NewRow {
    pub site: String,
    pub url: String,
    pub identifier: String,
}

/// SQLite dataset backend
#[derive(Debug, Clone)]
pub struct SqliteDataset {
    path: PathBuf,
}

impl SqliteDataset {
    /// Opens (and if needed creates) the dataset at `path`
    pub fn open(path: impl Into<PathBuf>) -> DatasetResult<Self> {
        let dataset = Self { path: path.into() };
        let conn = dataset.connect()?;
        initialize_schema(&conn)?;
        Ok(dataset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> DatasetResult<Connection> {
        let conn = Connection::open(&self.path)?;

        // Zero busy timeout: a held write lock surfaces as contention at once
        conn.busy_timeout(Duration::ZERO)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        Ok(conn)
    }

    /// Appends product links, returning how many were inserted
    pub fn insert_rows(&self, rows: &[NewRow]) -> DatasetResult<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        {
            let mut stmt =
                tx.prepare("INSERT INTO products (site, url, identifier) VALUES (?1, ?2, ?3)")?;
            for row in rows {
                stmt.execute(params![row.site, row.url, row.identifier])?;
            }
        }

        tx.commit()?;
        Ok(rows.len())
    }

    /// Number of rows, all sites
    pub fn row_count(&self) -> DatasetResult<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl DatasetStore for SqliteDataset {
    fn load_rows(&self) -> DatasetResult<Vec<DatasetRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, site, url, identifier, price, stock_status, last_updated
             FROM products ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let stock: String = row.get(5)?;
                let stamp: Option<String> = row.get(6)?;
                Ok(DatasetRow {
                    id: row.get(0)?,
                    site: row.get(1)?,
                    url: row.get(2)?,
                    identifier: row.get(3)?,
                    price: row.get(4)?,
                    stock_status: stock.parse().unwrap_or(StockStatus::Unknown),
                    last_updated: stamp.as_deref().and_then(parse_stamp),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn save_rows(&self, rows: &[DatasetRow]) -> DatasetResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        {
            let mut stmt = tx.prepare(
                "UPDATE products SET price = ?1, stock_status = ?2, last_updated = ?3
                 WHERE id = ?4",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.price,
                    row.stock_status.as_str(),
                    row.last_updated.map(format_stamp),
                    row.id
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(rows = rows.len(), path = %self.path.display(), "Saved dataset rows");
        Ok(())
    }

    fn snapshot(&self, date: NaiveDate) -> DatasetResult<PathBuf> {
        let target = snapshot_path(&self.path, date)?;
        if target.exists() {
            std::fs::remove_file(&target)?;
        }

        let conn = self.connect()?;
        conn.execute("VACUUM INTO ?1", params![target.to_string_lossy()])?;

        Ok(target)
    }
}

/// `Output_<YYYYMMDD>_<name>.<ext>` next to the dataset
pub fn snapshot_path(path: &Path, date: NaiveDate) -> DatasetResult<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DatasetError::InvalidPath(path.display().to_string()))?;

    Ok(path.with_file_name(format!("Output_{}_{}", format_stamp(date), name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_row(site: &str, url: &str) -> NewRow {
        NewRow {
            site: site.to_string(),
            url: url.to_string(),
            identifier: "BN-1".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_insert_and_load() {
        let dir = TempDir::new().unwrap();
        let dataset = SqliteDataset::open(dir.path().join("prices.db")).unwrap();

        dataset
            .insert_rows(&[new_row("x", "https://x.pl/p/1"), new_row("y", "https://y.pl/p/2")])
            .unwrap();

        let rows = dataset.load_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].site, "x");
        assert_eq!(rows[0].price, "");
        assert_eq!(rows[0].stock_status, StockStatus::Unknown);
        assert_eq!(rows[0].last_updated, None);
        assert_eq!(dataset.row_count().unwrap(), 2);
    }

    #[test]
    fn test_save_updates_only_given_rows() {
        let dir = TempDir::new().unwrap();
        let dataset = SqliteDataset::open(dir.path().join("prices.db")).unwrap();
        dataset
            .insert_rows(&[new_row("x", "https://x.pl/p/1"), new_row("x", "https://x.pl/p/2")])
            .unwrap();

        let mut rows = dataset.load_rows().unwrap();
        rows[0].price = "129.00".to_string();
        rows[0].stock_status = StockStatus::InStock;
        rows[0].last_updated = Some(date(2024, 5, 17));
        dataset.save_rows(&rows[..1]).unwrap();

        let reloaded = dataset.load_rows().unwrap();
        assert_eq!(reloaded[0].price, "129.00");
        assert_eq!(reloaded[0].stock_status, StockStatus::InStock);
        assert_eq!(reloaded[0].last_updated, Some(date(2024, 5, 17)));
        assert_eq!(reloaded[1].price, "");
    }

    #[test]
    fn test_held_write_lock_is_contention() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.db");
        let dataset = SqliteDataset::open(&path).unwrap();
        dataset.insert_rows(&[new_row("x", "https://x.pl/p/1")]).unwrap();
        let rows = dataset.load_rows().unwrap();

        let mut holder = Connection::open(&path).unwrap();
        let tx = holder
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();

        let result = dataset.save_rows(&rows);
        assert!(matches!(result, Err(DatasetError::Contention)));

        tx.rollback().unwrap();
        assert!(dataset.save_rows(&rows).is_ok());
    }

    #[test]
    fn test_snapshot_path() {
        let path = Path::new("/data/Input_prices.db");
        assert_eq!(
            snapshot_path(path, date(2024, 5, 17)).unwrap(),
            PathBuf::from("/data/Output_20240517_Input_prices.db")
        );
    }

    #[test]
    fn test_snapshot_copies_rows() {
        let dir = TempDir::new().unwrap();
        let dataset = SqliteDataset::open(dir.path().join("prices.db")).unwrap();
        dataset.insert_rows(&[new_row("x", "https://x.pl/p/1")]).unwrap();

        let copy = dataset.snapshot(date(2024, 5, 17)).unwrap();
        assert!(copy.exists());
        assert_eq!(SqliteDataset::open(&copy).unwrap().row_count().unwrap(), 1);

        // Same-day snapshot is replaced
        dataset.insert_rows(&[new_row("x", "https://x.pl/p/2")]).unwrap();
        let again = dataset.snapshot(date(2024, 5, 17)).unwrap();
        assert_eq!(again, copy);
        assert_eq!(SqliteDataset::open(&again).unwrap().row_count().unwrap(), 2);
    }
}
