//! Shared product dataset
//!
//! This module handles the dataset every site worker reads its work from and
//! merges its results into:
//! - SQLite schema and per-operation connections
//! - Row loading and id-keyed saves under a write lock
//! - Dated snapshots after successful merges
//! - Work selection for a site

mod schema;
mod select;
mod sqlite;
mod traits;

pub use select::select_work_items;
pub use sqlite::{snapshot_path, NewRow, SqliteDataset};
pub use traits::{DatasetError, DatasetResult, DatasetStore};

use crate::session::StockStatus;
use chrono::NaiveDate;

const STAMP_FORMAT: &str = "%Y%m%d";

/// A product row of the dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub id: i64,
    pub site: String,
    pub url: String,
    pub identifier: String,
    pub price: String,
    pub stock_status: StockStatus,
    pub last_updated: Option<NaiveDate>,
}

/// Formats a row stamp as `YYYYMMDD`
pub fn format_stamp(date: NaiveDate) -> String {
    date.format(STAMP_FORMAT).to_string()
}

/// Parses a `YYYYMMDD` stamp; anything else reads as "never updated"
pub fn parse_stamp(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), STAMP_FORMAT).ok()
}
