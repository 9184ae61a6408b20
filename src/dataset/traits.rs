//! Dataset traits and error types
//!
//! This module defines the trait interface for dataset backends and
//! associated error types.

use crate::dataset::DatasetRow;
use chrono::NaiveDate;
use rusqlite::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during dataset operations
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Another process holds the write lock
    #[error("Dataset is locked by another writer")]
    Contention,

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid dataset path: {0}")]
    InvalidPath(String),
}

impl DatasetError {
    /// True when retrying later may succeed
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::Contention)
    }
}

impl From<rusqlite::Error> for DatasetError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => Self::Contention,
            _ => Self::Sqlite(e),
        }
    }
}

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Trait for dataset backend implementations
///
/// Rows are the only shared state between site workers, so every write must
/// either land completely or fail with [`DatasetError::Contention`].
pub trait DatasetStore {
    /// Loads every row of the dataset
    fn load_rows(&self) -> DatasetResult<Vec<DatasetRow>>;

    /// Writes price, stock status and stamp of the given rows, matched by id
    fn save_rows(&self, rows: &[DatasetRow]) -> DatasetResult<()>;

    /// Writes a dated copy next to the dataset and returns its path
    fn snapshot(&self, date: NaiveDate) -> DatasetResult<PathBuf>;
}
