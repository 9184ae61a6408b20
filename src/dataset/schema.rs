//! Database schema definitions
//!
//! This module contains the SQL schema of the shared product dataset.

/// SQL schema for the dataset
pub const SCHEMA_SQL: &str = r#"
-- One row per tracked product link
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site TEXT NOT NULL,
    url TEXT NOT NULL,
    identifier TEXT NOT NULL DEFAULT '',
    price TEXT NOT NULL DEFAULT '',
    stock_status TEXT NOT NULL DEFAULT '',
    -- YYYYMMDD of the last successful merge
    last_updated TEXT
);

CREATE INDEX IF NOT EXISTS idx_products_site ON products(site);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
