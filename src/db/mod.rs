//! SQLite-backed catalog store.
//!
//! The database lives at `~/.catalog-enrich/catalog.db` unless `dbPath` is set in
//! the config. It holds exactly two tables: `records` and their `attributes`.
//! Query methods are split by table into `records` and `attributes`.

use std::path::PathBuf;

use rusqlite::Connection;

use crate::types::EnrichConfig;

pub mod attributes;
pub mod records;
pub mod types;
pub use types::*;

pub struct CatalogDb {
    conn: Connection,
}

impl CatalogDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Self) -> Result<T, StoreError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the configured database and apply the schema.
    pub fn open(config: &EnrichConfig) -> Result<Self, StoreError> {
        let path = match config.db_path.as_deref() {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => Self::default_db_path()?,
        };
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(StoreError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        log::debug!("Opened catalog database at {}", path.display());
        Ok(Self { conn })
    }

    /// `~/.catalog-enrich/catalog.db`
    pub fn default_db_path() -> Result<PathBuf, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
        Ok(home.join(".catalog-enrich").join("catalog.db"))
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================
