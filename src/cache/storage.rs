//! Snapshot storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One persisted slice as it sits in durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSlice {
  pub key: String,
  /// Snapshot schema version the data was written with
  pub version: u32,
  /// Serialized `{ items, lastFetchedAt }`
  pub data: Vec<u8>,
  /// Hex SHA-256 of `data`
  pub checksum: String,
  pub last_fetched_at: DateTime<Utc>,
}

/// Trait for durable snapshot backends.
///
/// Only the persistence layer talks to this; everything is namespaced so
/// several sites can share one database.
pub trait SnapshotStorage: Send + Sync {
  fn load(&self, namespace: &str, key: &str) -> Result<Option<StoredSlice>>;

  fn save(&self, namespace: &str, slice: &StoredSlice) -> Result<()>;

  fn remove(&self, namespace: &str, key: &str) -> Result<()>;

  /// Remove every slice in the namespace, returning how many were dropped.
  fn clear(&self, namespace: &str) -> Result<usize>;

  fn keys(&self, namespace: &str) -> Result<Vec<String>>;
}

/// Storage implementation that doesn't persist anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl SnapshotStorage for NoopStorage {
  fn load(&self, _namespace: &str, _key: &str) -> Result<Option<StoredSlice>> {
    Ok(None) // Always miss
  }

  fn save(&self, _namespace: &str, _slice: &StoredSlice) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _namespace: &str, _key: &str) -> Result<()> {
    Ok(())
  }

  fn clear(&self, _namespace: &str) -> Result<usize> {
    Ok(0)
  }

  fn keys(&self, _namespace: &str) -> Result<Vec<String>> {
    Ok(Vec::new())
  }
}

/// SQLite-based snapshot storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the snapshot database at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the snapshot database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// In-memory database, gone when dropped.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("orca-content").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(SNAPSHOT_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

const SNAPSHOT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS persisted_slices (
    namespace TEXT NOT NULL,
    slice_key TEXT NOT NULL,
    version INTEGER NOT NULL,
    data BLOB NOT NULL,
    checksum TEXT NOT NULL,
    last_fetched_at TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (namespace, slice_key)
);
"#;

impl SnapshotStorage for SqliteStorage {
  fn load(&self, namespace: &str, key: &str) -> Result<Option<StoredSlice>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(u32, Vec<u8>, String, String)> = conn
      .query_row(
        "SELECT version, data, checksum, last_fetched_at FROM persisted_slices
         WHERE namespace = ? AND slice_key = ?",
        params![namespace, key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to load slice {}: {}", key, e))?;

    match row {
      Some((version, data, checksum, last_fetched_at)) => Ok(Some(StoredSlice {
        key: key.to_string(),
        version,
        data,
        checksum,
        last_fetched_at: parse_datetime(&last_fetched_at)?,
      })),
      None => Ok(None),
    }
  }

  fn save(&self, namespace: &str, slice: &StoredSlice) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO persisted_slices
           (namespace, slice_key, version, data, checksum, last_fetched_at, written_at)
         VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          namespace,
          slice.key,
          slice.version,
          slice.data,
          slice.checksum,
          slice.last_fetched_at.to_rfc3339(),
        ],
      )
      .map_err(|e| eyre!("Failed to store slice {}: {}", slice.key, e))?;

    Ok(())
  }

  fn remove(&self, namespace: &str, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM persisted_slices WHERE namespace = ? AND slice_key = ?",
        params![namespace, key],
      )
      .map_err(|e| eyre!("Failed to remove slice {}: {}", key, e))?;

    Ok(())
  }

  fn clear(&self, namespace: &str) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM persisted_slices WHERE namespace = ?",
        params![namespace],
      )
      .map_err(|e| eyre!("Failed to clear namespace {}: {}", namespace, e))
  }

  fn keys(&self, namespace: &str) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT slice_key FROM persisted_slices WHERE namespace = ? ORDER BY slice_key")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let keys = stmt
      .query_map(params![namespace], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list slices: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(keys)
  }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
