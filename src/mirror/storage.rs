//! SQLite mirror storage.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::Record;

use super::traits::{MirrorCache, MirrorCount, MirrorEntry, MirrorKey};

/// Bump when the table layout changes; older files are rebuilt on open.
const SCHEMA_VERSION: i64 = 1;

const MIRROR_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mirror_records (
    entity_type TEXT NOT NULL,
    scope TEXT NOT NULL,
    record_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    data TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    PRIMARY KEY (entity_type, scope, record_id)
);

CREATE INDEX IF NOT EXISTS idx_mirror_records_position
    ON mirror_records(entity_type, scope, position);

CREATE INDEX IF NOT EXISTS idx_mirror_records_timestamp
    ON mirror_records(entity_type, timestamp);

CREATE TABLE IF NOT EXISTS mirror_counts (
    entity_type TEXT NOT NULL,
    scope TEXT NOT NULL,
    count INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    PRIMARY KEY (entity_type, scope)
);
"#;

const DROP_SCHEMA: &str = r#"
DROP TABLE IF EXISTS mirror_records;
DROP TABLE IF EXISTS mirror_counts;
"#;

/// SQLite-backed mirror.
pub struct SqliteMirror {
  conn: Mutex<Connection>,
}

impl SqliteMirror {
  /// Open (or create) the mirror file at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        Error::Mirror(format!(
          "Failed to create mirror directory {}: {}",
          parent.display(),
          e
        ))
      })?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::Mirror(format!(
        "Failed to open mirror database at {}: {}",
        path.display(),
        e
      ))
    })?;
    Self::from_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  /// `<data dir>/spadesk/mirror.db`
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::Mirror("Could not determine data directory".to_string()))?;

    Ok(data_dir.join("spadesk").join("mirror.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let mirror = Self {
      conn: Mutex::new(conn),
    };
    mirror.run_migrations()?;
    Ok(mirror)
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version != 0 && version != SCHEMA_VERSION {
      tracing::info!(
        from = version,
        to = SCHEMA_VERSION,
        "Mirror schema changed, rebuilding"
      );
      conn.execute_batch(DROP_SCHEMA)?;
    }

    conn.execute_batch(MIRROR_SCHEMA)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Mirror(format!("Lock poisoned: {}", e)))
  }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_millis(millis)
    .ok_or_else(|| Error::Mirror(format!("Invalid mirror timestamp {}", millis)))
}

impl MirrorCache for SqliteMirror {
  fn write<T: Record>(
    &self,
    key: &MirrorKey,
    records: &[T],
    offset: u64,
    timestamp: DateTime<Utc>,
  ) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    let millis = timestamp.timestamp_millis();

    for (index, record) in records.iter().enumerate() {
      let position = (offset + index as u64) as i64;
      let data = serde_json::to_string(record)?;

      // Another record may have held this slot in an earlier write
      tx.execute(
        "DELETE FROM mirror_records
         WHERE entity_type = ? AND scope = ? AND position = ? AND record_id != ?",
        params![key.entity_type, key.scope, position, record.id()],
      )?;
      tx.execute(
        "INSERT OR REPLACE INTO mirror_records
           (entity_type, scope, record_id, position, data, timestamp)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![key.entity_type, key.scope, record.id(), position, data, millis],
      )?;
    }

    tx.commit()?;
    Ok(())
  }

  fn read<T: Record>(&self, key: &MirrorKey) -> Result<Vec<MirrorEntry<T>>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(
      "SELECT record_id, data, timestamp, position FROM mirror_records
       WHERE entity_type = ? AND scope = ?
       ORDER BY position",
    )?;

    let rows = stmt
      .query_map(params![key.entity_type, key.scope], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, i64>(2)?,
          row.get::<_, i64>(3)?,
        ))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    rows
      .into_iter()
      .map(|(id, data, millis, position)| {
        let record: T = serde_json::from_str(&data).map_err(|e| {
          Error::Decode(format!("mirrored {}/{}: {}", key.entity_type, id, e))
        })?;
        Ok(MirrorEntry {
          record,
          timestamp: from_millis(millis)?,
          position: position as u64,
        })
      })
      .collect()
  }

  fn write_count(&self, key: &MirrorKey, count: u64, timestamp: DateTime<Utc>) -> Result<()> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT OR REPLACE INTO mirror_counts (entity_type, scope, count, timestamp)
       VALUES (?, ?, ?, ?)",
      params![
        key.entity_type,
        key.scope,
        count as i64,
        timestamp.timestamp_millis()
      ],
    )?;
    Ok(())
  }

  fn read_count(&self, key: &MirrorKey) -> Result<Option<MirrorCount>> {
    let conn = self.lock()?;
    let row: Option<(i64, i64)> = conn
      .query_row(
        "SELECT count, timestamp FROM mirror_counts WHERE entity_type = ? AND scope = ?",
        params![key.entity_type, key.scope],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    match row {
      Some((count, millis)) => Ok(Some(MirrorCount {
        count: count.max(0) as u64,
        timestamp: from_millis(millis)?,
      })),
      None => Ok(None),
    }
  }

  fn expire(&self, entity_type: &str, older_than: DateTime<Utc>) -> Result<usize> {
    let conn = self.lock()?;
    let threshold = older_than.timestamp_millis();
    let removed = conn.execute(
      "DELETE FROM mirror_records WHERE entity_type = ? AND timestamp < ?",
      params![entity_type, threshold],
    )?;
    conn.execute(
      "DELETE FROM mirror_counts WHERE entity_type = ? AND timestamp < ?",
      params![entity_type, threshold],
    )?;
    Ok(removed)
  }

  fn clear(&self, key: &MirrorKey) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    tx.execute(
      "DELETE FROM mirror_records WHERE entity_type = ? AND scope = ?",
      params![key.entity_type, key.scope],
    )?;
    tx.execute(
      "DELETE FROM mirror_counts WHERE entity_type = ? AND scope = ?",
      params![key.entity_type, key.scope],
    )?;
    tx.commit()?;
    Ok(())
  }

  fn reset(&self) -> Result<()> {
    let conn = self.lock()?;
    conn.execute_batch(DROP_SCHEMA)?;
    conn.execute_batch(MIRROR_SCHEMA)?;
    Ok(())
  }
}
