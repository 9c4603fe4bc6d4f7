//! Core traits and types for the mirror.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::model::{ListFilter, Record};

/// Identifies one mirrored list: an entity type plus a filter scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MirrorKey {
  pub entity_type: String,
  /// SHA-256 hex digest of the filter description
  pub scope: String,
}

impl MirrorKey {
  pub fn new(entity_type: &str, description: &str) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(description.as_bytes());
    Self {
      entity_type: entity_type.to_string(),
      scope: hex::encode(hasher.finalize()),
    }
  }

  /// Key for a record type listed through the given filter.
  pub fn for_filter<T: Record>(filter: &T::Filter) -> Self {
    Self::new(T::COLLECTION, &filter.describe())
  }
}

/// A mirrored record with its mirror-only metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorEntry<T> {
  pub record: T,
  pub timestamp: DateTime<Utc>,
  pub position: u64,
}

/// Latest aggregate count written for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorCount {
  pub count: u64,
  pub timestamp: DateTime<Utc>,
}

/// Storage backend for mirrored records.
///
/// Writes are last-write-wins upserts; reads ignore freshness, which is for
/// the caller to judge from the returned timestamps.
pub trait MirrorCache: Send + Sync + 'static {
  /// Upsert records by id, placing them at `offset..` in list order and
  /// stamping each with `timestamp`.
  fn write<T: Record>(
    &self,
    key: &MirrorKey,
    records: &[T],
    offset: u64,
    timestamp: DateTime<Utc>,
  ) -> Result<()>;

  /// All rows of a key in list order. A row that no longer decodes fails
  /// the whole read.
  fn read<T: Record>(&self, key: &MirrorKey) -> Result<Vec<MirrorEntry<T>>>;

  fn write_count(&self, key: &MirrorKey, count: u64, timestamp: DateTime<Utc>) -> Result<()>;

  fn read_count(&self, key: &MirrorKey) -> Result<Option<MirrorCount>>;

  /// Delete every row and count of an entity type stamped before
  /// `older_than`. Returns the number of record rows removed.
  fn expire(&self, entity_type: &str, older_than: DateTime<Utc>) -> Result<usize>;

  /// Remove one key's rows and count.
  fn clear(&self, key: &MirrorKey) -> Result<()>;

  /// Drop everything.
  fn reset(&self) -> Result<()>;
}
