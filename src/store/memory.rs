//! In-process document store with Firestore-like query semantics.

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Error, Result};

use super::query::{CollectionQuery, Cursor, Direction, FieldFilter, FilterOp};
use super::{Document, RemoteStore};

type Collection = BTreeMap<String, Map<String, Value>>;

/// Document store held in memory.
///
/// Documents missing a filtered or ordered field are excluded from results,
/// as in Firestore. Call counters and one-shot failures exist for tests.
#[derive(Default)]
pub struct MemoryStore {
  collections: Mutex<HashMap<String, Collection>>,
  next_id: AtomicU64,
  query_calls: AtomicU64,
  count_calls: AtomicU64,
  fail_next: Mutex<Option<String>>,
  latency: Option<Duration>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Delay every query and count by `latency`.
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = Some(latency);
    self
  }

  /// Number of `run_query` calls served so far.
  pub fn query_calls(&self) -> u64 {
    self.query_calls.load(AtomicOrdering::SeqCst)
  }

  /// Number of `count` calls served so far.
  pub fn count_calls(&self) -> u64 {
    self.count_calls.load(AtomicOrdering::SeqCst)
  }

  /// Make the next read fail with a remote error carrying `message`.
  pub fn fail_next(&self, message: &str) {
    if let Ok(mut slot) = self.fail_next.lock() {
      *slot = Some(message.to_string());
    }
  }

  /// Insert or replace a document without any bookkeeping.
  pub fn insert(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
    let mut collections = self.lock()?;
    collections
      .entry(collection.to_string())
      .or_default()
      .insert(id.to_string(), fields);
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Collection>>> {
    self
      .collections
      .lock()
      .map_err(|e| Error::Remote(format!("Lock poisoned: {}", e)))
  }

  fn take_failure(&self) -> Result<()> {
    let failure = self.fail_next.lock().ok().and_then(|mut slot| slot.take());
    match failure {
      Some(message) => Err(Error::Remote(message)),
      None => Ok(()),
    }
  }

  async fn simulate_latency(&self) {
    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }
  }

  fn matching(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
    let collections = self.lock()?;
    let docs: Vec<Document> = collections
      .get(&query.collection)
      .map(|collection| {
        collection
          .iter()
          .filter(|(_, fields)| query.filters.iter().all(|f| matches_filter(fields, f)))
          .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
          .collect()
      })
      .unwrap_or_default();
    Ok(docs)
  }
}

fn matches_filter(fields: &Map<String, Value>, filter: &FieldFilter) -> bool {
  let Some(value) = fields.get(&filter.field) else {
    return false;
  };
  let ordering = compare_values(value, &filter.value);
  match filter.op {
    FilterOp::Equal => ordering == Ordering::Equal,
    FilterOp::LessThan => ordering == Ordering::Less,
    FilterOp::LessThanOrEqual => ordering != Ordering::Greater,
    FilterOp::GreaterThan => ordering == Ordering::Greater,
    FilterOp::GreaterThanOrEqual => ordering != Ordering::Less,
  }
}

fn type_rank(value: &Value) -> u8 {
  match value {
    Value::Null => 0,
    Value::Bool(_) => 1,
    Value::Number(_) => 2,
    Value::String(_) => 3,
    Value::Array(_) => 4,
    Value::Object(_) => 5,
  }
}

/// Total order over JSON values: by type first, then by value.
fn compare_values(a: &Value, b: &Value) -> Ordering {
  match (a, b) {
    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
    (Value::Number(x), Value::Number(y)) => {
      let x = x.as_f64().unwrap_or(f64::NAN);
      let y = y.as_f64().unwrap_or(f64::NAN);
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
    (Value::String(x), Value::String(y)) => compare_strings(x, y),
    (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
      a.to_string().cmp(&b.to_string())
    }
    _ => type_rank(a).cmp(&type_rank(b)),
  }
}

/// Timestamps compare as instants, whatever their fractional precision.
fn compare_strings(a: &str, b: &str) -> Ordering {
  match (
    DateTime::parse_from_rfc3339(a),
    DateTime::parse_from_rfc3339(b),
  ) {
    (Ok(x), Ok(y)) => x.cmp(&y),
    _ => a.cmp(b),
  }
}

/// Compare two (value, id) positions in ascending order.
fn compare_position(a_value: &Value, a_id: &str, b_value: &Value, b_id: &str) -> Ordering {
  compare_values(a_value, b_value).then_with(|| a_id.cmp(b_id))
}

fn after_cursor(doc: &Document, field: Option<&str>, cursor: &Cursor, direction: Direction) -> bool {
  let value = field
    .and_then(|f| doc.fields.get(f))
    .unwrap_or(&Value::Null);
  let ordering = compare_position(value, &doc.id, &cursor.value, &cursor.id);
  match direction {
    Direction::Ascending => ordering == Ordering::Greater,
    Direction::Descending => ordering == Ordering::Less,
  }
}

#[async_trait]
impl RemoteStore for MemoryStore {
  async fn run_query(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
    self.query_calls.fetch_add(1, AtomicOrdering::SeqCst);
    self.simulate_latency().await;
    self.take_failure()?;

    let mut docs = self.matching(query)?;
    let field = query.order_by.as_ref().map(|o| o.field.as_str());
    let direction = query
      .order_by
      .as_ref()
      .map(|o| o.direction)
      .unwrap_or(Direction::Ascending);

    if let Some(field) = field {
      docs.retain(|d| d.fields.contains_key(field));
    }

    docs.sort_by(|a, b| {
      let null = Value::Null;
      let av = field.and_then(|f| a.fields.get(f)).unwrap_or(&null);
      let bv = field.and_then(|f| b.fields.get(f)).unwrap_or(&null);
      let ordering = compare_position(av, &a.id, bv, &b.id);
      match direction {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
      }
    });

    if let Some(cursor) = &query.start_after {
      docs.retain(|d| after_cursor(d, field, cursor, direction));
    }

    if let Some(limit) = query.limit {
      docs.truncate(limit as usize);
    }

    Ok(docs)
  }

  async fn count(&self, query: &CollectionQuery) -> Result<u64> {
    self.count_calls.fetch_add(1, AtomicOrdering::SeqCst);
    self.simulate_latency().await;
    self.take_failure()?;

    Ok(self.matching(query)?.len() as u64)
  }

  async fn get(&self, collection: &str, id: &str) -> Result<Document> {
    self.take_failure()?;
    let collections = self.lock()?;
    collections
      .get(collection)
      .and_then(|c| c.get(id))
      .map(|fields| Document::new(id, fields.clone()))
      .ok_or_else(|| Error::not_found(collection, id))
  }

  async fn create(
    &self,
    collection: &str,
    id: Option<&str>,
    fields: Map<String, Value>,
  ) -> Result<Document> {
    let id = match id {
      Some(id) => id.to_string(),
      None => format!(
        "doc{:06}",
        self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1
      ),
    };

    let mut collections = self.lock()?;
    let docs = collections.entry(collection.to_string()).or_default();
    if docs.contains_key(&id) {
      return Err(Error::Remote(format!(
        "Document {}/{} already exists",
        collection, id
      )));
    }
    docs.insert(id.clone(), fields.clone());
    Ok(Document::new(id, fields))
  }

  async fn patch(
    &self,
    collection: &str,
    id: &str,
    fields: Map<String, Value>,
  ) -> Result<Document> {
    let mut collections = self.lock()?;
    let existing = collections
      .get_mut(collection)
      .and_then(|c| c.get_mut(id))
      .ok_or_else(|| Error::not_found(collection, id))?;
    existing.extend(fields);
    Ok(Document::new(id, existing.clone()))
  }

  async fn delete(&self, collection: &str, id: &str) -> Result<()> {
    let mut collections = self.lock()?;
    if let Some(docs) = collections.get_mut(collection) {
      docs.remove(id);
    }
    Ok(())
  }
}
