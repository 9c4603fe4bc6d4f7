//! Typed access to one remote collection.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{IdStrategy, ListFilter, Record, CREATED_AT, UPDATED_AT};
use crate::store::{to_fields, CollectionQuery, Cursor, Document, RemoteStore};

/// One page as returned by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage<T> {
  pub records: Vec<T>,
  /// Cursor of the last record, `None` when the page is empty
  pub last_cursor: Option<Cursor>,
  /// Count of every record matching the filter, not just this page
  pub total_count: u64,
}

/// Maps documents of `T::COLLECTION` to typed records.
///
/// Remote failures propagate as-is; nothing here retries.
pub struct CollectionAccessor<T> {
  store: Arc<dyn RemoteStore>,
  _record: PhantomData<fn() -> T>,
}

impl<T> Clone for CollectionAccessor<T> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      _record: PhantomData,
    }
  }
}

static LAST_WALL_CLOCK_ID: AtomicI64 = AtomicI64::new(0);

/// Epoch milliseconds, bumped past the last id handed out so two creates in
/// the same millisecond never share one.
fn wall_clock_id() -> String {
  let now = Utc::now().timestamp_millis();
  let previous = LAST_WALL_CLOCK_ID
    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
      Some(now.max(last + 1))
    })
    .unwrap_or(now);
  now.max(previous + 1).to_string()
}

fn now_timestamp() -> Value {
  Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl<T: Record> CollectionAccessor<T> {
  pub fn new(store: Arc<dyn RemoteStore>) -> Self {
    Self {
      store,
      _record: PhantomData,
    }
  }

  /// Filtered, ordered query for a list view, without paging.
  pub fn query(&self, filter: &T::Filter) -> CollectionQuery {
    CollectionQuery::new(T::COLLECTION)
      .filters(filter.filters())
      .order_by(filter.order_by())
  }

  /// Fetch up to `page_size` records after `cursor`, plus the total count.
  pub async fn list_page(
    &self,
    filter: &T::Filter,
    page_size: u32,
    cursor: Option<Cursor>,
  ) -> Result<RemotePage<T>> {
    if page_size == 0 {
      return Err(Error::Invalid("page size must be positive".to_string()));
    }

    let query = self.query(filter).limit(page_size).start_after(cursor);
    let count_query = query.count_query();
    tracing::debug!(query = %query.describe(), "Fetching page");

    let (docs, total_count) = futures::try_join!(
      self.store.run_query(&query),
      self.store.count(&count_query)
    )?;

    let last_cursor = docs.last().map(|d| d.cursor_for(query.order_by.as_ref()));
    let records = docs
      .into_iter()
      .map(Document::into_record)
      .collect::<Result<Vec<T>>>()?;

    Ok(RemotePage {
      records,
      last_cursor,
      total_count,
    })
  }

  /// Cursor resuming the list right after `record`.
  pub fn cursor_after(&self, filter: &T::Filter, record: &T) -> Result<Cursor> {
    let order = filter.order_by();
    let fields = to_fields(record)?;
    Ok(Document::new(record.id(), fields).cursor_for(Some(&order)))
  }

  pub async fn count(&self, filter: &T::Filter) -> Result<u64> {
    self.store.count(&self.query(filter).count_query()).await
  }

  pub async fn get(&self, id: &str) -> Result<T> {
    self.store.get(T::COLLECTION, id).await?.into_record()
  }

  /// Create a record, stamping `createdAt` and `updatedAt`.
  ///
  /// Any `id` on the input is ignored; the id comes from the store or the
  /// wall clock depending on the record type.
  pub async fn add(&self, record: &T) -> Result<T> {
    let mut fields = to_fields(record)?;
    let now = now_timestamp();
    fields.insert(CREATED_AT.to_string(), now.clone());
    fields.insert(UPDATED_AT.to_string(), now);

    let id = match T::ID_STRATEGY {
      IdStrategy::StoreAssigned => None,
      IdStrategy::WallClock => Some(wall_clock_id()),
    };

    let doc = self.store.create(T::COLLECTION, id.as_deref(), fields).await?;
    tracing::info!(collection = T::COLLECTION, id = %doc.id, "Created record");
    doc.into_record()
  }

  /// Apply a partial update. Only the given fields change, plus `updatedAt`.
  pub async fn update<P: Serialize + ?Sized>(&self, id: &str, patch: &P) -> Result<T> {
    let mut fields: Map<String, Value> = to_fields(patch)?;
    fields.remove(CREATED_AT);
    fields.insert(UPDATED_AT.to_string(), now_timestamp());

    let doc = self.store.patch(T::COLLECTION, id, fields).await?;
    tracing::info!(collection = T::COLLECTION, id, "Updated record");
    doc.into_record()
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    self.store.delete(T::COLLECTION, id).await?;
    tracing::info!(collection = T::COLLECTION, id, "Deleted record");
    Ok(())
  }
}
