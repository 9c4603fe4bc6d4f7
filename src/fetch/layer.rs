//! Cursor-paginated list fetch with a mirror in front of the remote store.

use chrono::{Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::mirror::{MirrorCache, MirrorKey};
use crate::model::Record;
use crate::store::Cursor;

use super::accessor::{CollectionAccessor, RemotePage};

/// How long mirrored rows are trusted without asking the remote store.
pub const FRESHNESS_MINUTES: i64 = 5;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One list request from a table.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest<F> {
  pub filter: F,
  /// 1-based
  pub page: u32,
  pub page_size: u32,
  /// Last record of the previous page; `None` for page 1
  pub cursor: Option<Cursor>,
  /// Skip the mirror and overwrite it with the remote result
  pub refresh: bool,
}

impl<F: Default> Default for PageRequest<F> {
  fn default() -> Self {
    Self {
      filter: F::default(),
      page: 1,
      page_size: DEFAULT_PAGE_SIZE,
      cursor: None,
      refresh: false,
    }
  }
}

impl<F> PageRequest<F> {
  pub fn first(filter: F, page_size: u32) -> Self {
    Self {
      filter,
      page: 1,
      page_size,
      cursor: None,
      refresh: false,
    }
  }

  pub fn refreshed(mut self) -> Self {
    self.refresh = true;
    self
  }
}

/// Where a page's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
  Remote,
  Mirror,
}

/// Uniform list result handed to every table.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Always `None` for a mirror hit
  pub last_cursor: Option<Cursor>,
  pub total_count: u64,
  pub source: PageSource,
}

type SharedPage<T> = Shared<BoxFuture<'static, Result<Page<T>>>>;
type InFlight<T> = Arc<Mutex<HashMap<String, SharedPage<T>>>>;

/// The list fetch every entity table goes through.
///
/// Page 1 is served from the mirror while its first row is fresh; anything
/// else goes to the remote store and is written back. Identical concurrent
/// remote fetches share one request.
pub struct PaginatedCachedFetch<T, M> {
  accessor: CollectionAccessor<T>,
  mirror: Arc<M>,
  freshness: Duration,
  in_flight: InFlight<T>,
}

impl<T, M> Clone for PaginatedCachedFetch<T, M> {
  fn clone(&self) -> Self {
    Self {
      accessor: self.accessor.clone(),
      mirror: Arc::clone(&self.mirror),
      freshness: self.freshness,
      in_flight: Arc::clone(&self.in_flight),
    }
  }
}

/// Drops the in-flight entry once its first waiter finishes or goes away.
struct InFlightGuard<T> {
  in_flight: InFlight<T>,
  key: String,
  future: SharedPage<T>,
}

impl<T> Drop for InFlightGuard<T> {
  fn drop(&mut self) {
    if let Ok(mut in_flight) = self.in_flight.lock() {
      // A newer request may already own the slot
      if in_flight
        .get(&self.key)
        .is_some_and(|current| current.ptr_eq(&self.future))
      {
        in_flight.remove(&self.key);
      }
    }
  }
}

impl<T: Record, M: MirrorCache> PaginatedCachedFetch<T, M> {
  pub fn new(accessor: CollectionAccessor<T>, mirror: Arc<M>) -> Self {
    Self {
      accessor,
      mirror,
      freshness: Duration::minutes(FRESHNESS_MINUTES),
      in_flight: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub fn with_freshness(mut self, freshness: Duration) -> Self {
    self.freshness = freshness;
    self
  }

  pub fn accessor(&self) -> &CollectionAccessor<T> {
    &self.accessor
  }

  /// Fetch one page, honouring `request.refresh`.
  pub async fn fetch(&self, request: PageRequest<T::Filter>) -> Result<Page<T>> {
    if request.page == 0 || request.page_size == 0 {
      return Err(Error::Invalid(
        "page and page size must be positive".to_string(),
      ));
    }

    let key = MirrorKey::for_filter::<T>(&request.filter);
    if request.page == 1 && !request.refresh {
      if let Some(page) = self.mirrored(&key, request.page_size) {
        tracing::debug!(entity = T::COLLECTION, "Serving page 1 from mirror");
        return Ok(page);
      }
    }

    self.remote(key, request).await
  }

  /// Fetch from the remote store regardless of mirror freshness.
  pub async fn refresh(&self, request: PageRequest<T::Filter>) -> Result<Page<T>> {
    self.fetch(request.refreshed()).await
  }

  /// Like `fetch`, but gives up with `Error::Cancelled` once `token` fires.
  /// A result arriving after cancellation is dropped.
  pub async fn fetch_until_cancelled(
    &self,
    request: PageRequest<T::Filter>,
    token: &CancellationToken,
  ) -> Result<Page<T>> {
    if token.is_cancelled() {
      return Err(Error::Cancelled);
    }

    tokio::select! {
      biased;
      _ = token.cancelled() => Err(Error::Cancelled),
      result = self.fetch(request) => {
        if token.is_cancelled() {
          Err(Error::Cancelled)
        } else {
          result
        }
      }
    }
  }

  /// Mirrored page 1, or `None` when the mirror can't answer.
  fn mirrored(&self, key: &MirrorKey, page_size: u32) -> Option<Page<T>> {
    let rows = match self.mirror.read::<T>(key) {
      Ok(rows) => rows,
      Err(e) => {
        tracing::warn!(entity = T::COLLECTION, error = %e, "Mirror read failed");
        return None;
      }
    };

    let first = rows.first()?;
    let now = Utc::now();
    if now - first.timestamp >= self.freshness {
      if let Err(e) = self.mirror.expire(T::COLLECTION, now - self.freshness) {
        tracing::warn!(entity = T::COLLECTION, error = %e, "Mirror expiry failed");
      }
      return None;
    }

    let count = match self.mirror.read_count(key) {
      Ok(Some(count)) => count.count,
      Ok(None) => return None,
      Err(e) => {
        tracing::warn!(entity = T::COLLECTION, error = %e, "Mirror count read failed");
        return None;
      }
    };

    // A smaller earlier page size left too few rows for this request
    let page_size = page_size as usize;
    if rows.len() < page_size && (rows.len() as u64) < count {
      return None;
    }

    Some(Page {
      items: rows.into_iter().take(page_size).map(|row| row.record).collect(),
      last_cursor: None,
      total_count: count,
      source: PageSource::Mirror,
    })
  }

  async fn remote(&self, key: MirrorKey, request: PageRequest<T::Filter>) -> Result<Page<T>> {
    let flight_key = format!(
      "{}|{}|{}|{}|{}",
      key.entity_type,
      key.scope,
      request.page,
      request.page_size,
      request
        .cursor
        .as_ref()
        .map(Cursor::to_token)
        .unwrap_or_default()
    );

    let future = {
      let mut in_flight = self
        .in_flight
        .lock()
        .map_err(|e| Error::Mirror(format!("Lock poisoned: {}", e)))?;

      match in_flight.get(&flight_key) {
        Some(existing) => {
          tracing::debug!(entity = T::COLLECTION, page = request.page, "Joining in-flight fetch");
          existing.clone()
        }
        None => {
          let this = self.clone();
          let future = async move { this.load(key, request).await }.boxed().shared();
          in_flight.insert(flight_key.clone(), future.clone());
          future
        }
      }
    };

    let _guard = InFlightGuard {
      in_flight: Arc::clone(&self.in_flight),
      key: flight_key,
      future: future.clone(),
    };
    future.await
  }

  async fn load(&self, key: MirrorKey, request: PageRequest<T::Filter>) -> Result<Page<T>> {
    let page = self
      .accessor
      .list_page(&request.filter, request.page_size, request.cursor.clone())
      .await?;

    match self.write_offset(&key, &request) {
      Ok(Some(offset)) => {
        if let Err(e) = self.write_back(&key, request.page, offset, &page) {
          tracing::warn!(entity = T::COLLECTION, error = %e, "Mirror write failed");
        }
      }
      Ok(None) => {
        tracing::debug!(
          entity = T::COLLECTION,
          page = request.page,
          "Cursor not mirrored, skipping write-back"
        );
      }
      Err(e) => {
        tracing::warn!(entity = T::COLLECTION, error = %e, "Mirror read failed");
      }
    }

    Ok(Page {
      items: page.records,
      last_cursor: page.last_cursor,
      total_count: page.total_count,
      source: PageSource::Remote,
    })
  }

  /// Mirror position of a page's first record: right after the cursor's
  /// row. `None` when the cursor record isn't in this scope.
  fn write_offset(&self, key: &MirrorKey, request: &PageRequest<T::Filter>) -> Result<Option<u64>> {
    if request.page == 1 {
      return Ok(Some(0));
    }
    let Some(cursor) = &request.cursor else {
      return Ok(None);
    };

    let rows = self.mirror.read::<T>(key)?;
    Ok(
      rows
        .iter()
        .find(|row| row.record.id() == cursor.id)
        .map(|row| row.position + 1),
    )
  }

  fn write_back(&self, key: &MirrorKey, page: u32, offset: u64, result: &RemotePage<T>) -> Result<()> {
    let now = Utc::now();
    if page == 1 {
      self.mirror.clear(key)?;
    }
    self.mirror.write(key, &result.records, offset, now)?;
    self.mirror.write_count(key, result.total_count, now)
  }
}
