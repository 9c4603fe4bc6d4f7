//! Spa client bundling the list fetch of every entity.

use serde::Serialize;
use std::sync::Arc;

use crate::config::{Backend, Config};
use crate::error::{Error, Result};
use crate::mirror::{MirrorCache, SqliteMirror};
use crate::model::{
  ActiveStatus, Booking, InventoryItem, Record, Service, Settings, Staff, StaffCounts,
  StaffFilter, Supplier, Transaction,
};
use crate::store::{to_fields, FirestoreClient, MemoryStore, RemoteStore};

use super::accessor::CollectionAccessor;
use super::layer::{Page, PageRequest, PaginatedCachedFetch};

/// A listed record type the client knows how to reach.
pub trait Entity: Record {
  fn lists(client: &SpaClient) -> &PaginatedCachedFetch<Self, SqliteMirror>;
}

macro_rules! entity {
  ($ty:ty, $field:ident) => {
    impl Entity for $ty {
      fn lists(client: &SpaClient) -> &PaginatedCachedFetch<Self, SqliteMirror> {
        &client.$field
      }
    }
  };
}

entity!(Booking, bookings);
entity!(InventoryItem, inventory);
entity!(Staff, staffs);
entity!(Supplier, suppliers);
entity!(Service, services);
entity!(Transaction, transactions);

/// Spa data client: typed CRUD plus the cached list fetch per entity.
///
/// Cheap to clone; every clone shares the store, the mirror and the
/// in-flight request table.
#[derive(Clone)]
pub struct SpaClient {
  store: Arc<dyn RemoteStore>,
  mirror: Arc<SqliteMirror>,
  page_size: u32,
  bookings: PaginatedCachedFetch<Booking, SqliteMirror>,
  inventory: PaginatedCachedFetch<InventoryItem, SqliteMirror>,
  staffs: PaginatedCachedFetch<Staff, SqliteMirror>,
  suppliers: PaginatedCachedFetch<Supplier, SqliteMirror>,
  services: PaginatedCachedFetch<Service, SqliteMirror>,
  transactions: PaginatedCachedFetch<Transaction, SqliteMirror>,
}

impl SpaClient {
  /// Build the client from configuration: remote backend plus the on-disk mirror.
  pub fn from_config(config: &Config) -> Result<Self> {
    let store: Arc<dyn RemoteStore> = match config.backend {
      Backend::Firestore => Arc::new(FirestoreClient::new(
        &config.firestore,
        Config::firestore_token(),
      )?),
      Backend::Memory => Arc::new(MemoryStore::new()),
    };

    let path = match &config.cache.mirror_path {
      Some(path) => path.clone(),
      None => SqliteMirror::default_path()?,
    };
    tracing::info!(backend = ?config.backend, mirror = %path.display(), "Opening spa client");
    let mirror = SqliteMirror::open(&path)?;

    Ok(Self::with_parts(store, Arc::new(mirror), config.cache.page_size))
  }

  pub fn with_parts(store: Arc<dyn RemoteStore>, mirror: Arc<SqliteMirror>, page_size: u32) -> Self {
    fn lists<T: Record>(
      store: &Arc<dyn RemoteStore>,
      mirror: &Arc<SqliteMirror>,
    ) -> PaginatedCachedFetch<T, SqliteMirror> {
      PaginatedCachedFetch::new(CollectionAccessor::new(Arc::clone(store)), Arc::clone(mirror))
    }

    Self {
      bookings: lists(&store, &mirror),
      inventory: lists(&store, &mirror),
      staffs: lists(&store, &mirror),
      suppliers: lists(&store, &mirror),
      services: lists(&store, &mirror),
      transactions: lists(&store, &mirror),
      store,
      mirror,
      page_size,
    }
  }

  /// Configured default page size.
  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  pub fn lists<T: Entity>(&self) -> &PaginatedCachedFetch<T, SqliteMirror> {
    T::lists(self)
  }

  pub fn accessor<T: Entity>(&self) -> &CollectionAccessor<T> {
    T::lists(self).accessor()
  }

  pub async fn list<T: Entity>(&self, request: PageRequest<T::Filter>) -> Result<Page<T>> {
    self.lists::<T>().fetch(request).await
  }

  pub async fn get<T: Entity>(&self, id: &str) -> Result<T> {
    self.accessor::<T>().get(id).await
  }

  pub async fn create<T: Entity>(&self, record: &T) -> Result<T> {
    self.accessor::<T>().add(record).await
  }

  pub async fn update<T: Entity, P: Serialize + ?Sized>(&self, id: &str, patch: &P) -> Result<T> {
    self.accessor::<T>().update(id, patch).await
  }

  pub async fn delete<T: Entity>(&self, id: &str) -> Result<()> {
    self.accessor::<T>().delete(id).await
  }

  /// Booking for the public status page. A blank id is `NotFound` too.
  pub async fn lookup_booking(&self, id: &str) -> Result<Booking> {
    let id = id.trim();
    if id.is_empty() {
      return Err(Error::not_found(Booking::COLLECTION, id));
    }
    self.get::<Booking>(id).await
  }

  /// The booking a transaction points at, if it still exists.
  pub async fn transaction_booking(&self, transaction: &Transaction) -> Result<Option<Booking>> {
    if transaction.booking_id.trim().is_empty() {
      return Ok(None);
    }
    match self.get::<Booking>(&transaction.booking_id).await {
      Ok(booking) => Ok(Some(booking)),
      Err(e) if e.is_not_found() => Ok(None),
      Err(e) => Err(e),
    }
  }

  /// Staff headcount from server-side aggregate counts.
  pub async fn staff_status_counts(&self) -> Result<StaffCounts> {
    let staffs = self.accessor::<Staff>();
    let everyone = StaffFilter::default();
    let active = StaffFilter::with_status(ActiveStatus::Active);
    let inactive = StaffFilter::with_status(ActiveStatus::Inactive);
    let (total, active, inactive) = futures::try_join!(
      staffs.count(&everyone),
      staffs.count(&active),
      staffs.count(&inactive),
    )?;
    Ok(StaffCounts {
      total,
      active,
      inactive,
    })
  }

  /// Business settings, or the defaults when none were saved yet.
  pub async fn settings(&self) -> Result<Settings> {
    match self
      .store
      .get(Settings::COLLECTION, Settings::DOCUMENT_ID)
      .await
    {
      Ok(doc) => doc.into_record(),
      Err(e) if e.is_not_found() => Ok(Settings::default()),
      Err(e) => Err(e),
    }
  }

  pub async fn save_settings(&self, settings: &Settings) -> Result<Settings> {
    let mut stamped = settings.clone();
    stamped.updated_at = Some(chrono::Utc::now());
    let fields = to_fields(&stamped)?;

    let doc = match self
      .store
      .patch(Settings::COLLECTION, Settings::DOCUMENT_ID, fields.clone())
      .await
    {
      Err(e) if e.is_not_found() => {
        self
          .store
          .create(Settings::COLLECTION, Some(Settings::DOCUMENT_ID), fields)
          .await?
      }
      other => other?,
    };
    tracing::info!("Saved business settings");
    doc.into_record()
  }

  /// Drop every mirrored row.
  pub fn reset_mirror(&self) -> Result<()> {
    self.mirror.reset()?;
    tracing::info!("Mirror reset");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{StaffFilter, TransactionStatus};
  use serde_json::json;

  fn client() -> (Arc<MemoryStore>, SpaClient) {
    let store = Arc::new(MemoryStore::new());
    let mirror = Arc::new(SqliteMirror::open_in_memory().unwrap());
    (store.clone(), SpaClient::with_parts(store, mirror, 10))
  }

  fn staff(name: &str, status: ActiveStatus) -> Staff {
    Staff {
      id: String::new(),
      name: name.to_string(),
      role: "therapist".to_string(),
      email: String::new(),
      phone: String::new(),
      status,
      specialties: vec!["massage".to_string()],
      created_at: None,
      updated_at: None,
    }
  }

  #[tokio::test]
  async fn test_staff_counts_span_all_pages() {
    let (_, client) = client();
    for i in 0..12 {
      let status = if i % 3 == 0 {
        ActiveStatus::Inactive
      } else {
        ActiveStatus::Active
      };
      client
        .create(&staff(&format!("Staff {:02}", i), status))
        .await
        .unwrap();
    }

    // Only one page is loaded, the counts still cover every record
    let page = client
      .list::<Staff>(PageRequest::first(StaffFilter::default(), 5))
      .await
      .unwrap();
    assert_eq!(page.items.len(), 5);

    let counts = client.staff_status_counts().await.unwrap();
    assert_eq!(
      counts,
      StaffCounts {
        total: 12,
        active: 8,
        inactive: 4
      }
    );
  }

  #[tokio::test]
  async fn test_lookup_booking_not_found() {
    let (_, client) = client();
    assert!(client.lookup_booking("missing").await.unwrap_err().is_not_found());
    assert!(client.lookup_booking("  ").await.unwrap_err().is_not_found());
  }

  #[tokio::test]
  async fn test_transaction_booking() {
    let (store, client) = client();
    store
      .insert(
        "bookings",
        "b1",
        json!({"customerName": "Ana", "service": "Facial", "date": "2026-10-20"})
          .as_object()
          .cloned()
          .unwrap(),
      )
      .unwrap();

    let mut txn = Transaction {
      id: "t1".to_string(),
      booking_id: "b1".to_string(),
      customer_name: "Ana".to_string(),
      amount: 80.0,
      method: "card".to_string(),
      status: TransactionStatus::Completed,
      date: chrono::Utc::now(),
      created_at: None,
      updated_at: None,
    };
    let booking = client.transaction_booking(&txn).await.unwrap().unwrap();
    assert_eq!(booking.customer_name, "Ana");

    txn.booking_id = "gone".to_string();
    assert_eq!(client.transaction_booking(&txn).await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_settings_default_then_saved() {
    let (_, client) = client();
    assert_eq!(client.settings().await.unwrap(), Settings::default());

    let saved = client
      .save_settings(&Settings {
        business_name: "Lotus Spa".to_string(),
        ..Settings::default()
      })
      .await
      .unwrap();
    assert!(saved.updated_at.is_some());

    let loaded = client.settings().await.unwrap();
    assert_eq!(loaded.business_name, "Lotus Spa");

    let again = client
      .save_settings(&Settings {
        slot_minutes: 45,
        ..loaded
      })
      .await
      .unwrap();
    assert_eq!(again.slot_minutes, 45);
    assert_eq!(again.business_name, "Lotus Spa");
  }

  #[tokio::test]
  async fn test_reset_mirror_forces_remote() {
    let (store, client) = client();
    client.create(&staff("Ana", ActiveStatus::Active)).await.unwrap();
    let request = PageRequest::first(StaffFilter::default(), 5);
    client.list::<Staff>(request.clone()).await.unwrap();
    let calls = store.query_calls();

    client.reset_mirror().unwrap();
    client.list::<Staff>(request).await.unwrap();
    assert_eq!(store.query_calls(), calls + 1);
  }
}
