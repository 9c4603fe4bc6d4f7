//! Domain records stored in the remote collections.

mod booking;
mod inventory;
mod service;
mod settings;
mod staff;
mod supplier;
mod transaction;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::store::{FieldFilter, OrderBy};

pub use booking::{Booking, BookingFilter, BookingPatch, BookingStatus, BookingTab};
pub use inventory::{InventoryFilter, InventoryItem, StockStatus};
pub use service::{Service, ServiceFilter};
pub use settings::Settings;
pub use staff::{Staff, StaffCounts, StaffFilter};
pub use supplier::{Supplier, SupplierFilter};
pub use transaction::{Transaction, TransactionFilter, TransactionStatus};

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// How a new record gets its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
  /// The remote store assigns an id.
  StoreAssigned,
  /// Wall-clock milliseconds at creation time.
  WallClock,
}

/// A typed record living in a named remote collection.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Remote collection name, also the mirror's entity type.
  const COLLECTION: &'static str;

  const ID_STRATEGY: IdStrategy = IdStrategy::StoreAssigned;

  /// Filter/tab type selecting which records a list shows.
  type Filter: ListFilter;

  fn id(&self) -> &str;
}

/// Describes one list view of a collection: predicates, ordering, and a
/// stable description used to key mirror rows.
pub trait ListFilter:
  Clone + Default + std::fmt::Debug + Send + Sync + DeserializeOwned + 'static
{
  /// Equality/range predicates applied before ordering.
  fn filters(&self) -> Vec<FieldFilter>;

  fn order_by(&self) -> OrderBy;

  /// Stable text identifying this filter; equal filters give equal text.
  fn describe(&self) -> String;

  /// Tabs offered by list views, first is the default.
  fn tabs() -> Vec<Self> {
    vec![Self::default()]
  }

  fn tab_label(&self) -> String {
    "All".to_string()
  }
}

/// Active/inactive flag shared by staff and suppliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveStatus {
  #[default]
  Active,
  Inactive,
}

impl ActiveStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Inactive => "inactive",
    }
  }
}

/// Declare an open string enum: known variants plus `Other` preserving any
/// unrecognised value verbatim.
macro_rules! open_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    #[serde(from = "String", into = "String")]
    pub enum $name {
      $($variant,)+
      Other(String),
    }

    impl $name {
      pub fn as_str(&self) -> &str {
        match self {
          $(Self::$variant => $text,)+
          Self::Other(s) => s,
        }
      }
    }

    impl From<String> for $name {
      fn from(s: String) -> Self {
        match s.as_str() {
          $($text => Self::$variant,)+
          _ => Self::Other(s),
        }
      }
    }

    impl From<$name> for String {
      fn from(value: $name) -> Self {
        value.as_str().to_string()
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

pub(crate) use open_enum;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_open_enum_preserves_unknown() {
    let status: BookingStatus = serde_json::from_str("\"no-show\"").unwrap();
    assert_eq!(status, BookingStatus::Other("no-show".to_string()));
    assert_eq!(serde_json::to_string(&status).unwrap(), "\"no-show\"");
  }

  #[test]
  fn test_open_enum_known_values() {
    let status: TransactionStatus = serde_json::from_str("\"failed\"").unwrap();
    assert_eq!(status, TransactionStatus::Failed);
    assert_eq!(status.to_string(), "failed");
  }
}
