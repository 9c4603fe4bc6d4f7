//! Remote document store access.
//!
//! `RemoteStore` is the seam between the application and the hosted database.
//! `FirestoreClient` talks to Firestore over REST; `MemoryStore` keeps the
//! same query semantics in process for tests and local runs.

mod api_types;
mod firestore;
mod memory;
pub mod query;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub use firestore::FirestoreClient;
pub use memory::MemoryStore;
pub use query::{CollectionQuery, Cursor, Direction, FieldFilter, FilterOp, OrderBy};

/// A raw document: store-assigned id plus its JSON fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub id: String,
  pub fields: Map<String, Value>,
}

impl Document {
  pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
    Self {
      id: id.into(),
      fields,
    }
  }

  /// Cursor pointing at this document under the given ordering.
  pub fn cursor_for(&self, order: Option<&OrderBy>) -> Cursor {
    let value = order
      .and_then(|o| self.fields.get(&o.field))
      .cloned()
      .unwrap_or(Value::Null);
    Cursor {
      value,
      id: self.id.clone(),
    }
  }

  /// Map into a typed record; the document id becomes the record's `id` field.
  pub fn into_record<T: DeserializeOwned>(self) -> Result<T> {
    let Document { id, mut fields } = self;
    fields.insert("id".to_string(), Value::String(id.clone()));
    serde_json::from_value(Value::Object(fields))
      .map_err(|e| Error::Decode(format!("document {}: {}", id, e)))
  }
}

/// Serialize a value into a document field map, dropping any `id` field.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> Result<Map<String, Value>> {
  match serde_json::to_value(value)? {
    Value::Object(mut fields) => {
      fields.remove("id");
      Ok(fields)
    }
    other => Err(Error::Invalid(format!(
      "expected an object of fields, got {}",
      other
    ))),
  }
}

/// Operations consumed from the hosted document database.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  /// Run a filtered, ordered, limited query.
  async fn run_query(&self, query: &CollectionQuery) -> Result<Vec<Document>>;

  /// Server-side count of documents matching the query's filters.
  async fn count(&self, query: &CollectionQuery) -> Result<u64>;

  async fn get(&self, collection: &str, id: &str) -> Result<Document>;

  /// Create a document. `id` of `None` lets the store assign one.
  async fn create(
    &self,
    collection: &str,
    id: Option<&str>,
    fields: Map<String, Value>,
  ) -> Result<Document>;

  /// Overwrite only the given fields of an existing document.
  async fn patch(&self, collection: &str, id: &str, fields: Map<String, Value>)
    -> Result<Document>;

  async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;
  use serde_json::json;

  #[derive(Debug, Serialize, Deserialize, PartialEq)]
  struct Pet {
    id: String,
    name: String,
  }

  #[test]
  fn test_into_record_injects_id() {
    let fields = json!({"name": "Rex"}).as_object().cloned().unwrap();
    let pet: Pet = Document::new("p1", fields).into_record().unwrap();
    assert_eq!(
      pet,
      Pet {
        id: "p1".to_string(),
        name: "Rex".to_string()
      }
    );
  }

  #[test]
  fn test_into_record_reports_document() {
    let fields = json!({"name": 5}).as_object().cloned().unwrap();
    let err = Document::new("p2", fields).into_record::<Pet>().unwrap_err();
    assert!(matches!(err, Error::Decode(msg) if msg.contains("p2")));
  }

  #[test]
  fn test_to_fields_drops_id() {
    let pet = Pet {
      id: "p1".to_string(),
      name: "Rex".to_string(),
    };
    let fields = to_fields(&pet).unwrap();
    assert!(!fields.contains_key("id"));
    assert_eq!(fields.get("name"), Some(&json!("Rex")));
  }

  #[test]
  fn test_cursor_for_missing_field_is_null() {
    let doc = Document::new("d1", Map::new());
    let cursor = doc.cursor_for(Some(&OrderBy::asc("name")));
    assert_eq!(cursor.value, Value::Null);
    assert_eq!(cursor.id, "d1");
  }
}
