//! Collection query model shared by every remote store backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Comparison applied by a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
  Equal,
  LessThan,
  LessThanOrEqual,
  GreaterThan,
  GreaterThanOrEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
  pub field: String,
  pub op: FilterOp,
  pub value: Value,
}

impl FieldFilter {
  pub fn new(field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
    Self {
      field: field.to_string(),
      op,
      value: value.into(),
    }
  }

  pub fn eq(field: &str, value: impl Into<Value>) -> Self {
    Self::new(field, FilterOp::Equal, value)
  }

  pub fn lt(field: &str, value: impl Into<Value>) -> Self {
    Self::new(field, FilterOp::LessThan, value)
  }

  pub fn le(field: &str, value: impl Into<Value>) -> Self {
    Self::new(field, FilterOp::LessThanOrEqual, value)
  }

  pub fn gt(field: &str, value: impl Into<Value>) -> Self {
    Self::new(field, FilterOp::GreaterThan, value)
  }

  pub fn ge(field: &str, value: impl Into<Value>) -> Self {
    Self::new(field, FilterOp::GreaterThanOrEqual, value)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
  Ascending,
  Descending,
}

/// Single-field ordering. Ties are broken by document id in the same direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
  pub field: String,
  pub direction: Direction,
}

impl OrderBy {
  pub fn asc(field: &str) -> Self {
    Self {
      field: field.to_string(),
      direction: Direction::Ascending,
    }
  }

  pub fn desc(field: &str) -> Self {
    Self {
      field: field.to_string(),
      direction: Direction::Descending,
    }
  }
}

/// Position of the last record of a page: its order-field value and id.
///
/// Callers treat it as opaque; over HTTP it travels as a hex token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
  pub value: Value,
  pub id: String,
}

impl Cursor {
  pub fn to_token(&self) -> String {
    // Serializing a Value-bearing struct cannot fail
    hex::encode(serde_json::to_vec(self).unwrap_or_default())
  }

  pub fn from_token(token: &str) -> Result<Self> {
    let bytes = hex::decode(token.trim()).map_err(|_| Error::InvalidCursor)?;
    serde_json::from_slice(&bytes).map_err(|_| Error::InvalidCursor)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
  pub collection: String,
  pub filters: Vec<FieldFilter>,
  pub order_by: Option<OrderBy>,
  pub limit: Option<u32>,
  pub start_after: Option<Cursor>,
}

impl CollectionQuery {
  pub fn new(collection: &str) -> Self {
    Self {
      collection: collection.to_string(),
      filters: Vec::new(),
      order_by: None,
      limit: None,
      start_after: None,
    }
  }

  pub fn filter(mut self, filter: FieldFilter) -> Self {
    self.filters.push(filter);
    self
  }

  pub fn filters(mut self, filters: impl IntoIterator<Item = FieldFilter>) -> Self {
    self.filters.extend(filters);
    self
  }

  pub fn order_by(mut self, order_by: OrderBy) -> Self {
    self.order_by = Some(order_by);
    self
  }

  pub fn limit(mut self, limit: u32) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn start_after(mut self, cursor: Option<Cursor>) -> Self {
    self.start_after = cursor;
    self
  }

  /// The same predicate without ordering, limit or cursor, for server-side counts.
  pub fn count_query(&self) -> Self {
    Self {
      collection: self.collection.clone(),
      filters: self.filters.clone(),
      order_by: None,
      limit: None,
      start_after: None,
    }
  }

  /// Short human-readable form used in log lines.
  pub fn describe(&self) -> String {
    let mut out = self.collection.clone();
    for f in &self.filters {
      out.push_str(&format!(" {}{}{}", f.field, op_symbol(f.op), f.value));
    }
    if let Some(order) = &self.order_by {
      let dir = match order.direction {
        Direction::Ascending => "asc",
        Direction::Descending => "desc",
      };
      out.push_str(&format!(" order:{} {}", order.field, dir));
    }
    if let Some(limit) = self.limit {
      out.push_str(&format!(" limit:{}", limit));
    }
    if let Some(cursor) = &self.start_after {
      out.push_str(&format!(" after:{}", cursor.id));
    }
    out
  }
}

fn op_symbol(op: FilterOp) -> &'static str {
  match op {
    FilterOp::Equal => "==",
    FilterOp::LessThan => "<",
    FilterOp::LessThanOrEqual => "<=",
    FilterOp::GreaterThan => ">",
    FilterOp::GreaterThanOrEqual => ">=",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_cursor_token_roundtrip() {
    let cursor = Cursor {
      value: json!("2026-10-16"),
      id: "abc".to_string(),
    };
    let token = cursor.to_token();
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(Cursor::from_token(&token).unwrap(), cursor);
  }

  #[test]
  fn test_cursor_rejects_garbage() {
    assert_eq!(Cursor::from_token("zz"), Err(Error::InvalidCursor));
    assert_eq!(
      Cursor::from_token(&hex::encode(b"not json")),
      Err(Error::InvalidCursor)
    );
  }

  #[test]
  fn test_count_query_drops_paging() {
    let query = CollectionQuery::new("bookings")
      .filter(FieldFilter::eq("status", "pending"))
      .order_by(OrderBy::desc("date"))
      .limit(10)
      .start_after(Some(Cursor {
        value: json!("x"),
        id: "1".to_string(),
      }));

    let count = query.count_query();
    assert_eq!(count.filters, query.filters);
    assert!(count.order_by.is_none());
    assert!(count.limit.is_none());
    assert!(count.start_after.is_none());
  }

  #[test]
  fn test_describe() {
    let query = CollectionQuery::new("staffs")
      .filter(FieldFilter::eq("status", "active"))
      .order_by(OrderBy::asc("name"))
      .limit(5);
    assert_eq!(
      query.describe(),
      "staffs status==\"active\" order:name asc limit:5"
    );
  }
}
