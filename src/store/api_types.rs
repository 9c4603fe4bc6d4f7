//! Serde types and value conversion for the Firestore REST API.
//!
//! Firestore wraps every field in a typed value (`stringValue`,
//! `integerValue`, ...). Records stay plain JSON inside the application;
//! conversion happens only at this boundary.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};

use crate::error::{Error, Result};

use super::query::{CollectionQuery, Direction, FilterOp};
use super::Document;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiDocument {
  pub name: String,
  #[serde(default)]
  pub fields: Map<String, Value>,
}

impl ApiDocument {
  pub fn into_document(self) -> Result<Document> {
    let id = self
      .name
      .rsplit('/')
      .next()
      .filter(|id| !id.is_empty())
      .ok_or_else(|| Error::Decode(format!("document name without id: {}", self.name)))?
      .to_string();
    Ok(Document::new(id, decode_fields(&self.fields)?))
  }
}

/// One element of the streamed `runQuery` response array.
#[derive(Debug, Deserialize)]
pub struct ApiRunQueryItem {
  pub document: Option<ApiDocument>,
}

#[derive(Debug, Deserialize)]
pub struct ApiAggregationResult {
  #[serde(rename = "aggregateFields", default)]
  pub aggregate_fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiAggregationItem {
  pub result: Option<ApiAggregationResult>,
}

pub const COUNT_ALIAS: &str = "total";

/// Pull the count out of a `runAggregationQuery` response.
pub fn aggregation_count(items: &[ApiAggregationItem]) -> Result<u64> {
  let value = items
    .iter()
    .filter_map(|item| item.result.as_ref())
    .find_map(|result| result.aggregate_fields.get(COUNT_ALIAS))
    .ok_or_else(|| Error::Decode("aggregation response without count".to_string()))?;

  match decode_value(value)? {
    Value::Number(n) => n
      .as_u64()
      .ok_or_else(|| Error::Decode(format!("count is not a non-negative integer: {}", n))),
    other => Err(Error::Decode(format!("count has unexpected type: {}", other))),
  }
}

// ============================================================================
// Value conversion
// ============================================================================

/// Encode a plain JSON value as a Firestore typed value.
///
/// Strings in RFC 3339 form are written as `timestampValue` so they order and
/// compare as timestamps server-side.
pub fn encode_value(value: &Value) -> Value {
  match value {
    Value::Null => json!({ "nullValue": null }),
    Value::Bool(b) => json!({ "booleanValue": b }),
    Value::Number(n) => {
      if let Some(i) = n.as_i64() {
        json!({ "integerValue": i.to_string() })
      } else if let Some(u) = n.as_u64() {
        json!({ "integerValue": u.to_string() })
      } else {
        json!({ "doubleValue": n.as_f64() })
      }
    }
    Value::String(s) => {
      if DateTime::parse_from_rfc3339(s).is_ok() {
        json!({ "timestampValue": s })
      } else {
        json!({ "stringValue": s })
      }
    }
    Value::Array(values) => {
      let values: Vec<Value> = values.iter().map(encode_value).collect();
      json!({ "arrayValue": { "values": values } })
    }
    Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
  }
}

pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
  fields
    .iter()
    .map(|(k, v)| (k.clone(), encode_value(v)))
    .collect()
}

/// Decode a Firestore typed value back into plain JSON.
pub fn decode_value(value: &Value) -> Result<Value> {
  let obj = value
    .as_object()
    .ok_or_else(|| Error::Decode(format!("typed value is not an object: {}", value)))?;
  let (kind, inner) = obj
    .iter()
    .next()
    .ok_or_else(|| Error::Decode("empty typed value".to_string()))?;

  let decoded = match kind.as_str() {
    "nullValue" => Value::Null,
    "booleanValue" => Value::Bool(inner.as_bool().unwrap_or(false)),
    "integerValue" => {
      // Sent as a decimal string, occasionally as a number
      let parsed = match inner {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
      };
      let i = parsed.ok_or_else(|| Error::Decode(format!("bad integerValue: {}", inner)))?;
      Value::Number(Number::from(i))
    }
    "doubleValue" => inner
      .as_f64()
      .and_then(Number::from_f64)
      .map(Value::Number)
      .unwrap_or(Value::Null),
    "timestampValue" | "stringValue" | "referenceValue" | "bytesValue" => inner.clone(),
    "geoPointValue" => inner.clone(),
    "arrayValue" => {
      let values = inner
        .get("values")
        .and_then(Value::as_array)
        .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
      Value::Array(values)
    }
    "mapValue" => {
      let fields = inner
        .get("fields")
        .and_then(Value::as_object)
        .map(decode_fields)
        .transpose()?
        .unwrap_or_default();
      Value::Object(fields)
    }
    other => return Err(Error::Decode(format!("unknown value type {}", other))),
  };
  Ok(decoded)
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>> {
  fields
    .iter()
    .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
    .collect()
}

// ============================================================================
// Query bodies
// ============================================================================

fn op_name(op: FilterOp) -> &'static str {
  match op {
    FilterOp::Equal => "EQUAL",
    FilterOp::LessThan => "LESS_THAN",
    FilterOp::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
    FilterOp::GreaterThan => "GREATER_THAN",
    FilterOp::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
  }
}

fn direction_name(direction: Direction) -> &'static str {
  match direction {
    Direction::Ascending => "ASCENDING",
    Direction::Descending => "DESCENDING",
  }
}

fn where_clause(query: &CollectionQuery) -> Option<Value> {
  let mut filters: Vec<Value> = query
    .filters
    .iter()
    .map(|f| {
      json!({
        "fieldFilter": {
          "field": { "fieldPath": f.field },
          "op": op_name(f.op),
          "value": encode_value(&f.value),
        }
      })
    })
    .collect();

  match filters.len() {
    0 => None,
    1 => filters.pop(),
    _ => Some(json!({
      "compositeFilter": { "op": "AND", "filters": filters }
    })),
  }
}

/// Build a `structuredQuery`. `document_name` maps a document id to its full
/// resource name, needed for the cursor's `__name__` component.
pub fn structured_query(
  query: &CollectionQuery,
  document_name: impl Fn(&str) -> String,
) -> Value {
  let mut body = Map::new();
  body.insert(
    "from".to_string(),
    json!([{ "collectionId": query.collection }]),
  );
  if let Some(filter) = where_clause(query) {
    body.insert("where".to_string(), filter);
  }

  let direction = query
    .order_by
    .as_ref()
    .map(|o| o.direction)
    .unwrap_or(Direction::Ascending);

  let mut order = Vec::new();
  if let Some(order_by) = &query.order_by {
    order.push(json!({
      "field": { "fieldPath": order_by.field },
      "direction": direction_name(direction),
    }));
  }
  order.push(json!({
    "field": { "fieldPath": "__name__" },
    "direction": direction_name(direction),
  }));
  body.insert("orderBy".to_string(), Value::Array(order));

  if let Some(cursor) = &query.start_after {
    let mut values = Vec::new();
    if query.order_by.is_some() {
      values.push(encode_value(&cursor.value));
    }
    values.push(json!({ "referenceValue": document_name(&cursor.id) }));
    // before = false positions the cursor just after the given values
    body.insert(
      "startAt".to_string(),
      json!({ "values": values, "before": false }),
    );
  }

  if let Some(limit) = query.limit {
    body.insert("limit".to_string(), json!(limit));
  }

  Value::Object(body)
}

/// Build a `structuredAggregationQuery` counting the query's matches.
pub fn count_query(query: &CollectionQuery) -> Value {
  let mut structured = Map::new();
  structured.insert(
    "from".to_string(),
    json!([{ "collectionId": query.collection }]),
  );
  if let Some(filter) = where_clause(query) {
    structured.insert("where".to_string(), filter);
  }

  json!({
    "structuredAggregationQuery": {
      "structuredQuery": structured,
      "aggregations": [{ "alias": COUNT_ALIAS, "count": {} }],
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::query::{Cursor, FieldFilter, OrderBy};

  #[test]
  fn test_encode_scalars() {
    assert_eq!(encode_value(&json!(5)), json!({"integerValue": "5"}));
    assert_eq!(encode_value(&json!(2.5)), json!({"doubleValue": 2.5}));
    assert_eq!(encode_value(&json!("spa")), json!({"stringValue": "spa"}));
    assert_eq!(
      encode_value(&json!("2026-10-16T09:00:00Z")),
      json!({"timestampValue": "2026-10-16T09:00:00Z"})
    );
    // Plain dates stay strings so they keep ordering lexicographically
    assert_eq!(
      encode_value(&json!("2026-10-16")),
      json!({"stringValue": "2026-10-16"})
    );
  }

  #[test]
  fn test_decode_nested() {
    let typed = json!({
      "mapValue": { "fields": {
        "count": { "integerValue": "12" },
        "tags": { "arrayValue": { "values": [ { "stringValue": "a" } ] } },
        "empty": { "arrayValue": {} },
        "gone": { "nullValue": null },
      }}
    });
    assert_eq!(
      decode_value(&typed).unwrap(),
      json!({"count": 12, "tags": ["a"], "empty": [], "gone": null})
    );
  }

  #[test]
  fn test_decode_rejects_unknown_kind() {
    assert!(decode_value(&json!({"weirdValue": 1})).is_err());
  }

  #[test]
  fn test_document_id_from_name() {
    let doc = ApiDocument {
      name: "projects/p/databases/(default)/documents/bookings/abc123".to_string(),
      fields: encode_fields(json!({"status": "pending"}).as_object().unwrap()),
    };
    let doc = doc.into_document().unwrap();
    assert_eq!(doc.id, "abc123");
    assert_eq!(doc.fields.get("status"), Some(&json!("pending")));
  }

  #[test]
  fn test_structured_query_with_cursor() {
    let query = CollectionQuery::new("bookings")
      .filter(FieldFilter::ge("date", "2026-10-16"))
      .order_by(OrderBy::asc("date"))
      .limit(10)
      .start_after(Some(Cursor {
        value: json!("2026-10-20"),
        id: "b9".to_string(),
      }));

    let body = structured_query(&query, |id| format!("docs/bookings/{}", id));
    assert_eq!(body["limit"], json!(10));
    assert_eq!(body["where"]["fieldFilter"]["op"], json!("GREATER_THAN_OR_EQUAL"));
    assert_eq!(body["orderBy"][1]["field"]["fieldPath"], json!("__name__"));
    assert_eq!(
      body["startAt"]["values"][1],
      json!({"referenceValue": "docs/bookings/b9"})
    );
    assert_eq!(body["startAt"]["before"], json!(false));
  }

  #[test]
  fn test_count_query_uses_composite_filter() {
    let query = CollectionQuery::new("transactions")
      .filter(FieldFilter::eq("status", "failed"))
      .filter(FieldFilter::lt("amount", 100));
    let body = count_query(&query);
    let structured = &body["structuredAggregationQuery"]["structuredQuery"];
    assert_eq!(structured["where"]["compositeFilter"]["op"], json!("AND"));
    assert!(structured.get("orderBy").is_none());
  }

  #[test]
  fn test_aggregation_count() {
    let items: Vec<ApiAggregationItem> = serde_json::from_value(json!([
      { "result": { "aggregateFields": { "total": { "integerValue": "42" } } } }
    ]))
    .unwrap();
    assert_eq!(aggregation_count(&items).unwrap(), 42);
  }
}
