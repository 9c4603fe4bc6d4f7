//! JSON admin API over every entity.

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  routing::{get, post},
  Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::Error;
use crate::fetch::{Entity, Page, PageRequest, PageSource};
use crate::model::{
  Booking, BookingStatus, InventoryItem, Record, Service, Settings, Staff, StaffCounts, Supplier,
  Transaction,
};
use crate::store::Cursor;

use super::{ApiError, ApiResult, AppState};

/// How an entity is rendered in API responses.
pub trait ApiEntity: Entity {
  fn present(&self) -> Result<Value, Error> {
    Ok(serde_json::to_value(self)?)
  }

  /// Adjust a record posted to the public create route.
  fn accept_new(self) -> Self {
    self
  }
}

impl ApiEntity for Booking {
  /// New bookings always wait for staff confirmation.
  fn accept_new(mut self) -> Self {
    self.status = BookingStatus::Pending;
    self
  }
}
impl ApiEntity for Staff {}
impl ApiEntity for Supplier {}
impl ApiEntity for Service {}
impl ApiEntity for Transaction {}

impl ApiEntity for InventoryItem {
  fn present(&self) -> Result<Value, Error> {
    let mut value = serde_json::to_value(self)?;
    if let Value::Object(fields) = &mut value {
      fields.insert(
        "stockStatus".to_string(),
        Value::String(self.stock_status().label().to_string()),
      );
    }
    Ok(value)
  }
}

pub fn routes() -> Router<AppState> {
  Router::new()
    .route("/api/staffs/counts", get(staff_counts))
    .route("/api/transactions/{id}/booking", get(transaction_booking))
    .route("/api/settings", get(get_settings).put(put_settings))
    .route("/api/mirror/reset", post(reset_mirror))
    .merge(entity_routes::<Booking>())
    .merge(entity_routes::<InventoryItem>())
    .merge(entity_routes::<Staff>())
    .merge(entity_routes::<Supplier>())
    .merge(entity_routes::<Service>())
    .merge(entity_routes::<Transaction>())
}

fn entity_routes<T: ApiEntity>() -> Router<AppState> {
  let collection = format!("/api/{}", T::COLLECTION);
  let item = format!("/api/{}/{{id}}", T::COLLECTION);
  Router::new()
    .route(&collection, get(list::<T>).post(create::<T>))
    .route(&item, get(fetch_one::<T>).patch(update::<T>).delete(remove::<T>))
}

/// Paging parameters; every other query parameter is a filter field.
#[derive(Debug, Clone, PartialEq)]
struct PageParams {
  page: u32,
  page_size: Option<u32>,
  cursor: Option<Cursor>,
  refresh: bool,
  filter: Map<String, Value>,
}

fn parse_number(name: &str, value: &str) -> Result<u32, Error> {
  value
    .parse()
    .map_err(|_| Error::Invalid(format!("{} must be a positive integer", name)))
}

impl PageParams {
  fn parse(mut params: HashMap<String, String>) -> Result<Self, Error> {
    let page = match params.remove("page") {
      Some(v) => parse_number("page", &v)?,
      None => 1,
    };
    let page_size = params
      .remove("pageSize")
      .map(|v| parse_number("pageSize", &v))
      .transpose()?;
    let cursor = params
      .remove("cursor")
      .filter(|c| !c.is_empty())
      .map(|c| Cursor::from_token(&c))
      .transpose()?;
    let refresh = params
      .remove("refresh")
      .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"));

    if page > 1 && cursor.is_none() {
      return Err(Error::Invalid("cursor is required past page 1".to_string()));
    }

    let filter = params
      .into_iter()
      .map(|(k, v)| (k, Value::String(v)))
      .collect();

    Ok(Self {
      page,
      page_size,
      cursor,
      refresh,
      filter,
    })
  }

  fn into_request<T: Entity>(self, default_size: u32) -> Result<PageRequest<T::Filter>, Error> {
    let filter: T::Filter = serde_json::from_value(Value::Object(self.filter))
      .map_err(|e| Error::Invalid(format!("bad filter: {}", e)))?;
    Ok(PageRequest {
      filter,
      page: self.page,
      page_size: self.page_size.unwrap_or(default_size),
      cursor: self.cursor,
      refresh: self.refresh,
    })
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageResponse {
  items: Vec<Value>,
  /// Cursor as reported by the fetch, null on a mirror hit
  last_cursor: Option<String>,
  /// Where to continue from, derived from the last item on a mirror hit
  next_cursor: Option<String>,
  total_count: u64,
  source: &'static str,
  page: u32,
  page_size: u32,
}

fn present_page<T: ApiEntity>(
  state: &AppState,
  filter: &T::Filter,
  page: Page<T>,
  number: u32,
  size: u32,
) -> Result<PageResponse, Error> {
  let next_cursor = match (&page.last_cursor, page.items.last()) {
    (Some(cursor), _) => Some(cursor.to_token()),
    (None, Some(last)) => Some(
      state
        .client
        .accessor::<T>()
        .cursor_after(filter, last)?
        .to_token(),
    ),
    (None, None) => None,
  };

  Ok(PageResponse {
    items: page
      .items
      .iter()
      .map(|item| item.present())
      .collect::<Result<_, _>>()?,
    last_cursor: page.last_cursor.as_ref().map(Cursor::to_token),
    next_cursor,
    total_count: page.total_count,
    source: match page.source {
      PageSource::Remote => "remote",
      PageSource::Mirror => "mirror",
    },
    page: number,
    page_size: size,
  })
}

async fn list<T: ApiEntity>(
  State(state): State<AppState>,
  Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<PageResponse>> {
  let request = PageParams::parse(params)?.into_request::<T>(state.client.page_size())?;
  let filter = request.filter.clone();
  let (number, size) = (request.page, request.page_size);

  let page = state.client.list::<T>(request).await?;
  Ok(Json(present_page(&state, &filter, page, number, size)?))
}

async fn create<T: ApiEntity>(
  State(state): State<AppState>,
  Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
  let record: T = serde_json::from_value(body)
    .map_err(|e| Error::Invalid(format!("bad {} record: {}", T::COLLECTION, e)))?;
  let record = record.accept_new();
  let created = state.client.create(&record).await?;
  Ok((StatusCode::CREATED, Json(created.present()?)))
}

async fn fetch_one<T: ApiEntity>(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
  let record: T = state.client.get(&id).await?;
  Ok(Json(record.present()?))
}

async fn update<T: ApiEntity>(
  State(state): State<AppState>,
  Path(id): Path<String>,
  Json(patch): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
  let record: T = state.client.update(&id, &patch).await?;
  Ok(Json(record.present()?))
}

async fn remove<T: ApiEntity>(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> ApiResult<StatusCode> {
  state.client.delete::<T>(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

async fn staff_counts(State(state): State<AppState>) -> ApiResult<Json<StaffCounts>> {
  Ok(Json(state.client.staff_status_counts().await?))
}

async fn transaction_booking(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
  let transaction: Transaction = state.client.get(&id).await?;
  match state.client.transaction_booking(&transaction).await? {
    Some(booking) => Ok(Json(booking.present()?)),
    None => Err(ApiError::from(Error::not_found(
      Booking::COLLECTION,
      &transaction.booking_id,
    ))),
  }
}

async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Settings>> {
  Ok(Json(state.client.settings().await?))
}

async fn put_settings(
  State(state): State<AppState>,
  Json(settings): Json<Settings>,
) -> ApiResult<Json<Settings>> {
  Ok(Json(state.client.save_settings(&settings).await?))
}

async fn reset_mirror(State(state): State<AppState>) -> ApiResult<StatusCode> {
  state.client.reset_mirror()?;
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use super::super::router;
  use super::super::test_support::{send_json, state};
  use super::*;
  use serde_json::json;

  fn booking_json(name: &str, date: &str) -> Value {
    json!({
      "customerName": name,
      "email": "guest@example.com",
      "phone": "555-0100",
      "service": "Deep tissue",
      "date": date,
      "time": "14:00"
    })
  }

  #[test]
  fn test_page_params_split_filter_fields() {
    let params = HashMap::from([
      ("page".to_string(), "1".to_string()),
      ("pageSize".to_string(), "5".to_string()),
      ("refresh".to_string(), "true".to_string()),
      ("tab".to_string(), "history".to_string()),
    ]);
    let parsed = PageParams::parse(params).unwrap();
    assert_eq!(parsed.page_size, Some(5));
    assert!(parsed.refresh);
    assert_eq!(parsed.filter.get("tab"), Some(&json!("history")));
  }

  #[test]
  fn test_page_params_require_cursor_past_first_page() {
    let params = HashMap::from([("page".to_string(), "2".to_string())]);
    assert!(matches!(PageParams::parse(params), Err(Error::Invalid(_))));

    let params = HashMap::from([("cursor".to_string(), "zz".to_string())]);
    assert_eq!(PageParams::parse(params), Err(Error::InvalidCursor));
  }

  #[tokio::test]
  async fn test_booking_crud_round() {
    let (_, state) = state();
    let app = router(state, None);

    let (status, created) = send_json(
      app.clone(),
      "POST",
      "/api/bookings",
      Some(booking_json("Ana", "2099-01-01")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send_json(
      app.clone(),
      "PATCH",
      &format!("/api/bookings/{}", id),
      Some(json!({"status": "confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "confirmed");
    assert_eq!(updated["customerName"], "Ana");

    let (status, _) = send_json(app.clone(), "DELETE", &format!("/api/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(app, "GET", &format!("/api/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
  }

  #[tokio::test]
  async fn test_posted_booking_starts_pending() {
    let (_, state) = state();
    let app = router(state, None);

    let mut body = booking_json("Ana", "2099-01-01");
    body["status"] = json!("confirmed");
    let (status, created) = send_json(app, "POST", "/api/bookings", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
  }

  #[tokio::test]
  async fn test_list_pages_and_mirror_source() {
    let (store, state) = state();
    let app = router(state, None);
    for (name, date) in [("Ana", "2099-01-01"), ("Ben", "2099-01-02"), ("Cy", "2099-01-03")] {
      send_json(app.clone(), "POST", "/api/bookings", Some(booking_json(name, date))).await;
    }

    let (status, first) = send_json(app.clone(), "GET", "/api/bookings?pageSize=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["source"], "remote");
    assert_eq!(first["totalCount"], 3);
    assert_eq!(first["items"].as_array().unwrap().len(), 2);

    let calls = store.query_calls();
    let (_, again) = send_json(app.clone(), "GET", "/api/bookings?pageSize=2", None).await;
    assert_eq!(again["source"], "mirror");
    assert_eq!(again["lastCursor"], Value::Null);
    assert_eq!(again["items"], first["items"]);
    assert_eq!(store.query_calls(), calls);

    // A mirror hit still tells the client where page 2 starts
    let next = again["nextCursor"].as_str().unwrap();
    let (_, second) = send_json(
      app,
      "GET",
      &format!("/api/bookings?pageSize=2&page=2&cursor={}", next),
      None,
    )
    .await;
    let names: Vec<&str> = second["items"]
      .as_array()
      .unwrap()
      .iter()
      .map(|b| b["customerName"].as_str().unwrap())
      .collect();
    assert_eq!(names, vec!["Cy"]);
  }

  #[tokio::test]
  async fn test_bad_filter_is_rejected() {
    let (_, state) = state();
    let (status, body) =
      send_json(router(state, None), "GET", "/api/bookings?tab=someday", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
  }

  #[tokio::test]
  async fn test_inventory_reports_stock_status() {
    let (_, state) = state();
    let app = router(state, None);
    let (status, item) = send_json(
      app,
      "POST",
      "/api/inventory",
      Some(json!({
        "name": "Eucalyptus oil",
        "category": "oils",
        "current": 5,
        "minimum": 10,
        "unit": "bottle"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["stockStatus"], "Low Stock");
  }

  #[tokio::test]
  async fn test_remote_failure_is_bad_gateway() {
    let (store, state) = state();
    store.fail_next("unavailable");
    let (status, body) = send_json(router(state, None), "GET", "/api/staffs", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "remote_error");
  }

  #[tokio::test]
  async fn test_staff_counts_route() {
    let (_, state) = state();
    let app = router(state, None);
    for (name, status) in [("Ana", "active"), ("Ben", "inactive"), ("Cy", "active")] {
      send_json(
        app.clone(),
        "POST",
        "/api/staffs",
        Some(json!({"name": name, "role": "therapist", "status": status})),
      )
      .await;
    }

    let (status, counts) = send_json(app, "GET", "/api/staffs/counts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts, json!({"total": 3, "active": 2, "inactive": 1}));
  }

  #[tokio::test]
  async fn test_transaction_booking_route() {
    let (store, state) = state();
    let app = router(state, None);
    let (_, booking) = send_json(
      app.clone(),
      "POST",
      "/api/bookings",
      Some(booking_json("Ana", "2099-01-01")),
    )
    .await;
    store
      .insert(
        "transactions",
        "t1",
        json!({
          "bookingId": booking["id"],
          "customerName": "Ana",
          "amount": 120.0,
          "method": "card",
          "status": "completed",
          "date": "2026-10-16T10:00:00Z"
        })
        .as_object()
        .cloned()
        .unwrap(),
      )
      .unwrap();

    let (status, linked) =
      send_json(app.clone(), "GET", "/api/transactions/t1/booking", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["id"], booking["id"]);

    let (status, _) = send_json(app, "GET", "/api/transactions/nope/booking", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn test_settings_and_mirror_reset() {
    let (_, state) = state();
    let app = router(state, None);

    let (status, settings) = send_json(app.clone(), "GET", "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["slotMinutes"], 30);

    let mut changed = settings.clone();
    changed["businessName"] = json!("Lotus Spa");
    let (status, saved) = send_json(app.clone(), "PUT", "/api/settings", Some(changed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["businessName"], "Lotus Spa");

    let (status, _) = send_json(app, "POST", "/api/mirror/reset", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }
}
