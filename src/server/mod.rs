//! HTTP surface: JSON admin API, booking status page, static client.

mod api;
mod status;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tower_http::{
  services::{ServeDir, ServeFile},
  trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::fetch::SpaClient;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
  pub client: SpaClient,
  /// Base URL used for status page deep links, without trailing slash
  pub public_url: String,
}

impl AppState {
  pub fn new(client: SpaClient, config: &ServerConfig) -> Self {
    let public_url = config
      .public_url
      .clone()
      .unwrap_or_else(|| format!("http://{}", config.addr));
    Self {
      client,
      public_url: public_url.trim_end_matches('/').to_string(),
    }
  }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
  code: &'static str,
  message: String,
}

/// Error rendered as JSON `{code, message}`.
#[derive(Debug)]
pub struct ApiError {
  status: StatusCode,
  code: &'static str,
  message: String,
}

impl ApiError {
  pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
    Self {
      status,
      code,
      message: message.into(),
    }
  }
}

impl From<Error> for ApiError {
  fn from(err: Error) -> Self {
    let (status, code) = match &err {
      Error::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
      Error::Invalid(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
      Error::InvalidCursor => (StatusCode::BAD_REQUEST, "invalid_cursor"),
      Error::Remote(_) => (StatusCode::BAD_GATEWAY, "remote_error"),
      Error::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
      Error::Mirror(_) => (StatusCode::INTERNAL_SERVER_ERROR, "mirror_error"),
      Error::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, "cancelled"),
    };
    if status.is_server_error() {
      tracing::error!(error = %err, "Request failed");
    }
    Self::new(status, code, err.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let payload = ErrorResponse {
      code: self.code,
      message: self.message,
    };
    (self.status, Json(payload)).into_response()
  }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
  status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
  Json(HealthResponse { status: "ok" })
}

async fn not_found_handler() -> ApiError {
  ApiError::new(StatusCode::NOT_FOUND, "not_found", "No such route")
}

/// Build the application router.
///
/// Unmatched paths fall through to `static_dir`, then its `index.html`.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
  let app = Router::new()
    .route("/api/health", get(health_handler))
    .merge(api::routes())
    .merge(status::routes())
    .with_state(state);

  let app = match static_dir {
    Some(dir) => {
      let index = ServeFile::new(dir.join("index.html"));
      app.fallback_service(ServeDir::new(dir).fallback(index))
    }
    None => app.fallback(not_found_handler),
  };

  app.layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, client: SpaClient) -> color_eyre::Result<()> {
  let state = AppState::new(client, config);
  let app = router(state, config.static_dir.as_deref());

  let listener = tokio::net::TcpListener::bind(config.addr).await?;
  tracing::info!(addr = %config.addr, "Listening");
  axum::serve(listener, app).await?;
  Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
  use axum::body::{to_bytes, Body};
  use axum::http::{Request, StatusCode};
  use axum::Router;
  use serde_json::Value;
  use std::sync::Arc;
  use tower::ServiceExt;

  use super::AppState;
  use crate::fetch::SpaClient;
  use crate::mirror::SqliteMirror;
  use crate::store::MemoryStore;

  pub fn state() -> (Arc<MemoryStore>, AppState) {
    let store = Arc::new(MemoryStore::new());
    let mirror = Arc::new(SqliteMirror::open_in_memory().unwrap());
    let client = SpaClient::with_parts(store.clone(), mirror, 10);
    (
      store,
      AppState {
        client,
        public_url: "https://spa.example.com".to_string(),
      },
    )
  }

  pub async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
      Some(json) => builder
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
  }

  pub async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }
}

#[cfg(test)]
mod tests {
  use super::test_support::{send, send_json, state};
  use super::*;

  #[tokio::test]
  async fn test_health() {
    let (_, state) = state();
    let (status, body) = send_json(router(state, None), "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
  }

  #[tokio::test]
  async fn test_unknown_route_without_static_dir() {
    let (_, state) = state();
    let (status, body) = send_json(router(state, None), "GET", "/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
  }

  #[tokio::test]
  async fn test_static_fallback_serves_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>spa</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
    let (_, state) = state();
    let app = router(state, Some(dir.path()));

    let (status, body) = send(app.clone(), "GET", "/app.js", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"console.log(1)");

    let (status, body) = send(app, "GET", "/admin/bookings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<html>spa</html>");
  }

  #[test]
  fn test_error_mapping() {
    let cases = [
      (Error::not_found("bookings", "x"), StatusCode::NOT_FOUND),
      (Error::Invalid("bad".to_string()), StatusCode::BAD_REQUEST),
      (Error::InvalidCursor, StatusCode::BAD_REQUEST),
      (Error::Remote("down".to_string()), StatusCode::BAD_GATEWAY),
      (Error::Mirror("locked".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
      assert_eq!(ApiError::from(err).status, expected);
    }
  }

  #[test]
  fn test_public_url_defaults_to_addr() {
    let (_, base) = state();
    let config = ServerConfig {
      public_url: Some("https://spa.example.com/".to_string()),
      ..ServerConfig::default()
    };
    assert_eq!(
      AppState::new(base.client.clone(), &config).public_url,
      "https://spa.example.com"
    );
    let state = AppState::new(base.client, &ServerConfig::default());
    assert_eq!(state.public_url, "http://127.0.0.1:8080");
  }
}
