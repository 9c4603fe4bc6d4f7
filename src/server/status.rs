//! Public booking status page and its QR code.

use axum::{
  extract::{Query, State},
  http::{header, StatusCode},
  response::{Html, IntoResponse, Response},
  routing::get,
  Router,
};
use image::{ImageFormat, Luma};
use qrcode::{render::svg, QrCode};
use serde::Deserialize;
use std::io::Cursor;
use url::Url;

use crate::error::{Error, Result};
use crate::model::Booking;

use super::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
  Router::new()
    .route("/status", get(status_page))
    .route("/status/qr.png", get(status_qr))
}

#[derive(Debug, Deserialize)]
struct StatusParams {
  #[serde(default)]
  id: String,
}

/// Link to the status page of one booking.
fn deep_link(public_url: &str, id: &str) -> Result<String> {
  let mut url = Url::parse(&format!("{}/status", public_url))
    .map_err(|e| Error::Invalid(format!("Bad public URL {}: {}", public_url, e)))?;
  url.query_pairs_mut().append_pair("id", id);
  Ok(url.to_string())
}

fn escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

fn qr_code(link: &str) -> Result<QrCode> {
  QrCode::new(link.as_bytes()).map_err(|e| Error::Invalid(format!("Cannot encode QR code: {}", e)))
}

fn qr_svg(link: &str) -> Result<String> {
  Ok(
    qr_code(link)?
      .render::<svg::Color>()
      .min_dimensions(180, 180)
      .quiet_zone(true)
      .build(),
  )
}

fn qr_png(link: &str) -> Result<Vec<u8>> {
  let image = qr_code(link)?
    .render::<Luma<u8>>()
    .min_dimensions(256, 256)
    .build();
  let mut bytes = Vec::new();
  image
    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
    .map_err(|e| Error::Invalid(format!("Cannot encode PNG: {}", e)))?;
  Ok(bytes)
}

fn layout(title: &str, body: &str) -> String {
  format!(
    "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
     <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
     <title>{}</title>\n</head>\n<body>\n<main>\n{}\n</main>\n</body>\n</html>\n",
    escape(title),
    body
  )
}

fn not_found_page(id: &str) -> String {
  let detail = if id.trim().is_empty() {
    "No booking reference was given.".to_string()
  } else {
    format!("We couldn't find a booking with reference <code>{}</code>.", escape(id))
  };
  layout(
    "Booking not found",
    &format!(
      "<h1>Booking not found</h1>\n<p>{}</p>\n<p>Check the link in your confirmation email.</p>",
      detail
    ),
  )
}

fn error_page() -> String {
  layout(
    "Something went wrong",
    "<h1>Something went wrong</h1>\n<p>We couldn't load this booking right now. Please try again later.</p>",
  )
}

fn booking_page(booking: &Booking, link: &str, qr: &str) -> String {
  let mut rows = vec![
    ("Name", booking.customer_name.clone()),
    ("Service", booking.service.clone()),
    ("Date", booking.date.clone()),
    ("Time", booking.time.clone()),
    ("Status", booking.status.to_string()),
  ];
  if let Some(staff) = &booking.staff {
    rows.push(("Therapist", staff.clone()));
  }

  let details: String = rows
    .iter()
    .map(|(label, value)| format!("<dt>{}</dt><dd>{}</dd>\n", label, escape(value)))
    .collect();
  let download = format!("/status/qr.png?id={}", escape(&urlencode(&booking.id)));

  layout(
    "Booking status",
    &format!(
      "<h1>Your booking</h1>\n<dl>\n{}</dl>\n<figure>\n{}\n<figcaption><a href=\"{}\">{}</a></figcaption>\n</figure>\n\
       <p><a href=\"{}\" download>Download QR code</a></p>",
      details,
      qr,
      escape(link),
      escape(link),
      download
    ),
  )
}

fn urlencode(value: &str) -> String {
  url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

async fn status_page(
  State(state): State<AppState>,
  Query(params): Query<StatusParams>,
) -> Response {
  let id = params.id.trim();
  match state.client.lookup_booking(id).await {
    Ok(booking) => {
      let rendered = deep_link(&state.public_url, &booking.id)
        .and_then(|link| qr_svg(&link).map(|qr| booking_page(&booking, &link, &qr)));
      match rendered {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
          tracing::error!(error = %e, "Failed to render status page");
          (StatusCode::INTERNAL_SERVER_ERROR, Html(error_page())).into_response()
        }
      }
    }
    Err(e) if e.is_not_found() => (StatusCode::NOT_FOUND, Html(not_found_page(id))).into_response(),
    Err(e) => {
      tracing::warn!(id, error = %e, "Booking lookup failed");
      (StatusCode::BAD_GATEWAY, Html(error_page())).into_response()
    }
  }
}

async fn status_qr(
  State(state): State<AppState>,
  Query(params): Query<StatusParams>,
) -> Result<Response, ApiError> {
  let booking = state.client.lookup_booking(&params.id).await?;

  let png = qr_png(&deep_link(&state.public_url, &booking.id)?)?;
  let disposition = format!(
    "attachment; filename=\"booking-{}-qr.png\"",
    sanitize(&booking.id)
  );
  Ok(
    (
      [
        (header::CONTENT_TYPE, "image/png".to_string()),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      png,
    )
      .into_response(),
  )
}

/// Keep only filename-safe characters.
fn sanitize(id: &str) -> String {
  id.chars()
    .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
    .collect()
}
