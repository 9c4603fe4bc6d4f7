//! Error type shared by the store, mirror and fetch layers.

use thiserror::Error;

/// Errors surfaced by data access.
///
/// Payloads are plain strings so the error stays `Clone`; coalesced fetches
/// hand the same failure to every waiting caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("Remote store request failed: {0}")]
  Remote(String),

  #[error("{collection}/{id} not found")]
  NotFound { collection: String, id: String },

  #[error("Failed to decode document: {0}")]
  Decode(String),

  #[error("Local mirror error: {0}")]
  Mirror(String),

  #[error("Invalid cursor token")]
  InvalidCursor,

  #[error("Invalid request: {0}")]
  Invalid(String),

  #[error("Request was cancelled")]
  Cancelled,
}

impl Error {
  pub fn not_found(collection: &str, id: &str) -> Self {
    Self::NotFound {
      collection: collection.to_string(),
      id: id.to_string(),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}

impl From<serde_json::Error> for Error {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    Self::Mirror(err.to_string())
  }
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    Self::Remote(err.to_string())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
