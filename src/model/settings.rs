use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business-wide settings kept in a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
  pub business_name: String,
  /// `HH:MM`
  pub opening_time: String,
  /// `HH:MM`
  pub closing_time: String,
  pub slot_minutes: u32,
  pub currency: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Settings {
  pub const COLLECTION: &'static str = "settings";
  pub const DOCUMENT_ID: &'static str = "business";
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      business_name: "Spa".to_string(),
      opening_time: "09:00".to_string(),
      closing_time: "18:00".to_string(),
      slot_minutes: 30,
      currency: "USD".to_string(),
      updated_at: None,
    }
  }
}
