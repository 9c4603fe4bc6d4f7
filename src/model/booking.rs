use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FieldFilter, OrderBy};

use super::{open_enum, ListFilter, Record};

open_enum! {
  /// Booking state. Any status may be set to any other.
  BookingStatus {
    Confirmed => "confirmed",
    Pending => "pending",
    Canceled => "canceled",
  }
}

impl Default for BookingStatus {
  fn default() -> Self {
    Self::Pending
  }
}

/// An appointment made through the booking form or by staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
  #[serde(default)]
  pub id: String,
  pub customer_name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  pub service: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub staff: Option<String>,
  /// `YYYY-MM-DD`
  pub date: String,
  /// `HH:MM`
  #[serde(default)]
  pub time: String,
  #[serde(default)]
  pub status: BookingStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Booking {
  const COLLECTION: &'static str = "bookings";
  type Filter = BookingFilter;

  fn id(&self) -> &str {
    &self.id
  }
}

/// Partial update for a booking; unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<BookingStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub time: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub staff: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl BookingPatch {
  pub fn status(status: BookingStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingTab {
  /// Today and later, soonest first
  #[default]
  Upcoming,
  /// Before today, most recent first
  History,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingFilter {
  pub tab: BookingTab,
  pub status: Option<BookingStatus>,
  /// Reference day splitting upcoming from history; local today when unset.
  pub today: Option<NaiveDate>,
}

impl BookingFilter {
  pub fn upcoming() -> Self {
    Self::default()
  }

  pub fn history() -> Self {
    Self {
      tab: BookingTab::History,
      ..Self::default()
    }
  }

  pub fn on(mut self, today: NaiveDate) -> Self {
    self.today = Some(today);
    self
  }

  fn today_string(&self) -> String {
    self
      .today
      .unwrap_or_else(|| Local::now().date_naive())
      .format("%Y-%m-%d")
      .to_string()
  }
}

impl ListFilter for BookingFilter {
  fn filters(&self) -> Vec<FieldFilter> {
    let today = self.today_string();
    let mut filters = vec![match self.tab {
      BookingTab::Upcoming => FieldFilter::ge("date", today),
      BookingTab::History => FieldFilter::lt("date", today),
    }];
    if let Some(status) = &self.status {
      filters.push(FieldFilter::eq("status", status.as_str()));
    }
    filters
  }

  fn order_by(&self) -> OrderBy {
    match self.tab {
      BookingTab::Upcoming => OrderBy::asc("date"),
      BookingTab::History => OrderBy::desc("date"),
    }
  }

  fn describe(&self) -> String {
    let tab = match self.tab {
      BookingTab::Upcoming => "upcoming",
      BookingTab::History => "history",
    };
    format!(
      "bookings:{}:{}:{}",
      tab,
      self.today_string(),
      self.status.as_ref().map(|s| s.as_str()).unwrap_or("")
    )
  }

  fn tabs() -> Vec<Self> {
    vec![Self::upcoming(), Self::history()]
  }

  fn tab_label(&self) -> String {
    match self.tab {
      BookingTab::Upcoming => "Upcoming".to_string(),
      BookingTab::History => "History".to_string(),
    }
  }
}
