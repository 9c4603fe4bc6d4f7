use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FieldFilter, OrderBy};

use super::{ActiveStatus, ListFilter, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub role: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub status: ActiveStatus,
  #[serde(default)]
  pub specialties: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Staff {
  const COLLECTION: &'static str = "staffs";
  type Filter = StaffFilter;

  fn id(&self) -> &str {
    &self.id
  }
}

/// Aggregate headcount by status, from server-side counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffCounts {
  pub total: u64,
  pub active: u64,
  pub inactive: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaffFilter {
  pub status: Option<ActiveStatus>,
}

impl StaffFilter {
  pub fn with_status(status: ActiveStatus) -> Self {
    Self {
      status: Some(status),
    }
  }
}

impl ListFilter for StaffFilter {
  fn filters(&self) -> Vec<FieldFilter> {
    self
      .status
      .iter()
      .map(|s| FieldFilter::eq("status", s.as_str()))
      .collect()
  }

  fn order_by(&self) -> OrderBy {
    OrderBy::asc("name")
  }

  fn describe(&self) -> String {
    format!(
      "staffs:{}",
      self.status.map(|s| s.as_str()).unwrap_or("")
    )
  }

  fn tabs() -> Vec<Self> {
    vec![
      Self::default(),
      Self::with_status(ActiveStatus::Active),
      Self::with_status(ActiveStatus::Inactive),
    ]
  }

  fn tab_label(&self) -> String {
    match self.status {
      None => "All",
      Some(ActiveStatus::Active) => "Active",
      Some(ActiveStatus::Inactive) => "Inactive",
    }
    .to_string()
  }
}
