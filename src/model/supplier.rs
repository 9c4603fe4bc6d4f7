use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FieldFilter, OrderBy};

use super::{ActiveStatus, ListFilter, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub contact_person: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(default)]
  pub status: ActiveStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Supplier {
  const COLLECTION: &'static str = "suppliers";
  type Filter = SupplierFilter;

  fn id(&self) -> &str {
    &self.id
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierFilter {
  pub status: Option<ActiveStatus>,
}

impl ListFilter for SupplierFilter {
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
      "suppliers:{}",
      self.status.map(|s| s.as_str()).unwrap_or("")
    )
  }

  fn tabs() -> Vec<Self> {
    vec![
      Self::default(),
      Self {
        status: Some(ActiveStatus::Active),
      },
      Self {
        status: Some(ActiveStatus::Inactive),
      },
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
