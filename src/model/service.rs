use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FieldFilter, OrderBy};

use super::{IdStrategy, ListFilter, Record};

/// A treatment offered on the booking form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: String,
  pub duration_minutes: u32,
  pub price: f64,
  #[serde(default = "default_active")]
  pub active: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
  true
}

impl Record for Service {
  const COLLECTION: &'static str = "services";
  const ID_STRATEGY: IdStrategy = IdStrategy::WallClock;
  type Filter = ServiceFilter;

  fn id(&self) -> &str {
    &self.id
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceFilter {
  pub category: Option<String>,
}

impl ListFilter for ServiceFilter {
  fn filters(&self) -> Vec<FieldFilter> {
    self
      .category
      .iter()
      .map(|c| FieldFilter::eq("category", c.as_str()))
      .collect()
  }

  fn order_by(&self) -> OrderBy {
    OrderBy::asc("name")
  }

  fn describe(&self) -> String {
    format!("services:{}", self.category.as_deref().unwrap_or(""))
  }
}
