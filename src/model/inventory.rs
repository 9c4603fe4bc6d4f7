use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FieldFilter, OrderBy};

use super::{IdStrategy, ListFilter, Record};

/// Stock level classification, derived when read and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
  #[serde(rename = "Low Stock")]
  LowStock,
  #[serde(rename = "In Stock")]
  InStock,
}

impl StockStatus {
  pub fn label(&self) -> &'static str {
    match self {
      Self::LowStock => "Low Stock",
      Self::InStock => "In Stock",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub category: String,
  pub current: i64,
  pub minimum: i64,
  #[serde(default)]
  pub unit: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub supplier: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_restocked: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
  pub fn stock_status(&self) -> StockStatus {
    if self.current <= self.minimum {
      StockStatus::LowStock
    } else {
      StockStatus::InStock
    }
  }
}

impl Record for InventoryItem {
  const COLLECTION: &'static str = "inventory";
  const ID_STRATEGY: IdStrategy = IdStrategy::WallClock;
  type Filter = InventoryFilter;

  fn id(&self) -> &str {
    &self.id
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InventoryFilter {
  pub category: Option<String>,
}

impl ListFilter for InventoryFilter {
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
    format!("inventory:{}", self.category.as_deref().unwrap_or(""))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(current: i64, minimum: i64) -> InventoryItem {
    InventoryItem {
      id: "1".to_string(),
      name: "Massage oil".to_string(),
      category: "oils".to_string(),
      current,
      minimum,
      unit: "bottle".to_string(),
      supplier: None,
      last_restocked: None,
      created_at: None,
      updated_at: None,
    }
  }

  #[test]
  fn test_low_stock_boundary() {
    assert_eq!(item(5, 10).stock_status(), StockStatus::LowStock);
    assert_eq!(item(10, 10).stock_status(), StockStatus::LowStock);
    assert_eq!(item(11, 10).stock_status(), StockStatus::InStock);
  }

  #[test]
  fn test_stock_status_is_not_serialized() {
    let value = serde_json::to_value(item(5, 10)).unwrap();
    assert!(value.get("stockStatus").is_none());
    assert_eq!(StockStatus::LowStock.label(), "Low Stock");
  }
}
