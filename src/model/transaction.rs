use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FieldFilter, OrderBy};

use super::{open_enum, ListFilter, Record};

open_enum! {
  TransactionStatus {
    Completed => "completed",
    Pending => "pending",
    Failed => "failed",
  }
}

impl Default for TransactionStatus {
  fn default() -> Self {
    Self::Pending
  }
}

/// A payment, loosely linked to a booking by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub booking_id: String,
  #[serde(default)]
  pub customer_name: String,
  pub amount: f64,
  #[serde(default)]
  pub method: String,
  #[serde(default)]
  pub status: TransactionStatus,
  pub date: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Transaction {
  const COLLECTION: &'static str = "transactions";
  type Filter = TransactionFilter;

  fn id(&self) -> &str {
    &self.id
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionFilter {
  pub status: Option<TransactionStatus>,
  /// Inclusive lower bound on `date`
  pub from: Option<DateTime<Utc>>,
  /// Exclusive upper bound on `date`
  pub to: Option<DateTime<Utc>>,
}

/// Same text form serde gives a `DateTime<Utc>`, so stored dates compare.
fn timestamp(value: &DateTime<Utc>) -> String {
  value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl ListFilter for TransactionFilter {
  fn filters(&self) -> Vec<FieldFilter> {
    let mut filters = Vec::new();
    if let Some(status) = &self.status {
      filters.push(FieldFilter::eq("status", status.as_str()));
    }
    if let Some(from) = &self.from {
      filters.push(FieldFilter::ge("date", timestamp(from)));
    }
    if let Some(to) = &self.to {
      filters.push(FieldFilter::lt("date", timestamp(to)));
    }
    filters
  }

  fn order_by(&self) -> OrderBy {
    OrderBy::desc("date")
  }

  fn describe(&self) -> String {
    format!(
      "transactions:{}:{}:{}",
      self.status.as_ref().map(|s| s.as_str()).unwrap_or(""),
      self.from.as_ref().map(timestamp).unwrap_or_default(),
      self.to.as_ref().map(timestamp).unwrap_or_default()
    )
  }

  fn tabs() -> Vec<Self> {
    let mut tabs = vec![Self::default()];
    for status in [
      TransactionStatus::Completed,
      TransactionStatus::Pending,
      TransactionStatus::Failed,
    ] {
      tabs.push(Self {
        status: Some(status),
        ..Self::default()
      });
    }
    tabs
  }

  fn tab_label(&self) -> String {
    match &self.status {
      None => "All".to_string(),
      Some(status) => {
        let s = status.as_str();
        let mut chars = s.chars();
        match chars.next() {
          Some(first) => first.to_uppercase().chain(chars).collect(),
          None => String::new(),
        }
      }
    }
  }
}
