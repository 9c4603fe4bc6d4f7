use chrono::Local;
use ratatui::prelude::*;
use serde_json::{Map, Value};

use crate::fetch::SpaClient;
use crate::model::{
  Booking, BookingPatch, BookingStatus, InventoryItem, Service, Staff, Supplier, Transaction,
};
use crate::store::to_fields;
use crate::ui::renderfns::{
  active_status_color, booking_status_color, stock_status_color, transaction_status_color,
};
use crate::ui::view::ShortcutInfo;

use super::{RecordView, TableRow};

fn plain(text: impl Into<String>) -> Span<'static> {
  Span::raw(text.into())
}

fn colored(text: impl Into<String>, color: Color) -> Span<'static> {
  Span::styled(text.into(), Style::default().fg(color))
}

fn or_dash(text: Option<&str>) -> String {
  match text {
    Some(t) if !t.is_empty() => t.to_string(),
    _ => "-".to_string(),
  }
}

impl TableRow for Booking {
  const TITLE: &'static str = "Bookings";

  fn columns() -> &'static [(&'static str, usize)] {
    &[
      ("Date", 10),
      ("Time", 5),
      ("Customer", 20),
      ("Service", 20),
      ("Therapist", 14),
      ("Status", 10),
    ]
  }

  fn cells(&self) -> Vec<Span<'static>> {
    vec![
      colored(self.date.clone(), Color::Cyan),
      plain(self.time.clone()),
      plain(self.customer_name.clone()),
      plain(self.service.clone()),
      plain(or_dash(self.staff.as_deref())),
      colored(self.status.to_string(), booking_status_color(&self.status)),
    ]
  }

  fn patch_for_key(&self, key: char) -> Option<Map<String, Value>> {
    let status = match key {
      'c' => BookingStatus::Confirmed,
      'x' => BookingStatus::Canceled,
      'u' => BookingStatus::Pending,
      _ => return None,
    };
    if status == self.status {
      return None;
    }
    to_fields(&BookingPatch::status(status)).ok()
  }

  fn actions() -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("c", "confirm").with_priority(60),
      ShortcutInfo::new("x", "cancel").with_priority(61),
      ShortcutInfo::new("u", "pending").with_priority(62),
    ]
  }
}

impl TableRow for InventoryItem {
  const TITLE: &'static str = "Inventory";

  fn columns() -> &'static [(&'static str, usize)] {
    &[
      ("Item", 24),
      ("Category", 14),
      ("Stock", 16),
      ("Supplier", 18),
      ("Restocked", 10),
      ("Status", 10),
    ]
  }

  fn cells(&self) -> Vec<Span<'static>> {
    let stock = self.stock_status();
    vec![
      plain(self.name.clone()),
      plain(self.category.clone()),
      plain(format!("{}/{} {}", self.current, self.minimum, self.unit)),
      plain(or_dash(self.supplier.as_deref())),
      plain(or_dash(self.last_restocked.as_deref())),
      colored(stock.label(), stock_status_color(stock)),
    ]
  }

  fn detail(&self, _client: &SpaClient) -> RecordView {
    RecordView::new(Self::TITLE, self).with_field("stockStatus", self.stock_status().label())
  }
}

impl TableRow for Staff {
  const TITLE: &'static str = "Staff";

  fn columns() -> &'static [(&'static str, usize)] {
    &[
      ("Name", 20),
      ("Role", 16),
      ("Email", 24),
      ("Phone", 14),
      ("Specialties", 24),
      ("Status", 8),
    ]
  }

  fn cells(&self) -> Vec<Span<'static>> {
    vec![
      plain(self.name.clone()),
      plain(self.role.clone()),
      plain(self.email.clone()),
      plain(self.phone.clone()),
      plain(self.specialties.join(", ")),
      colored(self.status.as_str(), active_status_color(self.status)),
    ]
  }
}

impl TableRow for Supplier {
  const TITLE: &'static str = "Suppliers";

  fn columns() -> &'static [(&'static str, usize)] {
    &[
      ("Name", 22),
      ("Contact", 18),
      ("Email", 24),
      ("Phone", 14),
      ("Status", 8),
    ]
  }

  fn cells(&self) -> Vec<Span<'static>> {
    vec![
      plain(self.name.clone()),
      plain(self.contact_person.clone()),
      plain(self.email.clone()),
      plain(self.phone.clone()),
      colored(self.status.as_str(), active_status_color(self.status)),
    ]
  }
}

impl TableRow for Service {
  const TITLE: &'static str = "Services";

  fn columns() -> &'static [(&'static str, usize)] {
    &[
      ("Name", 22),
      ("Category", 14),
      ("Length", 8),
      ("Price", 9),
      ("Offered", 7),
    ]
  }

  fn cells(&self) -> Vec<Span<'static>> {
    let offered = if self.active {
      colored("yes", Color::Green)
    } else {
      colored("no", Color::DarkGray)
    };
    vec![
      plain(self.name.clone()),
      plain(self.category.clone()),
      plain(format!("{} min", self.duration_minutes)),
      plain(format!("{:>9.2}", self.price)),
      offered,
    ]
  }
}

impl TableRow for Transaction {
  const TITLE: &'static str = "Transactions";

  fn columns() -> &'static [(&'static str, usize)] {
    &[
      ("Date", 16),
      ("Customer", 20),
      ("Amount", 10),
      ("Method", 10),
      ("Status", 10),
      ("Booking", 14),
    ]
  }

  fn cells(&self) -> Vec<Span<'static>> {
    vec![
      colored(
        self.date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        Color::Cyan,
      ),
      plain(self.customer_name.clone()),
      plain(format!("{:>10.2}", self.amount)),
      plain(self.method.clone()),
      colored(self.status.to_string(), transaction_status_color(&self.status)),
      plain(or_dash(Some(self.booking_id.as_str()))),
    ]
  }

  fn detail(&self, client: &SpaClient) -> RecordView {
    RecordView::for_transaction(client, self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn booking(status: &str) -> Booking {
    serde_json::from_value(json!({
      "id": "b1",
      "customerName": "Ana",
      "service": "Facial",
      "date": "2026-10-20",
      "time": "09:30",
      "status": status
    }))
    .unwrap()
  }

  #[test]
  fn test_cells_match_columns() {
    let b = booking("pending");
    assert_eq!(b.cells().len(), Booking::columns().len());

    let item: InventoryItem =
      serde_json::from_value(json!({"name": "Oil", "current": 1, "minimum": 3})).unwrap();
    assert_eq!(item.cells().len(), InventoryItem::columns().len());

    let staff: Staff = serde_json::from_value(json!({"name": "Ana"})).unwrap();
    assert_eq!(staff.cells().len(), Staff::columns().len());

    let supplier: Supplier = serde_json::from_value(json!({"name": "Acme"})).unwrap();
    assert_eq!(supplier.cells().len(), Supplier::columns().len());

    let service: Service =
      serde_json::from_value(json!({"name": "Facial", "durationMinutes": 60, "price": 85.0}))
        .unwrap();
    assert_eq!(service.cells().len(), Service::columns().len());

    let txn: Transaction =
      serde_json::from_value(json!({"amount": 10.0, "date": "2026-10-16T10:00:00Z"})).unwrap();
    assert_eq!(txn.cells().len(), Transaction::columns().len());
  }

  #[test]
  fn test_inventory_status_cell() {
    let low: InventoryItem =
      serde_json::from_value(json!({"name": "Oil", "current": 3, "minimum": 3})).unwrap();
    let cells = low.cells();
    assert_eq!(cells[5].content, "Low Stock");
    assert_eq!(cells[5].style.fg, Some(Color::Red));
    assert_eq!(cells[2].content, "3/3 ");

    let ok: InventoryItem =
      serde_json::from_value(json!({"name": "Oil", "current": 4, "minimum": 3})).unwrap();
    assert_eq!(ok.cells()[5].content, "In Stock");
  }

  #[test]
  fn test_booking_status_keys() {
    let pending = booking("pending");
    assert_eq!(
      pending.patch_for_key('c'),
      Some(json!({"status": "confirmed"}).as_object().cloned().unwrap())
    );
    assert_eq!(
      pending.patch_for_key('x'),
      Some(json!({"status": "canceled"}).as_object().cloned().unwrap())
    );
    // Already pending
    assert_eq!(pending.patch_for_key('u'), None);
    assert_eq!(pending.patch_for_key('z'), None);
  }

  #[test]
  fn test_missing_staff_shows_dash() {
    assert_eq!(booking("pending").cells()[4].content, "-");
  }
}
