use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use serde::Serialize;
use serde_json::Value;

use crate::fetch::SpaClient;
use crate::model::{Booking, Transaction};
use crate::query::Query;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Read-only field listing for one record.
pub struct RecordView {
  label: String,
  fields: Vec<(String, String)>,
  linked: Option<Query<Option<Booking>>>,
  scroll: u16,
}

/// Display text for one JSON field value.
fn display(value: &Value) -> String {
  match value {
    Value::Null => "-".to_string(),
    Value::String(s) if s.is_empty() => "-".to_string(),
    Value::String(s) => s.clone(),
    Value::Array(items) if items.is_empty() => "-".to_string(),
    Value::Array(items) => items
      .iter()
      .map(display)
      .collect::<Vec<_>>()
      .join(", "),
    other => other.to_string(),
  }
}

impl RecordView {
  pub fn new<R: Serialize>(kind: &str, record: &R) -> Self {
    let fields = match serde_json::to_value(record) {
      Ok(Value::Object(map)) => map
        .iter()
        .map(|(key, value)| (key.clone(), display(value)))
        .collect(),
      Ok(other) => vec![("value".to_string(), display(&other))],
      Err(e) => vec![("error".to_string(), e.to_string())],
    };
    let id = fields
      .iter()
      .find(|(key, _)| key == "id")
      .map(|(_, id)| id.clone())
      .unwrap_or_default();

    Self {
      label: format!("{} {}", kind, id),
      fields,
      linked: None,
      scroll: 0,
    }
  }

  pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
    self.fields.push((key.to_string(), value.into()));
    self
  }

  /// Transaction details plus the booking it points at.
  pub fn for_transaction(client: &SpaClient, transaction: &Transaction) -> Self {
    let mut view = Self::new("Transaction", transaction);
    let mut query = Query::new();
    let client = client.clone();
    let transaction = transaction.clone();
    query.run(move |_| async move { client.transaction_booking(&transaction).await });
    view.linked = Some(query);
    view
  }

  fn linked_lines(&self) -> Vec<Line<'static>> {
    let Some(query) = &self.linked else {
      return Vec::new();
    };

    let heading = Line::from(Span::styled(
      "Booking",
      Style::default().fg(Color::Cyan).bold(),
    ));
    let body = match query.data() {
      _ if query.is_loading() => Line::styled("Loading...", Style::default().fg(Color::DarkGray)),
      Some(Some(booking)) => Line::from(format!(
        "{} · {} · {} {} · {}",
        booking.customer_name, booking.service, booking.date, booking.time, booking.status
      )),
      Some(None) => Line::styled("No linked booking", Style::default().fg(Color::DarkGray)),
      None => Line::styled(
        query.notice().unwrap_or("Booking unavailable").to_string(),
        Style::default().fg(Color::Red),
      ),
    };
    vec![Line::raw(""), heading, body]
  }
}

impl View for RecordView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.label))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let width = self.fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut lines: Vec<Line> = self
      .fields
      .iter()
      .map(|(key, value)| {
        Line::from(vec![
          Span::styled(
            format!("{:<width$}  ", key, width = width),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(value.clone()),
        ])
      })
      .collect();
    lines.extend(self.linked_lines());

    let paragraph = Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.label.clone()
  }

  fn tick(&mut self) {
    if let Some(query) = &mut self.linked {
      query.poll();
    }
  }

  fn notice(&self) -> Option<String> {
    self
      .linked
      .as_ref()
      .and_then(|q| q.notice())
      .map(str::to_string)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "scroll").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mirror::SqliteMirror;
  use crate::model::InventoryItem;
  use crate::store::MemoryStore;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  #[test]
  fn test_display_values() {
    assert_eq!(display(&json!(null)), "-");
    assert_eq!(display(&json!("")), "-");
    assert_eq!(display(&json!(["oils", "stones"])), "oils, stones");
    assert_eq!(display(&json!(42)), "42");
  }

  #[test]
  fn test_fields_from_record() {
    let item: InventoryItem = serde_json::from_value(json!({
      "id": "i1",
      "name": "Towels",
      "current": 2,
      "minimum": 5,
    }))
    .unwrap();
    let view = RecordView::new("Inventory", &item).with_field("stockStatus", "Low Stock");

    assert_eq!(view.breadcrumb_label(), "Inventory i1");
    assert!(view.fields.contains(&("name".to_string(), "Towels".to_string())));
    assert!(view
      .fields
      .contains(&("stockStatus".to_string(), "Low Stock".to_string())));
  }

  #[tokio::test]
  async fn test_transaction_loads_linked_booking() {
    let store = Arc::new(MemoryStore::new());
    let mirror = Arc::new(SqliteMirror::open_in_memory().unwrap());
    let client = SpaClient::with_parts(store.clone(), mirror, 10);
    store
      .insert(
        "bookings",
        "b1",
        json!({"customerName": "Ana", "service": "Facial", "date": "2026-10-20"})
          .as_object()
          .cloned()
          .unwrap(),
      )
      .unwrap();
    let transaction: Transaction = serde_json::from_value(json!({
      "id": "t1",
      "bookingId": "b1",
      "amount": 80.0,
      "date": "2026-10-16T10:00:00Z"
    }))
    .unwrap();

    let mut view = RecordView::for_transaction(&client, &transaction);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    let linked = view.linked.as_ref().and_then(|q| q.data()).cloned().flatten();
    assert_eq!(linked.map(|b| b.customer_name), Some("Ana".to_string()));
  }
}
