use ratatui::prelude::Color;

use crate::model::{ActiveStatus, BookingStatus, StockStatus, TransactionStatus};

/// Truncate to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Truncate then left-align in a fixed-width column
pub fn cell(s: &str, width: usize) -> String {
  format!("{:<width$}", truncate(s, width), width = width)
}

pub fn booking_status_color(status: &BookingStatus) -> Color {
  match status {
    BookingStatus::Confirmed => Color::Green,
    BookingStatus::Pending => Color::Yellow,
    BookingStatus::Canceled => Color::Red,
    BookingStatus::Other(_) => Color::White,
  }
}

pub fn transaction_status_color(status: &TransactionStatus) -> Color {
  match status {
    TransactionStatus::Completed => Color::Green,
    TransactionStatus::Pending => Color::Yellow,
    TransactionStatus::Failed => Color::Red,
    TransactionStatus::Other(_) => Color::White,
  }
}

pub fn stock_status_color(status: StockStatus) -> Color {
  match status {
    StockStatus::LowStock => Color::Red,
    StockStatus::InStock => Color::Green,
  }
}

pub fn active_status_color(status: ActiveStatus) -> Color {
  match status {
    ActiveStatus::Active => Color::Green,
    ActiveStatus::Inactive => Color::DarkGray,
  }
}
