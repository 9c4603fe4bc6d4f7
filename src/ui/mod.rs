pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::ListState;

use crate::app::App;
use renderfns::{draw_footer, draw_header, HeaderInfo};

/// Keep a list selection inside `0..len`.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let breadcrumb = app.breadcrumb();
  let notice = app.notice();
  let logo = app.logo().to_string();
  let backend = app.backend_label().to_string();

  if let Some(view) = app.current_view_mut() {
    draw_header(
      frame,
      chunks[0],
      HeaderInfo {
        logo: &logo,
        backend: &backend,
        title: view.title(),
        shortcuts: view.shortcuts(),
      },
    );
    view.render(frame, chunks[1]);
  }

  draw_footer(frame, chunks[2], &breadcrumb, notice.as_deref());

  app.command_input().render_overlay(frame, chunks[1]);
}
