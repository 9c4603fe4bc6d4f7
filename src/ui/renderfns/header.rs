use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::config::{Backend, Config};
use crate::ui::view::ShortcutInfo;

/// Header contents, gathered by the app each frame
pub struct HeaderInfo<'a> {
  pub logo: &'a str,
  pub backend: &'a str,
  pub title: String,
  pub shortcuts: Vec<ShortcutInfo>,
}

/// Draw the header bar with logo, backend, current table and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: HeaderInfo) {
  let HeaderInfo {
    logo,
    backend,
    title,
    mut shortcuts,
  } = info;

  let mut spans = vec![
    Span::styled(format!(" {} ", logo), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", backend), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", title),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw(" "),
  ];

  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in &shortcuts {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Short description of where data comes from
pub fn backend_label(config: &Config) -> String {
  match config.backend {
    Backend::Memory => "memory".to_string(),
    Backend::Firestore => {
      let project = &config.firestore.project_id;
      match &config.firestore.emulator_host {
        Some(host) => format!("{} @ {}", project, host),
        None => project.clone(),
      }
    }
  }
}
