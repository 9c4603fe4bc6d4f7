use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use serde_json::{Map, Value};
use std::time::Instant;

use crate::fetch::{Entity, Page, PageRequest, PageSource, SpaClient};
use crate::model::ListFilter;
use crate::query::Query;
use crate::store::Cursor;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::cell;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

use super::RecordView;

/// How one entity renders as a table row.
pub trait TableRow: Entity {
  const TITLE: &'static str;

  /// Column headings and their widths
  fn columns() -> &'static [(&'static str, usize)];

  /// One styled span per column; the view pads and truncates them
  fn cells(&self) -> Vec<Span<'static>>;

  /// Field patch bound to a row key, for quick status changes
  fn patch_for_key(&self, _key: char) -> Option<Map<String, Value>> {
    None
  }

  /// Hints for the keys `patch_for_key` understands
  fn actions() -> Vec<ShortcutInfo> {
    Vec::new()
  }

  /// Detail view opened with Enter
  fn detail(&self, _client: &SpaClient) -> RecordView {
    RecordView::new(Self::TITLE, self)
  }
}

/// Paged table over one collection, with a tab per list filter.
pub struct EntityTableView<T: TableRow> {
  client: SpaClient,
  tabs: Vec<T::Filter>,
  tab: usize,
  /// 1-based
  page: u32,
  /// `cursors[i]` is where page `i + 1` starts
  cursors: Vec<Option<Cursor>>,
  /// Tab and page of the rows on screen
  shown: Option<(usize, u32)>,
  query: Query<Page<T>>,
  seen: Option<Instant>,
  update: Query<T>,
  update_seen: Option<Instant>,
  list_state: ListState,
}

impl<T: TableRow> EntityTableView<T> {
  /// Create the view and start loading page 1 of the first tab.
  pub fn new(client: SpaClient) -> Self {
    let tabs = T::Filter::tabs();
    let mut view = Self {
      client,
      tabs,
      tab: 0,
      page: 1,
      cursors: vec![None],
      shown: None,
      query: Query::new(),
      seen: None,
      update: Query::new(),
      update_seen: None,
      list_state: ListState::default(),
    };
    view.load(false);
    view
  }

  fn filter(&self) -> T::Filter {
    self.tabs.get(self.tab).cloned().unwrap_or_default()
  }

  fn rows(&self) -> &[T] {
    self.query.data().map(|p| p.items.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&T> {
    self.list_state.selected().and_then(|i| self.rows().get(i))
  }

  fn load(&mut self, refresh: bool) {
    let request = PageRequest {
      filter: self.filter(),
      page: self.page,
      page_size: self.client.page_size(),
      cursor: self.cursors.get(self.page as usize - 1).cloned().flatten(),
      refresh,
    };
    tracing::debug!(entity = T::COLLECTION, page = self.page, refresh, "Loading table");

    let client = self.client.clone();
    self.query.run(move |token| async move {
      client
        .lists::<T>()
        .fetch_until_cancelled(request, &token)
        .await
    });
  }

  fn switch_tab(&mut self, forward: bool) {
    let count = self.tabs.len();
    if count < 2 {
      return;
    }
    self.tab = if forward {
      (self.tab + 1) % count
    } else {
      (self.tab + count - 1) % count
    };
    self.page = 1;
    self.cursors = vec![None];
    self.list_state.select(Some(0));
    self.load(false);
  }

  fn total_pages(&self) -> u32 {
    let total = self.query.data().map(|p| p.total_count).unwrap_or(0);
    let size = u64::from(self.client.page_size().max(1));
    total.div_ceil(size).max(1) as u32
  }

  fn next_page(&mut self) {
    if self.query.is_loading() || self.page >= self.total_pages() {
      return;
    }
    let Some(data) = self.query.data() else {
      return;
    };

    // A mirror hit carries no cursor, so continue from the last row
    let cursor = match (&data.last_cursor, data.items.last()) {
      (Some(cursor), _) => cursor.clone(),
      (None, Some(last)) => match self.client.accessor::<T>().cursor_after(&self.filter(), last) {
        Ok(cursor) => cursor,
        Err(e) => {
          tracing::warn!(entity = T::COLLECTION, error = %e, "Cannot build next page cursor");
          return;
        }
      },
      (None, None) => return,
    };

    self.cursors.truncate(self.page as usize);
    self.cursors.push(Some(cursor));
    self.page += 1;
    self.list_state.select(Some(0));
    self.load(false);
  }

  fn prev_page(&mut self) {
    if self.page > 1 {
      self.page -= 1;
      self.list_state.select(Some(0));
      self.load(false);
    }
  }

  fn apply_patch(&mut self, key: char) {
    let Some(record) = self.selected() else {
      return;
    };
    let Some(patch) = record.patch_for_key(key) else {
      return;
    };
    let id = record.id().to_string();
    tracing::info!(entity = T::COLLECTION, id = %id, "Updating record from dashboard");

    let client = self.client.clone();
    self
      .update
      .run(move |_| async move { client.update::<T, _>(&id, &patch).await });
  }

  fn render_tabs(&self, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, filter) in self.tabs.iter().enumerate() {
      let style = if i == self.tab {
        Style::default().fg(Color::Black).bg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      spans.push(Span::styled(format!(" {} ", filter.tab_label()), style));
      spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows().len();
    ensure_valid_selection(&mut self.list_state, len);

    let total = self.query.data().map(|p| p.total_count).unwrap_or(0);
    let title = if self.query.is_loading() {
      format!(" {} (loading...) ", T::TITLE)
    } else {
      format!(" {} ({}) ", T::TITLE, total)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = if self.query.is_loading() || self.query.data().is_none() {
        "Loading..."
      } else {
        "Nothing here yet."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let heading: Vec<Span> = std::iter::once(Span::raw("  "))
      .chain(T::columns().iter().map(|(name, width)| {
        Span::styled(
          format!("{} ", cell(name, *width)),
          Style::default().fg(Color::DarkGray).bold(),
        )
      }))
      .collect();
    frame.render_widget(Paragraph::new(Line::from(heading)), chunks[0]);

    let items: Vec<ListItem> = self
      .rows()
      .iter()
      .map(|row| {
        let spans: Vec<Span> = row
          .cells()
          .into_iter()
          .zip(T::columns())
          .map(|(span, (_, width))| Span::styled(format!("{} ", cell(&span.content, *width)), span.style))
          .collect();
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[1], &mut self.list_state);
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let source = match self.query.data().map(|p| p.source) {
      Some(PageSource::Mirror) => "cached",
      Some(PageSource::Remote) => "live",
      None => "-",
    };
    let line = Line::from(vec![
      Span::styled(
        format!(" page {}/{} ", self.page, self.total_pages()),
        Style::default().fg(Color::White),
      ),
      Span::styled(format!(" {} ", source), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
  }
}

impl<T: TableRow> View for EntityTableView<T> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('h') | KeyCode::Left => self.switch_tab(false),
      KeyCode::Char('l') | KeyCode::Right => self.switch_tab(true),
      KeyCode::Char('n') => self.next_page(),
      KeyCode::Char('p') => self.prev_page(),
      KeyCode::Char('r') => self.load(true),
      KeyCode::Enter => {
        if let Some(record) = self.selected() {
          return ViewAction::Push(Box::new(record.detail(&self.client)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Char(c) => self.apply_patch(c),
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Tabs
        Constraint::Min(3),    // Rows
        Constraint::Length(1), // Page status
      ])
      .split(area);

    self.render_tabs(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    self.render_status(frame, chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    T::TITLE.to_string()
  }

  fn title(&self) -> String {
    format!("{} · {}", T::TITLE, self.filter().tab_label())
  }

  fn tick(&mut self) {
    if self.query.poll() {
      if self.query.fetched_at() != self.seen {
        self.seen = self.query.fetched_at();
        self.shown = Some((self.tab, self.page));
      } else if let Some((tab, page)) = self.shown {
        // Failed: the old rows stay, so point back at them
        self.tab = tab;
        self.page = page;
      }
      let len = self.rows().len();
      ensure_valid_selection(&mut self.list_state, len);
    }

    if self.update.poll() && self.update.fetched_at() != self.update_seen {
      self.update_seen = self.update.fetched_at();
      self.load(true);
    }
  }

  fn notice(&self) -> Option<String> {
    self
      .query
      .notice()
      .or_else(|| self.update.notice())
      .map(str::to_string)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("h/l", "tab").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("enter", "details").with_priority(50),
    ];
    shortcuts.extend(T::actions());
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mirror::SqliteMirror;
  use crate::model::{Booking, BookingStatus, InventoryItem, Staff};
  use crate::store::MemoryStore;
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn client(page_size: u32) -> (Arc<MemoryStore>, SpaClient) {
    let store = Arc::new(MemoryStore::new());
    let mirror = Arc::new(SqliteMirror::open_in_memory().unwrap());
    (store.clone(), SpaClient::with_parts(store, mirror, page_size))
  }

  fn press(view: &mut dyn View, c: char) -> ViewAction {
    view.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
  }

  /// Tick until nothing is in flight.
  async fn settle<T: TableRow>(view: &mut EntityTableView<T>) {
    for _ in 0..100 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
      if !view.query.is_loading() && !view.update.is_loading() {
        return;
      }
    }
    panic!("view never settled");
  }

  fn add_staff(store: &MemoryStore, id: &str, name: &str, status: &str) {
    store
      .insert(
        "staffs",
        id,
        json!({"name": name, "role": "therapist", "status": status})
          .as_object()
          .cloned()
          .unwrap(),
      )
      .unwrap();
  }

  fn names(view: &EntityTableView<Staff>) -> Vec<String> {
    view.rows().iter().map(|s| s.name.clone()).collect()
  }

  #[tokio::test]
  async fn test_loads_first_page() {
    let (store, client) = client(2);
    for (id, name) in [("1", "Ana"), ("2", "Ben"), ("3", "Cy")] {
      add_staff(&store, id, name, "active");
    }

    let mut view = EntityTableView::<Staff>::new(client);
    settle(&mut view).await;

    assert_eq!(names(&view), vec!["Ana", "Ben"]);
    assert_eq!(view.total_pages(), 2);
    assert_eq!(view.list_state.selected(), Some(0));
  }

  #[tokio::test]
  async fn test_paging_forward_and_back() {
    let (store, client) = client(2);
    for (id, name) in [("1", "Ana"), ("2", "Ben"), ("3", "Cy")] {
      add_staff(&store, id, name, "active");
    }
    let mut view = EntityTableView::<Staff>::new(client);
    settle(&mut view).await;

    press(&mut view, 'n');
    settle(&mut view).await;
    assert_eq!(view.page, 2);
    assert_eq!(names(&view), vec!["Cy"]);

    // Already on the last page
    press(&mut view, 'n');
    assert_eq!(view.page, 2);

    press(&mut view, 'p');
    settle(&mut view).await;
    assert_eq!(view.page, 1);
    assert_eq!(names(&view), vec!["Ana", "Ben"]);
  }

  #[tokio::test]
  async fn test_next_page_after_mirror_hit() {
    let (store, client) = client(2);
    for (id, name) in [("1", "Ana"), ("2", "Ben"), ("3", "Cy")] {
      add_staff(&store, id, name, "active");
    }
    // Warm the mirror, then open a fresh view that is served from it
    let mut warm = EntityTableView::<Staff>::new(client.clone());
    settle(&mut warm).await;

    let mut view = EntityTableView::<Staff>::new(client);
    settle(&mut view).await;
    assert_eq!(view.query.data().map(|p| p.source), Some(PageSource::Mirror));

    press(&mut view, 'n');
    settle(&mut view).await;
    assert_eq!(names(&view), vec!["Cy"]);
  }

  #[tokio::test]
  async fn test_tabs_switch_filter() {
    let (store, client) = client(10);
    add_staff(&store, "1", "Ana", "active");
    add_staff(&store, "2", "Ben", "inactive");
    let mut view = EntityTableView::<Staff>::new(client);
    settle(&mut view).await;
    assert_eq!(names(&view).len(), 2);

    press(&mut view, 'l');
    settle(&mut view).await;
    assert_eq!(names(&view), vec!["Ana"]);

    press(&mut view, 'l');
    settle(&mut view).await;
    assert_eq!(names(&view), vec!["Ben"]);
    assert!(view.title().starts_with("Staff"));
  }

  #[tokio::test]
  async fn test_failure_keeps_rows_and_position() {
    let (store, client) = client(2);
    for (id, name) in [("1", "Ana"), ("2", "Ben"), ("3", "Cy")] {
      add_staff(&store, id, name, "active");
    }
    let mut view = EntityTableView::<Staff>::new(client);
    settle(&mut view).await;

    store.fail_next("unavailable");
    press(&mut view, 'n');
    settle(&mut view).await;

    assert_eq!(view.page, 1);
    assert_eq!(names(&view), vec!["Ana", "Ben"]);
    assert!(view.notice().is_some_and(|n| n.contains("unavailable")));
  }

  #[tokio::test]
  async fn test_confirm_key_patches_booking() {
    let (store, client) = client(10);
    store
      .insert(
        "bookings",
        "b1",
        json!({
          "customerName": "Ana",
          "service": "Facial",
          "date": "2099-01-01",
          "time": "10:00",
          "status": "pending"
        })
        .as_object()
        .cloned()
        .unwrap(),
      )
      .unwrap();

    let mut view = EntityTableView::<Booking>::new(client);
    settle(&mut view).await;
    press(&mut view, 'c');
    settle(&mut view).await;
    // Refresh after the update
    settle(&mut view).await;

    assert_eq!(view.rows()[0].status, BookingStatus::Confirmed);
  }

  #[tokio::test]
  async fn test_enter_opens_detail_and_q_pops() {
    let (store, client) = client(10);
    store
      .insert(
        "inventory",
        "i1",
        json!({"name": "Towels", "category": "linen", "current": 2, "minimum": 5, "unit": "pcs"})
          .as_object()
          .cloned()
          .unwrap(),
      )
      .unwrap();
    let mut view = EntityTableView::<InventoryItem>::new(client);
    settle(&mut view).await;

    let action = view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    assert!(matches!(action, ViewAction::Push(_)));
    assert!(matches!(press(&mut view, 'q'), ViewAction::Pop));
  }
}
