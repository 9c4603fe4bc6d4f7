use color_eyre::Result;
use crossterm::{
  event::{KeyCode, KeyEvent, KeyModifiers},
  terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
  ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};

use crate::commands::CommandKind;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::fetch::SpaClient;
use crate::model::{Booking, InventoryItem, Service, Staff, Supplier, Transaction};
use crate::query::NOTICE_TTL;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::backend_label;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::EntityTableView;

const TICK_RATE: Duration = Duration::from_millis(250);

/// Dashboard state: a stack of views plus the `:` prompt.
pub struct App {
  client: SpaClient,
  logo: String,
  backend: String,

  /// Bottom is the entity table, anything above it is a detail view
  view_stack: Vec<Box<dyn View>>,

  command_input: CommandInput,

  /// App-level notice, e.g. an unknown command
  notice: Option<(String, Instant)>,

  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, client: SpaClient) -> Self {
    let mut app = Self {
      client,
      logo: config.title.clone().unwrap_or_else(|| "spadesk".to_string()),
      backend: backend_label(config),
      view_stack: Vec::new(),
      command_input: CommandInput::new(),
      notice: None,
      should_quit: false,
    };
    app.open(CommandKind::Bookings);
    app
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit() {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  pub fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
    }
  }

  fn tick(&mut self) {
    for view in &mut self.view_stack {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.command_input.handle_key(key) {
      KeyResult::Handled => return,
      KeyResult::Event(CommandEvent::Run(kind)) => {
        self.open(kind);
        return;
      }
      KeyResult::Event(CommandEvent::Unknown(input)) => {
        self.notice = Some((format!("Unknown command: {}", input), Instant::now()));
        return;
      }
      KeyResult::Event(CommandEvent::Cancelled) => return,
      KeyResult::NotHandled => {}
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  /// Replace every open view with a fresh table. Dropping the old views
  /// cancels their fetches.
  fn open(&mut self, kind: CommandKind) {
    let client = self.client.clone();
    let view: Box<dyn View> = match kind {
      CommandKind::Bookings => Box::new(EntityTableView::<Booking>::new(client)),
      CommandKind::Inventory => Box::new(EntityTableView::<InventoryItem>::new(client)),
      CommandKind::Staff => Box::new(EntityTableView::<Staff>::new(client)),
      CommandKind::Suppliers => Box::new(EntityTableView::<Supplier>::new(client)),
      CommandKind::Services => Box::new(EntityTableView::<Service>::new(client)),
      CommandKind::Transactions => Box::new(EntityTableView::<Transaction>::new(client)),
      CommandKind::Quit => {
        self.should_quit = true;
        return;
      }
    };
    tracing::debug!(?kind, "Opening view");
    self.view_stack = vec![view];
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }

  /// App notice while fresh, else whatever the current view reports.
  pub fn notice(&self) -> Option<String> {
    self
      .notice
      .as_ref()
      .filter(|(_, at)| at.elapsed() < NOTICE_TTL)
      .map(|(message, _)| message.clone())
      .or_else(|| self.view_stack.last().and_then(|v| v.notice()))
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn logo(&self) -> &str {
    &self.logo
  }

  pub fn backend_label(&self) -> &str {
    &self.backend
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}
