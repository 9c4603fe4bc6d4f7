//! Async query state for the dashboard tables.
//!
//! A `Query<T>` runs one fetch at a time on the tokio runtime and hands the
//! result back through a channel that the event loop polls on each tick.
//! Failures keep the last good data and raise a notice that fades after a
//! few seconds.
//!
//! # Example
//!
//! ```ignore
//! let client = client.clone();
//! query.run(move |token| async move {
//!     client.lists::<Staff>().fetch_until_cancelled(request, &token).await
//! });
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// How long a failure notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Notice {
  message: String,
  raised_at: Instant,
}

/// Async query with stale-while-error semantics.
pub struct Query<T> {
  data: Option<T>,
  loading: bool,
  notice: Option<Notice>,
  notice_ttl: Duration,
  receiver: Option<mpsc::UnboundedReceiver<Result<T>>>,
  token: Option<CancellationToken>,
  fetched_at: Option<Instant>,
}

impl<T: Send + 'static> Query<T> {
  pub fn new() -> Self {
    Self {
      data: None,
      loading: false,
      notice: None,
      notice_ttl: NOTICE_TTL,
      receiver: None,
      token: None,
      fetched_at: None,
    }
  }

  pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
    self.notice_ttl = ttl;
    self
  }

  /// Last successfully fetched data, kept through later failures.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  /// Current failure notice, until it expires.
  pub fn notice(&self) -> Option<&str> {
    self
      .notice
      .as_ref()
      .filter(|n| n.raised_at.elapsed() < self.notice_ttl)
      .map(|n| n.message.as_str())
  }

  pub fn fetched_at(&self) -> Option<Instant> {
    self.fetched_at
  }

  /// Start a fetch, cancelling any pending one.
  ///
  /// The closure gets a token that fires when this fetch is superseded or
  /// the query is dropped.
  pub fn run<F, Fut>(&mut self, fetch: F)
  where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    self.cancel();

    let token = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let future = fetch(token.clone());
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });

    self.receiver = Some(rx);
    self.token = Some(token);
    self.loading = true;
  }

  /// Cancel the pending fetch, if any.
  pub fn cancel(&mut self) {
    if let Some(token) = self.token.take() {
      token.cancel();
    }
    self.receiver = None;
    self.loading = false;
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    let outcome = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => Err(Error::Cancelled),
    };

    self.receiver = None;
    self.token = None;
    self.loading = false;

    match outcome {
      Ok(data) => {
        self.data = Some(data);
        self.fetched_at = Some(Instant::now());
        self.notice = None;
      }
      Err(Error::Cancelled) => {}
      Err(e) => {
        tracing::warn!(error = %e, "Fetch failed, keeping previous rows");
        self.notice = Some(Notice {
          message: e.to_string(),
          raised_at: Instant::now(),
        });
      }
    }
    true
  }
}

impl<T: Send + 'static> Default for Query<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(token) = self.token.take() {
      token.cancel();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("data", &self.data)
      .field("loading", &self.loading)
      .field("notice", &self.notice)
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}
