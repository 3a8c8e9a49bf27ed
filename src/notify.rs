//! Transient user-facing notifications.
//!
//! The provider emits one event per mutation outcome and per fetch
//! failure; screens subscribe and render them as ephemeral toasts. A
//! subscriber that falls behind just loses the oldest events.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Info,
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub severity: Severity,
  pub title: String,
  pub message: String,
}

/// Fan-out sender for notifications.
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: broadcast::Sender<Notification>,
}

impl Notifier {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
    self.tx.subscribe()
  }

  fn emit(&self, severity: Severity, title: &str, message: impl Into<String>) {
    // Send errors just mean nobody is listening right now.
    let _ = self.tx.send(Notification {
      severity,
      title: title.to_string(),
      message: message.into(),
    });
  }

  pub fn info(&self, title: &str, message: impl Into<String>) {
    self.emit(Severity::Info, title, message);
  }

  pub fn success(&self, title: &str, message: impl Into<String>) {
    self.emit(Severity::Success, title, message);
  }

  pub fn error(&self, title: &str, message: impl Into<String>) {
    self.emit(Severity::Error, title, message);
  }
}

impl Default for Notifier {
  fn default() -> Self {
    Self::new(64)
  }
}
