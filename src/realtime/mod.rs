//! Change-notification handling.
//!
//! The listener consumes change events for a fixed set of tables and keeps
//! the provider reconciled with the remote store. An event whose payload
//! carries a usable row is applied as a targeted patch; anything the
//! snapshot cannot absorb locally (unknown rows, rows with nested
//! collections the payload lacks, malformed payloads) falls back to
//! exactly one full forced refetch.

mod socket;

pub use socket::spawn_socket;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::provider::Provider;
use crate::store::api_types::{reserialize, CustomerRow, OrderRow, ProductRow};
use crate::store::DataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
  Insert,
  Update,
  Delete,
}

impl ChangeKind {
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "INSERT" => Some(Self::Insert),
      "UPDATE" => Some(Self::Update),
      "DELETE" => Some(Self::Delete),
      _ => None,
    }
  }
}

/// One row-level change reported by the remote store.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
  pub table: String,
  pub kind: ChangeKind,
  /// The new row, for inserts and updates.
  pub record: Option<Value>,
  /// The previous row (often just the primary key), for deletes.
  pub old_record: Option<Value>,
}

/// Owns the reconciliation task (and optionally the websocket task).
/// Dropping the listener tears the subscription down.
pub struct Listener {
  task: JoinHandle<()>,
  socket: Option<JoinHandle<()>>,
}

impl Listener {
  /// Reconcile the provider from any stream of change events. Events for
  /// tables outside `tables` are ignored.
  pub fn spawn<S: DataSource>(
    provider: Provider<S>,
    tables: Vec<String>,
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
  ) -> Self {
    let task = tokio::spawn(async move {
      while let Some(event) = events.recv().await {
        if !tables.iter().any(|t| t == &event.table) {
          continue;
        }
        apply(&provider, event).await;
      }
      debug!("change feed closed");
    });

    Self { task, socket: None }
  }

  /// Subscribe over the websocket transport and reconcile from it.
  pub fn connect<S: DataSource>(provider: Provider<S>, url: Url, tables: Vec<String>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let socket = spawn_socket(url, tables.clone(), tx);
    let mut listener = Self::spawn(provider, tables, rx);
    listener.socket = Some(socket);
    listener
  }
}

impl Drop for Listener {
  fn drop(&mut self) {
    self.task.abort();
    if let Some(socket) = &self.socket {
      socket.abort();
    }
  }
}

async fn apply<S: DataSource>(provider: &Provider<S>, event: ChangeEvent) {
  if try_patch(provider, &event) {
    debug!(table = %event.table, kind = ?event.kind, "change applied as targeted patch");
    return;
  }

  debug!(table = %event.table, kind = ?event.kind, "change needs full refetch");
  if let Err(e) = provider.refresh().await {
    warn!("refetch after change event failed: {}", e);
  }
}

/// Apply the event to the snapshot directly. Returns false when the event
/// must be resolved by refetching instead.
fn try_patch<S: DataSource>(provider: &Provider<S>, event: &ChangeEvent) -> bool {
  match event.kind {
    ChangeKind::Delete => {
      let Some(id) = row_id(event.old_record.as_ref()) else {
        return false;
      };
      provider.reconcile_delete(&event.table, &id);
      true
    }
    ChangeKind::Insert | ChangeKind::Update => {
      let Some(record) = event.record.as_ref() else {
        return false;
      };
      match (event.table.as_str(), event.kind) {
        // Customer rows carry no nested collections, so the payload is
        // complete for inserts and updates alike.
        ("customers", _) => match reserialize::<CustomerRow>(record) {
          Ok(row) => {
            provider.reconcile_customer_upsert(row);
            true
          }
          Err(_) => false,
        },
        // Product and order payloads are flat rows; updates can merge
        // scalar fields over the cached row, but inserts would leave
        // variants/items unknown.
        ("products", ChangeKind::Update) => match reserialize::<ProductRow>(record) {
          Ok(row) => provider.reconcile_product_update(row),
          Err(_) => false,
        },
        ("orders", ChangeKind::Update) => match reserialize::<OrderRow>(record) {
          Ok(row) => provider.reconcile_order_update(row),
          Err(_) => false,
        },
        _ => false,
      }
    }
  }
}

fn row_id(record: Option<&Value>) -> Option<String> {
  record
    .and_then(|r| r.get("id"))
    .and_then(|id| id.as_str())
    .map(String::from)
}
