//! Websocket transport for the change-notification channel.
//!
//! Speaks the phoenix-style framing of the hosted realtime service: one
//! channel join per table topic, periodic heartbeats, row-change messages
//! forwarded into the listener's queue. The connection reconnects with
//! exponential backoff; resubscription happens implicitly because joins
//! are replayed on every connect.

use color_eyre::{eyre::eyre, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::{ChangeEvent, ChangeKind};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawn the websocket task. It runs until the event receiver is dropped.
pub fn spawn_socket(
  url: Url,
  tables: Vec<String>,
  tx: mpsc::UnboundedSender<ChangeEvent>,
) -> JoinHandle<()> {
  tokio::spawn(run(url, tables, tx))
}

async fn run(url: Url, tables: Vec<String>, tx: mpsc::UnboundedSender<ChangeEvent>) {
  let mut backoff = INITIAL_BACKOFF;

  loop {
    if tx.is_closed() {
      return;
    }

    match connect_async(url.as_str()).await {
      Err(e) => {
        warn!("realtime connect failed: {}", e);
      }
      Ok((socket, _)) => {
        info!("realtime channel connected");
        backoff = INITIAL_BACKOFF;
        if let Err(e) = drive(socket, &tables, &tx).await {
          warn!("realtime connection lost: {}", e);
        }
        if tx.is_closed() {
          return;
        }
      }
    }

    debug!(delay_secs = backoff.as_secs(), "reconnecting realtime channel");
    sleep(backoff).await;
    backoff = (backoff * 2).min(MAX_BACKOFF);
  }
}

async fn drive(
  mut socket: Socket,
  tables: &[String],
  tx: &mpsc::UnboundedSender<ChangeEvent>,
) -> Result<()> {
  let mut frame_ref: u64 = 0;

  for table in tables {
    frame_ref += 1;
    let join = json!({
      "topic": format!("realtime:public:{}", table),
      "event": "phx_join",
      "payload": {},
      "ref": frame_ref.to_string(),
    });
    socket.send(Message::Text(join.to_string())).await?;
  }

  let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
  // The first tick fires immediately; the server has just seen the joins.
  heartbeat.tick().await;

  loop {
    tokio::select! {
      _ = heartbeat.tick() => {
        frame_ref += 1;
        let frame = json!({
          "topic": "phoenix",
          "event": "heartbeat",
          "payload": {},
          "ref": frame_ref.to_string(),
        });
        socket.send(Message::Text(frame.to_string())).await?;
      }
      message = socket.next() => {
        let Some(message) = message else {
          return Err(eyre!("realtime stream ended"));
        };
        match message? {
          Message::Text(text) => {
            if let Some(event) = decode(&text) {
              if tx.send(event).is_err() {
                // Listener dropped; shut the transport down quietly.
                return Ok(());
              }
            }
          }
          Message::Ping(payload) => socket.send(Message::Pong(payload)).await?,
          Message::Close(_) => return Err(eyre!("server closed realtime channel")),
          _ => {}
        }
      }
    }
  }
}

#[derive(Debug, Deserialize)]
struct Incoming {
  #[serde(default)]
  topic: String,
  event: String,
  #[serde(default)]
  payload: Value,
}

/// Decode a channel message into a change event. Protocol frames (join
/// replies, heartbeat acks) and unknown events return None.
fn decode(text: &str) -> Option<ChangeEvent> {
  let incoming: Incoming = serde_json::from_str(text).ok()?;
  let kind = ChangeKind::parse(&incoming.event)?;

  let table = incoming
    .payload
    .get("table")
    .and_then(|t| t.as_str())
    .map(String::from)
    .or_else(|| {
      // Fall back to the topic suffix: "realtime:public:orders".
      incoming.topic.rsplit(':').next().map(String::from)
    })?;

  let record = non_null(incoming.payload.get("record"));
  let old_record = non_null(incoming.payload.get("old_record"));

  Some(ChangeEvent {
    table,
    kind,
    record,
    old_record,
  })
}

fn non_null(value: Option<&Value>) -> Option<Value> {
  match value {
    Some(Value::Null) | None => None,
    Some(v) => Some(v.clone()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_row_change_messages() {
    let text = r#"{
      "topic": "realtime:public:orders",
      "event": "UPDATE",
      "payload": {
        "table": "orders",
        "record": {"id": "o1", "status": "completed"},
        "old_record": {"id": "o1", "status": "pending"}
      },
      "ref": null
    }"#;

    let event = decode(text).expect("change event decoded");
    assert_eq!(event.table, "orders");
    assert_eq!(event.kind, ChangeKind::Update);
    assert_eq!(event.record.unwrap()["status"], "completed");
    assert_eq!(event.old_record.unwrap()["status"], "pending");
  }

  #[test]
  fn table_falls_back_to_topic_suffix() {
    let text = r#"{
      "topic": "realtime:public:products",
      "event": "DELETE",
      "payload": {"old_record": {"id": "p1"}}
    }"#;

    let event = decode(text).expect("change event decoded");
    assert_eq!(event.table, "products");
    assert_eq!(event.kind, ChangeKind::Delete);
    assert!(event.record.is_none());
  }

  #[test]
  fn protocol_frames_are_ignored() {
    let reply = r#"{"topic": "realtime:public:orders", "event": "phx_reply", "payload": {"status": "ok"}, "ref": "1"}"#;
    assert!(decode(reply).is_none());

    let garbage = "not json at all";
    assert!(decode(garbage).is_none());
  }
}
