//! Realtime change feed over the backend's Phoenix websocket.
//!
//! A [`Subscription`] owns the socket task. Dropping it cancels the task,
//! which sends `phx_leave` and closes the socket, so a channel is released on
//! every exit path of the code holding it.

use crate::api::client::BackendClient;
use crate::error::ApiError;
use crate::utils::error_helpers::convert_ws_error;
use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::{CancellationToken, DropGuard};

const HEARTBEAT_INTERVAL_SECS: u64 = 30;
const JOIN_TIMEOUT_SECS: u64 = 10;
const EVENT_BUFFER: usize = 64;
const JOIN_REF: &str = "1";

/// Which row changes a subscription receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFilter {
    All,
    Insert,
    Update,
    Delete,
}

impl ChangeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFilter::All => "*",
            ChangeFilter::Insert => "INSERT",
            ChangeFilter::Update => "UPDATE",
            ChangeFilter::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => f.write_str("INSERT"),
            ChangeKind::Update => f.write_str("UPDATE"),
            ChangeKind::Delete => f.write_str("DELETE"),
        }
    }
}

/// One row change delivered by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record: Option<Value>,
    pub old_record: Option<Value>,
}

/// Source of table change notifications.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, table: &str, filter: ChangeFilter) -> Result<Subscription, ApiError>;
}

/// Live subscription to a table. Unsubscribes when dropped.
pub struct Subscription {
    // Dropped first so the socket task sees cancellation before the receiver goes away.
    _guard: DropGuard,
    topic: String,
    events: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Wrap an event channel. `cancel` is fired when the subscription is dropped.
    pub fn new(topic: String, events: mpsc::Receiver<ChangeEvent>, cancel: CancellationToken) -> Self {
        Self {
            _guard: cancel.drop_guard(),
            topic,
            events,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next change, or `None` once the feed has closed.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish()
    }
}

/// Phoenix channel frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    pub payload: Value,
    #[serde(rename = "ref")]
    pub msg_ref: Option<String>,
}

impl PhoenixMessage {
    pub fn join(topic: &str, table: &str, filter: ChangeFilter, access_token: Option<&str>) -> Self {
        let mut payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": filter.as_str(), "schema": "public", "table": table }
                ]
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }
        Self {
            topic: topic.to_string(),
            event: "phx_join".to_string(),
            payload,
            msg_ref: Some(JOIN_REF.to_string()),
        }
    }

    pub fn leave(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_leave".to_string(),
            payload: json!({}),
            msg_ref: None,
        }
    }

    pub fn heartbeat(msg_ref: u64) -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    /// Join outcome, if this frame is the reply to our join.
    pub fn join_reply(&self) -> Option<Result<(), String>> {
        if self.event != "phx_reply" || self.msg_ref.as_deref() != Some(JOIN_REF) {
            return None;
        }
        match self.payload.get("status").and_then(Value::as_str) {
            Some("ok") => Some(Ok(())),
            _ => Some(Err(self
                .payload
                .get("response")
                .map(|r| r.to_string())
                .unwrap_or_else(|| "join rejected".to_string()))),
        }
    }

    /// Row change carried by a `postgres_changes` frame.
    pub fn change_event(&self) -> Option<ChangeEvent> {
        if self.event != "postgres_changes" {
            return None;
        }
        let data = self.payload.get("data")?;
        let kind: ChangeKind = serde_json::from_value(data.get("type")?.clone()).ok()?;
        let table = data.get("table")?.as_str()?.to_string();
        let non_null = |key: &str| data.get(key).filter(|v| !v.is_null()).cloned();
        Some(ChangeEvent {
            table,
            kind,
            record: non_null("record"),
            old_record: non_null("old_record"),
        })
    }

    fn to_ws(&self) -> Message {
        Message::Text(serde_json::to_string(self).unwrap_or_default().into())
    }
}

pub fn topic_for(table: &str) -> String {
    format!("realtime:{}_changes", table)
}

/// Websocket implementation of [`ChangeFeed`]. One socket per subscription.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    url: String,
    access_token: Option<String>,
}

impl RealtimeClient {
    pub fn new(url: String, access_token: Option<String>) -> Self {
        Self { url, access_token }
    }

    pub fn from_client(client: &BackendClient) -> Result<Self, ApiError> {
        Ok(Self::new(
            client.realtime_url()?,
            client.access_token().map(str::to_string),
        ))
    }
}

#[async_trait]
impl ChangeFeed for RealtimeClient {
    async fn subscribe(&self, table: &str, filter: ChangeFilter) -> Result<Subscription, ApiError> {
        let topic = topic_for(table);
        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| convert_ws_error(e, &topic))?;
        let (mut sink, mut stream) = socket.split();

        let join = PhoenixMessage::join(&topic, table, filter, self.access_token.as_deref());
        sink.send(join.to_ws())
            .await
            .map_err(|e| convert_ws_error(e, &topic))?;

        let joined = tokio::time::timeout(
            Duration::from_secs(JOIN_TIMEOUT_SECS),
            wait_for_join(&mut stream, &topic),
        )
        .await
        .map_err(|_| ApiError::Realtime {
            topic: topic.clone(),
            message: format!("no join reply within {}s", JOIN_TIMEOUT_SECS),
        })?;
        joined?;
        log::debug!("Joined realtime channel {}", topic);

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_topic = topic.clone();

        tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
            heartbeat.tick().await;
            let mut heartbeat_ref: u64 = 1;

            let leave = loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break true,
                    _ = heartbeat.tick() => {
                        heartbeat_ref += 1;
                        if sink.send(PhoenixMessage::heartbeat(heartbeat_ref).to_ws()).await.is_err() {
                            log::warn!("Realtime heartbeat failed on {}", task_topic);
                            break false;
                        }
                    }
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let Ok(message) = serde_json::from_str::<PhoenixMessage>(text.as_str()) else {
                                continue;
                            };
                            if message.topic != task_topic {
                                continue;
                            }
                            if let Some(event) = message.change_event() {
                                if tx.send(event).await.is_err() {
                                    break true;
                                }
                            } else if message.event == "phx_error" || message.event == "phx_close" {
                                log::warn!("Realtime channel {} closed by server", task_topic);
                                break false;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break false,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            log::warn!("Realtime socket error on {}: {}", task_topic, e);
                            break false;
                        }
                    }
                }
            };

            if leave {
                let _ = sink.send(PhoenixMessage::leave(&task_topic).to_ws()).await;
                let _ = sink.close().await;
                log::debug!("Left realtime channel {}", task_topic);
            }
        });

        Ok(Subscription::new(topic, rx, cancel))
    }
}

async fn wait_for_join<S>(stream: &mut S, topic: &str) -> Result<(), ApiError>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| convert_ws_error(e, topic))?;
        let Message::Text(text) = frame else {
            continue;
        };
        let Ok(message) = serde_json::from_str::<PhoenixMessage>(text.as_str()) else {
            continue;
        };
        if message.topic != topic {
            continue;
        }
        if let Some(reply) = message.join_reply() {
            return reply.map_err(|message| ApiError::Realtime {
                topic: topic.to_string(),
                message,
            });
        }
    }
    Err(ApiError::Realtime {
        topic: topic.to_string(),
        message: "socket closed before join reply".to_string(),
    })
}
