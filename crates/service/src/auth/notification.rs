//! Mailing-queue side effects: login alerts and reset links.
//!
//! The queue consumer renders and sends the mail; this side only publishes JSON envelopes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum NotificationEvent {
    LoginAlert {
        to: String,
        user_info: String,
        timestamp: DateTime<Utc>,
    },
    ForgetPassword {
        to: String,
        session: String,
        username: String,
    },
}

impl NotificationEvent {
    pub fn action(&self) -> &'static str {
        match self {
            NotificationEvent::LoginAlert { .. } => "login_alert",
            NotificationEvent::ForgetPassword { .. } => "forget_password",
        }
    }
}

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn publish(&self, payload: &[u8]) -> Result<(), ServiceError>;
}

/// AMQP publisher with a lazily opened connection.
///
/// The slot lock is held only while a channel is looked up or opened, so reconnects are
/// single-flight. Publishing runs on a cloned channel. Every call is bounded by `timeout`, lock
/// wait included; a failed publish empties the slot so the next call reconnects.
pub struct AmqpTransport {
    url: String,
    queue: String,
    timeout: Duration,
    slot: tokio::sync::Mutex<Option<(Connection, Channel)>>,
}

impl AmqpTransport {
    pub fn new(url: impl Into<String>, queue: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), queue: queue.into(), timeout, slot: tokio::sync::Mutex::new(None) }
    }

    async fn open(&self) -> Result<(Connection, Channel), ServiceError> {
        let conn = Connection::connect(&self.url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;
        channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions { durable: false, auto_delete: true, ..QueueDeclareOptions::default() },
                FieldTable::default(),
            )
            .await?;
        debug!(queue = %self.queue, "amqp channel opened");
        Ok((conn, channel))
    }

    async fn channel(&self) -> Result<Channel, ServiceError> {
        let mut slot = self.slot.lock().await;
        if let Some((_, ch)) = slot.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }
        let (conn, channel) = self.open().await?;
        *slot = Some((conn, channel.clone()));
        Ok(channel)
    }

    async fn reset(&self) {
        *self.slot.lock().await = None;
    }
}

#[async_trait]
impl NotificationTransport for AmqpTransport {
    async fn publish(&self, payload: &[u8]) -> Result<(), ServiceError> {
        let channel = timeout(self.timeout, self.channel())
            .await
            .map_err(|_| ServiceError::Transport("amqp connect timed out".into()))??;

        let published = timeout(self.timeout, async {
            channel
                .basic_publish("", &self.queue, BasicPublishOptions::default(), payload, BasicProperties::default())
                .await?
                .await?;
            Ok::<_, lapin::Error>(())
        })
        .await;

        match published {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.reset().await;
                Err(e.into())
            }
            Err(_) => {
                self.reset().await;
                Err(ServiceError::Transport("amqp publish timed out".into()))
            }
        }
    }
}

/// Records published payloads; can be told to fail.
#[derive(Default)]
pub struct MemoryTransport {
    published: Mutex<Vec<Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryTransport {
    pub fn set_failing(&self, failing: bool) { self.failing.store(failing, Ordering::SeqCst); }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.published
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter_map(|raw| serde_json::from_slice(raw).ok())
            .collect()
    }
}

#[async_trait]
impl NotificationTransport for MemoryTransport {
    async fn publish(&self, payload: &[u8]) -> Result<(), ServiceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::Transport("queue unavailable".into()));
        }
        self.published.lock().unwrap_or_else(|p| p.into_inner()).push(payload.to_vec());
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn NotificationTransport>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self { Self { transport } }

    /// Publish and wait for the broker to accept it.
    pub async fn send(&self, event: &NotificationEvent) -> Result<(), ServiceError> {
        let payload = serde_json::to_vec(event)?;
        self.transport.publish(&payload).await
    }

    /// Fire and forget; failures are only logged.
    pub fn spawn(&self, event: NotificationEvent) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.send(&event).await {
                warn!(action = event.action(), error = %e, "notification_failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelopes_match_the_queue_contract() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let login = NotificationEvent::LoginAlert { to: "a@b.co".into(), user_info: "Unknown".into(), timestamp: ts };
        assert_eq!(
            serde_json::to_value(&login).unwrap(),
            json!({"action": "login_alert", "payload": {"to": "a@b.co", "user_info": "Unknown", "timestamp": "2023-11-14T22:13:20Z"}})
        );

        let reset = NotificationEvent::ForgetPassword { to: "a@b.co".into(), session: "s".into(), username: "alice".into() };
        assert_eq!(
            serde_json::to_value(&reset).unwrap(),
            json!({"action": "forget_password", "payload": {"to": "a@b.co", "session": "s", "username": "alice"}})
        );
    }

    #[tokio::test]
    async fn send_surfaces_failures_and_spawn_swallows_them() {
        let transport = Arc::new(MemoryTransport::default());
        let dispatcher = NotificationDispatcher::new(transport.clone());
        let event = NotificationEvent::ForgetPassword { to: "a@b.co".into(), session: "s".into(), username: "alice".into() };

        dispatcher.send(&event).await.unwrap();
        assert_eq!(transport.events(), vec![event.clone()]);

        transport.set_failing(true);
        assert!(dispatcher.send(&event).await.is_err());
        dispatcher.spawn(event).await.unwrap();
        assert_eq!(transport.events().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn silent_broker_times_out_without_stalling_other_publishes() {
        // accepts TCP and never speaks AMQP
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let holder = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((sock, _)) = listener.accept().await {
                held.push(sock);
            }
        });

        let transport = AmqpTransport::new(format!("amqp://{addr}/%2f"), "mailing_queue", Duration::from_millis(200));
        let started = std::time::Instant::now();
        let (first, second) = tokio::join!(transport.publish(b"{}"), transport.publish(b"{}"));

        assert!(first.is_err());
        assert!(second.is_err());
        assert!(started.elapsed() < Duration::from_secs(3), "publishes hung for {:?}", started.elapsed());
        holder.abort();
    }
}
