//! Lazily (re)connecting AMQP connection manager.
//!
//! [`QueueConnectionManager`] owns at most one broker connection and one
//! channel. It is built once per process, shared as an `Arc`, and closed
//! on shutdown. Callers ask for a channel with
//! [`get_channel`](QueueConnectionManager::get_channel); if the cached one
//! has gone away the manager reconnects under a mutex, so concurrent
//! callers never open duplicate connections.
//!
//! Connection failures are logged and reported as `None`, never raised.

use lapin::options::{ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;

use crate::config::AmqpConfig;
use crate::TASK_QUEUE;

/// AMQP reply code for a normal close.
const REPLY_SUCCESS: u16 = 200;

/// Shared handle to the durable work queue broker.
pub struct QueueConnectionManager {
    config: AmqpConfig,
    link: Mutex<Option<Link>>,
}

/// A live connection with its single channel.
struct Link {
    connection: Connection,
    channel: Channel,
}

impl Link {
    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }
}

impl QueueConnectionManager {
    /// Create a manager without connecting. The first
    /// [`get_channel`](Self::get_channel) call opens the connection.
    pub fn new(config: AmqpConfig) -> Self {
        Self {
            config,
            link: Mutex::new(None),
        }
    }

    /// Create a manager and make one eager connection attempt.
    ///
    /// A failed attempt is logged; the manager keeps retrying lazily.
    pub async fn start(config: AmqpConfig) -> Self {
        let manager = Self::new(config);
        if manager.get_channel().await.is_none() {
            tracing::warn!(
                uri = %manager.config.redacted_uri(),
                "Broker unavailable at startup, will retry on demand",
            );
        }
        manager
    }

    /// Return an open channel, reconnecting if needed.
    ///
    /// On every successful (re)connect the durable work queue is declared
    /// and publisher confirms are enabled on the channel.
    pub async fn get_channel(&self) -> Option<Channel> {
        let mut link = self.link.lock().await;

        if let Some(current) = link.as_ref() {
            if current.is_open() {
                return Some(current.channel.clone());
            }
            tracing::warn!("AMQP channel closed, reconnecting");
        }

        if let Some(stale) = link.take() {
            // Best effort; the broker side is usually already gone.
            let _ = stale.connection.close(REPLY_SUCCESS, "reconnecting").await;
        }

        match self.connect().await {
            Ok(fresh) => {
                let channel = fresh.channel.clone();
                *link = Some(fresh);
                Some(channel)
            }
            Err(e) => {
                tracing::warn!(
                    uri = %self.config.redacted_uri(),
                    error = %e,
                    "Failed to connect to AMQP broker",
                );
                None
            }
        }
    }

    /// Whether a live channel is currently cached. Does not reconnect.
    ///
    /// Reports `false` while another caller holds the lock to reconnect,
    /// so health checks never wait out a connect timeout.
    pub async fn is_connected(&self) -> bool {
        match self.link.try_lock() {
            Ok(link) => link.as_ref().is_some_and(Link::is_open),
            Err(_) => false,
        }
    }

    /// Close the channel and connection, if any.
    pub async fn close(&self) {
        let Some(link) = self.link.lock().await.take() else {
            return;
        };

        if let Err(e) = link.channel.close(REPLY_SUCCESS, "shutdown").await {
            tracing::debug!(error = %e, "Channel close failed");
        }
        if let Err(e) = link.connection.close(REPLY_SUCCESS, "shutdown").await {
            tracing::debug!(error = %e, "Connection close failed");
        }
        tracing::info!("AMQP connection closed");
    }

    async fn connect(&self) -> Result<Link, ConnectError> {
        let properties = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);
        let connection = tokio::time::timeout(
            self.config.connect_timeout,
            Connection::connect_uri(self.config.amqp_uri(), properties),
        )
        .await
        .map_err(|_| ConnectError::Timeout(self.config.connect_timeout.as_secs()))??;

        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        channel
            .queue_declare(
                TASK_QUEUE,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        tracing::info!(
            uri = %self.config.redacted_uri(),
            queue = TASK_QUEUE,
            "AMQP connection established",
        );

        Ok(Link {
            connection,
            channel,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum ConnectError {
    #[error("connect timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Amqp(#[from] lapin::Error),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn unreachable_config() -> AmqpConfig {
        AmqpConfig {
            host: "127.0.0.1".into(),
            port: 1,
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unreachable_broker_yields_none() {
        let manager = QueueConnectionManager::new(unreachable_config());
        assert!(manager.get_channel().await.is_none());
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn is_connected_does_not_wait_for_a_reconnect() {
        let manager = QueueConnectionManager::new(unreachable_config());
        let _reconnecting = manager.link.lock().await;

        let connected = tokio::time::timeout(Duration::from_millis(100), manager.is_connected())
            .await
            .expect("is_connected must not block on the link lock");
        assert!(!connected);
    }

    #[tokio::test]
    async fn close_without_connection_is_noop() {
        let manager = QueueConnectionManager::new(unreachable_config());
        manager.close().await;
        assert!(!manager.is_connected().await);
    }
}
