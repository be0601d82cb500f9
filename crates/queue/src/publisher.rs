//! Publishing task descriptors to the durable work queue.

use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::BasicProperties;
use textq_core::task::TaskDescriptor;

use crate::manager::QueueConnectionManager;
use crate::{QueueError, TASK_QUEUE};

/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT: u8 = 2;

/// Destination for submitted tasks.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Publish one descriptor. Returns only after the broker has accepted it.
    async fn publish(&self, task: &TaskDescriptor) -> Result<(), QueueError>;

    /// Whether the queue currently has a live connection.
    async fn is_connected(&self) -> bool;
}

/// [`TaskQueue`] that publishes persistent messages over AMQP.
pub struct AmqpTaskQueue {
    manager: Arc<QueueConnectionManager>,
}

impl AmqpTaskQueue {
    pub fn new(manager: Arc<QueueConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl TaskQueue for AmqpTaskQueue {
    async fn publish(&self, task: &TaskDescriptor) -> Result<(), QueueError> {
        let body = task.to_body()?;

        let channel = self
            .manager
            .get_channel()
            .await
            .ok_or_else(|| QueueError::Unavailable("no channel to broker".into()))?;

        let confirmation = channel
            .basic_publish(
                "",
                TASK_QUEUE,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(PERSISTENT)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| QueueError::Publish(e.to_string()))?
            .await
            .map_err(|e| QueueError::Publish(e.to_string()))?;

        if confirmation.is_nack() {
            return Err(QueueError::Publish("broker nacked the message".into()));
        }

        tracing::debug!(task_id = task.id(), queue = TASK_QUEUE, "Task published");
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.manager.is_connected().await
    }
}
