//! Durable work queue plumbing for textq.
//!
//! Provides the AMQP connection manager shared by the API server and the
//! worker, exponential-backoff reconnection, and the [`TaskQueue`]
//! publishing seam with AMQP and in-memory implementations.

pub mod config;
pub mod manager;
pub mod memory;
pub mod publisher;
pub mod reconnect;

pub use config::AmqpConfig;
pub use manager::QueueConnectionManager;
pub use memory::MemoryTaskQueue;
pub use publisher::{AmqpTaskQueue, TaskQueue};

/// Name of the durable work queue shared by submitters and workers.
pub const TASK_QUEUE: &str = "tasks";

/// Errors raised while publishing to the work queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// No usable channel to the broker.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// The broker rejected or failed to confirm the message.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// The descriptor could not be encoded.
    #[error("Task serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
