//! In-process [`TaskQueue`] for tests and single-process runs.
//!
//! Messages are stored as serialized bodies, exactly as a worker would
//! receive them from the broker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use textq_core::task::TaskDescriptor;
use tokio::sync::Mutex;

use crate::publisher::TaskQueue;
use crate::QueueError;

#[derive(Debug)]
pub struct MemoryTaskQueue {
    messages: Mutex<VecDeque<Vec<u8>>>,
    available: AtomicBool,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the broker going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Take the oldest message body, if any.
    pub async fn pop(&self) -> Option<Vec<u8>> {
        self.messages.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

impl Default for MemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn publish(&self, task: &TaskDescriptor) -> Result<(), QueueError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("memory queue disabled".into()));
        }
        let body = task.to_body()?;
        self.messages.lock().await.push_back(body);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use textq_core::operation::Operation;
    use textq_core::task::SubmitTask;

    use super::*;

    fn descriptor(id: &str) -> TaskDescriptor {
        TaskDescriptor::new(id.into(), SubmitTask::new(Operation::Reverse, "abc"))
    }

    #[tokio::test]
    async fn publish_then_pop_is_fifo() {
        let queue = MemoryTaskQueue::new();
        queue.publish(&descriptor("a")).await.unwrap();
        queue.publish(&descriptor("b")).await.unwrap();
        assert_eq!(queue.len().await, 2);

        let first: serde_json::Value = serde_json::from_slice(&queue.pop().await.unwrap()).unwrap();
        assert_eq!(first["id"], "a");
        let second: serde_json::Value = serde_json::from_slice(&queue.pop().await.unwrap()).unwrap();
        assert_eq!(second["id"], "b");
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn unavailable_queue_rejects_publish() {
        let queue = MemoryTaskQueue::new();
        queue.set_available(false);

        assert_matches!(
            queue.publish(&descriptor("a")).await,
            Err(QueueError::Unavailable(_))
        );
        assert!(!queue.is_connected().await);
        assert!(queue.is_empty().await);
    }
}
