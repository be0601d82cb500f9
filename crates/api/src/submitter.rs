//! Task submission: record the task as queued, then publish it.
//!
//! The `Queued` status write always completes before the descriptor is
//! published, so a client polling right after submission never sees "not
//! found" for a task that exists. If the store write fails nothing is
//! published. If publishing fails the submission fails and the record is
//! moved to `Failed`.

use std::sync::Arc;

use serde::Serialize;
use textq_core::status::{StatusRecord, TaskStatus};
use textq_core::task::{SubmitTask, TaskDescriptor};
use textq_core::types::{new_task_id, TaskId};
use textq_queue::{QueueError, TaskQueue};
use textq_store::{write_status, StatusStore, StoreError};

/// Result stored for a task whose descriptor never reached the queue.
pub const ENQUEUE_FAILED_REASON: &str = "task could not be enqueued";

/// Returned to the client after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedTask {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct TaskSubmitter {
    store: Arc<dyn StatusStore>,
    queue: Arc<dyn TaskQueue>,
}

impl TaskSubmitter {
    pub fn new(store: Arc<dyn StatusStore>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { store, queue }
    }

    /// Submit a validated task.
    pub async fn submit(&self, task: SubmitTask) -> Result<SubmittedTask, SubmitError> {
        let task_id = new_task_id();

        write_status(self.store.as_ref(), &task_id, &StatusRecord::queued()).await?;

        let descriptor = TaskDescriptor::new(task_id.clone(), task);
        if let Err(e) = self.queue.publish(&descriptor).await {
            tracing::error!(task_id = %task_id, error = %e, "Failed to enqueue task");

            let failed = StatusRecord::failed(ENQUEUE_FAILED_REASON);
            if let Err(store_err) = write_status(self.store.as_ref(), &task_id, &failed).await {
                tracing::warn!(
                    task_id = %task_id,
                    error = %store_err,
                    "Could not mark unenqueued task as failed",
                );
            }
            return Err(SubmitError::Queue(e));
        }

        tracing::info!(
            task_id = %task_id,
            operation = %descriptor.operation(),
            "Task submitted",
        );

        Ok(SubmittedTask {
            task_id,
            status: TaskStatus::Queued,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
