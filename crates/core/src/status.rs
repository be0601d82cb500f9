//! Per-task status record kept in the status store.
//!
//! Stored as a JSON string `{"status": "Queued", "result": ""}` under the
//! task id. Every write replaces the whole value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
///
/// Legal transitions: `Queued -> Processing -> Finished`, and `Queued` or
/// `Processing` to `Failed`. Re-writing the current state is allowed so that
/// redelivered messages stay idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Queued,
    Processing,
    Finished,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "Queued",
            TaskStatus::Processing => "Processing",
            TaskStatus::Finished => "Finished",
            TaskStatus::Failed => "Failed",
        }
    }

    /// Terminal states are never overwritten by the worker.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Failed)
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Queued, Processing) | (Queued, Failed) => true,
            (Processing, Finished) | (Processing, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value stored for each task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: TaskStatus,
    pub result: String,
}

impl StatusRecord {
    pub fn queued() -> Self {
        Self {
            status: TaskStatus::Queued,
            result: String::new(),
        }
    }

    pub fn processing() -> Self {
        Self {
            status: TaskStatus::Processing,
            result: String::new(),
        }
    }

    pub fn finished(result: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Finished,
            result: result.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            result: reason.into(),
        }
    }
}

/// What a poller sees for a stored value.
///
/// Values that do not decode as a [`StatusRecord`] are surfaced as-is
/// instead of failing the poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusView {
    Record(StatusRecord),
    /// JSON with string `status`/`result` fields, where `status` is not one
    /// of the known states (written by some other producer).
    Foreign { status: String, result: String },
    /// Anything that is not such a JSON object.
    Raw(String),
}

/// Same shape as [`StatusRecord`] but with a free-form status.
#[derive(Deserialize)]
struct LooseRecord {
    status: String,
    #[serde(default)]
    result: String,
}

impl StatusView {
    /// Decode a raw stored value.
    pub fn from_stored(value: String) -> Self {
        if let Ok(record) = serde_json::from_str::<StatusRecord>(&value) {
            return StatusView::Record(record);
        }
        match serde_json::from_str::<LooseRecord>(&value) {
            Ok(loose) => StatusView::Foreign {
                status: loose.status,
                result: loose.result,
            },
            Err(_) => StatusView::Raw(value),
        }
    }

    /// `(status, result)` as strings, ready for a response body.
    pub fn into_parts(self) -> (String, String) {
        match self {
            StatusView::Record(record) => (record.status.as_str().to_string(), record.result),
            StatusView::Foreign { status, result } => (status, result),
            StatusView::Raw(raw) => (raw, String::new()),
        }
    }

    /// The decoded status, if the value was a well-formed record.
    pub fn status(&self) -> Option<TaskStatus> {
        match self {
            StatusView::Record(record) => Some(record.status),
            StatusView::Foreign { .. } | StatusView::Raw(_) => None,
        }
    }
}
