//! Task submission input and the descriptor published to the work queue.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::operation::Operation;
use crate::types::TaskId;

/// Upper bound on `data` accepted at submission time (64 KiB).
pub const MAX_TASK_DATA_LEN: usize = 64 * 1024;

/// Body of a task submission: which transform to run, on what text.
///
/// `operation` deserializes strictly, so unknown names are rejected before
/// any store or queue write happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTask {
    pub operation: Operation,
    pub data: String,
}

impl SubmitTask {
    pub fn new(operation: Operation, data: impl Into<String>) -> Self {
        Self {
            operation,
            data: data.into(),
        }
    }

    /// Check limits that serde cannot express.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.data.len() > MAX_TASK_DATA_LEN {
            return Err(CoreError::Validation(format!(
                "data exceeds {MAX_TASK_DATA_LEN} bytes"
            )));
        }
        Ok(())
    }
}

/// One unit of work as carried on the durable queue.
///
/// Serialized as `{"operation": .., "data": .., "id": ..}`. Built once by
/// the submitter and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    operation: Operation,
    data: String,
    id: TaskId,
}

impl TaskDescriptor {
    pub fn new(id: TaskId, task: SubmitTask) -> Self {
        Self {
            operation: task.operation,
            data: task.data,
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Serialize to the JSON message body.
    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn descriptor_wire_format() {
        let descriptor = TaskDescriptor::new(
            "0190a1b2-0000-7000-8000-000000000000".into(),
            SubmitTask::new(Operation::CountWords, "one two"),
        );
        let body = descriptor.to_body().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["operation"], "count_words");
        assert_eq!(json["data"], "one two");
        assert_eq!(json["id"], "0190a1b2-0000-7000-8000-000000000000");
    }

    #[test]
    fn submit_rejects_unknown_operation() {
        let result = serde_json::from_str::<SubmitTask>(r#"{"operation":"shout","data":"x"}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<SubmitTask>(r#"{"operation":1,"data":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn submit_validates_data_length() {
        let ok = SubmitTask::new(Operation::Reverse, "a".repeat(MAX_TASK_DATA_LEN));
        assert!(ok.validate().is_ok());

        let too_long = SubmitTask::new(Operation::Reverse, "a".repeat(MAX_TASK_DATA_LEN + 1));
        assert_matches!(too_long.validate(), Err(CoreError::Validation(_)));
    }
}
