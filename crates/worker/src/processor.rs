//! Per-message task execution.
//!
//! [`process_message`] takes one delivery body from the work queue and
//! drives the task's status record through `Processing` to `Finished`. It
//! never touches the broker: the caller acks or nacks based on the
//! returned [`Outcome`], and only after this function returns.

use std::str::Utf8Error;

use serde::Deserialize;
use textq_core::operation::do_op;
use textq_core::status::StatusRecord;
use textq_store::{read_record, write_status, StatusStore, StoreError};

/// A delivery body, as raw bytes or already-decoded text.
#[derive(Debug, Clone, Copy)]
pub enum MessageBody<'a> {
    Bytes(&'a [u8]),
    Text(&'a str),
}

impl<'a> MessageBody<'a> {
    pub fn as_text(&self) -> Result<&'a str, Utf8Error> {
        match *self {
            MessageBody::Bytes(bytes) => std::str::from_utf8(bytes),
            MessageBody::Text(text) => Ok(text),
        }
    }
}

impl<'a> From<&'a [u8]> for MessageBody<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        MessageBody::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for MessageBody<'a> {
    fn from(text: &'a str) -> Self {
        MessageBody::Text(text)
    }
}

/// Descriptor as read off the wire. `operation` stays a free string so an
/// unknown name still runs (and yields an empty result).
#[derive(Debug, Deserialize)]
struct WireTask {
    operation: String,
    data: String,
    id: String,
}

/// What the consumer should do with the delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Handled (or already handled): acknowledge.
    Ack,
    /// Poison message with no usable task id: drop without requeue.
    Reject(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// A status read or write failed. The message must be redelivered.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Execute one queued task.
///
/// A task whose record is already terminal is acked without any write.
/// The check and the `Processing` write are separate store calls, so two
/// deliveries of one task running at the same time can both pass the check.
/// Each then writes `Processing` and the same `Finished` result; the record
/// may briefly show `Processing` after the first `Finished`, but always
/// settles on `Finished`. Operations are pure, so the second run is harmless.
pub async fn process_message<'a>(
    store: &dyn StatusStore,
    body: impl Into<MessageBody<'a>>,
) -> Result<Outcome, ProcessError> {
    let text = match body.into().as_text() {
        Ok(text) => text,
        Err(e) => return Ok(Outcome::Reject(format!("body is not UTF-8: {e}"))),
    };

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return Ok(Outcome::Reject(format!("body is not JSON: {e}"))),
    };

    let Some(task_id) = value.get("id").and_then(|id| id.as_str()).map(str::to_owned) else {
        return Ok(Outcome::Reject("body has no string id".into()));
    };

    if let Some(current) = read_record(store, &task_id).await? {
        if current.status.is_terminal() {
            tracing::info!(
                task_id = %task_id,
                status = %current.status,
                "Task already complete, skipping redelivery",
            );
            return Ok(Outcome::Ack);
        }
    }

    let task: WireTask = match serde_json::from_value(value) {
        Ok(task) => task,
        Err(e) => {
            let reason = format!("malformed task descriptor: {e}");
            tracing::warn!(task_id = %task_id, reason = %reason, "Marking task failed");
            write_status(store, &task_id, &StatusRecord::failed(reason)).await?;
            return Ok(Outcome::Ack);
        }
    };

    write_status(store, &task.id, &StatusRecord::processing()).await?;
    tracing::debug!(task_id = %task.id, operation = %task.operation, "Task processing");

    let result = do_op(&task.operation, &task.data);

    write_status(store, &task.id, &StatusRecord::finished(result)).await?;
    tracing::info!(task_id = %task.id, operation = %task.operation, "Task finished");

    Ok(Outcome::Ack)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use textq_core::status::TaskStatus;
    use textq_store::MemoryStore;

    use super::*;

    const PROCESSING: &str = r#"{"status":"Processing","result":""}"#;

    fn finished(result: &str) -> String {
        serde_json::to_string(&StatusRecord::finished(result)).unwrap()
    }

    /// Store that accepts reads and rejects every write.
    struct ReadOnlyStore;

    #[async_trait]
    impl StatusStore for ReadOnlyStore {
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend {
                message: "READONLY".into(),
            })
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn writes_processing_then_finished() {
        let store = MemoryStore::new();
        let body = r#"{"operation":"reverse","data":"abc def","id":"t1"}"#;

        let outcome = process_message(&store, body).await.unwrap();
        assert_eq!(outcome, Outcome::Ack);
        assert_eq!(
            store.history("t1").await,
            vec![PROCESSING.to_string(), finished("fed cba")]
        );
    }

    #[tokio::test]
    async fn accepts_byte_and_text_bodies_alike() {
        let bytes_store = MemoryStore::new();
        let text_store = MemoryStore::new();
        let body = r#"{"operation":"count_words","data":"one two three","id":"t1"}"#;

        process_message(&bytes_store, body.as_bytes()).await.unwrap();
        process_message(&text_store, body).await.unwrap();

        assert_eq!(bytes_store.history("t1").await, text_store.history("t1").await);
        assert_eq!(
            read_record(&bytes_store, "t1").await.unwrap(),
            Some(StatusRecord::finished("3"))
        );
    }

    #[tokio::test]
    async fn operation_names_match_case_insensitively() {
        let store = MemoryStore::new();
        let body = r#"{"operation":"UpperCase","data":"shout","id":"t1"}"#;

        process_message(&store, body).await.unwrap();
        assert_eq!(
            read_record(&store, "t1").await.unwrap(),
            Some(StatusRecord::finished("SHOUT"))
        );
    }

    #[tokio::test]
    async fn unknown_operation_finishes_with_empty_result() {
        let store = MemoryStore::new();
        let body = r#"{"operation":"rot13","data":"abc","id":"t1"}"#;

        let outcome = process_message(&store, body).await.unwrap();
        assert_eq!(outcome, Outcome::Ack);
        assert_eq!(
            read_record(&store, "t1").await.unwrap(),
            Some(StatusRecord::finished(""))
        );
    }

    #[tokio::test]
    async fn redelivery_while_processing_reaches_same_result() {
        let store = MemoryStore::new();
        let body = r#"{"operation":"reverse","data":"abc","id":"t1"}"#;
        write_status(&store, "t1", &StatusRecord::processing())
            .await
            .unwrap();

        process_message(&store, body).await.unwrap();
        assert_eq!(
            read_record(&store, "t1").await.unwrap(),
            Some(StatusRecord::finished("cba"))
        );
    }

    #[tokio::test]
    async fn redelivery_of_finished_task_writes_nothing() {
        let store = MemoryStore::new();
        let body = r#"{"operation":"reverse","data":"abc","id":"t1"}"#;

        process_message(&store, body).await.unwrap();
        let before = store.history("t1").await;

        let outcome = process_message(&store, body).await.unwrap();
        assert_eq!(outcome, Outcome::Ack);
        assert_eq!(store.history("t1").await, before);
    }

    #[tokio::test]
    async fn redelivery_of_failed_task_is_not_reopened() {
        let store = MemoryStore::new();
        write_status(&store, "t1", &StatusRecord::failed("boom"))
            .await
            .unwrap();

        let body = r#"{"operation":"reverse","data":"abc","id":"t1"}"#;
        process_message(&store, body).await.unwrap();

        let record = read_record(&store, "t1").await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(store.history("t1").await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_deliveries_settle_on_finished() {
        let store = MemoryStore::new();
        let body = r#"{"operation":"reverse","data":"abc","id":"t1"}"#;

        let (first, second) =
            tokio::join!(process_message(&store, body), process_message(&store, body));
        assert_eq!(first.unwrap(), Outcome::Ack);
        assert_eq!(second.unwrap(), Outcome::Ack);

        assert_eq!(
            read_record(&store, "t1").await.unwrap(),
            Some(StatusRecord::finished("cba"))
        );
        assert_eq!(store.history("t1").await.last(), Some(&finished("cba")));
    }

    #[tokio::test]
    async fn poison_messages_are_rejected_without_writes() {
        let store = MemoryStore::new();

        let invalid_utf8: &[u8] = &[0xff, 0xfe, 0xfd];
        assert_matches!(
            process_message(&store, invalid_utf8).await,
            Ok(Outcome::Reject(_))
        );
        assert_matches!(
            process_message(&store, "not json").await,
            Ok(Outcome::Reject(_))
        );
        assert_matches!(
            process_message(&store, r#"{"operation":"reverse","data":"x"}"#).await,
            Ok(Outcome::Reject(_))
        );
        assert_matches!(
            process_message(&store, r#"{"operation":"reverse","data":"x","id":7}"#).await,
            Ok(Outcome::Reject(_))
        );

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_descriptor_with_id_is_marked_failed() {
        let store = MemoryStore::new();
        let body = r#"{"operation":"reverse","id":"t1"}"#;

        let outcome = process_message(&store, body).await.unwrap();
        assert_eq!(outcome, Outcome::Ack);

        let record = read_record(&store, "t1").await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.result.contains("data"), "reason names the missing field");
    }

    #[tokio::test]
    async fn store_failure_is_an_error() {
        let body = r#"{"operation":"reverse","data":"abc","id":"t1"}"#;
        let result = process_message(&ReadOnlyStore, body).await;
        assert_matches!(result, Err(ProcessError::Store(_)));
    }
}
