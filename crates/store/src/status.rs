//! Typed status helpers layered over [`StatusStore`].

use textq_core::status::{StatusRecord, StatusView};

use crate::{StatusStore, StoreError};

/// Overwrite the status record for `task_id`.
pub async fn write_status(
    store: &dyn StatusStore,
    task_id: &str,
    record: &StatusRecord,
) -> Result<(), StoreError> {
    let value = serde_json::to_string(record)?;
    store.set(task_id, &value).await?;
    tracing::debug!(task_id, status = %record.status, "Status written");
    Ok(())
}

/// Read the status for `task_id` as a poller sees it.
///
/// Returns `None` if no record exists or the stored value is empty. Stored
/// values that are not status JSON come back as [`StatusView::Raw`].
pub async fn read_status(
    store: &dyn StatusStore,
    task_id: &str,
) -> Result<Option<StatusView>, StoreError> {
    Ok(store
        .get(task_id)
        .await?
        .filter(|value| !value.is_empty())
        .map(StatusView::from_stored))
}

/// Read the decoded record for `task_id`, ignoring undecodable values.
pub async fn read_record(
    store: &dyn StatusStore,
    task_id: &str,
) -> Result<Option<StatusRecord>, StoreError> {
    Ok(match read_status(store, task_id).await? {
        Some(StatusView::Record(record)) => Some(record),
        Some(view) => {
            let (status, _) = view.into_parts();
            tracing::warn!(task_id, status = %status, "Stored status is not a valid record");
            None
        }
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use textq_core::status::TaskStatus;

    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = MemoryStore::new();
        write_status(&store, "t1", &StatusRecord::finished("ABC"))
            .await
            .unwrap();

        let record = read_record(&store, "t1").await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Finished);
        assert_eq!(record.result, "ABC");

        let raw = store.get("t1").await.unwrap().unwrap();
        assert_eq!(raw, r#"{"status":"Finished","result":"ABC"}"#);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = MemoryStore::new();
        assert!(read_status(&store, "nope").await.unwrap().is_none());
        assert!(read_record(&store, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn raw_value_is_surfaced_by_read_status_only() {
        let store = MemoryStore::new();
        store.set("999", "example").await.unwrap();

        let view = read_status(&store, "999").await.unwrap().unwrap();
        assert_eq!(view, StatusView::Raw("example".into()));
        assert!(read_record(&store, "999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_value_reads_as_missing() {
        let store = MemoryStore::new();
        store.set("blank", "").await.unwrap();

        assert!(read_status(&store, "blank").await.unwrap().is_none());
    }
}
