/// Task identifiers are UUID v7 strings: unique and sortable by creation time.
pub type TaskId = String;

/// Mint a fresh, time-ordered task id.
pub fn new_task_id() -> TaskId {
    uuid::Uuid::now_v7().to_string()
}
