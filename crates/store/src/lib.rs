//! Status store access for textq.
//!
//! [`StatusStore`] is a plain string key-value contract (`set` / `get`).
//! Backends know nothing about task semantics; the typed helpers in
//! [`status`] serialize [`StatusRecord`](textq_core::status::StatusRecord)s
//! on top of it.
//!
//! - [`redis::RedisStore`] -- production backend (`SET` / `GET`).
//! - [`memory::MemoryStore`] -- in-process backend for tests and local runs.

use async_trait::async_trait;

pub mod memory;
pub mod redis;
pub mod status;

pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use status::{read_record, read_status, write_status};

/// Errors raised by status store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the command.
    #[error("Status store error: {message}")]
    Backend { message: String },

    /// A record could not be encoded to JSON.
    #[error("Status serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shared key-value store holding one JSON status value per task id.
///
/// Every `set` replaces the full value; there are no partial updates.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Returns `None` when no value exists for `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Round-trip check used by health endpoints and startup.
    async fn ping(&self) -> Result<(), StoreError>;
}
