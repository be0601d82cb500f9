//! Redis-backed [`StatusStore`].
//!
//! Each task maps to one string key holding the JSON status value, written
//! with a single `SET` so readers never observe a partial record. The
//! connection is a [`ConnectionManager`], which multiplexes commands over
//! one TCP connection and reconnects on its own after a drop.

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;

use crate::{StatusStore, StoreError};

/// Default Redis URL for local development.
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Redis connection settings.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// Prepended to every task id (`{prefix}{task_id}`). Empty by default.
    pub key_prefix: String,
}

impl RedisConfig {
    /// Load from the environment.
    ///
    /// | Env Var             | Default                  |
    /// |---------------------|--------------------------|
    /// | `REDIS_URL`         | `redis://localhost:6379` |
    /// | `STATUS_KEY_PREFIX` | (empty)                  |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.into()),
            key_prefix: std::env::var("STATUS_KEY_PREFIX").unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisStore {
    /// Connect to Redis. Fails fast if the server cannot be reached.
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(config.url.as_str())
            .map_err(|e| backend_error("failed to create Redis client", e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| backend_error("failed to connect to Redis", e))?;

        tracing::info!(url = %config.url, "Connected to Redis status store");

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, task_id: &str) -> String {
        format!("{}{}", self.key_prefix, task_id)
    }
}

fn backend_error(context: &str, err: ::redis::RedisError) -> StoreError {
    StoreError::Backend {
        message: format!("{context}: {err}"),
    }
}

#[async_trait]
impl StatusStore for RedisStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.key(key), value)
            .await
            .map_err(|e| backend_error("SET failed", e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(self.key(key))
            .await
            .map_err(|e| backend_error("GET failed", e))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        ::redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| backend_error("PING failed", e))
    }
}
