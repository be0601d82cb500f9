use std::sync::Arc;

use textq_queue::TaskQueue;
use textq_store::StatusStore;

use crate::config::ServerConfig;
use crate::submitter::TaskSubmitter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Status store, read by the polling endpoint.
    pub store: Arc<dyn StatusStore>,
    /// Work queue, consulted by the health endpoint.
    pub queue: Arc<dyn TaskQueue>,
    /// Writes the initial status and publishes new tasks.
    pub submitter: Arc<TaskSubmitter>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn StatusStore>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        let submitter = Arc::new(TaskSubmitter::new(Arc::clone(&store), Arc::clone(&queue)));
        Self {
            config: Arc::new(config),
            store,
            queue,
            submitter,
        }
    }
}
