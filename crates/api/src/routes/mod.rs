pub mod health;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the full route tree.
///
/// ```text
/// /health                  service health (public)
/// /submit-task             submit a task (requires auth)
/// /task/{task_id}          poll a task (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(tasks::router())
}
