//! Route definitions for task submission and polling.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Task routes, mounted at the root.
///
/// ```text
/// POST   /submit-task        -> submit_task (requires auth)
/// GET    /task/{task_id}     -> get_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit-task", post(tasks::submit_task))
        .route("/task/{task_id}", get(tasks::get_task))
}
