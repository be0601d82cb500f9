//! Handlers for task submission and status polling.
//!
//! Submission requires authentication via [`Submitter`]. Polling is public:
//! task ids are unguessable UUIDs handed out only to the submitter.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use textq_core::task::SubmitTask;
use textq_store::read_status;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::Submitter;
use crate::state::AppState;

/// Body returned while polling a task.
#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub status: String,
    pub result: String,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /submit-task
///
/// Record a new task as `Queued`, publish it and return 201 with its id.
/// Unknown operations and ill-typed bodies are rejected with 422 before
/// anything is written.
pub async fn submit_task(
    caller: Submitter,
    State(state): State<AppState>,
    payload: Result<Json<SubmitTask>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload.map_err(reject_body)?;
    input.validate()?;

    let submitted = state.submitter.submit(input).await?;

    tracing::info!(
        task_id = %submitted.task_id,
        subject = %caller.subject,
        "Task accepted",
    );

    Ok((StatusCode::CREATED, Json(submitted)))
}

fn reject_body(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => AppError::BadRequest(rejection.body_text()),
        other => AppError::Unprocessable(other.body_text()),
    }
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// GET /task/{task_id}
///
/// 204 with an empty body when nothing is stored under `task_id`, otherwise
/// 200 with the current status and result.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Response> {
    let Some(view) = read_status(state.store.as_ref(), &task_id).await? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let (status, result) = view.into_parts();
    Ok(Json(TaskStatusResponse { status, result }).into_response())
}
