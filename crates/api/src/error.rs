use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use textq_core::error::CoreError;
use textq_queue::QueueError;
use textq_store::StoreError;

use crate::submitter::SubmitError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds infrastructure and
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `textq_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Submission could not be recorded or enqueued.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// The status store failed while serving a read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A malformed request body (bad JSON syntax, wrong content type).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A well-formed body whose fields do not match the schema, such as an
    /// unknown operation name.
    #[error("Unprocessable request: {0}")]
    Unprocessable(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
            },

            // --- Infrastructure errors ---
            AppError::Submit(SubmitError::Store(err)) | AppError::Store(err) => {
                tracing::error!(error = %err, "Status store error");
                unavailable("STORE_UNAVAILABLE")
            }
            AppError::Submit(SubmitError::Queue(err)) => match err {
                QueueError::Unavailable(_) | QueueError::Publish(_) => {
                    tracing::error!(error = %err, "Work queue error");
                    unavailable("QUEUE_UNAVAILABLE")
                }
                QueueError::Serialization(_) => {
                    tracing::error!(error = %err, "Task serialization error");
                    internal()
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn unavailable(code: &'static str) -> (StatusCode, &'static str, String) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        code,
        "A backing service is temporarily unavailable".to_string(),
    )
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
