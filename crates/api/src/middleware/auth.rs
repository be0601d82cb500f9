//! Caller authentication for task submission.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use textq_core::error::CoreError;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Whoever presented a valid access token with a submission.
///
/// Only the token subject is kept; it is logged next to the new task id.
#[derive(Debug, Clone)]
pub struct Submitter {
    pub subject: String,
}

impl FromRequestParts<AppState> for Submitter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).map_err(CoreError::Unauthorized)?;

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| CoreError::Unauthorized("Invalid or expired token".into()))?;

        Ok(Submitter {
            subject: claims.sub,
        })
    }
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// The scheme name is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, String> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Authorization header is not valid ASCII")?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or("Expected: Bearer <token>")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(format!("Unsupported authorization scheme: {scheme}"));
    }

    match token.trim() {
        "" => Err("Empty bearer token".into()),
        token => Ok(token),
    }
}
