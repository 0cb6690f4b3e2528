//! Request extractors for caller identity.
//!
//! The upstream auth layer puts the authenticated user in `x-user-id`.
//! Player routes are refused while the game is paused. Grader routes
//! check `x-grader-token` against the configured token and stay open
//! during a pause.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use bermudia_db::GameStore;
use bermudia_types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// Header carrying the grader token.
pub const GRADER_HEADER: &str = "x-grader-token";

/// The player making the request, admitted only while the game runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

/// Parse a user id as sent in a header or query string.
pub fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map(UserId)
        .map_err(|e| ApiError::BadRequest(format!("invalid user id {raw:?}: {e}")))
}

impl<S: GameStore> FromRequestParts<Arc<AppState<S>>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| ApiError::BadRequest(format!("missing {USER_HEADER} header")))?
            .to_str()
            .map_err(|e| ApiError::BadRequest(format!("unreadable {USER_HEADER} header: {e}")))?;
        let user = parse_user(raw)?;
        state.service.ensure_running().await?;
        Ok(Self(user))
    }
}

/// Proof that the request came from a grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grader;

impl<S: Send + Sync> FromRequestParts<Arc<AppState<S>>> for Grader {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.grader_token.as_deref() else {
            return Ok(Self);
        };
        let presented = parts
            .headers
            .get(GRADER_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented == Some(expected) {
            Ok(Self)
        } else {
            Err(ApiError::Unauthorized(format!(
                "missing or wrong {GRADER_HEADER} header"
            )))
        }
    }
}
