//! Error types for the player API.
//!
//! [`ApiError`] wraps every [`ActionError`] plus the failures that only
//! exist at the HTTP edge (missing identity, bad tokens, malformed input)
//! and converts them into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use bermudia_core::{ActionError, ErrorKind};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A service action failed.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The request was malformed or missing a required header.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A grader route was called without the right token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl ApiError {
    /// HTTP status for the error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Action(err) => match err.kind() {
                ErrorKind::RuleViolation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict | ErrorKind::FenceRejected => StatusCode::CONFLICT,
                ErrorKind::Paused => StatusCode::LOCKED,
                ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Wire name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Action(err) => err.kind().as_str(),
            Self::BadRequest(_) => "badRequest",
            Self::Unauthorized(_) => "unauthorized",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::debug!(error = %self, kind = self.kind(), "Request rejected");
        }

        let mut body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "status": status.as_u16(),
        });
        if let Self::Action(ActionError::RuleViolation(violation)) = &self {
            if let (Some(map), Ok(detail)) = (body.as_object_mut(), serde_json::to_value(violation))
            {
                map.insert(String::from("violation"), detail);
            }
        }

        (status, axum::Json(body)).into_response()
    }
}
