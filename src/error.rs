use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Why authentication failed. Logged for diagnosis, never echoed to the
/// client: every variant collapses to the same 401 body so callers cannot
/// probe which check rejected them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    InvalidToken,
    UnknownUser,
    PasswordChanged,
    BadCredentials,
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthFailure::MissingToken => "missing token",
            AuthFailure::InvalidToken => "invalid token",
            AuthFailure::UnknownUser => "user no longer exists",
            AuthFailure::PasswordChanged => "password changed",
            AuthFailure::BadCredentials => "bad credentials",
        };
        f.write_str(s)
    }
}

/// The coarse failure kinds handlers are allowed to surface. Raw driver and
/// token-library errors never cross this boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(AuthFailure),
    #[error("forbidden")]
    Forbidden,
    #[error("service unavailable")]
    Unavailable(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated(reason) => {
                warn!(%reason, "request rejected: unauthenticated");
                (StatusCode::UNAUTHORIZED, "Not logged in, please log in again")
            }
            ApiError::Forbidden => {
                warn!("request rejected: insufficient role");
                (StatusCode::FORBIDDEN, "Insufficient permissions")
            }
            ApiError::Unavailable(source) => {
                error!(error = %source, "request rejected: database unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable, try again later")
            }
            ApiError::Internal(source) => {
                error!(error = %source, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
