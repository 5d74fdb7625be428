//! Errors surfaced to clients of the intermediary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The incoming request could not be turned into an engine request.
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    /// The engine produced no response, the way an unanswered interception
    /// shows up as a network error in the browser.
    #[error("NO_RESPONSE")]
    NoResponse,

    #[error(transparent)]
    Engine(#[from] shellcache_core::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            Self::NoResponse => StatusCode::GATEWAY_TIMEOUT.into_response(),
            Self::Engine(err) => {
                tracing::warn!(error = %err, "request failed");
                (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
            }
        }
    }
}
