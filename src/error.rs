use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The path every expired or missing session is sent back to.
pub const LOGIN_PATH: &str = "/login";

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A transport error while talking to the restaurant API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The refresh cycle failed; the tokens have been cleared.
    #[error("Session expired")]
    SessionExpired,

    /// No session is attached to the request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The restaurant API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Whether the error means the session is gone and the browser must log in again.
    pub fn is_session_loss(&self) -> bool {
        matches!(self, AppError::SessionExpired | AppError::Unauthenticated)
    }
}

/// Response extension marking a redirect caused by a failed refresh. The
/// session middleware drops the cookie of such responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnded;

/// Builds a `303 See Other` redirect.
pub fn see_other(location: &str) -> Response {
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location)
        .body(axum::body::Body::empty())
        .unwrap_or_else(|_| StatusCode::SEE_OTHER.into_response())
}

/// Serializes `{"error": message}` with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let body = sonic_rs::to_string(&sonic_rs::json!({
        "error": message
    }))
    .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Http(ref e) => {
                tracing::error!("Upstream HTTP error: {}", e);
                (StatusCode::BAD_GATEWAY, "Upstream unavailable".to_string())
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Cache error".to_string())
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }

            AppError::SessionExpired => {
                tracing::warn!("Session expired, redirecting to login");
                let mut response = see_other(LOGIN_PATH);
                response.extensions_mut().insert(SessionEnded);
                return response;
            }

            AppError::Unauthenticated => {
                tracing::debug!("No session, redirecting to login");
                return see_other(LOGIN_PATH);
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Api { status, ref message } => {
                tracing::error!("API error {}: {}", status, message);
                (StatusCode::BAD_GATEWAY, message.clone())
            }

            AppError::Decode(ref msg) => {
                tracing::error!("Decode error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Malformed upstream response".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        json_error(status, &message)
    }
}
