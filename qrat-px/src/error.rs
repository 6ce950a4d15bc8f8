//! Error types for qrat-px
//!
//! Every error the proxy produces itself is answered with the same JSON shape
//! the attendance service uses: `{ "success": false, "error": ... }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use qrat_common::wire::ErrorReply;
use thiserror::Error;

/// Proxy error type
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Attendance service unreachable (503)
    #[error("{error}: {details}")]
    Unavailable { error: String, details: String },

    /// Anything else (500)
    #[error("{error}")]
    Internal {
        error: String,
        details: Option<String>,
        original_status: Option<u16>,
    },
}

impl ProxyError {
    pub fn internal(error: impl Into<String>) -> Self {
        ProxyError::Internal {
            error: error.into(),
            details: None,
            original_status: None,
        }
    }

    pub fn internal_with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        ProxyError::Internal {
            error: error.into(),
            details: Some(details.into()),
            original_status: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ProxyError::BadRequest(msg) | ProxyError::Unauthorized(msg) => ErrorReply::new(msg),
            ProxyError::Unavailable { error, details } => {
                ErrorReply::new(error).with_details(details)
            }
            ProxyError::Internal {
                error,
                details,
                original_status,
            } => {
                let mut reply = ErrorReply::new(error);
                if let Some(details) = details {
                    reply = reply.with_details(details);
                }
                if let Some(status) = original_status {
                    reply = reply.with_original_status(status);
                }
                reply
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for handler results
pub type ApiResult<T> = Result<T, ProxyError>;
