//! HTTP API handlers for qrat-px

pub mod admin;
pub mod attendance;
pub mod health;

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tracing::{error, warn};

use crate::error::ProxyError;
use crate::upstream::UpstreamReply;
use crate::AppState;

pub use health::health_routes;

/// Routes mounted under `/api/proxy`
pub fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(attendance::by_date))
        .route("/attendance/session", get(attendance::by_session))
        .route("/attendance/record", post(attendance::record))
        .route("/admin/login", post(admin::login))
        .route("/admin/refresh", post(admin::refresh))
        .route("/admin/create", post(admin::create))
}

/// `Authorization` header, forwarded verbatim
pub(crate) fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

pub(crate) fn require_authorization(headers: &HeaderMap) -> Result<&str, ProxyError> {
    authorization(headers).ok_or_else(|| ProxyError::Unauthorized("Authentication required".to_string()))
}

/// Request body as JSON
pub(crate) fn parse_body(body: &Bytes) -> Result<Value, ProxyError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Rejected request with invalid JSON body");
        ProxyError::BadRequest("Request body must be valid JSON".to_string())
    })
}

/// Forward an upstream reply unchanged: its status and its JSON body.
///
/// Used by the thin routes, where any failure (transport or a body that is
/// not JSON) becomes a 500 carrying `failure` as the message.
pub(crate) fn pass_through(
    reply: Result<UpstreamReply, reqwest::Error>,
    failure: &str,
) -> Result<(UpstreamReply, Value), ProxyError> {
    let reply = reply.map_err(|e| {
        error!(error = %e, "{}", failure);
        ProxyError::internal(failure)
    })?;

    let data = reply.json().map_err(|e| {
        error!(status = reply.status.as_u16(), error = %e, "{}: unparseable upstream reply", failure);
        ProxyError::internal(failure)
    })?;

    Ok((reply, data))
}

/// Upstream status with a JSON body
pub(crate) fn respond(reply: &UpstreamReply, data: Value) -> Response {
    (reply.status, Json(data)).into_response()
}
