//! Attendance routes
//!
//! `POST /attendance/record` is the one route with real logic: the attendance
//! service reports errors inconsistently, so its reply is normalized here.
//!
//! | Upstream reply                     | Proxy reply                                  |
//! |------------------------------------|----------------------------------------------|
//! | body not JSON                      | 500 `{error, details: "HTTP <s>: <body>"}`   |
//! | non-2xx, duplicate phrase          | 400 `{message, isDuplicate: true}`           |
//! | 400 / 409                          | same status and body                         |
//! | other non-2xx                      | 500 `{error, originalStatus}`                |
//! | 2xx                                | same status and body                         |
//! | no connection                      | 503 `{error, details}`                       |

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use qrat_common::duplicate::DUPLICATE_MESSAGE;
use qrat_common::wire::{preview, reply_reason};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::{pass_through, parse_body, require_authorization, respond};
use crate::error::{ApiResult, ProxyError};
use crate::AppState;

/// Characters of an unparseable upstream body echoed back in `details`
const DETAILS_PREVIEW_CHARS: usize = 200;

/// POST /api/proxy/attendance/record
pub async fn record(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let body = parse_body(&body)?;

    // Any non-zero JSON number; the service does its own range checks
    let valid = body
        .get("number")
        .and_then(Value::as_f64)
        .is_some_and(|n| n != 0.0);
    if !valid {
        warn!(body = %body, "Rejected attendance record with invalid number");
        return Err(ProxyError::BadRequest("Invalid student number".to_string()));
    }

    debug!(body = %body, "Forwarding attendance record");

    let reply = state
        .upstream
        .post_json("/attendance/record", &body, None)
        .await
        .map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                error!(error = %e, "Attendance service unreachable");
                ProxyError::Unavailable {
                    error: "Cannot reach the attendance service".to_string(),
                    details: e.to_string(),
                }
            } else {
                error!(error = %e, "Attendance record forwarding failed");
                ProxyError::internal_with_details(
                    "Unexpected error while recording attendance",
                    e.to_string(),
                )
            }
        })?;

    let status = reply.status;
    let data = match reply.json() {
        Ok(data) => data,
        Err(e) => {
            error!(status = status.as_u16(), error = %e, "Unparseable attendance service reply");
            return Err(ProxyError::internal_with_details(
                "Could not process the attendance service reply",
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    preview(&reply.body, DETAILS_PREVIEW_CHARS)
                ),
            ));
        }
    };

    if status.is_success() {
        return Ok(respond(&reply, data));
    }

    warn!(status = status.as_u16(), body = %data, "Attendance service returned an error");

    if state.phrases.detect(&data) {
        info!(status = status.as_u16(), "Duplicate attendance, answering 400");
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": DUPLICATE_MESSAGE,
                "isDuplicate": true,
            })),
        )
            .into_response());
    }

    if status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT {
        return Ok(respond(&reply, data));
    }

    Err(ProxyError::Internal {
        error: reply_reason(&data)
            .unwrap_or("Attendance service error")
            .to_string(),
        details: None,
        original_status: Some(status.as_u16()),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    pub date: Option<String>,
    pub session_id: Option<String>,
}

/// GET /api/proxy/attendance?date=&sessionId=
pub async fn by_date(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AttendanceQuery>,
) -> ApiResult<Response> {
    let auth = require_authorization(&headers)?;

    let mut params = Vec::with_capacity(2);
    if let Some(date) = query.date.as_deref() {
        params.push(("date", date));
    }
    if let Some(session_id) = query.session_id.as_deref() {
        params.push(("sessionId", session_id));
    }

    info!(date = ?query.date, session = ?query.session_id, "Forwarding attendance query");

    let reply = state
        .upstream
        .get("/admin/attendance", &params, Some(auth))
        .await;
    let (reply, data) = pass_through(reply, "Failed to load attendance data")?;

    let rows = data
        .get("data")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    debug!(rows, "Attendance query answered");

    Ok(respond(&reply, data))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// GET /api/proxy/attendance/session?sessionId=
pub async fn by_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Response> {
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProxyError::BadRequest("sessionId is required".to_string()))?;
    let auth = require_authorization(&headers)?;

    let reply = state
        .upstream
        .get(
            "/admin/attendance/session",
            &[("sessionId", session_id.as_str())],
            Some(auth),
        )
        .await;
    let (reply, data) = pass_through(reply, "Failed to load session attendance data")?;

    Ok(respond(&reply, data))
}
