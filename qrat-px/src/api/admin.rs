//! Admin account routes: pass-through to the attendance service

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::Value;
use tracing::{info, warn};

use super::{pass_through, parse_body, require_authorization, respond};
use crate::error::ApiResult;
use crate::AppState;

/// POST /api/proxy/admin/login
pub async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let body = parse_body(&body)?;

    let reply = state.upstream.post_json("/admin/login", &body, None).await;
    let (reply, data) = pass_through(reply, "Login failed")?;

    if reply.status.is_success() && !has_refresh_token(&data) {
        warn!("Login reply carries no refresh token");
    }
    info!(status = reply.status.as_u16(), "Admin login forwarded");

    Ok(respond(&reply, data))
}

/// POST /api/proxy/admin/refresh
pub async fn refresh(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let body = parse_body(&body)?;

    let reply = state.upstream.post_json("/admin/refresh", &body, None).await;
    let (reply, data) = pass_through(reply, "Token refresh failed")?;

    Ok(respond(&reply, data))
}

/// POST /api/proxy/admin/create
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let body = parse_body(&body)?;
    let auth = require_authorization(&headers)?;

    let reply = state
        .upstream
        .post_json("/admin/create", &body, Some(auth))
        .await;
    let (reply, data) = pass_through(reply, "Admin account creation failed")?;

    info!(status = reply.status.as_u16(), "Admin account creation forwarded");
    Ok(respond(&reply, data))
}

/// `refresh_token` at the top level or under `data`
fn has_refresh_token(data: &Value) -> bool {
    let present = |v: Option<&Value>| v.is_some_and(|t| !t.is_null() && t.as_str() != Some(""));
    present(data.get("refresh_token"))
        || present(data.get("data").and_then(|d| d.get("refresh_token")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_refresh_token_locations() {
        assert!(has_refresh_token(&json!({ "refresh_token": "r" })));
        assert!(has_refresh_token(&json!({ "data": { "refresh_token": "r" } })));
        assert!(!has_refresh_token(&json!({ "access_token": "a" })));
        assert!(!has_refresh_token(&json!({ "refresh_token": "" })));
        assert!(!has_refresh_token(&json!({ "data": { "refresh_token": null } })));
    }
}
