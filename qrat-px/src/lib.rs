//! qrat-px library - forwarding proxy for the attendance service
//!
//! Browsers talk to the proxy instead of the attendance service directly.
//! The proxy validates requests, forwards them, and normalizes the service's
//! inconsistent error replies (most importantly, "already recorded today"
//! answered with HTTP 500 becomes a 400 with `isDuplicate: true`).

use axum::Router;
use qrat_common::DuplicatePhrases;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod upstream;

pub use error::{ApiResult, ProxyError};
pub use upstream::{UpstreamClient, UpstreamReply};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Attendance service client
    pub upstream: UpstreamClient,
    /// Phrases that mark a reply as "already recorded today"
    pub phrases: DuplicatePhrases,
}

impl AppState {
    pub fn new(upstream: UpstreamClient, phrases: DuplicatePhrases) -> Self {
        Self { upstream, phrases }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/proxy", api::proxy_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
