//! Remote attendance service client
//!
//! Thin reqwest wrapper: it sends the record request and hands back the raw
//! status and body text. Interpretation of the reply (including bodies that
//! are not JSON) belongs to [`crate::coordinator::classify`].

use std::time::Duration;

use async_trait::async_trait;
use qrat_common::wire::RecordRequest;

use crate::coordinator::{AttendanceService, RemoteResponse, TransportError};

const USER_AGENT: &str = concat!("QRAT/", env!("CARGO_PKG_VERSION"));

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for `POST {base}/attendance/record`
pub struct HttpAttendanceService {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpAttendanceService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self) -> String {
        format!("{}/attendance/record", self.base_url)
    }
}

#[async_trait]
impl AttendanceService for HttpAttendanceService {
    async fn record(&self, request: &RecordRequest) -> Result<RemoteResponse, TransportError> {
        let url = self.record_url();

        tracing::debug!(
            url = %url,
            number = request.number,
            session = %request.session_id,
            "Posting attendance record"
        );

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        // Body is read as text: the service does not always answer with JSON
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        tracing::debug!(status, body_len = body.len(), "Attendance service replied");

        Ok(RemoteResponse { status, body })
    }
}
