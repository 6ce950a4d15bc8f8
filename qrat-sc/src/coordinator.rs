//! Submission coordinator
//!
//! Sends one attendance record to the remote service and normalizes the
//! reply into a [`SubmissionOutcome`].
//!
//! The remote service is inconsistent about status codes: an "already
//! recorded today" reply has been seen with 200, 400, 409 and 500. All
//! status/body interpretation therefore lives in [`classify`], and callers
//! only ever see the four outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qrat_common::wire::{explicit_failure, preview, reply_reason, RecordRequest};
use qrat_common::{DuplicatePhrases, SessionTag};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extractor::Identifier;

/// Characters of an unparseable body kept for diagnostics
const BODY_PREVIEW_CHARS: usize = 200;

/// Raw reply from the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure below HTTP: the request never produced a status and body
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Remote attendance service
#[async_trait]
pub trait AttendanceService: Send + Sync {
    /// `POST /attendance/record`
    async fn record(&self, request: &RecordRequest) -> Result<RemoteResponse, TransportError>;
}

/// Confirmed attendance, created only for accepted submissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub identifier: Identifier,
    pub session_tag: SessionTag,
    pub accepted_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn new(identifier: Identifier, session_tag: SessionTag) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier,
            session_tag,
            accepted_at: Utc::now(),
        }
    }
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted(AttendanceRecord),
    /// Already recorded for the current period
    Duplicate,
    /// Business-rule refusal, not retried
    Rejected(String),
    /// Server or network failure
    TransientError(String),
}

impl SubmissionOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionOutcome::Accepted(_) => "accepted",
            SubmissionOutcome::Duplicate => "duplicate",
            SubmissionOutcome::Rejected(_) => "rejected",
            SubmissionOutcome::TransientError(_) => "transient-error",
        }
    }
}

/// Outcome of [`classify`], before a record exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Duplicate,
    Rejected(String),
    TransientError(String),
}

/// Status × body classification table.
///
/// | Body                                  | Status        | Verdict        |
/// |---------------------------------------|---------------|----------------|
/// | not JSON                              | any           | TransientError |
/// | duplicate phrase or `isDuplicate`     | any           | Duplicate      |
/// | other                                 | 400, 409      | Rejected       |
/// | other                                 | other non-2xx | TransientError |
/// | `success: false`                      | 2xx           | Rejected       |
/// | other                                 | 2xx           | Accepted       |
pub fn classify(response: &RemoteResponse, phrases: &DuplicatePhrases) -> Verdict {
    let status = response.status;

    let body: Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(e) => {
            warn!(status, error = %e, "Unparseable attendance reply");
            return Verdict::TransientError(format!(
                "HTTP {}: {}",
                status,
                preview(&response.body, BODY_PREVIEW_CHARS)
            ));
        }
    };

    if phrases.detect(&body) {
        debug!(status, "Duplicate attendance reply");
        return Verdict::Duplicate;
    }

    let reason = || {
        reply_reason(&body)
            .map(str::to_string)
            .unwrap_or_else(|| response.body.clone())
    };

    match status {
        400 | 409 => Verdict::Rejected(reason()),
        200..=299 if explicit_failure(&body) => Verdict::Rejected(reason()),
        200..=299 => Verdict::Accepted,
        _ => Verdict::TransientError(format!("HTTP {}: {}", status, reason())),
    }
}

/// Submits attendance and classifies the reply
#[derive(Clone)]
pub struct SubmissionCoordinator {
    service: Arc<dyn AttendanceService>,
    phrases: DuplicatePhrases,
}

impl SubmissionCoordinator {
    pub fn new(service: Arc<dyn AttendanceService>, phrases: DuplicatePhrases) -> Self {
        Self { service, phrases }
    }

    /// Submit one identifier. Never fails: transport errors become
    /// [`SubmissionOutcome::TransientError`].
    pub async fn submit(&self, identifier: Identifier, session_tag: SessionTag) -> SubmissionOutcome {
        let request = RecordRequest {
            number: identifier.value(),
            session_id: session_tag.to_string(),
        };

        debug!(identifier = %identifier, session = %session_tag, "Submitting attendance");

        let response = match self.service.record(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "Attendance request failed");
                return SubmissionOutcome::TransientError(e.to_string());
            }
        };

        let outcome = match classify(&response, &self.phrases) {
            Verdict::Accepted => {
                SubmissionOutcome::Accepted(AttendanceRecord::new(identifier, session_tag))
            }
            Verdict::Duplicate => SubmissionOutcome::Duplicate,
            Verdict::Rejected(reason) => SubmissionOutcome::Rejected(reason),
            Verdict::TransientError(detail) => SubmissionOutcome::TransientError(detail),
        };

        info!(
            identifier = %identifier,
            session = %session_tag,
            status = response.status,
            outcome = outcome.kind(),
            "Attendance submission finished"
        );

        outcome
    }
}
