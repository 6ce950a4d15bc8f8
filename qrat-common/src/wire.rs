//! Wire types for the remote attendance service
//!
//! The service speaks loosely-typed JSON: replies may carry `success`,
//! `message`, `error` and arbitrary extra fields. Request bodies are typed;
//! reply bodies are kept as [`serde_json::Value`] and inspected with the
//! helpers below.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /attendance/record`
///
/// # Examples
///
/// ```
/// use qrat_common::wire::RecordRequest;
///
/// let body = RecordRequest { number: 42, session_id: "3-1".to_string() };
/// let json = serde_json::to_value(&body).unwrap();
/// assert_eq!(json["sessionId"], "3-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    /// Student number
    pub number: u64,
    /// Session tag, `"<week>-<session>"`
    pub session_id: String,
}

/// Error body produced by the proxy itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_status: Option<u16>,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
            original_status: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_original_status(mut self, status: u16) -> Self {
        self.original_status = Some(status);
        self
    }
}

/// Human-readable reason carried by a reply: `message`, else `error`
pub fn reply_reason(body: &Value) -> Option<&str> {
    ["message", "error"]
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .find(|text| !text.is_empty())
}

/// True if the reply explicitly says `success: false`
pub fn explicit_failure(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool) == Some(false)
}

/// First `max_chars` characters of a body, for diagnostics
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
