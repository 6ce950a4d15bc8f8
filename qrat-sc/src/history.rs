//! Session history view model
//!
//! Keeps the accepted records shown next to the camera (most recent first)
//! and turns every pipeline result into the notice the operator sees.

use std::collections::VecDeque;
use std::fmt;

use crate::coordinator::{AttendanceRecord, SubmissionOutcome};
use crate::extractor::ExtractionError;

/// Accepted attendance for the running session
#[derive(Debug, Clone, Default)]
pub struct AttendanceHistory {
    records: VecDeque<AttendanceRecord>,
}

impl AttendanceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome. Only `Accepted` changes the history; returns
    /// whether a record was added.
    pub fn apply(&mut self, outcome: &SubmissionOutcome) -> bool {
        match outcome {
            SubmissionOutcome::Accepted(record) => {
                self.records.push_front(record.clone());
                true
            }
            _ => false,
        }
    }

    /// Most recent first
    pub fn records(&self) -> impl Iterator<Item = &AttendanceRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&AttendanceRecord> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Explicit operator action; the pipeline never clears history
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// User-facing message for one processed scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn from_outcome(outcome: &SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Accepted(record) => Notice::new(
                NoticeLevel::Success,
                format!(
                    "Attendance recorded: #{} (session {})",
                    record.identifier, record.session_tag
                ),
            ),
            SubmissionOutcome::Duplicate => {
                Notice::new(NoticeLevel::Info, "Already checked in today")
            }
            SubmissionOutcome::Rejected(reason) => Notice::new(NoticeLevel::Error, reason.clone()),
            SubmissionOutcome::TransientError(_) => Notice::new(
                NoticeLevel::Error,
                "Temporary server problem, please scan again in a moment",
            ),
        }
    }

    pub fn from_extraction(error: &ExtractionError) -> Self {
        let message = match error {
            ExtractionError::NoNumberFound => "No student number found in QR code",
            ExtractionError::UnsupportedFormat => "Unsupported QR code format",
            ExtractionError::InvalidNumber => "Invalid student number",
        };
        Notice::new(NoticeLevel::Error, message)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Success => "OK",
            NoticeLevel::Info => "INFO",
            NoticeLevel::Error => "ERROR",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}
