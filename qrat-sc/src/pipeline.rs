//! Scan processing pipeline
//!
//! `decode event → gate → extraction → identifier dedup → submission → history`
//!
//! [`ScanPipeline::admit`] runs everything up to the submission synchronously
//! under one lock of the gate, so the in-flight flag flips false→true
//! atomically with the decision to submit, and events are judged in the order
//! they are handed in. The admitted event comes back as a
//! [`PendingSubmission`] that owns the flag. The lock is released before the
//! remote call; while the call is pending, further events are rejected by the
//! in-flight guard and dropped (the camera presents the code again on the
//! next frame). The flag is cleared when the pending submission finishes or
//! is dropped, including when the awaiting task is cancelled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use qrat_common::SessionTag;
use tracing::{debug, info, trace};

use crate::coordinator::{SubmissionCoordinator, SubmissionOutcome};
use crate::decoder::ScanEvent;
use crate::extractor::{extract_identifier, ExtractionError, Identifier};
use crate::gate::{Cooldowns, GateRejection, ScanGate, ScanGateState};
use crate::history::{AttendanceHistory, Notice};

/// What happened to one decode event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Dropped by the gate; silent
    Ignored(GateRejection),
    /// Admitted but no student number could be read
    Unreadable(ExtractionError),
    /// Reached the remote service
    Submitted {
        identifier: Identifier,
        outcome: SubmissionOutcome,
    },
}

impl PipelineOutcome {
    /// Notice for the operator; `None` for gate rejections
    pub fn notice(&self) -> Option<Notice> {
        match self {
            PipelineOutcome::Ignored(_) => None,
            PipelineOutcome::Unreadable(error) => Some(Notice::from_extraction(error)),
            PipelineOutcome::Submitted { outcome, .. } => Some(Notice::from_outcome(outcome)),
        }
    }
}

struct Shared {
    gate: Mutex<ScanGate>,
    coordinator: SubmissionCoordinator,
    history: Mutex<AttendanceHistory>,
    session_tag: Mutex<SessionTag>,
}

/// One scanning session. Clones share the same state.
#[derive(Clone)]
pub struct ScanPipeline {
    shared: Arc<Shared>,
}

impl ScanPipeline {
    pub fn new(coordinator: SubmissionCoordinator, cooldowns: Cooldowns, session_tag: SessionTag) -> Self {
        Self {
            shared: Arc::new(Shared {
                gate: Mutex::new(ScanGate::new(cooldowns)),
                coordinator,
                history: Mutex::new(AttendanceHistory::new()),
                session_tag: Mutex::new(session_tag),
            }),
        }
    }

    /// Process one decode event
    pub async fn on_decode(&self, event: ScanEvent) -> PipelineOutcome {
        match self.admit(&event) {
            Ok(pending) => pending.run().await,
            Err(outcome) => outcome,
        }
    }

    /// Gate, extraction and identifier dedup for one event.
    ///
    /// `Err` carries the final outcome of an event that goes no further. On
    /// `Ok` the submission is in flight until the returned value is run to
    /// completion or dropped.
    pub fn admit(&self, event: &ScanEvent) -> Result<PendingSubmission, PipelineOutcome> {
        let mut gate = lock(&self.shared.gate);

        gate.admit(event).map_err(|rejection| {
            trace!(kind = rejection.kind(), "Scan ignored");
            PipelineOutcome::Ignored(rejection)
        })?;

        let identifier = extract_identifier(&event.raw_text).map_err(|error| {
            info!(reason = error.reason(), payload = %event.raw_text, "Unreadable QR payload");
            PipelineOutcome::Unreadable(error)
        })?;

        gate.check_identifier(identifier, event.timestamp)
            .and_then(|()| gate.begin_submission())
            .map_err(|rejection| {
                debug!(identifier = %identifier, kind = rejection.kind(), "Scan ignored");
                PipelineOutcome::Ignored(rejection)
            })?;

        Ok(PendingSubmission {
            shared: Arc::clone(&self.shared),
            identifier,
            session_tag: self.session_tag(),
            timestamp: event.timestamp,
            finished: false,
        })
    }

    pub fn session_tag(&self) -> SessionTag {
        *lock(&self.shared.session_tag)
    }

    /// Applies to the next admitted event
    pub fn set_session_tag(&self, session_tag: SessionTag) {
        info!(session = %session_tag, "Session changed");
        *lock(&self.shared.session_tag) = session_tag;
    }

    /// Snapshot of the accepted records
    pub fn history(&self) -> AttendanceHistory {
        lock(&self.shared.history).clone()
    }

    pub fn clear_history(&self) {
        lock(&self.shared.history).clear();
    }

    /// Snapshot of the gate state
    pub fn gate_state(&self) -> ScanGateState {
        lock(&self.shared.gate).state().clone()
    }

    pub fn is_submission_in_flight(&self) -> bool {
        lock(&self.shared.gate).state().submission_in_flight
    }
}

/// An admitted event holding the in-flight flag
#[must_use = "the in-flight flag is released without submitting when dropped"]
pub struct PendingSubmission {
    shared: Arc<Shared>,
    identifier: Identifier,
    session_tag: SessionTag,
    timestamp: Instant,
    finished: bool,
}

impl PendingSubmission {
    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    /// Submit to the remote service and record the outcome
    pub async fn run(mut self) -> PipelineOutcome {
        let identifier = self.identifier;
        let session_tag = self.session_tag;
        let outcome = self.shared.coordinator.submit(identifier, session_tag).await;

        // Every outcome, a duplicate included, starts the identifier window
        lock(&self.shared.gate).finish_submission(identifier, self.timestamp);
        self.finished = true;

        if lock(&self.shared.history).apply(&outcome) {
            info!(identifier = %identifier, session = %session_tag, "Added to history");
        }

        PipelineOutcome::Submitted { identifier, outcome }
    }
}

impl Drop for PendingSubmission {
    fn drop(&mut self) {
        if !self.finished {
            lock(&self.shared.gate).release();
        }
    }
}

/// Critical sections never panic mid-update, so a poisoned lock still holds
/// consistent state
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
