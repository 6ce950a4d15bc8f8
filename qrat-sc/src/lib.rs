//! qrat-sc library interface
//!
//! Scanner side of QRAT: decode events in, attendance submissions out.
//!
//! ```text
//! decoder → gate → extractor → gate (identifier) → coordinator → history
//! ```
//!
//! The `qrat-sc` binary takes decode events as text lines. Camera control
//! ([`camera::CameraSession`]) is driven by the embedding front end, which
//! supplies the device through a [`camera::CameraBackend`] implementation.

pub mod camera;
pub mod coordinator;
pub mod decoder;
pub mod extractor;
pub mod gate;
pub mod history;
pub mod pipeline;
pub mod services;

pub use coordinator::{
    classify, AttendanceRecord, AttendanceService, RemoteResponse, SubmissionCoordinator,
    SubmissionOutcome, TransportError, Verdict,
};
pub use decoder::{LineDecoder, ScanEvent};
pub use extractor::{extract_identifier, ExtractionError, Identifier};
pub use gate::{Cooldowns, GateRejection, ScanGate, ScanGateState};
pub use history::{AttendanceHistory, Notice, NoticeLevel};
pub use pipeline::{PendingSubmission, PipelineOutcome, ScanPipeline};
pub use services::HttpAttendanceService;
