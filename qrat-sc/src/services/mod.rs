//! Clients for external services

pub mod attendance_client;

pub use attendance_client::HttpAttendanceService;
