//! # QRAT Common Library
//!
//! Shared code for the QRAT scanner and forwarding proxy including:
//! - Error type
//! - TOML configuration loading and value resolution
//! - Wire types for the remote attendance service
//! - Duplicate-attendance phrase matching
//! - Session tags

pub mod config;
pub mod duplicate;
pub mod error;
pub mod session;
pub mod wire;

pub use duplicate::DuplicatePhrases;
pub use error::{Error, Result};
pub use session::SessionTag;
