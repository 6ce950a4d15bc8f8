//! Scan gate
//!
//! A camera held over a static code decodes it many times per second. The
//! gate decides which decode events may proceed, using three windows:
//!
//! | Window     | Default | Key                 |
//! |------------|---------|---------------------|
//! | global     | 1 s     | any admitted event  |
//! | raw text   | 3 s     | decoded payload     |
//! | identifier | 5 s     | extracted number    |
//!
//! plus the in-flight flag that keeps at most one submission open.
//!
//! Checks run in a fixed order and stop at the first failure. The global
//! timestamp is refreshed as soon as the global check passes, even if a later
//! check rejects the event, so a burst of distinct payloads within one second
//! still admits at most one.

use std::time::{Duration, Instant};

use qrat_common::config::ScannerConfig;
use thiserror::Error;

use crate::decoder::ScanEvent;
use crate::extractor::Identifier;

/// Cooldown window lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldowns {
    pub global: Duration,
    pub raw_text: Duration,
    pub identifier: Duration,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            global: Duration::from_millis(1_000),
            raw_text: Duration::from_millis(3_000),
            identifier: Duration::from_millis(5_000),
        }
    }
}

impl From<&ScannerConfig> for Cooldowns {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            global: Duration::from_millis(config.global_cooldown_ms),
            raw_text: Duration::from_millis(config.raw_text_window_ms),
            identifier: Duration::from_millis(config.identifier_window_ms),
        }
    }
}

/// Why the gate dropped an event. Never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("global cooldown active")]
    GlobalCooldown,

    #[error("submission in flight")]
    InFlight,

    #[error("same payload scanned recently")]
    RawTextDuplicate,

    #[error("same student number processed recently")]
    IdentifierDuplicate,
}

impl GateRejection {
    pub fn kind(&self) -> &'static str {
        match self {
            GateRejection::GlobalCooldown => "global-cooldown",
            GateRejection::InFlight => "in-flight",
            GateRejection::RawTextDuplicate => "raw-text-duplicate",
            GateRejection::IdentifierDuplicate => "identifier-duplicate",
        }
    }
}

/// Timing state for one scanning session
#[derive(Debug, Clone, Default)]
pub struct ScanGateState {
    pub last_global_admit: Option<Instant>,
    pub last_raw_text: Option<String>,
    pub last_raw_text_at: Option<Instant>,
    pub last_identifier: Option<Identifier>,
    pub last_identifier_at: Option<Instant>,
    pub submission_in_flight: bool,
}

/// Multi-window admission filter
#[derive(Debug, Clone, Default)]
pub struct ScanGate {
    state: ScanGateState,
    cooldowns: Cooldowns,
}

impl ScanGate {
    pub fn new(cooldowns: Cooldowns) -> Self {
        Self {
            state: ScanGateState::default(),
            cooldowns,
        }
    }

    pub fn state(&self) -> &ScanGateState {
        &self.state
    }

    pub fn cooldowns(&self) -> Cooldowns {
        self.cooldowns
    }

    /// Global cooldown, in-flight guard and raw-text dedup.
    ///
    /// On success the event is tentatively admitted and its payload becomes
    /// the raw-text dedup key.
    pub fn admit(&mut self, event: &ScanEvent) -> Result<(), GateRejection> {
        let now = event.timestamp;

        if within(self.state.last_global_admit, now, self.cooldowns.global) {
            return Err(GateRejection::GlobalCooldown);
        }
        self.state.last_global_admit = Some(now);

        if self.state.submission_in_flight {
            return Err(GateRejection::InFlight);
        }

        if self.state.last_raw_text.as_deref() == Some(event.raw_text.as_str())
            && within(self.state.last_raw_text_at, now, self.cooldowns.raw_text)
        {
            return Err(GateRejection::RawTextDuplicate);
        }

        self.state.last_raw_text = Some(event.raw_text.clone());
        self.state.last_raw_text_at = Some(now);
        Ok(())
    }

    /// Identifier-level dedup, applied after extraction.
    ///
    /// Different payloads (`"42"`, `"student:42"`) can name the same student,
    /// which raw-text dedup cannot see.
    pub fn check_identifier(&self, identifier: Identifier, now: Instant) -> Result<(), GateRejection> {
        if self.state.last_identifier == Some(identifier)
            && within(self.state.last_identifier_at, now, self.cooldowns.identifier)
        {
            return Err(GateRejection::IdentifierDuplicate);
        }
        Ok(())
    }

    /// Flip the in-flight flag false→true
    pub fn begin_submission(&mut self) -> Result<(), GateRejection> {
        if self.state.submission_in_flight {
            return Err(GateRejection::InFlight);
        }
        self.state.submission_in_flight = true;
        Ok(())
    }

    /// Record the processed identifier (whatever the outcome) and clear the flag
    pub fn finish_submission(&mut self, identifier: Identifier, at: Instant) {
        self.state.last_identifier = Some(identifier);
        self.state.last_identifier_at = Some(at);
        self.state.submission_in_flight = false;
    }

    /// Clear the flag without recording an identifier
    pub fn release(&mut self) {
        self.state.submission_in_flight = false;
    }
}

/// True if `since` is set and less than `window` has elapsed at `now`.
/// A `since` later than `now` counts as zero elapsed.
fn within(since: Option<Instant>, now: Instant, window: Duration) -> bool {
    since.is_some_and(|since| now.saturating_duration_since(since) < window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn id(value: u64) -> Identifier {
        Identifier::new(value).unwrap()
    }

    #[test]
    fn test_first_event_admitted() {
        let mut gate = ScanGate::default();
        let event = ScanEvent::at("42", Instant::now());

        assert_eq!(gate.admit(&event), Ok(()));
        assert_eq!(gate.state().last_raw_text.as_deref(), Some("42"));
        assert_eq!(gate.state().last_global_admit, Some(event.timestamp));
    }

    #[test]
    fn test_global_cooldown() {
        let mut gate = ScanGate::default();
        let t0 = Instant::now();

        assert_eq!(gate.admit(&ScanEvent::at("1", t0)), Ok(()));
        assert_eq!(
            gate.admit(&ScanEvent::at("2", t0 + ms(500))),
            Err(GateRejection::GlobalCooldown)
        );
        assert_eq!(gate.admit(&ScanEvent::at("3", t0 + ms(1_200))), Ok(()));
    }

    #[test]
    fn test_global_timestamp_refreshed_before_later_checks() {
        let mut gate = ScanGate::default();
        let t0 = Instant::now();

        gate.admit(&ScanEvent::at("1", t0)).unwrap();
        gate.begin_submission().unwrap();

        // Rejected by the in-flight guard, but still restarts the global window
        assert_eq!(
            gate.admit(&ScanEvent::at("2", t0 + ms(1_100))),
            Err(GateRejection::InFlight)
        );
        gate.release();
        assert_eq!(
            gate.admit(&ScanEvent::at("3", t0 + ms(1_500))),
            Err(GateRejection::GlobalCooldown)
        );
    }

    #[test]
    fn test_in_flight_rejects_everything() {
        let mut gate = ScanGate::default();
        gate.begin_submission().unwrap();

        assert_eq!(
            gate.admit(&ScanEvent::at("fresh", Instant::now())),
            Err(GateRejection::InFlight)
        );
        assert_eq!(gate.begin_submission(), Err(GateRejection::InFlight));
    }

    #[test]
    fn test_raw_text_window() {
        let mut gate = ScanGate::default();
        let t0 = Instant::now();

        gate.admit(&ScanEvent::at("student:42", t0)).unwrap();
        assert_eq!(
            gate.admit(&ScanEvent::at("student:42", t0 + ms(2_000))),
            Err(GateRejection::RawTextDuplicate)
        );
        assert_eq!(gate.admit(&ScanEvent::at("student:42", t0 + ms(3_000))), Ok(()));
    }

    #[test]
    fn test_raw_text_dedup_survives_unrelated_event() {
        let mut gate = ScanGate::default();
        let t0 = Instant::now();

        gate.admit(&ScanEvent::at("A", t0)).unwrap();
        gate.admit(&ScanEvent::at("B", t0 + ms(1_100))).unwrap();
        // Key is now "B"; "A" passes again
        assert_eq!(gate.admit(&ScanEvent::at("A", t0 + ms(2_200))), Ok(()));
        assert_eq!(
            gate.admit(&ScanEvent::at("A", t0 + ms(3_300))),
            Err(GateRejection::RawTextDuplicate)
        );
    }

    #[test]
    fn test_identifier_window() {
        let mut gate = ScanGate::default();
        let t0 = Instant::now();

        gate.begin_submission().unwrap();
        gate.finish_submission(id(42), t0);
        assert!(!gate.state().submission_in_flight);

        assert_eq!(
            gate.check_identifier(id(42), t0 + ms(4_999)),
            Err(GateRejection::IdentifierDuplicate)
        );
        assert_eq!(gate.check_identifier(id(43), t0 + ms(10)), Ok(()));
        assert_eq!(gate.check_identifier(id(42), t0 + ms(5_000)), Ok(()));
    }

    #[test]
    fn test_out_of_order_timestamp_counts_as_zero_elapsed() {
        let mut gate = ScanGate::default();
        let t0 = Instant::now() + ms(10_000);

        gate.admit(&ScanEvent::at("1", t0)).unwrap();
        assert_eq!(
            gate.admit(&ScanEvent::at("2", t0 - ms(5_000))),
            Err(GateRejection::GlobalCooldown)
        );
    }

    #[test]
    fn test_custom_cooldowns_from_config() {
        let config = ScannerConfig {
            global_cooldown_ms: 100,
            raw_text_window_ms: 200,
            identifier_window_ms: 300,
            ..ScannerConfig::default()
        };
        let cooldowns = Cooldowns::from(&config);
        assert_eq!(cooldowns.global, ms(100));
        assert_eq!(cooldowns.raw_text, ms(200));
        assert_eq!(cooldowns.identifier, ms(300));
    }
}
