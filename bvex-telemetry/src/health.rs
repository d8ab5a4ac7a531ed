use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// Failed cycles in a row after which a client reports `Disconnected`.
pub const DISCONNECT_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Connected,
    Connecting,
    Disconnected,
}

impl HealthState {
    /// Human-readable label shown next to a subsystem.
    pub fn label(&self) -> &'static str {
        match self {
            HealthState::Connected => "Connected",
            HealthState::Connecting => "Connecting...",
            HealthState::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derives the tri-state health from the failure streak and snapshot validity.
pub fn classify(consecutive_failures: u32, valid: bool) -> HealthState {
    if consecutive_failures >= DISCONNECT_THRESHOLD {
        HealthState::Disconnected
    } else if consecutive_failures == 0 && valid {
        HealthState::Connected
    } else {
        HealthState::Connecting
    }
}

/// Failure/attempt bookkeeping owned by one client.
///
/// Only poll cycles and command dispatches move it; nothing decays on a timer.
#[derive(Debug, Clone, Default)]
pub struct HealthTracker {
    consecutive_failures: u32,
    connection_attempts: u64,
    last_attempt: Option<Instant>,
    last_attempt_at: Option<OffsetDateTime>,
    last_success: Option<Instant>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_attempt(&mut self) {
        self.connection_attempts += 1;
        self.last_attempt = Some(Instant::now());
        self.last_attempt_at = Some(OffsetDateTime::now_utc());
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_success = Some(Instant::now());
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn connection_attempts(&self) -> u64 {
        self.connection_attempts
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    pub fn last_attempt_at(&self) -> Option<OffsetDateTime> {
        self.last_attempt_at
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }

    pub fn status(&self, valid: bool) -> HealthState {
        classify(self.consecutive_failures, valid)
    }

    /// Like [`status`](Self::status), but a client with no attempt inside
    /// `window` counts as disconnected whatever its failure count. Command
    /// clients can sit idle for long stretches, so their last outcome goes
    /// stale.
    pub fn status_within(&self, valid: bool, window: Duration, now: Instant) -> HealthState {
        match self.last_attempt {
            Some(at) if now.saturating_duration_since(at) < window => self.status(valid),
            _ => HealthState::Disconnected,
        }
    }
}
