//! Heater relay control and heater telemetry.
//!
//! Commands and telemetry live on separate servers. The command side has
//! its own health bookkeeping: a rejected or lost command never touches the
//! telemetry snapshot, and the reverse holds too.

mod telemetry;

pub use telemetry::HeaterTelemetryClient;

use crate::channels::{COMMAND_ACK, TOGGLE_LOCKPIN};
use crate::config::{secs, ProbeMode, TelemetryConfig};
use crate::error::{Result, TelemetryError};
use crate::health::{HealthState, HealthTracker};
use crate::models::{CommandResult, HeaterData, HeaterRelay};
use crate::transport::{validate_request, ChannelTransport, Endpoint};
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

pub struct HeaterClient {
    transport: ChannelTransport,
    data: HeaterData,
    health: HealthTracker,
    stale_after: Duration,
    probe: ProbeMode,
    telemetry: HeaterTelemetryClient,
}

impl HeaterClient {
    pub fn new(command: Endpoint, telemetry: Endpoint) -> Self {
        info!("Heater client initialized - Command server: {}", command);
        Self {
            transport: ChannelTransport::new(command),
            data: HeaterData::default(),
            health: HealthTracker::new(),
            stale_after: DEFAULT_STALE_AFTER,
            probe: ProbeMode::default(),
            telemetry: HeaterTelemetryClient::new(telemetry),
        }
    }

    pub fn from_config(cfg: &TelemetryConfig) -> Self {
        Self::new(cfg.heater.endpoint(), cfg.heater_telemetry.endpoint())
            .with_stale_after(secs(cfg.heater.stale_after_secs, 60.0))
            .with_probe(cfg.heater.probe)
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_probe(mut self, probe: ProbeMode) -> Self {
        self.probe = probe;
        self
    }

    /// Sends `command` and interprets the acknowledgement.
    ///
    /// `Ok(true)` only for a reply of exactly `"1"`. Any other reply, a
    /// timeout or a socket fault is `Ok(false)`, recorded in
    /// [`HeaterData::last_error`]. `Err` is reserved for a command that can
    /// not be sent at all (empty or oversize); it is not counted as an attempt.
    pub async fn send_command(&mut self, command: &str) -> Result<bool> {
        validate_request(command)?;
        self.health.mark_attempt();

        let outcome = self.transport.request(command).await.and_then(|reply| {
            if reply == COMMAND_ACK {
                Ok(())
            } else {
                Err(TelemetryError::CommandRejected {
                    command: command.to_string(),
                    reply,
                })
            }
        });

        let timestamp = OffsetDateTime::now_utc();
        match outcome {
            Ok(()) => {
                self.health.record_success();
                self.data.system_online = true;
                self.data.last_error.clear();
                self.data.last_command = Some(CommandResult {
                    command: command.to_string(),
                    success: true,
                    error: None,
                    timestamp,
                });
                debug!("Command '{}' executed successfully", command);
                Ok(true)
            }
            Err(e) => {
                let message = describe_failure(&e);
                match &e {
                    TelemetryError::CommandRejected { reply, .. } => {
                        warn!("Command '{}' failed - Server response: {}", command, reply)
                    }
                    TelemetryError::Timeout(_) => warn!("Command '{}' timed out", command),
                    _ => error!("Command '{}' failed: {}", command, e),
                }
                self.health.record_failure();
                self.data.system_online = false;
                self.data.last_error = message.clone();
                self.data.last_command = Some(CommandResult {
                    command: command.to_string(),
                    success: false,
                    error: Some(message),
                    timestamp,
                });
                Ok(false)
            }
        }
    }

    pub async fn toggle(&mut self, relay: HeaterRelay) -> Result<bool> {
        self.send_command(relay.command()).await
    }

    /// Star camera heater (`toggle_lockpin`).
    pub async fn toggle_starcam(&mut self) -> Result<bool> {
        self.toggle(HeaterRelay::StarCamera).await
    }

    /// Motor heater (`toggle_starcamera`).
    pub async fn toggle_motor(&mut self) -> Result<bool> {
        self.toggle(HeaterRelay::Motor).await
    }

    /// Ethernet heater (`toggle_PV`).
    pub async fn toggle_ethernet(&mut self) -> Result<bool> {
        self.toggle(HeaterRelay::Ethernet).await
    }

    /// Lock pin heater. Sends the `toggle_motor` keyword, not
    /// `toggle_lockpin`: the instrument's keywords do not match the heated
    /// parts. The `toggle_lockpin` keyword drives the star camera heater
    /// ([`toggle_starcam`](Self::toggle_starcam)).
    pub async fn toggle_lockpin(&mut self) -> Result<bool> {
        self.toggle(HeaterRelay::LockPin).await
    }

    /// Spare heater, manual on/off only (`toggle_ethernet`).
    pub async fn toggle_spare(&mut self) -> Result<bool> {
        self.toggle(HeaterRelay::Spare).await
    }

    /// Checks that the heater box answers, using the configured probe.
    ///
    /// With [`ProbeMode::ToggleLockpin`] this sends a real relay command and
    /// flips the star camera heater.
    pub async fn test_connection(&mut self) -> bool {
        match self.probe {
            ProbeMode::Telemetry => self.telemetry.probe().await,
            ProbeMode::ToggleLockpin => {
                warn!(
                    "Connection test sends {} and toggles the star camera heater",
                    TOGGLE_LOCKPIN
                );
                self.send_command(TOGGLE_LOCKPIN).await.unwrap_or(false)
            }
        }
    }

    /// Refreshes the heater telemetry snapshot.
    pub async fn update_telemetry(&mut self) -> bool {
        self.telemetry.update_data().await
    }

    pub fn telemetry(&self) -> &HeaterTelemetryClient {
        &self.telemetry
    }

    pub fn data(&self) -> &HeaterData {
        &self.data
    }

    pub fn snapshot(&self) -> HeaterData {
        self.data.clone()
    }

    pub fn command_status(&self) -> HealthState {
        self.command_status_at(Instant::now())
    }

    /// Command health as of `now`. With no command attempt inside
    /// `stale_after` the heater is disconnected regardless of the streak.
    pub fn command_status_at(&self, now: Instant) -> HealthState {
        self.health
            .status_within(self.data.system_online, self.stale_after, now)
    }

    pub fn is_connected(&self) -> bool {
        self.command_status() == HealthState::Connected
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.health.consecutive_failures()
    }

    pub fn last_error(&self) -> &str {
        &self.data.last_error
    }

    pub fn probe_mode(&self) -> ProbeMode {
        self.probe
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }
}

/// Operator-facing text for a failed command.
fn describe_failure(e: &TelemetryError) -> String {
    match e {
        TelemetryError::CommandRejected { reply, .. } => format!("Server returned: {reply}"),
        TelemetryError::Timeout(after) => format!("Timeout after {}s", after.as_secs_f64()),
        TelemetryError::Transport(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HeaterClient {
        let ep = Endpoint::new("127.0.0.1", 9, Duration::from_millis(50));
        HeaterClient::new(ep.clone(), ep)
    }

    #[tokio::test]
    async fn test_empty_command_is_not_an_attempt() {
        let mut c = client();
        let err = c.send_command("").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
        assert_eq!(c.consecutive_failures(), 0);
        assert!(c.data().last_command.is_none());
    }

    #[test]
    fn test_idle_client_is_disconnected() {
        let c = client();
        assert_eq!(c.command_status(), HealthState::Disconnected);
        assert!(!c.is_connected());
        assert_eq!(c.probe_mode(), ProbeMode::Telemetry);
    }

    #[test]
    fn test_failure_messages() {
        let rejected = TelemetryError::CommandRejected {
            command: "toggle_PV".into(),
            reply: "0".into(),
        };
        assert_eq!(describe_failure(&rejected), "Server returned: 0");
        assert_eq!(
            describe_failure(&TelemetryError::Timeout(Duration::from_secs(1))),
            "Timeout after 1s"
        );
        assert_eq!(
            describe_failure(&TelemetryError::Transport("connection refused".into())),
            "connection refused"
        );
    }
}
