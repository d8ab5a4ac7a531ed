//! Client for the BCP Ophiuchus housekeeping aggregator: status flags,
//! ten temperatures and the pump-down valve pressure.

use crate::channels::{self, HOUSEKEEPING_CHANNELS};
use crate::classify::{self, PressureStatus, TemperatureStatus};
use crate::config::{secs, HousekeepingConf};
use crate::error::{Result, TelemetryError};
use crate::health::{HealthState, HealthTracker};
use crate::models::HousekeepingData;
use crate::transport::{ChannelTransport, Endpoint};
use futures::future::join_all;
use serde::Serialize;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tracing::{debug, info};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_FRESH_WITHIN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStats {
    pub attempts: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_attempt: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_update: Option<OffsetDateTime>,
    pub connected: bool,
    pub valid_data: bool,
    pub consecutive_failures: u32,
    pub last_error: String,
}

pub struct HousekeepingClient {
    transport: ChannelTransport,
    data: HousekeepingData,
    health: HealthTracker,
    min_interval: Duration,
    fresh_within: Duration,
    last_cycle_start: Option<Instant>,
    last_error: String,
}

impl HousekeepingClient {
    pub fn new(endpoint: Endpoint) -> Self {
        info!("Housekeeping client initialized - Server: {}", endpoint);
        Self {
            transport: ChannelTransport::new(endpoint),
            data: HousekeepingData::default(),
            health: HealthTracker::new(),
            min_interval: DEFAULT_MIN_INTERVAL,
            fresh_within: DEFAULT_FRESH_WITHIN,
            last_cycle_start: None,
            last_error: String::new(),
        }
    }

    pub fn from_config(cfg: &HousekeepingConf) -> Self {
        Self::new(cfg.endpoint())
            .with_min_interval(secs(cfg.min_interval_secs, 1.0))
            .with_fresh_within(secs(cfg.fresh_within_secs, 10.0))
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_fresh_within(mut self, fresh_within: Duration) -> Self {
        self.fresh_within = fresh_within;
        self
    }

    /// Runs one poll cycle over every housekeeping channel.
    ///
    /// A call within `min_interval` of the previous cycle start does nothing
    /// and returns the cached validity. Channels are requested concurrently,
    /// so a cycle waits at most one timeout. The cycle succeeds when at least
    /// one channel produced a usable value; channels that failed keep their
    /// previous value.
    pub async fn update_data(&mut self) -> bool {
        let now = Instant::now();
        if let Some(prev) = self.last_cycle_start {
            if now.saturating_duration_since(prev) < self.min_interval {
                return self.data.valid;
            }
        }
        self.last_cycle_start = Some(now);
        self.health.mark_attempt();

        let transport = &self.transport;
        let replies = join_all(
            HOUSEKEEPING_CHANNELS
                .iter()
                .copied()
                .map(|channel| async move { (channel, transport.request(channel).await) }),
        )
        .await;

        let mut any_valid = false;
        for (channel, reply) in replies {
            match reply.and_then(|reply| self.apply(channel, &reply)) {
                Ok(()) => any_valid = true,
                Err(e) => {
                    if e.is_timeout() {
                        debug!("Timeout for {}", channel);
                    } else {
                        debug!("Soft failure for {}: {}", channel, e);
                    }
                    self.last_error = e.to_string();
                }
            }
        }

        if any_valid {
            self.data.valid = true;
            self.data.timestamp = Some(OffsetDateTime::now_utc());
            self.health.record_success();
        } else {
            self.data.valid = false;
            self.health.record_failure();
        }
        any_valid
    }

    /// Parses `reply` into the field fed by `channel`.
    fn apply(&mut self, channel: &str, reply: &str) -> Result<()> {
        if let Some(field) = self.data.counter_mut(channel) {
            *field = channels::parse_i64(channel, reply)?;
        } else if let Some(field) = self.data.reading_mut(channel) {
            *field = channels::parse_f64(channel, reply)?;
        } else {
            return Err(TelemetryError::InvalidRequest(format!(
                "{channel} is not a housekeeping channel"
            )));
        }
        Ok(())
    }

    pub fn data(&self) -> &HousekeepingData {
        &self.data
    }

    pub fn snapshot(&self) -> HousekeepingData {
        self.data.clone()
    }

    pub fn connection_status(&self) -> HealthState {
        self.health.status(self.data.valid)
    }

    /// Connected, and the last successful update is recent.
    pub fn is_connected(&self) -> bool {
        self.data.valid
            && self.health.consecutive_failures() == 0
            && self
                .health
                .last_success()
                .is_some_and(|at| at.elapsed() < self.fresh_within)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.health.consecutive_failures()
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        ConnectionStats {
            attempts: self.health.connection_attempts(),
            last_attempt: self.health.last_attempt_at(),
            last_update: self.data.timestamp,
            connected: self.is_connected(),
            valid_data: self.data.valid,
            consecutive_failures: self.health.consecutive_failures(),
            last_error: self.last_error.clone(),
        }
    }

    /// Classifies the temperature fed by `channel`, or `None` for a
    /// channel that is not a temperature.
    pub fn temperature_status(&self, channel: &str) -> Option<TemperatureStatus> {
        if !channels::HK_TEMPERATURE_CHANNELS.contains(&channel) {
            return None;
        }
        self.data.reading(channel).map(classify::temperature_status)
    }

    pub fn pressure_status(&self) -> PressureStatus {
        classify::pressure_status(self.data.hk_pv_pressure_bar)
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HousekeepingClient {
        HousekeepingClient::new(Endpoint::new("127.0.0.1", 9, Duration::from_millis(50)))
    }

    #[test]
    fn test_apply_parses_typed_fields() {
        let mut c = client();
        c.apply(channels::HK_POWERED, "1").unwrap();
        c.apply(channels::HK_LNA2_TEMP, "41.25").unwrap();
        c.apply(channels::HK_PV_PRESSURE_BAR, "0.98").unwrap();

        assert_eq!(c.data().hk_powered, 1);
        assert_eq!(c.data().hk_lna2_temp, 41.25);
        assert_eq!(c.pressure_status(), PressureStatus::Normal);
    }

    #[test]
    fn test_apply_failure_keeps_previous_value() {
        let mut c = client();
        c.apply(channels::HK_NIC_TEMP, "55.0").unwrap();
        c.apply(channels::HK_RUNNING, "1").unwrap();

        assert!(c.apply(channels::HK_NIC_TEMP, "hot").is_err());
        assert!(c.apply(channels::HK_NIC_TEMP, "N/A").is_err());
        assert!(c.apply(channels::HK_RUNNING, "yes").is_err());

        assert_eq!(c.data().hk_nic_temp, 55.0);
        assert_eq!(c.data().hk_running, 1);
    }

    #[test]
    fn test_temperature_status_lookup() {
        let mut c = client();
        assert_eq!(
            c.temperature_status(channels::HK_OCXO_TEMP),
            Some(TemperatureStatus::Error)
        );
        c.apply(channels::HK_OCXO_TEMP, "65").unwrap();
        assert_eq!(
            c.temperature_status(channels::HK_OCXO_TEMP),
            Some(TemperatureStatus::Warning)
        );
        assert_eq!(c.temperature_status(channels::HK_PV_PRESSURE_BAR), None);
    }

    #[test]
    fn test_stats_before_any_cycle() {
        let stats = client().connection_stats();
        assert_eq!(stats.attempts, 0);
        assert!(!stats.connected);
        assert!(!stats.valid_data);
        assert!(stats.last_attempt.is_none());
    }
}
