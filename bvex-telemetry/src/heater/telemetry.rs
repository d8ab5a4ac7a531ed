use crate::channels::{self, HEATER_RUNNING, HEATER_TOTAL_CURRENT};
use crate::config::HeaterTelemetryConf;
use crate::error::Result;
use crate::health::{HealthState, HealthTracker};
use crate::models::{HeaterRelay, HeaterTelemetry};
use crate::transport::{ChannelTransport, Endpoint};
use futures::future::join_all;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Which field of [`HeaterTelemetry`] a channel feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Running,
    TotalCurrent,
    Temp(HeaterRelay),
    Current(HeaterRelay),
    State(HeaterRelay),
}

impl Field {
    fn channel(&self) -> String {
        match self {
            Field::Running => HEATER_RUNNING.to_string(),
            Field::TotalCurrent => HEATER_TOTAL_CURRENT.to_string(),
            Field::Temp(r) => channels::heater_temp_channel(r.telemetry_name()),
            Field::Current(r) => channels::heater_current_channel(r.telemetry_name()),
            Field::State(r) => channels::heater_state_channel(r.telemetry_name()),
        }
    }

    fn all() -> Vec<Field> {
        let mut fields = vec![Field::Running, Field::TotalCurrent];
        for relay in HeaterRelay::ALL {
            fields.extend([Field::Temp(relay), Field::Current(relay), Field::State(relay)]);
        }
        fields
    }
}

/// Reads the heater box's own telemetry server: run flag, total current and
/// per-relay temperature, current and on/off state.
pub struct HeaterTelemetryClient {
    transport: ChannelTransport,
    data: HeaterTelemetry,
    health: HealthTracker,
    last_error: String,
}

impl HeaterTelemetryClient {
    pub fn new(endpoint: Endpoint) -> Self {
        info!("Heater telemetry client initialized - Server: {}", endpoint);
        Self {
            transport: ChannelTransport::new(endpoint),
            data: HeaterTelemetry::default(),
            health: HealthTracker::new(),
            last_error: String::new(),
        }
    }

    pub fn from_config(cfg: &HeaterTelemetryConf) -> Self {
        Self::new(cfg.endpoint())
    }

    /// Polls every heater channel. Same policy as housekeeping: one usable
    /// reply makes the cycle a success, failed channels keep their values.
    pub async fn update_data(&mut self) -> bool {
        self.health.mark_attempt();

        let transport = &self.transport;
        let replies = join_all(Field::all().into_iter().map(|field| async move {
            let channel = field.channel();
            let reply = transport.request(&channel).await;
            (field, channel, reply)
        }))
        .await;

        let mut any_valid = false;
        for (field, channel, reply) in replies {
            match reply.and_then(|reply| self.apply(field, &channel, &reply)) {
                Ok(()) => any_valid = true,
                Err(e) => {
                    debug!("Soft failure for {}: {}", channel, e);
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

    fn apply(&mut self, field: Field, channel: &str, reply: &str) -> Result<()> {
        match field {
            Field::Running => {
                self.data.running = channels::check_reply(channel, reply)? == "1";
            }
            Field::TotalCurrent => {
                self.data.total_current = channels::parse_f64(channel, reply)?;
            }
            Field::Temp(relay) => {
                self.data.relay_mut(relay).temp = channels::parse_f64(channel, reply)?;
            }
            Field::Current(relay) => {
                self.data.relay_mut(relay).current = channels::parse_f64(channel, reply)?;
            }
            Field::State(relay) => {
                self.data.relay_mut(relay).state = match channels::check_reply(channel, reply)? {
                    "1" => Some(true),
                    "0" => Some(false),
                    _ => None,
                };
            }
        }
        Ok(())
    }

    /// Side-effect-free reachability check: asks for `heater_running` and
    /// reports whether a usable reply came back. Counters are untouched.
    pub async fn probe(&self) -> bool {
        match self
            .transport
            .request(HEATER_RUNNING)
            .await
            .and_then(|reply| channels::check_reply(HEATER_RUNNING, &reply).map(|_| ()))
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Heater telemetry probe failed: {}", e);
                false
            }
        }
    }

    pub fn data(&self) -> &HeaterTelemetry {
        &self.data
    }

    pub fn snapshot(&self) -> HeaterTelemetry {
        self.data.clone()
    }

    pub fn connection_status(&self) -> HealthState {
        self.health.status(self.data.valid)
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status() == HealthState::Connected
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.health.consecutive_failures()
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }
}
