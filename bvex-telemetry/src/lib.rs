//! Client core for the BVEX ground station's instrument telemetry.
//!
//! Three independent clients talk to remote instrument controllers over a
//! one-datagram request/reply UDP protocol:
//! - [`gyro::GyroClient`]: SPI rate gyroscope (BCP Sag)
//! - [`housekeeping::HousekeepingClient`]: temperatures, pressure, status flags (BCP Ophiuchus)
//! - [`heater::HeaterClient`]: heater relay commands plus heater telemetry
//!
//! Each client owns its snapshot, failure streak and endpoint. Callers drive
//! poll cycles themselves or hand a client to [`monitor::spawn_monitor`].

pub mod channels;
pub mod classify;
pub mod config;
pub mod error;
pub mod gyro;
pub mod health;
pub mod heater;
pub mod housekeeping;
pub mod models;
pub mod monitor;
pub mod state;
pub mod transport;

pub use config::{load_config, ProbeMode, TelemetryConfig};
pub use error::{Result, TelemetryError};
pub use gyro::GyroClient;
pub use health::{HealthState, HealthTracker};
pub use heater::{HeaterClient, HeaterTelemetryClient};
pub use housekeeping::{ConnectionStats, HousekeepingClient};
pub use models::{
    CommandResult, GyroData, HeaterData, HeaterRelay, HeaterTelemetry, HousekeepingData,
    RelayReading,
};
pub use transport::{ChannelTransport, Endpoint};
