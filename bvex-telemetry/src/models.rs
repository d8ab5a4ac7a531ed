//! Snapshot records owned by the clients and copied out to readers.

use crate::channels::{self, UNSET_READING};
use serde::Serialize;
use time::OffsetDateTime;

/// Latest SPI rate-gyroscope reading from the BCP Sag position sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GyroData {
    /// Angular velocity, deg/s.
    pub spi_rate: f64,
    pub pos_status: String,
    pub pos_running: i64,
    pub valid: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
}

impl Default for GyroData {
    fn default() -> Self {
        Self {
            spi_rate: 0.0,
            pos_status: channels::UNAVAILABLE_SENTINEL.to_string(),
            pos_running: 0,
            valid: false,
            timestamp: None,
        }
    }
}

/// Housekeeping sensors of the BCP Ophiuchus aggregator.
///
/// Temperatures are in °C, pressure in bar. A field still at `-999.0` has
/// never been read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HousekeepingData {
    pub valid: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,

    pub hk_powered: i64,
    pub hk_running: i64,

    // I2C
    pub hk_ocxo_temp: f64,
    // Analog frontend (LM335)
    pub hk_ifamp_temp: f64,
    pub hk_lo_temp: f64,
    pub hk_tec_temp: f64,
    // Analog backend (LM335)
    pub hk_backend_chassis_temp: f64,
    pub hk_nic_temp: f64,
    pub hk_rfsoc_chassis_temp: f64,
    pub hk_rfsoc_chip_temp: f64,
    // LNA box (LM335)
    pub hk_lna1_temp: f64,
    pub hk_lna2_temp: f64,

    pub hk_pv_pressure_bar: f64,
}

impl Default for HousekeepingData {
    fn default() -> Self {
        Self {
            valid: false,
            timestamp: None,
            hk_powered: 0,
            hk_running: 0,
            hk_ocxo_temp: UNSET_READING,
            hk_ifamp_temp: UNSET_READING,
            hk_lo_temp: UNSET_READING,
            hk_tec_temp: UNSET_READING,
            hk_backend_chassis_temp: UNSET_READING,
            hk_nic_temp: UNSET_READING,
            hk_rfsoc_chassis_temp: UNSET_READING,
            hk_rfsoc_chip_temp: UNSET_READING,
            hk_lna1_temp: UNSET_READING,
            hk_lna2_temp: UNSET_READING,
            hk_pv_pressure_bar: UNSET_READING,
        }
    }
}

impl HousekeepingData {
    /// Floating-point field fed by `channel`, if it is one.
    pub fn reading(&self, channel: &str) -> Option<f64> {
        let value = match channel {
            channels::HK_OCXO_TEMP => self.hk_ocxo_temp,
            channels::HK_IFAMP_TEMP => self.hk_ifamp_temp,
            channels::HK_LO_TEMP => self.hk_lo_temp,
            channels::HK_TEC_TEMP => self.hk_tec_temp,
            channels::HK_BACKEND_CHASSIS_TEMP => self.hk_backend_chassis_temp,
            channels::HK_NIC_TEMP => self.hk_nic_temp,
            channels::HK_RFSOC_CHASSIS_TEMP => self.hk_rfsoc_chassis_temp,
            channels::HK_RFSOC_CHIP_TEMP => self.hk_rfsoc_chip_temp,
            channels::HK_LNA1_TEMP => self.hk_lna1_temp,
            channels::HK_LNA2_TEMP => self.hk_lna2_temp,
            channels::HK_PV_PRESSURE_BAR => self.hk_pv_pressure_bar,
            _ => return None,
        };
        Some(value)
    }

    pub(crate) fn reading_mut(&mut self, channel: &str) -> Option<&mut f64> {
        let field = match channel {
            channels::HK_OCXO_TEMP => &mut self.hk_ocxo_temp,
            channels::HK_IFAMP_TEMP => &mut self.hk_ifamp_temp,
            channels::HK_LO_TEMP => &mut self.hk_lo_temp,
            channels::HK_TEC_TEMP => &mut self.hk_tec_temp,
            channels::HK_BACKEND_CHASSIS_TEMP => &mut self.hk_backend_chassis_temp,
            channels::HK_NIC_TEMP => &mut self.hk_nic_temp,
            channels::HK_RFSOC_CHASSIS_TEMP => &mut self.hk_rfsoc_chassis_temp,
            channels::HK_RFSOC_CHIP_TEMP => &mut self.hk_rfsoc_chip_temp,
            channels::HK_LNA1_TEMP => &mut self.hk_lna1_temp,
            channels::HK_LNA2_TEMP => &mut self.hk_lna2_temp,
            channels::HK_PV_PRESSURE_BAR => &mut self.hk_pv_pressure_bar,
            _ => return None,
        };
        Some(field)
    }

    pub(crate) fn counter_mut(&mut self, channel: &str) -> Option<&mut i64> {
        match channel {
            channels::HK_POWERED => Some(&mut self.hk_powered),
            channels::HK_RUNNING => Some(&mut self.hk_running),
            _ => None,
        }
    }

    /// All temperature fields in channel order.
    pub fn temperatures(&self) -> Vec<(&'static str, f64)> {
        channels::HK_TEMPERATURE_CHANNELS
            .iter()
            .filter_map(|ch| self.reading(ch).map(|v| (*ch, v)))
            .collect()
    }
}

/// Heater relays, named after the component they warm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaterRelay {
    StarCamera,
    Motor,
    Ethernet,
    LockPin,
    Spare,
}

impl HeaterRelay {
    pub const ALL: [HeaterRelay; 5] = [
        HeaterRelay::StarCamera,
        HeaterRelay::Motor,
        HeaterRelay::Ethernet,
        HeaterRelay::LockPin,
        HeaterRelay::Spare,
    ];

    /// Keyword the heater server expects to toggle this relay.
    ///
    /// The server's keywords are wired to different heaters than their
    /// names suggest: `toggle_lockpin` drives the star camera heater, and so on.
    pub fn command(&self) -> &'static str {
        match self {
            HeaterRelay::StarCamera => channels::TOGGLE_LOCKPIN,
            HeaterRelay::Motor => channels::TOGGLE_STARCAMERA,
            HeaterRelay::Ethernet => channels::TOGGLE_PV,
            HeaterRelay::LockPin => channels::TOGGLE_MOTOR,
            HeaterRelay::Spare => channels::TOGGLE_ETHERNET,
        }
    }

    /// Component name used in `heater_<name>_*` telemetry channels.
    pub fn telemetry_name(&self) -> &'static str {
        match self {
            HeaterRelay::StarCamera => "starcam",
            HeaterRelay::Motor => "motor",
            HeaterRelay::Ethernet => "ethernet",
            HeaterRelay::LockPin => "lockpin",
            HeaterRelay::Spare => "spare",
        }
    }
}

/// Outcome of the most recent heater command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub command: String,
    pub success: bool,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Command-side view of the heater system.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeaterData {
    pub system_online: bool,
    pub last_command: Option<CommandResult>,
    pub last_error: String,
}

impl HeaterData {
    pub fn last_command_success(&self) -> Option<bool> {
        self.last_command.as_ref().map(|c| c.success)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelayReading {
    /// °C
    pub temp: f64,
    /// A
    pub current: f64,
    /// `None` until the server reports a plain `0` or `1`.
    pub state: Option<bool>,
}

/// Telemetry of the heater box, read from its own telemetry server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeaterTelemetry {
    pub valid: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    pub running: bool,
    pub total_current: f64,
    pub starcam: RelayReading,
    pub motor: RelayReading,
    pub ethernet: RelayReading,
    pub lockpin: RelayReading,
    pub spare: RelayReading,
}

impl HeaterTelemetry {
    pub fn relay(&self, relay: HeaterRelay) -> &RelayReading {
        match relay {
            HeaterRelay::StarCamera => &self.starcam,
            HeaterRelay::Motor => &self.motor,
            HeaterRelay::Ethernet => &self.ethernet,
            HeaterRelay::LockPin => &self.lockpin,
            HeaterRelay::Spare => &self.spare,
        }
    }

    pub(crate) fn relay_mut(&mut self, relay: HeaterRelay) -> &mut RelayReading {
        match relay {
            HeaterRelay::StarCamera => &mut self.starcam,
            HeaterRelay::Motor => &mut self.motor,
            HeaterRelay::Ethernet => &mut self.ethernet,
            HeaterRelay::LockPin => &mut self.lockpin,
            HeaterRelay::Spare => &mut self.spare,
        }
    }
}
