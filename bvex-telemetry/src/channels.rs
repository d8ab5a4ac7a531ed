//! Channel names, command keywords and reply sentinels spoken by the
//! instrument telemetry servers.

use crate::error::{Result, TelemetryError};

pub const TIMEOUT_SENTINEL: &str = "TIMEOUT";
pub const UNAVAILABLE_SENTINEL: &str = "N/A";
pub const ERROR_PREFIX: &str = "ERROR";

/// Placeholder for a temperature or pressure that has never been read.
pub const UNSET_READING: f64 = -999.0;

/// Largest reply datagram accepted from a server.
pub const MAX_REPLY_BYTES: usize = 1024;

/// Largest request the servers read in one datagram.
pub const MAX_REQUEST_BYTES: usize = 1024;

// Gyroscope (BCP Sag position sensor)
pub const POS_SPI_GYRO_RATE: &str = "pos_spi_gyro_rate";
pub const POS_STATUS: &str = "pos_status";
pub const POS_RUNNING: &str = "pos_running";

// Housekeeping (BCP Ophiuchus)
pub const HK_POWERED: &str = "hk_powered";
pub const HK_RUNNING: &str = "hk_running";
pub const HK_OCXO_TEMP: &str = "hk_ocxo_temp";
pub const HK_IFAMP_TEMP: &str = "hk_ifamp_temp";
pub const HK_LO_TEMP: &str = "hk_lo_temp";
pub const HK_TEC_TEMP: &str = "hk_tec_temp";
pub const HK_BACKEND_CHASSIS_TEMP: &str = "hk_backend_chassis_temp";
pub const HK_NIC_TEMP: &str = "hk_nic_temp";
pub const HK_RFSOC_CHASSIS_TEMP: &str = "hk_rfsoc_chassis_temp";
pub const HK_RFSOC_CHIP_TEMP: &str = "hk_rfsoc_chip_temp";
pub const HK_LNA1_TEMP: &str = "hk_lna1_temp";
pub const HK_LNA2_TEMP: &str = "hk_lna2_temp";
pub const HK_PV_PRESSURE_BAR: &str = "hk_pv_pressure_bar";

pub const HK_TEMPERATURE_CHANNELS: [&str; 10] = [
    HK_OCXO_TEMP,
    HK_IFAMP_TEMP,
    HK_LO_TEMP,
    HK_TEC_TEMP,
    HK_BACKEND_CHASSIS_TEMP,
    HK_NIC_TEMP,
    HK_RFSOC_CHASSIS_TEMP,
    HK_RFSOC_CHIP_TEMP,
    HK_LNA1_TEMP,
    HK_LNA2_TEMP,
];

/// Request order of one housekeeping cycle.
pub const HOUSEKEEPING_CHANNELS: [&str; 13] = [
    HK_POWERED,
    HK_RUNNING,
    HK_OCXO_TEMP,
    HK_IFAMP_TEMP,
    HK_LO_TEMP,
    HK_TEC_TEMP,
    HK_BACKEND_CHASSIS_TEMP,
    HK_NIC_TEMP,
    HK_RFSOC_CHASSIS_TEMP,
    HK_RFSOC_CHIP_TEMP,
    HK_LNA1_TEMP,
    HK_LNA2_TEMP,
    HK_PV_PRESSURE_BAR,
];

// Heater relay commands
pub const TOGGLE_LOCKPIN: &str = "toggle_lockpin";
pub const TOGGLE_STARCAMERA: &str = "toggle_starcamera";
pub const TOGGLE_PV: &str = "toggle_PV";
pub const TOGGLE_MOTOR: &str = "toggle_motor";
pub const TOGGLE_ETHERNET: &str = "toggle_ethernet";

/// The only reply a heater server sends for an accepted command.
pub const COMMAND_ACK: &str = "1";

// Heater telemetry
pub const HEATER_RUNNING: &str = "heater_running";
pub const HEATER_TOTAL_CURRENT: &str = "heater_total_current";

pub fn heater_temp_channel(relay: &str) -> String {
    format!("heater_{relay}_temp")
}

pub fn heater_current_channel(relay: &str) -> String {
    format!("heater_{relay}_current")
}

pub fn heater_state_channel(relay: &str) -> String {
    format!("heater_{relay}_state")
}

/// Returns true for the out-of-band strings that mean "no reading".
pub fn is_sentinel(reply: &str) -> bool {
    reply == TIMEOUT_SENTINEL || reply == UNAVAILABLE_SENTINEL || reply.starts_with(ERROR_PREFIX)
}

/// Rejects replies a server uses to signal that it has nothing for `channel`.
pub fn check_reply<'a>(channel: &str, reply: &'a str) -> Result<&'a str> {
    if is_sentinel(reply) {
        return Err(TelemetryError::Unavailable {
            channel: channel.to_string(),
            reply: reply.to_string(),
        });
    }
    Ok(reply)
}

pub fn parse_f64(channel: &str, reply: &str) -> Result<f64> {
    check_reply(channel, reply)?
        .parse::<f64>()
        .map_err(|_| TelemetryError::Parse {
            channel: channel.to_string(),
            reply: reply.to_string(),
        })
}

pub fn parse_i64(channel: &str, reply: &str) -> Result<i64> {
    check_reply(channel, reply)?
        .parse::<i64>()
        .map_err(|_| TelemetryError::Parse {
            channel: channel.to_string(),
            reply: reply.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(is_sentinel("TIMEOUT"));
        assert!(is_sentinel("N/A"));
        assert!(is_sentinel("ERROR: unknown channel"));
        assert!(!is_sentinel("12.5"));
        assert!(!is_sentinel(""));
    }

    #[test]
    fn test_parse_numeric_replies() {
        assert_eq!(parse_f64(HK_LNA1_TEMP, "23.75").unwrap(), 23.75);
        assert_eq!(parse_i64(HK_POWERED, "1").unwrap(), 1);

        let err = parse_f64(HK_LNA1_TEMP, "warm").unwrap_err();
        assert_eq!(err.kind(), "parse");

        let err = parse_f64(HK_LNA1_TEMP, "N/A").unwrap_err();
        assert_eq!(err.kind(), "unavailable");

        assert!(parse_i64(HK_POWERED, "1.0").is_err());
    }

    #[test]
    fn test_catalog_shape() {
        assert_eq!(HOUSEKEEPING_CHANNELS.len(), 13);
        for ch in HK_TEMPERATURE_CHANNELS {
            assert!(HOUSEKEEPING_CHANNELS.contains(&ch));
        }
        assert_eq!(heater_state_channel("motor"), "heater_motor_state");
    }
}
