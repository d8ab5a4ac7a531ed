use crate::transport::Endpoint;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::warn;

pub const CONFIG_ENV: &str = "BVEX_TELEMETRY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "telemetry.yaml";
const DEFAULT_TIMEOUT_SECS: f64 = 1.0;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    pub gyro: GyroConf,
    pub housekeeping: HousekeepingConf,
    pub heater: HeaterConf,
    pub heater_telemetry: HeaterTelemetryConf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GyroConf {
    pub host: String,
    pub port: u16,
    pub timeout_secs: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HousekeepingConf {
    pub host: String,
    pub port: u16,
    pub timeout_secs: f64,
    /// Cycles closer together than this return the cached validity.
    pub min_interval_secs: f64,
    /// `is_connected` needs a successful update at most this old.
    pub fresh_within_secs: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HeaterConf {
    pub host: String,
    pub port: u16,
    pub timeout_secs: f64,
    /// Without a command attempt in this window the heater reports disconnected.
    pub stale_after_secs: f64,
    pub probe: ProbeMode,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HeaterTelemetryConf {
    pub host: String,
    pub port: u16,
    pub timeout_secs: f64,
}

/// How `HeaterClient::test_connection` checks the heater box.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMode {
    /// Read `heater_running` from the telemetry server. No relay moves.
    #[default]
    Telemetry,
    /// Send `toggle_lockpin` to the command server. This physically
    /// toggles the star camera heater.
    ToggleLockpin,
}

impl Default for GyroConf {
    fn default() -> Self {
        Self {
            host: "172.20.4.170".into(),
            port: 8082,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for HousekeepingConf {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8002,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            min_interval_secs: 1.0,
            fresh_within_secs: 10.0,
        }
    }
}

impl Default for HeaterConf {
    fn default() -> Self {
        Self {
            host: "172.20.4.178".into(),
            port: 8006,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            stale_after_secs: 60.0,
            probe: ProbeMode::Telemetry,
        }
    }
}

impl Default for HeaterTelemetryConf {
    fn default() -> Self {
        Self {
            host: "172.20.4.178".into(),
            port: 8007,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Converts seconds from a config file, falling back when the value is
/// negative, NaN or too large for a `Duration`.
pub(crate) fn secs(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

impl GyroConf {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.host, self.port, secs(self.timeout_secs, DEFAULT_TIMEOUT_SECS))
    }
}

impl HousekeepingConf {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.host, self.port, secs(self.timeout_secs, DEFAULT_TIMEOUT_SECS))
    }
}

impl HeaterConf {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.host, self.port, secs(self.timeout_secs, DEFAULT_TIMEOUT_SECS))
    }
}

impl HeaterTelemetryConf {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.host, self.port, secs(self.timeout_secs, DEFAULT_TIMEOUT_SECS))
    }
}

impl TelemetryConfig {
    /// Rejects timings no client can work with.
    pub fn validate(&self) -> Result<()> {
        let timings = [
            ("gyro.timeout_secs", self.gyro.timeout_secs),
            ("housekeeping.timeout_secs", self.housekeeping.timeout_secs),
            ("housekeeping.min_interval_secs", self.housekeeping.min_interval_secs),
            ("housekeeping.fresh_within_secs", self.housekeeping.fresh_within_secs),
            ("heater.timeout_secs", self.heater.timeout_secs),
            ("heater.stale_after_secs", self.heater.stale_after_secs),
            ("heater_telemetry.timeout_secs", self.heater_telemetry.timeout_secs),
        ];
        for (name, value) in timings {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{name} must be a non-negative number of seconds, got {value}");
            }
        }
        for (name, value) in [
            ("gyro.timeout_secs", self.gyro.timeout_secs),
            ("housekeeping.timeout_secs", self.housekeeping.timeout_secs),
            ("heater.timeout_secs", self.heater.timeout_secs),
            ("heater_telemetry.timeout_secs", self.heater_telemetry.timeout_secs),
        ] {
            if value == 0.0 {
                anyhow::bail!("{name} must be greater than zero");
            }
        }
        Ok(())
    }
}

/// Reads and validates a YAML config file. An empty file means defaults.
pub async fn load_config_from(path: impl AsRef<Path>) -> Result<TelemetryConfig> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    if txt.trim().is_empty() {
        return Ok(TelemetryConfig::default());
    }
    let cfg: TelemetryConfig =
        serde_yaml::from_str(&txt).with_context(|| format!("parsing {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads `.env`, then the file named by `BVEX_TELEMETRY_CONFIG`
/// (`telemetry.yaml` by default). Never fails: problems are logged and the
/// defaults are used.
pub async fn load_config() -> TelemetryConfig {
    dotenvy::dotenv().ok();

    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    if !Path::new(&path).exists() {
        warn!("no {} found, using default telemetry endpoints", path);
        return TelemetryConfig::default();
    }

    load_config_from(&path).await.unwrap_or_else(|e| {
        warn!("invalid telemetry config {}: {:#}", path, e);
        TelemetryConfig::default()
    })
}
