//! Client for the single-axis SPI rate gyroscope behind the BCP Sag
//! telemetry server.

use crate::channels::{self, POS_RUNNING, POS_SPI_GYRO_RATE, POS_STATUS};
use crate::config::GyroConf;
use crate::health::{HealthState, HealthTracker};
use crate::models::GyroData;
use crate::transport::{ChannelTransport, Endpoint};
use time::OffsetDateTime;
use tracing::{debug, info};

pub struct GyroClient {
    transport: ChannelTransport,
    data: GyroData,
    health: HealthTracker,
    last_error: String,
}

impl GyroClient {
    pub fn new(endpoint: Endpoint) -> Self {
        info!("Gyro client initialized - Server: {}", endpoint);
        Self {
            transport: ChannelTransport::new(endpoint),
            data: GyroData::default(),
            health: HealthTracker::new(),
            last_error: String::new(),
        }
    }

    pub fn from_config(cfg: &GyroConf) -> Self {
        Self::new(cfg.endpoint())
    }

    /// Runs one poll cycle: a single `pos_spi_gyro_rate` request.
    ///
    /// Any failure (timeout, transport fault, sentinel or non-numeric reply)
    /// fails the cycle and leaves the last rate in place with `valid = false`.
    pub async fn update_data(&mut self) -> bool {
        self.health.mark_attempt();

        let rate = self
            .transport
            .request(POS_SPI_GYRO_RATE)
            .await
            .and_then(|reply| channels::parse_f64(POS_SPI_GYRO_RATE, &reply));

        match rate {
            Ok(rate) => {
                self.data.spi_rate = rate;
                self.data.valid = true;
                self.data.timestamp = Some(OffsetDateTime::now_utc());
                self.health.record_success();
                self.last_error.clear();
                debug!("SPI gyro rate updated: {:.3} deg/s", rate);
                true
            }
            Err(e) => {
                debug!("SPI gyro request failed: {}", e);
                self.data.valid = false;
                self.health.record_failure();
                self.last_error = e.to_string();
                false
            }
        }
    }

    /// Refreshes `pos_status` and `pos_running`.
    ///
    /// These are informational: failures are logged and never touch `valid`
    /// or the failure streak. Returns true if both channels answered.
    pub async fn update_status(&mut self) -> bool {
        let mut complete = true;

        match self
            .transport
            .request(POS_STATUS)
            .await
            .and_then(|reply| channels::check_reply(POS_STATUS, &reply).map(str::to_string))
        {
            Ok(status) => self.data.pos_status = status,
            Err(e) => {
                debug!("pos_status unavailable: {}", e);
                complete = false;
            }
        }

        match self
            .transport
            .request(POS_RUNNING)
            .await
            .and_then(|reply| channels::parse_i64(POS_RUNNING, &reply))
        {
            Ok(running) => self.data.pos_running = running,
            Err(e) => {
                debug!("pos_running unavailable: {}", e);
                complete = false;
            }
        }

        complete
    }

    pub fn data(&self) -> &GyroData {
        &self.data
    }

    pub fn snapshot(&self) -> GyroData {
        self.data.clone()
    }

    pub fn connection_status(&self) -> HealthState {
        self.health.status(self.data.valid)
    }

    pub fn is_connected(&self) -> bool {
        self.data.valid && self.health.consecutive_failures() == 0
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.health.consecutive_failures()
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }
}
