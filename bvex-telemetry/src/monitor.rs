//! Background polling worker.
//!
//! A poll cycle can block for a full request timeout, so callers that must
//! stay responsive hand the client to a dedicated task and only read
//! snapshots from it.

use crate::gyro::GyroClient;
use crate::health::HealthState;
use crate::heater::HeaterTelemetryClient;
use crate::housekeeping::HousekeepingClient;
use crate::state::Shared;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// A telemetry client that refreshes its snapshot in poll cycles.
pub trait Pollable: Send + 'static {
    fn name(&self) -> &'static str;

    /// Runs one poll cycle; true if the cycle succeeded.
    fn poll(&mut self) -> impl Future<Output = bool> + Send;

    fn health(&self) -> HealthState;
}

impl Pollable for GyroClient {
    fn name(&self) -> &'static str {
        "gyro"
    }

    async fn poll(&mut self) -> bool {
        self.update_data().await
    }

    fn health(&self) -> HealthState {
        self.connection_status()
    }
}

impl Pollable for HousekeepingClient {
    fn name(&self) -> &'static str {
        "housekeeping"
    }

    async fn poll(&mut self) -> bool {
        self.update_data().await
    }

    fn health(&self) -> HealthState {
        self.connection_status()
    }
}

impl Pollable for HeaterTelemetryClient {
    fn name(&self) -> &'static str {
        "heater_telemetry"
    }

    async fn poll(&mut self) -> bool {
        self.update_data().await
    }

    fn health(&self) -> HealthState {
        self.connection_status()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonitorUpdate {
    pub cycles: u64,
    pub last_ok: bool,
    pub health: HealthState,
}

pub struct MonitorHandle {
    updates: watch::Receiver<MonitorUpdate>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn subscribe(&self) -> watch::Receiver<MonitorUpdate> {
        self.updates.clone()
    }

    pub fn latest(&self) -> MonitorUpdate {
        *self.updates.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops polling. A cycle in flight is dropped with its socket.
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Polls `client` every `period` on its own task.
///
/// Cycles that overrun `period` delay the next tick instead of bunching up.
pub fn spawn_monitor<C: Pollable>(client: Shared<C>, period: Duration) -> MonitorHandle {
    let (tx, rx) = watch::channel(MonitorUpdate {
        cycles: 0,
        last_ok: false,
        health: HealthState::Connecting,
    });

    let task = tokio::spawn(async move {
        let name = client.lock().await.name();
        info!("[{}] starting telemetry monitor (period: {:?})", name, period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            ticker.tick().await;

            let (last_ok, health) = {
                let mut guard = client.lock().await;
                let ok = guard.poll().await;
                (ok, guard.health())
            };
            cycles += 1;
            debug!("[{}] cycle {} ok={} health={}", name, cycles, last_ok, health);

            let update = MonitorUpdate {
                cycles,
                last_ok,
                health,
            };
            if tx.send(update).is_err() {
                info!("[{}] no readers left, stopping monitor", name);
                break;
            }
        }
    });

    MonitorHandle { updates: rx, task }
}
