use bvex_devkit::test_utils::nominal_housekeeping;
use bvex_devkit::TestHarness;
use bvex_telemetry::channels::{HK_NIC_TEMP, HK_POWERED, HK_PV_PRESSURE_BAR, HOUSEKEEPING_CHANNELS};
use bvex_telemetry::classify::{PressureStatus, TemperatureStatus};
use bvex_telemetry::{Endpoint, HealthState, HousekeepingClient};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(150);

async fn setup(min_interval: Duration) -> (TestHarness, HousekeepingClient) {
    let harness = TestHarness::start()
        .await
        .unwrap()
        .with_replies(nominal_housekeeping());
    let client = HousekeepingClient::new(Endpoint::new(harness.host(), harness.port(), TIMEOUT))
        .with_min_interval(min_interval);
    (harness, client)
}

#[tokio::test]
async fn test_full_cycle_reads_every_channel() {
    let (harness, mut client) = setup(Duration::ZERO).await;

    assert!(client.update_data().await);
    let data = client.data();
    assert!(data.valid);
    assert_eq!(data.hk_powered, 1);
    assert_eq!(data.hk_running, 1);
    assert_eq!(data.hk_ocxo_temp, 45.2);
    assert_eq!(data.hk_pv_pressure_bar, 0.95);
    assert!(client.is_connected());
    assert_eq!(client.connection_status(), HealthState::Connected);

    for channel in HOUSEKEEPING_CHANNELS {
        assert_eq!(harness.server.request_count(channel), 1, "{channel}");
    }
}

#[tokio::test]
async fn test_second_call_within_min_interval_sends_nothing() {
    let (harness, mut client) = setup(Duration::from_secs(1)).await;

    assert!(client.update_data().await);
    let sent = harness.server.total_requests();
    assert_eq!(sent, HOUSEKEEPING_CHANNELS.len());

    assert!(client.update_data().await);
    assert_eq!(harness.server.total_requests(), sent);
    assert_eq!(client.connection_stats().attempts, 1);
}

#[tokio::test]
async fn test_repeated_cycles_are_stable() {
    let (_harness, mut client) = setup(Duration::ZERO).await;

    assert!(client.update_data().await);
    let first = client.snapshot();
    assert!(client.update_data().await);
    let second = client.snapshot();

    assert!(second.valid);
    assert_eq!(first.temperatures(), second.temperatures());
    assert_eq!(first.hk_pv_pressure_bar, second.hk_pv_pressure_bar);
    assert_eq!(first.hk_powered, second.hk_powered);
}

#[tokio::test]
async fn test_partial_failure_keeps_prior_values() {
    let (harness, mut client) = setup(Duration::ZERO).await;
    assert!(client.update_data().await);
    let before = client.snapshot();

    let silent = &HOUSEKEEPING_CHANNELS[..5];
    for channel in silent {
        harness.server.set_silent(*channel);
    }
    for channel in &HOUSEKEEPING_CHANNELS[5..] {
        if *channel == HK_PV_PRESSURE_BAR {
            harness.server.set_reply(*channel, "1.5");
        } else {
            harness.server.set_reply(*channel, "50.5");
        }
    }

    assert!(client.update_data().await);
    let after = client.data();
    assert!(after.valid);
    for channel in silent {
        assert_eq!(after.reading(channel), before.reading(channel), "{channel}");
    }
    assert_eq!(after.hk_powered, before.hk_powered);
    assert_eq!(after.hk_running, before.hk_running);
    assert_eq!(after.hk_nic_temp, 50.5);
    assert_eq!(after.hk_pv_pressure_bar, 1.5);
    assert_eq!(client.consecutive_failures(), 0);
}

#[tokio::test]
async fn test_stale_update_is_not_connected() {
    let (_harness, client) = setup(Duration::ZERO).await;
    let mut client = client.with_fresh_within(Duration::from_millis(100));

    assert!(client.update_data().await);
    assert!(client.is_connected());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!client.is_connected());
    assert!(!client.connection_stats().connected);
    assert_eq!(client.connection_status(), HealthState::Connected);
    assert!(client.data().valid);
}

#[tokio::test]
async fn test_all_silent_marks_invalid() {
    let (harness, mut client) = setup(Duration::ZERO).await;
    harness.server.reset();

    assert!(!client.update_data().await);
    assert!(!client.data().valid);
    assert_eq!(client.data().hk_ocxo_temp, -999.0);
    assert_eq!(client.data().hk_powered, 0);
    assert_eq!(client.consecutive_failures(), 1);
    assert_eq!(client.connection_status(), HealthState::Connecting);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_sentinel_and_garbage_replies_count_as_missing() {
    let (harness, mut client) = setup(Duration::ZERO).await;
    harness.server.reset();
    harness.server.set_reply(HK_POWERED, "N/A");
    harness.server.set_reply(HK_NIC_TEMP, "ERROR: sensor offline");
    harness.server.set_reply(HK_PV_PRESSURE_BAR, "n/a bar");

    assert!(!client.update_data().await);
    assert_eq!(client.data().hk_nic_temp, -999.0);
}

#[tokio::test]
async fn test_classification_on_snapshot() {
    let (harness, mut client) = setup(Duration::ZERO).await;
    harness.server.set_reply(HK_NIC_TEMP, "85.0");
    harness.server.set_reply(HK_PV_PRESSURE_BAR, "2.1");

    assert!(client.update_data().await);
    assert_eq!(client.temperature_status(HK_NIC_TEMP), Some(TemperatureStatus::Critical));
    assert_eq!(client.temperature_status(HK_POWERED), None);
    assert_eq!(client.pressure_status(), PressureStatus::Warning);
}

#[tokio::test]
async fn test_connection_stats_serialize() {
    let (_harness, mut client) = setup(Duration::ZERO).await;
    assert!(client.update_data().await);

    let stats = client.connection_stats();
    assert!(stats.connected);
    assert!(stats.valid_data);
    assert!(stats.last_update.is_some());

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["attempts"], 1);
    assert!(json["last_attempt"].is_string());
}
