use bvex_devkit::TestHarness;
use bvex_telemetry::channels::POS_SPI_GYRO_RATE;
use bvex_telemetry::config::load_config_from;
use bvex_telemetry::monitor::spawn_monitor;
use bvex_telemetry::state::{new_state, Shared};
use bvex_telemetry::{Endpoint, GyroClient, HealthState, HeaterClient, ProbeMode};
use std::io::Write;
use std::time::Duration;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[tokio::test]
async fn test_monitor_publishes_cycles() {
    init_tracing();
    let harness = TestHarness::start().await.unwrap();
    harness.server.set_reply(POS_SPI_GYRO_RATE, "0.25");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "gyro:\n  host: {}\n  port: {}\n  timeout_secs: 0.2",
        harness.host(),
        harness.port()
    )
    .unwrap();
    let config = load_config_from(file.path()).await.unwrap();

    let client = new_state(GyroClient::from_config(&config.gyro));
    let monitor = spawn_monitor(client.clone(), Duration::from_millis(50));
    let mut updates = monitor.subscribe();

    let update = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            updates.changed().await.unwrap();
            let update = *updates.borrow();
            if update.cycles >= 2 {
                return update;
            }
        }
    })
    .await
    .unwrap();

    assert!(update.last_ok);
    assert_eq!(update.health, HealthState::Connected);
    assert!(monitor.is_running());
    monitor.stop();

    assert_eq!(client.lock().await.data().spi_rate, 0.25);
    assert!(harness.server.request_count(POS_SPI_GYRO_RATE) >= 2);
}

#[tokio::test]
async fn test_heater_from_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let yaml = "heater:\n  host: 127.0.0.1\n  port: 9006\n  probe: toggle_lockpin\n\
                heater_telemetry:\n  port: 9007";
    writeln!(file, "{yaml}").unwrap();
    let config = load_config_from(file.path()).await.unwrap();

    let client = HeaterClient::from_config(&config);
    assert_eq!(client.endpoint().to_string(), "127.0.0.1:9006");
    assert_eq!(client.telemetry().endpoint().port, 9007);
    assert_eq!(client.probe_mode(), ProbeMode::ToggleLockpin);
}

async fn gyro_monitor_setup() -> (TestHarness, Shared<GyroClient>) {
    let harness = TestHarness::start().await.unwrap();
    harness.server.set_reply(POS_SPI_GYRO_RATE, "1.0");
    let endpoint = Endpoint::new(harness.host(), harness.port(), Duration::from_millis(200));
    (harness, new_state(GyroClient::new(endpoint)))
}

#[tokio::test]
async fn test_latest_matches_delivered_update() {
    let (_harness, client) = gyro_monitor_setup().await;
    let monitor = spawn_monitor(client, Duration::from_secs(10));
    let mut updates = monitor.subscribe();

    tokio::time::timeout(Duration::from_secs(2), updates.changed())
        .await
        .unwrap()
        .unwrap();
    let delivered = *updates.borrow();

    assert_eq!(monitor.latest(), delivered);
    assert_eq!(delivered.cycles, 1);
    assert!(delivered.last_ok);
    monitor.stop();
}

#[tokio::test]
async fn test_monitor_ends_when_readers_are_gone() {
    let (harness, client) = gyro_monitor_setup().await;
    let monitor = spawn_monitor(client, Duration::from_millis(20));
    assert!(
        harness
            .wait_for_requests(POS_SPI_GYRO_RATE, 2, Duration::from_secs(2))
            .await
    );

    drop(monitor);
    // One more cycle may run before the send fails.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = harness.server.request_count(POS_SPI_GYRO_RATE);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.server.request_count(POS_SPI_GYRO_RATE), settled);
}

#[tokio::test]
async fn test_stop_ends_polling() {
    let (harness, client) = gyro_monitor_setup().await;
    let monitor = spawn_monitor(client.clone(), Duration::from_millis(20));
    let _reader = monitor.subscribe();
    assert!(
        harness
            .wait_for_requests(POS_SPI_GYRO_RATE, 2, Duration::from_secs(2))
            .await
    );

    monitor.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = harness.server.request_count(POS_SPI_GYRO_RATE);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.server.request_count(POS_SPI_GYRO_RATE), settled);

    // Lock is free again once the task is gone.
    assert!(client.try_lock().is_ok());
}
