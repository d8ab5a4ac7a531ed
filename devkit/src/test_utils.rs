/*!
Test harness for telemetry clients

Wraps a [`MockInstrumentServer`] with:
- logging set up for tests
- canned nominal replies for each instrument
- request-count expectations and statistics
*/

use crate::udp_stub::MockInstrumentServer;
use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;

/// Harness around one stub instrument server.
pub struct TestHarness {
    pub server: MockInstrumentServer,
    expectations: Vec<Expectation>,
}

#[derive(Debug)]
struct Expectation {
    channel: String,
    expected_count: usize,
}

impl TestHarness {
    pub async fn start() -> Result<Self> {
        env_logger::builder().is_test(true).try_init().ok();

        Ok(Self {
            server: MockInstrumentServer::start().await?,
            expectations: Vec::new(),
        })
    }

    /// Scripts steady replies for every listed channel.
    pub fn with_replies<I, C, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = (C, S)>,
        C: Into<String>,
        S: Into<String>,
    {
        self.server.load_replies(replies);
        self
    }

    pub fn host(&self) -> String {
        self.server.host()
    }

    pub fn port(&self) -> u16 {
        self.server.port()
    }

    /// Expects exactly `count` requests for `channel` by verification time.
    pub fn expect_requests(&mut self, channel: &str, count: usize) -> &mut Self {
        self.expectations.push(Expectation {
            channel: channel.to_string(),
            expected_count: count,
        });
        self
    }

    pub fn verify_expectations(&self) -> Result<()> {
        log::info!("Verifying {} expectations...", self.expectations.len());

        for expectation in &self.expectations {
            let actual = self.server.request_count(&expectation.channel);
            if actual != expectation.expected_count {
                anyhow::bail!(
                    "Expectation failed for channel '{}': expected {} requests, got {}",
                    expectation.channel,
                    expectation.expected_count,
                    actual
                );
            }
        }
        Ok(())
    }

    /// Waits until `channel` has been requested at least `count` times.
    pub async fn wait_for_requests(&self, channel: &str, count: usize, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if self.server.request_count(channel) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        log::warn!("Timeout waiting for {} requests on {}", count, channel);
        false
    }

    pub fn get_stats(&self) -> TestStats {
        let mut channel_counts = HashMap::new();
        let requests = self.server.requests();
        for req in &requests {
            *channel_counts.entry(req.payload.clone()).or_insert(0) += 1;
        }
        TestStats {
            total_requests: requests.len(),
            channel_counts,
        }
    }

    pub fn reset(&mut self) {
        self.server.reset();
        self.expectations.clear();
    }
}

#[derive(Debug)]
pub struct TestStats {
    pub total_requests: usize,
    pub channel_counts: HashMap<String, usize>,
}

/// Plausible replies for every housekeeping channel.
pub fn nominal_housekeeping() -> Vec<(&'static str, &'static str)> {
    vec![
        ("hk_powered", "1"),
        ("hk_running", "1"),
        ("hk_ocxo_temp", "45.2"),
        ("hk_ifamp_temp", "32.1"),
        ("hk_lo_temp", "35.8"),
        ("hk_tec_temp", "22.4"),
        ("hk_backend_chassis_temp", "38.0"),
        ("hk_nic_temp", "51.7"),
        ("hk_rfsoc_chassis_temp", "40.3"),
        ("hk_rfsoc_chip_temp", "58.9"),
        ("hk_lna1_temp", "27.5"),
        ("hk_lna2_temp", "28.1"),
        ("hk_pv_pressure_bar", "0.95"),
    ]
}

/// Plausible replies for every heater telemetry channel.
pub fn nominal_heater_telemetry() -> Vec<(String, String)> {
    let mut replies = vec![
        ("heater_running".to_string(), "1".to_string()),
        ("heater_total_current".to_string(), "3.2".to_string()),
    ];
    for (i, relay) in ["starcam", "motor", "ethernet", "lockpin", "spare"].iter().enumerate() {
        replies.push((format!("heater_{relay}_temp"), format!("{}", 20 + i)));
        replies.push((format!("heater_{relay}_current"), "0.6".to_string()));
        replies.push((
            format!("heater_{relay}_state"),
            if i % 2 == 0 { "1" } else { "0" }.to_string(),
        ));
    }
    replies
}
