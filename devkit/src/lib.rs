/*!
# BVEX DevKit - stubs and helpers for telemetry client development

- Scripted UDP instrument server for tests without flight hardware
- Test harness with request expectations
- Canned nominal replies per instrument
*/

pub mod test_utils;
pub mod udp_stub;

pub use test_utils::TestHarness;
pub use udp_stub::{MockInstrumentServer, RecordedRequest, Reply};
