//! # IoT Protocol Benchmark Suite Library
//!
//! Benchmarks competing IoT transport protocols under controlled, emulated
//! network conditions and reduces the raw per-message measurements to
//! comparable latency, throughput and loss statistics.
//!
//! ## Protocols Under Test
//!
//! - **HTTP**: blocking-style request/response against an ingest endpoint
//! - **MQTT**: publish/subscribe with QoS 0/1/2, receipts correlated by an
//!   embedded send timestamp
//! - **CoAP**: asynchronous request/response over datagram transport
//!
//! ## Architecture Overview
//!
//! - `sweep`: combination enumeration and the strictly sequential driver
//! - `scenario`: named network-condition profiles and delay emulation
//! - `transport`: the strategy trait, availability probing, and one
//!   strategy per protocol family
//! - `metrics`: per-message samples and the reduction to summary rows
//! - `results`: row accumulation and CSV table persistence
//! - `cli` / `endpoints`: command-line surface and environment-configured
//!   server endpoints
//! - `payload`: opaque target-size payload construction
//!
//! Combinations never run concurrently; each transport strategy owns its
//! own connection or session and tears it down before the sweep moves on.
//! An unusable transport downgrades to a skip with a diagnostic, so a
//! partially available lab still produces a useful table.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use iot_bench::{EndpointConfig, ResultSink, SweepConfig, SweepRunner};
//! use iot_bench::{Protocol, Scenario};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SweepConfig {
//!         protocols: vec![Protocol::Http, Protocol::Coap],
//!         iterations: 50,
//!         scenarios: Scenario::all(),
//!         payload_sizes: vec![32, 1024],
//!         qos_levels: vec![0, 1, 2],
//!     };
//!
//!     let endpoints = EndpointConfig::from_env()?;
//!     let mut sink = ResultSink::new("results/metrics.csv");
//!     SweepRunner::new(config, &endpoints)?.run(&mut sink).await?;
//!     sink.finalize()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod endpoints;
pub mod metrics;
pub mod payload;
pub mod results;
pub mod scenario;
pub mod sweep;
pub mod transport;

// Re-export the types most library users touch.
pub use cli::{Args, Protocol};
pub use endpoints::{Endpoint, EndpointConfig};
pub use metrics::{summarize, ResultRow, Sample, SampleSet};
pub use results::ResultSink;
pub use scenario::Scenario;
pub use sweep::{enumerate_combinations, Combination, SweepConfig, SweepRunner};
pub use transport::{SkipReason, TransportStrategy};

/// Crate version, recorded for reproducibility in logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Messages per combination. Matches the measurement campaign this
    /// suite reports into; enough for stable percentiles at lab scale.
    pub const ITERATIONS: usize = 50;

    /// Default output table location.
    pub const OUTPUT_FILE: &str = "results/metrics.csv";

    /// Payload sizes swept by default: a small sensor reading, a typical
    /// telemetry batch, and a firmware-chunk-sized blob.
    pub fn payload_sizes() -> Vec<usize> {
        vec![32, 1024, 10 * 1024]
    }

    /// Per-call timeout for request/response exchanges. A call that misses
    /// it is recorded with the penalty latency.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

    /// Ceiling on waiting for pub/sub receipts after the publish loop.
    /// Bounds a combination's runtime even under total message loss.
    pub const COMPLETION_CEILING: Duration = Duration::from_secs(5);

    /// Bound on broker/session establishment before a combination is
    /// counted as a setup failure.
    pub const SETUP_TIMEOUT: Duration = Duration::from_secs(5);

    /// Bound on the one-shot availability probe per transport.
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
}
