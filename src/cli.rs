use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scenario::Scenario;

/// IoT Protocol Benchmark Suite - compare transport protocols under emulated network conditions
#[derive(Parser, Clone, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Protocols to benchmark (space-separated: http, mqtt, coap, or all)
    #[clap(short = 'p', long, value_enum, default_values_t = vec![Protocol::All], num_args = 1..)]
    pub protocols: Vec<Protocol>,

    /// Number of messages per combination
    #[clap(short = 'i', long, default_value_t = crate::defaults::ITERATIONS)]
    pub iterations: usize,

    /// Output file for the results table (CSV)
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_FILE)]
    pub output: PathBuf,

    /// Payload sizes in bytes to sweep over
    #[clap(long, default_values_t = crate::defaults::payload_sizes())]
    pub payload_sizes: Vec<usize>,

    /// Network-condition scenarios to sweep over
    #[clap(long, value_enum, default_values_t = Scenario::all())]
    pub scenarios: Vec<Scenario>,

    /// QoS levels for the pub/sub protocol
    #[clap(long, default_values_t = vec![0, 1, 2], value_parser = clap::value_parser!(u8).range(0..=2), num_args = 1..)]
    pub qos_levels: Vec<u8>,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Validate argument combinations that clap cannot express.
    ///
    /// Runs before the sweep; any error here is fatal by design, unlike
    /// everything that happens inside the sweep.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.iterations == 0 {
            anyhow::bail!("--iterations must be at least 1");
        }
        if self.payload_sizes.is_empty() {
            anyhow::bail!("--payload-sizes must name at least one size");
        }
        if let Some(zero) = self.payload_sizes.iter().find(|&&s| s == 0) {
            anyhow::bail!("payload size must be positive, got {}", zero);
        }
        if self.scenarios.is_empty() {
            anyhow::bail!("--scenarios must name at least one scenario");
        }
        if self.qos_levels.is_empty() {
            anyhow::bail!("--qos-levels must name at least one level");
        }
        Ok(())
    }
}

/// Transport protocols under test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Protocol {
    /// Blocking request/response over HTTP
    #[clap(name = "http")]
    Http,

    /// Publish/subscribe with QoS over MQTT
    #[clap(name = "mqtt")]
    Mqtt,

    /// Asynchronous request/response over CoAP
    #[clap(name = "coap")]
    Coap,

    /// All supported protocols
    #[clap(name = "all")]
    All,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "HTTP"),
            Protocol::Mqtt => write!(f, "MQTT"),
            Protocol::Coap => write!(f, "COAP"),
            Protocol::All => write!(f, "All Protocols"),
        }
    }
}

impl Protocol {
    /// Expand the "All" variant to every concrete protocol.
    pub fn expand_all(protocols: Vec<Protocol>) -> Vec<Protocol> {
        if protocols.contains(&Protocol::All) {
            vec![Protocol::Http, Protocol::Mqtt, Protocol::Coap]
        } else {
            protocols
        }
    }

    /// Whether the QoS dimension is meaningful for this protocol.
    ///
    /// The sweep collapses QoS to a single "no QoS" value for everything
    /// else, so only the pub/sub transport multiplies the combination count.
    pub fn supports_qos(&self) -> bool {
        matches!(self, Protocol::Mqtt)
    }
}
