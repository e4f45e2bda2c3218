//! Sweep enumeration and the sequential benchmark driver.
//!
//! The sweep is the cartesian product protocols × scenarios × payload sizes
//! × QoS levels, with the QoS dimension collapsed to a single "no QoS" value
//! for protocols where it is not meaningful. Combinations execute strictly
//! one at a time; running two concurrently would let cross-traffic corrupt
//! both measurements, so sequential execution is an invariant here, not an
//! optimization gap.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::cli::{Args, Protocol};
use crate::endpoints::EndpointConfig;
use crate::metrics::summarize;
use crate::results::ResultSink;
use crate::scenario::Scenario;
use crate::transport::{self, TransportStrategy};

/// One (protocol, scenario, payload size, QoS) tuple under test.
///
/// Immutable once enumerated; `qos` is populated only for protocols that
/// support it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub protocol: Protocol,
    pub scenario: Scenario,
    pub payload_bytes: usize,
    pub qos: Option<u8>,
}

impl std::fmt::Display for Combination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} scenario={} payload={}",
            self.protocol, self.scenario, self.payload_bytes
        )?;
        match self.qos {
            Some(qos) => write!(f, " qos={}", qos),
            None => write!(f, " qos=-"),
        }
    }
}

/// Everything the sweep needs to enumerate and execute combinations.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    /// Concrete protocols, already expanded (never contains `All`).
    pub protocols: Vec<Protocol>,
    pub iterations: usize,
    pub scenarios: Vec<Scenario>,
    pub payload_sizes: Vec<usize>,
    pub qos_levels: Vec<u8>,
}

impl SweepConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            protocols: Protocol::expand_all(args.protocols.clone()),
            iterations: args.iterations,
            scenarios: args.scenarios.clone(),
            payload_sizes: args.payload_sizes.clone(),
            qos_levels: args.qos_levels.clone(),
        }
    }
}

/// Produce the full combination set in sweep order: protocols outermost,
/// then scenarios, then payload sizes, with QoS innermost.
pub fn enumerate_combinations(config: &SweepConfig) -> Vec<Combination> {
    let mut combinations = Vec::new();
    for &protocol in &config.protocols {
        for &scenario in &config.scenarios {
            for &payload_bytes in &config.payload_sizes {
                let qos_values: Vec<Option<u8>> = if protocol.supports_qos() {
                    config.qos_levels.iter().map(|&q| Some(q)).collect()
                } else {
                    vec![None]
                };
                for qos in qos_values {
                    combinations.push(Combination {
                        protocol,
                        scenario,
                        payload_bytes,
                        qos,
                    });
                }
            }
        }
    }
    combinations
}

/// Sequential driver for one full sweep.
///
/// Strategies live in a map keyed on protocol identity, built once per
/// sweep. A custom map can be injected for testing with stub transports.
pub struct SweepRunner {
    config: SweepConfig,
    strategies: HashMap<Protocol, Box<dyn TransportStrategy>>,
}

impl SweepRunner {
    /// Build a runner with the real protocol strategies.
    pub fn new(config: SweepConfig, endpoints: &EndpointConfig) -> anyhow::Result<Self> {
        let strategies = transport::strategy_table(&config.protocols, endpoints)?;
        Ok(Self { config, strategies })
    }

    /// Build a runner over caller-provided strategies (stub transports).
    pub fn with_strategies(
        config: SweepConfig,
        strategies: HashMap<Protocol, Box<dyn TransportStrategy>>,
    ) -> Self {
        Self { config, strategies }
    }

    /// Execute every combination in order, appending one row per surviving
    /// combination to the sink.
    ///
    /// A skipped or aborted combination logs a diagnostic and the sweep
    /// continues; nothing that happens inside a single combination can
    /// terminate the run.
    pub async fn run(&mut self, sink: &mut ResultSink) -> anyhow::Result<()> {
        let combinations = enumerate_combinations(&self.config);
        info!(
            "Sweeping {} combinations, {} iterations each",
            combinations.len(),
            self.config.iterations
        );

        for combination in combinations {
            let Some(strategy) = self.strategies.get_mut(&combination.protocol) else {
                warn!("Skip {} reason=no-strategy-registered", combination);
                continue;
            };

            debug!("Running {} via {} strategy", combination, strategy.name());
            match strategy.run(&combination, self.config.iterations).await {
                Ok(sample_set) => {
                    let row = summarize(&combination, &sample_set);
                    info!(
                        "{}: {} samples, loss {:.2}%, {:.2} msg/s",
                        combination, row.iterations, row.loss_percent, row.throughput_msg_per_s
                    );
                    sink.push(row);
                }
                Err(reason) => {
                    warn!("Skip {} reason={}", combination, reason);
                }
            }
        }

        Ok(())
    }
}
