//! Transport strategy abstraction and per-protocol implementations.
//!
//! All three protocol families run behind the same measurement contract:
//! [`TransportStrategy::run`] takes one combination plus an iteration count
//! and returns either a complete [`SampleSet`] or a [`SkipReason`]. What
//! differs per family is the completion-signaling model:
//!
//! - [`http::HttpStrategy`]: blocking-style call/response, one awaited
//!   request per iteration with a per-call timeout
//! - [`mqtt::MqttStrategy`]: publish loop plus a concurrent receive task,
//!   correlated by an embedded send timestamp, bounded by a completion
//!   ceiling
//! - [`coap::CoapStrategy`]: a single cooperative session that issues and
//!   awaits datagram exchanges one at a time
//!
//! An unusable transport must surface as `Err(SkipReason)` — never a panic
//! and never an error that aborts the sweep.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::cli::Protocol;
use crate::endpoints::{Endpoint, EndpointConfig};
use crate::metrics::SampleSet;
use crate::sweep::Combination;

pub mod coap;
pub mod http;
pub mod mqtt;

pub use coap::CoapStrategy;
pub use http::HttpStrategy;
pub use mqtt::MqttStrategy;

/// Why a combination produced no samples.
///
/// Both variants are non-fatal: the sweep logs them and moves on.
#[derive(Debug, Clone, Error)]
pub enum SkipReason {
    /// The environment cannot support this transport at all
    /// (endpoint unreachable, no usable socket).
    #[error("not-installed: {0}")]
    Unavailable(String),

    /// The transport is present but session setup failed before the first
    /// message (broker refused the connection, handshake error).
    #[error("connect-failed: {0}")]
    SetupFailed(String),
}

/// Uniform measurement contract implemented by every protocol family.
#[async_trait]
pub trait TransportStrategy: Send {
    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;

    /// Execute one combination: `iterations` messages, each preceded by the
    /// combination's scenario delay, measured per the strategy's
    /// completion-signaling model.
    ///
    /// Per-message failures are recorded inside the returned SampleSet; only
    /// unavailability and setup failures surface as `Err`.
    async fn run(
        &mut self,
        combination: &Combination,
        iterations: usize,
    ) -> Result<SampleSet, SkipReason>;
}

/// Build the protocol-keyed strategy table for a sweep.
///
/// One strategy instance per protocol; each instance memoizes its own
/// capability probe, while per-run connections are created and torn down
/// inside `run`.
pub fn strategy_table(
    protocols: &[Protocol],
    endpoints: &EndpointConfig,
) -> anyhow::Result<HashMap<Protocol, Box<dyn TransportStrategy>>> {
    protocols
        .iter()
        .map(|p| Ok((*p, create(*p, endpoints)?)))
        .collect()
}

/// Create a strategy instance for one concrete protocol.
pub fn create(
    protocol: Protocol,
    endpoints: &EndpointConfig,
) -> anyhow::Result<Box<dyn TransportStrategy>> {
    match protocol {
        Protocol::Http => Ok(Box::new(HttpStrategy::new(endpoints.http.clone()))),
        Protocol::Mqtt => Ok(Box::new(MqttStrategy::new(
            endpoints.mqtt.clone(),
            endpoints.mqtt_topic.clone(),
        ))),
        Protocol::Coap => Ok(Box::new(CoapStrategy::new(endpoints.coap.clone()))),
        Protocol::All => Err(anyhow::anyhow!(
            "'All' must be expanded before strategy creation"
        )),
    }
}

/// Memoized capability probe, one per strategy instance.
///
/// The probe runs lazily on the transport's first use and the verdict is
/// reused for every later combination of the same protocol, so an
/// unreachable endpoint costs one timeout rather than one per combination.
#[derive(Default)]
pub struct AvailabilityGuard {
    verdict: Option<Result<(), SkipReason>>,
}

impl AvailabilityGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached verdict, running `probe` on first use.
    pub async fn check<F, Fut>(&mut self, probe: F) -> Result<(), SkipReason>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), SkipReason>>,
    {
        if self.verdict.is_none() {
            self.verdict = Some(probe().await);
        }
        self.verdict.clone().unwrap_or(Ok(()))
    }
}

/// Probe a TCP-reachable endpoint (HTTP server, MQTT broker).
pub(crate) async fn probe_tcp(endpoint: &Endpoint) -> Result<(), SkipReason> {
    let addr = endpoint.authority();
    match timeout(crate::defaults::PROBE_TIMEOUT, TcpStream::connect(&addr)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(SkipReason::Unavailable(format!("{addr} unreachable: {e}"))),
        Err(_) => Err(SkipReason::Unavailable(format!(
            "{addr} unreachable: connect timed out"
        ))),
    }
}

/// Probe datagram capability toward an endpoint.
///
/// UDP is connectionless, so the probe checks what can be checked locally:
/// that an ephemeral socket can be bound and the remote address resolves.
pub(crate) async fn probe_udp(endpoint: &Endpoint) -> Result<(), SkipReason> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| SkipReason::Unavailable(format!("cannot bind UDP socket: {e}")))?;
    socket
        .connect(endpoint.authority())
        .await
        .map_err(|e| {
            SkipReason::Unavailable(format!("{} unresolvable: {e}", endpoint.authority()))
        })?;
    Ok(())
}
