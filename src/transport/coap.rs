//! Cooperative async request/response strategy over CoAP datagrams.
//!
//! One self-contained session per combination: an ephemeral UDP socket is
//! the client context, and each iteration encodes a confirmable POST to
//! `/telemetry`, sends it, and awaits the response datagram before moving
//! on. The whole session runs to completion inside a single `run` call, so
//! the sweep controller stays ignorant of the cooperative scheduling within.

use async_trait::async_trait;
use coap_lite::{CoapRequest, MessageType, Packet, RequestType};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use crate::endpoints::Endpoint;
use crate::metrics::SampleSet;
use crate::payload::build_payload;
use crate::sweep::Combination;
use crate::transport::{probe_udp, AvailabilityGuard, SkipReason, TransportStrategy};

const TELEMETRY_PATH: &str = "telemetry";

pub struct CoapStrategy {
    endpoint: Endpoint,
    guard: AvailabilityGuard,
}

impl CoapStrategy {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            guard: AvailabilityGuard::new(),
        }
    }
}

/// Encode one confirmable POST carrying the raw payload.
fn encode_request(sequence: usize, payload: &[u8]) -> Result<Vec<u8>, coap_lite::error::MessageError> {
    let mut request: CoapRequest<SocketAddr> = CoapRequest::new();
    request.set_method(RequestType::Post);
    request.set_path(TELEMETRY_PATH);
    request.message.header.set_type(MessageType::Confirmable);
    request.message.header.message_id = (sequence % usize::from(u16::MAX)) as u16;
    request
        .message
        .set_token(((sequence as u64) & 0xffff_ffff).to_be_bytes().to_vec());
    request.message.payload = payload.to_vec();
    request.message.to_bytes()
}

#[async_trait]
impl TransportStrategy for CoapStrategy {
    fn name(&self) -> &'static str {
        "coap"
    }

    async fn run(
        &mut self,
        combination: &Combination,
        iterations: usize,
    ) -> Result<SampleSet, SkipReason> {
        let endpoint = self.endpoint.clone();
        self.guard.check(|| async { probe_udp(&endpoint).await }).await?;

        // The session's client context. Dropped at the end of the run, which
        // tears the session down regardless of per-message outcomes.
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| SkipReason::SetupFailed(format!("coap socket: {e}")))?;
        socket
            .connect(self.endpoint.authority())
            .await
            .map_err(|e| SkipReason::SetupFailed(format!("coap connect: {e}")))?;

        let payload = build_payload(combination.payload_bytes);
        let mut response_buf = vec![0u8; 64 * 1024];
        let mut set = SampleSet::with_capacity(iterations);

        for seq in 0..iterations {
            combination.scenario.induce_delay().await;

            let datagram = match encode_request(seq, &payload) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("coap encode {} failed: {}", seq, e);
                    set.record_failure();
                    continue;
                }
            };

            let start = Instant::now();
            let exchange = async {
                socket.send(&datagram).await?;
                socket.recv(&mut response_buf).await
            };
            match timeout(crate::defaults::REQUEST_TIMEOUT, exchange).await {
                Ok(Ok(received)) => {
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                    // Any well-formed response counts as a completed exchange.
                    let ok = Packet::from_bytes(&response_buf[..received]).is_ok();
                    set.record_response(elapsed_ms, ok);
                }
                Ok(Err(e)) => {
                    debug!("coap exchange {} failed: {}", seq, e);
                    set.record_failure();
                }
                Err(_) => {
                    debug!("coap exchange {} timed out", seq);
                    set.record_failure();
                }
            }
        }

        Ok(set)
    }
}
