//! Blocking-style request/response strategy over HTTP.
//!
//! The simplest completion-signaling model of the three: each iteration
//! issues one `POST /ingest` and the loop does not advance until the
//! response (or the 2 s timeout) comes back, so the measured window is
//! exactly call-to-response.

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use crate::endpoints::Endpoint;
use crate::metrics::SampleSet;
use crate::payload::{build_payload, payload_as_str};
use crate::sweep::Combination;
use crate::transport::{probe_tcp, AvailabilityGuard, SkipReason, TransportStrategy};

pub struct HttpStrategy {
    endpoint: Endpoint,
    guard: AvailabilityGuard,
}

impl HttpStrategy {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            guard: AvailabilityGuard::new(),
        }
    }

    fn ingest_url(&self) -> String {
        format!("http://{}/ingest", self.endpoint.authority())
    }
}

#[async_trait]
impl TransportStrategy for HttpStrategy {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn run(
        &mut self,
        combination: &Combination,
        iterations: usize,
    ) -> Result<SampleSet, SkipReason> {
        let endpoint = self.endpoint.clone();
        self.guard.check(|| async { probe_tcp(&endpoint).await }).await?;

        // Fresh client per combination; the per-request timeout doubles as
        // the failure cutoff that maps to the penalty latency.
        let client = reqwest::Client::builder()
            .timeout(crate::defaults::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SkipReason::Unavailable(format!("http client: {e}")))?;

        let url = self.ingest_url();
        let payload = build_payload(combination.payload_bytes);
        let body_payload = payload_as_str(&payload).to_string();

        let mut set = SampleSet::with_capacity(iterations);
        for seq in 0..iterations {
            combination.scenario.induce_delay().await;

            // Body is built outside the measured window; the clock runs from
            // just before the request leaves to just after the status is in.
            let body = serde_json::json!({ "seq": seq, "payload": body_payload });
            let start = Instant::now();
            match client.post(&url).json(&body).send().await {
                Ok(response) => {
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                    set.record_response(elapsed_ms, response.status().is_success());
                }
                Err(e) => {
                    debug!("http request {} failed: {}", seq, e);
                    set.record_failure();
                }
            }
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_url_targets_the_configured_endpoint() {
        let strategy = HttpStrategy::new(Endpoint::new("10.0.0.7", 5000));
        assert_eq!(strategy.ingest_url(), "http://10.0.0.7:5000/ingest");
    }

    #[tokio::test]
    async fn unreachable_server_yields_unavailable_skip() {
        // Port 1 on loopback is essentially guaranteed closed.
        let mut strategy = HttpStrategy::new(Endpoint::new("127.0.0.1", 1));
        let combination = Combination {
            protocol: crate::cli::Protocol::Http,
            scenario: crate::scenario::Scenario::Normal,
            payload_bytes: 32,
            qos: None,
        };
        match strategy.run(&combination, 3).await {
            Err(SkipReason::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {:?}", other.map(|s| s.sent())),
        }
    }
}
