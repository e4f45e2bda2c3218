//! Publish/subscribe strategy with out-of-band send/receive correlation.
//!
//! One long-lived MQTT v5 session per combination: subscribe first, then
//! publish the whole batch while a spawned receive task polls the event
//! loop. Each publish carries its send instant as a v5 user property, so a
//! receipt's round-trip latency is `receive_instant - embedded_instant`
//! regardless of broker-side ordering. The receive task forwards latencies
//! over a channel; the publishing task drains it until the expected receipt
//! count arrives or the completion ceiling expires, which bounds total run
//! time even under total message loss.

use async_trait::async_trait;
use rumqttc::v5::mqttbytes::v5::{Packet, PublishProperties};
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, Event, EventLoop, MqttOptions};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use crate::endpoints::Endpoint;
use crate::metrics::{now_ms, SampleSet};
use crate::payload::build_payload;
use crate::sweep::Combination;
use crate::transport::{probe_tcp, AvailabilityGuard, SkipReason, TransportStrategy};

/// User-property key carrying the publish instant, in process-local ms.
const SEND_INSTANT_PROPERTY: &str = "t0";

pub struct MqttStrategy {
    endpoint: Endpoint,
    topic: String,
    guard: AvailabilityGuard,
}

impl MqttStrategy {
    pub fn new(endpoint: Endpoint, topic: String) -> Self {
        Self {
            endpoint,
            topic,
            guard: AvailabilityGuard::new(),
        }
    }
}

/// Map a combination's QoS level onto the wire enum, passed through
/// unchanged to both subscribe and publish.
fn qos_level(qos: Option<u8>) -> QoS {
    match qos.unwrap_or(0) {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Stamp the current instant into publish properties, out of band of the
/// payload body.
fn stamp_send_instant() -> PublishProperties {
    PublishProperties {
        user_properties: vec![(SEND_INSTANT_PROPERTY.to_string(), format!("{:.3}", now_ms()))],
        ..Default::default()
    }
}

/// Recover the embedded send instant from a receipt, if present.
fn embedded_send_instant(properties: Option<&PublishProperties>) -> Option<f64> {
    properties?
        .user_properties
        .iter()
        .find(|(key, _)| key == SEND_INSTANT_PROPERTY)
        .and_then(|(_, value)| value.parse().ok())
}

/// Poll the event loop until the broker acknowledges the connection.
async fn await_connack(eventloop: &mut EventLoop) -> Result<(), SkipReason> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => continue,
            Err(e) => return Err(SkipReason::SetupFailed(format!("mqtt connect: {e}"))),
        }
    }
}

#[async_trait]
impl TransportStrategy for MqttStrategy {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    async fn run(
        &mut self,
        combination: &Combination,
        iterations: usize,
    ) -> Result<SampleSet, SkipReason> {
        let endpoint = self.endpoint.clone();
        self.guard.check(|| async { probe_tcp(&endpoint).await }).await?;

        let client_id = format!("bench-{}", Uuid::new_v4().simple());
        let mut options = MqttOptions::new(client_id, &self.endpoint.host, self.endpoint.port);
        options.set_keep_alive(Duration::from_secs(30));
        let (client, mut eventloop) = AsyncClient::new(options, 64);

        // Setup failures abort only this combination, never the sweep.
        match timeout(crate::defaults::SETUP_TIMEOUT, await_connack(&mut eventloop)).await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(reason),
            Err(_) => {
                return Err(SkipReason::SetupFailed(
                    "mqtt connect: no CONNACK before deadline".to_string(),
                ))
            }
        }

        let qos = qos_level(combination.qos);
        client
            .subscribe(self.topic.clone(), qos)
            .await
            .map_err(|e| SkipReason::SetupFailed(format!("mqtt subscribe: {e}")))?;

        // The receive task is the only other execution context; the channel
        // is the only state shared with it.
        let (latency_tx, mut latency_rx) = mpsc::unbounded_channel::<f64>();
        let receive_task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        // A receipt without a parsable stamp still counts as
                        // delivered; the zero latency is excluded from the
                        // percentile math downstream.
                        let latency = embedded_send_instant(publish.properties.as_ref())
                            .map(|t0| now_ms() - t0)
                            .unwrap_or(0.0);
                        if latency_tx.send(latency).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("mqtt event loop ended: {}", e);
                        break;
                    }
                }
            }
        });

        let payload = build_payload(combination.payload_bytes);
        let mut set = SampleSet::with_capacity(iterations);

        for seq in 0..iterations {
            combination.scenario.induce_delay().await;
            let properties = stamp_send_instant();
            if let Err(e) = client
                .publish_with_properties(
                    self.topic.clone(),
                    qos,
                    false,
                    payload.clone(),
                    properties,
                )
                .await
            {
                debug!("mqtt publish {} failed: {}", seq, e);
            }
            set.note_sent();
        }

        // Completion signal: expected receipt count or the ceiling,
        // whichever comes first. Partial receipt is lossy, not an error.
        let deadline = Instant::now() + crate::defaults::COMPLETION_CEILING;
        while set.succeeded() < iterations {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(
                    "mqtt completion ceiling hit with {}/{} receipts",
                    set.succeeded(),
                    iterations
                );
                break;
            }
            match timeout(remaining, latency_rx.recv()).await {
                Ok(Some(latency)) => set.record_receipt(latency),
                Ok(None) | Err(_) => break,
            }
        }

        let _ = client.disconnect().await;
        receive_task.abort();

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_levels_pass_through_unchanged() {
        assert_eq!(qos_level(Some(0)), QoS::AtMostOnce);
        assert_eq!(qos_level(Some(1)), QoS::AtLeastOnce);
        assert_eq!(qos_level(Some(2)), QoS::ExactlyOnce);
        // The collapsed "no QoS" value behaves as at-most-once.
        assert_eq!(qos_level(None), QoS::AtMostOnce);
    }

    #[test]
    fn missing_or_foreign_properties_yield_no_instant() {
        assert_eq!(embedded_send_instant(None), None);

        let foreign = PublishProperties {
            user_properties: vec![("trace".to_string(), "abc".to_string())],
            ..Default::default()
        };
        assert_eq!(embedded_send_instant(Some(&foreign)), None);
    }

    /// Round-trip correlation: with an artificial in-flight delay `d`, the
    /// computed latency equals `d` within timing tolerance.
    #[tokio::test]
    async fn correlation_recovers_artificial_delay() {
        let properties = stamp_send_instant();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let t0 = embedded_send_instant(Some(&properties)).expect("stamp present");
        let latency = now_ms() - t0;
        assert!(latency >= 50.0, "latency {} below the artificial delay", latency);
        assert!(latency < 500.0, "latency {} implausibly large", latency);
    }
}
