use coap_lite::{MessageClass, MessageType, Packet, ResponseType};
use iot_bench::transport::CoapStrategy;
use iot_bench::{Combination, Endpoint, Protocol, Scenario, TransportStrategy};
use tokio::net::UdpSocket;

/// Spawn a minimal telemetry endpoint: acknowledge each well-formed request
/// with a Content response echoing the byte count. Wire contract only.
async fn spawn_telemetry_server() -> Endpoint {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let Ok((received, peer)) = server.recv_from(&mut buf).await else {
                break;
            };
            let Ok(request) = Packet::from_bytes(&buf[..received]) else {
                continue;
            };

            let mut response = Packet::new();
            response.header.set_type(MessageType::Acknowledgement);
            response.header.message_id = request.header.message_id;
            response.header.code = MessageClass::Response(ResponseType::Content);
            response.set_token(request.get_token().to_vec());
            response.payload = request.payload.len().to_string().into_bytes();

            if let Ok(bytes) = response.to_bytes() {
                let _ = server.send_to(&bytes, peer).await;
            }
        }
    });

    Endpoint::new("127.0.0.1", port)
}

/// One cooperative session against a live server: every exchange completes,
/// one sample per attempt, all with measured latencies.
#[tokio::test]
async fn live_server_yields_all_successes() {
    let endpoint = spawn_telemetry_server().await;
    let mut strategy = CoapStrategy::new(endpoint);

    let combination = Combination {
        protocol: Protocol::Coap,
        scenario: Scenario::Normal,
        payload_bytes: 512,
        qos: None,
    };

    let set = strategy
        .run(&combination, 6)
        .await
        .expect("live server must not be skipped");

    assert_eq!(set.sent(), 6);
    assert_eq!(set.succeeded(), 6);
    assert_eq!(set.samples().len(), 6);
    assert!(set.samples().iter().all(|s| s.succeeded && s.latency_ms > 0.0));
}

/// With nothing listening, each exchange times out into a penalty sample;
/// the combination itself still completes rather than aborting.
#[tokio::test]
async fn silent_endpoint_degrades_to_penalty_samples() {
    // Bind-and-drop to get a loopback port with no listener.
    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let mut strategy = CoapStrategy::new(Endpoint::new("127.0.0.1", port));
    let combination = Combination {
        protocol: Protocol::Coap,
        scenario: Scenario::Normal,
        payload_bytes: 32,
        qos: None,
    };

    let set = strategy.run(&combination, 2).await.expect("not a skip");

    assert_eq!(set.sent(), 2);
    assert_eq!(set.succeeded(), 0);
    assert!(set
        .samples()
        .iter()
        .all(|s| s.latency_ms == iot_bench::metrics::PENALTY_LATENCY_MS));
}
