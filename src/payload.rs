//! Benchmark payload construction.
//!
//! Payloads are opaque to the benchmark: the only contract is the target
//! size. Bytes are random ASCII alphanumerics so the same payload can ride
//! in a JSON body (HTTP), an MQTT publish, or a raw CoAP datagram without
//! any per-transport re-encoding skewing the comparison.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Build a payload of exactly `target_bytes` bytes.
pub fn build_payload(target_bytes: usize) -> Vec<u8> {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(target_bytes)
        .collect()
}

/// Borrow a payload as a UTF-8 string slice for JSON embedding.
///
/// Alphanumeric bytes are always valid UTF-8, so this cannot fail for
/// payloads produced by [`build_payload`].
pub fn payload_as_str(payload: &[u8]) -> &str {
    std::str::from_utf8(payload).unwrap_or("")
}
