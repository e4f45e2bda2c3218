//! Per-message samples and the statistical reduction to summary rows.
//!
//! Every transport strategy produces one [`SampleSet`] per combination. The
//! aggregator reduces it to a single [`ResultRow`] with percentile, throughput
//! and loss figures. Failed messages are recorded with a fixed penalty
//! latency rather than dropped, so they stay visible in the percentile and
//! throughput math: failures are expensive, not invisible.
//!
//! Throughput is `succeeded / cumulative_measured_latency`, an approximation
//! of achieved rate under the measured latency rather than wall-clock span.
//! It is a simplifying but consistent cross-protocol metric.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;

use crate::cli::Protocol;
use crate::scenario::Scenario;
use crate::sweep::Combination;

/// Latency substituted for a failed message.
///
/// Equal to the per-request timeout: a failed send is counted as a maximally
/// slow send, which keeps `sent` and the sample list in step without a
/// separate failure channel. See `known_bias` tests for the distortion this
/// carries into the percentiles.
pub const PENALTY_LATENCY_MS: f64 = 2000.0;

/// One attempted message's measured outcome. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub latency_ms: f64,
    pub succeeded: bool,
}

/// Ordered samples for one combination, plus attempt/success counts.
///
/// Owned by the strategy invocation that produced it and handed once to
/// [`summarize`]. For request/response strategies `samples.len() == sent`;
/// for the pub/sub strategy samples exist only for correlated receipts, so
/// `samples.len() <= sent`.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<Sample>,
    sent: usize,
    succeeded: usize,
}

impl SampleSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            sent: 0,
            succeeded: 0,
        }
    }

    /// Record a completed request/response exchange with its measured latency.
    ///
    /// `succeeded` is false for responses that came back non-OK; their real
    /// latency still enters the sample list.
    pub fn record_response(&mut self, latency_ms: f64, succeeded: bool) {
        self.sent += 1;
        if succeeded {
            self.succeeded += 1;
        }
        self.samples.push(Sample {
            latency_ms,
            succeeded,
        });
    }

    /// Record a message that never completed (timeout or transport error).
    pub fn record_failure(&mut self) {
        self.sent += 1;
        self.samples.push(Sample {
            latency_ms: PENALTY_LATENCY_MS,
            succeeded: false,
        });
    }

    /// Count a fire-and-forget publish. The matching sample arrives, if at
    /// all, via [`record_receipt`](Self::record_receipt).
    pub fn note_sent(&mut self) {
        self.sent += 1;
    }

    /// Record a correlated receipt for a previously noted publish.
    pub fn record_receipt(&mut self, latency_ms: f64) {
        self.succeeded += 1;
        self.samples.push(Sample {
            latency_ms,
            succeeded: true,
        });
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }
}

/// Aggregated, immutable summary of one combination's SampleSet.
///
/// Rows are appended to the output table in sweep order and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub protocol: Protocol,
    pub scenario: Scenario,
    pub payload_bytes: usize,
    pub qos: Option<u8>,
    /// Count of positive-latency samples that entered the percentile math.
    pub iterations: usize,
    pub latency_p50_ms: Option<f64>,
    pub latency_p95_ms: Option<f64>,
    pub latency_max_ms: Option<f64>,
    pub throughput_msg_per_s: f64,
    pub loss_percent: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Reduce a SampleSet to its summary row.
///
/// Percentiles use the sorted-index convention of the measurement campaign
/// this suite reports into: `p50 = sorted[len/2]`,
/// `p95 = sorted[trunc(len * 0.95) - 1]` (floored at index 0), `max = last`.
/// Non-positive latencies are excluded; penalty latencies are not.
pub fn summarize(combination: &Combination, set: &SampleSet) -> ResultRow {
    let mut latencies: Vec<f64> = set
        .samples()
        .iter()
        .map(|s| s.latency_ms)
        .filter(|l| *l > 0.0)
        .collect();
    latencies.sort_by(f64::total_cmp);

    let (p50, p95, max) = if latencies.is_empty() {
        (None, None, None)
    } else {
        let len = latencies.len();
        let p95_index = ((len as f64 * 0.95) as usize).saturating_sub(1);
        (
            Some(latencies[len / 2]),
            Some(latencies[p95_index]),
            Some(latencies[len - 1]),
        )
    };

    let cumulative_secs: f64 = latencies.iter().sum::<f64>() / 1000.0;
    let throughput = if cumulative_secs > 0.0 {
        set.succeeded() as f64 / cumulative_secs
    } else {
        0.0
    };

    // sent is floored at 1 so an empty set reads as total loss, not a NaN.
    let loss = (100.0 * (1.0 - set.succeeded() as f64 / set.sent().max(1) as f64))
        .clamp(0.0, 100.0);

    ResultRow {
        protocol: combination.protocol,
        scenario: combination.scenario,
        payload_bytes: combination.payload_bytes,
        qos: combination.qos,
        iterations: latencies.len(),
        latency_p50_ms: p50.map(round2),
        latency_p95_ms: p95.map(round2),
        latency_max_ms: max.map(round2),
        throughput_msg_per_s: round2(throughput),
        loss_percent: round2(loss),
        timestamp: chrono::Utc::now(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Milliseconds since an arbitrary process-local epoch, on the monotonic
/// clock. Used for send/receive correlation, which only ever compares two
/// readings taken inside the same process.
pub fn now_ms() -> f64 {
    static PROCESS_EPOCH: OnceLock<Instant> = OnceLock::new();
    PROCESS_EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo() -> Combination {
        Combination {
            protocol: Protocol::Http,
            scenario: Scenario::Normal,
            payload_bytes: 1024,
            qos: None,
        }
    }

    fn all_success(latencies: &[f64]) -> SampleSet {
        let mut set = SampleSet::with_capacity(latencies.len());
        for &l in latencies {
            set.record_response(l, true);
        }
        set
    }

    #[test]
    fn percentiles_are_ordered() {
        let set = all_success(&[9.0, 1.0, 5.0, 7.0, 3.0, 8.0, 2.0]);
        let row = summarize(&combo(), &set);
        let p50 = row.latency_p50_ms.unwrap();
        let p95 = row.latency_p95_ms.unwrap();
        let max = row.latency_max_ms.unwrap();
        assert!(p50 <= p95, "p50={} p95={}", p50, p95);
        assert!(p95 <= max, "p95={} max={}", p95, max);
        assert_eq!(max, 9.0);
    }

    #[test]
    fn single_sample_collapses_all_percentiles() {
        let row = summarize(&combo(), &all_success(&[4.2]));
        assert_eq!(row.iterations, 1);
        assert_eq!(row.latency_p50_ms, Some(4.2));
        assert_eq!(row.latency_p95_ms, Some(4.2));
        assert_eq!(row.latency_max_ms, Some(4.2));
    }

    #[test]
    fn all_success_has_zero_loss() {
        let row = summarize(&combo(), &all_success(&[5.0; 20]));
        assert_eq!(row.loss_percent, 0.0);
    }

    #[test]
    fn loss_stays_within_bounds() {
        let mut set = SampleSet::with_capacity(4);
        set.record_response(5.0, true);
        set.record_failure();
        set.record_failure();
        set.record_failure();
        let row = summarize(&combo(), &set);
        assert!(row.loss_percent >= 0.0 && row.loss_percent <= 100.0);
        assert_eq!(row.loss_percent, 75.0);
    }

    #[test]
    fn empty_set_is_total_loss_with_no_percentiles() {
        let row = summarize(&combo(), &SampleSet::default());
        assert_eq!(row.iterations, 0);
        assert_eq!(row.latency_p50_ms, None);
        assert_eq!(row.latency_p95_ms, None);
        assert_eq!(row.latency_max_ms, None);
        assert_eq!(row.throughput_msg_per_s, 0.0);
        assert_eq!(row.loss_percent, 100.0);
    }

    #[test]
    fn throughput_is_success_over_cumulative_latency() {
        // 50 successes at 5 ms each: 50 / 0.25 s = 200 msg/s.
        let row = summarize(&combo(), &all_success(&[5.0; 50]));
        assert_eq!(row.iterations, 50);
        assert_eq!(row.latency_p50_ms, Some(5.0));
        assert_eq!(row.latency_p95_ms, Some(5.0));
        assert_eq!(row.throughput_msg_per_s, 200.0);
    }

    #[test]
    fn pubsub_style_counts_keep_iterations_below_sent() {
        let mut set = SampleSet::with_capacity(10);
        for _ in 0..10 {
            set.note_sent();
        }
        for _ in 0..7 {
            set.record_receipt(3.0);
        }
        let row = summarize(&combo(), &set);
        assert_eq!(set.sent(), 10);
        assert_eq!(row.iterations, 7);
        assert!(row.iterations <= set.sent());
        assert_eq!(row.loss_percent, 30.0);
    }

    /// Known bias, preserved on purpose: a failed message enters the stats
    /// as a 2000 ms sample, so failures drag max (and, at sufficient volume,
    /// the percentiles) upward instead of disappearing from the math.
    #[test]
    fn known_bias_penalty_latency_inflates_statistics() {
        let mut set = SampleSet::with_capacity(11);
        for _ in 0..10 {
            set.record_response(5.0, true);
        }
        set.record_failure();
        let row = summarize(&combo(), &set);
        assert_eq!(row.iterations, 11);
        assert_eq!(row.latency_max_ms, Some(PENALTY_LATENCY_MS));
        // The one failure also depresses throughput: 10 / 2.05 s.
        assert_eq!(row.throughput_msg_per_s, 4.88);
        assert_eq!(row.loss_percent, 9.09);
    }

    #[test]
    fn now_ms_is_monotonic() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
