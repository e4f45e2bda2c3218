//! Network condition scenarios and client-side delay emulation.
//!
//! A [`Scenario`] names a fixed, deterministic pre-send delay that is applied
//! once per message by every transport strategy, before the measured send.
//! Applying the delay client-side and uniformly across all transports lets
//! scenario effects be compared independent of protocol-specific retry or
//! backoff behavior.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

/// Emulated network-condition profile for one benchmark combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Scenario {
    /// No added delay
    #[clap(name = "normal")]
    Normal,

    /// 150 ms fixed delay before every send
    #[clap(name = "high-latency")]
    HighLatency,

    /// 10 ms fixed delay before every send
    #[clap(name = "jittery")]
    Jittery,
}

impl Scenario {
    /// All scenarios, in sweep order.
    pub fn all() -> Vec<Scenario> {
        vec![Scenario::Normal, Scenario::HighLatency, Scenario::Jittery]
    }

    /// The fixed per-message delay this scenario emulates.
    pub fn emulated_delay(&self) -> Duration {
        match self {
            Scenario::Normal => Duration::ZERO,
            Scenario::HighLatency => Duration::from_millis(150),
            Scenario::Jittery => Duration::from_millis(10),
        }
    }

    /// Apply the scenario delay once, ahead of a single send.
    ///
    /// Strategies call this immediately before building and issuing each
    /// message. `Normal` returns without touching the timer.
    pub async fn induce_delay(&self) {
        let delay = self.emulated_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    /// Name used in the output table (matches the downstream report vocabulary).
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::HighLatency => "high_latency",
            Scenario::Jittery => "jittery",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn delay_mapping_is_fixed() {
        assert_eq!(Scenario::Normal.emulated_delay(), Duration::ZERO);
        assert_eq!(
            Scenario::HighLatency.emulated_delay(),
            Duration::from_millis(150)
        );
        assert_eq!(Scenario::Jittery.emulated_delay(), Duration::from_millis(10));
    }

    #[test]
    fn labels_match_output_vocabulary() {
        assert_eq!(Scenario::Normal.to_string(), "normal");
        assert_eq!(Scenario::HighLatency.to_string(), "high_latency");
        assert_eq!(Scenario::Jittery.to_string(), "jittery");
    }

    #[tokio::test]
    async fn normal_scenario_adds_no_measurable_delay() {
        let start = Instant::now();
        Scenario::Normal.induce_delay().await;
        // No timer is armed at all for Normal, so this is effectively instant.
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test]
    async fn high_latency_scenario_sleeps_at_least_the_floor() {
        let start = Instant::now();
        Scenario::HighLatency.induce_delay().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
