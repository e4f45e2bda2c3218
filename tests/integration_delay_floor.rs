use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use iot_bench::{
    Combination, Protocol, ResultSink, SampleSet, Scenario, SkipReason, SweepConfig, SweepRunner,
    TransportStrategy,
};

/// Stub transport that applies the scenario delay like a real strategy and
/// reports honest wall-clock time for the whole message, delay included.
struct WallClockStrategy;

#[async_trait]
impl TransportStrategy for WallClockStrategy {
    fn name(&self) -> &'static str {
        "stub-wall-clock"
    }

    async fn run(
        &mut self,
        combination: &Combination,
        iterations: usize,
    ) -> Result<SampleSet, SkipReason> {
        let mut set = SampleSet::with_capacity(iterations);
        for _ in 0..iterations {
            let start = Instant::now();
            combination.scenario.induce_delay().await;
            set.record_response(start.elapsed().as_secs_f64() * 1000.0, true);
        }
        Ok(set)
    }
}

fn run_config(scenario: Scenario) -> SweepConfig {
    SweepConfig {
        protocols: vec![Protocol::Http],
        iterations: 5,
        scenarios: vec![scenario],
        payload_sizes: vec![32],
        qos_levels: vec![0],
    }
}

async fn sweep_once(scenario: Scenario) -> anyhow::Result<ResultSink> {
    let mut strategies: HashMap<Protocol, Box<dyn TransportStrategy>> = HashMap::new();
    strategies.insert(Protocol::Http, Box::new(WallClockStrategy));

    let mut sink = ResultSink::new("unused.csv");
    let mut runner = SweepRunner::with_strategies(run_config(scenario), strategies);
    runner.run(&mut sink).await?;
    Ok(sink)
}

/// Under HighLatency every message pays at least the 150 ms emulated floor.
#[tokio::test]
async fn high_latency_scenario_enforces_the_floor() -> anyhow::Result<()> {
    let sink = sweep_once(Scenario::HighLatency).await?;

    assert_eq!(sink.rows().len(), 1);
    let row = &sink.rows()[0];
    assert_eq!(row.iterations, 5);
    assert!(
        row.latency_p50_ms.unwrap() >= 150.0,
        "p50 {} below floor",
        row.latency_p50_ms.unwrap()
    );
    // The floor bounds every sample, so the minimum percentile is enough;
    // check max too for good measure.
    assert!(row.latency_max_ms.unwrap() >= 150.0);
    Ok(())
}

/// Under Normal the emulator contributes nothing measurable.
#[tokio::test]
async fn normal_scenario_contributes_no_floor() -> anyhow::Result<()> {
    let sink = sweep_once(Scenario::Normal).await?;

    let row = &sink.rows()[0];
    assert_eq!(row.iterations, 5);
    assert!(
        row.latency_max_ms.unwrap() < 50.0,
        "max {} suggests an unexpected delay",
        row.latency_max_ms.unwrap()
    );
    Ok(())
}
