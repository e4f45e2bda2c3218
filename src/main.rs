//! # IoT Protocol Benchmark Suite - Main Entry Point
//!
//! Drives one full benchmark sweep:
//!
//! 1. Initialize structured logging (tracing, `RUST_LOG` aware)
//! 2. Parse and validate command-line arguments
//! 3. Resolve collaborator endpoints from the environment
//! 4. Run every protocol/scenario/payload/QoS combination sequentially
//! 5. Persist the results table and print the console summary
//!
//! Only configuration errors before the sweep are fatal. Once the sweep is
//! running, unavailable transports and failed combinations are logged and
//! skipped; an entirely empty sweep ends with a warning and no output file,
//! not an error.

use anyhow::Result;
use clap::Parser;
use iot_bench::{
    cli::Args,
    endpoints::EndpointConfig,
    results::ResultSink,
    sweep::{SweepConfig, SweepRunner},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins when set; the verbose flag only moves the default.
    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!("Starting IoT Protocol Benchmark Suite v{}", iot_bench::VERSION);
    args.validate()?;

    let endpoints = EndpointConfig::from_env()?;
    info!(
        "Endpoints: http={} mqtt={} (topic {}) coap={}",
        endpoints.http, endpoints.mqtt, endpoints.mqtt_topic, endpoints.coap
    );

    let config = SweepConfig::from_args(&args);
    let mut sink = ResultSink::new(&args.output);

    SweepRunner::new(config, &endpoints)?.run(&mut sink).await?;

    sink.finalize()?;
    sink.print_summary();

    info!("Benchmark sweep completed");
    Ok(())
}
