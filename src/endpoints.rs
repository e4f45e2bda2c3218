//! Environment-configured server endpoints.
//!
//! Each protocol family talks to its own collaborator server. Hosts, ports
//! and the pub/sub topic come from the environment with fixed defaults, so a
//! lab setup can repoint the benchmark without rebuilding:
//!
//! | Variable     | Default             |
//! |--------------|---------------------|
//! | `HTTP_HOST`  | `127.0.0.1`         |
//! | `HTTP_PORT`  | `5000`              |
//! | `MQTT_HOST`  | `localhost`         |
//! | `MQTT_PORT`  | `1883`              |
//! | `COAP_HOST`  | `127.0.0.1`         |
//! | `COAP_PORT`  | `5683`              |
//! | `MQTT_TOPIC` | `IOTS/LAB/telemetry`|
//!
//! A malformed port is a configuration error and fails the run before the
//! sweep starts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Host/port pair for one collaborator server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` form used for socket addresses and diagnostics.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Resolved endpoint set for all three protocol families.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub http: Endpoint,
    pub mqtt: Endpoint,
    pub coap: Endpoint,
    /// Topic the pub/sub strategy subscribes and publishes to.
    pub mqtt_topic: String,
}

impl EndpointConfig {
    /// Read the endpoint set from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http: Endpoint::new(
                env_or("HTTP_HOST", "127.0.0.1"),
                env_port("HTTP_PORT", 5000)?,
            ),
            mqtt: Endpoint::new(env_or("MQTT_HOST", "localhost"), env_port("MQTT_PORT", 1883)?),
            coap: Endpoint::new(
                env_or("COAP_HOST", "127.0.0.1"),
                env_port("COAP_PORT", 5683)?,
            ),
            mqtt_topic: env_or("MQTT_TOPIC", "IOTS/LAB/telemetry"),
        })
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            http: Endpoint::new("127.0.0.1", 5000),
            mqtt: Endpoint::new("localhost", 1883),
            coap: Endpoint::new("127.0.0.1", 5683),
            mqtt_topic: "IOTS/LAB/telemetry".to_string(),
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_port(var: &str, default: u16) -> Result<u16> {
    match std::env::var(var) {
        Ok(raw) => parse_port(var, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_port(var: &str, raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .with_context(|| format!("invalid port in {}: {:?}", var, raw))
}
