//! Result accumulation and table persistence.
//!
//! Rows are collected in sweep order and written once, at the end, as a CSV
//! table. An empty sweep writes nothing: a prior successful output file is
//! never clobbered by an empty result, and the condition is reported as a
//! warning rather than a failure so partial lab runs stay useful.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::metrics::ResultRow;

const CSV_HEADER: &str = "protocol,scenario,payload_bytes,qos,iterations,latency_p50_ms,\
                          latency_p95_ms,latency_max_ms,throughput_msg_per_s,loss_percent,timestamp";

/// Accumulates [`ResultRow`]s and persists them as a table.
pub struct ResultSink {
    output: PathBuf,
    rows: Vec<ResultRow>,
}

impl ResultSink {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            rows: Vec::new(),
        }
    }

    /// Append a row in sweep order. Rows are never rewritten.
    pub fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table if at least one row survived the sweep.
    ///
    /// Returns the output path on a successful write, `None` when there was
    /// nothing to write.
    pub fn finalize(&self) -> Result<Option<&Path>> {
        if self.rows.is_empty() {
            warn!("No results produced; not writing {}", self.output.display());
            return Ok(None);
        }

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating output directory {}", parent.display()))?;
            }
        }

        std::fs::write(&self.output, render_csv(&self.rows))
            .with_context(|| format!("writing results to {}", self.output.display()))?;

        info!(
            "Wrote {} rows to {}",
            self.rows.len(),
            self.output.display()
        );
        Ok(Some(&self.output))
    }

    /// Print a compact operator-facing summary of the surviving rows.
    pub fn print_summary(&self) {
        if self.rows.is_empty() {
            println!("{}", "no results produced".yellow());
            return;
        }

        println!(
            "{}",
            format!(
                "{:<6} {:<13} {:>9} {:>4} {:>6} {:>9} {:>9} {:>9} {:>10} {:>7}",
                "proto", "scenario", "payload", "qos", "iters", "p50(ms)", "p95(ms)", "max(ms)",
                "msg/s", "loss%"
            )
            .bold()
        );
        for row in &self.rows {
            let line = format!(
                "{:<6} {:<13} {:>9} {:>4} {:>6} {:>9} {:>9} {:>9} {:>10.2} {:>7.2}",
                row.protocol.to_string(),
                row.scenario.to_string(),
                row.payload_bytes,
                row.qos.map_or_else(|| "-".to_string(), |q| q.to_string()),
                row.iterations,
                fmt_opt(row.latency_p50_ms),
                fmt_opt(row.latency_p95_ms),
                fmt_opt(row.latency_max_ms),
                row.throughput_msg_per_s,
                row.loss_percent,
            );
            if row.loss_percent > 0.0 {
                println!("{}", line.yellow());
            } else {
                println!("{}", line);
            }
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Render the full table: header row plus one data row per result.
fn render_csv(rows: &[ResultRow]) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&csv_row(row));
        out.push('\n');
    }
    out
}

fn csv_row(row: &ResultRow) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{}",
        csv_escape(&row.protocol.to_string()),
        csv_escape(&row.scenario.to_string()),
        row.payload_bytes,
        row.qos.map_or_else(String::new, |q| q.to_string()),
        row.iterations,
        csv_opt(row.latency_p50_ms),
        csv_opt(row.latency_p95_ms),
        csv_opt(row.latency_max_ms),
        row.throughput_msg_per_s,
        row.loss_percent,
        row.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

fn csv_opt(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

/// Wrap a field in quotes and escape embedded quotes when needed.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
