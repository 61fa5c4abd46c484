//! Run telemetry
//!
//! Trait-based sink for per-line run records and the closing run summary, so
//! the runner can report to a console, a log grid or any other consumer
//! without depending on one.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as seconds since the UNIX epoch, rounded to microseconds
pub fn current_timestamp() -> f64 {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();

    (timestamp * 1_000_000.0).round() / 1_000_000.0
}

/// One executed script line, as shown in the run log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    /// 1-based position in the script
    pub number: usize,
    pub executed_at: DateTime<Local>,
    pub command_text: String,
    pub success: bool,
    pub output: String,
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Lines cut short or skipped because the run was cancelled
    pub cancelled: usize,
    pub elapsed_ms: u64,
    pub timestamp: f64,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// Sink for run telemetry
#[async_trait]
pub trait TelemetryPublisher: Send + Sync {
    async fn publish_line(&self, record: &LineRecord) -> anyhow::Result<()>;

    async fn publish_summary(&self, summary: &RunSummary) -> anyhow::Result<()>;
}

/// Discards everything
#[derive(Debug, Clone)]
pub struct NoOpTelemetry;

#[async_trait]
impl TelemetryPublisher for NoOpTelemetry {
    async fn publish_line(&self, _record: &LineRecord) -> anyhow::Result<()> {
        Ok(())
    }

    async fn publish_summary(&self, _summary: &RunSummary) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFormat {
    /// One aligned row per line, like the operator's run grid
    Table,
    Json,
    PrettyJson,
}

/// Prints telemetry to stdout
#[derive(Debug, Clone)]
pub struct ConsoleTelemetry {
    pub format: ConsoleFormat,
}

impl ConsoleTelemetry {
    pub fn new() -> Self {
        Self { format: ConsoleFormat::Table }
    }

    pub fn json() -> Self {
        Self { format: ConsoleFormat::Json }
    }

    pub fn pretty() -> Self {
        Self { format: ConsoleFormat::PrettyJson }
    }

    fn emit<T: Serialize>(&self, tag: &str, data: &T) -> anyhow::Result<()> {
        match self.format {
            ConsoleFormat::PrettyJson => println!("[{}] {}", tag, serde_json::to_string_pretty(data)?),
            _ => println!("[{}] {}", tag, serde_json::to_string(data)?),
        }
        Ok(())
    }
}

impl Default for ConsoleTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a record as a run-grid row
pub fn table_row(record: &LineRecord) -> String {
    format!(
        "{:>4} | {} | {:<4} | {:<48} | {}",
        record.number,
        record.executed_at.format("%H:%M:%S%.3f"),
        if record.success { "OK" } else { "FAIL" },
        record.command_text,
        record.output
    )
}

#[async_trait]
impl TelemetryPublisher for ConsoleTelemetry {
    async fn publish_line(&self, record: &LineRecord) -> anyhow::Result<()> {
        match self.format {
            ConsoleFormat::Table => {
                println!("{}", table_row(record));
                Ok(())
            }
            _ => self.emit("LINE", record),
        }
    }

    async fn publish_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        match self.format {
            ConsoleFormat::Table => {
                println!(
                    "{} lines: {} succeeded, {} failed, {} cancelled in {} ms",
                    summary.total, summary.succeeded, summary.failed, summary.cancelled, summary.elapsed_ms
                );
                Ok(())
            }
            _ => self.emit("SUMMARY", summary),
        }
    }
}
