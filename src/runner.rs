//! Sequence runner
//!
//! Walks a script line by line through the [`Interpreter`], producing one
//! [`LineRecord`] per executed row and a [`RunSummary`] at the end. Owns the
//! cancellation scopes: an operator abort that outlives runs, and a run (or
//! per-line) scope that handlers may fire.

use crate::cancel::{self, CancelToken, CancelTrigger};
use crate::config::{CancellationScope, RunnerConfig};
use crate::interpreter::{Interpreter, LineExecution};
use crate::telemetry::{current_timestamp, LineRecord, NoOpTelemetry, RunSummary, TelemetryPublisher};
use chrono::Local;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

pub const OUTPUT_SUCCESS: &str = "Command executed successfully";
pub const OUTPUT_FAILURE: &str = "Command failed";

/// Records and totals of one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub records: Vec<LineRecord>,
    pub summary: RunSummary,
}

pub struct SequenceRunner {
    interpreter: Interpreter,
    telemetry: Arc<dyn TelemetryPublisher>,
    config: RunnerConfig,
    abort: CancelTrigger,
    abort_token: CancelToken,
}

impl SequenceRunner {
    pub fn new(interpreter: Interpreter, config: RunnerConfig) -> Self {
        let (abort, abort_token) = cancel::scope();
        Self {
            interpreter,
            telemetry: Arc::new(NoOpTelemetry),
            config,
            abort,
            abort_token,
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryPublisher>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Operator abort. Firing it stops the current run and every later one.
    pub fn abort_handle(&self) -> CancelTrigger {
        self.abort.clone()
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Execute every line in order
    pub async fn run<S: AsRef<str>>(&mut self, lines: &[S]) -> RunReport {
        let rows: Vec<usize> = (0..lines.len()).collect();
        self.run_rows(lines, &rows).await
    }

    /// Execute only the given 0-based rows, in script order. An empty
    /// selection runs the whole script.
    pub async fn run_selected<S: AsRef<str>>(&mut self, lines: &[S], selection: &[usize]) -> RunReport {
        if selection.is_empty() {
            return self.run(lines).await;
        }

        let mut rows: Vec<usize> = selection
            .iter()
            .copied()
            .filter(|&row| {
                let in_range = row < lines.len();
                if !in_range {
                    warn!(
                        "Ignoring selected row {}: script has {} lines",
                        row.saturating_add(1),
                        lines.len()
                    );
                }
                in_range
            })
            .collect();
        rows.sort_unstable();
        rows.dedup();

        self.run_rows(lines, &rows).await
    }

    async fn run_rows<S: AsRef<str>>(&mut self, lines: &[S], rows: &[usize]) -> RunReport {
        let started = Instant::now();
        let (run_trigger, run_token) = self.abort_token.child_scope();
        let mut report = RunReport::default();

        info!("Run started: {} lines ({:?} cancellation scope)", rows.len(), self.config.cancellation_scope);

        for &row in rows {
            let line = lines[row].as_ref();
            let executed_at = Local::now();

            let (execution, cancelled) = match self.config.cancellation_scope {
                CancellationScope::Run => {
                    let execution = self.interpreter.execute_line(line, &run_token, &run_trigger).await;
                    (execution, run_token.is_cancelled())
                }
                CancellationScope::Line => {
                    let (line_trigger, line_token) = run_token.child_scope();
                    let execution = self.interpreter.execute_line(line, &line_token, &line_trigger).await;
                    (execution, line_token.is_cancelled())
                }
            };

            let record = LineRecord {
                number: row + 1,
                executed_at,
                command_text: line.trim().to_string(),
                success: execution.success,
                output: describe(&execution),
            };

            report.summary.total += 1;
            if record.success {
                report.summary.succeeded += 1;
            } else if cancelled {
                report.summary.cancelled += 1;
            } else {
                report.summary.failed += 1;
            }

            if let Err(e) = self.telemetry.publish_line(&record).await {
                warn!("Failed to publish line {}: {}", record.number, e);
            }

            let stop = !record.success && !cancelled && self.config.stop_on_failure;
            report.records.push(record);

            if stop {
                info!("Stopping after failure on line {}", row + 1);
                break;
            }
        }

        report.summary.elapsed_ms = started.elapsed().as_millis() as u64;
        report.summary.timestamp = current_timestamp();

        info!(
            "Run finished: {} succeeded, {} failed, {} cancelled",
            report.summary.succeeded, report.summary.failed, report.summary.cancelled
        );

        if let Err(e) = self.telemetry.publish_summary(&report.summary).await {
            warn!("Failed to publish run summary: {}", e);
        }

        report
    }
}

/// Output column text for an executed line
pub fn describe(execution: &LineExecution) -> String {
    let command = match &execution.command {
        Some(command) => command,
        None if execution.success => return String::new(),
        None => return OUTPUT_FAILURE.to_string(),
    };

    if !execution.success {
        return OUTPUT_FAILURE.to_string();
    }

    match command.name.as_str() {
        "READ" => command
            .output
            .clone()
            .unwrap_or_else(|| crate::format::NULL_READING.to_string()),
        "WAIT" => format!("Waited {} ms", command.parameter(0).unwrap_or_default()),
        _ => OUTPUT_SUCCESS.to_string(),
    }
}
