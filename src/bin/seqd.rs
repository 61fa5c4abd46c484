//! seqd - Sequence Interpreter
//!
//! Runs equipment automation scripts against the simulated station:
//! - Script loading from `.script` documents, plain text or stdin
//! - Row selection and stop-on-failure
//! - Ctrl+C aborts the run at the next suspension point
//! - Run log as a table or JSON on stdout, diagnostics on stderr

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use seqd::{
    Command, ConsoleTelemetry, DialogPolicy, Interpreter, PresentationThread, ScriptDocument, SeqConfig,
    SequenceRunner, SimStation,
};
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seqd")]
#[command(about = "Equipment sequence interpreter - runs automation scripts line by line")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script
    Run {
        /// Script file (`.script`/`.json` document or plain text), `-` for stdin
        script: String,

        /// Only run these 1-based rows, e.g. `--select 2,5,6`
        #[arg(long, value_delimiter = ',')]
        select: Vec<usize>,

        /// Stop at the first failed line
        #[arg(long)]
        stop_on_failure: bool,

        /// Answer dialogs: prompt, yes or no
        #[arg(long)]
        dialog: Option<String>,

        /// Print the run log as JSON lines
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Parse a script and report unknown commands without running it
    Check {
        script: String,
    },
    /// List the supported commands
    Commands,
}

impl Args {
    fn get_config_path(&self) -> Option<String> {
        self.config.clone().or_else(|| std::env::var("SEQD_CONFIG").ok())
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.env_filter())
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.get_config_path();
    let mut config = SeqConfig::load_or_default(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = &config_path {
        info!("Using config: {}", path);
    }

    match &args.command {
        Commands::Commands => {
            let station = SimStation::new(&config.simulation);
            let interpreter = Interpreter::new(station.collaborators(), &config.interpreter);
            for name in interpreter.supported_commands() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Check { script } => check(&config, &load_script(script)?),
        Commands::Run {
            script,
            select,
            stop_on_failure,
            dialog,
            json,
            pretty,
        } => {
            if let Some(answer) = dialog {
                config.simulation.dialog = parse_dialog_policy(answer)?;
            }
            config.runner.stop_on_failure |= *stop_on_failure;

            let lines = load_script(script)?;
            let selection = to_rows(select)?;

            let telemetry = match (*json, *pretty) {
                (_, true) => ConsoleTelemetry::pretty(),
                (true, false) => ConsoleTelemetry::json(),
                _ => ConsoleTelemetry::new(),
            };

            run(&config, &lines, &selection, telemetry).await
        }
    }
}

async fn run(config: &SeqConfig, lines: &[String], selection: &[usize], telemetry: ConsoleTelemetry) -> Result<()> {
    info!("Sequence Interpreter (Rust)");
    info!("{}", "=".repeat(50));

    let station = SimStation::new(&config.simulation);
    let mut hw = station.collaborators();
    if config.simulation.dialog == DialogPolicy::Prompt {
        let surface = PresentationThread::spawn("operator-surface").context("Failed to start presentation thread")?;
        info!("Dialogs run on thread '{}'", surface.name());
        hw = hw.with_presentation(Arc::new(surface));
    }

    let interpreter = Interpreter::new(hw, &config.interpreter);
    let mut runner = SequenceRunner::new(interpreter, config.runner.clone()).with_telemetry(Arc::new(telemetry));

    let abort = runner.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received - aborting run");
            abort.cancel();
        }
    });

    let report = runner.run_selected(lines, selection).await;

    let last_reading = runner.interpreter().last_read_value();
    if !last_reading.is_empty() {
        info!("Last reading: {}", last_reading);
    }

    if !report.summary.all_succeeded() {
        error!(
            "Run incomplete: {} failed, {} cancelled",
            report.summary.failed, report.summary.cancelled
        );
        std::process::exit(1);
    }

    info!("Run complete");
    Ok(())
}

fn check(config: &SeqConfig, lines: &[String]) -> Result<()> {
    let station = SimStation::new(&config.simulation);
    let interpreter = Interpreter::new(station.collaborators(), &config.interpreter);

    let mut unknown = 0;
    for (row, line) in lines.iter().enumerate() {
        if let Some(command) = Command::parse(line) {
            if interpreter.resolve(&command.name).is_none() {
                error!("Line {}: unknown command {}", row + 1, command.name);
                unknown += 1;
            }
        }
    }

    if unknown > 0 {
        bail!("{} unknown command(s) in script", unknown);
    }
    info!("{} lines OK", lines.len());
    Ok(())
}

fn load_script(source: &str) -> Result<Vec<String>> {
    if source == "-" {
        let lines = io::stdin().lock().lines().collect::<io::Result<Vec<_>>>()?;
        return Ok(lines);
    }

    let document = ScriptDocument::open(source).with_context(|| format!("Failed to load script {}", source))?;
    Ok(document.commands)
}

fn to_rows(select: &[usize]) -> Result<Vec<usize>> {
    select
        .iter()
        .map(|&row| match row {
            0 => bail!("Rows are numbered from 1"),
            row => Ok(row - 1),
        })
        .collect()
}

fn parse_dialog_policy(answer: &str) -> Result<DialogPolicy> {
    match answer.to_ascii_lowercase().as_str() {
        "prompt" => Ok(DialogPolicy::Prompt),
        "yes" => Ok(DialogPolicy::Yes),
        "no" => Ok(DialogPolicy::No),
        other => bail!("Unknown dialog answer '{}': expected prompt, yes or no", other),
    }
}
