//! seqd - equipment sequence interpreter
//!
//! Parses line-oriented automation scripts (`NAME ^ TARGET ^ PARAM...`) and
//! dispatches each line to the station's hardware collaborators: digital
//! outputs, pneumatic slides, motion stages, the laser/TEC driver, sensor
//! channels and operator dialogs. Every wait is cooperative, so an operator
//! abort or a declined dialog stops a run promptly.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use seqd::{Interpreter, SeqConfig, SequenceRunner, SimStation, ConsoleTelemetry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SeqConfig::load_or_default(None)?;
//!     let station = SimStation::new(&config.simulation);
//!
//!     let interpreter = Interpreter::new(station.collaborators(), &config.interpreter);
//!     let mut runner = SequenceRunner::new(interpreter, config.runner.clone())
//!         .with_telemetry(Arc::new(ConsoleTelemetry::new()));
//!
//!     let report = runner
//!         .run(&["SET_OUTPUT ^ VACUUM_BASE", "WAIT ^ TIMER ^ 500", "READ ^ KeithleyCurrent"])
//!         .await;
//!     println!("{} of {} lines succeeded", report.summary.succeeded, report.summary.total);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Command**: one parsed script line
//! - **Component**: motion subsystem addressing
//! - **Interpreter**: command registry and handlers
//! - **CancelToken / CancelTrigger**: run-scoped cooperative cancellation
//! - **PresentationThread**: marshals blocking dialogs onto the operator surface thread
//! - **SequenceRunner**: runs whole scripts and reports per-line records
//! - **TelemetryPublisher**: transport-agnostic run reporting

pub mod cancel;
pub mod command;
pub mod component;
pub mod config;
pub mod error;
pub mod format;
pub mod hardware;
pub mod interpreter;
pub mod presentation;
pub mod runner;
pub mod script;
pub mod sim;
pub mod telemetry;

pub use cancel::{CancelToken, CancelTrigger, Cancelled};
pub use command::Command;
pub use component::{resolve_index, Component};
pub use config::{CancellationScope, DialogPolicy, InterpreterConfig, RunnerConfig, SeqConfig, SimulationConfig};
pub use error::{HandlerError, Result, SeqError};
pub use format::{format_engineering, format_reading};
pub use interpreter::{Collaborators, CommandKind, Interpreter, LineExecution};
pub use presentation::PresentationThread;
pub use runner::{RunReport, SequenceRunner};
pub use script::ScriptDocument;
pub use sim::{ActionLog, SimStation};
pub use telemetry::{ConsoleTelemetry, LineRecord, NoOpTelemetry, RunSummary, TelemetryPublisher};

// Collaborator contracts
pub use hardware::{
    CountdownPresenter, DialogKind, DialogOutcome, DialogPresenter, DigitalIo, LaserTecController,
    MotionController, RealtimeDataProvider, SlideController,
};
