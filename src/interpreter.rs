//! Command interpreter
//!
//! Parses one script line at a time, resolves the command name against a fixed
//! registry and runs the matching handler against the station collaborators.
//! Every outcome (unknown command, bad parameter, hardware fault, panic,
//! cancellation) is logged and collapsed to a boolean for the run loop.

use crate::cancel::{self, CancelToken, CancelTrigger};
use crate::command::Command;
use crate::component::Component;
use crate::config::InterpreterConfig;
use crate::error::HandlerError;
use crate::format::format_reading;
use crate::hardware::{
    CountdownPresenter, DialogKind, DialogOutcome, DialogPresenter, DigitalIo, LaserTecController,
    MotionController, RealtimeDataProvider, SlideController,
};
use crate::presentation::PresentationThread;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type HandlerResult = std::result::Result<(), HandlerError>;

/// The closed command vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SetOutput,
    ClearOutput,
    Slide,
    Move,
    ShowDialog,
    ShowCountdown,
    Wait,
    LaserCurrent,
    LaserPower,
    TecPower,
    Read,
}

impl CommandKind {
    pub const ALL: [CommandKind; 11] = [
        CommandKind::SetOutput,
        CommandKind::ClearOutput,
        CommandKind::Slide,
        CommandKind::Move,
        CommandKind::ShowDialog,
        CommandKind::ShowCountdown,
        CommandKind::Wait,
        CommandKind::LaserCurrent,
        CommandKind::LaserPower,
        CommandKind::TecPower,
        CommandKind::Read,
    ];

    /// Name as written in scripts
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::SetOutput => "SET_OUTPUT",
            CommandKind::ClearOutput => "CLEAR_OUTPUT",
            CommandKind::Slide => "SLIDE",
            CommandKind::Move => "MOVE",
            CommandKind::ShowDialog => "SHOW_DIALOG",
            CommandKind::ShowCountdown => "SHOW_COUNTDOWN",
            CommandKind::Wait => "WAIT",
            CommandKind::LaserCurrent => "LASER_CURRENT",
            CommandKind::LaserPower => "LASER_POWER",
            CommandKind::TecPower => "TEC_POWER",
            CommandKind::Read => "READ",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Station hardware the interpreter drives. The interpreter keeps shared
/// handles only; the station owns the devices.
#[derive(Clone)]
pub struct Collaborators {
    pub digital_io: Arc<dyn DigitalIo>,
    pub slides: Arc<dyn SlideController>,
    /// Indexed by [`Component::index`]; empty slots have no controller fitted
    pub motion: Vec<Option<Arc<dyn MotionController>>>,
    pub laser_tec: Arc<dyn LaserTecController>,
    pub realtime_data: Arc<dyn RealtimeDataProvider>,
    pub dialog: Arc<dyn DialogPresenter>,
    /// Without a countdown surface SHOW_COUNTDOWN degrades to a plain wait
    pub countdown: Option<Arc<dyn CountdownPresenter>>,
    /// Thread owning the operator surface; dialogs are marshalled onto it
    pub presentation: Option<Arc<PresentationThread>>,
}

impl Collaborators {
    /// Fit a motion controller into the slot for `component`
    pub fn with_motion(mut self, component: Component, controller: Arc<dyn MotionController>) -> Self {
        let index = component.index();
        if self.motion.len() <= index {
            self.motion.resize_with(index + 1, || None);
        }
        self.motion[index] = Some(controller);
        self
    }

    pub fn with_dialog(mut self, dialog: Arc<dyn DialogPresenter>) -> Self {
        self.dialog = dialog;
        self
    }

    pub fn with_countdown(mut self, countdown: Arc<dyn CountdownPresenter>) -> Self {
        self.countdown = Some(countdown);
        self
    }

    pub fn with_presentation(mut self, presentation: Arc<PresentationThread>) -> Self {
        self.presentation = Some(presentation);
        self
    }

    fn motion_controller(&self, component: Component) -> Option<&Arc<dyn MotionController>> {
        self.motion.get(component.index()).and_then(Option::as_ref)
    }
}

/// Result of one `execute_line` call
#[derive(Debug, Clone, PartialEq)]
pub struct LineExecution {
    pub success: bool,
    /// The parsed command, `None` for blank/comment lines or skipped lines
    pub command: Option<Command>,
}

impl LineExecution {
    fn skipped() -> Self {
        Self { success: false, command: None }
    }

    /// Captured output of the command, if it produced one
    pub fn output(&self) -> Option<&str> {
        self.command.as_ref().and_then(|command| command.output.as_deref())
    }
}

/// Dispatches script lines to their handlers
pub struct Interpreter {
    registry: HashMap<&'static str, CommandKind>,
    hw: Collaborators,
    settle_delay: Duration,
    last_read_value: String,
}

impl Interpreter {
    pub fn new(hw: Collaborators, config: &InterpreterConfig) -> Self {
        let registry = CommandKind::ALL
            .iter()
            .map(|kind| (kind.name(), *kind))
            .collect();

        Self {
            registry,
            hw,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            last_read_value: String::new(),
        }
    }

    /// Look up a command name in the registry
    pub fn resolve(&self, name: &str) -> Option<CommandKind> {
        self.registry.get(name).copied()
    }

    /// Registered command names, sorted
    pub fn supported_commands(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.registry.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Output of the most recent successful READ
    pub fn last_read_value(&self) -> &str {
        &self.last_read_value
    }

    /// Execute one raw line. `trigger` aborts the rest of the run, not just
    /// this line; `token` is the run's shared signal.
    pub async fn execute(&mut self, line: &str, token: &CancelToken, trigger: &CancelTrigger) -> bool {
        self.execute_line(line, token, trigger).await.success
    }

    /// Like [`Interpreter::execute`], also returning the parsed command with
    /// any captured output
    pub async fn execute_line(&mut self, line: &str, token: &CancelToken, trigger: &CancelTrigger) -> LineExecution {
        if token.is_cancelled() {
            debug!("Run cancelled, skipping line: {}", line.trim());
            return LineExecution::skipped();
        }

        let mut command = match Command::parse(line) {
            Some(command) => command,
            None => {
                return LineExecution {
                    success: true,
                    command: None,
                }
            }
        };

        let kind = match self.resolve(&command.name) {
            Some(kind) => kind,
            None => {
                error!("Unknown command: {}", command.name);
                return LineExecution {
                    success: false,
                    command: Some(command),
                };
            }
        };

        info!("Executing {}: {}", kind, command.raw_text);

        let outcome = AssertUnwindSafe(self.dispatch(kind, &mut command, token, trigger))
            .catch_unwind()
            .await;

        let success = match outcome {
            Ok(Ok(())) => {
                debug!("Completed: {}", command.raw_text);
                true
            }
            Ok(Err(HandlerError::Cancelled)) => {
                info!("Cancelled: {}", command.raw_text);
                false
            }
            Ok(Err(e)) => {
                error!("Error executing command '{}': {}", command.raw_text, e);
                false
            }
            Err(_) => {
                error!("Handler panicked while executing '{}'", command.raw_text);
                false
            }
        };

        LineExecution {
            success,
            command: Some(command),
        }
    }

    async fn dispatch(
        &mut self,
        kind: CommandKind,
        command: &mut Command,
        token: &CancelToken,
        trigger: &CancelTrigger,
    ) -> HandlerResult {
        ensure_live(token)?;

        match kind {
            CommandKind::SetOutput => self.handle_set_output(command, token).await,
            CommandKind::ClearOutput => self.handle_clear_output(command, token).await,
            CommandKind::Slide => self.handle_slide(command, token).await,
            CommandKind::Move => self.handle_move(command, token).await,
            CommandKind::ShowDialog => self.handle_show_dialog(command, token, trigger).await,
            CommandKind::ShowCountdown => self.handle_show_countdown(command, token).await,
            CommandKind::Wait => self.handle_wait(command, token).await,
            CommandKind::LaserCurrent => self.handle_laser_current(command, token).await,
            CommandKind::LaserPower => self.handle_laser_power(command, token).await,
            CommandKind::TecPower => self.handle_tec_power(command, token).await,
            CommandKind::Read => self.handle_read(command, token),
        }
    }

    async fn handle_set_output(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        self.hw.digital_io.set_output(&command.target)?;
        cancel::sleep(self.settle_delay, token).await?;
        Ok(())
    }

    async fn handle_clear_output(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        self.hw.digital_io.clear_output(&command.target)?;
        cancel::sleep(self.settle_delay, token).await?;
        Ok(())
    }

    async fn handle_slide(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        let action = required(command, 0, "slide action")?.to_ascii_uppercase();
        let slide = command.target.as_str();

        match action.as_str() {
            "ACTIVATE" => token.run_until_cancelled(self.hw.slides.activate_slide(slide)).await??,
            "DEACTIVATE" => token.run_until_cancelled(self.hw.slides.deactivate_slide(slide)).await??,
            _ => return Err(invalid("slide action", &action)),
        }

        ensure_live(token)
    }

    async fn handle_move(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        let component = Component::resolve(&command.target)
            .ok_or_else(|| HandlerError::UnknownComponent(command.target.clone()))?;
        let point = required(command, 0, "point name")?;
        let controller = self
            .hw
            .motion_controller(component)
            .ok_or_else(|| HandlerError::MotionUnavailable(component.to_string()))?;

        debug!("Moving {} (index {}) to {}", component, component.index(), point);
        token.run_until_cancelled(controller.move_to_point(point, false)).await??;

        ensure_live(token)
    }

    async fn handle_show_dialog(&self, command: &Command, token: &CancelToken, trigger: &CancelTrigger) -> HandlerResult {
        let kind_text = required(command, 0, "dialog type")?;
        let title = required(command, 1, "dialog title")?;
        let message = required(command, 2, "dialog message")?;
        let kind = DialogKind::parse(&kind_text.to_ascii_uppercase())
            .ok_or_else(|| invalid("dialog type", kind_text))?;

        let presenter = Arc::clone(&self.hw.dialog);
        let outcome = match &self.hw.presentation {
            Some(surface) => {
                let (title, message) = (title.to_string(), message.to_string());
                surface
                    .invoke(move || presenter.show(kind, &title, &message), token)
                    .await??
            }
            None => presenter.show(kind, title, message)?,
        };

        match (kind, outcome) {
            (DialogKind::YesNo, DialogOutcome::No) => {
                warn!("Operator answered No to '{}', cancelling remaining run", title);
                trigger.cancel();
                Err(HandlerError::Cancelled)
            }
            (DialogKind::YesNo, DialogOutcome::Ok) => Err(HandlerError::Collaborator(anyhow::anyhow!(
                "YES_NO dialog returned OK"
            ))),
            _ => ensure_live(token),
        }
    }

    async fn handle_show_countdown(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        let milliseconds = duration_parameter(command, "countdown duration")?;

        match &self.hw.countdown {
            Some(countdown) => token.run_until_cancelled(countdown.show_countdown(milliseconds)).await??,
            None => cancel::sleep(Duration::from_millis(milliseconds), token).await?,
        }

        ensure_live(token)
    }

    async fn handle_wait(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        let milliseconds = duration_parameter(command, "wait duration")?;
        cancel::sleep(Duration::from_millis(milliseconds), token).await?;
        Ok(())
    }

    async fn handle_laser_current(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        let level = required(command, 0, "laser current level")?.to_ascii_uppercase();
        let laser = &self.hw.laser_tec;

        match level.as_str() {
            "HIGH" => token.run_until_cancelled(laser.set_high_current()).await??,
            "LOW" => token.run_until_cancelled(laser.set_low_current()).await??,
            _ => return Err(invalid("laser current level", &level)),
        }

        ensure_live(token)
    }

    async fn handle_laser_power(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        let state = required(command, 0, "laser power state")?.to_ascii_uppercase();
        let laser = &self.hw.laser_tec;

        match state.as_str() {
            "ON" => token.run_until_cancelled(laser.turn_on_laser()).await??,
            "OFF" => token.run_until_cancelled(laser.turn_off_laser()).await??,
            _ => return Err(invalid("laser power state", &state)),
        }

        ensure_live(token)
    }

    async fn handle_tec_power(&self, command: &Command, token: &CancelToken) -> HandlerResult {
        let state = required(command, 0, "TEC power state")?.to_ascii_uppercase();
        let laser = &self.hw.laser_tec;

        match state.as_str() {
            "ON" => token.run_until_cancelled(laser.turn_on_tec()).await??,
            "OFF" => token.run_until_cancelled(laser.turn_off_tec()).await??,
            _ => return Err(invalid("TEC power state", &state)),
        }

        ensure_live(token)
    }

    fn handle_read(&mut self, command: &mut Command, token: &CancelToken) -> HandlerResult {
        let data = &self.hw.realtime_data;
        let value = data.get_value_by_name(&command.target);

        let output = format_reading(value, &data.get_unit(&command.target));

        info!("READ {} = {}", command.target, output);
        command.output = Some(output.clone());
        self.last_read_value = output;

        ensure_live(token)
    }
}

fn ensure_live(token: &CancelToken) -> HandlerResult {
    if token.is_cancelled() {
        Err(HandlerError::Cancelled)
    } else {
        Ok(())
    }
}

fn required<'a>(command: &'a Command, index: usize, name: &'static str) -> Result<&'a str, HandlerError> {
    command
        .parameter(index)
        .ok_or(HandlerError::MissingParameter { index, name })
}

fn invalid(what: &'static str, value: &str) -> HandlerError {
    HandlerError::InvalidParameter {
        what,
        value: value.to_string(),
    }
}

fn duration_parameter(command: &Command, what: &'static str) -> Result<u64, HandlerError> {
    let text = required(command, 0, what)?;
    text.parse::<u64>().map_err(|_| invalid(what, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialogPolicy;
    use crate::sim::{ActionLog, ScriptedDialog, SimStation};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn station() -> (Interpreter, ActionLog) {
        station_answering(DialogPolicy::Yes)
    }

    fn station_answering(answer: DialogPolicy) -> (Interpreter, ActionLog) {
        let sim = SimStation::instant();
        let log = sim.log.clone();
        let hw = sim.collaborators().with_dialog(Arc::new(ScriptedDialog::new(answer, log.clone())));
        (Interpreter::new(hw, &InterpreterConfig { settle_delay_ms: 0 }), log)
    }

    struct PanickingMotion;

    #[async_trait]
    impl MotionController for PanickingMotion {
        async fn move_to_point(&self, _point: &str, _show_dialog: bool) -> anyhow::Result<()> {
            panic!("servo driver fault");
        }
    }

    struct CountingMotion(AtomicUsize);

    #[async_trait]
    impl MotionController for CountingMotion {
        async fn move_to_point(&self, _point: &str, _show_dialog: bool) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_registry_covers_vocabulary() {
        let (interpreter, _) = station();
        assert_eq!(interpreter.supported_commands().len(), CommandKind::ALL.len());
        for kind in CommandKind::ALL {
            assert_eq!(interpreter.resolve(kind.name()), Some(kind));
        }
        assert_eq!(interpreter.resolve("set_output"), None);
    }

    #[tokio::test]
    async fn test_blank_and_comment_lines_succeed() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        for line in ["", "   ", "// comment only"] {
            assert!(interpreter.execute(line, &token, &trigger).await);
        }
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_fails() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        assert!(!interpreter.execute("BOGUS ^ X", &token, &trigger).await);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_set_and_clear_output() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        assert!(interpreter.execute("SET_OUTPUT ^ VACUUM_BASE", &token, &trigger).await);
        assert!(interpreter.execute("CLEAR_OUTPUT ^ VACUUM_BASE", &token, &trigger).await);
        assert_eq!(log.entries(), vec!["set_output VACUUM_BASE", "clear_output VACUUM_BASE"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_settle_delay() {
        let sim = SimStation::instant();
        let mut interpreter = Interpreter::new(sim.collaborators(), &InterpreterConfig::default());
        let (trigger, token) = cancel::scope();
        let start = Instant::now();

        assert!(interpreter.execute("SET_OUTPUT ^ UV_PLC1", &token, &trigger).await);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_slide_actions() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        assert!(interpreter.execute("SLIDE ^ UV_HEAD ^ ACTIVATE", &token, &trigger).await);
        assert!(interpreter.execute("SLIDE ^ UV_HEAD ^ deactivate", &token, &trigger).await);
        assert!(!interpreter.execute("SLIDE ^ UV_HEAD ^ EXTEND", &token, &trigger).await);
        assert!(!interpreter.execute("SLIDE ^ UV_HEAD", &token, &trigger).await);
        assert_eq!(log.entries(), vec!["activate_slide UV_HEAD", "deactivate_slide UV_HEAD"]);
    }

    #[tokio::test]
    async fn test_move_uses_resolved_controller() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        assert!(interpreter.execute("MOVE ^ HEXAPOD_LEFT ^ Home", &token, &trigger).await);
        assert!(interpreter.execute("MOVE ^ gantry ^ UV", &token, &trigger).await);
        assert_eq!(log.entries(), vec!["move HEXAPOD_LEFT Home", "move GANTRY UV"]);
    }

    #[tokio::test]
    async fn test_move_validation_precedes_any_call() {
        let counter = Arc::new(CountingMotion(AtomicUsize::new(0)));
        let sim = SimStation::instant();
        let hw = sim
            .collaborators()
            .with_motion(Component::HexapodLeft, counter.clone())
            .with_motion(Component::Gantry, counter.clone());
        let mut interpreter = Interpreter::new(hw, &InterpreterConfig { settle_delay_ms: 0 });
        let (trigger, token) = cancel::scope();

        assert!(!interpreter.execute("MOVE ^ UNKNOWN ^ X", &token, &trigger).await);
        assert!(!interpreter.execute("MOVE ^ GANTRY", &token, &trigger).await);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        assert!(interpreter.execute("MOVE ^ HEXAPODLEFT ^ Home", &token, &trigger).await);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_move_without_fitted_controller_fails() {
        let sim = SimStation::instant();
        let mut hw = sim.collaborators();
        hw.motion.clear();
        let mut interpreter = Interpreter::new(hw, &InterpreterConfig { settle_delay_ms: 0 });
        let (trigger, token) = cancel::scope();

        assert!(!interpreter.execute("MOVE ^ GANTRY ^ UV", &token, &trigger).await);
    }

    #[tokio::test]
    async fn test_unknown_point_is_collaborator_failure() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        assert!(!interpreter.execute("MOVE ^ HEXAPOD_RIGHT ^ Nowhere", &token, &trigger).await);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_failure() {
        let sim = SimStation::instant();
        let hw = sim.collaborators().with_motion(Component::Gantry, Arc::new(PanickingMotion));
        let mut interpreter = Interpreter::new(hw, &InterpreterConfig { settle_delay_ms: 0 });
        let (trigger, token) = cancel::scope();

        assert!(!interpreter.execute("MOVE ^ GANTRY ^ UV", &token, &trigger).await);
        assert!(interpreter.execute("WAIT ^ TIMER ^ 1", &token, &trigger).await);
    }

    #[tokio::test]
    async fn test_laser_and_tec_commands() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        assert!(interpreter.execute("LASER_CURRENT ^ LASER ^ HIGH", &token, &trigger).await);
        assert!(interpreter.execute("LASER_CURRENT ^ LASER ^ LOW", &token, &trigger).await);
        assert!(interpreter.execute("LASER_POWER ^ LASER ^ ON", &token, &trigger).await);
        assert!(interpreter.execute("TEC_POWER ^ TEC ^ OFF", &token, &trigger).await);
        assert!(!interpreter.execute("LASER_CURRENT ^ LASER ^ MEDIUM", &token, &trigger).await);
        assert!(!interpreter.execute("LASER_POWER ^ LASER ^ MAYBE", &token, &trigger).await);
        assert!(!interpreter.execute("TEC_POWER ^ TEC", &token, &trigger).await);

        assert_eq!(
            log.entries(),
            vec!["laser high_current", "laser low_current", "laser on", "tec off"]
        );
    }

    #[tokio::test]
    async fn test_read_formats_and_caches_value() {
        let (mut interpreter, _) = station();
        let (trigger, token) = cancel::scope();

        let execution = interpreter.execute_line("READ ^ KeithleyCurrent", &token, &trigger).await;
        assert!(execution.success);
        assert_eq!(execution.output(), Some("250.000 nA"));
        assert_eq!(interpreter.last_read_value(), "250.000 nA");
    }

    #[tokio::test]
    async fn test_read_of_missing_value_is_null() {
        let (mut interpreter, _) = station();
        let (trigger, token) = cancel::scope();

        let execution = interpreter.execute_line("READ ^ ActualSagnac", &token, &trigger).await;
        assert!(execution.success);
        assert_eq!(execution.output(), Some("null"));

        let execution = interpreter.execute_line("READ ^ NoSuchChannel", &token, &trigger).await;
        assert!(execution.success);
        assert_eq!(interpreter.last_read_value(), "null");
    }

    #[tokio::test]
    async fn test_dialog_yes_continues() {
        let (mut interpreter, _) = station_answering(DialogPolicy::Yes);
        let (trigger, token) = cancel::scope();

        assert!(interpreter.execute("SHOW_DIALOG ^ POPUPBOX ^ YES_NO ^ Check ^ Lens seated?", &token, &trigger).await);
        assert!(interpreter.execute("SHOW_DIALOG ^ POPUPBOX ^ OK ^ Info ^ Done", &token, &trigger).await);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_dialog_no_cancels_remaining_run() {
        let (mut interpreter, log) = station_answering(DialogPolicy::No);
        let (trigger, token) = cancel::scope();

        assert!(!interpreter.execute("SHOW_DIALOG ^ POPUPBOX ^ YES_NO ^ Check ^ Continue?", &token, &trigger).await);
        assert!(token.is_cancelled());
        let calls_after_dialog = log.len();

        assert!(!interpreter.execute("SET_OUTPUT ^ VACUUM_BASE", &token, &trigger).await);
        assert!(!interpreter.execute("// even comments are skipped", &token, &trigger).await);
        assert_eq!(log.len(), calls_after_dialog);
    }

    #[tokio::test]
    async fn test_dialog_parameter_validation() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        assert!(!interpreter.execute("SHOW_DIALOG ^ POPUPBOX ^ YES_NO ^ Title only", &token, &trigger).await);
        assert!(!interpreter.execute("SHOW_DIALOG ^ POPUPBOX ^ RETRY ^ T ^ M", &token, &trigger).await);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_dialog_is_marshalled_to_presentation_thread() {
        let sim = SimStation::instant();
        let dialog = Arc::new(ScriptedDialog::new(DialogPolicy::Yes, sim.log.clone()));
        let surface = Arc::new(PresentationThread::spawn("dialog-surface").unwrap());
        let hw = sim
            .collaborators()
            .with_dialog(dialog.clone())
            .with_presentation(surface);
        let mut interpreter = Interpreter::new(hw, &InterpreterConfig { settle_delay_ms: 0 });
        let (trigger, token) = cancel::scope();

        assert!(interpreter.execute("SHOW_DIALOG ^ POPUPBOX ^ OK ^ Title ^ Body", &token, &trigger).await);
        assert_eq!(sim.log.entries(), vec!["dialog Ok 'Title'"]);
        assert_eq!(dialog.last_thread().as_deref(), Some("dialog-surface"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_without_surface_waits() {
        let sim = SimStation::instant();
        let mut hw = sim.collaborators();
        hw.countdown = None;
        let mut interpreter = Interpreter::new(hw, &InterpreterConfig { settle_delay_ms: 0 });
        let (trigger, token) = cancel::scope();
        let start = Instant::now();

        assert!(interpreter.execute("SHOW_COUNTDOWN ^ N/A ^ 1500", &token, &trigger).await);
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(!interpreter.execute("SHOW_COUNTDOWN ^ N/A ^ soon", &token, &trigger).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_range_is_enforced_by_presenter() {
        let (mut interpreter, log) = station();
        let (trigger, token) = cancel::scope();

        assert!(interpreter.execute("SHOW_COUNTDOWN ^ N/A ^ 250", &token, &trigger).await);
        assert!(!interpreter.execute("SHOW_COUNTDOWN ^ N/A ^ 0", &token, &trigger).await);
        assert!(!interpreter.execute("SHOW_COUNTDOWN ^ N/A ^ 1200001", &token, &trigger).await);
        assert_eq!(log.entries(), vec!["countdown 250"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_cancellable() {
        let (mut interpreter, _) = station();
        let (trigger, token) = cancel::scope();
        let abort = trigger.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            abort.cancel();
        });

        let start = Instant::now();
        assert!(!interpreter.execute("WAIT ^ TIMER ^ 1000", &token, &trigger).await);
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_wait_rejects_non_numeric_duration() {
        let (mut interpreter, _) = station();
        let (trigger, token) = cancel::scope();

        assert!(!interpreter.execute("WAIT ^ TIMER ^ ten", &token, &trigger).await);
        assert!(!interpreter.execute("WAIT ^ TIMER ^ -5", &token, &trigger).await);
        assert!(!interpreter.execute("WAIT ^ TIMER", &token, &trigger).await);
    }
}
