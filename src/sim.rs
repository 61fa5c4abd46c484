//! Simulated station hardware
//!
//! Config-driven stand-ins for every collaborator so scripts can be rehearsed
//! on a bench. All timing uses `tokio::time::sleep`. Every accepted call is
//! appended to a shared [`ActionLog`], which is also what the tests inspect.

use crate::component::Component;
use crate::config::{ChannelConfig, DialogPolicy, SimulationConfig};
use crate::hardware::{
    CountdownPresenter, DialogKind, DialogOutcome, DialogPresenter, DigitalIo, LaserTecController,
    MotionController, RealtimeDataProvider, SlideController, COUNTDOWN_MAX_MS, COUNTDOWN_MIN_MS,
};
use crate::interpreter::Collaborators;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ordered record of hardware actions, shared by all simulated devices
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        lock(&self.entries).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named digital outputs
pub struct SimDigitalIo {
    outputs: Mutex<HashMap<String, bool>>,
    log: ActionLog,
}

impl SimDigitalIo {
    pub fn new(names: &[String], log: ActionLog) -> Self {
        let outputs = names.iter().map(|name| (name.clone(), false)).collect();
        Self {
            outputs: Mutex::new(outputs),
            log,
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        lock(&self.outputs).get(name).copied().unwrap_or(false)
    }

    fn write(&self, name: &str, level: bool) -> Result<()> {
        let mut outputs = lock(&self.outputs);
        let slot = outputs
            .get_mut(name)
            .ok_or_else(|| anyhow!("Unknown digital output '{}'", name))?;
        *slot = level;
        Ok(())
    }
}

impl DigitalIo for SimDigitalIo {
    fn set_output(&self, name: &str) -> Result<()> {
        self.write(name, true)?;
        info!("Output {} set", name);
        self.log.record(format!("set_output {}", name));
        Ok(())
    }

    fn clear_output(&self, name: &str) -> Result<()> {
        self.write(name, false)?;
        info!("Output {} cleared", name);
        self.log.record(format!("clear_output {}", name));
        Ok(())
    }
}

/// Pneumatic slides with a fixed travel time
pub struct SimSlides {
    slides: HashSet<String>,
    travel: Duration,
    extended: Mutex<HashSet<String>>,
    log: ActionLog,
}

impl SimSlides {
    pub fn new(names: &[String], travel: Duration, log: ActionLog) -> Self {
        Self {
            slides: names.iter().cloned().collect(),
            travel,
            extended: Mutex::new(HashSet::new()),
            log,
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        lock(&self.extended).contains(name)
    }

    fn check(&self, name: &str) -> Result<()> {
        if !self.slides.contains(name) {
            bail!("Unknown slide '{}'", name);
        }
        Ok(())
    }
}

#[async_trait]
impl SlideController for SimSlides {
    async fn activate_slide(&self, name: &str) -> Result<()> {
        self.check(name)?;
        sleep(self.travel).await;
        lock(&self.extended).insert(name.to_string());
        info!("Slide {} activated", name);
        self.log.record(format!("activate_slide {}", name));
        Ok(())
    }

    async fn deactivate_slide(&self, name: &str) -> Result<()> {
        self.check(name)?;
        sleep(self.travel).await;
        lock(&self.extended).remove(name);
        info!("Slide {} deactivated", name);
        self.log.record(format!("deactivate_slide {}", name));
        Ok(())
    }
}

/// Motion subsystem with a set of taught points
pub struct SimMotion {
    component: Component,
    points: HashSet<String>,
    travel: Duration,
    position: Mutex<Option<String>>,
    log: ActionLog,
}

impl SimMotion {
    pub fn new(component: Component, points: &[String], travel: Duration, log: ActionLog) -> Self {
        Self {
            component,
            points: points.iter().cloned().collect(),
            travel,
            position: Mutex::new(None),
            log,
        }
    }

    /// Last point reached
    pub fn position(&self) -> Option<String> {
        lock(&self.position).clone()
    }
}

#[async_trait]
impl MotionController for SimMotion {
    async fn move_to_point(&self, point: &str, show_dialog: bool) -> Result<()> {
        if !self.points.contains(point) {
            bail!("{} has no taught point '{}'", self.component, point);
        }
        if show_dialog {
            debug!("{}: confirmation dialog requested, not simulated", self.component);
        }

        info!("{} moving to {}", self.component, point);
        sleep(self.travel).await;
        *lock(&self.position) = Some(point.to_string());
        self.log.record(format!("move {} {}", self.component, point));
        Ok(())
    }
}

/// Laser driver and TEC state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaserTecState {
    pub high_current: bool,
    pub laser_on: bool,
    pub tec_on: bool,
}

pub struct SimLaserTec {
    settle: Duration,
    state: Mutex<LaserTecState>,
    log: ActionLog,
}

impl SimLaserTec {
    pub fn new(settle: Duration, log: ActionLog) -> Self {
        Self {
            settle,
            state: Mutex::new(LaserTecState::default()),
            log,
        }
    }

    pub fn state(&self) -> LaserTecState {
        *lock(&self.state)
    }

    async fn apply(&self, action: &str, update: impl FnOnce(&mut LaserTecState)) -> Result<()> {
        sleep(self.settle).await;
        update(&mut *lock(&self.state));
        info!("Laser/TEC: {}", action);
        self.log.record(action);
        Ok(())
    }
}

#[async_trait]
impl LaserTecController for SimLaserTec {
    async fn set_low_current(&self) -> Result<()> {
        self.apply("laser low_current", |state| state.high_current = false).await
    }

    async fn set_high_current(&self) -> Result<()> {
        self.apply("laser high_current", |state| state.high_current = true).await
    }

    async fn turn_on_laser(&self) -> Result<()> {
        self.apply("laser on", |state| state.laser_on = true).await
    }

    async fn turn_off_laser(&self) -> Result<()> {
        self.apply("laser off", |state| state.laser_on = false).await
    }

    async fn turn_on_tec(&self) -> Result<()> {
        self.apply("tec on", |state| state.tec_on = true).await
    }

    async fn turn_off_tec(&self) -> Result<()> {
        self.apply("tec off", |state| state.tec_on = false).await
    }
}

/// Fixed sensor readings
pub struct SimRealtimeData {
    channels: HashMap<String, ChannelConfig>,
    log: ActionLog,
}

impl SimRealtimeData {
    pub fn new(channels: &[ChannelConfig], log: ActionLog) -> Self {
        Self {
            channels: channels
                .iter()
                .map(|channel| (channel.name.clone(), channel.clone()))
                .collect(),
            log,
        }
    }
}

impl RealtimeDataProvider for SimRealtimeData {
    fn get_value_by_name(&self, name: &str) -> f64 {
        self.log.record(format!("read {}", name));
        self.channels
            .get(name)
            .and_then(|channel| channel.value)
            .unwrap_or(f64::NAN)
    }

    fn get_target_by_name(&self, name: &str) -> f64 {
        self.channels
            .get(name)
            .and_then(|channel| channel.target)
            .unwrap_or(f64::NAN)
    }

    fn get_unit(&self, name: &str) -> String {
        self.channels
            .get(name)
            .map(|channel| channel.unit.clone())
            .unwrap_or_default()
    }

    fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }
}

/// Countdown that reports the remaining time once a second
pub struct SimCountdown {
    log: ActionLog,
}

impl SimCountdown {
    pub fn new(log: ActionLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl CountdownPresenter for SimCountdown {
    async fn show_countdown(&self, milliseconds: u64) -> Result<()> {
        if !(COUNTDOWN_MIN_MS..=COUNTDOWN_MAX_MS).contains(&milliseconds) {
            bail!(
                "Countdown of {} ms is outside {}..={} ms",
                milliseconds,
                COUNTDOWN_MIN_MS,
                COUNTDOWN_MAX_MS
            );
        }

        let mut remaining = milliseconds;
        while remaining > 0 {
            info!("Countdown: {}s remaining", (remaining + 999) / 1000);
            let step = remaining.min(1000);
            sleep(Duration::from_millis(step)).await;
            remaining -= step;
        }
        self.log.record(format!("countdown {}", milliseconds));
        Ok(())
    }
}

/// Dialog answered from a fixed policy. `Prompt` answers Yes.
pub struct ScriptedDialog {
    answer: DialogPolicy,
    last_thread: Mutex<Option<String>>,
    log: ActionLog,
}

impl ScriptedDialog {
    pub fn new(answer: DialogPolicy, log: ActionLog) -> Self {
        Self {
            answer,
            last_thread: Mutex::new(None),
            log,
        }
    }

    /// Name of the thread the last dialog was shown on
    pub fn last_thread(&self) -> Option<String> {
        lock(&self.last_thread).clone()
    }
}

impl DialogPresenter for ScriptedDialog {
    fn show(&self, kind: DialogKind, title: &str, message: &str) -> Result<DialogOutcome> {
        *lock(&self.last_thread) = std::thread::current().name().map(str::to_string);
        self.log.record(format!("dialog {:?} '{}'", kind, title));

        let outcome = match (kind, self.answer) {
            (DialogKind::Ok, _) => DialogOutcome::Ok,
            (DialogKind::YesNo, DialogPolicy::No) => DialogOutcome::No,
            (DialogKind::YesNo, _) => DialogOutcome::Yes,
        };
        info!("Dialog '{}': {} -> {:?}", title, message, outcome);
        Ok(outcome)
    }
}

/// Terminal dialog. Blocks on stdin, so it belongs on a presentation thread.
pub struct ConsoleDialog;

impl DialogPresenter for ConsoleDialog {
    fn show(&self, kind: DialogKind, title: &str, message: &str) -> Result<DialogOutcome> {
        let stdin = std::io::stdin();
        let mut stderr = std::io::stderr();

        loop {
            match kind {
                DialogKind::Ok => write!(stderr, "\n[{}] {}\nPress Enter to continue: ", title, message)?,
                DialogKind::YesNo => write!(stderr, "\n[{}] {}\n(y/n): ", title, message)?,
            }
            stderr.flush()?;

            let mut answer = String::new();
            if stdin.lock().read_line(&mut answer)? == 0 {
                bail!("stdin closed while waiting for dialog '{}'", title);
            }

            match (kind, answer.trim().to_ascii_lowercase().as_str()) {
                (DialogKind::Ok, _) => return Ok(DialogOutcome::Ok),
                (DialogKind::YesNo, "y" | "yes") => return Ok(DialogOutcome::Yes),
                (DialogKind::YesNo, "n" | "no") => return Ok(DialogOutcome::No),
                _ => warn!("Please answer y or n"),
            }
        }
    }
}

/// A complete simulated station built from [`SimulationConfig`]
pub struct SimStation {
    pub log: ActionLog,
    hw: Collaborators,
}

impl SimStation {
    pub fn new(config: &SimulationConfig) -> Self {
        let log = ActionLog::new();

        let dialog: Arc<dyn DialogPresenter> = match config.dialog {
            DialogPolicy::Prompt => Arc::new(ConsoleDialog),
            answer => Arc::new(ScriptedDialog::new(answer, log.clone())),
        };

        let mut hw = Collaborators {
            digital_io: Arc::new(SimDigitalIo::new(&config.outputs, log.clone())),
            slides: Arc::new(SimSlides::new(
                &config.slides,
                Duration::from_millis(config.slide_travel_ms),
                log.clone(),
            )),
            motion: Vec::new(),
            laser_tec: Arc::new(SimLaserTec::new(
                Duration::from_millis(config.laser_settle_ms),
                log.clone(),
            )),
            realtime_data: Arc::new(SimRealtimeData::new(&config.channels, log.clone())),
            dialog,
            countdown: Some(Arc::new(SimCountdown::new(log.clone()))),
            presentation: None,
        };

        for motion in &config.motion {
            match Component::resolve(&motion.component) {
                Some(component) => {
                    let controller = SimMotion::new(
                        component,
                        &motion.points,
                        Duration::from_millis(motion.travel_ms),
                        log.clone(),
                    );
                    hw = hw.with_motion(component, Arc::new(controller));
                }
                None => warn!("Skipping unknown motion component '{}'", motion.component),
            }
        }

        Self { log, hw }
    }

    /// Default station layout with zero travel times and dialogs answered Yes
    pub fn instant() -> Self {
        let mut config = SimulationConfig {
            slide_travel_ms: 0,
            laser_settle_ms: 0,
            dialog: DialogPolicy::Yes,
            ..SimulationConfig::default()
        };
        for motion in &mut config.motion {
            motion.travel_ms = 0;
        }
        Self::new(&config)
    }

    /// Handles to the simulated devices
    pub fn collaborators(&self) -> Collaborators {
        self.hw.clone()
    }
}
