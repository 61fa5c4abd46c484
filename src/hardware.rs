//! Capability contracts for the station hardware the interpreter drives
//!
//! The interpreter only calls through these traits; it never owns the devices.
//! Implementations live with the station (see [`crate::sim`] for bench stand-ins).

use async_trait::async_trait;

/// Name-addressed digital outputs (valves, UV lamps, vacuum)
pub trait DigitalIo: Send + Sync {
    fn set_output(&self, name: &str) -> anyhow::Result<()>;
    fn clear_output(&self, name: &str) -> anyhow::Result<()>;
}

/// Pneumatic slides
#[async_trait]
pub trait SlideController: Send + Sync {
    async fn activate_slide(&self, name: &str) -> anyhow::Result<()>;
    async fn deactivate_slide(&self, name: &str) -> anyhow::Result<()>;
}

/// One motion subsystem (hexapod or gantry) with taught points
#[async_trait]
pub trait MotionController: Send + Sync {
    async fn move_to_point(&self, point: &str, show_dialog: bool) -> anyhow::Result<()>;
}

/// Laser driver current and TEC power
#[async_trait]
pub trait LaserTecController: Send + Sync {
    async fn set_low_current(&self) -> anyhow::Result<()>;
    async fn set_high_current(&self) -> anyhow::Result<()>;
    async fn turn_on_laser(&self) -> anyhow::Result<()>;
    async fn turn_off_laser(&self) -> anyhow::Result<()>;
    async fn turn_on_tec(&self) -> anyhow::Result<()>;
    async fn turn_off_tec(&self) -> anyhow::Result<()>;
}

/// Live sensor values by channel name
pub trait RealtimeDataProvider: Send + Sync {
    /// Current value, NaN when the channel has no reading
    fn get_value_by_name(&self, name: &str) -> f64;
    fn get_target_by_name(&self, name: &str) -> f64;
    fn get_unit(&self, name: &str) -> String;
    fn has_channel(&self, name: &str) -> bool;
}

/// Shortest countdown the popup accepts
pub const COUNTDOWN_MIN_MS: u64 = 1;

/// Longest countdown the popup accepts (20 minutes)
pub const COUNTDOWN_MAX_MS: u64 = 20 * 60 * 1000;

/// Timed popup that resolves when the countdown elapses or is closed.
///
/// Durations outside [`COUNTDOWN_MIN_MS`]..=[`COUNTDOWN_MAX_MS`] are rejected
/// with an error rather than clamped.
#[async_trait]
pub trait CountdownPresenter: Send + Sync {
    async fn show_countdown(&self, milliseconds: u64) -> anyhow::Result<()>;
}

/// Button set of a modal dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Ok,
    YesNo,
}

impl DialogKind {
    pub fn parse(value: &str) -> Option<DialogKind> {
        match value {
            "OK" => Some(DialogKind::Ok),
            "YES_NO" => Some(DialogKind::YesNo),
            _ => None,
        }
    }
}

/// Button the operator pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Ok,
    Yes,
    No,
}

/// Blocking modal dialog. Must be called on the thread that owns the
/// presentation surface when one exists.
pub trait DialogPresenter: Send + Sync {
    fn show(&self, kind: DialogKind, title: &str, message: &str) -> anyhow::Result<DialogOutcome>;
}
