//! Configuration loading for the sequence interpreter

use crate::{Result, SeqError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/default_config.yaml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SeqConfig {
    pub interpreter: InterpreterConfig,
    pub runner: RunnerConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Pause after SET_OUTPUT / CLEAR_OUTPUT for the outputs to settle
    pub settle_delay_ms: u64,
}

/// How far a cancellation reaches within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationScope {
    /// One signal for the whole run; a declined dialog stops every later line
    #[default]
    Run,
    /// A fresh signal per line; only operator abort reaches later lines
    Line,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub cancellation_scope: CancellationScope,
    pub stop_on_failure: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub outputs: Vec<String>,
    pub slides: Vec<String>,
    pub slide_travel_ms: u64,
    pub motion: Vec<MotionConfig>,
    pub laser_settle_ms: u64,
    pub channels: Vec<ChannelConfig>,
    pub dialog: DialogPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotionConfig {
    /// Target name as written in scripts, e.g. `HEXAPOD_LEFT`
    pub component: String,
    pub points: Vec<String>,
    #[serde(default)]
    pub travel_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub name: String,
    /// `None` simulates a channel with no reading
    pub value: Option<f64>,
    pub unit: String,
    #[serde(default)]
    pub target: Option<f64>,
}

/// How simulated dialogs are answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogPolicy {
    /// Ask on the terminal
    #[default]
    Prompt,
    Yes,
    No,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self { settle_delay_ms: 100 }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let points = |names: &[&str]| -> Vec<String> { names.iter().map(|name| name.to_string()).collect() };

        Self {
            outputs: points(&["VACUUM_BASE", "UV_PLC1", "UV_PLC2", "UV_PLC3"]),
            slides: points(&["UV_HEAD", "DISPENSOR_HEAD", "PICK_UP_TOOL", "L_Gripper", "R_Gripper"]),
            slide_travel_ms: 300,
            motion: vec![
                MotionConfig {
                    component: "HEXAPOD_LEFT".to_string(),
                    points: points(&["Home", "LensGrip", "LensPlace", "RejectLens"]),
                    travel_ms: 500,
                },
                MotionConfig {
                    component: "HEXAPOD_RIGHT".to_string(),
                    points: points(&["Home", "LensGrip", "LensPlace", "RejectLens"]),
                    travel_ms: 500,
                },
                MotionConfig {
                    component: "GANTRY".to_string(),
                    points: points(&["MidBack", "UV", "GripLeftLens", "GripRightLens", "SeePIC", "SeeSLED"]),
                    travel_ms: 800,
                },
            ],
            laser_settle_ms: 200,
            channels: vec![
                ChannelConfig {
                    name: "KeithleyCurrent".to_string(),
                    value: Some(2.5e-7),
                    unit: "A".to_string(),
                    target: None,
                },
                ChannelConfig {
                    name: "PM400_1".to_string(),
                    value: Some(3e-4),
                    unit: "W".to_string(),
                    target: None,
                },
                ChannelConfig {
                    name: "ActualSagnac".to_string(),
                    value: None,
                    unit: "V".to_string(),
                    target: Some(0.0),
                },
            ],
            dialog: DialogPolicy::Prompt,
        }
    }
}

impl SeqConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| SeqError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self> {
        let config: SeqConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the default location, falling back to
    /// built-in defaults when the default file does not exist
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load_from_path(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        for motion in &self.simulation.motion {
            if crate::Component::resolve(&motion.component).is_none() {
                return Err(SeqError::Config(format!(
                    "Unknown motion component '{}'",
                    motion.component
                )));
            }
        }
        Ok(())
    }
}
