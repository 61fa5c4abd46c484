//! Error types for sequence loading and command execution

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SeqError>;

#[derive(Error, Debug)]
pub enum SeqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Presentation thread error: {0}")]
    Presentation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure raised inside a command handler.
///
/// The interpreter never hands these to its caller; they are logged and
/// collapsed to a `false` result at the dispatch boundary.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("missing parameter #{index} ({name})")]
    MissingParameter { index: usize, name: &'static str },

    #[error("invalid {what}: '{value}'")]
    InvalidParameter { what: &'static str, value: String },

    #[error("unknown component: '{0}'")]
    UnknownComponent(String),

    #[error("no motion controller registered for {0}")]
    MotionUnavailable(String),

    #[error("presentation surface unavailable: {0}")]
    Presentation(String),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl From<crate::cancel::Cancelled> for HandlerError {
    fn from(_: crate::cancel::Cancelled) -> Self {
        HandlerError::Cancelled
    }
}
