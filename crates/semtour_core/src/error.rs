use std::any::Any;

use thiserror::Error as ThisError;

use crate::{pipeline::Stage, protocol::RunId};

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// A collaborator failed to load; terminal for the runner that owns it.
    #[error("initialization failed: {0}")]
    Initialization(String),
    /// Rejected by the controller before anything is sent to the runner.
    #[error("{0}")]
    Validation(String),
    #[error("run {0} is still in flight")]
    Busy(RunId),
    #[error("optimizer returned no usable tour")]
    EmptyTour,
    #[error("{stage} failed: {source}")]
    Stage { stage: Stage, source: Box<Error> },
    #[error("{context}.\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    ProcessFailed {
        context: String,
        stdout: String,
        stderr: String,
    },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Attributes an error to a pipeline stage. `EmptyTour` and errors that
    /// already carry a stage pass through untouched.
    pub(crate) fn in_stage(self, stage: Stage) -> Self {
        match self {
            Self::EmptyTour | Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }
}

/// Text carried by a caught panic, when it has any.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
