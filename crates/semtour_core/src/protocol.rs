//! Messages exchanged between the controller and the pipeline runner.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, pipeline::SortResult};

/// Identifies one sort request and every message it produces.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    /// Load collaborators ahead of the first sort.
    Init,
    Sort { run_id: RunId, items: Vec<String> },
    /// Stop the runner after the current request.
    Shutdown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Response {
    Ready,
    Status {
        run_id: RunId,
        message: String,
    },
    Sorted {
        run_id: RunId,
        #[serde(flatten)]
        result: SortResult,
    },
    /// `run_id` is absent when loading the collaborators failed.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        message: String,
    },
}

impl Request {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::invalid_data(format!("malformed request: {err}")))
    }
}

impl Response {
    pub fn run_id(&self) -> Option<RunId> {
        match self {
            Response::Ready => None,
            Response::Status { run_id, .. } | Response::Sorted { run_id, .. } => Some(*run_id),
            Response::Error { run_id, .. } => *run_id,
        }
    }

    /// `Sorted` and `Error` close a run; nothing follows them for that run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Response::Sorted { .. } | Response::Error { .. })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::invalid_data(format!("malformed response: {err}")))
    }
}
