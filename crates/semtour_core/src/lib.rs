//! Semantic ordering of text items: embed them, lay them out in 2D and let a
//! routing optimizer find a visiting order that keeps similar items next to
//! each other.

mod codec;
mod collab;
mod controller;
mod error;
mod lkh;
pub mod logging;
mod options;
mod pipeline;
mod protocol;
pub mod routing;
mod runner;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

/// Position of an item in the caller's input.
pub type ItemIndex = usize;
pub type Embedding = Vec<f32>;
/// Projected 2D coordinate of one item.
pub type Point = [f32; 2];

pub use codec::{DEFAULT_CODEC_BASE, LocationCodec};
pub use collab::{
    Collaborators, Embedder, LazyCollaborators, Projector, RouteOptimizer, Termination,
};
pub use controller::{Controller, ControllerEvent, parse_items};
pub use error::{Error, Result};
pub use lkh::LkhOptimizer;
pub use options::{
    DEFAULT_ALIGNMENT_PENALTY, DEFAULT_DISTANCE_SCALE, DEFAULT_PROFILE, LogFormat, LogLevel,
    LoggingOptions, PipelineOptions,
};
pub use pipeline::{OrderMetrics, Pipeline, ProgressSink, SortResult, Stage};
pub use protocol::{Request, Response, RunId};
pub use runner::{PipelineRunner, RunnerHandle};
