//! Contracts for the three external collaborators and the lazily loaded
//! handle the runner owns them through.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::{
    Embedding, Error, Point, Result,
    error::panic_message,
    routing::{Location, Problem, RoutingMatrix, Solution},
};

/// Text embedding model: one vector per text, order preserved.
pub trait Embedder: Send {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>>;
}

/// Manifold projection: one 2D point per vector, order preserved.
pub trait Projector: Send {
    fn project(&mut self, vectors: &[Embedding]) -> Result<Vec<Point>>;
}

/// Routing solver that only understands locations and cost matrices.
pub trait RouteOptimizer: Send {
    /// Unique locations referenced by `problem`, in the order the solver
    /// indexes its matrices. Not necessarily item order.
    fn locations(&self, problem: &Problem) -> Result<Vec<Location>>;

    fn solve(
        &self,
        problem: &Problem,
        matrices: &[RoutingMatrix],
        termination: &Termination,
    ) -> Result<Solution>;
}

impl<F> Embedder for F
where
    F: FnMut(&[String]) -> Result<Vec<Embedding>> + Send,
{
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>> {
        self(texts)
    }
}

impl<F> Projector for F
where
    F: FnMut(&[Embedding]) -> Result<Vec<Point>> + Send,
{
    fn project(&mut self, vectors: &[Embedding]) -> Result<Vec<Point>> {
        self(vectors)
    }
}

/// Search budget for the optimizer. Both limits apply; whichever hits first wins.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Termination {
    pub max_time_secs: f64,
    pub max_generations: usize,
}

pub struct Collaborators {
    pub embedder: Box<dyn Embedder>,
    pub projector: Box<dyn Projector>,
    pub optimizer: Box<dyn RouteOptimizer>,
}

impl Collaborators {
    pub fn new(
        embedder: impl Embedder + 'static,
        projector: impl Projector + 'static,
        optimizer: impl RouteOptimizer + 'static,
    ) -> Self {
        Self {
            embedder: Box::new(embedder),
            projector: Box::new(projector),
            optimizer: Box::new(optimizer),
        }
    }
}

type Loader = Box<dyn FnOnce() -> Result<Collaborators> + Send>;

enum LoadState {
    Unloaded(Loader),
    Loading,
    Loaded(Collaborators),
    Failed(String),
}

/// Collaborators loaded on first use. A load happens at most once; a failed
/// load is remembered and reported on every later access.
pub struct LazyCollaborators {
    state: LoadState,
}

impl LazyCollaborators {
    pub fn new<F>(loader: F) -> Self
    where
        F: FnOnce() -> Result<Collaborators> + Send + 'static,
    {
        Self {
            state: LoadState::Unloaded(Box::new(loader)),
        }
    }

    pub fn loaded(collaborators: Collaborators) -> Self {
        Self {
            state: LoadState::Loaded(collaborators),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn get(&mut self) -> Result<&mut Collaborators> {
        match std::mem::replace(&mut self.state, LoadState::Loading) {
            LoadState::Unloaded(loader) => {
                log::info!("collaborators: loading");
                self.state = match panic::catch_unwind(AssertUnwindSafe(loader)) {
                    Ok(Ok(collaborators)) => {
                        log::info!("collaborators: ready");
                        LoadState::Loaded(collaborators)
                    }
                    Ok(Err(err)) => {
                        log::error!("collaborators: load failed err={err}");
                        LoadState::Failed(err.to_string())
                    }
                    Err(payload) => {
                        let message = format!(
                            "collaborator loader panicked: {}",
                            panic_message(payload.as_ref())
                        );
                        log::error!("collaborators: {message}");
                        LoadState::Failed(message)
                    }
                };
            }
            other => self.state = other,
        }

        match &mut self.state {
            LoadState::Loaded(collaborators) => Ok(collaborators),
            LoadState::Failed(message) => Err(Error::initialization(message.clone())),
            LoadState::Unloaded(_) | LoadState::Loading => {
                Err(Error::initialization("collaborators are not loaded"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::{Collaborators, LazyCollaborators};
    use crate::{
        Error,
        testing::{ExhaustiveOptimizer, table_embedder, index_projector},
    };

    fn collaborators() -> Collaborators {
        Collaborators::new(
            table_embedder(&[("a", vec![1.0, 0.0])]),
            index_projector(),
            ExhaustiveOptimizer::default(),
        )
    }

    #[test]
    fn get_loads_once_and_reuses_the_handles() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let mut lazy = LazyCollaborators::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(collaborators())
        });

        assert!(!lazy.is_loaded());
        lazy.get().expect("first load");
        lazy.get().expect("second access");
        assert!(lazy.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_remembers_a_failed_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let mut lazy = LazyCollaborators::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::other("model weights missing"))
        });

        for _ in 0..3 {
            let err = lazy.get().err().expect("load should fail");
            assert!(matches!(err, Error::Initialization(_)));
            assert!(err.to_string().contains("model weights missing"));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.failure(), Some("model weights missing"));
    }

    #[test]
    fn get_turns_a_panicking_loader_into_a_failure() {
        let mut lazy = LazyCollaborators::new(|| -> crate::Result<Collaborators> {
            panic!("loader exploded")
        });
        let err = lazy.get().err().expect("load should fail");
        assert!(err.to_string().contains("loader exploded"));
        assert_eq!(
            lazy.failure(),
            Some("collaborator loader panicked: loader exploded")
        );
    }

    #[test]
    fn closures_act_as_embedders_and_projectors() {
        let mut collaborators = collaborators();
        let vectors = collaborators
            .embedder
            .embed(&["a".to_string()])
            .expect("embed");
        assert_eq!(vectors, vec![vec![1.0, 0.0]]);
        let points = collaborators.projector.project(&vectors).expect("project");
        assert_eq!(points.len(), 1);
    }
}
