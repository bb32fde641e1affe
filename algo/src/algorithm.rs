use crate::error::{AlgoError, EngineError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use storage::GraphView;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    LabelPropagation,
    PageRank,
    TriangleCount,
    ConnectedComponents,
    StronglyConnectedComponents,
    Louvain,
    UndirectedModularity,
    DirectedModularity,
}

impl AlgorithmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::LabelPropagation => "label_propagation",
            AlgorithmKind::PageRank => "page_rank",
            AlgorithmKind::TriangleCount => "triangle_count",
            AlgorithmKind::ConnectedComponents => "connected_components",
            AlgorithmKind::StronglyConnectedComponents => "strongly_connected_components",
            AlgorithmKind::Louvain => "louvain",
            AlgorithmKind::UndirectedModularity => "undirected_modularity",
            AlgorithmKind::DirectedModularity => "directed_modularity",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A graph computation run by [`crate::GraphAlgoEngine`].
///
/// `run` must leave the published result untouched unless it returns `Ok`; implementations
/// clear their result first and publish last.
pub trait Algorithm {
    type Output;

    fn kind(&self) -> AlgorithmKind;

    fn run(&mut self, graph: &dyn GraphView, ctx: &RunContext) -> Result<(), AlgoError>;

    /// Fails with [`EngineError::InvalidState`] until a run has succeeded.
    fn result(&self) -> Result<&Self::Output, EngineError>;

    /// Releases per-node state attached to the graph. Results stay readable.
    fn clean(&mut self) {}

    fn has_attached_state(&self) -> bool {
        false
    }
}

/// Per-node working buffer kept after a run until the engine cleans the algorithm.
#[derive(Debug)]
pub struct AttachedState<T> {
    buffer: Option<Vec<T>>,
}

impl<T> AttachedState<T> {
    pub fn attach(&mut self, buffer: Vec<T>) {
        self.buffer = Some(buffer);
    }

    pub fn get(&self) -> Option<&[T]> {
        self.buffer.as_deref()
    }

    pub fn release(&mut self) -> Option<Vec<T>> {
        self.buffer.take()
    }

    pub fn is_attached(&self) -> bool {
        self.buffer.is_some()
    }
}

impl<T> Default for AttachedState<T> {
    fn default() -> Self {
        Self { buffer: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Iteration {
        algorithm: AlgorithmKind,
        iteration: usize,
        delta: f64,
    },
    Converged {
        algorithm: AlgorithmKind,
        iterations: usize,
    },
    CapReached {
        algorithm: AlgorithmKind,
        iterations: usize,
    },
}

/// Receives progress events from iterative algorithms. Called on the executing thread.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Handed to [`Algorithm::run`] by the engine.
pub struct RunContext {
    kind: AlgorithmKind,
    logging: bool,
    listener: Option<Arc<dyn ProgressListener>>,
}

impl RunContext {
    pub fn new(
        kind: AlgorithmKind,
        logging: bool,
        listener: Option<Arc<dyn ProgressListener>>,
    ) -> Self {
        Self {
            kind,
            logging,
            listener,
        }
    }

    /// Context with logging off and no listener.
    pub fn silent(kind: AlgorithmKind) -> Self {
        Self::new(kind, false, None)
    }

    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging
    }

    pub fn iteration(&self, iteration: usize, delta: f64) {
        if self.logging {
            debug!(algorithm = %self.kind, iteration, delta, "iteration finished");
        }
        self.emit(ProgressEvent::Iteration {
            algorithm: self.kind,
            iteration,
            delta,
        });
    }

    pub fn converged(&self, iterations: usize) {
        if self.logging {
            debug!(algorithm = %self.kind, iterations, "converged");
        }
        self.emit(ProgressEvent::Converged {
            algorithm: self.kind,
            iterations,
        });
    }

    pub fn cap_reached(&self, iterations: usize) {
        if self.logging {
            warn!(algorithm = %self.kind, iterations, "iteration cap reached before convergence");
        }
        self.emit(ProgressEvent::CapReached {
            algorithm: self.kind,
            iterations,
        });
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(listener) = &self.listener {
            listener.on_progress(&event);
        }
    }
}
