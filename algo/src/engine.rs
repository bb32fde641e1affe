use crate::algorithm::{Algorithm, ProgressListener, RunContext};
use crate::error::EngineError;
use sna_core::config::EngineConfig;
use sna_core::metrics::{MetricsCollector, MetricsSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use storage::{FilteredView, GraphStore};
use tracing::{debug, info, warn};

/// Runs algorithms against a graph store, one after another, one read scope per execution.
pub struct GraphAlgoEngine {
    store: Arc<dyn GraphStore>,
    logging: AtomicBool,
    relationship_types: Vec<String>,
    listener: Option<Arc<dyn ProgressListener>>,
    metrics: MetricsCollector,
}

impl GraphAlgoEngine {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_config(store, &EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn GraphStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            logging: AtomicBool::new(config.logging),
            relationship_types: config.relationship_types.clone(),
            listener: None,
            metrics: MetricsCollector::default(),
        }
    }

    pub fn with_progress_listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Silences the engine's own log output. Results are unaffected.
    pub fn disable_logging(&self) {
        self.logging.store(false, Ordering::SeqCst);
    }

    pub fn enable_logging(&self) {
        self.logging.store(true, Ordering::SeqCst);
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.load(Ordering::SeqCst)
    }

    /// Restricts every run to relationships of the given types. Empty means all types.
    pub fn set_relationship_types<I, S>(&mut self, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationship_types = types.into_iter().map(Into::into).collect();
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Runs `algorithm` inside a fresh read scope.
    ///
    /// On success the algorithm's result is readable; on failure no result is published
    /// and the scope is still closed.
    pub fn execute<A>(&self, algorithm: &mut A) -> Result<(), EngineError>
    where
        A: Algorithm + ?Sized,
    {
        let kind = algorithm.kind();
        let logging = self.logging_enabled();
        let started = Instant::now();

        let scope = match self.store.open_read_scope() {
            Ok(scope) => scope,
            Err(err) => {
                if logging {
                    warn!(algorithm = %kind, error = %err, "graph unavailable");
                }
                self.metrics
                    .record_run(kind.as_str(), started.elapsed().as_micros() as u64, false);
                return Err(EngineError::GraphUnavailable(err));
            }
        };

        if logging {
            info!(
                algorithm = %kind,
                nodes = scope.node_count(),
                relationships = scope.relationship_count(),
                "executing"
            );
        }

        let ctx = RunContext::new(kind, logging, self.listener.clone());
        let outcome = if self.relationship_types.is_empty() {
            algorithm.run(scope.as_ref(), &ctx)
        } else {
            let filtered = FilteredView::new(scope.as_ref(), self.relationship_types.iter().cloned());
            algorithm.run(&filtered, &ctx)
        };
        drop(scope);

        let latency_us = started.elapsed().as_micros() as u64;
        self.metrics
            .record_run(kind.as_str(), latency_us, outcome.is_ok());

        match outcome {
            Ok(()) => {
                if logging {
                    info!(algorithm = %kind, latency_us, "finished");
                }
                Ok(())
            }
            Err(cause) => {
                if logging {
                    warn!(algorithm = %kind, error = %cause, "failed");
                }
                Err(EngineError::AlgorithmFailure {
                    algorithm: kind,
                    cause,
                })
            }
        }
    }

    /// Releases state the algorithm left attached to the graph. Safe to call repeatedly.
    pub fn clean<A>(&self, algorithm: &mut A)
    where
        A: Algorithm + ?Sized,
    {
        let had_state = algorithm.has_attached_state();
        algorithm.clean();
        if had_state && self.logging_enabled() {
            debug!(algorithm = %algorithm.kind(), "released attached state");
        }
    }
}
