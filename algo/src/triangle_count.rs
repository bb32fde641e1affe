//! Per-node triangle counts on the undirected simple view.

use crate::algorithm::{Algorithm, AlgorithmKind, RunContext};
use crate::error::{AlgoError, EngineError};
use crate::projection::Projection;
use crate::result::{ResultMap, ResultSlot};
use rayon::prelude::*;
use storage::GraphView;

#[derive(Debug, Default)]
pub struct TriangleCount {
    result: ResultSlot<ResultMap<u64>>,
}

impl TriangleCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct triangles in the graph: the per-node sum divided by three.
    pub fn global_count(&self) -> Result<u64, EngineError> {
        Ok(self.result()?.total() / 3)
    }
}

impl Algorithm for TriangleCount {
    type Output = ResultMap<u64>;

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::TriangleCount
    }

    fn run(&mut self, graph: &dyn GraphView, ctx: &RunContext) -> Result<(), AlgoError> {
        self.result.clear();

        let projection = Projection::from_view(graph)?;
        let adjacency = projection.simple_undirected();

        let counts: Vec<u64> = (0..adjacency.len())
            .into_par_iter()
            .map(|v| {
                let neighbors = &adjacency[v];
                let mut closed = 0u64;
                for (i, &u) in neighbors.iter().enumerate() {
                    for &w in &neighbors[i + 1..] {
                        if adjacency[u].binary_search(&w).is_ok() {
                            closed += 1;
                        }
                    }
                }
                closed
            })
            .collect();

        let triangles = counts.iter().sum::<u64>() / 3;
        if ctx.logging_enabled() {
            tracing::debug!(triangles, "triangle count finished");
        }

        self.result.publish(projection.to_result(counts));
        Ok(())
    }

    fn result(&self) -> Result<&ResultMap<u64>, EngineError> {
        self.result.get(AlgorithmKind::TriangleCount.as_str())
    }
}
