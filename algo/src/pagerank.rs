//! PageRank by power iteration.
//!
//! Scores start at `1/N`. Each iteration pulls rank along incoming relationships,
//! splitting a node's score evenly over its outgoing relationships (parallel ones each
//! take a share). Rank held by nodes without outgoing relationships is spread uniformly,
//! so the scores keep summing to one.

use crate::algorithm::{Algorithm, AlgorithmKind, AttachedState, RunContext};
use crate::error::{AlgoError, EngineError};
use crate::projection::Projection;
use crate::result::{ResultMap, ResultSlot};
use rayon::prelude::*;
use sna_core::config::PageRankConfig;
use storage::GraphView;

#[derive(Debug, Default)]
pub struct PageRank {
    config: PageRankConfig,
    scores: AttachedState<f64>,
    result: ResultSlot<ResultMap<f64>>,
    iterations: usize,
    converged: bool,
}

impl PageRank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PageRankConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.config.damping = damping;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    fn validate(&self) -> Result<(), AlgoError> {
        let c = &self.config;
        if !(0.0..1.0).contains(&c.damping) {
            return Err(AlgoError::InvalidConfig(format!(
                "damping must lie in [0, 1), got {}",
                c.damping
            )));
        }
        if [c.epsilon, c.sum_tolerance]
            .iter()
            .any(|value| value.is_nan() || *value < 0.0)
        {
            return Err(AlgoError::InvalidConfig(
                "epsilon and sum_tolerance must be non-negative".to_string(),
            ));
        }
        if c.max_iterations == 0 {
            return Err(AlgoError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Algorithm for PageRank {
    type Output = ResultMap<f64>;

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::PageRank
    }

    fn run(&mut self, graph: &dyn GraphView, ctx: &RunContext) -> Result<(), AlgoError> {
        self.result.clear();
        self.iterations = 0;
        self.converged = false;
        self.validate()?;

        let projection = Projection::from_view(graph)?;
        let n = projection.node_count();
        if n == 0 {
            self.result.publish(ResultMap::empty());
            return Ok(());
        }

        let d = self.config.damping;
        let inv_n = 1.0 / n as f64;
        let out_degree: Vec<usize> = (0..n).map(|v| projection.out_degree(v)).collect();
        let mut scores = vec![inv_n; n];

        for iteration in 1..=self.config.max_iterations {
            let dangling: f64 = (0..n)
                .filter(|&v| out_degree[v] == 0)
                .map(|v| scores[v])
                .sum();
            let base = (1.0 - d) * inv_n + d * dangling * inv_n;

            let next: Vec<f64> = (0..n)
                .into_par_iter()
                .map(|v| {
                    let pulled: f64 = projection
                        .in_sources(v)
                        .iter()
                        .map(|&u| scores[u] / out_degree[u] as f64)
                        .sum();
                    base + d * pulled
                })
                .collect();

            let delta: f64 = next
                .iter()
                .zip(&scores)
                .map(|(new, old)| (new - old).abs())
                .sum();
            scores = next;
            self.iterations = iteration;
            ctx.iteration(iteration, delta);

            if delta < self.config.epsilon {
                self.converged = true;
                break;
            }
        }

        if self.converged {
            ctx.converged(self.iterations);
        } else {
            ctx.cap_reached(self.iterations);
        }

        let total: f64 = scores.iter().sum();
        if (total - 1.0).abs() > self.config.sum_tolerance {
            return Err(AlgoError::InvariantViolation(format!(
                "pagerank scores sum to {} (tolerance {})",
                total, self.config.sum_tolerance
            )));
        }

        self.result.publish(projection.to_result(scores.clone()));
        self.scores.attach(scores);
        Ok(())
    }

    fn result(&self) -> Result<&ResultMap<f64>, EngineError> {
        self.result.get(AlgorithmKind::PageRank.as_str())
    }

    fn clean(&mut self) {
        self.scores.release();
    }

    fn has_attached_state(&self) -> bool {
        self.scores.is_attached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::AdjacencyGraph;

    fn ranked(graph: &AdjacencyGraph, mut pr: PageRank) -> PageRank {
        pr.run(graph, &RunContext::silent(AlgorithmKind::PageRank))
            .unwrap();
        pr
    }

    #[test]
    fn test_single_node_scores_one() {
        let mut graph = AdjacencyGraph::new();
        graph.add_node(42);

        let pr = ranked(&graph, PageRank::new());
        assert!((pr.result().unwrap()[42] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_star_centre_ranks_highest() {
        let mut graph = AdjacencyGraph::new();
        for leaf in 2..=6 {
            graph.add_edge(leaf, 1, "LINK", 1.0);
        }

        let pr = ranked(&graph, PageRank::new());
        let scores = pr.result().unwrap();

        assert!((scores.sum() - 1.0).abs() < 1e-9);
        for leaf in 2..=6 {
            assert!(scores[1] > scores[leaf]);
            assert!((scores[leaf] - scores[2]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cycle_is_uniform() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(1, 2, "LINK", 1.0);
        graph.add_edge(2, 3, "LINK", 1.0);
        graph.add_edge(3, 1, "LINK", 1.0);

        let pr = ranked(&graph, PageRank::new());
        assert!(pr.converged());
        for (_, score) in pr.result().unwrap().iter() {
            assert!((score - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_graph_yields_empty_result() {
        let pr = ranked(&AdjacencyGraph::new(), PageRank::new());
        assert!(pr.result().unwrap().is_empty());
        assert!(!pr.has_attached_state());
    }

    #[test]
    fn test_invalid_damping_rejected() {
        let mut pr = PageRank::new().with_damping(1.5);
        let outcome = pr.run(&AdjacencyGraph::new(), &RunContext::silent(AlgorithmKind::PageRank));
        assert!(matches!(outcome, Err(AlgoError::InvalidConfig(_))));
    }

    #[test]
    fn test_iteration_cap_is_not_a_failure() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(1, 2, "LINK", 1.0);
        graph.add_edge(2, 3, "LINK", 1.0);

        let pr = ranked(&graph, PageRank::new().with_max_iterations(1));
        assert_eq!(pr.iterations(), 1);
        assert!(!pr.converged());
        assert!((pr.result().unwrap().sum() - 1.0).abs() < 1e-9);
    }
}
