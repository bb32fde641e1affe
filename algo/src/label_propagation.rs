//! Synchronous label propagation for community detection.
//!
//! Every node starts with its own id (or a caller-supplied label). In each round a node
//! adopts the most frequent label among its neighbours in the undirected view. Ties go to
//! the smallest label and nodes without neighbours keep theirs. All nodes update from the
//! previous round's labels, so the outcome does not depend on thread scheduling.
//! Structures that swap labels every round (bipartite pairs) run until `max_rounds`.

use crate::algorithm::{Algorithm, AlgorithmKind, AttachedState, RunContext};
use crate::error::{AlgoError, EngineError};
use crate::projection::Projection;
use crate::result::{ResultMap, ResultSlot};
use rayon::prelude::*;
use sna_core::config::LabelPropagationConfig;
use storage::GraphView;

#[derive(Debug, Default)]
pub struct LabelPropagation {
    config: LabelPropagationConfig,
    initial: Option<ResultMap<u64>>,
    labels: AttachedState<u64>,
    result: ResultSlot<ResultMap<u64>>,
    rounds: usize,
    converged: bool,
}

impl LabelPropagation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LabelPropagationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.config.max_rounds = max_rounds;
        self
    }

    /// Seeds nodes with the given labels. Nodes missing from `labels` start with their own
    /// id, which joins them to any supplied community using that same value as its label.
    pub fn with_initial_labels(mut self, labels: ResultMap<u64>) -> Self {
        self.initial = Some(labels);
        self
    }

    /// Rounds performed by the last run.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Whether the last run stopped because no label changed.
    pub fn converged(&self) -> bool {
        self.converged
    }

    fn seed(&self, projection: &Projection) -> Vec<u64> {
        projection
            .ids()
            .iter()
            .map(|&id| {
                self.initial
                    .as_ref()
                    .and_then(|initial| initial.get(id).copied())
                    .unwrap_or(id)
            })
            .collect()
    }
}

impl Algorithm for LabelPropagation {
    type Output = ResultMap<u64>;

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::LabelPropagation
    }

    fn run(&mut self, graph: &dyn GraphView, ctx: &RunContext) -> Result<(), AlgoError> {
        self.result.clear();
        self.rounds = 0;
        self.converged = false;

        if self.config.max_rounds == 0 {
            return Err(AlgoError::InvalidConfig(
                "label propagation needs max_rounds >= 1".to_string(),
            ));
        }

        let projection = Projection::from_view(graph)?;
        let mut labels = self.seed(&projection);

        for round in 1..=self.config.max_rounds {
            let next: Vec<u64> = (0..projection.node_count())
                .into_par_iter()
                .map(|idx| dominant_label(&projection, &labels, idx))
                .collect();

            let changed = next
                .iter()
                .zip(&labels)
                .filter(|(new, old)| new != old)
                .count();
            labels = next;
            self.rounds = round;
            ctx.iteration(round, changed as f64);

            if changed == 0 {
                self.converged = true;
                break;
            }
        }

        if self.converged {
            ctx.converged(self.rounds);
        } else {
            ctx.cap_reached(self.rounds);
        }

        self.result.publish(projection.to_result(labels.clone()));
        self.labels.attach(labels);
        Ok(())
    }

    fn result(&self) -> Result<&ResultMap<u64>, EngineError> {
        self.result.get(AlgorithmKind::LabelPropagation.as_str())
    }

    fn clean(&mut self) {
        self.labels.release();
    }

    fn has_attached_state(&self) -> bool {
        self.labels.is_attached()
    }
}

fn dominant_label(projection: &Projection, labels: &[u64], idx: usize) -> u64 {
    let mut votes: Vec<u64> = projection
        .undirected_neighbors(idx)
        .map(|neighbor| labels[neighbor])
        .collect();
    if votes.is_empty() {
        return labels[idx];
    }
    votes.sort_unstable();

    let mut best = labels[idx];
    let mut best_count = 0usize;
    let mut start = 0usize;
    while start < votes.len() {
        let label = votes[start];
        let end = start + votes[start..].iter().take_while(|&&v| v == label).count();
        // Ascending order: only a strictly larger count replaces, so ties keep the smaller.
        if end - start > best_count {
            best = label;
            best_count = end - start;
        }
        start = end;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::AdjacencyGraph;

    fn run(graph: &AdjacencyGraph, mut lp: LabelPropagation) -> LabelPropagation {
        lp.run(graph, &RunContext::silent(AlgorithmKind::LabelPropagation))
            .unwrap();
        lp
    }

    #[test]
    fn test_two_cliques_get_two_labels() {
        let mut graph = AdjacencyGraph::new();
        for (a, b) in [(1, 2), (2, 3), (1, 3), (10, 11), (11, 12), (10, 12)] {
            graph.add_edge(a, b, "LINK", 1.0);
        }

        let lp = run(&graph, LabelPropagation::new());
        let labels = lp.result().unwrap();

        assert!(lp.converged());
        assert_eq!(labels.distinct_count(), 2);
        assert_eq!(labels[1], labels[3]);
        assert_eq!(labels[10], labels[12]);
        assert_ne!(labels[1], labels[10]);
    }

    #[test]
    fn test_node_votes_only_with_neighbours() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(1, 2, "LINK", 1.0);
        graph.add_edge(1, 3, "LINK", 1.0);

        let lp = run(&graph, LabelPropagation::new().with_max_rounds(1));
        let labels = lp.result().unwrap();

        // The centre sees {2, 3}: a tie, so the smaller label wins.
        assert_eq!(labels[1], 2);
        assert_eq!(labels[2], 1);
        assert_eq!(labels[3], 1);
    }

    #[test]
    fn test_single_edge_swaps_until_round_cap() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(5, 9, "LINK", 1.0);

        let mut lp = LabelPropagation::new().with_max_rounds(3);
        let outcome = lp.run(&graph, &RunContext::silent(AlgorithmKind::LabelPropagation));
        assert!(outcome.is_ok());

        let labels = lp.result().unwrap();
        assert!(!lp.converged());
        assert_eq!(lp.rounds(), 3);
        assert_eq!(labels[5], 9);
        assert_eq!(labels[9], 5);
        assert!(lp.has_attached_state());
    }

    #[test]
    fn test_isolated_node_and_initial_labels() {
        let mut graph = AdjacencyGraph::new();
        graph.add_node(7);
        graph.add_node(8);

        let initial: ResultMap<u64> = vec![(7, 100)].into_iter().collect();
        let lp = run(&graph, LabelPropagation::new().with_initial_labels(initial));
        let labels = lp.result().unwrap();

        assert_eq!(labels[7], 100);
        assert_eq!(labels[8], 8);
        assert_eq!(lp.rounds(), 1);
    }

    #[test]
    fn test_unseeded_node_shares_a_matching_supplied_label() {
        let mut graph = AdjacencyGraph::new();
        graph.add_node(7);
        graph.add_node(8);

        let initial: ResultMap<u64> = vec![(7, 8)].into_iter().collect();
        let lp = run(&graph, LabelPropagation::new().with_initial_labels(initial));
        let labels = lp.result().unwrap();

        assert_eq!(labels[7], 8);
        assert_eq!(labels[8], 8);
        assert_eq!(labels.distinct_count(), 1);
    }

    #[test]
    fn test_clean_releases_labels() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(1, 2, "LINK", 1.0);

        let mut lp = run(&graph, LabelPropagation::new());
        assert!(lp.has_attached_state());
        lp.clean();
        assert!(!lp.has_attached_state());
        assert_eq!(lp.result().unwrap().len(), 2);
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let graph = AdjacencyGraph::new();
        let mut lp = LabelPropagation::new().with_max_rounds(0);
        let outcome = lp.run(&graph, &RunContext::silent(AlgorithmKind::LabelPropagation));
        assert!(matches!(outcome, Err(AlgoError::InvalidConfig(_))));
        assert!(lp.result().is_err());
    }
}
