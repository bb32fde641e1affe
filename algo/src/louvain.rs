//! Multilevel Louvain community detection.
//!
//! Each level runs a local pass (single-node moves that raise modularity) and then
//! collapses every community into one node of the next level. Nodes of every level are
//! named by the smallest original id they contain, so each layer is keyed by original
//! node ids and its keys stay sorted.
//!
//! Adjacency is stored symmetrically: an undirected weight `w` between distinct nodes
//! appears in both rows, a self-loop of weight `w` appears once as `2w`. With that
//! convention the degree of a node is its row sum, `2m` is the sum of all degrees, and
//! the modularity reported per level equals [`crate::UndirectedModularity`] of the
//! composed partition at resolution 1.

use crate::algorithm::{Algorithm, AlgorithmKind, RunContext};
use crate::error::{AlgoError, EngineError};
use crate::projection::Projection;
use crate::result::{ResultMap, ResultSlot};
use serde::Serialize;
use sna_core::config::LouvainConfig;
use std::ops::Range;
use storage::GraphView;
use tracing::debug;

/// One level of the hierarchy: level-k node (by representative id) to community
/// representative, plus the modularity of that partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LouvainLayer {
    pub assignment: ResultMap<u64>,
    pub modularity: f64,
}

impl LouvainLayer {
    /// Number of nodes at this level.
    pub fn size(&self) -> usize {
        self.assignment.len()
    }

    pub fn community_count(&self) -> usize {
        self.assignment.distinct_count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LouvainResult {
    layers: Vec<LouvainLayer>,
}

impl LouvainResult {
    /// Indices of the available layers, finest first.
    pub fn layers(&self) -> Range<usize> {
        0..self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&LouvainLayer> {
        self.layers.get(index)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LouvainLayer> + '_ {
        self.layers.iter()
    }

    pub fn modularity(&self, index: usize) -> Option<f64> {
        self.layers.get(index).map(|layer| layer.modularity)
    }

    pub fn final_modularity(&self) -> f64 {
        self.layers.last().map_or(0.0, |layer| layer.modularity)
    }

    /// Community of every original node after composing layers `0..=level`.
    pub fn assignment_at(&self, level: usize) -> Option<ResultMap<u64>> {
        let first = self.layers.first()?;
        if level >= self.layers.len() {
            return None;
        }
        let composed = first.assignment.map_values(|&community| {
            self.layers[1..=level]
                .iter()
                .fold(community, |current, layer| {
                    layer.assignment.get(current).copied().unwrap_or(current)
                })
        });
        Some(composed)
    }

    /// Top-level community of every original node.
    pub fn final_assignment(&self) -> ResultMap<u64> {
        match self.layers.len() {
            0 => ResultMap::empty(),
            n => self.assignment_at(n - 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    LocalOptimizing,
    Aggregating,
    Converged,
}

/// Weighted undirected graph of one level.
struct LevelGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
    degree: Vec<f64>,
    total: f64,
}

impl LevelGraph {
    fn from_projection(projection: &Projection) -> Self {
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); projection.node_count()];
        for edge in projection.edges() {
            if edge.source == edge.target {
                rows[edge.source].push((edge.source, 2.0 * edge.weight));
            } else {
                rows[edge.source].push((edge.target, edge.weight));
                rows[edge.target].push((edge.source, edge.weight));
            }
        }
        Self::from_rows(rows)
    }

    fn from_rows(mut rows: Vec<Vec<(usize, f64)>>) -> Self {
        for row in &mut rows {
            merge_row(row);
        }
        let degree: Vec<f64> = rows
            .iter()
            .map(|row| row.iter().map(|&(_, w)| w).sum())
            .collect();
        let total = degree.iter().sum();
        Self {
            adjacency: rows,
            degree,
            total,
        }
    }

    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Collapses each community into a node; weights inside a community become its self-loop.
    fn aggregate(&self, community: &[usize], count: usize) -> Self {
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); count];
        for (i, row) in self.adjacency.iter().enumerate() {
            let ci = community[i];
            rows[ci].extend(row.iter().map(|&(j, w)| (community[j], w)));
        }
        Self::from_rows(rows)
    }

    fn modularity(&self, community: &[usize], count: usize, resolution: f64) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        let mut internal = vec![0.0f64; count];
        let mut tot = vec![0.0f64; count];
        for (i, row) in self.adjacency.iter().enumerate() {
            let ci = community[i];
            tot[ci] += self.degree[i];
            for &(j, w) in row {
                if community[j] == ci {
                    internal[ci] += w;
                }
            }
        }
        internal
            .iter()
            .zip(&tot)
            .map(|(&inside, &t)| {
                inside / self.total - resolution * (t / self.total) * (t / self.total)
            })
            .sum()
    }
}

/// Sorts a row by neighbour and sums duplicate entries.
fn merge_row(row: &mut Vec<(usize, f64)>) {
    row.sort_by_key(|&(j, _)| j);
    let mut merged: Vec<(usize, f64)> = Vec::with_capacity(row.len());
    for &(j, w) in row.iter() {
        match merged.last_mut() {
            Some(last) if last.0 == j => last.1 += w,
            _ => merged.push((j, w)),
        }
    }
    *row = merged;
}

/// Outcome of one local pass.
struct LocalPass {
    community: Vec<usize>,
    count: usize,
    moved: bool,
}

#[derive(Debug, Default)]
pub struct Louvain {
    config: LouvainConfig,
    result: ResultSlot<LouvainResult>,
}

impl Louvain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LouvainConfig) -> Self {
        Self {
            config,
            result: ResultSlot::default(),
        }
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.config.resolution = resolution;
        self
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.config.max_levels = max_levels;
        self
    }

    fn validate(&self) -> Result<(), AlgoError> {
        let c = &self.config;
        if c.min_gain.is_nan() || c.min_gain < 0.0 {
            return Err(AlgoError::InvalidConfig(format!(
                "min_gain must be non-negative, got {}",
                c.min_gain
            )));
        }
        if !c.resolution.is_finite() || c.resolution <= 0.0 {
            return Err(AlgoError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                c.resolution
            )));
        }
        if c.max_sweeps == 0 || c.max_levels == 0 {
            return Err(AlgoError::InvalidConfig(
                "max_sweeps and max_levels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Greedy single-node moves in index order until a sweep moves nothing.
    fn local_pass(
        &self,
        graph: &LevelGraph,
        ctx: &RunContext,
        sweeps: &mut usize,
    ) -> LocalPass {
        let n = graph.node_count();
        let mut community: Vec<usize> = (0..n).collect();
        let mut moved_any = false;

        if graph.total > 0.0 {
            let gamma = self.config.resolution;
            let total = graph.total;
            let mut tot = graph.degree.clone();
            let mut link_weight = vec![0.0f64; n];
            let mut seen = vec![false; n];
            let mut touched: Vec<usize> = Vec::new();

            for _ in 0..self.config.max_sweeps {
                let mut moves = 0usize;

                for i in 0..n {
                    let own = community[i];
                    let ki = graph.degree[i];

                    for &(j, w) in &graph.adjacency[i] {
                        if j == i {
                            continue;
                        }
                        let c = community[j];
                        if !seen[c] {
                            seen[c] = true;
                            touched.push(c);
                        }
                        link_weight[c] += w;
                    }

                    tot[own] -= ki;
                    let gain = |c: usize, link: f64| link - gamma * tot[c] * ki / total;
                    let own_gain = gain(own, link_weight[own]);
                    let mut best = own;
                    let mut best_gain = own_gain;
                    for &c in &touched {
                        let g = gain(c, link_weight[c]);
                        if g > best_gain {
                            best = c;
                            best_gain = g;
                        }
                    }
                    // Difference in modularity between the two placements of `i`.
                    let improvement = 2.0 * (best_gain - own_gain) / total;
                    if best != own && improvement <= self.config.min_gain {
                        best = own;
                    }
                    tot[best] += ki;

                    for &c in &touched {
                        link_weight[c] = 0.0;
                        seen[c] = false;
                    }
                    link_weight[own] = 0.0;
                    touched.clear();

                    if best != own {
                        community[i] = best;
                        moves += 1;
                    }
                }

                *sweeps += 1;
                ctx.iteration(*sweeps, moves as f64);
                if moves == 0 {
                    break;
                }
                moved_any = true;
            }
        }

        let count = renumber(&mut community);
        LocalPass {
            community,
            count,
            moved: moved_any,
        }
    }
}

/// Renames communities `0..k` by first appearance in index order and returns `k`.
fn renumber(community: &mut [usize]) -> usize {
    let mut mapping = vec![usize::MAX; community.len()];
    let mut next = 0usize;
    for c in community.iter_mut() {
        if mapping[*c] == usize::MAX {
            mapping[*c] = next;
            next += 1;
        }
        *c = mapping[*c];
    }
    next
}

impl Algorithm for Louvain {
    type Output = LouvainResult;

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Louvain
    }

    fn run(&mut self, graph: &dyn GraphView, ctx: &RunContext) -> Result<(), AlgoError> {
        self.result.clear();
        self.validate()?;

        let projection = Projection::from_view(graph)?;
        let mut level = LevelGraph::from_projection(&projection);
        // Representative (smallest original id) of every node of the current level.
        let mut reps: Vec<u64> = projection.ids().to_vec();
        let mut layers: Vec<LouvainLayer> = Vec::new();
        let mut pass: Option<LocalPass> = None;
        let mut sweeps = 0usize;
        let mut phase = Phase::LocalOptimizing;

        loop {
            phase = match phase {
                Phase::LocalOptimizing => {
                    let outcome = self.local_pass(&level, ctx, &mut sweeps);
                    if !layers.is_empty() && !outcome.moved {
                        Phase::Converged
                    } else {
                        // Communities are numbered by first member, and reps ascend with
                        // index, so a community's first member holds its smallest id.
                        let mut community_rep = vec![u64::MAX; outcome.count];
                        for (i, &c) in outcome.community.iter().enumerate() {
                            if community_rep[c] == u64::MAX {
                                community_rep[c] = reps[i];
                            }
                        }
                        let modularity = level.modularity(
                            &outcome.community,
                            outcome.count,
                            self.config.resolution,
                        );
                        let assigned: Vec<u64> =
                            outcome.community.iter().map(|&c| community_rep[c]).collect();
                        if ctx.logging_enabled() {
                            debug!(
                                level = layers.len(),
                                nodes = level.node_count(),
                                communities = outcome.count,
                                modularity,
                                "louvain level finished"
                            );
                        }
                        layers.push(LouvainLayer {
                            assignment: ResultMap::from_dense(reps.clone(), assigned),
                            modularity,
                        });

                        let shrunk = outcome.count < level.node_count();
                        reps = community_rep;
                        pass = Some(outcome);
                        if shrunk && layers.len() < self.config.max_levels {
                            Phase::Aggregating
                        } else {
                            Phase::Converged
                        }
                    }
                }
                Phase::Aggregating => {
                    let outcome = pass.take().ok_or_else(|| {
                        AlgoError::InvariantViolation(
                            "aggregation without a local pass".to_string(),
                        )
                    })?;
                    level = level.aggregate(&outcome.community, outcome.count);
                    Phase::LocalOptimizing
                }
                Phase::Converged => break,
            };
        }

        ctx.converged(sweeps);
        self.result.publish(LouvainResult { layers });
        Ok(())
    }

    fn result(&self) -> Result<&LouvainResult, EngineError> {
        self.result.get(AlgorithmKind::Louvain.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::AdjacencyGraph;

    fn ring_of_cliques(cliques: u64, size: u64) -> AdjacencyGraph {
        let mut graph = AdjacencyGraph::new();
        for c in 0..cliques {
            let base = c * size;
            for a in 0..size {
                for b in (a + 1)..size {
                    graph.add_edge(base + a, base + b, "LINK", 1.0);
                }
            }
            let next = ((c + 1) % cliques) * size;
            graph.add_edge(base, next + 1, "LINK", 1.0);
        }
        graph
    }

    fn detect(graph: &AdjacencyGraph) -> LouvainResult {
        let mut louvain = Louvain::new();
        louvain
            .run(graph, &RunContext::silent(AlgorithmKind::Louvain))
            .unwrap();
        louvain.result().unwrap().clone()
    }

    #[test]
    fn test_ring_of_cliques_finds_each_clique() {
        let graph = ring_of_cliques(6, 5);
        let result = detect(&graph);
        let communities = result.final_assignment();

        assert_eq!(communities.len(), 30);
        assert_eq!(communities.distinct_count(), 6);
        for c in 0..6u64 {
            let base = c * 5;
            for member in base..base + 5 {
                assert_eq!(communities[member], communities[base]);
            }
        }
        assert!(result.final_modularity() > 0.5);
    }

    #[test]
    fn test_layer_sizes_strictly_decrease() {
        let result = detect(&ring_of_cliques(8, 4));
        let sizes: Vec<usize> = result.iter().map(LouvainLayer::size).collect();

        assert_eq!(sizes[0], 32);
        assert!(sizes.windows(2).all(|w| w[1] < w[0]));
        // Communities of one level are exactly the nodes of the next.
        for i in result.layers().skip(1) {
            let previous = result.layer(i - 1).unwrap().assignment.groups();
            let current: Vec<u64> = result.layer(i).unwrap().assignment.keys().collect();
            assert_eq!(previous.keys().copied().collect::<Vec<_>>(), current);
        }
    }

    #[test]
    fn test_edgeless_graph_keeps_singletons() {
        let mut graph = AdjacencyGraph::new();
        graph.add_node(3);
        graph.add_node(1);

        let result = detect(&graph);
        assert_eq!(result.layer_count(), 1);
        assert_eq!(result.final_assignment()[1], 1);
        assert_eq!(result.final_assignment()[3], 3);
        assert_eq!(result.final_modularity(), 0.0);
    }

    #[test]
    fn test_empty_graph_has_one_empty_layer() {
        let result = detect(&AdjacencyGraph::new());
        assert_eq!(result.layer_count(), 1);
        assert!(result.final_assignment().is_empty());
    }

    #[test]
    fn test_representatives_are_smallest_member_ids() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(10, 11, "LINK", 5.0);
        graph.add_edge(20, 21, "LINK", 5.0);
        graph.add_edge(11, 20, "LINK", 0.1);

        let communities = detect(&graph).final_assignment();
        assert_eq!(communities[11], 10);
        assert_eq!(communities[21], 20);
    }

    #[test]
    fn test_merge_row_sums_duplicates() {
        let mut row = vec![(3, 1.0), (1, 2.0), (3, 0.5)];
        merge_row(&mut row);
        assert_eq!(row, vec![(1, 2.0), (3, 1.5)]);
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let mut louvain = Louvain::new().with_resolution(0.0);
        let outcome = louvain.run(
            &AdjacencyGraph::new(),
            &RunContext::silent(AlgorithmKind::Louvain),
        );
        assert!(matches!(outcome, Err(AlgoError::InvalidConfig(_))));
    }
}
