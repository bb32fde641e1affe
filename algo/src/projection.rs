//! Compact, index-based copy of a graph view.
//!
//! Node ids are remapped to `0..n` in ascending id order, so index order and id order agree.
//! Adjacency is stored in CSR form for both directions; parallel relationships keep one
//! entry each.

use crate::error::AlgoError;
use crate::result::ResultMap;
use storage::GraphView;

pub struct Projection {
    ids: Vec<u64>,
    out_offsets: Vec<usize>,
    out_targets: Vec<usize>,
    out_weights: Vec<f64>,
    in_offsets: Vec<usize>,
    in_sources: Vec<usize>,
    in_weights: Vec<f64>,
}

/// One relationship in compact indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactEdge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

impl Projection {
    pub fn from_view(view: &dyn GraphView) -> Result<Self, AlgoError> {
        let mut ids: Vec<u64> = view.node_ids().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut edges = Vec::with_capacity(view.relationship_count());
        for rel in view.relationships() {
            let (Ok(source), Ok(target)) = (ids.binary_search(&rel.source), ids.binary_search(&rel.target))
            else {
                return Err(AlgoError::DanglingRelationship {
                    from: rel.source,
                    to: rel.target,
                });
            };
            if !rel.weight.is_finite() || rel.weight < 0.0 {
                return Err(AlgoError::InvalidWeight {
                    from: rel.source,
                    to: rel.target,
                    weight: rel.weight,
                });
            }
            edges.push(CompactEdge {
                source,
                target,
                weight: rel.weight,
            });
        }

        Ok(Self::from_edges(ids, &edges))
    }

    fn from_edges(ids: Vec<u64>, edges: &[CompactEdge]) -> Self {
        let n = ids.len();

        let (out_offsets, out_targets, out_weights) =
            build_csr(n, edges, |edge| (edge.source, edge.target));
        let (in_offsets, in_sources, in_weights) =
            build_csr(n, edges, |edge| (edge.target, edge.source));

        Self {
            ids,
            out_offsets,
            out_targets,
            out_weights,
            in_offsets,
            in_sources,
            in_weights,
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.out_targets.len()
    }

    /// Ascending original ids; position is the compact index.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn id(&self, idx: usize) -> u64 {
        self.ids[idx]
    }

    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    pub fn out_targets(&self, idx: usize) -> &[usize] {
        &self.out_targets[self.out_offsets[idx]..self.out_offsets[idx + 1]]
    }

    pub fn out_weights(&self, idx: usize) -> &[f64] {
        &self.out_weights[self.out_offsets[idx]..self.out_offsets[idx + 1]]
    }

    pub fn in_sources(&self, idx: usize) -> &[usize] {
        &self.in_sources[self.in_offsets[idx]..self.in_offsets[idx + 1]]
    }

    pub fn in_weights(&self, idx: usize) -> &[f64] {
        &self.in_weights[self.in_offsets[idx]..self.in_offsets[idx + 1]]
    }

    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_offsets[idx + 1] - self.out_offsets[idx]
    }

    /// Neighbours in both directions, with multiplicity.
    pub fn undirected_neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.out_targets(idx)
            .iter()
            .chain(self.in_sources(idx))
            .copied()
    }

    /// Every relationship once, grouped by source.
    pub fn edges(&self) -> impl Iterator<Item = CompactEdge> + '_ {
        (0..self.node_count()).flat_map(move |source| {
            self.out_targets(source)
                .iter()
                .zip(self.out_weights(source))
                .map(move |(&target, &weight)| CompactEdge {
                    source,
                    target,
                    weight,
                })
        })
    }

    /// Sorted, de-duplicated neighbour sets of the undirected simple graph (no self-loops).
    pub fn simple_undirected(&self) -> Vec<Vec<usize>> {
        (0..self.node_count())
            .map(|idx| {
                let mut neighbors: Vec<usize> = self
                    .undirected_neighbors(idx)
                    .filter(|&other| other != idx)
                    .collect();
                neighbors.sort_unstable();
                neighbors.dedup();
                neighbors
            })
            .collect()
    }

    /// Wraps per-index values into a result keyed by original id.
    pub fn to_result<V>(&self, values: Vec<V>) -> ResultMap<V> {
        ResultMap::from_dense(self.ids.clone(), values)
    }
}

fn build_csr(
    n: usize,
    edges: &[CompactEdge],
    endpoints: impl Fn(&CompactEdge) -> (usize, usize),
) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
    let mut offsets = vec![0usize; n + 1];
    for edge in edges {
        let (from, _) = endpoints(edge);
        offsets[from + 1] += 1;
    }
    for i in 0..n {
        offsets[i + 1] += offsets[i];
    }

    let mut cursor = offsets.clone();
    let mut neighbors = vec![0usize; edges.len()];
    let mut weights = vec![0.0f64; edges.len()];
    for edge in edges {
        let (from, to) = endpoints(edge);
        let slot = cursor[from];
        neighbors[slot] = to;
        weights[slot] = edge.weight;
        cursor[from] += 1;
    }

    (offsets, neighbors, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sna_core::model::Relationship;
    use storage::view::{NodeIter, RelationshipIter};
    use storage::AdjacencyGraph;

    #[test]
    fn test_ids_are_sorted_and_adjacency_matches() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(30, 10, "LINK", 1.0);
        graph.add_edge(10, 20, "LINK", 2.0);
        graph.add_edge(10, 20, "LINK", 3.0);

        let projection = Projection::from_view(&graph).unwrap();
        assert_eq!(projection.ids(), &[10, 20, 30]);

        let ten = projection.index_of(10).unwrap();
        assert_eq!(projection.out_targets(ten), &[1, 1]);
        assert_eq!(projection.out_weights(ten), &[2.0, 3.0]);
        assert_eq!(projection.in_sources(ten), &[2]);
        assert_eq!(projection.out_degree(ten), 2);
        assert_eq!(projection.relationship_count(), 3);
        assert_eq!(projection.edges().count(), 3);
        assert_eq!(projection.simple_undirected()[ten], vec![1, 2]);
    }

    struct BrokenView {
        relationships: Vec<Relationship>,
    }

    impl GraphView for BrokenView {
        fn node_count(&self) -> usize {
            1
        }
        fn contains_node(&self, id: u64) -> bool {
            id == 1
        }
        fn node_ids(&self) -> NodeIter<'_> {
            Box::new(std::iter::once(1))
        }
        fn relationships(&self) -> RelationshipIter<'_> {
            Box::new(self.relationships.iter())
        }
        fn out_relationships(&self, _node: u64) -> RelationshipIter<'_> {
            Box::new(std::iter::empty())
        }
        fn in_relationships(&self, _node: u64) -> RelationshipIter<'_> {
            Box::new(std::iter::empty())
        }
    }

    #[test]
    fn test_relationship_to_unknown_node_is_rejected() {
        let view = BrokenView {
            relationships: vec![Relationship::unweighted(1, 2)],
        };
        assert!(matches!(
            Projection::from_view(&view),
            Err(AlgoError::DanglingRelationship { from: 1, to: 2 })
        ));
    }

    #[test]
    fn test_non_finite_weight_is_rejected() {
        let view = BrokenView {
            relationships: vec![Relationship::new(1, 1, "LINK", f64::NAN)],
        };
        assert!(matches!(
            Projection::from_view(&view),
            Err(AlgoError::InvalidWeight { .. })
        ));
    }
}
