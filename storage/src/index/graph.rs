use crate::view::{GraphView, NodeIter, RelationshipIter};
use sna_core::model::Relationship;
use std::collections::HashMap;

/// In-memory multigraph: relationship records plus per-node outgoing/incoming indexes.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    nodes: Vec<u64>,
    slots: HashMap<u64, usize>,
    relationships: Vec<Relationship>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the node already existed.
    pub fn add_node(&mut self, id: u64) -> bool {
        if self.slots.contains_key(&id) {
            return false;
        }
        self.slots.insert(id, self.nodes.len());
        self.nodes.push(id);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        true
    }

    /// Adds a relationship, creating missing endpoints.
    pub fn add_edge(&mut self, source: u64, target: u64, rel_type: impl Into<String>, weight: f64) {
        self.add_relationship(Relationship::new(source, target, rel_type, weight));
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.add_node(relationship.source);
        self.add_node(relationship.target);

        let idx = self.relationships.len();
        let source_slot = self.slots[&relationship.source];
        let target_slot = self.slots[&relationship.target];
        self.outgoing[source_slot].push(idx);
        self.incoming[target_slot].push(idx);
        self.relationships.push(relationship);
    }

    /// Node ids in insertion order.
    pub fn nodes(&self) -> &[u64] {
        &self.nodes
    }

    pub fn relationship_list(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn edge_count(&self) -> usize {
        self.relationships.len()
    }

    fn indexed<'a>(&'a self, list: Option<&'a Vec<usize>>) -> RelationshipIter<'a> {
        match list {
            Some(list) => Box::new(list.iter().map(move |idx| &self.relationships[*idx])),
            None => Box::new(std::iter::empty()),
        }
    }
}

impl GraphView for AdjacencyGraph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn contains_node(&self, id: u64) -> bool {
        self.slots.contains_key(&id)
    }

    fn node_ids(&self) -> NodeIter<'_> {
        Box::new(self.nodes.iter().copied())
    }

    fn relationships(&self) -> RelationshipIter<'_> {
        Box::new(self.relationships.iter())
    }

    fn out_relationships(&self, node: u64) -> RelationshipIter<'_> {
        self.indexed(self.slots.get(&node).map(|slot| &self.outgoing[*slot]))
    }

    fn in_relationships(&self, node: u64) -> RelationshipIter<'_> {
        self.indexed(self.slots.get(&node).map(|slot| &self.incoming[*slot]))
    }

    fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    fn out_degree(&self, node: u64) -> usize {
        self.slots
            .get(&node)
            .map(|slot| self.outgoing[*slot].len())
            .unwrap_or(0)
    }

    fn in_degree(&self, node: u64) -> usize {
        self.slots
            .get(&node)
            .map(|slot| self.incoming[*slot].len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_out_and_in_neighbors() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(1, 2, "knows", 1.0);
        graph.add_edge(1, 3, "likes", 0.8);

        let out: Vec<u64> = graph.out_neighbors(1).collect();
        assert_eq!(out, vec![2, 3]);
        let incoming: Vec<u64> = graph.in_neighbors(3).collect();
        assert_eq!(incoming, vec![1]);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_parallel_relationships_are_kept() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(1, 2, "knows", 1.0);
        graph.add_edge(1, 2, "knows", 2.5);

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.out_degree(1), 2);
        assert_eq!(graph.in_degree(2), 2);
        let weights: Vec<f64> = graph.out_relationships(1).map(|rel| rel.weight).collect();
        assert_eq!(weights, vec![1.0, 2.5]);
    }

    #[test]
    fn test_isolated_and_unknown_nodes() {
        let mut graph = AdjacencyGraph::new();
        assert!(graph.add_node(7));
        assert!(!graph.add_node(7));

        assert!(graph.contains_node(7));
        assert_eq!(graph.out_degree(7), 0);
        assert_eq!(graph.out_neighbors(99).count(), 0);
        assert_eq!(graph.in_degree(99), 0);
    }

    #[test]
    fn test_self_loop_is_in_both_indexes() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(4, 4, "self", 1.0);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.out_degree(4), 1);
        assert_eq!(graph.in_degree(4), 1);
        assert!(graph.relationship_list()[0].is_self_loop());
    }
}
