use crate::error::StoreError;
use crate::index::AdjacencyGraph;
use crate::view::{GraphView, NodeIter, RelationshipIter};
use crate::{loader, snapshot};
use sna_core::model::{Node, Relationship};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

/// Anything that can hand out a consistent read-only view of a graph.
///
/// The scope stays open for as long as the returned view lives; dropping it closes the scope.
pub trait GraphStore: Send + Sync {
    fn open_read_scope(&self) -> Result<Box<dyn GraphView + '_>, StoreError>;
}

#[derive(Debug, Clone)]
pub enum GraphMutation {
    PutNode(Node),
    PutRelationship(Relationship),
}

/// Shared in-memory graph store. Readers hold a read lock for the whole scope, so writes
/// wait until every open scope is dropped.
pub struct GraphDatabase {
    graph: RwLock<AdjacencyGraph>,
    open: AtomicBool,
    scopes_opened: AtomicU64,
}

/// Read lock over a [`GraphDatabase`] exposing the graph contract.
pub struct ReadScope<'a> {
    guard: RwLockReadGuard<'a, AdjacencyGraph>,
    sequence: u64,
}

impl GraphDatabase {
    pub fn new() -> Self {
        Self::from_graph(AdjacencyGraph::new())
    }

    pub fn from_graph(graph: AdjacencyGraph) -> Self {
        Self {
            graph: RwLock::new(graph),
            open: AtomicBool::new(true),
            scopes_opened: AtomicU64::new(0),
        }
    }

    /// Load a database from a text edge list.
    pub fn open_edge_list(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let graph = loader::load_edge_list(&path)?;
        info!(
            "Loaded edge list {} ({} nodes, {} relationships)",
            path.as_ref().display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self::from_graph(graph))
    }

    /// Load a database from a snapshot written by [`GraphDatabase::save_snapshot`].
    pub fn open_snapshot(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let graph = snapshot::read_snapshot(&path)?;
        info!(
            "Loaded snapshot {} ({} nodes, {} relationships)",
            path.as_ref().display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self::from_graph(graph))
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let scope = self.read_scope()?;
        snapshot::write_snapshot(path, &scope.guard)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// After shutdown every new scope and write fails with [`StoreError::Unavailable`].
    pub fn shutdown(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            info!(
                "Graph database shut down after {} read scopes",
                self.scopes_opened.load(Ordering::Relaxed)
            );
        }
    }

    pub fn scopes_opened(&self) -> u64 {
        self.scopes_opened.load(Ordering::Relaxed)
    }

    pub fn read_scope(&self) -> Result<ReadScope<'_>, StoreError> {
        self.ensure_open()?;
        let guard = self
            .graph
            .read()
            .map_err(|_| StoreError::Unavailable("graph lock poisoned".to_string()))?;
        let sequence = self.scopes_opened.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Read scope {} opened", sequence);
        Ok(ReadScope { guard, sequence })
    }

    pub fn put_node(&self, node: Node) -> Result<(), StoreError> {
        self.apply_transaction(vec![GraphMutation::PutNode(node)])
    }

    pub fn put_relationship(&self, relationship: Relationship) -> Result<(), StoreError> {
        self.apply_transaction(vec![GraphMutation::PutRelationship(relationship)])
    }

    /// Apply mutations atomically. If validation fails, nothing is applied.
    pub fn apply_transaction(&self, mutations: Vec<GraphMutation>) -> Result<(), StoreError> {
        if mutations.is_empty() {
            return Ok(());
        }
        self.ensure_open()?;

        let mut graph = self
            .graph
            .write()
            .map_err(|_| StoreError::Unavailable("graph lock poisoned".to_string()))?;

        validate_transaction(&graph, &mutations)?;

        for mutation in mutations {
            match mutation {
                GraphMutation::PutNode(node) => {
                    graph.add_node(node.id);
                }
                GraphMutation::PutRelationship(relationship) => {
                    graph.add_relationship(relationship);
                }
            }
        }

        Ok(())
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("database has been shut down".to_string()))
        }
    }
}

impl Default for GraphDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for GraphDatabase {
    fn open_read_scope(&self) -> Result<Box<dyn GraphView + '_>, StoreError> {
        Ok(Box::new(self.read_scope()?))
    }
}

fn validate_transaction(
    graph: &AdjacencyGraph,
    mutations: &[GraphMutation],
) -> Result<(), StoreError> {
    let mut pending_nodes = HashSet::new();
    let visible = |id: u64, pending: &HashSet<u64>| graph.contains_node(id) || pending.contains(&id);

    for mutation in mutations {
        match mutation {
            GraphMutation::PutNode(node) => {
                pending_nodes.insert(node.id);
            }
            GraphMutation::PutRelationship(rel) => {
                if !visible(rel.source, &pending_nodes) {
                    return Err(StoreError::NodeNotFound(rel.source));
                }
                if !visible(rel.target, &pending_nodes) {
                    return Err(StoreError::NodeNotFound(rel.target));
                }
                if !rel.weight.is_finite() || rel.weight < 0.0 {
                    return Err(StoreError::InvalidRelationship(format!(
                        "relationship {} -> {} has weight {}",
                        rel.source, rel.target, rel.weight
                    )));
                }
            }
        }
    }

    Ok(())
}

impl ReadScope<'_> {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Drop for ReadScope<'_> {
    fn drop(&mut self) {
        debug!("Read scope {} closed", self.sequence);
    }
}

impl GraphView for ReadScope<'_> {
    fn node_count(&self) -> usize {
        self.guard.node_count()
    }

    fn contains_node(&self, id: u64) -> bool {
        self.guard.contains_node(id)
    }

    fn node_ids(&self) -> NodeIter<'_> {
        self.guard.node_ids()
    }

    fn relationships(&self) -> RelationshipIter<'_> {
        self.guard.relationships()
    }

    fn out_relationships(&self, node: u64) -> RelationshipIter<'_> {
        self.guard.out_relationships(node)
    }

    fn in_relationships(&self, node: u64) -> RelationshipIter<'_> {
        self.guard.in_relationships(node)
    }

    fn relationship_count(&self) -> usize {
        self.guard.relationship_count()
    }

    fn out_degree(&self, node: u64) -> usize {
        self.guard.out_degree(node)
    }

    fn in_degree(&self, node: u64) -> usize {
        self.guard.in_degree(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_transaction_commits_all_mutations() {
        let db = GraphDatabase::new();
        db.apply_transaction(vec![
            GraphMutation::PutNode(Node::new(1)),
            GraphMutation::PutNode(Node::new(2)),
            GraphMutation::PutRelationship(Relationship::unweighted(1, 2)),
        ])
        .unwrap();

        let scope = db.read_scope().unwrap();
        assert_eq!(scope.node_count(), 2);
        assert_eq!(scope.out_neighbors(1).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_transaction_rollback_on_missing_endpoint() {
        let db = GraphDatabase::new();
        let result = db.apply_transaction(vec![
            GraphMutation::PutNode(Node::new(1)),
            GraphMutation::PutRelationship(Relationship::unweighted(1, 999)),
        ]);

        assert!(matches!(result, Err(StoreError::NodeNotFound(999))));
        let scope = db.read_scope().unwrap();
        assert_eq!(scope.node_count(), 0, "node should not be partially committed");
    }

    #[test]
    fn test_negative_weight_rejected() {
        let db = GraphDatabase::new();
        db.put_node(Node::new(1)).unwrap();
        let result = db.put_relationship(Relationship::new(1, 1, "LINK", -2.0));
        assert!(matches!(result, Err(StoreError::InvalidRelationship(_))));
    }

    #[test]
    fn test_shutdown_makes_store_unavailable() {
        let db = GraphDatabase::new();
        db.put_node(Node::new(1)).unwrap();
        db.shutdown();
        db.shutdown();

        assert!(!db.is_open());
        assert!(matches!(db.open_read_scope(), Err(StoreError::Unavailable(_))));
        assert!(matches!(db.put_node(Node::new(2)), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_concurrent_read_scopes_share_the_graph() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(1, 2, "LINK", 1.0);
        let db = Arc::new(GraphDatabase::from_graph(graph));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let scope = db.open_read_scope().unwrap();
                    scope.relationship_count()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(db.scopes_opened(), 4);
    }
}
