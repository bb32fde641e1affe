use sna_core::model::Relationship;
use std::collections::HashSet;

pub type NodeIter<'a> = Box<dyn Iterator<Item = u64> + 'a>;
pub type RelationshipIter<'a> = Box<dyn Iterator<Item = &'a Relationship> + 'a>;

/// Read-only access to a graph for the duration of one algorithm run.
pub trait GraphView {
    fn node_count(&self) -> usize;

    fn contains_node(&self, id: u64) -> bool;

    fn node_ids(&self) -> NodeIter<'_>;

    fn relationships(&self) -> RelationshipIter<'_>;

    /// Relationships whose source is `node`. Empty for unknown nodes.
    fn out_relationships(&self, node: u64) -> RelationshipIter<'_>;

    /// Relationships whose target is `node`. Empty for unknown nodes.
    fn in_relationships(&self, node: u64) -> RelationshipIter<'_>;

    fn relationship_count(&self) -> usize {
        self.relationships().count()
    }

    fn out_neighbors(&self, node: u64) -> NodeIter<'_> {
        Box::new(self.out_relationships(node).map(|rel| rel.target))
    }

    fn in_neighbors(&self, node: u64) -> NodeIter<'_> {
        Box::new(self.in_relationships(node).map(|rel| rel.source))
    }

    fn out_degree(&self, node: u64) -> usize {
        self.out_relationships(node).count()
    }

    fn in_degree(&self, node: u64) -> usize {
        self.in_relationships(node).count()
    }
}

/// Hides every relationship whose type is not in the allowed set. Nodes stay visible.
pub struct FilteredView<'g> {
    inner: &'g dyn GraphView,
    allowed: HashSet<String>,
}

impl<'g> FilteredView<'g> {
    pub fn new<I, S>(inner: &'g dyn GraphView, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    fn keep<'a>(&'a self, iter: RelationshipIter<'a>) -> RelationshipIter<'a> {
        Box::new(iter.filter(move |rel| self.allowed.contains(&rel.rel_type)))
    }
}

impl GraphView for FilteredView<'_> {
    fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    fn contains_node(&self, id: u64) -> bool {
        self.inner.contains_node(id)
    }

    fn node_ids(&self) -> NodeIter<'_> {
        self.inner.node_ids()
    }

    fn relationships(&self) -> RelationshipIter<'_> {
        self.keep(self.inner.relationships())
    }

    fn out_relationships(&self, node: u64) -> RelationshipIter<'_> {
        self.keep(self.inner.out_relationships(node))
    }

    fn in_relationships(&self, node: u64) -> RelationshipIter<'_> {
        self.keep(self.inner.in_relationships(node))
    }
}
