//! Weakly connected components via union-find.

use crate::algorithm::{Algorithm, AlgorithmKind, AttachedState, RunContext};
use crate::error::{AlgoError, EngineError};
use crate::projection::Projection;
use crate::result::{ResultMap, ResultSlot};
use storage::GraphView;

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    // Path halving keeps this iterative.
    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }

    fn into_parents(self) -> Vec<usize> {
        self.parent
    }
}

/// Labels each node with the smallest node id of its weakly connected component.
#[derive(Debug, Default)]
pub struct ConnectedComponents {
    parents: AttachedState<usize>,
    result: ResultSlot<ResultMap<u64>>,
}

impl ConnectedComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component_count(&self) -> Result<usize, EngineError> {
        Ok(self.result()?.distinct_count())
    }
}

impl Algorithm for ConnectedComponents {
    type Output = ResultMap<u64>;

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::ConnectedComponents
    }

    fn run(&mut self, graph: &dyn GraphView, _ctx: &RunContext) -> Result<(), AlgoError> {
        self.result.clear();

        let projection = Projection::from_view(graph)?;
        let n = projection.node_count();
        let mut uf = UnionFind::new(n);
        for edge in projection.edges() {
            uf.union(edge.source, edge.target);
        }

        // Indices follow ascending id, so the first index seen per root is the minimum.
        let mut smallest = vec![usize::MAX; n];
        let mut labels = Vec::with_capacity(n);
        for v in 0..n {
            let root = uf.find(v);
            if smallest[root] == usize::MAX {
                smallest[root] = v;
            }
            labels.push(projection.id(smallest[root]));
        }

        self.result.publish(projection.to_result(labels));
        self.parents.attach(uf.into_parents());
        Ok(())
    }

    fn result(&self) -> Result<&ResultMap<u64>, EngineError> {
        self.result.get(AlgorithmKind::ConnectedComponents.as_str())
    }

    fn clean(&mut self) {
        self.parents.release();
    }

    fn has_attached_state(&self) -> bool {
        self.parents.is_attached()
    }
}
