//! Modularity of a fixed partition, in the undirected and directed formulations.
//!
//! Both scores are accumulated per community in a single pass over the relationships, in
//! ascending community order, so repeated runs give bit-identical values. When every node
//! shares one community the internal and total weights are built from the same additions
//! and the score is exactly zero.

use crate::algorithm::{Algorithm, AlgorithmKind, RunContext};
use crate::error::{AlgoError, EngineError};
use crate::projection::Projection;
use crate::result::{ResultMap, ResultSlot};
use std::collections::BTreeMap;
use storage::GraphView;

/// Community of every node of the projection, in index order.
fn communities_of(
    projection: &Projection,
    partition: &ResultMap<u64>,
) -> Result<Vec<u64>, AlgoError> {
    projection
        .ids()
        .iter()
        .map(|&id| {
            partition
                .get(id)
                .copied()
                .ok_or(AlgoError::MissingCommunity(id))
        })
        .collect()
}

/// `Q = Σ_c [ in_c / 2m − (tot_c / 2m)² ]`, relationships read as undirected.
///
/// A self-loop of weight `w` adds `2w` to its community's internal weight and degree.
#[derive(Debug)]
pub struct UndirectedModularity {
    partition: ResultMap<u64>,
    result: ResultSlot<f64>,
}

impl UndirectedModularity {
    pub fn new(partition: ResultMap<u64>) -> Self {
        Self {
            partition,
            result: ResultSlot::default(),
        }
    }

    pub fn partition(&self) -> &ResultMap<u64> {
        &self.partition
    }
}

impl Algorithm for UndirectedModularity {
    type Output = f64;

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::UndirectedModularity
    }

    fn run(&mut self, graph: &dyn GraphView, _ctx: &RunContext) -> Result<(), AlgoError> {
        self.result.clear();

        let projection = Projection::from_view(graph)?;
        let community = communities_of(&projection, &self.partition)?;

        let mut internal: BTreeMap<u64, f64> = BTreeMap::new();
        let mut degree: BTreeMap<u64, f64> = BTreeMap::new();
        let mut two_m = 0.0f64;

        for edge in projection.edges() {
            let cs = community[edge.source];
            let ct = community[edge.target];
            let w = edge.weight;
            two_m += 2.0 * w;
            if cs == ct {
                *internal.entry(cs).or_default() += 2.0 * w;
                *degree.entry(cs).or_default() += 2.0 * w;
            } else {
                *degree.entry(cs).or_default() += w;
                *degree.entry(ct).or_default() += w;
            }
        }

        let q = if two_m > 0.0 {
            degree
                .iter()
                .map(|(c, &tot)| {
                    let inside = internal.get(c).copied().unwrap_or(0.0);
                    inside / two_m - (tot / two_m) * (tot / two_m)
                })
                .sum()
        } else {
            0.0
        };

        self.result.publish(q);
        Ok(())
    }

    fn result(&self) -> Result<&f64, EngineError> {
        self.result.get(AlgorithmKind::UndirectedModularity.as_str())
    }
}

/// `Q = Σ_c [ in_c / m − out_c · in'_c / m² ]` where `in_c` is the weight of relationships
/// inside `c`, `out_c` the weight leaving nodes of `c` and `in'_c` the weight arriving.
#[derive(Debug)]
pub struct DirectedModularity {
    partition: ResultMap<u64>,
    result: ResultSlot<f64>,
}

impl DirectedModularity {
    pub fn new(partition: ResultMap<u64>) -> Self {
        Self {
            partition,
            result: ResultSlot::default(),
        }
    }

    pub fn partition(&self) -> &ResultMap<u64> {
        &self.partition
    }
}

#[derive(Default, Clone, Copy)]
struct DirectedTotals {
    internal: f64,
    outgoing: f64,
    incoming: f64,
}

impl Algorithm for DirectedModularity {
    type Output = f64;

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::DirectedModularity
    }

    fn run(&mut self, graph: &dyn GraphView, _ctx: &RunContext) -> Result<(), AlgoError> {
        self.result.clear();

        let projection = Projection::from_view(graph)?;
        let community = communities_of(&projection, &self.partition)?;

        let mut totals: BTreeMap<u64, DirectedTotals> = BTreeMap::new();
        let mut m = 0.0f64;

        for edge in projection.edges() {
            let cs = community[edge.source];
            let ct = community[edge.target];
            let w = edge.weight;
            m += w;
            totals.entry(cs).or_default().outgoing += w;
            let target = totals.entry(ct).or_default();
            target.incoming += w;
            if cs == ct {
                target.internal += w;
            }
        }

        let q = if m > 0.0 {
            totals
                .values()
                .map(|t| t.internal / m - (t.outgoing / m) * (t.incoming / m))
                .sum()
        } else {
            0.0
        };

        self.result.publish(q);
        Ok(())
    }

    fn result(&self) -> Result<&f64, EngineError> {
        self.result.get(AlgorithmKind::DirectedModularity.as_str())
    }
}
