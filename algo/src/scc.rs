//! Strongly connected components (Tarjan, explicit work stack).

use crate::algorithm::{Algorithm, AlgorithmKind, RunContext};
use crate::error::{AlgoError, EngineError};
use crate::projection::Projection;
use crate::result::{ResultMap, ResultSlot};
use storage::GraphView;

const UNVISITED: usize = usize::MAX;

/// Labels each node with the smallest node id of its strongly connected component.
#[derive(Debug, Default)]
pub struct StronglyConnectedComponents {
    result: ResultSlot<ResultMap<u64>>,
}

impl StronglyConnectedComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component_count(&self) -> Result<usize, EngineError> {
        Ok(self.result()?.distinct_count())
    }
}

impl Algorithm for StronglyConnectedComponents {
    type Output = ResultMap<u64>;

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::StronglyConnectedComponents
    }

    fn run(&mut self, graph: &dyn GraphView, _ctx: &RunContext) -> Result<(), AlgoError> {
        self.result.clear();

        let projection = Projection::from_view(graph)?;
        let component = tarjan(&projection)?;
        let labels = component.into_iter().map(|c| projection.id(c)).collect();

        self.result.publish(projection.to_result(labels));
        Ok(())
    }

    fn result(&self) -> Result<&ResultMap<u64>, EngineError> {
        self.result
            .get(AlgorithmKind::StronglyConnectedComponents.as_str())
    }
}

/// Returns, per node index, the smallest index in its component.
fn tarjan(projection: &Projection) -> Result<Vec<usize>, AlgoError> {
    let n = projection.node_count();
    let mut next_index = 0usize;
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![UNVISITED; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut component = vec![UNVISITED; n];

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }

        // (node, position in its out-list)
        let mut work: Vec<(usize, usize)> = vec![(root, 0)];
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(top) = work.last_mut() {
            let v = top.0;
            let targets = projection.out_targets(v);
            if top.1 < targets.len() {
                let w = targets[top.1];
                top.1 += 1;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    work.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if lowlink[v] != index[v] {
                continue;
            }

            let mut members = Vec::new();
            loop {
                let w = stack.pop().ok_or_else(|| {
                    AlgoError::InvariantViolation("tarjan stack exhausted".to_string())
                })?;
                on_stack[w] = false;
                members.push(w);
                if w == v {
                    break;
                }
            }
            let smallest = members.iter().copied().min().unwrap_or(v);
            for w in members {
                component[w] = smallest;
            }
        }
    }

    Ok(component)
}
