//! Graph algorithm engine and algorithm suite.
//!
//! Every algorithm implements [`Algorithm`] and runs through [`GraphAlgoEngine::execute`],
//! which brackets the run with a read scope on the graph store. Results are keyed by the
//! original node ids and outlive the scope.

pub mod algorithm;
pub mod components;
pub mod engine;
pub mod error;
pub mod label_propagation;
pub mod louvain;
pub mod modularity;
pub mod pagerank;
pub mod projection;
pub mod result;
pub mod scc;
pub mod triangle_count;

pub use algorithm::{
    Algorithm, AlgorithmKind, AttachedState, ProgressEvent, ProgressListener, RunContext,
};
pub use components::ConnectedComponents;
pub use engine::GraphAlgoEngine;
pub use error::{AlgoError, EngineError};
pub use label_propagation::LabelPropagation;
pub use louvain::{Louvain, LouvainLayer, LouvainResult};
pub use modularity::{DirectedModularity, UndirectedModularity};
pub use pagerank::PageRank;
pub use result::ResultMap;
pub use scc::StronglyConnectedComponents;
pub use triangle_count::TriangleCount;
