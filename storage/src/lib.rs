//! Graph store provider: in-memory multigraph, read scopes, edge-list and snapshot loading.

pub mod error;
pub mod index;
pub mod loader;
pub mod snapshot;
pub mod store;
pub mod view;

pub use error::StoreError;
pub use index::AdjacencyGraph;
pub use store::{GraphDatabase, GraphMutation, GraphStore, ReadScope};
pub use view::{FilteredView, GraphView};
