use rkyv::{Archive, Deserialize, Serialize};

pub const DEFAULT_WEIGHT: f64 = 1.0;
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "LINK";

#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy)]
#[archive(check_bytes)] // Enables bytecheck validation for zero-copy safety
pub struct Node {
    pub id: u64,
}

/// Directed, weighted relationship. Parallel relationships between the same pair are
/// distinct records.
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
#[archive(check_bytes)]
pub struct Relationship {
    pub source: u64,
    pub target: u64,
    pub rel_type: String,
    pub weight: f64,
}

impl Node {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

impl Relationship {
    pub fn new(source: u64, target: u64, rel_type: impl Into<String>, weight: f64) -> Self {
        Self {
            source,
            target,
            rel_type: rel_type.into(),
            weight,
        }
    }

    pub fn unweighted(source: u64, target: u64) -> Self {
        Self::new(source, target, DEFAULT_RELATIONSHIP_TYPE, DEFAULT_WEIGHT)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
