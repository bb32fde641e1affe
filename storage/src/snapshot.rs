//! Graph snapshot file.
//!
//! Layout: `MAGIC (8) | crc32 (u32 LE) | payload length (u64 LE) | rkyv payload`.
//! The checksum covers the payload only.

use crate::error::StoreError;
use crate::index::AdjacencyGraph;
use crc32fast::Hasher;
use rkyv::ser::{serializers::AllocSerializer, Serializer};
use rkyv::{AlignedVec, Archive, Deserialize, Serialize};
use sna_core::model::{Node, Relationship};
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 8] = b"SNAGRPH1";
const HEADER_LEN: usize = 8 + 4 + 8;

#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

impl GraphSnapshot {
    pub fn capture(graph: &AdjacencyGraph) -> Self {
        Self {
            nodes: graph.nodes().iter().copied().map(Node::new).collect(),
            relationships: graph.relationship_list().to_vec(),
        }
    }

    pub fn into_graph(self) -> AdjacencyGraph {
        let mut graph = AdjacencyGraph::new();
        for node in self.nodes {
            graph.add_node(node.id);
        }
        for relationship in self.relationships {
            graph.add_relationship(relationship);
        }
        graph
    }
}

pub fn encode_snapshot(graph: &AdjacencyGraph) -> Result<Vec<u8>, StoreError> {
    let snapshot = GraphSnapshot::capture(graph);
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(&snapshot)
        .map_err(|_| StoreError::Serialization)?;
    let payload = serializer.into_serializer().into_inner();

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<AdjacencyGraph, StoreError> {
    if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
        return Err(StoreError::CorruptSnapshot("missing snapshot header".to_string()));
    }

    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[8..12]);
    let expected_crc = u32::from_le_bytes(crc_bytes);

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[12..20]);
    let len = u64::from_le_bytes(len_bytes) as usize;

    let payload = &bytes[HEADER_LEN..];
    if payload.len() != len {
        return Err(StoreError::CorruptSnapshot(format!(
            "payload length {} does not match header length {}",
            payload.len(),
            len
        )));
    }

    let mut hasher = Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != expected_crc {
        return Err(StoreError::CrcMismatch);
    }

    // rkyv needs the archive at an aligned address.
    let mut aligned = AlignedVec::with_capacity(payload.len());
    aligned.extend_from_slice(payload);

    let archived = rkyv::check_archived_root::<GraphSnapshot>(aligned.as_slice())
        .map_err(|err| StoreError::CorruptSnapshot(err.to_string()))?;
    let snapshot: GraphSnapshot = archived
        .deserialize(&mut rkyv::Infallible)
        .map_err(|_| StoreError::Serialization)?;

    Ok(snapshot.into_graph())
}

/// Atomically writes to a temp file then renames.
pub fn write_snapshot(path: impl AsRef<Path>, graph: &AdjacencyGraph) -> Result<(), StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let bytes = encode_snapshot(graph)?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_snapshot(path: impl AsRef<Path>) -> Result<AdjacencyGraph, StoreError> {
    let bytes = fs::read(path)?;
    decode_snapshot(&bytes)
}
