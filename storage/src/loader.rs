//! Text edge-list loader.
//!
//! One record per line: `source target [weight] [type]`, separated by whitespace or commas.
//! A line with a single id declares an isolated node. Blank lines and lines starting with
//! `#` or `%` are skipped.

use crate::error::StoreError;
use crate::index::AdjacencyGraph;
use sna_core::model::{DEFAULT_RELATIONSHIP_TYPE, DEFAULT_WEIGHT};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub fn load_edge_list(path: impl AsRef<Path>) -> Result<AdjacencyGraph, StoreError> {
    let file = File::open(path)?;
    parse_edge_list(BufReader::new(file))
}

pub fn parse_edge_list<R: BufRead>(reader: R) -> Result<AdjacencyGraph, StoreError> {
    let mut graph = AdjacencyGraph::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
            continue;
        }

        let fields: Vec<&str> = trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|field| !field.is_empty())
            .collect();

        match fields.as_slice() {
            [node] => {
                graph.add_node(parse_id(node, line_no)?);
            }
            [source, target, rest @ ..] => {
                if rest.len() > 2 {
                    return Err(parse_error(line_no, "expected at most 4 fields"));
                }
                let source = parse_id(source, line_no)?;
                let target = parse_id(target, line_no)?;
                let weight = match rest.first() {
                    Some(raw) => parse_weight(raw, line_no)?,
                    None => DEFAULT_WEIGHT,
                };
                let rel_type = rest.get(1).copied().unwrap_or(DEFAULT_RELATIONSHIP_TYPE);
                graph.add_edge(source, target, rel_type, weight);
            }
            [] => {}
        }
    }

    Ok(graph)
}

fn parse_id(raw: &str, line: usize) -> Result<u64, StoreError> {
    raw.parse::<u64>()
        .map_err(|err| parse_error(line, format!("invalid node id {:?}: {}", raw, err)))
}

fn parse_weight(raw: &str, line: usize) -> Result<f64, StoreError> {
    let weight = raw
        .parse::<f64>()
        .map_err(|err| parse_error(line, format!("invalid weight {:?}: {}", raw, err)))?;
    if !weight.is_finite() || weight < 0.0 {
        return Err(parse_error(
            line,
            format!("weight must be finite and non-negative, got {}", weight),
        ));
    }
    Ok(weight)
}

fn parse_error(line: usize, message: impl Into<String>) -> StoreError {
    StoreError::Parse {
        line,
        message: message.into(),
    }
}
