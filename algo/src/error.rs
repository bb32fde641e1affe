use crate::algorithm::AlgorithmKind;
use sna_core::error::{ErrorCode, SnaError};
use storage::StoreError;
use thiserror::Error;

/// Raised by an algorithm during its run.
#[derive(Debug, Error)]
pub enum AlgoError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("relationship {from} -> {to} references a node outside the graph")]
    DanglingRelationship { from: u64, to: u64 },
    #[error("relationship {from} -> {to} has invalid weight {weight}")]
    InvalidWeight { from: u64, to: u64, weight: f64 },
    #[error("node {0} has no community in the supplied partition")]
    MissingCommunity(u64),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph unavailable: {0}")]
    GraphUnavailable(#[source] StoreError),
    #[error("{algorithm} failed: {cause}")]
    AlgorithmFailure {
        algorithm: AlgorithmKind,
        #[source]
        cause: AlgoError,
    },
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl SnaError for AlgoError {
    fn error_code(&self) -> ErrorCode {
        match self {
            AlgoError::InvalidConfig(_) => ErrorCode::InvalidArgument,
            AlgoError::DanglingRelationship { .. } => ErrorCode::Internal,
            AlgoError::InvalidWeight { .. } => ErrorCode::InvalidArgument,
            AlgoError::MissingCommunity(_) => ErrorCode::InvalidArgument,
            AlgoError::InvariantViolation(_) => ErrorCode::Internal,
        }
    }
}

impl SnaError for EngineError {
    fn error_code(&self) -> ErrorCode {
        match self {
            EngineError::GraphUnavailable(_) => ErrorCode::Unavailable,
            EngineError::AlgorithmFailure { cause, .. } => cause.error_code(),
            EngineError::InvalidState(_) => ErrorCode::FailedPrecondition,
        }
    }
}
