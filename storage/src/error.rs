use sna_core::error::{ErrorCode, SnaError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("graph store unavailable: {0}")]
    Unavailable(String),
    #[error("node not found: {0}")]
    NodeNotFound(u64),
    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Data integrity error (CRC mismatch)")]
    CrcMismatch,
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error("Serialization error")]
    Serialization,
}

impl SnaError for StoreError {
    fn error_code(&self) -> ErrorCode {
        match self {
            StoreError::Unavailable(_) => ErrorCode::Unavailable,
            StoreError::NodeNotFound(_) => ErrorCode::NotFound,
            StoreError::InvalidRelationship(_) => ErrorCode::InvalidArgument,
            StoreError::Parse { .. } => ErrorCode::InvalidArgument,
            StoreError::Io(_) => ErrorCode::Internal,
            StoreError::CrcMismatch => ErrorCode::Internal,
            StoreError::CorruptSnapshot(_) => ErrorCode::Internal,
            StoreError::Serialization => ErrorCode::Internal,
        }
    }
}
