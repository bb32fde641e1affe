//! Batch driver: load a graph, run the full algorithm suite, report the outcome.

pub mod analyze;

pub use analyze::{analyze, AnalysisReport, GraphSource};
