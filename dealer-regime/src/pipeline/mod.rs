//! Analysis pipeline.
//!
//! Wires every component together for a snapshot and runs batches of
//! independent snapshots in parallel.

pub mod analyzer;

pub use analyzer::{AnalysisReport, RegimeAnalyzer};
