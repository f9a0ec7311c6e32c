//! Flow-pressure module.
//!
//! Ratio of near-the-money speculative flow to the standing dealer book,
//! beta-adjusted and banded into laminar / transitional / turbulent.

pub mod pressure;

pub use pressure::{FlowPressureConfig, FlowPressureEstimator, FlowPressureResult, FlowRegime};
