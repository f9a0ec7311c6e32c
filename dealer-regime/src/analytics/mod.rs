//! Level arrival analytics.
//!
//! Provides:
//! - First-passage expected times and horizon probabilities for key levels
//! - Collision probability against the walls

pub mod first_passage;

pub use first_passage::{
    FirstPassageConfig, FirstPassageEstimator, LevelArrival, LevelSide, NamedLevel, Urgency,
};
