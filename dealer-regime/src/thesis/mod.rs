//! Trade thesis module.
//!
//! Provides:
//! - Ordered rule list mapping regime features to a thesis label
//! - Weighted direction vote and conviction strength
//! - Wall-break probability with an adjustment audit trail
//! - Half-Kelly position sizing

pub mod classifier;
pub mod direction;
pub mod engine;
pub mod sizing;
pub mod wall_break;

pub use classifier::{classify, ThesisConfig, ThesisFeatures, ThesisLabel, ThesisRule, THESIS_RULES};
pub use direction::{
    strength, vote_direction, Direction, DirectionCall, DirectionConfig, DirectionInputs, DirectionVote, Strength,
};
pub use engine::{Thesis, ThesisEngine, ThesisInputs};
pub use sizing::{PositionSizer, SizingConfig, SizingInputs, SizingResult};
pub use wall_break::{
    estimate_wall_break, AdjustmentStep, Confidence, WallBreakConfig, WallBreakEstimate, WallBreakInputs,
    WALL_BREAK_ADJUSTMENTS,
};
