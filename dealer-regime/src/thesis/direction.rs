//! Directional bias and conviction strength.

use serde::{Deserialize, Serialize};

use super::classifier::ThesisLabel;
use crate::technicals::RelativeStrength;

/// Vote weights for the direction model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionConfig {
    /// Spot above/below the gamma flip.
    pub gamma_weight: f64,
    pub moving_average_weight: f64,
    pub relative_strength_weight: f64,
    /// Pull toward max pain.
    pub max_pain_weight: f64,
    /// Scores within this band of zero are neutral.
    pub neutral_band: f64,
}

impl Default for DirectionConfig {
    fn default() -> Self {
        Self {
            gamma_weight: 1.0,
            moving_average_weight: 1.0,
            relative_strength_weight: 0.75,
            max_pain_weight: 0.5,
            neutral_band: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub fn sign(&self) -> i32 {
        match self {
            Self::Bullish => 1,
            Self::Bearish => -1,
            Self::Neutral => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
}

impl Strength {
    fn upgrade(self) -> Self {
        match self {
            Self::Weak => Self::Moderate,
            _ => Self::Strong,
        }
    }

    fn downgrade(self) -> Self {
        match self {
            Self::Strong => Self::Moderate,
            _ => Self::Weak,
        }
    }
}

/// A single weighted vote in the direction score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionVote {
    pub name: String,
    /// -1, 0 or +1.
    pub vote: i32,
    pub weight: f64,
}

/// Inputs to the direction vote.
#[derive(Debug, Clone, Copy)]
pub struct DirectionInputs {
    pub spot: f64,
    pub flip_point: Option<f64>,
    pub ma_alignment: i32,
    pub relative_strength: RelativeStrength,
    pub max_pain: Option<f64>,
}

/// Weighted directional vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionCall {
    pub direction: Direction,
    pub score: f64,
    pub votes: Vec<DirectionVote>,
}

fn sign_of(x: f64) -> i32 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

pub fn vote_direction(inputs: &DirectionInputs, config: &DirectionConfig) -> DirectionCall {
    let gamma = inputs.flip_point.map(|flip| sign_of(inputs.spot - flip)).unwrap_or(0);
    // Price gravitates toward max pain, so spot below it leans bullish
    let pin = inputs.max_pain.map(|mp| sign_of(mp - inputs.spot)).unwrap_or(0);

    let votes = vec![
        DirectionVote {
            name: "gamma_bias".to_string(),
            vote: gamma,
            weight: config.gamma_weight,
        },
        DirectionVote {
            name: "moving_average".to_string(),
            vote: inputs.ma_alignment.signum(),
            weight: config.moving_average_weight,
        },
        DirectionVote {
            name: "relative_strength".to_string(),
            vote: inputs.relative_strength.vote(),
            weight: config.relative_strength_weight,
        },
        DirectionVote {
            name: "max_pain".to_string(),
            vote: pin,
            weight: config.max_pain_weight,
        },
    ];

    let score: f64 = votes.iter().map(|v| v.vote as f64 * v.weight).sum();
    let direction = if score > config.neutral_band {
        Direction::Bullish
    } else if score < -config.neutral_band {
        Direction::Bearish
    } else {
        Direction::Neutral
    };

    DirectionCall { direction, score, votes }
}

/// Conviction from the thesis label, adjusted by whether the trend score
/// agrees with the direction.
pub fn strength(label: ThesisLabel, direction: Direction, trend_score: i32) -> Strength {
    let base = match label {
        ThesisLabel::MomentumBreakout | ThesisLabel::FadeMoves => Strength::Strong,
        ThesisLabel::Neutral => Strength::Weak,
        _ => Strength::Moderate,
    };

    if label == ThesisLabel::Neutral || direction == Direction::Neutral || trend_score == 0 {
        return base;
    }

    if trend_score.signum() == direction.sign() {
        base.upgrade()
    } else {
        base.downgrade()
    }
}
