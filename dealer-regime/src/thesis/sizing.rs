//! Position sizing module.
//!
//! Half-Kelly fraction of capital from the thesis edge and win probability:
//! - Payoff ratio floored and win probability capped before Kelly
//! - Scaled down when options are rich versus realized volatility
//! - Clamped to a minimum and maximum fraction of capital

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::classifier::ThesisLabel;

/// Position sizing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Smallest non-zero fraction of capital.
    pub min_fraction: f64,
    /// Largest fraction of capital.
    pub max_fraction: f64,
    /// Multiplier on full Kelly (0.5 = half Kelly).
    pub kelly_multiplier: f64,
    pub min_payoff_ratio: f64,
    pub max_win_probability: f64,
    /// IV/RV above this is rich.
    pub rich_iv_ratio: f64,
    pub rich_scale: f64,
    /// IV/RV above this is elevated.
    pub elevated_iv_ratio: f64,
    pub elevated_scale: f64,
    /// IV/RV below this is cheap.
    pub cheap_iv_ratio: f64,
    pub cheap_scale: f64,
    /// Win probability (%) assumed for trend and fade theses.
    pub trend_win_pct: f64,
    pub fade_moves_win_pct: f64,
    pub fade_mild_win_pct: f64,
    /// Cap on the win probability (%) of an unconfirmed breakout.
    pub early_win_cap_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            min_fraction: 0.0025,
            max_fraction: 0.05,
            kelly_multiplier: 0.5,
            min_payoff_ratio: 0.5,
            max_win_probability: 0.9,
            rich_iv_ratio: 1.5,
            rich_scale: 0.7,
            elevated_iv_ratio: 1.3,
            elevated_scale: 0.8,
            cheap_iv_ratio: 0.9,
            cheap_scale: 1.2,
            trend_win_pct: 55.0,
            fade_moves_win_pct: 65.0,
            fade_mild_win_pct: 55.0,
            early_win_cap_pct: 50.0,
        }
    }
}

/// Result of position sizing calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    /// Recommended fraction of capital.
    pub fraction: f64,
    pub full_kelly: f64,
    pub half_kelly: f64,
    pub vol_scale: f64,
    pub edge_pct: f64,
    pub win_probability_pct: f64,
    /// Capital at risk when account equity is known.
    pub risk_capital: Option<Decimal>,
    /// Whether the fraction was clipped to a bound.
    pub is_constrained: bool,
    pub constraint_reason: Option<String>,
}

impl SizingResult {
    pub fn none(reason: &str) -> Self {
        Self {
            fraction: 0.0,
            full_kelly: 0.0,
            half_kelly: 0.0,
            vol_scale: 1.0,
            edge_pct: 0.0,
            win_probability_pct: 0.0,
            risk_capital: None,
            is_constrained: true,
            constraint_reason: Some(reason.to_string()),
        }
    }
}

/// Market facts the sizer needs from the rest of the analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInputs {
    pub wall_break_probability: f64,
    /// Distance to the nearest wall in percent of spot.
    pub wall_distance_pct: Option<f64>,
    /// ATR in percent of spot.
    pub atr_pct: f64,
    pub iv_rv_ratio: f64,
    pub account_equity: Option<Decimal>,
}

/// Kelly position sizer.
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn vol_scale(&self, iv_rv_ratio: f64) -> f64 {
        if iv_rv_ratio > self.config.rich_iv_ratio {
            self.config.rich_scale
        } else if iv_rv_ratio > self.config.elevated_iv_ratio {
            self.config.elevated_scale
        } else if iv_rv_ratio < self.config.cheap_iv_ratio {
            self.config.cheap_scale
        } else {
            1.0
        }
    }

    /// Edge and win probability (both percent) implied by a thesis.
    pub fn edge_and_win(&self, label: ThesisLabel, inputs: &SizingInputs) -> (f64, f64) {
        let wall = inputs.wall_distance_pct.unwrap_or(0.0);
        let p = inputs.wall_break_probability;
        match label {
            ThesisLabel::MomentumBreakout => (2.0 * wall, p),
            ThesisLabel::MomentumEarly => (1.5 * wall, p.min(self.config.early_win_cap_pct)),
            ThesisLabel::ConflictedPin => (wall, 100.0 - p),
            ThesisLabel::MomentumTrend => (2.0 * inputs.atr_pct, self.config.trend_win_pct),
            ThesisLabel::FadeMoves => (inputs.atr_pct, self.config.fade_moves_win_pct),
            ThesisLabel::FadeMild => (inputs.atr_pct, self.config.fade_mild_win_pct),
            ThesisLabel::Neutral => (0.0, 0.0),
        }
    }

    /// Scaled Kelly fraction for an edge/win pair.
    ///
    /// # Arguments
    /// * `edge_pct` - Expected move captured, in percent
    /// * `win_pct` - Probability of the thesis playing out, in percent
    /// * `iv_rv_ratio` - Implied over realized volatility
    pub fn kelly(&self, edge_pct: f64, win_pct: f64, iv_rv_ratio: f64) -> SizingResult {
        if !(edge_pct > 0.0 && win_pct > 0.0) {
            return SizingResult::none("No edge");
        }

        let b = (edge_pct / 100.0).max(self.config.min_payoff_ratio);
        let p = (win_pct / 100.0).min(self.config.max_win_probability);
        let q = 1.0 - p;
        let full_kelly = (b * p - q) / b;
        let half_kelly = full_kelly * self.config.kelly_multiplier;
        let vol_scale = self.vol_scale(iv_rv_ratio);
        let scaled = half_kelly * vol_scale;

        let base = SizingResult {
            fraction: 0.0,
            full_kelly,
            half_kelly,
            vol_scale,
            edge_pct,
            win_probability_pct: win_pct,
            risk_capital: None,
            is_constrained: false,
            constraint_reason: None,
        };

        if scaled <= 0.0 {
            return SizingResult {
                is_constrained: true,
                constraint_reason: Some("Negative Kelly".to_string()),
                ..base
            };
        }

        let fraction = scaled.clamp(self.config.min_fraction, self.config.max_fraction);
        let (is_constrained, constraint_reason) = if scaled > self.config.max_fraction {
            (true, Some(format!("Max fraction ({:.2}% of capital)", self.config.max_fraction * 100.0)))
        } else if scaled < self.config.min_fraction {
            (true, Some(format!("Min fraction ({:.2}% of capital)", self.config.min_fraction * 100.0)))
        } else {
            (false, None)
        };

        SizingResult {
            fraction,
            is_constrained,
            constraint_reason,
            ..base
        }
    }

    /// Size a thesis, converting to capital when equity is known.
    pub fn size(&self, label: ThesisLabel, inputs: &SizingInputs) -> SizingResult {
        let (edge_pct, win_pct) = self.edge_and_win(label, inputs);
        let mut result = self.kelly(edge_pct, win_pct, inputs.iv_rv_ratio);

        if let Some(equity) = inputs.account_equity {
            result.risk_capital = Decimal::try_from(result.fraction)
                .ok()
                .map(|f| (equity * f).round_dp(2));
        }

        result
    }
}
