//! Thesis assembly.
//!
//! Fuses every upstream result into a single `Thesis`: label, direction,
//! strength, confidence, wall-break probability and sizing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::{classify, ThesisConfig, ThesisFeatures, ThesisLabel};
use super::direction::{strength, vote_direction, Direction, DirectionCall, DirectionConfig, DirectionInputs, Strength};
use super::sizing::{PositionSizer, SizingConfig, SizingInputs, SizingResult};
use super::wall_break::{estimate_wall_break, Confidence, WallBreakConfig, WallBreakEstimate, WallBreakInputs};
use crate::exposure::ExposureProfile;
use crate::flow::{FlowPressureResult, FlowRegime};
use crate::regime::{AutocorrelationResult, EntropyResult, PhaseTransitionResult, SelfExcitationResult};
use crate::technicals::{iv_rv_ratio, TrendContext};

/// Everything the thesis is built from.
#[derive(Debug, Clone, Copy)]
pub struct ThesisInputs<'a> {
    pub profile: &'a ExposureProfile,
    pub flow: &'a FlowPressureResult,
    pub autocorrelation: &'a AutocorrelationResult,
    pub phase: &'a PhaseTransitionResult,
    pub self_excitation: &'a SelfExcitationResult,
    pub entropy: &'a EntropyResult,
    pub trend: &'a TrendContext,
    pub call_wall_collision: f64,
    pub put_wall_collision: f64,
    pub account_equity: Option<Decimal>,
}

/// Final classification for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thesis {
    pub label: ThesisLabel,
    pub direction: Direction,
    pub strength: Strength,
    pub confidence: Confidence,
    /// Percent, in [min, max] of the wall-break config.
    pub wall_break_probability: f64,
    /// Fraction of capital.
    pub sizing_fraction: f64,
    pub escalated: bool,
    pub effective_flow_regime: FlowRegime,
    pub features: ThesisFeatures,
    pub direction_detail: DirectionCall,
    pub wall_break: WallBreakEstimate,
    pub sizing: SizingResult,
}

/// Builds theses from upstream results.
pub struct ThesisEngine {
    thesis: ThesisConfig,
    direction: DirectionConfig,
    wall_break: WallBreakConfig,
    sizer: PositionSizer,
}

impl ThesisEngine {
    pub fn new(
        thesis: ThesisConfig,
        direction: DirectionConfig,
        wall_break: WallBreakConfig,
        sizing: SizingConfig,
    ) -> Self {
        Self {
            thesis,
            direction,
            wall_break,
            sizer: PositionSizer::new(sizing),
        }
    }

    pub fn evaluate(&self, inputs: &ThesisInputs<'_>) -> Thesis {
        let profile = inputs.profile;
        let features = ThesisFeatures::new(
            inputs.flow,
            inputs.autocorrelation,
            inputs.self_excitation,
            inputs.entropy,
            &self.thesis,
        );
        let label = classify(&features, &self.thesis);

        let direction_detail = vote_direction(
            &DirectionInputs {
                spot: profile.spot,
                flip_point: profile.flip_point,
                ma_alignment: inputs.trend.ma_alignment,
                relative_strength: inputs.trend.relative_strength,
                max_pain: profile.max_pain,
            },
            &self.direction,
        );
        let direction = direction_detail.direction;
        let strength = strength(label, direction, inputs.trend.trend_score);

        let wall_break = estimate_wall_break(
            &WallBreakInputs {
                flow_ratio: features.effective_ratio,
                gamma_regime: profile.gamma_regime,
                mean_lag1: features.mean_lag1,
                pct_amplified: features.pct_amplified,
                pct_dampened: features.pct_dampened,
                phase_regime: inputs.phase.regime,
                entropy_regime: features.entropy_regime,
                self_excitation_regime: features.self_excitation_regime,
                call_wall_collision: inputs.call_wall_collision,
                put_wall_collision: inputs.put_wall_collision,
            },
            &self.wall_break,
        );

        let atr_pct = if profile.spot > 0.0 {
            inputs.trend.atr / profile.spot * 100.0
        } else {
            0.0
        };
        let sizing = self.sizer.size(
            label,
            &SizingInputs {
                wall_break_probability: wall_break.probability,
                wall_distance_pct: profile.nearest_wall_distance_pct(),
                atr_pct,
                iv_rv_ratio: iv_rv_ratio(inputs.flow.atm_implied_vol, inputs.trend.realized_vol),
                account_equity: inputs.account_equity,
            },
        );

        debug!(
            ?label,
            ?direction,
            ?strength,
            wall_break = wall_break.probability,
            fraction = sizing.fraction,
            "Classified thesis"
        );

        Thesis {
            label,
            direction,
            strength,
            confidence: wall_break.confidence,
            wall_break_probability: wall_break.probability,
            sizing_fraction: sizing.fraction,
            escalated: features.escalated,
            effective_flow_regime: features.flow_regime,
            features,
            direction_detail,
            wall_break,
            sizing,
        }
    }
}

impl Default for ThesisEngine {
    fn default() -> Self {
        Self::new(
            ThesisConfig::default(),
            DirectionConfig::default(),
            WallBreakConfig::default(),
            SizingConfig::default(),
        )
    }
}
