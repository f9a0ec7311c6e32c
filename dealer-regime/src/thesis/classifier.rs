//! Thesis label classification.
//!
//! The label is the first rule in `THESIS_RULES` whose predicate matches a
//! precomputed feature record. Rule order is the priority order.

use serde::{Deserialize, Serialize};

use crate::flow::{FlowPressureResult, FlowRegime};
use crate::regime::{
    AutocorrelationRegime, AutocorrelationResult, EntropyRegime, EntropyResult, SelfExcitationRegime,
    SelfExcitationResult,
};

/// Thresholds for the thesis rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThesisConfig {
    /// Mean lag-1 autocorrelation above this confirms momentum.
    pub momentum_acf_above: f64,
    /// Mean lag-1 autocorrelation below this fades moves outright.
    pub fade_moves_below: f64,
    /// Mean lag-1 autocorrelation below this fades mildly.
    pub fade_mild_below: f64,
    /// Share of amplified days (%) that counts as persistent amplification.
    pub amplified_pct_above: f64,
    /// Effective ratio floor applied when entropy escalates the flow regime.
    pub escalation_ratio: f64,
}

impl Default for ThesisConfig {
    fn default() -> Self {
        Self {
            momentum_acf_above: 0.05,
            fade_moves_below: -0.10,
            fade_mild_below: -0.05,
            amplified_pct_above: 13.0,
            escalation_ratio: 1.05,
        }
    }
}

/// Trade thesis label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThesisLabel {
    /// Turbulent flow with momentum confirmed by return structure.
    MomentumBreakout,
    /// Turbulent flow not yet confirmed.
    MomentumEarly,
    /// Trending days while dealers still absorb flow.
    ConflictedPin,
    /// Trending returns without flow pressure.
    MomentumTrend,
    /// Strong mean reversion.
    FadeMoves,
    /// Mild mean reversion.
    FadeMild,
    Neutral,
}

impl ThesisLabel {
    pub fn description(&self) -> &'static str {
        match self {
            Self::MomentumBreakout => "Flow overwhelms dealers and moves are extending",
            Self::MomentumEarly => "Flow overwhelms dealers, momentum not yet confirmed",
            Self::ConflictedPin => "Moves extend but dealers still pin price",
            Self::MomentumTrend => "Moves extend without dealer strain",
            Self::FadeMoves => "Dealers fade moves strongly",
            Self::FadeMild => "Dealers fade moves mildly",
            Self::Neutral => "No actionable regime",
        }
    }
}

/// Signals the rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisFeatures {
    /// Beta-adjusted ratio after escalation.
    pub effective_ratio: f64,
    /// Flow regime after escalation.
    pub flow_regime: FlowRegime,
    pub escalated: bool,
    pub mean_lag1: f64,
    pub pct_amplified: f64,
    pub pct_dampened: f64,
    pub autocorrelation_regime: AutocorrelationRegime,
    pub self_excitation_regime: SelfExcitationRegime,
    pub entropy_regime: EntropyRegime,
}

impl ThesisFeatures {
    /// Collect features, escalating the flow regime when exposure is
    /// critically concentrated and dealers are already strained.
    pub fn new(
        flow: &FlowPressureResult,
        autocorrelation: &AutocorrelationResult,
        self_excitation: &SelfExcitationResult,
        entropy: &EntropyResult,
        config: &ThesisConfig,
    ) -> Self {
        let escalated = entropy.regime == EntropyRegime::Critical && flow.regime >= FlowRegime::Transitional;
        let (flow_regime, effective_ratio) = if escalated {
            (FlowRegime::Turbulent, flow.adjusted_ratio.max(config.escalation_ratio))
        } else {
            (flow.regime, flow.adjusted_ratio)
        };

        Self {
            effective_ratio,
            flow_regime,
            escalated,
            mean_lag1: autocorrelation.mean_lag1,
            pct_amplified: autocorrelation.pct_amplified,
            pct_dampened: autocorrelation.pct_dampened,
            autocorrelation_regime: autocorrelation.regime,
            self_excitation_regime: self_excitation.regime,
            entropy_regime: entropy.regime,
        }
    }

    fn persistently_amplified(&self, config: &ThesisConfig) -> bool {
        self.pct_amplified > self.pct_dampened && self.pct_amplified > config.amplified_pct_above
    }

    /// Return structure agrees with a momentum move.
    pub fn momentum_confirmed(&self, config: &ThesisConfig) -> bool {
        self.mean_lag1 > config.momentum_acf_above
            || self.persistently_amplified(config)
            || (self.self_excitation_regime >= SelfExcitationRegime::Moderate && self.mean_lag1 > 0.0)
    }
}

/// One (predicate, outcome) pair of the decision list.
pub struct ThesisRule {
    pub label: ThesisLabel,
    pub applies: fn(&ThesisFeatures, &ThesisConfig) -> bool,
}

/// Decision list, highest priority first. The last rule always matches.
pub const THESIS_RULES: &[ThesisRule] = &[
    ThesisRule {
        label: ThesisLabel::MomentumBreakout,
        applies: |f, c| f.flow_regime == FlowRegime::Turbulent && f.momentum_confirmed(c),
    },
    ThesisRule {
        label: ThesisLabel::MomentumEarly,
        applies: |f, _| f.flow_regime == FlowRegime::Turbulent,
    },
    ThesisRule {
        label: ThesisLabel::ConflictedPin,
        applies: |f, c| f.flow_regime == FlowRegime::Laminar && f.persistently_amplified(c),
    },
    ThesisRule {
        label: ThesisLabel::MomentumTrend,
        applies: |f, c| f.mean_lag1 > c.momentum_acf_above,
    },
    ThesisRule {
        label: ThesisLabel::FadeMoves,
        applies: |f, c| f.mean_lag1 < c.fade_moves_below,
    },
    ThesisRule {
        label: ThesisLabel::FadeMild,
        applies: |f, c| f.mean_lag1 < c.fade_mild_below,
    },
    ThesisRule {
        label: ThesisLabel::Neutral,
        applies: |_, _| true,
    },
];

/// First-match-wins evaluation of `THESIS_RULES`.
pub fn classify(features: &ThesisFeatures, config: &ThesisConfig) -> ThesisLabel {
    THESIS_RULES
        .iter()
        .find(|rule| (rule.applies)(features, config))
        .map(|rule| rule.label)
        .unwrap_or(ThesisLabel::Neutral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::RegimeStability;

    fn features(regime: FlowRegime, mean_lag1: f64) -> ThesisFeatures {
        ThesisFeatures {
            effective_ratio: match regime {
                FlowRegime::Laminar => 0.3,
                FlowRegime::Transitional => 0.8,
                FlowRegime::Turbulent => 1.5,
            },
            flow_regime: regime,
            escalated: false,
            mean_lag1,
            pct_amplified: 0.0,
            pct_dampened: 0.0,
            autocorrelation_regime: AutocorrelationRegime::Neutral,
            self_excitation_regime: SelfExcitationRegime::None,
            entropy_regime: EntropyRegime::Dispersed,
        }
    }

    fn flow(adjusted_ratio: f64, regime: FlowRegime) -> FlowPressureResult {
        FlowPressureResult {
            speculative_exposure: 0.0,
            dealer_exposure: 0.0,
            ratio: adjusted_ratio,
            beta: 1.0,
            beta_adjustment: 1.0,
            adjusted_ratio,
            regime,
            call_put_volume_ratio: 1.0,
            atm_implied_vol: None,
        }
    }

    fn autocorrelation(mean_lag1: f64) -> AutocorrelationResult {
        AutocorrelationResult {
            mean_lag1,
            regime: AutocorrelationRegime::Neutral,
            stability: RegimeStability::Stable,
            ..AutocorrelationResult::neutral()
        }
    }

    fn entropy(regime: EntropyRegime) -> EntropyResult {
        EntropyResult {
            regime,
            ..EntropyResult::dispersed()
        }
    }

    #[test]
    fn test_rule_order() {
        let config = ThesisConfig::default();
        assert_eq!(classify(&features(FlowRegime::Turbulent, 0.10), &config), ThesisLabel::MomentumBreakout);
        assert_eq!(classify(&features(FlowRegime::Turbulent, 0.0), &config), ThesisLabel::MomentumEarly);
        assert_eq!(classify(&features(FlowRegime::Transitional, 0.10), &config), ThesisLabel::MomentumTrend);
        assert_eq!(classify(&features(FlowRegime::Laminar, -0.20), &config), ThesisLabel::FadeMoves);
        assert_eq!(classify(&features(FlowRegime::Laminar, -0.07), &config), ThesisLabel::FadeMild);
        assert_eq!(classify(&features(FlowRegime::Laminar, 0.0), &config), ThesisLabel::Neutral);
    }

    #[test]
    fn test_turbulence_beats_fade() {
        // Strong mean reversion does not override turbulent flow
        let config = ThesisConfig::default();
        assert_eq!(classify(&features(FlowRegime::Turbulent, -0.30), &config), ThesisLabel::MomentumEarly);
    }

    #[test]
    fn test_conflicted_pin() {
        let config = ThesisConfig::default();
        let mut f = features(FlowRegime::Laminar, 0.02);
        f.pct_amplified = 40.0;
        f.pct_dampened = 20.0;
        assert_eq!(classify(&f, &config), ThesisLabel::ConflictedPin);

        // Same days under transitional flow are not a pin
        f.flow_regime = FlowRegime::Transitional;
        assert_eq!(classify(&f, &config), ThesisLabel::Neutral);
    }

    #[test]
    fn test_self_excitation_confirms_momentum() {
        let config = ThesisConfig::default();
        let mut f = features(FlowRegime::Turbulent, 0.01);
        assert_eq!(classify(&f, &config), ThesisLabel::MomentumEarly);
        f.self_excitation_regime = SelfExcitationRegime::Moderate;
        assert_eq!(classify(&f, &config), ThesisLabel::MomentumBreakout);
    }

    #[test]
    fn test_critical_entropy_escalates_transitional_flow() {
        let config = ThesisConfig::default();
        let f = ThesisFeatures::new(
            &flow(0.8, FlowRegime::Transitional),
            &autocorrelation(0.0),
            &SelfExcitationResult::none(),
            &entropy(EntropyRegime::Critical),
            &config,
        );
        assert!(f.escalated);
        assert_eq!(f.flow_regime, FlowRegime::Turbulent);
        assert_eq!(f.effective_ratio, 1.05);
        assert_eq!(classify(&f, &config), ThesisLabel::MomentumEarly);
    }

    #[test]
    fn test_no_escalation_when_laminar_or_dispersed() {
        let config = ThesisConfig::default();
        let laminar = ThesisFeatures::new(
            &flow(0.5, FlowRegime::Laminar),
            &autocorrelation(0.0),
            &SelfExcitationResult::none(),
            &entropy(EntropyRegime::Critical),
            &config,
        );
        assert!(!laminar.escalated);
        assert_eq!(laminar.flow_regime, FlowRegime::Laminar);

        let dispersed = ThesisFeatures::new(
            &flow(0.8, FlowRegime::Transitional),
            &autocorrelation(0.0),
            &SelfExcitationResult::none(),
            &entropy(EntropyRegime::Dispersed),
            &config,
        );
        assert!(!dispersed.escalated);
        assert_eq!(dispersed.effective_ratio, 0.8);
    }

    #[test]
    fn test_escalation_keeps_higher_ratio() {
        let config = ThesisConfig::default();
        let f = ThesisFeatures::new(
            &flow(3.0, FlowRegime::Turbulent),
            &autocorrelation(0.0),
            &SelfExcitationResult::none(),
            &entropy(EntropyRegime::Critical),
            &config,
        );
        assert_eq!(f.effective_ratio, 3.0);
    }

    #[test]
    fn test_last_rule_is_catch_all() {
        let last = THESIS_RULES.last().unwrap();
        assert_eq!(last.label, ThesisLabel::Neutral);
        assert!((last.applies)(&features(FlowRegime::Laminar, 0.0), &ThesisConfig::default()));
    }
}
