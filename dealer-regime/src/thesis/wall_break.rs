//! Wall-break probability.
//!
//! Starts from a base rate and folds a fixed sequence of named adjustments
//! over a running probability (in percent). Each step is recorded so the
//! final number can be audited.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exposure::GammaRegime;
use crate::regime::{EntropyRegime, PhaseRegime, SelfExcitationRegime};

/// Wall-break adjustment tables.
///
/// Tiers are `[threshold, adjustment]` pairs checked in order; the first
/// threshold crossed applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallBreakConfig {
    pub base_probability: f64,
    pub min_probability: f64,
    pub max_probability: f64,
    /// Applied when the flow ratio is above the threshold.
    pub flow_tiers: Vec<[f64; 2]>,
    pub positive_gamma_adjustment: f64,
    pub negative_gamma_adjustment: f64,
    /// Applied when mean lag-1 autocorrelation is above the threshold.
    pub trending_tiers: Vec<[f64; 2]>,
    /// Applied when mean lag-1 autocorrelation is below the threshold.
    pub fading_tiers: Vec<[f64; 2]>,
    pub phase_turbulent_adjustment: f64,
    pub phase_approaching_adjustment: f64,
    pub entropy_critical_adjustment: f64,
    pub entropy_approaching_adjustment: f64,
    pub self_excitation_high_adjustment: f64,
    pub self_excitation_moderate_adjustment: f64,
    /// Collision probabilities outside (min, max) leave the estimate alone.
    pub collision_min: f64,
    pub collision_max: f64,
    /// Flow ratio above which flow votes for a break.
    pub flow_break_above: f64,
    /// Mean lag-1 autocorrelation above which returns vote for a break even
    /// when amplified days do not outnumber dampened ones.
    pub acf_strong_break_above: f64,
}

impl Default for WallBreakConfig {
    fn default() -> Self {
        Self {
            base_probability: 15.0,
            min_probability: 5.0,
            max_probability: 95.0,
            flow_tiers: vec![[2.0, 45.0], [1.0, 30.0], [0.7, 15.0], [0.3, 5.0]],
            positive_gamma_adjustment: -12.0,
            negative_gamma_adjustment: 5.0,
            trending_tiers: vec![[0.10, 10.0], [0.05, 5.0]],
            fading_tiers: vec![[-0.15, -10.0], [-0.05, -5.0]],
            phase_turbulent_adjustment: 10.0,
            phase_approaching_adjustment: 5.0,
            entropy_critical_adjustment: 10.0,
            entropy_approaching_adjustment: 5.0,
            self_excitation_high_adjustment: 8.0,
            self_excitation_moderate_adjustment: 4.0,
            collision_min: 0.05,
            collision_max: 0.95,
            flow_break_above: 1.0,
            acf_strong_break_above: 0.10,
        }
    }
}

/// Signals feeding the wall-break estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallBreakInputs {
    pub flow_ratio: f64,
    pub gamma_regime: GammaRegime,
    pub mean_lag1: f64,
    /// Share of recent sessions with amplified autocorrelation (0-100).
    pub pct_amplified: f64,
    /// Share of recent sessions with dampened autocorrelation (0-100).
    pub pct_dampened: f64,
    pub phase_regime: PhaseRegime,
    pub entropy_regime: EntropyRegime,
    pub self_excitation_regime: SelfExcitationRegime,
    /// First-passage collision probability with the call wall.
    pub call_wall_collision: f64,
    /// First-passage collision probability with the put wall.
    pub put_wall_collision: f64,
}

/// How strongly flow, autocorrelation and self-excitation agree with each
/// other about whether the wall breaks or holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// One named adjustment and its effect on the running probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentStep {
    pub name: String,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallBreakEstimate {
    /// Final probability in percent, clamped.
    pub probability: f64,
    pub steps: Vec<AdjustmentStep>,
    /// Signals voting for a break.
    pub break_votes: usize,
    /// Signals voting for the wall to hold.
    pub hold_votes: usize,
    pub confidence: Confidence,
}

type Adjustment = fn(f64, &WallBreakInputs, &WallBreakConfig) -> f64;

/// Adjustments in application order.
pub const WALL_BREAK_ADJUSTMENTS: &[(&str, Adjustment)] = &[
    ("flow_pressure", flow_pressure),
    ("gamma_asymmetry", gamma_asymmetry),
    ("autocorrelation", autocorrelation),
    ("phase_transition", phase_transition),
    ("self_excitation", self_excitation),
    ("entropy", entropy),
    ("collision", collision),
];

fn first_above(value: f64, tiers: &[[f64; 2]]) -> f64 {
    tiers.iter().find(|[t, _]| value > *t).map(|[_, adj]| *adj).unwrap_or(0.0)
}

fn first_below(value: f64, tiers: &[[f64; 2]]) -> f64 {
    tiers.iter().find(|[t, _]| value < *t).map(|[_, adj]| *adj).unwrap_or(0.0)
}

fn flow_pressure(p: f64, inputs: &WallBreakInputs, config: &WallBreakConfig) -> f64 {
    p + first_above(inputs.flow_ratio, &config.flow_tiers)
}

fn gamma_asymmetry(p: f64, inputs: &WallBreakInputs, config: &WallBreakConfig) -> f64 {
    match inputs.gamma_regime {
        GammaRegime::Positive => p + config.positive_gamma_adjustment,
        GammaRegime::Negative => p + config.negative_gamma_adjustment,
    }
}

fn autocorrelation(p: f64, inputs: &WallBreakInputs, config: &WallBreakConfig) -> f64 {
    let up = first_above(inputs.mean_lag1, &config.trending_tiers);
    if up != 0.0 {
        return p + up;
    }
    p + first_below(inputs.mean_lag1, &config.fading_tiers)
}

fn phase_transition(p: f64, inputs: &WallBreakInputs, config: &WallBreakConfig) -> f64 {
    match inputs.phase_regime {
        PhaseRegime::Turbulent => p + config.phase_turbulent_adjustment,
        PhaseRegime::Approaching => p + config.phase_approaching_adjustment,
        _ => p,
    }
}

fn entropy(p: f64, inputs: &WallBreakInputs, config: &WallBreakConfig) -> f64 {
    match inputs.entropy_regime {
        EntropyRegime::Critical => p + config.entropy_critical_adjustment,
        EntropyRegime::Approaching => p + config.entropy_approaching_adjustment,
        _ => p,
    }
}

fn self_excitation(p: f64, inputs: &WallBreakInputs, config: &WallBreakConfig) -> f64 {
    match inputs.self_excitation_regime {
        SelfExcitationRegime::High => p + config.self_excitation_high_adjustment,
        SelfExcitationRegime::Moderate => p + config.self_excitation_moderate_adjustment,
        _ => p,
    }
}

fn collision(p: f64, inputs: &WallBreakInputs, config: &WallBreakConfig) -> f64 {
    let c = inputs.call_wall_collision.max(inputs.put_wall_collision);
    if !(c > config.collision_min && c < config.collision_max) {
        return p;
    }
    let odds = c / (1.0 - c);
    p * (1.0 + odds.ln_1p()) / 2.0
}

/// Flow carries the call; autocorrelation and self-excitation either back
/// it or contradict it.
///
/// Returns the confidence and the number of break votes.
fn confidence(inputs: &WallBreakInputs, config: &WallBreakConfig) -> (Confidence, usize) {
    let flow_break = inputs.flow_ratio > config.flow_break_above;
    let acf_break = (inputs.pct_amplified > inputs.pct_dampened && inputs.mean_lag1 > 0.0)
        || inputs.mean_lag1 > config.acf_strong_break_above;
    let sei_break = inputs.self_excitation_regime == SelfExcitationRegime::High;

    let break_votes = [flow_break, acf_break, sei_break].iter().filter(|&&b| b).count();
    let hold_votes = 3 - break_votes;

    let confidence = if (flow_break && break_votes >= 2) || (!flow_break && hold_votes >= 2) {
        Confidence::High
    } else if flow_break {
        Confidence::Medium
    } else {
        // Flow says hold while both return signals say break
        Confidence::Low
    };
    (confidence, break_votes)
}

/// Run every adjustment, record the trail and clamp the result.
pub fn estimate_wall_break(inputs: &WallBreakInputs, config: &WallBreakConfig) -> WallBreakEstimate {
    let mut running = config.base_probability;
    let mut steps = Vec::with_capacity(WALL_BREAK_ADJUSTMENTS.len());

    for (name, adjust) in WALL_BREAK_ADJUSTMENTS {
        let after = adjust(running, inputs, config);
        steps.push(AdjustmentStep {
            name: name.to_string(),
            before: running,
            after,
        });
        running = after;
    }

    let probability = running.clamp(config.min_probability, config.max_probability);

    let (confidence, break_votes) = confidence(inputs, config);
    let hold_votes = 3 - break_votes;

    debug!(raw = running, probability, break_votes, ?confidence, "Estimated wall-break probability");

    WallBreakEstimate {
        probability,
        steps,
        break_votes,
        hold_votes,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quiet() -> WallBreakInputs {
        WallBreakInputs {
            flow_ratio: 0.0,
            gamma_regime: GammaRegime::Negative,
            mean_lag1: 0.0,
            pct_amplified: 0.0,
            pct_dampened: 0.0,
            phase_regime: PhaseRegime::Laminar,
            entropy_regime: EntropyRegime::Dispersed,
            self_excitation_regime: SelfExcitationRegime::None,
            call_wall_collision: 0.5,
            put_wall_collision: 0.0,
        }
    }

    fn step<'a>(estimate: &'a WallBreakEstimate, name: &str) -> &'a AdjustmentStep {
        estimate.steps.iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_steps_recorded_in_order() {
        let estimate = estimate_wall_break(&quiet(), &WallBreakConfig::default());
        let names: Vec<&str> = estimate.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "flow_pressure",
                "gamma_asymmetry",
                "autocorrelation",
                "phase_transition",
                "self_excitation",
                "entropy",
                "collision"
            ]
        );
        assert_eq!(estimate.steps[0].before, 15.0);
        for pair in estimate.steps.windows(2) {
            assert_eq!(pair[0].after, pair[1].before);
        }
    }

    #[test]
    fn test_flow_tiers() {
        let config = WallBreakConfig::default();
        for (ratio, delta) in [(2.5, 45.0), (1.5, 30.0), (0.8, 15.0), (0.5, 5.0), (0.2, 0.0)] {
            let estimate = estimate_wall_break(&WallBreakInputs { flow_ratio: ratio, ..quiet() }, &config);
            let s = step(&estimate, "flow_pressure");
            assert_eq!(s.after - s.before, delta);
        }
    }

    #[test]
    fn test_gamma_asymmetry() {
        let config = WallBreakConfig::default();
        let positive = estimate_wall_break(
            &WallBreakInputs {
                gamma_regime: GammaRegime::Positive,
                ..quiet()
            },
            &config,
        );
        let s = step(&positive, "gamma_asymmetry");
        assert_eq!(s.after - s.before, -12.0);

        let negative = estimate_wall_break(&quiet(), &config);
        let s = step(&negative, "gamma_asymmetry");
        assert_eq!(s.after - s.before, 5.0);
    }

    #[test]
    fn test_autocorrelation_tiers() {
        let config = WallBreakConfig::default();
        for (acf, delta) in [(0.2, 10.0), (0.07, 5.0), (0.0, 0.0), (-0.07, -5.0), (-0.2, -10.0)] {
            let estimate = estimate_wall_break(&WallBreakInputs { mean_lag1: acf, ..quiet() }, &config);
            let s = step(&estimate, "autocorrelation");
            assert_eq!(s.after - s.before, delta);
        }
    }

    #[test]
    fn test_collision_multiplier() {
        // p = 0.5 -> odds 1 -> factor (1 + ln 2) / 2
        let estimate = estimate_wall_break(&quiet(), &WallBreakConfig::default());
        let s = step(&estimate, "collision");
        assert_relative_eq!(s.after, s.before * (1.0 + 2f64.ln()) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_collision_skipped_at_bounds() {
        let config = WallBreakConfig::default();
        for c in [0.95, 0.05, 0.0] {
            let estimate = estimate_wall_break(
                &WallBreakInputs {
                    call_wall_collision: c,
                    put_wall_collision: 0.0,
                    ..quiet()
                },
                &config,
            );
            let s = step(&estimate, "collision");
            assert_eq!(s.after, s.before);
        }
    }

    #[test]
    fn test_clamped_to_bounds() {
        let config = WallBreakConfig::default();
        let hot = WallBreakInputs {
            flow_ratio: 5.0,
            mean_lag1: 0.3,
            entropy_regime: EntropyRegime::Critical,
            self_excitation_regime: SelfExcitationRegime::High,
            call_wall_collision: 0.0,
            ..quiet()
        };
        let estimate = estimate_wall_break(&hot, &config);
        assert_eq!(estimate.steps.last().unwrap().after, 93.0);
        assert_eq!(estimate.probability, 93.0);

        let cold = WallBreakInputs {
            gamma_regime: GammaRegime::Positive,
            mean_lag1: -0.3,
            call_wall_collision: 0.0,
            ..quiet()
        };
        let estimate = estimate_wall_break(&cold, &config);
        assert_eq!(estimate.steps.last().unwrap().after, -7.0);
        assert_eq!(estimate.probability, 5.0);
    }

    #[test]
    fn test_phase_transition_tiers() {
        let config = WallBreakConfig::default();
        for (phase, delta) in [
            (PhaseRegime::Turbulent, 10.0),
            (PhaseRegime::Approaching, 5.0),
            (PhaseRegime::Laminar, 0.0),
            (PhaseRegime::Unknown, 0.0),
        ] {
            let estimate = estimate_wall_break(&WallBreakInputs { phase_regime: phase, ..quiet() }, &config);
            let s = step(&estimate, "phase_transition");
            assert_eq!(s.after - s.before, delta);
        }
    }

    #[test]
    fn test_all_signals_holding_is_high_confidence() {
        let config = WallBreakConfig::default();
        let estimate = estimate_wall_break(&quiet(), &config);
        assert_eq!(estimate.break_votes, 0);
        assert_eq!(estimate.hold_votes, 3);
        assert_eq!(estimate.confidence, Confidence::High);
    }

    #[test]
    fn test_pinned_market_is_high_confidence_hold() {
        // Weak flow, long gamma, fading returns: the wall holds with conviction
        let pinned = WallBreakInputs {
            flow_ratio: 0.1,
            gamma_regime: GammaRegime::Positive,
            mean_lag1: -0.2,
            pct_dampened: 100.0,
            call_wall_collision: 0.0,
            ..quiet()
        };
        let estimate = estimate_wall_break(&pinned, &WallBreakConfig::default());
        assert_eq!(estimate.probability, 5.0);
        assert_eq!(estimate.confidence, Confidence::High);
    }

    #[test]
    fn test_flow_alone_is_medium_confidence() {
        let one = WallBreakInputs { flow_ratio: 1.5, ..quiet() };
        let estimate = estimate_wall_break(&one, &WallBreakConfig::default());
        assert_eq!(estimate.break_votes, 1);
        assert_eq!(estimate.confidence, Confidence::Medium);
    }

    #[test]
    fn test_flow_backed_by_a_second_signal_is_high_confidence() {
        let config = WallBreakConfig::default();
        let with_sei = WallBreakInputs {
            flow_ratio: 1.5,
            self_excitation_regime: SelfExcitationRegime::High,
            ..quiet()
        };
        let estimate = estimate_wall_break(&with_sei, &config);
        assert_eq!(estimate.break_votes, 2);
        assert_eq!(estimate.confidence, Confidence::High);

        // Amplified days outnumbering dampened ones vote even below the strong cutoff
        let with_acf = WallBreakInputs {
            flow_ratio: 1.5,
            mean_lag1: 0.02,
            pct_amplified: 60.0,
            pct_dampened: 20.0,
            ..quiet()
        };
        assert_eq!(estimate_wall_break(&with_acf, &config).confidence, Confidence::High);
    }

    #[test]
    fn test_moderate_self_excitation_does_not_vote() {
        let moderate = WallBreakInputs {
            flow_ratio: 1.5,
            self_excitation_regime: SelfExcitationRegime::Moderate,
            ..quiet()
        };
        let estimate = estimate_wall_break(&moderate, &WallBreakConfig::default());
        assert_eq!(estimate.break_votes, 1);
        assert_eq!(estimate.confidence, Confidence::Medium);
    }

    #[test]
    fn test_returns_contradicting_flow_is_low_confidence() {
        let conflicted = WallBreakInputs {
            flow_ratio: 0.1,
            mean_lag1: 0.2,
            self_excitation_regime: SelfExcitationRegime::High,
            ..quiet()
        };
        let estimate = estimate_wall_break(&conflicted, &WallBreakConfig::default());
        assert_eq!(estimate.break_votes, 2);
        assert_eq!(estimate.hold_votes, 1);
        assert_eq!(estimate.confidence, Confidence::Low);
    }
}
