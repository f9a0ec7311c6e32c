//! Phase transition between laminar and turbulent return structure.
//!
//! Tracks how often recent sessions showed amplified (trending) intraday
//! autocorrelation. Once the share of amplified days crosses a critical
//! level, hedging flows have started to feed on themselves and walls are
//! more likely to give way.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::autocorrelation::DailyAutocorrelation;

/// Phase transition detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTransitionConfig {
    /// Most recent sessions examined.
    pub window: usize,
    /// A session counts as amplified when its lag-1 autocorrelation is above this.
    pub amplified_above: f64,
    /// Percentage of amplified sessions above which the regime is turbulent.
    pub threshold_pct: f64,
    /// Fraction of the threshold above which the regime is approaching.
    pub approaching_fraction: f64,
}

impl Default for PhaseTransitionConfig {
    fn default() -> Self {
        Self {
            window: 20,
            amplified_above: 0.05,
            threshold_pct: 12.9,
            approaching_fraction: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseRegime {
    Laminar,
    Approaching,
    Turbulent,
    /// No sessions to judge.
    Unknown,
}

impl PhaseRegime {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Laminar => "Amplified sessions are rare",
            Self::Approaching => "Amplified sessions nearing the critical share",
            Self::Turbulent => "Amplified sessions past the critical share",
            Self::Unknown => "Not enough sessions",
        }
    }
}

/// Output of the phase transition detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransitionResult {
    /// Share of examined sessions that were amplified (0-100).
    pub pct_amplified: f64,
    /// Threshold minus `pct_amplified`; negative once past the transition.
    pub distance_to_transition: f64,
    pub regime: PhaseRegime,
    pub amplified_days: usize,
    /// Sessions actually examined.
    pub window: usize,
}

impl PhaseTransitionResult {
    pub fn unknown(threshold_pct: f64) -> Self {
        Self {
            pct_amplified: 0.0,
            distance_to_transition: threshold_pct,
            regime: PhaseRegime::Unknown,
            amplified_days: 0,
            window: 0,
        }
    }
}

pub struct PhaseTransitionDetector {
    config: PhaseTransitionConfig,
}

impl PhaseTransitionDetector {
    pub fn new(config: PhaseTransitionConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, pct_amplified: f64) -> PhaseRegime {
        if pct_amplified > self.config.threshold_pct {
            PhaseRegime::Turbulent
        } else if pct_amplified > self.config.threshold_pct * self.config.approaching_fraction {
            PhaseRegime::Approaching
        } else {
            PhaseRegime::Laminar
        }
    }

    /// Classify the trailing `window` sessions of an oldest-first series.
    pub fn detect(&self, daily: &[DailyAutocorrelation]) -> PhaseTransitionResult {
        let start = daily.len().saturating_sub(self.config.window);
        let recent = &daily[start..];
        if recent.is_empty() {
            return PhaseTransitionResult::unknown(self.config.threshold_pct);
        }

        let amplified_days = recent.iter().filter(|d| d.lag1 > self.config.amplified_above).count();
        let pct_amplified = amplified_days as f64 / recent.len() as f64 * 100.0;
        let regime = self.classify(pct_amplified);

        debug!(pct_amplified, amplified_days, sessions = recent.len(), ?regime, "Detected phase transition state");

        PhaseTransitionResult {
            pct_amplified,
            distance_to_transition: self.config.threshold_pct - pct_amplified,
            regime,
            amplified_days,
            window: recent.len(),
        }
    }
}
