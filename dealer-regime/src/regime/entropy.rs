//! Positional entropy of the exposure profile.
//!
//! Low entropy near the money means exposure is piled onto a few strikes.
//! That concentration is fragile: once price leaves those strikes there is
//! little hedging left to slow it down.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exposure::ExposureProfile;

/// Entropy estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    /// Strikes within this distance of spot (%) are included.
    pub atm_window_pct: f64,
    /// Fewer qualifying strikes yields the dispersed default.
    pub min_strikes: usize,
    /// Dominant strikes reported.
    pub top_k: usize,
    pub critical_below: f64,
    pub approaching_below: f64,
    pub moderate_below: f64,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            atm_window_pct: 10.0,
            min_strikes: 3,
            top_k: 3,
            critical_below: 0.3,
            approaching_below: 0.5,
            moderate_below: 0.7,
        }
    }
}

/// Concentration regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntropyRegime {
    Critical,
    Approaching,
    Moderate,
    Dispersed,
}

impl EntropyRegime {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Critical => "Exposure concentrated on very few strikes",
            Self::Approaching => "Exposure concentrating",
            Self::Moderate => "Moderately spread exposure",
            Self::Dispersed => "Exposure spread across strikes",
        }
    }
}

/// Share of near-the-money exposure held by one strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeShare {
    pub strike: f64,
    pub share: f64,
}

/// Output of the entropy estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyResult {
    pub entropy_nats: f64,
    pub entropy_normalized: f64,
    pub regime: EntropyRegime,
    pub qualifying_strikes: usize,
    /// Top strikes by share, largest first.
    pub dominant_strikes: Vec<StrikeShare>,
}

impl EntropyResult {
    /// Default for sparse profiles.
    pub fn dispersed() -> Self {
        Self {
            entropy_nats: 1.0,
            entropy_normalized: 1.0,
            regime: EntropyRegime::Dispersed,
            qualifying_strikes: 0,
            dominant_strikes: Vec::new(),
        }
    }
}

/// Shannon entropy of near-the-money exposure.
pub struct EntropyEstimator {
    config: EntropyConfig,
}

impl EntropyEstimator {
    pub fn new(config: EntropyConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, normalized: f64) -> EntropyRegime {
        if normalized < self.config.critical_below {
            EntropyRegime::Critical
        } else if normalized < self.config.approaching_below {
            EntropyRegime::Approaching
        } else if normalized < self.config.moderate_below {
            EntropyRegime::Moderate
        } else {
            EntropyRegime::Dispersed
        }
    }

    pub fn estimate(&self, profile: &ExposureProfile) -> EntropyResult {
        let spot = profile.spot;
        if spot <= 0.0 {
            return EntropyResult::dispersed();
        }

        let qualifying: Vec<(f64, f64)> = profile
            .strikes
            .iter()
            .filter(|s| (s.strike - spot).abs() / spot * 100.0 <= self.config.atm_window_pct)
            .map(|s| (s.strike, s.net_exposure.abs()))
            .filter(|(_, e)| *e > 0.0 && e.is_finite())
            .collect();

        if qualifying.len() < self.config.min_strikes.max(2) {
            debug!(qualifying = qualifying.len(), "Too few strikes for entropy, dispersed default");
            return EntropyResult {
                qualifying_strikes: qualifying.len(),
                ..EntropyResult::dispersed()
            };
        }

        let total: f64 = qualifying.iter().map(|(_, e)| e).sum();
        let shares: Vec<StrikeShare> = qualifying
            .iter()
            .map(|&(strike, e)| StrikeShare {
                strike,
                share: e / total,
            })
            .collect();

        let entropy_nats = -shares
            .iter()
            .filter(|s| s.share > 0.0)
            .map(|s| s.share * s.share.ln())
            .sum::<f64>();
        let max_entropy = (shares.len() as f64).ln();
        let entropy_normalized = (entropy_nats / max_entropy).clamp(0.0, 1.0);
        let regime = self.classify(entropy_normalized);

        let mut dominant_strikes = shares;
        dominant_strikes.sort_by(|a, b| b.share.total_cmp(&a.share));
        dominant_strikes.truncate(self.config.top_k);

        debug!(entropy_normalized, ?regime, "Estimated positional entropy");

        EntropyResult {
            entropy_nats: entropy_nats.max(0.0),
            entropy_normalized,
            regime,
            qualifying_strikes: qualifying.len(),
            dominant_strikes,
        }
    }
}
