//! Flow-pressure ratio.
//!
//! Compares fresh speculative call flow near the money with the standing
//! dealer book, both weighted by a Gaussian moneyness kernel. A ratio above
//! one means new flow exceeds what dealer inventory can absorb.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::StrikeRecord;
use crate::exposure::ExposureProfile;

/// Flow-pressure configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowPressureConfig {
    /// Moneyness band counted as near the money (fraction of spot).
    pub atm_tolerance: f64,
    /// Floor on implied vol inside the kernel.
    pub iv_floor: f64,
    pub contract_multiplier: f64,
    /// Dealer exposure below this is treated as zero.
    pub dealer_epsilon: f64,
    /// Upper bound on the raw ratio.
    pub ratio_cap: f64,
    /// Beta floor in `1 / max(beta, floor)`.
    pub beta_floor: f64,
    /// Adjusted ratio below this is laminar.
    pub laminar_below: f64,
    /// Adjusted ratio above this is turbulent.
    pub turbulent_above: f64,
}

impl Default for FlowPressureConfig {
    fn default() -> Self {
        Self {
            atm_tolerance: 0.10,
            iv_floor: 0.01,
            contract_multiplier: 100.0,
            dealer_epsilon: 1e-6,
            ratio_cap: 99.0,
            beta_floor: 0.3,
            laminar_below: 0.7,
            turbulent_above: 1.0,
        }
    }
}

/// Flow regime by adjusted ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FlowRegime {
    /// Dealers absorb flow.
    Laminar,
    /// Dealers near capacity.
    Transitional,
    /// Flow overwhelms dealer hedging.
    Turbulent,
}

impl FlowRegime {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Laminar => "Dealer book absorbs speculative flow",
            Self::Transitional => "Dealer book near capacity",
            Self::Turbulent => "Speculative flow overwhelms dealer hedging",
        }
    }
}

/// Output of the flow-pressure estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowPressureResult {
    pub speculative_exposure: f64,
    pub dealer_exposure: f64,
    pub ratio: f64,
    pub beta: f64,
    pub beta_adjustment: f64,
    pub adjusted_ratio: f64,
    pub regime: FlowRegime,
    /// Near-the-money call volume over put volume.
    pub call_put_volume_ratio: f64,
    /// Mean near-the-money call implied vol.
    pub atm_implied_vol: Option<f64>,
}

/// Flow-pressure estimator.
pub struct FlowPressureEstimator {
    config: FlowPressureConfig,
}

impl FlowPressureEstimator {
    pub fn new(config: FlowPressureConfig) -> Self {
        Self { config }
    }

    /// `1 / max(beta, floor)`; non-finite beta is treated as the floor.
    pub fn beta_adjustment(&self, beta: f64) -> f64 {
        let beta = if beta.is_finite() { beta } else { self.config.beta_floor };
        1.0 / beta.max(self.config.beta_floor)
    }

    /// Regime as a step function of the adjusted ratio.
    pub fn classify(&self, adjusted_ratio: f64) -> FlowRegime {
        if adjusted_ratio < self.config.laminar_below {
            FlowRegime::Laminar
        } else if adjusted_ratio > self.config.turbulent_above {
            FlowRegime::Turbulent
        } else {
            FlowRegime::Transitional
        }
    }

    fn kernel(&self, spot: f64, strike: f64, iv: f64) -> f64 {
        let sigma = if iv.is_finite() { iv.max(self.config.iv_floor) } else { self.config.iv_floor };
        let z = (spot / strike).ln() / sigma;
        (-0.5 * z * z).exp()
    }

    pub fn estimate(&self, profile: &ExposureProfile, records: &[StrikeRecord], beta: f64) -> FlowPressureResult {
        let spot = profile.spot;
        let beta_adjustment = self.beta_adjustment(beta);

        let mut speculative = 0.0;
        let mut dealer = 0.0;
        let mut call_volume = 0u64;
        let mut put_volume = 0u64;
        let mut atm_ivs: Vec<f64> = Vec::new();

        if !profile.is_empty() && spot > 0.0 {
            let scale = self.config.contract_multiplier * spot * spot * 0.01;

            for r in records.iter().filter(|r| r.strike > 0.0) {
                let call_k = self.kernel(spot, r.strike, r.call_implied_vol);
                let put_k = self.kernel(spot, r.strike, r.put_implied_vol);

                dealer += call_k * r.call_open_interest as f64 * scale;
                dealer -= put_k * r.put_open_interest as f64 * scale;
                call_volume = call_volume.saturating_add(r.call_volume);
                put_volume = put_volume.saturating_add(r.put_volume);

                if r.moneyness(spot) <= self.config.atm_tolerance {
                    speculative += call_k * r.call_volume as f64 * scale;
                    if r.call_implied_vol.is_finite() && r.call_implied_vol > 0.0 {
                        atm_ivs.push(r.call_implied_vol);
                    }
                }
            }
        }

        let ratio = if dealer.abs() < self.config.dealer_epsilon {
            if speculative > 0.0 {
                self.config.ratio_cap
            } else {
                0.0
            }
        } else {
            (speculative.abs() / dealer.abs()).min(self.config.ratio_cap)
        };

        let adjusted_ratio = ratio * beta_adjustment;
        let regime = self.classify(adjusted_ratio);
        let atm_implied_vol = if atm_ivs.is_empty() {
            None
        } else {
            Some(atm_ivs.iter().sum::<f64>() / atm_ivs.len() as f64)
        };

        debug!(ratio, beta, adjusted_ratio, ?regime, "Estimated flow pressure");

        FlowPressureResult {
            speculative_exposure: speculative,
            dealer_exposure: dealer,
            ratio,
            beta,
            beta_adjustment,
            adjusted_ratio,
            regime,
            call_put_volume_ratio: call_volume as f64 / put_volume.max(1) as f64,
            atm_implied_vol,
        }
    }
}
