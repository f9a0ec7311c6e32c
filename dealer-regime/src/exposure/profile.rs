//! Dealer gamma exposure profile.
//!
//! Dealers are assumed short the calls and puts customers hold. Short-call
//! gamma is reported positive (hedging dampens moves) and short-put gamma
//! negative (hedging amplifies moves). That sign convention holds across the
//! whole crate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::black_scholes::BlackScholes;
use super::channel::{extract_channel, Channel, ChannelConfig};
use super::levels::{find_call_wall, find_max_pain, find_put_wall, Wall};
use crate::data::{OptionType, StrikeRecord};

/// Exposure calculator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    /// Risk-free rate for Black-Scholes.
    pub risk_free_rate: f64,
    /// Shares per contract.
    pub contract_multiplier: f64,
    /// Floor on implied vol.
    pub iv_floor: f64,
    /// Implied vol used when a record carries none.
    pub iv_fallback: f64,
    /// Floor on time to expiry (years).
    pub min_time_years: f64,
    /// Wall search window around spot (%).
    pub wall_window_pct: f64,
    pub channel: ChannelConfig,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            contract_multiplier: 100.0,
            iv_floor: 0.01,
            iv_fallback: 0.30,
            min_time_years: 0.001, // ~9 hours
            wall_window_pct: 12.0,
            channel: ChannelConfig::default(),
        }
    }
}

/// Whether dealers are net long or short gamma at spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GammaRegime {
    /// Dealer hedging dampens moves.
    Positive,
    /// Dealer hedging amplifies moves.
    Negative,
}

impl GammaRegime {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Positive => "Positive dealer gamma, moves are absorbed",
            Self::Negative => "Negative dealer gamma, moves are amplified",
        }
    }
}

/// Aggregated exposure at one strike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrikeExposure {
    pub strike: f64,
    pub call_open_interest: u64,
    pub put_open_interest: u64,
    /// Dollar gamma of dealer short calls (positive).
    pub call_exposure: f64,
    /// Dollar gamma of dealer short puts (negative).
    pub put_exposure: f64,
    pub net_exposure: f64,
    pub net_charm: f64,
    pub net_vanna: f64,
}

/// Exposure across strikes plus the levels derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureProfile {
    pub spot: f64,
    /// Sorted by ascending strike.
    pub strikes: Vec<StrikeExposure>,
    pub total_call_exposure: f64,
    pub total_put_exposure: f64,
    pub total_net_exposure: f64,
    pub total_charm: f64,
    pub total_vanna: f64,
    pub flip_point: Option<f64>,
    pub gamma_regime: GammaRegime,
    pub abs_gamma_strike: Option<f64>,
    pub call_wall: Option<Wall>,
    pub put_wall: Option<Wall>,
    pub max_pain: Option<f64>,
    pub channel: Option<Channel>,
}

impl ExposureProfile {
    /// Profile with no strikes and no levels.
    pub fn empty(spot: f64) -> Self {
        Self {
            spot,
            strikes: Vec::new(),
            total_call_exposure: 0.0,
            total_put_exposure: 0.0,
            total_net_exposure: 0.0,
            total_charm: 0.0,
            total_vanna: 0.0,
            flip_point: None,
            gamma_regime: GammaRegime::Positive,
            abs_gamma_strike: None,
            call_wall: None,
            put_wall: None,
            max_pain: None,
            channel: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }

    /// Distance from spot to the nearer wall as a percentage of spot.
    pub fn nearest_wall_distance_pct(&self) -> Option<f64> {
        if self.spot <= 0.0 {
            return None;
        }
        [self.call_wall, self.put_wall]
            .iter()
            .flatten()
            .map(|w| (w.strike - self.spot).abs() / self.spot * 100.0)
            .reduce(f64::min)
    }
}

/// Builds an `ExposureProfile` from chain records.
pub struct ExposureCalculator {
    config: ExposureConfig,
    bs: BlackScholes,
}

impl ExposureCalculator {
    pub fn new(config: ExposureConfig) -> Self {
        let bs = BlackScholes::new(config.risk_free_rate);
        Self { config, bs }
    }

    fn effective_vol(&self, iv: f64) -> f64 {
        let iv = if iv.is_finite() && iv > 0.0 {
            iv
        } else {
            self.config.iv_fallback
        };
        iv.max(self.config.iv_floor)
    }

    /// Exposure contributed by one record.
    fn record_exposure(&self, record: &StrikeRecord, spot: f64) -> StrikeExposure {
        let time = (record.time_to_expiry_days / 365.0).max(self.config.min_time_years);
        let call_vol = self.effective_vol(record.call_implied_vol);
        let put_vol = self.effective_vol(record.put_implied_vol);
        let call_oi = record.call_open_interest as f64 * self.config.contract_multiplier;
        let put_oi = record.put_open_interest as f64 * self.config.contract_multiplier;
        let k = record.strike;

        let call_exposure = self.bs.gamma(spot, k, time, call_vol) * call_oi * spot;
        let put_exposure = -self.bs.gamma(spot, k, time, put_vol) * put_oi * spot;
        let net_charm = self.bs.charm(spot, k, time, call_vol, OptionType::Call) * call_oi
            - self.bs.charm(spot, k, time, put_vol, OptionType::Put) * put_oi;
        let net_vanna =
            self.bs.vanna(spot, k, time, call_vol) * call_oi - self.bs.vanna(spot, k, time, put_vol) * put_oi;

        StrikeExposure {
            strike: k,
            call_open_interest: record.call_open_interest,
            put_open_interest: record.put_open_interest,
            call_exposure,
            put_exposure,
            net_exposure: call_exposure + put_exposure,
            net_charm,
            net_vanna,
        }
    }

    /// Aggregate records per strike, sorted ascending.
    fn aggregate(&self, records: &[StrikeRecord], spot: f64) -> Vec<StrikeExposure> {
        let mut contributions: Vec<StrikeExposure> = records
            .iter()
            .filter(|r| r.strike.is_finite() && r.strike > 0.0)
            .map(|r| self.record_exposure(r, spot))
            .collect();
        contributions.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        let mut rows: Vec<StrikeExposure> = Vec::with_capacity(contributions.len());
        for c in contributions {
            match rows.last_mut() {
                Some(last) if last.strike == c.strike => {
                    last.call_open_interest = last.call_open_interest.saturating_add(c.call_open_interest);
                    last.put_open_interest = last.put_open_interest.saturating_add(c.put_open_interest);
                    last.call_exposure += c.call_exposure;
                    last.put_exposure += c.put_exposure;
                    last.net_exposure += c.net_exposure;
                    last.net_charm += c.net_charm;
                    last.net_vanna += c.net_vanna;
                }
                _ => rows.push(c),
            }
        }
        rows
    }

    /// Build the exposure profile for a chain at the given spot.
    pub fn calculate(&self, records: &[StrikeRecord], spot: f64) -> ExposureProfile {
        let total_oi = records
            .iter()
            .map(StrikeRecord::total_open_interest)
            .fold(0u64, u64::saturating_add);
        if !(spot.is_finite() && spot > 0.0) || total_oi == 0 {
            debug!(spot, records = records.len(), "No usable open interest, empty exposure profile");
            return ExposureProfile::empty(spot);
        }

        let strikes = self.aggregate(records, spot);
        if strikes.is_empty() {
            return ExposureProfile::empty(spot);
        }

        let total_call_exposure: f64 = strikes.iter().map(|s| s.call_exposure).sum();
        let total_put_exposure: f64 = strikes.iter().map(|s| s.put_exposure).sum();
        let total_net_exposure = total_call_exposure + total_put_exposure;
        let total_charm = strikes.iter().map(|s| s.net_charm).sum();
        let total_vanna = strikes.iter().map(|s| s.net_vanna).sum();

        let flip_point = find_flip_point(&strikes, spot);
        let gamma_regime = match flip_point {
            Some(flip) if spot >= flip => GammaRegime::Positive,
            Some(_) => GammaRegime::Negative,
            None if total_net_exposure >= 0.0 => GammaRegime::Positive,
            None => GammaRegime::Negative,
        };

        let abs_gamma_strike = strikes
            .iter()
            .filter(|s| s.net_exposure != 0.0)
            .fold(None::<&StrikeExposure>, |best, s| match best {
                Some(b) if b.net_exposure.abs() >= s.net_exposure.abs() => Some(b),
                _ => Some(s),
            })
            .map(|s| s.strike);

        let call_wall = find_call_wall(&strikes, spot, self.config.wall_window_pct);
        let put_wall = find_put_wall(&strikes, spot, self.config.wall_window_pct);
        let max_pain = find_max_pain(&strikes);
        let channel = extract_channel(&strikes, spot, &self.config.channel);

        debug!(
            strikes = strikes.len(),
            total_net_exposure,
            ?flip_point,
            ?gamma_regime,
            "Built exposure profile"
        );

        ExposureProfile {
            spot,
            strikes,
            total_call_exposure,
            total_put_exposure,
            total_net_exposure,
            total_charm,
            total_vanna,
            flip_point,
            gamma_regime,
            abs_gamma_strike,
            call_wall,
            put_wall,
            max_pain,
            channel,
        }
    }
}

/// Zero crossing of cumulative net exposure nearest to spot.
///
/// Cumulative exposure is summed in ascending strike order; the crossing is
/// linearly interpolated between the bracketing strikes.
pub fn find_flip_point(rows: &[StrikeExposure], spot: f64) -> Option<f64> {
    if rows.len() < 2 {
        return None;
    }

    let cumulative: Vec<f64> = rows
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r.net_exposure;
            Some(*acc)
        })
        .collect();

    let mut best: Option<f64> = None;
    for i in 0..rows.len() - 1 {
        let (c1, c2) = (cumulative[i], cumulative[i + 1]);
        if c1 * c2 >= 0.0 {
            continue;
        }
        let (s1, s2) = (rows[i].strike, rows[i + 1].strike);
        let flip = s1 + (s2 - s1) * c1.abs() / (c1.abs() + c2.abs());
        if best.map_or(true, |b| (flip - spot).abs() < (b - spot).abs()) {
            best = Some(flip);
        }
    }

    best
}
