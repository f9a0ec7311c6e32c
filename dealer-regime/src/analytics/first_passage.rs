//! First-passage arrival estimates for key price levels.
//!
//! Treats price as a driftless random walk with daily dollar volatility
//! sigma. The mean time to reach a barrier at distance d is d^2 / (2 sigma^2)
//! days, shortened under turbulent flow and lengthened when dealers dampen.

use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use tracing::debug;

use crate::flow::FlowRegime;
use crate::regime::AutocorrelationRegime;

/// First-passage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstPassageConfig {
    /// Distances below this (price units) count as already at the level.
    pub negligible_distance: f64,
    pub turbulent_multiplier: f64,
    pub transitional_multiplier: f64,
    pub long_gamma_multiplier: f64,
    pub probability_floor: f64,
    pub probability_cap: f64,
    /// Adjusted days below this are NOW.
    pub now_below_days: f64,
    /// Adjusted days below this are IMMINENT.
    pub imminent_below_days: f64,
    /// Beyond this multiple of the horizon an arrival is UNLIKELY.
    pub unlikely_horizon_multiple: f64,
    /// Collision probability when inputs are unusable.
    pub collision_neutral: f64,
    pub collision_floor: f64,
    pub collision_cap: f64,
}

impl Default for FirstPassageConfig {
    fn default() -> Self {
        Self {
            negligible_distance: 0.01,
            turbulent_multiplier: 0.6,
            transitional_multiplier: 0.8,
            long_gamma_multiplier: 1.4,
            probability_floor: 0.01,
            probability_cap: 0.99,
            now_below_days: 1.0,
            imminent_below_days: 2.0,
            unlikely_horizon_multiple: 2.0,
            collision_neutral: 0.5,
            collision_floor: 0.05,
            collision_cap: 0.95,
        }
    }
}

/// How soon a level is expected to be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    Now,
    Imminent,
    Soon,
    Possible,
    Unlikely,
}

/// Side of spot a level sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelSide {
    Above,
    Below,
    At,
}

/// A named price level; levels without a price are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLevel {
    pub name: String,
    pub price: Option<f64>,
}

impl NamedLevel {
    pub fn new(name: &str, price: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            price,
        }
    }
}

/// Expected arrival at one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelArrival {
    pub level_name: String,
    pub level_price: f64,
    pub side: LevelSide,
    pub distance: f64,
    pub distance_pct: f64,
    pub expected_days_raw: f64,
    pub regime_multiplier: f64,
    pub expected_days_adjusted: f64,
    pub probability_within_horizon: f64,
    pub urgency: Urgency,
}

/// Estimates arrival times at named levels.
pub struct FirstPassageEstimator {
    config: FirstPassageConfig,
}

impl FirstPassageEstimator {
    pub fn new(config: FirstPassageConfig) -> Self {
        Self { config }
    }

    /// Turbulence shortens arrival, dampening lengthens it.
    pub fn regime_multiplier(&self, flow: FlowRegime, autocorrelation: AutocorrelationRegime) -> f64 {
        match (flow, autocorrelation) {
            (FlowRegime::Turbulent, _) => self.config.turbulent_multiplier,
            (FlowRegime::Transitional, _) => self.config.transitional_multiplier,
            (_, AutocorrelationRegime::LongGamma) => self.config.long_gamma_multiplier,
            _ => 1.0,
        }
    }

    /// Mean first-passage time in days for a driftless walk.
    pub fn expected_days(&self, distance: f64, daily_vol: f64) -> f64 {
        if distance < self.config.negligible_distance {
            return 0.0;
        }
        distance * distance / (2.0 * daily_vol * daily_vol)
    }

    /// Probability of reaching the level within the horizon.
    pub fn probability_within(&self, distance: f64, daily_vol: f64, horizon_days: f64) -> f64 {
        if distance < self.config.negligible_distance {
            return self.config.probability_cap;
        }
        let horizon = horizon_days.max(1.0);
        let z = distance / (daily_vol * (2.0 * horizon).sqrt());
        (1.0 - erfc(z)).clamp(self.config.probability_floor, self.config.probability_cap)
    }

    pub fn urgency(&self, adjusted_days: f64, horizon_days: f64) -> Urgency {
        if adjusted_days < self.config.now_below_days {
            Urgency::Now
        } else if adjusted_days < self.config.imminent_below_days {
            Urgency::Imminent
        } else if adjusted_days <= horizon_days {
            Urgency::Soon
        } else if adjusted_days > self.config.unlikely_horizon_multiple * horizon_days {
            Urgency::Unlikely
        } else {
            Urgency::Possible
        }
    }

    /// Arrivals for every priced level, sorted by adjusted expected days.
    pub fn estimate(
        &self,
        spot: f64,
        levels: &[NamedLevel],
        daily_vol: f64,
        flow: FlowRegime,
        autocorrelation: AutocorrelationRegime,
        horizon_days: f64,
    ) -> Vec<LevelArrival> {
        if !(daily_vol > 0.0 && daily_vol.is_finite()) || spot <= 0.0 {
            debug!(daily_vol, spot, "Unusable volatility or spot, no arrival estimates");
            return Vec::new();
        }

        let multiplier = self.regime_multiplier(flow, autocorrelation);
        let mut arrivals: Vec<LevelArrival> = levels
            .iter()
            .filter_map(|level| {
                let price = level.price.filter(|p| *p > 0.0 && p.is_finite())?;
                let distance = (spot - price).abs();
                let side = if distance < self.config.negligible_distance {
                    LevelSide::At
                } else if price > spot {
                    LevelSide::Above
                } else {
                    LevelSide::Below
                };

                let expected_days_raw = self.expected_days(distance, daily_vol);
                let expected_days_adjusted = expected_days_raw * multiplier;

                Some(LevelArrival {
                    level_name: level.name.clone(),
                    level_price: price,
                    side,
                    distance,
                    distance_pct: distance / spot * 100.0,
                    expected_days_raw,
                    regime_multiplier: multiplier,
                    expected_days_adjusted,
                    probability_within_horizon: self.probability_within(distance, daily_vol, horizon_days),
                    urgency: self.urgency(expected_days_adjusted, horizon_days),
                })
            })
            .collect();

        arrivals.sort_by(|a, b| a.expected_days_adjusted.total_cmp(&b.expected_days_adjusted));
        arrivals
    }

    /// Heuristic chance that price touches `level` within the horizon.
    ///
    /// Non-increasing in distance and clamped to the collision band; 0.5 when
    /// any input is unusable.
    pub fn collision_probability(&self, spot: f64, level: Option<f64>, atr: f64, horizon_days: f64) -> f64 {
        let level = match level {
            Some(l) if l > 0.0 => l,
            _ => return self.config.collision_neutral,
        };
        if spot <= 0.0 || atr <= 0.0 || horizon_days <= 0.0 {
            return self.config.collision_neutral;
        }

        let distance = (spot - level).abs();
        if distance < self.config.negligible_distance {
            return self.config.collision_cap;
        }

        (atr * horizon_days.sqrt() / (2.0 * distance))
            .clamp(self.config.collision_floor, self.config.collision_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn estimator() -> FirstPassageEstimator {
        FirstPassageEstimator::new(FirstPassageConfig::default())
    }

    #[test]
    fn test_turbulent_scenario() {
        let levels = vec![NamedLevel::new("call_wall", Some(105.0))];
        let arrivals = estimator().estimate(
            100.0,
            &levels,
            2.0,
            FlowRegime::Turbulent,
            AutocorrelationRegime::Neutral,
            10.0,
        );

        let a = &arrivals[0];
        assert_relative_eq!(a.expected_days_raw, 3.125, epsilon = 1e-12);
        assert_relative_eq!(a.expected_days_adjusted, 1.875, epsilon = 1e-12);
        assert_eq!(a.urgency, Urgency::Imminent);
        assert_eq!(a.side, LevelSide::Above);
        assert_relative_eq!(a.probability_within_horizon, 0.57, epsilon = 0.01);
    }

    #[test]
    fn test_expected_days_is_quadratic() {
        let est = estimator();
        let near = est.expected_days(2.0, 1.5);
        let far = est.expected_days(4.0, 1.5);
        assert_relative_eq!(far / near, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negligible_distance_is_immediate() {
        let est = estimator();
        assert_eq!(est.expected_days(0.005, 2.0), 0.0);
        let arrivals = est.estimate(
            100.0,
            &[NamedLevel::new("flip", Some(100.005))],
            2.0,
            FlowRegime::Laminar,
            AutocorrelationRegime::LongGamma,
            5.0,
        );
        assert_eq!(arrivals[0].expected_days_adjusted, 0.0);
        assert_eq!(arrivals[0].urgency, Urgency::Now);
        assert_eq!(arrivals[0].side, LevelSide::At);
        assert_eq!(arrivals[0].probability_within_horizon, 0.99);
    }

    #[test]
    fn test_regime_multipliers() {
        let est = estimator();
        assert_eq!(est.regime_multiplier(FlowRegime::Turbulent, AutocorrelationRegime::LongGamma), 0.6);
        assert_eq!(est.regime_multiplier(FlowRegime::Transitional, AutocorrelationRegime::Neutral), 0.8);
        assert_eq!(est.regime_multiplier(FlowRegime::Laminar, AutocorrelationRegime::LongGamma), 1.4);
        assert_eq!(est.regime_multiplier(FlowRegime::Laminar, AutocorrelationRegime::ShortGamma), 1.0);
    }

    #[test]
    fn test_urgency_bands() {
        let est = estimator();
        assert_eq!(est.urgency(0.5, 5.0), Urgency::Now);
        assert_eq!(est.urgency(1.5, 5.0), Urgency::Imminent);
        assert_eq!(est.urgency(5.0, 5.0), Urgency::Soon);
        assert_eq!(est.urgency(8.0, 5.0), Urgency::Possible);
        assert_eq!(est.urgency(10.5, 5.0), Urgency::Unlikely);
    }

    #[test]
    fn test_sorted_and_skips_unpriced_levels() {
        let levels = vec![
            NamedLevel::new("far", Some(110.0)),
            NamedLevel::new("missing", None),
            NamedLevel::new("negative", Some(-5.0)),
            NamedLevel::new("near", Some(98.0)),
        ];
        let arrivals = estimator().estimate(
            100.0,
            &levels,
            2.0,
            FlowRegime::Laminar,
            AutocorrelationRegime::Neutral,
            5.0,
        );
        assert_eq!(arrivals.len(), 2);
        assert_eq!(arrivals[0].level_name, "near");
        assert_eq!(arrivals[0].side, LevelSide::Below);
        assert_eq!(arrivals[1].level_name, "far");
    }

    #[test]
    fn test_non_positive_volatility_is_empty() {
        let levels = vec![NamedLevel::new("wall", Some(105.0))];
        let est = estimator();
        assert!(est
            .estimate(100.0, &levels, 0.0, FlowRegime::Laminar, AutocorrelationRegime::Neutral, 5.0)
            .is_empty());
        assert!(est
            .estimate(100.0, &levels, -1.0, FlowRegime::Laminar, AutocorrelationRegime::Neutral, 5.0)
            .is_empty());
    }

    #[test]
    fn test_probability_is_clamped() {
        let est = estimator();
        for d in [0.5, 5.0, 50.0, 500.0] {
            let p = est.probability_within(d, 2.0, 10.0);
            assert!((0.01..=0.99).contains(&p));
        }
    }

    #[test]
    fn test_collision_probability_monotonic_in_distance() {
        let est = estimator();
        let mut last = 0.0;
        for level in [130.0, 120.0, 110.0, 105.0, 102.0, 101.0, 100.5, 100.0] {
            let p = est.collision_probability(100.0, Some(level), 2.0, 5.0);
            assert!(p >= last, "p={} at level {}", p, level);
            assert!((0.05..=0.95).contains(&p));
            last = p;
        }
    }

    #[test]
    fn test_collision_probability_unusable_inputs() {
        let est = estimator();
        assert_eq!(est.collision_probability(100.0, None, 2.0, 5.0), 0.5);
        assert_eq!(est.collision_probability(100.0, Some(105.0), 0.0, 5.0), 0.5);
        assert_eq!(est.collision_probability(100.0, Some(105.0), 2.0, 0.0), 0.5);
        assert_eq!(est.collision_probability(100.0, Some(100.0), 2.0, 5.0), 0.95);
        // 2 * sqrt(4) / (2 * 10) = 0.2
        assert_relative_eq!(est.collision_probability(100.0, Some(110.0), 2.0, 4.0), 0.2);
    }
}
