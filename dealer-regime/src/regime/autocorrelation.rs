//! Intraday return autocorrelation regime.
//!
//! Dealers long gamma sell rallies and buy dips, which shows up as negative
//! lag-1 autocorrelation of intraday returns. Short-gamma hedging chases
//! moves and pushes it positive.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::IntradayBar;
use crate::technicals::simple_returns;

/// Autocorrelation detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocorrelationConfig {
    /// Trailing trading days analyzed.
    pub trailing_days: usize,
    /// Days with fewer bars are excluded.
    pub min_bars_per_day: usize,
    /// Lag-1 autocorrelation below this is dampened (long gamma).
    pub dampened_below: f64,
    /// Lag-1 autocorrelation above this is amplified (short gamma).
    pub amplified_above: f64,
    /// Days whose return variance is below this are excluded.
    pub variance_floor: f64,
    /// Magnitude increase needed before the latest day counts as deepening.
    pub stability_margin: f64,
}

impl Default for AutocorrelationConfig {
    fn default() -> Self {
        Self {
            trailing_days: 5,
            min_bars_per_day: 20,
            dampened_below: -0.05,
            amplified_above: 0.05,
            variance_floor: 1e-12,
            stability_margin: 0.02,
        }
    }
}

/// Return-structure regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutocorrelationRegime {
    /// Mean-reverting returns.
    LongGamma,
    /// Trending returns.
    ShortGamma,
    Neutral,
}

impl AutocorrelationRegime {
    pub fn description(&self) -> &'static str {
        match self {
            Self::LongGamma => "Moves fade, dealers dampen",
            Self::ShortGamma => "Moves extend, dealers amplify",
            Self::Neutral => "No persistent return structure",
        }
    }
}

/// How the latest day compares with the trailing days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegimeStability {
    Stable,
    Deepening,
    Reversing,
}

/// Lag-1 autocorrelation for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAutocorrelation {
    pub date: NaiveDate,
    pub bars: usize,
    pub lag1: f64,
    pub regime: AutocorrelationRegime,
}

/// Output of the autocorrelation detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocorrelationResult {
    pub mean_lag1: f64,
    /// Share of usable days that were dampened (0-100).
    pub pct_dampened: f64,
    /// Share of usable days that were amplified (0-100).
    pub pct_amplified: f64,
    pub regime: AutocorrelationRegime,
    pub stability: RegimeStability,
    pub days_used: usize,
    /// Usable days over trailing days, in [0, 1].
    pub confidence: f64,
    pub daily: Vec<DailyAutocorrelation>,
}

impl AutocorrelationResult {
    /// Neutral result with zero confidence.
    pub fn neutral() -> Self {
        Self {
            mean_lag1: 0.0,
            pct_dampened: 0.0,
            pct_amplified: 0.0,
            regime: AutocorrelationRegime::Neutral,
            stability: RegimeStability::Stable,
            days_used: 0,
            confidence: 0.0,
            daily: Vec::new(),
        }
    }
}

/// Detects the autocorrelation regime from intraday bars.
pub struct AutocorrelationDetector {
    config: AutocorrelationConfig,
}

impl AutocorrelationDetector {
    pub fn new(config: AutocorrelationConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, lag1: f64) -> AutocorrelationRegime {
        if lag1 < self.config.dampened_below {
            AutocorrelationRegime::LongGamma
        } else if lag1 > self.config.amplified_above {
            AutocorrelationRegime::ShortGamma
        } else {
            AutocorrelationRegime::Neutral
        }
    }

    /// Lag-1 autocorrelation of a return series; `None` when flat or too short.
    pub fn lag1_autocorrelation(&self, returns: &[f64]) -> Option<f64> {
        let n = returns.len();
        if n < 3 {
            return None;
        }

        let mean = returns.iter().sum::<f64>() / n as f64;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64;
        if var < self.config.variance_floor {
            return None;
        }

        let cov = returns
            .windows(2)
            .map(|w| (w[0] - mean) * (w[1] - mean))
            .sum::<f64>()
            / (n - 1) as f64;
        Some((cov / var).clamp(-1.0, 1.0))
    }

    /// Compare the latest day against the mean of the earlier days.
    pub fn stability(&self, latest: f64, trailing: f64) -> RegimeStability {
        let outside = |v: f64| self.classify(v) != AutocorrelationRegime::Neutral;

        if latest * trailing < 0.0 && (outside(latest) || outside(trailing)) {
            RegimeStability::Reversing
        } else if latest * trailing > 0.0
            && outside(latest)
            && latest.abs() > trailing.abs() + self.config.stability_margin
        {
            RegimeStability::Deepening
        } else {
            RegimeStability::Stable
        }
    }

    fn session_autocorrelation(&self, date: NaiveDate, closes: &[f64]) -> Option<DailyAutocorrelation> {
        if closes.len() < self.config.min_bars_per_day {
            return None;
        }
        let lag1 = self.lag1_autocorrelation(&simple_returns(closes))?;
        Some(DailyAutocorrelation {
            date,
            bars: closes.len(),
            lag1,
            regime: self.classify(lag1),
        })
    }

    /// Per-session results for every usable session, oldest first.
    pub fn daily_series(&self, bars: &[IntradayBar]) -> Vec<DailyAutocorrelation> {
        group_by_session(bars)
            .iter()
            .filter_map(|(date, closes)| self.session_autocorrelation(*date, closes))
            .collect()
    }

    pub fn detect(&self, bars: &[IntradayBar]) -> AutocorrelationResult {
        let sessions = group_by_session(bars);
        let start = sessions.len().saturating_sub(self.config.trailing_days);

        let daily: Vec<DailyAutocorrelation> = sessions[start..]
            .iter()
            .filter_map(|(date, closes)| self.session_autocorrelation(*date, closes))
            .collect();

        if daily.is_empty() {
            debug!(sessions = sessions.len(), "No usable intraday sessions, neutral autocorrelation");
            return AutocorrelationResult::neutral();
        }

        let days_used = daily.len();
        let mean_lag1 = (daily.iter().map(|d| d.lag1).sum::<f64>() / days_used as f64).clamp(-1.0, 1.0);
        let count = |regime: AutocorrelationRegime| daily.iter().filter(|d| d.regime == regime).count() as f64;
        let pct_dampened = count(AutocorrelationRegime::LongGamma) / days_used as f64 * 100.0;
        let pct_amplified = count(AutocorrelationRegime::ShortGamma) / days_used as f64 * 100.0;

        let stability = match daily.split_last() {
            Some((latest, earlier)) if !earlier.is_empty() => {
                let trailing = earlier.iter().map(|d| d.lag1).sum::<f64>() / earlier.len() as f64;
                self.stability(latest.lag1, trailing)
            }
            _ => RegimeStability::Stable,
        };

        let confidence = if self.config.trailing_days > 0 {
            (days_used as f64 / self.config.trailing_days as f64).min(1.0)
        } else {
            0.0
        };

        let regime = self.classify(mean_lag1);
        debug!(mean_lag1, days_used, ?regime, ?stability, "Detected autocorrelation regime");

        AutocorrelationResult {
            mean_lag1,
            pct_dampened,
            pct_amplified,
            regime,
            stability,
            days_used,
            confidence,
            daily,
        }
    }
}

/// Closes grouped by calendar date, in input order.
fn group_by_session(bars: &[IntradayBar]) -> Vec<(NaiveDate, Vec<f64>)> {
    let mut sessions: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    for bar in bars {
        let date = bar.timestamp.date();
        match sessions.last_mut() {
            Some((d, closes)) if *d == date => closes.push(bar.close),
            _ => sessions.push((date, vec![bar.close])),
        }
    }
    sessions
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Bars for one session built from a return sequence.
    pub(crate) fn session(day: u32, returns: &[f64]) -> Vec<IntradayBar> {
        let open = NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut price = 100.0;
        let mut bars = vec![IntradayBar { timestamp: open, close: price }];
        for (i, r) in returns.iter().enumerate() {
            price *= 1.0 + r;
            bars.push(IntradayBar {
                timestamp: open + chrono::Duration::minutes(5 * (i as i64 + 1)),
                close: price,
            });
        }
        bars
    }

    /// Alternating returns: strongly mean-reverting.
    pub(crate) fn choppy(n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 0.002 } else { -0.002 }).collect()
    }

    /// Runs of five same-sign returns: trending.
    pub(crate) fn trending(n: usize) -> Vec<f64> {
        (0..n).map(|i| if (i / 5) % 2 == 0 { 0.002 } else { -0.0015 }).collect()
    }

    #[test]
    fn test_classify_thresholds() {
        let det = AutocorrelationDetector::new(AutocorrelationConfig::default());
        assert_eq!(det.classify(-0.06), AutocorrelationRegime::LongGamma);
        assert_eq!(det.classify(-0.05), AutocorrelationRegime::Neutral);
        assert_eq!(det.classify(0.05), AutocorrelationRegime::Neutral);
        assert_eq!(det.classify(0.06), AutocorrelationRegime::ShortGamma);
    }

    #[test]
    fn test_lag1_of_alternating_series() {
        let det = AutocorrelationDetector::new(AutocorrelationConfig::default());
        let acf = det.lag1_autocorrelation(&choppy(40)).unwrap();
        assert_relative_eq!(acf, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lag1_flat_series_is_undefined() {
        let det = AutocorrelationDetector::new(AutocorrelationConfig::default());
        assert!(det.lag1_autocorrelation(&[0.001; 30]).is_none());
        assert!(det.lag1_autocorrelation(&[0.001, -0.001]).is_none());
    }

    #[test]
    fn test_choppy_sessions_are_long_gamma() {
        let bars: Vec<IntradayBar> = (4..9).flat_map(|d| session(d, &choppy(40))).collect();
        let result = AutocorrelationDetector::new(AutocorrelationConfig::default()).detect(&bars);
        assert_eq!(result.regime, AutocorrelationRegime::LongGamma);
        assert_eq!(result.days_used, 5);
        assert_relative_eq!(result.pct_dampened, 100.0);
        assert_relative_eq!(result.confidence, 1.0);
        assert_eq!(result.stability, RegimeStability::Stable);
    }

    #[test]
    fn test_trending_sessions_are_short_gamma() {
        let bars: Vec<IntradayBar> = (4..9).flat_map(|d| session(d, &trending(40))).collect();
        let result = AutocorrelationDetector::new(AutocorrelationConfig::default()).detect(&bars);
        assert_eq!(result.regime, AutocorrelationRegime::ShortGamma);
        assert_relative_eq!(result.pct_amplified, 100.0);
    }

    #[test]
    fn test_only_trailing_days_are_used() {
        // Two old trending days fall outside the five-day window
        let bars: Vec<IntradayBar> = (1..3)
            .flat_map(|d| session(d, &trending(40)))
            .chain((4..9).flat_map(|d| session(d, &choppy(40))))
            .collect();
        let result = AutocorrelationDetector::new(AutocorrelationConfig::default()).detect(&bars);
        assert_eq!(result.days_used, 5);
        assert_relative_eq!(result.pct_amplified, 0.0);
    }

    #[test]
    fn test_reversal_on_latest_day() {
        let bars: Vec<IntradayBar> = (4..8)
            .flat_map(|d| session(d, &trending(40)))
            .chain(session(8, &choppy(40)))
            .collect();
        let result = AutocorrelationDetector::new(AutocorrelationConfig::default()).detect(&bars);
        assert_eq!(result.stability, RegimeStability::Reversing);
    }

    #[test]
    fn test_stability_rules() {
        let det = AutocorrelationDetector::new(AutocorrelationConfig::default());
        assert_eq!(det.stability(-0.30, -0.10), RegimeStability::Deepening);
        assert_eq!(det.stability(-0.10, -0.30), RegimeStability::Stable);
        assert_eq!(det.stability(0.20, -0.10), RegimeStability::Reversing);
        // Sign flip inside the neutral band is noise
        assert_eq!(det.stability(0.01, -0.01), RegimeStability::Stable);
        assert_eq!(det.stability(0.03, 0.01), RegimeStability::Stable);
        assert_eq!(det.stability(-0.31, -0.30), RegimeStability::Stable);
    }

    #[test]
    fn test_short_sessions_are_excluded() {
        let bars: Vec<IntradayBar> = (4..9).flat_map(|d| session(d, &choppy(10))).collect();
        let result = AutocorrelationDetector::new(AutocorrelationConfig::default()).detect(&bars);
        assert_eq!(result.regime, AutocorrelationRegime::Neutral);
        assert_eq!(result.days_used, 0);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_daily_series_covers_every_usable_session() {
        let bars: Vec<IntradayBar> = (1..3)
            .flat_map(|d| session(d, &trending(40)))
            .chain(session(3, &choppy(5)))
            .chain((4..9).flat_map(|d| session(d, &choppy(40))))
            .collect();
        let series = AutocorrelationDetector::new(AutocorrelationConfig::default()).daily_series(&bars);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].regime, AutocorrelationRegime::ShortGamma);
        assert_eq!(series[6].regime, AutocorrelationRegime::LongGamma);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_partial_confidence() {
        let bars: Vec<IntradayBar> = (4..6)
            .flat_map(|d| session(d, &choppy(40)))
            .chain((6..9).flat_map(|d| session(d, &choppy(5))))
            .collect();
        let result = AutocorrelationDetector::new(AutocorrelationConfig::default()).detect(&bars);
        assert_eq!(result.days_used, 2);
        assert_relative_eq!(result.confidence, 0.4);
    }
}
