//! Trend and relative-strength context.
//!
//! Derived from daily bars when the snapshot does not carry a precomputed
//! context. Feeds beta into flow pressure and the trend votes into the
//! thesis direction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::volatility::{average_true_range, realized_volatility, simple_returns};
use crate::data::DailyBar;

/// Trend component configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Trailing returns used for beta.
    pub beta_window: usize,
    /// Fewer aligned returns than this falls back to beta 1.0.
    pub beta_min_samples: usize,
    /// Benchmark variance below this falls back to beta 1.0.
    pub beta_variance_floor: f64,
    /// ATR lookback (bars).
    pub atr_period: usize,
    /// Moving averages checked for alignment.
    pub ma_periods: Vec<usize>,
    /// Short and long relative-strength lookbacks (days).
    pub rs_short_days: usize,
    pub rs_long_days: usize,
    /// Trailing returns used for realized vol.
    pub realized_vol_window: usize,
    /// Minimum closes for realized vol.
    pub realized_vol_min_closes: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            beta_window: 60,
            beta_min_samples: 20,
            beta_variance_floor: 1e-10,
            atr_period: 14,
            ma_periods: vec![20, 50, 200],
            rs_short_days: 5,
            rs_long_days: 20,
            realized_vol_window: 20,
            realized_vol_min_closes: 10,
        }
    }
}

/// Relative-strength label versus the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelativeStrength {
    StrongLeader,
    Outperforming,
    InLine,
    Underperforming,
    StrongLaggard,
}

impl RelativeStrength {
    /// Label from the average return spread versus the benchmark (percent).
    pub fn from_spread(spread_pct: f64) -> Self {
        match spread_pct {
            s if s > 3.0 => Self::StrongLeader,
            s if s > 1.0 => Self::Outperforming,
            s if s > -1.0 => Self::InLine,
            s if s > -3.0 => Self::Underperforming,
            _ => Self::StrongLaggard,
        }
    }

    /// +1 for leaders, -1 for laggards, 0 in line.
    pub fn vote(&self) -> i32 {
        match self {
            Self::StrongLeader | Self::Outperforming => 1,
            Self::InLine => 0,
            Self::Underperforming | Self::StrongLaggard => -1,
        }
    }
}

/// Trend/relative-strength inputs consumed by flow pressure and the thesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendContext {
    pub beta: f64,
    /// Sum of +1/-1 per moving average spot is above/below, in [-3, 3].
    pub ma_alignment: i32,
    pub relative_strength: RelativeStrength,
    pub rs_short_pct: f64,
    pub rs_long_pct: f64,
    /// Combined trend score in [-2, 2].
    pub trend_score: i32,
    /// Average true range in price units.
    pub atr: f64,
    /// Annualized realized volatility.
    pub realized_vol: Option<f64>,
}

impl Default for TrendContext {
    fn default() -> Self {
        Self {
            beta: 1.0,
            ma_alignment: 0,
            relative_strength: RelativeStrength::InLine,
            rs_short_pct: 0.0,
            rs_long_pct: 0.0,
            trend_score: 0,
            atr: 0.0,
            realized_vol: None,
        }
    }
}

/// Computes `TrendContext` from daily bars.
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, bars: &[DailyBar], benchmark: &[DailyBar], spot: f64) -> TrendContext {
        let closes: Vec<f64> = bars.iter().map(DailyBar::close_f64).collect();
        let bench: Vec<f64> = benchmark.iter().map(DailyBar::close_f64).collect();

        let beta = self.estimate_beta(&closes, &bench);
        let ma_alignment = self.ma_alignment(&closes, spot);
        let rs_short_pct = return_spread(&closes, &bench, self.config.rs_short_days);
        let rs_long_pct = return_spread(&closes, &bench, self.config.rs_long_days);
        let relative_strength = RelativeStrength::from_spread((rs_short_pct + rs_long_pct) / 2.0);
        let trend_score = trend_score(ma_alignment, relative_strength);
        let atr = average_true_range(bars, self.config.atr_period);
        let realized_vol = realized_volatility(
            &closes,
            self.config.realized_vol_window,
            self.config.realized_vol_min_closes,
        );

        debug!(beta, ma_alignment, ?relative_strength, atr, "Computed trend context");

        TrendContext {
            beta,
            ma_alignment,
            relative_strength,
            rs_short_pct,
            rs_long_pct,
            trend_score,
            atr,
            realized_vol,
        }
    }

    /// Beta of instrument returns against benchmark returns.
    ///
    /// Uses the trailing `beta_window` aligned returns. Falls back to 1.0 when
    /// the sample is short or the benchmark variance is numerically zero.
    pub fn estimate_beta(&self, closes: &[f64], benchmark: &[f64]) -> f64 {
        let r = simple_returns(closes);
        let b = simple_returns(benchmark);
        let n = r.len().min(b.len()).min(self.config.beta_window);
        if n < self.config.beta_min_samples.max(2) {
            return 1.0;
        }

        let r = &r[r.len() - n..];
        let b = &b[b.len() - n..];
        let mean_r = r.iter().sum::<f64>() / n as f64;
        let mean_b = b.iter().sum::<f64>() / n as f64;

        let cov = r
            .iter()
            .zip(b)
            .map(|(x, y)| (x - mean_r) * (y - mean_b))
            .sum::<f64>()
            / n as f64;
        let var = b.iter().map(|y| (y - mean_b).powi(2)).sum::<f64>() / n as f64;

        if var < self.config.beta_variance_floor {
            return 1.0;
        }

        let beta = cov / var;
        if beta.is_finite() {
            beta
        } else {
            1.0
        }
    }

    /// +1/-1 per moving average that spot is above/below.
    pub fn ma_alignment(&self, closes: &[f64], spot: f64) -> i32 {
        self.config
            .ma_periods
            .iter()
            .filter(|&&p| p > 0 && closes.len() >= p)
            .map(|&p| {
                let sma = closes[closes.len() - p..].iter().sum::<f64>() / p as f64;
                if spot > sma {
                    1
                } else if spot < sma {
                    -1
                } else {
                    0
                }
            })
            .sum()
    }
}

/// Instrument minus benchmark return over `days`, in percent.
fn return_spread(closes: &[f64], benchmark: &[f64], days: usize) -> f64 {
    match (period_return(closes, days), period_return(benchmark, days)) {
        (Some(a), Some(b)) => (a - b) * 100.0,
        _ => 0.0,
    }
}

fn period_return(closes: &[f64], days: usize) -> Option<f64> {
    if days == 0 || closes.len() <= days {
        return None;
    }
    let last = *closes.last()?;
    let base = closes[closes.len() - 1 - days];
    if base <= 0.0 {
        return None;
    }
    Some(last / base - 1.0)
}

/// Combine MA alignment and relative strength into a score in [-2, 2].
pub fn trend_score(ma_alignment: i32, rs: RelativeStrength) -> i32 {
    match (ma_alignment, rs.vote()) {
        (a, 1) if a >= 2 => 2,
        (a, _) if a >= 2 => 1,
        (a, -1) if a <= -2 => -2,
        (a, _) if a <= -2 => -1,
        _ => 0,
    }
}
