//! Price volatility measures: returns, average true range, realized vol.

use rust_decimal::Decimal;

use crate::data::DailyBar;

const TRADING_DAYS: f64 = 252.0;

/// Simple bar-to-bar returns. A non-positive prior close yields a zero return.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Mean of the last `period` true ranges, in price units.
///
/// Uses whatever history exists when fewer than `period` ranges are
/// available; returns 0.0 with fewer than two bars.
pub fn average_true_range(bars: &[DailyBar], period: usize) -> f64 {
    if bars.len() < 2 || period == 0 {
        return 0.0;
    }

    let ranges: Vec<Decimal> = bars
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();
    let take = ranges.len().min(period);
    let sum: Decimal = ranges[ranges.len() - take..].iter().sum();

    let atr: f64 = (sum / Decimal::from(take)).try_into().unwrap_or(0.0);
    atr.max(0.0)
}

/// Annualized standard deviation of trailing daily log returns.
pub fn realized_volatility(closes: &[f64], window: usize, min_closes: usize) -> Option<f64> {
    if closes.len() < min_closes.max(2) || closes.iter().any(|&c| c <= 0.0) {
        return None;
    }

    let log_returns: Vec<f64> = closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let n = log_returns.len().min(window.max(1));
    let tail = &log_returns[log_returns.len() - n..];

    let mean = tail.iter().sum::<f64>() / n as f64;
    let var = tail.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64;
    Some(var.sqrt() * TRADING_DAYS.sqrt())
}

/// Implied over realized volatility; 1.0 when either side is unusable.
pub fn iv_rv_ratio(implied: Option<f64>, realized: Option<f64>) -> f64 {
    match (implied, realized) {
        (Some(iv), Some(rv)) if iv > 0.0 && rv > 0.01 => iv / rv,
        _ => 1.0,
    }
}
