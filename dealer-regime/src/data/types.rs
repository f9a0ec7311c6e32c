//! Core data types for regime analysis.
//!
//! A `MarketSnapshot` is the single immutable input to one analysis: the
//! aggregated options chain, daily bars for the instrument and its
//! benchmark, and the intraday bars used by the return-structure detectors.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::technicals::TrendContext;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

/// Open interest, volume and implied vol for one listed strike of one expiry.
///
/// Several records may share a strike when the chain spans more than one
/// expiration; the exposure calculator aggregates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeRecord {
    /// Strike price
    pub strike: f64,

    /// Call open interest (contracts)
    pub call_open_interest: u64,

    /// Put open interest (contracts)
    pub put_open_interest: u64,

    /// Call volume for the session
    #[serde(default)]
    pub call_volume: u64,

    /// Put volume for the session
    #[serde(default)]
    pub put_volume: u64,

    /// Call implied volatility (annualized, decimal)
    pub call_implied_vol: f64,

    /// Put implied volatility (annualized, decimal)
    pub put_implied_vol: f64,

    /// Calendar days until this record's expiration
    pub time_to_expiry_days: f64,
}

impl StrikeRecord {
    /// Total open interest across both sides.
    pub fn total_open_interest(&self) -> u64 {
        self.call_open_interest.saturating_add(self.put_open_interest)
    }

    /// Relative distance of the strike from spot.
    pub fn moneyness(&self, spot: f64) -> f64 {
        if spot <= 0.0 {
            return f64::INFINITY;
        }
        (self.strike - spot).abs() / spot
    }
}

/// Daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: i64,
}

impl DailyBar {
    pub fn close_f64(&self) -> f64 {
        self.close.try_into().unwrap_or(0.0)
    }

    /// True range against the previous close.
    pub fn true_range(&self, prev_close: Decimal) -> Decimal {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Intraday bar; only the close is needed for return structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradayBar {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

/// Point-in-time input for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Instrument symbol (e.g., "SPY")
    pub ticker: String,

    /// Snapshot timestamp
    pub as_of: NaiveDateTime,

    /// Spot price of the underlying
    pub spot: f64,

    /// Days to the reference expiration used as the passage horizon
    pub horizon_days: f64,

    /// Options chain, one record per strike per expiry
    #[serde(default)]
    pub chain: Vec<StrikeRecord>,

    /// Instrument daily bars, oldest first
    #[serde(default)]
    pub daily_bars: Vec<DailyBar>,

    /// Benchmark daily bars, oldest first
    #[serde(default)]
    pub benchmark_bars: Vec<DailyBar>,

    /// Intraday bars for the trailing days, oldest first
    #[serde(default)]
    pub intraday_bars: Vec<IntradayBar>,

    /// Precomputed trend context; derived from the daily bars when absent
    #[serde(default)]
    pub trend: Option<TrendContext>,

    /// Account equity for converting the sizing fraction to capital
    #[serde(default)]
    pub account_equity: Option<Decimal>,
}

impl MarketSnapshot {
    /// Whether the snapshot carries a usable options chain.
    pub fn has_chain(&self) -> bool {
        self.spot > 0.0 && self.chain.iter().any(|r| r.total_open_interest() > 0)
    }
}
