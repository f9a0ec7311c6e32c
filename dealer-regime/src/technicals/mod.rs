//! Trend, relative-strength and volatility inputs.
//!
//! Provides:
//! - Trailing beta against a benchmark
//! - Moving-average alignment and relative-strength labels
//! - Average true range and realized volatility

pub mod trend;
pub mod volatility;

pub use trend::{trend_score, RelativeStrength, TrendAnalyzer, TrendConfig, TrendContext};
pub use volatility::{average_true_range, iv_rv_ratio, realized_volatility, simple_returns};
