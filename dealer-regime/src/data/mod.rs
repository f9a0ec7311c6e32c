//! Snapshot input types and the JSON file boundary.

pub mod loader;
pub mod types;

pub use loader::{LoaderError, SnapshotLoader};
pub use types::{DailyBar, IntradayBar, MarketSnapshot, OptionType, StrikeRecord};
