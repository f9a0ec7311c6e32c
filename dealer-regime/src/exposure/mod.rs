//! Dealer gamma exposure module.
//!
//! Provides:
//! - Black-Scholes gamma, charm and vanna
//! - Per-strike dealer exposure and the gamma flip point
//! - Call/put walls, max pain and the gamma channel

pub mod black_scholes;
pub mod channel;
pub mod levels;
pub mod profile;

pub use black_scholes::BlackScholes;
pub use channel::{extract_channel, Channel, ChannelConfig};
pub use levels::{find_call_wall, find_max_pain, find_put_wall, Wall};
pub use profile::{
    find_flip_point, ExposureCalculator, ExposureConfig, ExposureProfile, GammaRegime, StrikeExposure,
};
