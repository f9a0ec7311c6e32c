//! Return-structure and concentration regimes.
//!
//! Provides:
//! - Lag-1 intraday autocorrelation: long gamma (fading) vs short gamma (trending)
//! - Phase transition: share of recent amplified sessions vs a critical level
//! - Self-excitation: clustering of same-direction bursts
//! - Positional entropy: how concentrated near-the-money exposure is

pub mod autocorrelation;
pub mod entropy;
pub mod phase;
pub mod self_excitation;

pub use autocorrelation::{
    AutocorrelationConfig, AutocorrelationDetector, AutocorrelationRegime, AutocorrelationResult,
    DailyAutocorrelation, RegimeStability,
};
pub use entropy::{EntropyConfig, EntropyEstimator, EntropyRegime, EntropyResult, StrikeShare};
pub use phase::{PhaseRegime, PhaseTransitionConfig, PhaseTransitionDetector, PhaseTransitionResult};
pub use self_excitation::{
    SelfExcitationConfig, SelfExcitationIndex, SelfExcitationRegime, SelfExcitationResult,
};
