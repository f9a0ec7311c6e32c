//! Analysis configuration.
//!
//! Every calibration threshold lives here rather than in the components, so
//! a run can be reproduced from its TOML file and thresholds can be swept
//! in tests. Sections omitted from the file take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::FirstPassageConfig;
use crate::exposure::ExposureConfig;
use crate::flow::FlowPressureConfig;
use crate::regime::{AutocorrelationConfig, EntropyConfig, PhaseTransitionConfig, SelfExcitationConfig};
use crate::technicals::TrendConfig;
use crate::thesis::{DirectionConfig, SizingConfig, ThesisConfig, WallBreakConfig};

/// Schema version this build understands.
pub const CONFIG_VERSION: u32 = 1;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Unsupported config version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Full calibration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub version: u32,
    pub exposure: ExposureConfig,
    pub flow: FlowPressureConfig,
    pub trend: TrendConfig,
    pub autocorrelation: AutocorrelationConfig,
    pub phase: PhaseTransitionConfig,
    pub self_excitation: SelfExcitationConfig,
    pub entropy: EntropyConfig,
    pub first_passage: FirstPassageConfig,
    pub thesis: ThesisConfig,
    pub direction: DirectionConfig,
    pub wall_break: WallBreakConfig,
    pub sizing: SizingConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            exposure: ExposureConfig::default(),
            flow: FlowPressureConfig::default(),
            trend: TrendConfig::default(),
            autocorrelation: AutocorrelationConfig::default(),
            phase: PhaseTransitionConfig::default(),
            self_excitation: SelfExcitationConfig::default(),
            entropy: EntropyConfig::default(),
            first_passage: FirstPassageConfig::default(),
            thesis: ThesisConfig::default(),
            direction: DirectionConfig::default(),
            wall_break: WallBreakConfig::default(),
            sizing: SizingConfig::default(),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    AnalysisConfig::from_toml_str(&content)
}

fn check(ok: bool, message: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(message()))
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                expected: CONFIG_VERSION,
            });
        }

        // Exposure
        let e = &self.exposure;
        check(e.contract_multiplier > 0.0, || {
            format!("exposure.contract_multiplier must be > 0, got {}", e.contract_multiplier)
        })?;
        check(e.iv_floor > 0.0 && e.iv_fallback > 0.0, || {
            format!("exposure iv_floor/iv_fallback must be > 0, got {}/{}", e.iv_floor, e.iv_fallback)
        })?;
        check(e.min_time_years > 0.0, || {
            format!("exposure.min_time_years must be > 0, got {}", e.min_time_years)
        })?;
        check(e.wall_window_pct > 0.0, || {
            format!("exposure.wall_window_pct must be > 0, got {}", e.wall_window_pct)
        })?;
        let c = &e.channel;
        check(
            c.min_share > 0.0 && c.min_share <= 1.0 && c.fallback_share > 0.0 && c.fallback_share <= 1.0,
            || format!("channel shares must be in (0, 1], got {}/{}", c.min_share, c.fallback_share),
        )?;
        check(c.min_width_pct >= 0.0 && c.fallback_width_pct >= 0.0, || {
            "channel widths cannot be negative".to_string()
        })?;

        // Flow pressure
        let f = &self.flow;
        check(f.laminar_below <= f.turbulent_above, || {
            format!(
                "flow.laminar_below ({}) must not exceed flow.turbulent_above ({})",
                f.laminar_below, f.turbulent_above
            )
        })?;
        check(f.beta_floor > 0.0, || format!("flow.beta_floor must be > 0, got {}", f.beta_floor))?;
        check(f.ratio_cap > 0.0, || format!("flow.ratio_cap must be > 0, got {}", f.ratio_cap))?;
        check(f.atm_tolerance > 0.0, || {
            format!("flow.atm_tolerance must be > 0, got {}", f.atm_tolerance)
        })?;

        // Trend
        let t = &self.trend;
        check(t.beta_window >= 2 && t.beta_min_samples >= 2, || {
            format!("trend beta_window/beta_min_samples must be >= 2, got {}/{}", t.beta_window, t.beta_min_samples)
        })?;
        check(t.atr_period > 0, || "trend.atr_period must be > 0".to_string())?;
        check(t.ma_periods.iter().all(|&p| p > 0), || {
            "trend.ma_periods cannot contain 0".to_string()
        })?;

        // Autocorrelation
        let a = &self.autocorrelation;
        check(a.trailing_days > 0, || "autocorrelation.trailing_days must be > 0".to_string())?;
        check(a.min_bars_per_day >= 3, || {
            format!("autocorrelation.min_bars_per_day must be >= 3, got {}", a.min_bars_per_day)
        })?;
        check(a.dampened_below <= a.amplified_above, || {
            format!(
                "autocorrelation.dampened_below ({}) must not exceed amplified_above ({})",
                a.dampened_below, a.amplified_above
            )
        })?;

        // Phase transition
        let ph = &self.phase;
        check(ph.window > 0, || "phase.window must be > 0".to_string())?;
        check(ph.threshold_pct > 0.0 && ph.threshold_pct <= 100.0, || {
            format!("phase.threshold_pct must be in (0, 100], got {}", ph.threshold_pct)
        })?;
        check(ph.approaching_fraction > 0.0 && ph.approaching_fraction <= 1.0, || {
            format!("phase.approaching_fraction must be in (0, 1], got {}", ph.approaching_fraction)
        })?;

        // Self-excitation
        let s = &self.self_excitation;
        check(s.score_scale > 0.0, || {
            format!("self_excitation.score_scale must be > 0, got {}", s.score_scale)
        })?;
        check(s.low_above <= s.moderate_above && s.moderate_above <= s.high_above, || {
            format!(
                "self_excitation cutoffs must be ordered low <= moderate <= high, got {}/{}/{}",
                s.low_above, s.moderate_above, s.high_above
            )
        })?;
        check(s.min_cluster_size >= 1 && s.move_threshold >= 0.0, || {
            "self_excitation min_cluster_size must be >= 1 and move_threshold >= 0".to_string()
        })?;

        // Entropy
        let n = &self.entropy;
        check(
            n.critical_below <= n.approaching_below && n.approaching_below <= n.moderate_below,
            || {
                format!(
                    "entropy cutoffs must be ordered critical <= approaching <= moderate, got {}/{}/{}",
                    n.critical_below, n.approaching_below, n.moderate_below
                )
            },
        )?;
        check(n.min_strikes >= 2, || format!("entropy.min_strikes must be >= 2, got {}", n.min_strikes))?;
        check(n.atm_window_pct > 0.0, || {
            format!("entropy.atm_window_pct must be > 0, got {}", n.atm_window_pct)
        })?;

        // First passage
        let p = &self.first_passage;
        check(
            0.0 <= p.probability_floor && p.probability_floor < p.probability_cap && p.probability_cap <= 1.0,
            || {
                format!(
                    "first_passage probability bounds must satisfy 0 <= floor < cap <= 1, got {}/{}",
                    p.probability_floor, p.probability_cap
                )
            },
        )?;
        check(p.collision_floor < p.collision_cap, || {
            "first_passage.collision_floor must be below collision_cap".to_string()
        })?;
        check(
            p.turbulent_multiplier > 0.0 && p.transitional_multiplier > 0.0 && p.long_gamma_multiplier > 0.0,
            || "first_passage regime multipliers must be > 0".to_string(),
        )?;

        // Thesis
        check(self.thesis.fade_moves_below <= self.thesis.fade_mild_below, || {
            format!(
                "thesis.fade_moves_below ({}) must not exceed fade_mild_below ({})",
                self.thesis.fade_moves_below, self.thesis.fade_mild_below
            )
        })?;

        // Wall break
        let w = &self.wall_break;
        check(
            0.0 <= w.min_probability && w.min_probability <= w.max_probability && w.max_probability <= 100.0,
            || {
                format!(
                    "wall_break bounds must be 0-100 with min <= max, got {}/{}",
                    w.min_probability, w.max_probability
                )
            },
        )?;

        // Sizing
        let z = &self.sizing;
        check(
            0.0 <= z.min_fraction && z.min_fraction <= z.max_fraction && z.max_fraction <= 1.0,
            || {
                format!(
                    "sizing fractions must satisfy 0 <= min <= max <= 1, got {}/{}",
                    z.min_fraction, z.max_fraction
                )
            },
        )?;
        check(z.kelly_multiplier > 0.0, || {
            format!("sizing.kelly_multiplier must be > 0, got {}", z.kelly_multiplier)
        })?;
        check(z.max_win_probability > 0.0 && z.max_win_probability < 1.0, || {
            format!("sizing.max_win_probability must be in (0, 1), got {}", z.max_win_probability)
        })?;
        check(z.min_payoff_ratio > 0.0, || {
            format!("sizing.min_payoff_ratio must be > 0, got {}", z.min_payoff_ratio)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AnalysisConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = AnalysisConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
[flow]
turbulent_above = 1.2

[self_excitation]
high_above = 200.0
"#,
        )
        .unwrap();
        assert_eq!(config.flow.turbulent_above, 1.2);
        assert_eq!(config.flow.laminar_below, 0.7);
        assert_eq!(config.self_excitation.high_above, 200.0);
        assert_eq!(config.entropy, EntropyConfig::default());
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"version = 1\n\n[sizing]\nmax_fraction = 0.03\n").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.sizing.max_fraction, 0.03);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_parse_error() {
        let result = AnalysisConfig::from_toml_str("[flow\nturbulent_above = ");
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unsupported_version() {
        let result = AnalysisConfig::from_toml_str("version = 7\n");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::UnsupportedVersion { found: 7, expected: 1 }
        ));
    }

    #[test]
    fn test_inverted_flow_bands_rejected() {
        let result = AnalysisConfig::from_toml_str("[flow]\nlaminar_below = 1.5\nturbulent_above = 1.0\n");
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_unordered_cutoffs_rejected() {
        let mut config = AnalysisConfig::default();
        config.self_excitation.moderate_above = 200.0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = AnalysisConfig::default();
        config.entropy.critical_below = 0.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_phase_bounds_rejected() {
        let config = AnalysisConfig::from_toml_str("[phase]\nthreshold_pct = 20.0\n").unwrap();
        assert_eq!(config.phase.threshold_pct, 20.0);
        assert_eq!(config.phase.window, 20);

        let result = AnalysisConfig::from_toml_str("[phase]\napproaching_fraction = 1.5\n");
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));

        let mut config = AnalysisConfig::default();
        config.phase.window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sizing_bounds_rejected() {
        let mut config = AnalysisConfig::default();
        config.sizing.min_fraction = 0.1;
        assert!(config.validate().is_err());
    }
}
