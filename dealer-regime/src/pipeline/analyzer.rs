//! Regime analyzer.
//!
//! Runs every component over one snapshot in dependency order:
//! trend -> exposure -> flow / autocorrelation / phase / self-excitation /
//! entropy -> first passage -> thesis. Snapshots are independent, so batches run
//! in parallel.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analytics::{FirstPassageEstimator, LevelArrival, NamedLevel};
use crate::config::{AnalysisConfig, ConfigError};
use crate::data::MarketSnapshot;
use crate::exposure::{ExposureCalculator, ExposureProfile};
use crate::flow::{FlowPressureEstimator, FlowPressureResult};
use crate::regime::{
    AutocorrelationDetector, AutocorrelationResult, EntropyEstimator, EntropyResult, PhaseTransitionDetector,
    PhaseTransitionResult, SelfExcitationIndex, SelfExcitationResult,
};
use crate::technicals::{TrendAnalyzer, TrendContext};
use crate::thesis::{Thesis, ThesisEngine, ThesisInputs};

/// Everything produced for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub ticker: String,
    pub as_of: NaiveDateTime,
    pub spot: f64,
    pub config_version: u32,
    pub exposure: ExposureProfile,
    pub flow: FlowPressureResult,
    pub trend: TrendContext,
    pub autocorrelation: AutocorrelationResult,
    pub phase_transition: PhaseTransitionResult,
    pub self_excitation: SelfExcitationResult,
    pub entropy: EntropyResult,
    /// Sorted by adjusted expected days.
    pub arrivals: Vec<LevelArrival>,
    pub thesis: Thesis,
}

impl AnalysisReport {
    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} @ {:.2}: {:?} {:?} ({:?}, {:?} confidence) wall break {:.0}% size {:.2}%",
            self.ticker,
            self.spot,
            self.thesis.label,
            self.thesis.direction,
            self.thesis.strength,
            self.thesis.confidence,
            self.thesis.wall_break_probability,
            self.thesis.sizing_fraction * 100.0,
        )
    }
}

/// Runs the full regime pipeline.
pub struct RegimeAnalyzer {
    config: AnalysisConfig,
    exposure: ExposureCalculator,
    flow: FlowPressureEstimator,
    trend: TrendAnalyzer,
    autocorrelation: AutocorrelationDetector,
    phase: PhaseTransitionDetector,
    self_excitation: SelfExcitationIndex,
    entropy: EntropyEstimator,
    first_passage: FirstPassageEstimator,
    thesis: ThesisEngine,
}

impl RegimeAnalyzer {
    /// Validates the configuration before building any component.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            exposure: ExposureCalculator::new(config.exposure.clone()),
            flow: FlowPressureEstimator::new(config.flow.clone()),
            trend: TrendAnalyzer::new(config.trend.clone()),
            autocorrelation: AutocorrelationDetector::new(config.autocorrelation.clone()),
            phase: PhaseTransitionDetector::new(config.phase.clone()),
            self_excitation: SelfExcitationIndex::new(config.self_excitation.clone()),
            entropy: EntropyEstimator::new(config.entropy.clone()),
            first_passage: FirstPassageEstimator::new(config.first_passage.clone()),
            thesis: ThesisEngine::new(
                config.thesis.clone(),
                config.direction.clone(),
                config.wall_break.clone(),
                config.sizing.clone(),
            ),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one snapshot. Missing or degenerate inputs degrade to neutral
    /// component defaults rather than failing.
    pub fn analyze(&self, snapshot: &MarketSnapshot) -> AnalysisReport {
        let spot = snapshot.spot;
        let horizon = snapshot.horizon_days;
        if !snapshot.has_chain() {
            warn!(ticker = %snapshot.ticker, spot, "No usable options chain, exposure falls back to neutral defaults");
        }

        let trend = match &snapshot.trend {
            Some(trend) => trend.clone(),
            None => self.trend.analyze(&snapshot.daily_bars, &snapshot.benchmark_bars, spot),
        };

        let exposure = self.exposure.calculate(&snapshot.chain, spot);
        let flow = self.flow.estimate(&exposure, &snapshot.chain, trend.beta);
        let autocorrelation = self.autocorrelation.detect(&snapshot.intraday_bars);
        let phase_transition = self
            .phase
            .detect(&self.autocorrelation.daily_series(&snapshot.intraday_bars));
        let self_excitation = self.self_excitation.detect(&snapshot.intraday_bars);
        let entropy = self.entropy.estimate(&exposure);

        let levels = key_levels(&exposure);
        let arrivals = self.first_passage.estimate(
            spot,
            &levels,
            trend.atr,
            flow.regime,
            autocorrelation.regime,
            horizon,
        );

        let call_wall = exposure.call_wall.map(|w| w.strike);
        let put_wall = exposure.put_wall.map(|w| w.strike);
        let thesis = self.thesis.evaluate(&ThesisInputs {
            profile: &exposure,
            flow: &flow,
            autocorrelation: &autocorrelation,
            phase: &phase_transition,
            self_excitation: &self_excitation,
            entropy: &entropy,
            trend: &trend,
            call_wall_collision: self.first_passage.collision_probability(spot, call_wall, trend.atr, horizon),
            put_wall_collision: self.first_passage.collision_probability(spot, put_wall, trend.atr, horizon),
            account_equity: snapshot.account_equity,
        });

        debug!(ticker = %snapshot.ticker, levels = arrivals.len(), "Analyzed snapshot");

        AnalysisReport {
            ticker: snapshot.ticker.clone(),
            as_of: snapshot.as_of,
            spot,
            config_version: self.config.version,
            exposure,
            flow,
            trend,
            autocorrelation,
            phase_transition,
            self_excitation,
            entropy,
            arrivals,
            thesis,
        }
    }

    /// Analyze independent snapshots in parallel, preserving input order.
    pub fn analyze_batch(&self, snapshots: &[MarketSnapshot]) -> Vec<AnalysisReport> {
        info!("Analyzing {} snapshots", snapshots.len());
        snapshots.par_iter().map(|s| self.analyze(s)).collect()
    }
}

/// Levels tracked by the first-passage estimator.
fn key_levels(profile: &ExposureProfile) -> Vec<NamedLevel> {
    let channel = profile.channel.as_ref();
    vec![
        NamedLevel::new("call_wall", profile.call_wall.map(|w| w.strike)),
        NamedLevel::new("put_wall", profile.put_wall.map(|w| w.strike)),
        NamedLevel::new("flip_point", profile.flip_point),
        NamedLevel::new("max_pain", profile.max_pain),
        NamedLevel::new("abs_gamma_strike", profile.abs_gamma_strike),
        NamedLevel::new("channel_floor", channel.map(|c| c.floor)),
        NamedLevel::new("channel_ceiling", channel.map(|c| c.ceiling)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DailyBar, IntradayBar, StrikeRecord};
    use crate::regime::autocorrelation::tests::{choppy, session, trending};
    use crate::regime::{AutocorrelationRegime, PhaseRegime};
    use crate::thesis::{Direction, ThesisLabel};
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(strike: f64, call_oi: u64, put_oi: u64) -> StrikeRecord {
        StrikeRecord {
            strike,
            call_open_interest: call_oi,
            put_open_interest: put_oi,
            call_volume: call_oi / 10,
            put_volume: put_oi / 10,
            call_implied_vol: 0.25,
            put_implied_vol: 0.25,
            time_to_expiry_days: 14.0,
        }
    }

    fn daily_bars(n: usize, start: f64, step: f64) -> Vec<DailyBar> {
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let close = start + step * i as f64;
                let close_dec = Decimal::try_from(close).unwrap().round_dp(4);
                DailyBar {
                    date: first + Duration::days(i as i64),
                    open: close_dec,
                    high: close_dec + dec!(1),
                    low: close_dec - dec!(1),
                    close: close_dec,
                    volume: 1_000_000,
                }
            })
            .collect()
    }

    fn intraday(returns: fn(usize) -> Vec<f64>) -> Vec<IntradayBar> {
        (4..9).flat_map(|day| session(day, &returns(40))).collect()
    }

    fn snapshot(ticker: &str, intraday_bars: Vec<IntradayBar>) -> MarketSnapshot {
        let chain = vec![
            record(90.0, 200, 3000),
            record(95.0, 500, 2500),
            record(100.0, 2000, 2000),
            record(105.0, 3000, 400),
            record(110.0, 1500, 100),
        ];
        MarketSnapshot {
            ticker: ticker.to_string(),
            as_of: NaiveDate::from_ymd_opt(2024, 3, 8)
                .unwrap()
                .and_hms_opt(16, 0, 0)
                .unwrap(),
            spot: 100.0,
            horizon_days: 10.0,
            chain,
            daily_bars: daily_bars(80, 80.0, 0.25),
            benchmark_bars: daily_bars(80, 400.0, 0.5),
            intraday_bars,
            trend: None,
            account_equity: Some(dec!(50000)),
        }
    }

    fn analyzer() -> RegimeAnalyzer {
        RegimeAnalyzer::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let a = analyzer();
        let snap = snapshot("SPY", intraday(trending));
        assert_eq!(a.analyze(&snap), a.analyze(&snap));
    }

    #[test]
    fn test_report_is_populated() {
        let report = analyzer().analyze(&snapshot("SPY", intraday(trending)));

        assert_eq!(report.ticker, "SPY");
        assert_eq!(report.config_version, 1);
        assert_eq!(report.exposure.strikes.len(), 5);
        assert_eq!(report.exposure.call_wall.map(|w| w.strike), Some(105.0));
        assert_eq!(report.exposure.put_wall.map(|w| w.strike), Some(90.0));
        assert_eq!(report.autocorrelation.regime, AutocorrelationRegime::ShortGamma);
        assert!(report.trend.atr > 0.0);
        assert!(!report.arrivals.is_empty());
        for pair in report.arrivals.windows(2) {
            assert!(pair[0].expected_days_adjusted <= pair[1].expected_days_adjusted);
        }

        let thesis = &report.thesis;
        assert!(thesis.wall_break_probability >= 5.0 && thesis.wall_break_probability <= 95.0);
        assert!(thesis.sizing_fraction >= 0.0 && thesis.sizing_fraction <= 0.05);
        assert_eq!(thesis.wall_break.steps.len(), 7);
        if thesis.sizing_fraction > 0.0 {
            assert!(thesis.sizing.risk_capital.is_some());
        }
    }

    #[test]
    fn test_choppy_session_is_long_gamma() {
        let report = analyzer().analyze(&snapshot("QQQ", intraday(choppy)));
        assert_eq!(report.autocorrelation.regime, AutocorrelationRegime::LongGamma);
        assert!(report.autocorrelation.mean_lag1 < 0.0);
    }

    #[test]
    fn test_empty_snapshot_is_neutral() {
        let snap = MarketSnapshot {
            chain: Vec::new(),
            daily_bars: Vec::new(),
            benchmark_bars: Vec::new(),
            ..snapshot("IWM", Vec::new())
        };
        let report = analyzer().analyze(&snap);

        assert!(report.exposure.is_empty());
        assert!(report.arrivals.is_empty());
        assert_eq!(report.thesis.label, ThesisLabel::Neutral);
        assert_eq!(report.thesis.direction, Direction::Neutral);
        assert_eq!(report.thesis.sizing_fraction, 0.0);
        assert_eq!(report.phase_transition.regime, PhaseRegime::Unknown);
    }

    #[test]
    fn test_phase_transition_tracks_amplified_sessions() {
        let a = analyzer();

        let trending = a.analyze(&snapshot("SPY", intraday(trending)));
        assert_eq!(trending.phase_transition.window, 5);
        assert_eq!(trending.phase_transition.amplified_days, 5);
        assert_eq!(trending.phase_transition.regime, PhaseRegime::Turbulent);
        let step = trending
            .thesis
            .wall_break
            .steps
            .iter()
            .find(|s| s.name == "phase_transition")
            .unwrap();
        assert_eq!(step.after - step.before, 10.0);

        let choppy = a.analyze(&snapshot("QQQ", intraday(choppy)));
        assert_eq!(choppy.phase_transition.amplified_days, 0);
        assert_eq!(choppy.phase_transition.regime, PhaseRegime::Laminar);
    }

    #[test]
    fn test_precomputed_trend_wins() {
        let trend = TrendContext {
            beta: 2.0,
            atr: 3.0,
            ..Default::default()
        };
        let snap = MarketSnapshot {
            trend: Some(trend.clone()),
            ..snapshot("SPY", intraday(trending))
        };
        let report = analyzer().analyze(&snap);
        assert_eq!(report.trend, trend);
        assert_eq!(report.flow.beta, 2.0);
    }

    #[test]
    fn test_batch_preserves_order() {
        let snaps = vec![
            snapshot("SPY", intraday(trending)),
            snapshot("QQQ", intraday(choppy)),
            snapshot("IWM", Vec::new()),
        ];
        let a = analyzer();
        let reports = a.analyze_batch(&snaps);

        let tickers: Vec<&str> = reports.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["SPY", "QQQ", "IWM"]);
        for (snap, report) in snaps.iter().zip(&reports) {
            assert_eq!(report, &a.analyze(snap));
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.flow.laminar_below = 2.0;
        assert!(matches!(RegimeAnalyzer::new(config), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_report_serializes() {
        let report = analyzer().analyze(&snapshot("SPY", intraday(trending)));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"ticker\":\"SPY\""));
        assert!(report.summary().starts_with("SPY @ 100.00"));
    }
}
