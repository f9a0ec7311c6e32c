//! Self-excitation index.
//!
//! Measures how strongly same-direction return bursts cluster. Hedging
//! feedback makes one large move trigger the next, which shows up as long,
//! intense runs of same-sign bars above a move threshold.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::IntradayBar;
use crate::technicals::simple_returns;

/// Self-excitation configuration.
///
/// Cluster scores are `size * sum(|r|) * score_scale`; the regime cutoffs
/// apply to the mean score and are calibrated against that scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfExcitationConfig {
    /// Absolute return a bar must exceed to qualify.
    pub move_threshold: f64,
    /// Fewer returns than this yields no signal.
    pub min_returns: usize,
    /// Clusters smaller than this are discarded.
    pub min_cluster_size: usize,
    pub score_scale: f64,
    pub high_above: f64,
    pub moderate_above: f64,
    pub low_above: f64,
}

impl Default for SelfExcitationConfig {
    fn default() -> Self {
        Self {
            move_threshold: 0.001, // 0.1%
            min_returns: 20,
            min_cluster_size: 2,
            score_scale: 10_000.0,
            high_above: 150.0,
            moderate_above: 80.0,
            low_above: 40.0,
        }
    }
}

/// Clustering intensity regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SelfExcitationRegime {
    None,
    Low,
    Moderate,
    High,
}

impl SelfExcitationRegime {
    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No return clustering",
            Self::Low => "Occasional clustered moves",
            Self::Moderate => "Clustered moves feeding on each other",
            Self::High => "Strong feedback between moves",
        }
    }
}

/// Output of the self-excitation index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfExcitationResult {
    pub index: f64,
    pub cluster_count: usize,
    pub avg_cluster_size: f64,
    pub max_cluster_size: usize,
    /// Bars whose move exceeded the threshold.
    pub total_events: usize,
    pub regime: SelfExcitationRegime,
}

impl SelfExcitationResult {
    pub fn none() -> Self {
        Self {
            index: 0.0,
            cluster_count: 0,
            avg_cluster_size: 0.0,
            max_cluster_size: 0,
            total_events: 0,
            regime: SelfExcitationRegime::None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Cluster {
    sign: f64,
    size: usize,
    intensity: f64,
}

/// Computes the self-excitation index from a return series.
pub struct SelfExcitationIndex {
    config: SelfExcitationConfig,
}

impl SelfExcitationIndex {
    pub fn new(config: SelfExcitationConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, index: f64) -> SelfExcitationRegime {
        if index > self.config.high_above {
            SelfExcitationRegime::High
        } else if index > self.config.moderate_above {
            SelfExcitationRegime::Moderate
        } else if index > self.config.low_above {
            SelfExcitationRegime::Low
        } else {
            SelfExcitationRegime::None
        }
    }

    /// Index over the concatenated intraday close series.
    pub fn detect(&self, bars: &[IntradayBar]) -> SelfExcitationResult {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        self.from_returns(&simple_returns(&closes))
    }

    pub fn from_returns(&self, returns: &[f64]) -> SelfExcitationResult {
        if returns.len() < self.config.min_returns {
            debug!(returns = returns.len(), "Too few returns for self-excitation");
            return SelfExcitationResult::none();
        }

        let mut clusters: Vec<Cluster> = Vec::new();
        let mut current: Option<Cluster> = None;
        let mut total_events = 0;

        for &r in returns {
            if !r.is_finite() || r.abs() <= self.config.move_threshold {
                self.close(&mut current, &mut clusters);
                continue;
            }

            total_events += 1;
            let sign = r.signum();
            match current.as_mut() {
                Some(c) if c.sign == sign => {
                    c.size += 1;
                    c.intensity += r.abs();
                }
                _ => {
                    self.close(&mut current, &mut clusters);
                    current = Some(Cluster {
                        sign,
                        size: 1,
                        intensity: r.abs(),
                    });
                }
            }
        }
        self.close(&mut current, &mut clusters);

        if clusters.is_empty() {
            return SelfExcitationResult {
                total_events,
                ..SelfExcitationResult::none()
            };
        }

        let cluster_count = clusters.len();
        let index = clusters
            .iter()
            .map(|c| c.size as f64 * c.intensity * self.config.score_scale)
            .sum::<f64>()
            / cluster_count as f64;
        let avg_cluster_size = clusters.iter().map(|c| c.size).sum::<usize>() as f64 / cluster_count as f64;
        let max_cluster_size = clusters.iter().map(|c| c.size).max().unwrap_or(0);
        let regime = self.classify(index);

        debug!(index, cluster_count, ?regime, "Computed self-excitation index");

        SelfExcitationResult {
            index,
            cluster_count,
            avg_cluster_size,
            max_cluster_size,
            total_events,
            regime,
        }
    }

    fn close(&self, current: &mut Option<Cluster>, clusters: &mut Vec<Cluster>) {
        if let Some(c) = current.take() {
            if c.size >= self.config.min_cluster_size {
                clusters.push(c);
            }
        }
    }
}
