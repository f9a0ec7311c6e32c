//! Gamma channel extraction.
//!
//! The channel is the band between the nearest strikes on either side of
//! spot that still carry meaningful positive dealer gamma. Dealers hedging
//! those strikes lean against moves, so price tends to stay inside.

use serde::{Deserialize, Serialize};

use super::profile::StrikeExposure;

/// Channel extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Minimum net exposure, as a share of the largest |net|, for a boundary strike.
    pub min_share: f64,
    /// Share used on |net| when no strike passes `min_share`. The fallback
    /// boundary is the strongest qualifying strike on that side, not the nearest.
    pub fallback_share: f64,
    /// Channels narrower than this (% of spot) are degenerate.
    pub min_width_pct: f64,
    /// Width (% of spot) a degenerate channel is widened to, centered on spot.
    pub fallback_width_pct: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            min_share: 0.15,
            fallback_share: 0.10,
            min_width_pct: 1.0,
            fallback_width_pct: 2.0,
        }
    }
}

/// Support/resistance band implied by dealer gamma.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub floor: f64,
    pub ceiling: f64,
    /// Width as a percentage of spot.
    pub width_pct: f64,
    /// Where spot sits in the band: 0 at the floor, 1 at the ceiling.
    pub position: f64,
    /// True when the band had to be widened around spot.
    pub degenerate: bool,
}

/// Extract the channel from a profile sorted by ascending strike.
pub fn extract_channel(rows: &[StrikeExposure], spot: f64, config: &ChannelConfig) -> Option<Channel> {
    if rows.is_empty() || spot <= 0.0 {
        return None;
    }

    let max_abs = rows.iter().map(|r| r.net_exposure.abs()).fold(0.0, f64::max);
    if max_abs <= 0.0 {
        return None;
    }

    let primary = config.min_share * max_abs;
    let fallback = config.fallback_share * max_abs;

    let floor = nearest_below(rows, spot, |r| r.net_exposure >= primary)
        .or_else(|| strongest(rows.iter().filter(|r| r.strike < spot), spot, fallback));
    let ceiling = nearest_above(rows, spot, |r| r.net_exposure >= primary)
        .or_else(|| strongest(rows.iter().filter(|r| r.strike > spot), spot, fallback));

    let half_width = spot * config.fallback_width_pct / 200.0;
    let (floor, ceiling, degenerate) = match (floor, ceiling) {
        (Some(f), Some(c)) if (c - f) / spot * 100.0 >= config.min_width_pct => (f, c, false),
        (f, c) => (
            f.unwrap_or(spot).min(spot - half_width),
            c.unwrap_or(spot).max(spot + half_width),
            true,
        ),
    };

    let width = ceiling - floor;
    let position = if width > 0.0 {
        ((spot - floor) / width).clamp(0.0, 1.0)
    } else {
        0.5
    };

    Some(Channel {
        floor,
        ceiling,
        width_pct: width / spot * 100.0,
        position,
        degenerate,
    })
}

fn nearest_below<F>(rows: &[StrikeExposure], spot: f64, pred: F) -> Option<f64>
where
    F: Fn(&StrikeExposure) -> bool,
{
    rows.iter()
        .rev()
        .filter(|r| r.strike < spot)
        .find(|r| pred(r))
        .map(|r| r.strike)
}

fn nearest_above<F>(rows: &[StrikeExposure], spot: f64, pred: F) -> Option<f64>
where
    F: Fn(&StrikeExposure) -> bool,
{
    rows.iter()
        .filter(|r| r.strike > spot)
        .find(|r| pred(r))
        .map(|r| r.strike)
}

/// Largest |net| strike at or above `min_abs`; ties go to the strike nearer spot.
fn strongest<'a, I>(rows: I, spot: f64, min_abs: f64) -> Option<f64>
where
    I: Iterator<Item = &'a StrikeExposure>,
{
    rows.filter(|r| r.net_exposure.abs() >= min_abs)
        .fold(None, |best: Option<&StrikeExposure>, r| match best {
            Some(b)
                if b.net_exposure.abs() > r.net_exposure.abs()
                    || (b.net_exposure.abs() == r.net_exposure.abs()
                        && (b.strike - spot).abs() <= (r.strike - spot).abs()) =>
            {
                Some(b)
            }
            _ => Some(r),
        })
        .map(|r| r.strike)
}
