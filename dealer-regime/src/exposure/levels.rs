//! Open-interest levels: call/put walls and max pain.

use serde::{Deserialize, Serialize};

use super::profile::StrikeExposure;

/// A strike with concentrated open interest on one side of spot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub strike: f64,
    pub open_interest: u64,
}

/// Strike above spot, within `window_pct`, with the largest call open interest.
///
/// Strikes are scanned outward from spot so ties resolve to the nearer strike.
pub fn find_call_wall(rows: &[StrikeExposure], spot: f64, window_pct: f64) -> Option<Wall> {
    let upper = spot * (1.0 + window_pct / 100.0);
    let mut best: Option<Wall> = None;

    for row in rows.iter().filter(|r| r.strike > spot && r.strike <= upper) {
        if row.call_open_interest == 0 {
            continue;
        }
        if best.map_or(true, |w| row.call_open_interest > w.open_interest) {
            best = Some(Wall {
                strike: row.strike,
                open_interest: row.call_open_interest,
            });
        }
    }

    best
}

/// Strike below spot, within `window_pct`, with the largest put open interest.
pub fn find_put_wall(rows: &[StrikeExposure], spot: f64, window_pct: f64) -> Option<Wall> {
    let lower = spot * (1.0 - window_pct / 100.0);
    let mut best: Option<Wall> = None;

    for row in rows.iter().rev().filter(|r| r.strike < spot && r.strike >= lower) {
        if row.put_open_interest == 0 {
            continue;
        }
        if best.map_or(true, |w| row.put_open_interest > w.open_interest) {
            best = Some(Wall {
                strike: row.strike,
                open_interest: row.put_open_interest,
            });
        }
    }

    best
}

/// Settlement strike that minimizes total intrinsic payout to option holders.
///
/// Ties resolve to the lowest strike. Returns `None` when no open interest exists.
pub fn find_max_pain(rows: &[StrikeExposure]) -> Option<f64> {
    if rows
        .iter()
        .all(|r| r.call_open_interest == 0 && r.put_open_interest == 0)
    {
        return None;
    }

    let mut best: Option<(f64, f64)> = None;
    for settle in rows.iter().map(|r| r.strike) {
        let payout: f64 = rows
            .iter()
            .map(|r| {
                let call = (settle - r.strike).max(0.0) * r.call_open_interest as f64;
                let put = (r.strike - settle).max(0.0) * r.put_open_interest as f64;
                call + put
            })
            .sum();

        if best.map_or(true, |(_, p)| payout < p) {
            best = Some((settle, payout));
        }
    }

    best.map(|(strike, _)| strike)
}
