//! Black-Scholes sensitivities used for dealer exposure.
//!
//! Only the second-order terms matter for positioning: gamma drives the
//! exposure profile, charm and vanna describe how dealer delta drifts with
//! time and volatility.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

use crate::data::OptionType;

/// Black-Scholes calculator with a constant risk-free rate.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Risk-free interest rate
    pub rate: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self {
            rate: 0.05, // 5% risk-free rate
        }
    }
}

impl BlackScholes {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Calculate d1 parameter.
    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let numerator = (spot / strike).ln() + (self.rate + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    /// Calculate d2 parameter.
    fn d2(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        self.d1(spot, strike, time, vol) - vol * time.sqrt()
    }

    /// Standard normal CDF.
    pub fn norm_cdf(x: f64) -> f64 {
        0.5 * erfc(-x / SQRT_2)
    }

    /// Standard normal PDF.
    pub fn norm_pdf(x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }

    fn is_degenerate(spot: f64, strike: f64, time: f64, vol: f64) -> bool {
        !(spot > 0.0 && strike > 0.0 && time > 0.0 && vol > 0.0)
    }

    /// Calculate gamma (same for calls and puts).
    pub fn gamma(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if Self::is_degenerate(spot, strike, time, vol) {
            return 0.0;
        }

        let d1 = self.d1(spot, strike, time, vol);
        Self::norm_pdf(d1) / (spot * vol * time.sqrt())
    }

    /// Calculate charm (delta decay per year).
    pub fn charm(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        if Self::is_degenerate(spot, strike, time, vol) {
            return 0.0;
        }

        let sqrt_t = time.sqrt();
        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);
        let common = -Self::norm_pdf(d1) * (2.0 * self.rate * time - d2 * vol * sqrt_t)
            / (2.0 * time * vol * sqrt_t);
        let carry = self.rate * (-self.rate * time).exp();

        match opt_type {
            OptionType::Call => common - carry * Self::norm_cdf(d2),
            OptionType::Put => common + carry * Self::norm_cdf(-d2),
        }
    }

    /// Calculate vanna (same for calls and puts).
    pub fn vanna(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if Self::is_degenerate(spot, strike, time, vol) {
            return 0.0;
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);
        -Self::norm_pdf(d1) * d2 / vol
    }
}
