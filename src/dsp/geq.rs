//! Graphic equalizer design: per-band log-gains → cascade of peaking biquads
//!
//! Each band k uses
//!
//! ```text
//! H_k(z) = (1 + g·β − 2cos(ω) z⁻¹ + (1 − g·β) z⁻²) / (1 + β − 2cos(ω) z⁻¹ + (1 − β) z⁻²)
//! β      = sqrt(|g̃² − 1| / |g² − g̃²|) · tan(B / 2),   g̃ = g^0.4
//! ```
//!
//! where g is the linear band gain, ω the center frequency and B the
//! bandwidth, both in radians per sample.

use std::f64::consts::PI;

use tracing::debug;

use super::biquad::{BiquadCascade, BiquadSection};
use super::scale::{Band, BandLayout};
use crate::error::{EqError, Result};

/// Exponent relating the band gain to the gain at the neighboring band
const NEIGHBOR_GAIN_EXPONENT: f64 = 0.4;

/// Limit of |g̃² − 1| / |g² − g̃²| as g → 1 ((2·0.4) / (2 − 2·0.4))
const UNIT_GAIN_RATIO: f64 = 2.0 / 3.0;

/// Band frequencies pre-converted to radians per sample
#[derive(Debug, Clone, Copy, PartialEq)]
struct BandRadians {
    cos_omega: f64,
    tan_half_bandwidth: f64,
}

/// Log-gain → biquad cascade designer for a fixed band layout and sample rate
#[derive(Debug, Clone)]
pub struct GraphicEqDesigner {
    sample_rate: f64,
    bands: Vec<Band>,
    radians: Vec<BandRadians>,
}

impl GraphicEqDesigner {
    /// Build the band table for `layout` at `sample_rate`
    ///
    /// # Errors
    /// * `Configuration` - If the sample rate is not positive, the layout is
    ///   invalid, or a band's center or bandwidth reaches Nyquist
    pub fn new(layout: BandLayout, sample_rate: f64) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EqError::config(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        let nyquist = sample_rate / 2.0;
        let bands = layout.bands()?;

        let mut radians = Vec::with_capacity(bands.len());
        for (k, band) in bands.iter().enumerate() {
            if band.center_hz >= nyquist || band.bandwidth_hz >= nyquist {
                return Err(EqError::config(format!(
                    "band {} (center {:.1} Hz, bandwidth {:.1} Hz) does not fit below Nyquist ({:.1} Hz)",
                    k, band.center_hz, band.bandwidth_hz, nyquist
                )));
            }
            let omega = 2.0 * PI * band.center_hz / sample_rate;
            let bandwidth = 2.0 * PI * band.bandwidth_hz / sample_rate;
            radians.push(BandRadians {
                cos_omega: omega.cos(),
                tan_half_bandwidth: (bandwidth / 2.0).tan(),
            });
        }

        debug!(
            num_bands = bands.len(),
            sample_rate,
            "built graphic EQ band table"
        );

        Ok(Self {
            sample_rate,
            bands,
            radians,
        })
    }

    /// Number of bands (and log-gains)
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// The band table in ascending frequency order
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Design one cascade from per-band natural-log gains
    ///
    /// # Errors
    /// * `Shape` - If `log_gains` does not have one value per band
    /// * `NumericDomain` - If a gain is non-finite or the coefficients overflow
    pub fn design(&self, log_gains: &[f64]) -> Result<BiquadCascade> {
        if log_gains.len() != self.num_bands() {
            return Err(EqError::shape("log_gains", self.num_bands(), log_gains.len()));
        }

        let sections = log_gains
            .iter()
            .zip(&self.radians)
            .enumerate()
            .map(|(k, (&log_gain, band))| peaking_section(k, log_gain, band))
            .collect::<Result<Vec<_>>>()?;

        Ok(BiquadCascade::new(sections))
    }
}

fn peaking_section(k: usize, log_gain: f64, band: &BandRadians) -> Result<BiquadSection> {
    if !log_gain.is_finite() {
        return Err(EqError::numeric(format!(
            "log_gains[{}] = {} is not finite",
            k, log_gain
        )));
    }

    let g = log_gain.exp();
    let ratio = if log_gain == 0.0 {
        UNIT_GAIN_RATIO
    } else {
        // |g̃² − 1| / |g² − g̃²| with g̃² factored out of the denominator, so
        // deep cuts keep their magnitude instead of underflowing to 0 / 0
        let neighbor_log_sq = 2.0 * NEIGHBOR_GAIN_EXPONENT * log_gain;
        let excess_log_sq = 2.0 * log_gain - neighbor_log_sq;
        neighbor_log_sq.exp_m1().abs() / (neighbor_log_sq.exp() * excess_log_sq.exp_m1().abs())
    };
    let beta = ratio.sqrt() * band.tan_half_bandwidth;

    let two_cos = -2.0 * band.cos_omega;
    let section = BiquadSection::new(
        [1.0 + g * beta, two_cos, 1.0 - g * beta],
        [1.0 + beta, two_cos, 1.0 - beta],
    );
    if !section.is_finite() {
        return Err(EqError::numeric(format!(
            "band {} with log-gain {} produced non-finite coefficients",
            k, log_gain
        )));
    }
    Ok(section)
}
