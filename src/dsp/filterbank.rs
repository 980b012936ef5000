//! Triangular perceptual filterbank
//!
//! Maps `n_filters` perceptually spaced energy bands onto `num_bins` linear
//! FFT magnitude bins. Built once per configuration and read-only afterwards.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::scale::FrequencyScale;
use crate::error::{EqError, Result};

/// Filterbank options as they appear in a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterbankConfig {
    /// Warping used to space the band break points
    pub scale: FrequencyScale,
    /// Number of perceptual bands
    pub n_filters: usize,
    /// Lowest break point in Hz
    pub f_min: f64,
    /// Highest break point in Hz (defaults to Nyquist)
    pub f_max: Option<f64>,
    /// Sample rate of the signal the filter will run on
    pub sample_rate: Option<f64>,
}

impl Default for FilterbankConfig {
    fn default() -> Self {
        Self {
            scale: FrequencyScale::BarkTraunmuller,
            n_filters: 80,
            f_min: 40.0,
            f_max: None,
            sample_rate: None,
        }
    }
}

/// K × K_fb triangular weighting matrix, stored row-major by linear bin
#[derive(Debug, Clone, PartialEq)]
pub struct FilterbankMatrix {
    weights: Vec<f64>,
    num_bins: usize,
    num_bands: usize,
    break_points_hz: Vec<f64>,
}

impl FilterbankMatrix {
    /// Build the matrix from a configuration
    pub fn from_config(num_bins: usize, config: &FilterbankConfig) -> Result<Self> {
        Self::new(
            num_bins,
            config.scale,
            config.n_filters,
            config.f_min,
            config.f_max,
            config.sample_rate,
        )
    }

    /// Build a triangular filterbank
    ///
    /// # Arguments
    /// * `num_bins` - Number of linear magnitude bins K (0 Hz … Nyquist)
    /// * `scale` - Warping used to space the break points
    /// * `n_filters` - Number of bands K_fb
    /// * `f_min` - Lowest break point in Hz
    /// * `f_max` - Highest break point in Hz, Nyquist when `None`
    /// * `sample_rate` - Sample rate in Hz; without it the linear bins span
    ///   0 Hz … `f_max`
    ///
    /// # Errors
    /// * `Configuration` - If both `f_max` and `sample_rate` are missing, or
    ///   any size or frequency is out of range
    pub fn new(
        num_bins: usize,
        scale: FrequencyScale,
        n_filters: usize,
        f_min: f64,
        f_max: Option<f64>,
        sample_rate: Option<f64>,
    ) -> Result<Self> {
        if num_bins < 2 {
            return Err(EqError::config(format!(
                "a filterbank needs at least 2 linear bins, got {}",
                num_bins
            )));
        }
        if n_filters == 0 {
            return Err(EqError::config("a filterbank needs at least 1 filter"));
        }
        if let Some(sr) = sample_rate {
            if !sr.is_finite() || sr <= 0.0 {
                return Err(EqError::config(format!(
                    "sample rate must be positive, got {}",
                    sr
                )));
            }
        }

        let nyquist = sample_rate.map(|sr| sr / 2.0);
        let f_max = match (f_max, nyquist) {
            (Some(f_max), _) => f_max,
            (None, Some(nyquist)) => nyquist,
            (None, None) => {
                return Err(EqError::config(
                    "f_max is undefined: give either f_max or the sample rate",
                ))
            }
        };
        let top_bin_hz = nyquist.unwrap_or(f_max);

        let break_points_hz = scale.break_points(n_filters + 2, f_min, f_max)?;
        let bin_hz: Vec<f64> = (0..num_bins)
            .map(|k| top_bin_hz * k as f64 / (num_bins - 1) as f64)
            .collect();

        let mut weights = vec![0.0; num_bins * n_filters];
        for band in 0..n_filters {
            let (left, center, right) = (
                break_points_hz[band],
                break_points_hz[band + 1],
                break_points_hz[band + 2],
            );
            let mut support = 0usize;
            for (k, &f) in bin_hz.iter().enumerate() {
                let rising = (f - left) / (center - left);
                let falling = (right - f) / (right - center);
                let w = rising.min(falling).max(0.0);
                if w > 0.0 {
                    support += 1;
                }
                weights[k * n_filters + band] = w;
            }
            if support == 0 {
                warn!(
                    band,
                    center_hz = center,
                    "filterbank band covers no linear bin and can never be excited"
                );
            }
        }

        debug!(
            num_bins,
            n_filters,
            scale = %scale,
            f_min,
            f_max,
            "built triangular filterbank"
        );

        Ok(Self {
            weights,
            num_bins,
            num_bands: n_filters,
            break_points_hz,
        })
    }

    /// Number of linear bins K
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Number of perceptual bands K_fb
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Break points in Hz (K_fb + 2 values, ascending)
    pub fn break_points_hz(&self) -> &[f64] {
        &self.break_points_hz
    }

    /// Weight of `band` at linear bin `bin`
    #[inline]
    pub fn weight(&self, bin: usize, band: usize) -> f64 {
        self.weights[bin * self.num_bands + band]
    }

    /// Weights of one band over all linear bins
    pub fn band_weights(&self, band: usize) -> Vec<f64> {
        (0..self.num_bins).map(|k| self.weight(k, band)).collect()
    }

    /// `M · energies`: expand K_fb band energies to K linear-bin energies
    ///
    /// # Errors
    /// * `Shape` - If `energies` does not have K_fb values
    pub fn expand(&self, energies: &[f64]) -> Result<Vec<f64>> {
        if energies.len() != self.num_bands {
            return Err(EqError::shape(
                "filterbank energies",
                self.num_bands,
                energies.len(),
            ));
        }
        Ok(self
            .weights
            .chunks_exact(self.num_bands)
            .map(|row| row.iter().zip(energies).map(|(w, e)| w * e).sum())
            .collect())
    }
}
