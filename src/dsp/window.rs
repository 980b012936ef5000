//! Tapering windows for FIR synthesis
//!
//! Windows are always generated symmetric about their center sample so a
//! windowed zero-phase kernel stays exactly symmetric.

use serde::{Deserialize, Serialize};

use crate::error::{EqError, Result};

/// Default Kaiser shape parameter
pub const DEFAULT_KAISER_BETA: f64 = 12.0;

/// Relative tolerance for accepting an explicit window as symmetric
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Window as given in a configuration: a preset name or explicit coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowSpec {
    /// One of `hann`, `hamming`, `blackman`, `bartlett`, `kaiser`, `rectangular`
    Named(String),
    /// Explicit coefficients, length must equal the kernel length
    Custom(Vec<f64>),
}

impl Default for WindowSpec {
    fn default() -> Self {
        WindowSpec::Named("hann".to_string())
    }
}

impl WindowSpec {
    /// Shorthand for a named window
    pub fn named(name: &str) -> Self {
        WindowSpec::Named(name.to_string())
    }

    /// Resolve into `len` coefficients
    ///
    /// # Arguments
    /// * `len` - Kernel length the window must match
    /// * `kaiser_beta` - Shape parameter for `kaiser` (ignored otherwise)
    ///
    /// # Errors
    /// * `Configuration` - Unknown name, wrong explicit length, non-finite or
    ///   non-symmetric explicit coefficients
    pub fn build(&self, len: usize, kaiser_beta: Option<f64>) -> Result<Vec<f64>> {
        match self {
            WindowSpec::Named(name) => Ok(WindowKind::from_name(name, kaiser_beta)?.generate(len)),
            WindowSpec::Custom(coeffs) => validate_custom(coeffs, len),
        }
    }
}

/// Analytic window families
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowKind {
    Hann,
    Hamming,
    Blackman,
    Bartlett,
    Kaiser { beta: f64 },
    Rectangular,
}

impl WindowKind {
    /// Parse a window name
    ///
    /// # Errors
    /// * `Configuration` - If the name is unknown or the Kaiser beta is invalid
    pub fn from_name(name: &str, kaiser_beta: Option<f64>) -> Result<Self> {
        match name {
            "hann" | "hanning" => Ok(WindowKind::Hann),
            "hamming" => Ok(WindowKind::Hamming),
            "blackman" => Ok(WindowKind::Blackman),
            "bartlett" | "triangle" => Ok(WindowKind::Bartlett),
            "rectangular" | "boxcar" => Ok(WindowKind::Rectangular),
            "kaiser" => {
                let beta = kaiser_beta.unwrap_or(DEFAULT_KAISER_BETA);
                if !beta.is_finite() || beta < 0.0 {
                    return Err(EqError::config(format!(
                        "kaiser beta must be a finite non-negative number, got {}",
                        beta
                    )));
                }
                Ok(WindowKind::Kaiser { beta })
            }
            other => Err(EqError::config(format!(
                "unknown window '{}' (expected hann, hamming, blackman, bartlett, kaiser or rectangular)",
                other
            ))),
        }
    }

    /// Generate a symmetric window of `len` samples
    pub fn generate(&self, len: usize) -> Vec<f64> {
        if len <= 1 {
            return vec![1.0; len];
        }
        let m = (len - 1) as f64;
        let mut window = vec![0.0; len];
        for n in 0..len.div_ceil(2) {
            let value = self.sample(n as f64, m);
            window[n] = value;
            window[len - 1 - n] = value;
        }
        window
    }

    fn sample(&self, n: f64, m: f64) -> f64 {
        use std::f64::consts::PI;
        let phase = 2.0 * PI * n / m;
        match self {
            WindowKind::Hann => 0.5 - 0.5 * phase.cos(),
            WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
            WindowKind::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
            WindowKind::Bartlett => 1.0 - (2.0 * n / m - 1.0).abs(),
            WindowKind::Kaiser { beta } => {
                let r = 2.0 * n / m - 1.0;
                bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / bessel_i0(*beta)
            }
            WindowKind::Rectangular => 1.0,
        }
    }
}

fn validate_custom(coeffs: &[f64], len: usize) -> Result<Vec<f64>> {
    if coeffs.len() != len {
        return Err(EqError::config(format!(
            "explicit window has {} coefficients but the kernel has {} taps",
            coeffs.len(),
            len
        )));
    }
    if let Some(bad) = coeffs.iter().find(|c| !c.is_finite()) {
        return Err(EqError::config(format!(
            "explicit window contains a non-finite value ({})",
            bad
        )));
    }

    let mut window = coeffs.to_vec();
    for n in 0..len / 2 {
        let (a, b) = (coeffs[n], coeffs[len - 1 - n]);
        if (a - b).abs() > SYMMETRY_TOLERANCE * a.abs().max(b.abs()).max(1.0) {
            return Err(EqError::config(format!(
                "explicit window is not symmetric: w[{}] = {} but w[{}] = {}",
                n,
                a,
                len - 1 - n,
                b
            )));
        }
        let mean = 0.5 * (a + b);
        window[n] = mean;
        window[len - 1 - n] = mean;
    }
    Ok(window)
}

/// Modified Bessel function of the first kind, order zero (power series)
fn bessel_i0(x: f64) -> f64 {
    let half = 0.5 * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    while term > sum * 1e-17 {
        term *= (half / k) * (half / k);
        sum += term;
        k += 1.0;
    }
    sum
}
