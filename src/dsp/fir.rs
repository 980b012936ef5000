//! Zero-phase FIR synthesis
//!
//! A log-magnitude spectrum of K bins is read as the one-sided spectrum of a
//! real, even sequence of N = 2K − 1 samples. Its inverse DFT is re-centered
//! so the zero-lag tap sits at index K − 1, mirrored, and tapered by a
//! symmetric window:
//!
//! ```text
//! h[n] = w[n] · (1/N) Σ_k exp(H_log[k]) · e^{j2πkn/N},   −(K−1) ≤ n ≤ K−1
//! ```
//!
//! The filterbank variant first recovers the magnitude from K_fb band
//! log-energies as `|H| = sqrt(M · exp(H_fb) + ε)`.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tracing::debug;

use super::filterbank::FilterbankMatrix;
use super::window::WindowSpec;
use crate::error::{EqError, Result};

/// Default stabilizer added to filterbank energies before the square root
pub const DEFAULT_FILTERBANK_EPS: f64 = 1e-7;

// ============================================================================
// Zero-Phase FIR
// ============================================================================

/// Log-magnitude → symmetric FIR kernel
#[derive(Clone)]
pub struct ZeroPhaseFir {
    num_bins: usize,
    window: Vec<f64>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for ZeroPhaseFir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroPhaseFir")
            .field("num_bins", &self.num_bins)
            .field("kernel_len", &self.kernel_len())
            .finish()
    }
}

impl ZeroPhaseFir {
    /// Create a synthesizer for `num_bins` magnitude bins
    ///
    /// # Arguments
    /// * `num_bins` - Number of one-sided magnitude bins K
    /// * `window` - Taper applied to the 2K − 1 tap kernel
    /// * `kaiser_beta` - Shape parameter when `window` is `kaiser`
    ///
    /// # Errors
    /// * `Configuration` - If `num_bins` is 0 or the window is invalid
    pub fn new(num_bins: usize, window: &WindowSpec, kaiser_beta: Option<f64>) -> Result<Self> {
        if num_bins == 0 {
            return Err(EqError::config("a zero-phase FIR needs at least 1 magnitude bin"));
        }
        let kernel_len = 2 * num_bins - 1;
        let window = window.build(kernel_len, kaiser_beta)?;
        let inverse = FftPlanner::new().plan_fft_inverse(kernel_len);

        debug!(num_bins, kernel_len, "planned zero-phase FIR synthesizer");

        Ok(Self {
            num_bins,
            window,
            inverse,
        })
    }

    /// Number of magnitude bins K
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Kernel length N = 2K − 1
    pub fn kernel_len(&self) -> usize {
        self.window.len()
    }

    /// Index of the zero-lag tap
    pub fn center(&self) -> usize {
        self.num_bins - 1
    }

    /// Synthesize the kernel for one log-magnitude vector
    ///
    /// # Errors
    /// * `Shape` - If `log_magnitude` does not have K values
    /// * `NumericDomain` - If a value is non-finite or overflows when exponentiated
    pub fn synthesize(&self, log_magnitude: &[f64]) -> Result<Vec<f64>> {
        if log_magnitude.len() != self.num_bins {
            return Err(EqError::shape(
                "log_magnitude",
                self.num_bins,
                log_magnitude.len(),
            ));
        }
        let magnitude: Vec<f64> = log_magnitude.iter().map(|v| v.exp()).collect();
        if let Some(k) = magnitude.iter().position(|m| !m.is_finite()) {
            return Err(EqError::numeric(format!(
                "log_magnitude[{}] = {} has no finite magnitude",
                k, log_magnitude[k]
            )));
        }
        Ok(self.synthesize_from_magnitude(&magnitude))
    }

    /// Synthesize from an already linear, finite magnitude of K values
    pub(crate) fn synthesize_from_magnitude(&self, magnitude: &[f64]) -> Vec<f64> {
        let n = self.kernel_len();
        let k = self.num_bins;

        // Real, even spectrum: X[N − k] = X[k]
        let mut spectrum = vec![Complex::new(0.0, 0.0); n];
        for (bin, &m) in magnitude.iter().enumerate() {
            spectrum[bin] = Complex::new(m, 0.0);
            if bin > 0 {
                spectrum[n - bin] = Complex::new(m, 0.0);
            }
        }
        self.inverse.process(&mut spectrum);

        let scale = 1.0 / n as f64;
        let center = k - 1;
        let mut kernel = vec![0.0; n];
        for lag in 0..k {
            let tap = spectrum[lag].re * scale;
            kernel[center + lag] = tap * self.window[center + lag];
            kernel[center - lag] = tap * self.window[center - lag];
        }
        kernel
    }
}

// ============================================================================
// Filterbank FIR
// ============================================================================

/// Band log-energy → symmetric FIR kernel through a triangular filterbank
#[derive(Debug, Clone)]
pub struct FilterbankFir {
    filterbank: FilterbankMatrix,
    fir: ZeroPhaseFir,
    eps: f64,
}

impl FilterbankFir {
    /// Wrap a filterbank and a synthesizer with matching bin counts
    ///
    /// # Errors
    /// * `Configuration` - If the bin counts differ or `eps` is not positive
    pub fn new(filterbank: FilterbankMatrix, fir: ZeroPhaseFir, eps: f64) -> Result<Self> {
        if filterbank.num_bins() != fir.num_bins() {
            return Err(EqError::config(format!(
                "filterbank covers {} bins but the FIR expects {}",
                filterbank.num_bins(),
                fir.num_bins()
            )));
        }
        if !eps.is_finite() || eps <= 0.0 {
            return Err(EqError::config(format!("eps must be positive, got {}", eps)));
        }
        Ok(Self {
            filterbank,
            fir,
            eps,
        })
    }

    /// The underlying filterbank
    pub fn filterbank(&self) -> &FilterbankMatrix {
        &self.filterbank
    }

    /// The underlying synthesizer
    pub fn fir(&self) -> &ZeroPhaseFir {
        &self.fir
    }

    /// Synthesize the kernel for one band log-energy vector
    ///
    /// # Errors
    /// * `Shape` - If `log_energy` does not have K_fb values
    /// * `NumericDomain` - If a value is non-finite or overflows
    pub fn synthesize(&self, log_energy: &[f64]) -> Result<Vec<f64>> {
        if log_energy.len() != self.filterbank.num_bands() {
            return Err(EqError::shape(
                "log_energy",
                self.filterbank.num_bands(),
                log_energy.len(),
            ));
        }
        let energy: Vec<f64> = log_energy.iter().map(|v| v.exp()).collect();
        if let Some(k) = energy.iter().position(|e| !e.is_finite()) {
            return Err(EqError::numeric(format!(
                "log_energy[{}] = {} has no finite energy",
                k, log_energy[k]
            )));
        }

        let magnitude: Vec<f64> = self
            .filterbank
            .expand(&energy)?
            .into_iter()
            .map(|e| (e + self.eps).sqrt())
            .collect();
        if magnitude.iter().any(|m| !m.is_finite()) {
            return Err(EqError::numeric("filterbank energy overflowed"));
        }
        Ok(self.fir.synthesize_from_magnitude(&magnitude))
    }
}

// ============================================================================
// Synthesizer selection
// ============================================================================

/// The FIR synthesis path chosen at construction
#[derive(Debug, Clone)]
pub enum FirSynthesizer {
    /// Parameters are K log-magnitudes
    Direct(ZeroPhaseFir),
    /// Parameters are K_fb band log-energies
    Filterbank(FilterbankFir),
}

impl FirSynthesizer {
    /// Name of the parameter vector this synthesizer consumes
    pub fn param_name(&self) -> &'static str {
        match self {
            FirSynthesizer::Direct(_) => "log_magnitude",
            FirSynthesizer::Filterbank(_) => "log_energy",
        }
    }

    /// Length of the parameter vector
    pub fn param_len(&self) -> usize {
        match self {
            FirSynthesizer::Direct(fir) => fir.num_bins(),
            FirSynthesizer::Filterbank(fb) => fb.filterbank().num_bands(),
        }
    }

    /// Length of every synthesized kernel
    pub fn kernel_len(&self) -> usize {
        match self {
            FirSynthesizer::Direct(fir) => fir.kernel_len(),
            FirSynthesizer::Filterbank(fb) => fb.fir().kernel_len(),
        }
    }

    /// Synthesize one kernel
    pub fn synthesize(&self, params: &[f64]) -> Result<Vec<f64>> {
        match self {
            FirSynthesizer::Direct(fir) => fir.synthesize(params),
            FirSynthesizer::Filterbank(fb) => fb.synthesize(params),
        }
    }
}
