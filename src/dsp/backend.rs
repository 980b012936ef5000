//! Biquad cascade backends
//!
//! `Exact` runs every section as a causal IIR recursion. `Fsm` samples the
//! cascade response at L points on the unit circle, inverts it to an L-tap
//! FIR (the time-aliased impulse response) and applies it by causal
//! convolution, so both backends produce time-aligned output.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::biquad::BiquadCascade;
use super::convolution::{convolve, ConvolutionMode};
use crate::engine::AudioBuffer;
use crate::error::{EqError, Result};

/// Default FIR length of the frequency-sampling approximation
pub const DEFAULT_FSM_FIR_LEN: usize = 8192;

/// Shortest FIR the frequency-sampling backend accepts
const MIN_FSM_FIR_LEN: usize = 4;

/// Backend selector as it appears in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Time-domain recursion
    #[serde(alias = "lfilter")]
    Exact,
    /// Frequency-sampling FIR approximation
    #[default]
    Fsm,
}

/// How a biquad cascade is applied to a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadBackend {
    Exact,
    Fsm { fir_len: usize },
}

impl Default for BiquadBackend {
    fn default() -> Self {
        BiquadBackend::Fsm {
            fir_len: DEFAULT_FSM_FIR_LEN,
        }
    }
}

impl BiquadBackend {
    /// Resolve a configured backend
    ///
    /// # Errors
    /// * `Configuration` - If the FSM length is below 4 taps
    pub fn new(kind: BackendKind, fsm_fir_len: usize) -> Result<Self> {
        match kind {
            BackendKind::Exact => Ok(BiquadBackend::Exact),
            BackendKind::Fsm => {
                check_fir_len(fsm_fir_len)?;
                Ok(BiquadBackend::Fsm {
                    fir_len: fsm_fir_len,
                })
            }
        }
    }

    /// The selector this backend was built from
    pub fn kind(&self) -> BackendKind {
        match self {
            BiquadBackend::Exact => BackendKind::Exact,
            BiquadBackend::Fsm { .. } => BackendKind::Fsm,
        }
    }

    /// Filter every channel of `input`
    ///
    /// `cascades` holds one cascade shared by all channels or one per channel.
    ///
    /// # Errors
    /// * `Shape` - If the cascade count is neither 1 nor the channel count
    pub fn apply(&self, input: &AudioBuffer, cascades: &[BiquadCascade]) -> Result<AudioBuffer> {
        if cascades.len() != 1 && cascades.len() != input.channels() {
            return Err(EqError::shape(
                "cascades",
                format!("1 or {}", input.channels()),
                cascades.len(),
            ));
        }

        match self {
            BiquadBackend::Exact => {
                let samples = input
                    .samples
                    .iter()
                    .enumerate()
                    .map(|(ch, signal)| {
                        let cascade = &cascades[if cascades.len() == 1 { 0 } else { ch }];
                        let mut output = signal.clone();
                        cascade.filter_in_place(&mut output);
                        output
                    })
                    .collect();
                Ok(AudioBuffer {
                    samples,
                    sample_rate: input.sample_rate,
                })
            }
            BiquadBackend::Fsm { fir_len } => {
                let kernels = cascades
                    .iter()
                    .map(|c| fsm_kernel(c, *fir_len))
                    .collect::<Result<Vec<_>>>()?;
                convolve(input, &kernels, ConvolutionMode::Causal)
            }
        }
    }
}

/// Frequency-sampling FIR of a cascade
///
/// Samples the response at ω_k = 2πk / `fir_len`, fills the upper half by
/// conjugate symmetry and takes the real inverse DFT.
///
/// # Errors
/// * `Configuration` - If `fir_len` is below 4 taps
pub fn fsm_kernel(cascade: &BiquadCascade, fir_len: usize) -> Result<Vec<f64>> {
    check_fir_len(fir_len)?;

    let mut spectrum = vec![Complex::new(0.0, 0.0); fir_len];
    for k in 0..=fir_len / 2 {
        let omega = 2.0 * PI * k as f64 / fir_len as f64;
        let response = cascade.response(omega);
        spectrum[k] = response;
        if k > 0 && k < fir_len - k {
            spectrum[fir_len - k] = response.conj();
        }
    }
    // DC and (for even lengths) Nyquist are real for real coefficients
    spectrum[0].im = 0.0;
    if fir_len % 2 == 0 {
        spectrum[fir_len / 2].im = 0.0;
    }

    FftPlanner::new()
        .plan_fft_inverse(fir_len)
        .process(&mut spectrum);

    debug!(fir_len, sections = cascade.len(), "sampled cascade response");

    let scale = 1.0 / fir_len as f64;
    Ok(spectrum.iter().map(|c| c.re * scale).collect())
}

fn check_fir_len(fir_len: usize) -> Result<()> {
    if fir_len < MIN_FSM_FIR_LEN {
        return Err(EqError::config(format!(
            "fsm_fir_len must be at least {}, got {}",
            MIN_FSM_FIR_LEN, fir_len
        )));
    }
    Ok(())
}
