//! Linear convolution of buffers with FIR kernels
//!
//! Output always has the input's length. `ZeroPhase` aligns the kernel's
//! center tap (index N/2) with the current sample so a symmetric kernel adds
//! no delay; `Causal` aligns tap 0 with the current sample.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{EqError, Result};

/// Kernels up to this length are convolved directly in the time domain
const DIRECT_CONVOLUTION_MAX_TAPS: usize = 64;

/// Alignment of the kernel relative to the output sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvolutionMode {
    /// Center tap aligned, no net delay
    #[default]
    ZeroPhase,
    /// First tap aligned, as a causal filter
    Causal,
}

impl ConvolutionMode {
    fn offset(&self, kernel_len: usize) -> usize {
        match self {
            ConvolutionMode::ZeroPhase => kernel_len / 2,
            ConvolutionMode::Causal => 0,
        }
    }
}

/// Convolve every channel of `input` with a kernel
///
/// `kernels` holds either one kernel shared by all channels or one kernel per
/// channel, paired by index.
///
/// # Errors
/// * `Shape` - If the kernel count is neither 1 nor the channel count, or a
///   kernel is empty
pub fn convolve(
    input: &AudioBuffer,
    kernels: &[Vec<f64>],
    mode: ConvolutionMode,
) -> Result<AudioBuffer> {
    check_kernels(input.channels(), kernels)?;

    let mut planner = FftPlanner::new();
    let samples = input
        .samples
        .iter()
        .enumerate()
        .map(|(ch, signal)| {
            let kernel = if kernels.len() == 1 {
                &kernels[0]
            } else {
                &kernels[ch]
            };
            convolve_channel_with(&mut planner, signal, kernel, mode)
        })
        .collect();

    Ok(AudioBuffer {
        samples,
        sample_rate: input.sample_rate,
    })
}

/// Validate a kernel set against a channel count
pub(crate) fn check_kernels(channels: usize, kernels: &[Vec<f64>]) -> Result<()> {
    if kernels.len() != 1 && kernels.len() != channels {
        return Err(EqError::shape(
            "kernels",
            format!("1 or {}", channels),
            kernels.len(),
        ));
    }
    if let Some(i) = kernels.iter().position(|k| k.is_empty()) {
        return Err(EqError::shape(format!("kernel {}", i), "at least 1 tap", 0));
    }
    Ok(())
}

/// Convolve one channel; `kernel` must not be empty
pub fn convolve_channel(signal: &[f64], kernel: &[f64], mode: ConvolutionMode) -> Vec<f64> {
    convolve_channel_with(&mut FftPlanner::new(), signal, kernel, mode)
}

fn convolve_channel_with(
    planner: &mut FftPlanner<f64>,
    signal: &[f64],
    kernel: &[f64],
    mode: ConvolutionMode,
) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let offset = mode.offset(kernel.len());
    if kernel.len() <= DIRECT_CONVOLUTION_MAX_TAPS {
        direct(signal, kernel, offset)
    } else {
        via_fft(planner, signal, kernel, offset)
    }
}

fn direct(signal: &[f64], kernel: &[f64], offset: usize) -> Vec<f64> {
    let len = signal.len();
    (0..len)
        .map(|n| {
            let i = n + offset;
            // Taps m with 0 <= i - m < len
            let m_lo = (i + 1).saturating_sub(len);
            let m_hi = kernel.len().min(i + 1);
            (m_lo..m_hi).map(|m| kernel[m] * signal[i - m]).sum()
        })
        .collect()
}

fn via_fft(
    planner: &mut FftPlanner<f64>,
    signal: &[f64],
    kernel: &[f64],
    offset: usize,
) -> Vec<f64> {
    let size = (signal.len() + kernel.len() - 1).next_power_of_two();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut x = zero_padded(signal, size);
    let mut h = zero_padded(kernel, size);
    forward.process(&mut x);
    forward.process(&mut h);
    for (xk, hk) in x.iter_mut().zip(&h) {
        *xk *= hk;
    }
    inverse.process(&mut x);

    let scale = 1.0 / size as f64;
    x[offset..offset + signal.len()]
        .iter()
        .map(|c| c.re * scale)
        .collect()
}

fn zero_padded(values: &[f64], size: usize) -> Vec<Complex<f64>> {
    let mut buffer = vec![Complex::new(0.0, 0.0); size];
    for (slot, &v) in buffer.iter_mut().zip(values) {
        slot.re = v;
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_signal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (i as f64 * 0.31).sin() + 0.5 * (i as f64 * 1.7).cos())
            .collect()
    }

    /// Reference full convolution
    fn full(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; signal.len() + kernel.len() - 1];
        for (i, &x) in signal.iter().enumerate() {
            for (m, &h) in kernel.iter().enumerate() {
                out[i + m] += x * h;
            }
        }
        out
    }

    #[test]
    fn test_centered_delta_is_identity() {
        let signal = test_signal(100);
        let mut kernel = vec![0.0; 9];
        kernel[4] = 1.0;
        let out = convolve_channel(&signal, &kernel, ConvolutionMode::ZeroPhase);
        assert_eq!(out, signal);
    }

    #[test]
    fn test_causal_delay() {
        let signal = test_signal(50);
        let kernel = [0.0, 0.0, 1.0];
        let out = convolve_channel(&signal, &kernel, ConvolutionMode::Causal);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert_eq!(&out[2..], &signal[..48]);
    }

    #[test]
    fn test_direct_and_fft_paths_agree_with_reference() {
        let signal = test_signal(300);
        for taps in [5, 64, 65, 201] {
            let kernel: Vec<f64> = (0..taps).map(|i| ((i * 7 % 13) as f64 - 6.0) / 10.0).collect();
            let reference = full(&signal, &kernel);
            for mode in [ConvolutionMode::ZeroPhase, ConvolutionMode::Causal] {
                let out = convolve_channel(&signal, &kernel, mode);
                assert_eq!(out.len(), signal.len());
                let offset = mode.offset(taps);
                for (n, &y) in out.iter().enumerate() {
                    assert_relative_eq!(y, reference[n + offset], epsilon = 1e-10);
                }
            }
        }
    }

    #[test]
    fn test_kernel_longer_than_signal() {
        let signal = [1.0, 2.0, 3.0];
        let mut kernel = vec![0.0; 101];
        kernel[50] = 2.0;
        let out = convolve_channel(&signal, &kernel, ConvolutionMode::ZeroPhase);
        for (y, x) in out.iter().zip(signal) {
            assert_relative_eq!(*y, 2.0 * x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_shared_and_per_channel_kernels() {
        let input = AudioBuffer::from_channels(vec![test_signal(32), test_signal(32)], 48000).unwrap();

        let shared = convolve(&input, &[vec![0.0, 2.0, 0.0]], ConvolutionMode::ZeroPhase).unwrap();
        for ch in 0..2 {
            for (y, x) in shared.channel(ch).iter().zip(input.channel(ch)) {
                assert_relative_eq!(*y, 2.0 * x);
            }
        }

        let paired = convolve(
            &input,
            &[vec![1.0], vec![-1.0]],
            ConvolutionMode::ZeroPhase,
        )
        .unwrap();
        assert_eq!(paired.channel(0), input.channel(0));
        for (y, x) in paired.channel(1).iter().zip(input.channel(1)) {
            assert_eq!(*y, -x);
        }
    }

    #[test]
    fn test_kernel_count_mismatch_is_shape_error() {
        let input = AudioBuffer::new(2, 16, 48000);
        let kernels = vec![vec![1.0]; 3];
        let err = convolve(&input, &kernels, ConvolutionMode::ZeroPhase).unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_ERROR");
        assert!(convolve(&input, &[Vec::new()], ConvolutionMode::Causal).is_err());
    }
}
