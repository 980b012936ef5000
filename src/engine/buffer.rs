//! Audio Buffer Management
//!
//! Provides the planar (channels × samples) signal type every equalizer
//! consumes and produces.

use crate::error::{EqError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate assumed for buffers built without an explicit rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns `f64::NEG_INFINITY` for zero input.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Fixed-length, fully buffered multichannel signal
///
/// Stores audio as non-interleaved 64-bit floating point samples. Each
/// channel is a separate `Vec<f64>` and all channels have the same length.
///
/// # Example
/// ```
/// use spectreq::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::new(2, 48000, 48000);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 48000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f64>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer
    ///
    /// # Arguments
    /// * `num_channels` - Number of channels
    /// * `num_samples` - Number of samples per channel
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(num_channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// * `Shape` - If there are no channels or the channels differ in length
    pub fn from_channels(samples: Vec<Vec<f64>>, sample_rate: u32) -> Result<Self> {
        let Some(first) = samples.first() else {
            return Err(EqError::shape("signal", "at least 1 channel", 0));
        };
        let len = first.len();
        if let Some((ch, bad)) = samples.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(EqError::shape(
                format!("signal channel {}", ch),
                len,
                bad.len(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `num_channels` - Number of interleaved channels
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(
        interleaved: &[f64],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(EqError::shape("signal", "at least 1 channel", 0));
        }
        if interleaved.len() % num_channels != 0 {
            return Err(EqError::shape(
                "interleaved signal",
                format!("a multiple of {} samples", num_channels),
                interleaved.len(),
            ));
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f64> {
        let mut interleaved = Vec::with_capacity(self.channels() * self.len());
        for i in 0..self.len() {
            for channel in &self.samples {
                interleaved.push(channel[i]);
            }
        }
        interleaved
    }

    /// Single-channel sine wave with unit amplitude
    pub fn sine_wave(frequency: f64, duration_secs: f64, sample_rate: u32) -> Self {
        let num_samples = (duration_secs * sample_rate as f64) as usize;
        let omega = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;
        let channel = (0..num_samples).map(|i| (omega * i as f64).sin()).collect();
        Self {
            samples: vec![channel],
            sample_rate,
        }
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (channels, samples)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.channels(), self.len())
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Immutable view of one channel
    ///
    /// # Panics
    /// Panics if `channel` is out of range.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f64] {
        &self.samples[channel]
    }

    /// Check if every sample is finite
    pub fn is_finite(&self) -> bool {
        self.samples.iter().flatten().all(|s| s.is_finite())
    }

    /// RMS level over all channels (linear)
    pub fn rms(&self) -> f64 {
        let total = self.channels() * self.len();
        if total == 0 {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().flatten().map(|s| s * s).sum();
        (sum_sq / total as f64).sqrt()
    }

    /// Peak absolute sample value over all channels (linear)
    pub fn peak(&self) -> f64 {
        self.samples
            .iter()
            .flatten()
            .map(|s| s.abs())
            .fold(0.0, f64::max)
    }
}
