//! WAV file I/O
//!
//! Reads 8/16/24/32-bit integer and 32-bit float WAV files into 64-bit planar
//! buffers at the file's own sample rate, and writes 16/24-bit integer or
//! 32-bit float files. No resampling: the equalizer's sample rate is a
//! configuration option, not a property of the file.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::engine::buffer::AudioBuffer;
use crate::error::{EqError, Result};

/// Output encoding for [`write_wav`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Bit depth: 16, 24 (integer) or 32 (float)
    pub bit_depth: u16,
}

impl Default for WavFormat {
    fn default() -> Self {
        WavFormat { bit_depth: 24 }
    }
}

impl WavFormat {
    pub fn new(bit_depth: u16) -> Self {
        WavFormat { bit_depth }
    }

    /// 16-bit integer
    pub fn cd_quality() -> Self {
        WavFormat { bit_depth: 16 }
    }

    /// 32-bit float, lossless for processed output within ±1
    pub fn float() -> Self {
        WavFormat { bit_depth: 32 }
    }

    fn spec(&self, channels: u16, sample_rate: u32) -> Result<WavSpec> {
        let sample_format = match self.bit_depth {
            16 | 24 => SampleFormat::Int,
            32 => SampleFormat::Float,
            other => {
                return Err(EqError::UnsupportedFormat {
                    format: format!("{}-bit output (only 16, 24, 32 supported)", other),
                })
            }
        };
        Ok(WavSpec {
            channels,
            sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format,
        })
    }
}

/// Read a WAV file
///
/// # Arguments
/// * `path` - Path to the WAV file
///
/// # Returns
/// The decoded audio, one `Vec<f64>` per channel, at the file's sample rate
///
/// # Errors
/// * `AudioRead` - If the file is missing or not a valid WAV file
/// * `UnsupportedFormat` - If the sample encoding is not supported
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let read_error = |source| EqError::AudioRead {
        path: path.display().to_string(),
        source,
    };

    let reader = WavReader::open(path).map_err(read_error)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved = read_samples(reader, spec).map_err(|e| match e {
        ReadFailure::Decode(source) => read_error(source),
        ReadFailure::Unsupported(format) => EqError::UnsupportedFormat { format },
    })?;

    debug!(
        path = %path.display(),
        channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        frames = interleaved.len() / channels.max(1),
        "read WAV file"
    );

    AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate)
}

/// Write a buffer to a WAV file at the buffer's sample rate
///
/// Integer formats clip samples to [-1, 1].
///
/// # Errors
/// * `UnsupportedFormat` - If the bit depth or channel count cannot be written
/// * `AudioWrite` - If the file cannot be created or written
pub fn write_wav(buffer: &AudioBuffer, path: &Path, format: WavFormat) -> Result<()> {
    let channels = u16::try_from(buffer.channels())
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| EqError::UnsupportedFormat {
            format: format!("{}-channel audio", buffer.channels()),
        })?;
    let spec = format.spec(channels, buffer.sample_rate)?;

    let write_error = |source| EqError::AudioWrite {
        path: path.display().to_string(),
        source,
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_error)?;
    let interleaved = buffer.to_interleaved();

    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(write_error)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit samples are carried in an i32
                let scaled = (sample * 8388607.0).round().clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(write_error)?;
            }
        }
        _ => {
            for sample in interleaved {
                writer.write_sample(sample as f32).map_err(write_error)?;
            }
        }
    }

    writer.finalize().map_err(write_error)?;

    debug!(
        path = %path.display(),
        channels,
        bits = format.bit_depth,
        frames = buffer.len(),
        "wrote WAV file"
    );
    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

enum ReadFailure {
    Decode(hound::Error),
    Unsupported(String),
}

/// Decode every sample of the file into [-1, 1) floats, interleaved
fn read_samples<R: std::io::Read>(
    mut reader: WavReader<R>,
    spec: WavSpec,
) -> std::result::Result<Vec<f64>, ReadFailure> {
    let decoded = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<Vec<f64>, _>>(),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f64 / 128.0))
            .collect(),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f64 / 32768.0))
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f64 / 8388608.0))
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f64 / 2147483648.0))
            .collect(),
        (format, bits) => {
            return Err(ReadFailure::Unsupported(format!(
                "{}-bit {:?} samples",
                bits, format
            )))
        }
    };
    decoded.map_err(ReadFailure::Decode)
}

// ============================================================================
// Tests
// ============================================================================
