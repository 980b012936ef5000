//! Spectreq - Filter Design for Equalizers
//!
//! Spectreq turns compact parameterizations into concrete audio filters:
//! 1. Zero-phase FIR equalizer - per-bin log-magnitudes (or perceptual
//!    filterbank log-energies) synthesized into symmetric FIR kernels
//! 2. Graphic equalizer - per-band log-gains designed into a cascade of
//!    peaking biquads, applied exactly or through a frequency-sampled FIR
//!
//! # Architecture
//!
//! Everything expensive is resolved at construction (filterbank matrix, band
//! table, window, FFT plans, channel strategy) and shared read-only; every
//! call then maps `(signal, parameters)` to a new signal of the same shape.
//!
//! ```
//! use spectreq::config::{EqualizerConfig, ParameterSet};
//! use spectreq::engine::AudioBuffer;
//!
//! let config = EqualizerConfig::from_json_str(r#"{ "type": "graphic", "backend": "exact" }"#)?;
//! let eq = config.build()?;
//! let params = ParameterSet::zeros(&eq.parameter_size());
//!
//! let input = AudioBuffer::sine_wave(1000.0, 0.1, 44100);
//! let output = eq.process(&input, params.for_equalizer(eq.as_ref())?)?;
//! assert_eq!(output, input);
//! # Ok::<(), spectreq::EqError>(())
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use config::{EqualizerConfig, ParameterSet};
pub use dsp::{ChannelMode, Equalizer, FilterDesign, ParameterSizes};
pub use engine::AudioBuffer;
pub use error::{EqError, Result};
