//! Mid/side channel transforms and channel modes
//!
//! Convention: mid = L + R, side = L − R, and back L = (mid + side) / 2,
//! R = (mid − side) / 2. The same mix converts a (mid, side) kernel pair into
//! a (left, right) pair for pseudo mid/side filtering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{EqError, Result};

// ============================================================================
// Transforms
// ============================================================================

/// Left/right → mid/side
///
/// # Errors
/// * `Shape` - If `input` does not have exactly 2 channels
pub fn lr_to_ms(input: &AudioBuffer) -> Result<AudioBuffer> {
    let (left, right) = stereo_pair(input, "left/right signal")?;
    let mid = left.iter().zip(right).map(|(l, r)| l + r).collect();
    let side = left.iter().zip(right).map(|(l, r)| l - r).collect();
    Ok(AudioBuffer {
        samples: vec![mid, side],
        sample_rate: input.sample_rate,
    })
}

/// Mid/side → left/right, the exact inverse of [`lr_to_ms`]
///
/// # Errors
/// * `Shape` - If `input` does not have exactly 2 channels
pub fn ms_to_lr(input: &AudioBuffer) -> Result<AudioBuffer> {
    let (mid, side) = stereo_pair(input, "mid/side signal")?;
    let (left, right) = mix_to_lr(mid, side);
    Ok(AudioBuffer {
        samples: vec![left, right],
        sample_rate: input.sample_rate,
    })
}

/// Mix a (mid, side) kernel pair into a (left, right) kernel pair
///
/// # Errors
/// * `Shape` - If the two kernels differ in length
pub fn ms_to_lr_kernels(mid: &[f64], side: &[f64]) -> Result<[Vec<f64>; 2]> {
    if mid.len() != side.len() {
        return Err(EqError::shape("side kernel", mid.len(), side.len()));
    }
    let (left, right) = mix_to_lr(mid, side);
    Ok([left, right])
}

fn mix_to_lr(mid: &[f64], side: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let left = mid.iter().zip(side).map(|(m, s)| 0.5 * (m + s)).collect();
    let right = mid.iter().zip(side).map(|(m, s)| 0.5 * (m - s)).collect();
    (left, right)
}

fn stereo_pair<'a>(input: &'a AudioBuffer, what: &str) -> Result<(&'a [f64], &'a [f64])> {
    match input.samples.as_slice() {
        [first, second] => Ok((first, second)),
        _ => Err(EqError::shape(
            format!("{} channels", what),
            2,
            input.channels(),
        )),
    }
}

// ============================================================================
// Channel Mode
// ============================================================================

/// How an equalizer pairs its filters with the input channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// One filter shared by every channel
    #[default]
    Mono,
    /// One filter per channel of a stereo pair
    Stereo,
    /// Filter the mid and side signals, then convert back
    #[serde(rename = "midside")]
    MidSide,
    /// Convert the mid/side filter pair to left/right and filter directly
    #[serde(rename = "pseudo_midside")]
    PseudoMidSide,
}

impl ChannelMode {
    pub const ALL: [ChannelMode; 4] = [
        ChannelMode::Mono,
        ChannelMode::Stereo,
        ChannelMode::MidSide,
        ChannelMode::PseudoMidSide,
    ];

    /// Identifier used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            ChannelMode::Mono => "mono",
            ChannelMode::Stereo => "stereo",
            ChannelMode::MidSide => "midside",
            ChannelMode::PseudoMidSide => "pseudo_midside",
        }
    }

    /// Number of filters (parameter rows) the mode consumes
    pub fn filter_count(&self) -> usize {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }

    /// Channel count the input must have, `None` for any
    pub fn required_channels(&self) -> Option<usize> {
        match self {
            ChannelMode::Mono => None,
            _ => Some(2),
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelMode {
    type Err = EqError;

    fn from_str(s: &str) -> Result<Self> {
        ChannelMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| {
                EqError::config(format!(
                    "unknown channel mode '{}' (expected one of: {})",
                    s,
                    ChannelMode::ALL.map(|m| m.name()).join(", ")
                ))
            })
    }
}
