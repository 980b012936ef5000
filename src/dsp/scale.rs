//! Frequency scales and graphic-EQ band layouts
//!
//! A [`FrequencyScale`] is a monotonic warping between Hz and perceptual
//! units. Filterbanks place their break points uniformly in warped units; a
//! [`BandLayout`] turns either a fixed table (Bark critical bands, ISO
//! third-octave) or a warped scale into per-band center frequencies and
//! bandwidths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EqError, Result};

// ============================================================================
// Band tables
// ============================================================================

/// Zwicker critical-band edges in Hz (25 edges → 24 bands)
const BARK_EDGES_HZ: [f64; 25] = [
    20.0, 100.0, 200.0, 300.0, 400.0, 510.0, 630.0, 770.0, 920.0, 1080.0, 1270.0, 1480.0, 1720.0,
    2000.0, 2320.0, 2700.0, 3150.0, 3700.0, 4400.0, 5300.0, 6400.0, 7700.0, 9500.0, 12000.0,
    15500.0,
];

/// Zwicker critical-band centers in Hz
const BARK_CENTERS_HZ: [f64; 24] = [
    50.0, 150.0, 250.0, 350.0, 450.0, 570.0, 700.0, 840.0, 1000.0, 1170.0, 1370.0, 1600.0, 1850.0,
    2150.0, 2500.0, 2900.0, 3400.0, 4000.0, 4800.0, 5800.0, 7000.0, 8500.0, 10500.0, 13500.0,
];

/// Number of ISO third-octave bands between ~20 Hz and ~20 kHz
const THIRD_OCTAVE_BANDS: usize = 31;

/// Index of the 1 kHz band within the third-octave layout
const THIRD_OCTAVE_REFERENCE_BAND: i32 = 17;

// Slaney mel constants: linear below 1 kHz, logarithmic above
const SLANEY_HZ_PER_MEL: f64 = 200.0 / 3.0;
const SLANEY_BREAK_HZ: f64 = 1000.0;
const SLANEY_BREAK_MEL: f64 = SLANEY_BREAK_HZ / SLANEY_HZ_PER_MEL;

fn slaney_log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

// ============================================================================
// Frequency Scale
// ============================================================================

/// Hz ↔ perceptual-unit warping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyScale {
    /// Traunmüller's Bark approximation
    #[default]
    BarkTraunmuller,
    /// Schroeder's Bark approximation (7 asinh(f / 650))
    BarkSchroeder,
    /// Wang's Bark approximation (6 asinh(f / 600))
    BarkWang,
    /// HTK mel (2595 log10(1 + f / 700))
    MelHtk,
    /// Slaney mel (linear below 1 kHz, logarithmic above)
    MelSlaney,
    /// Identity
    Linear,
    /// Natural logarithm of Hz
    Log,
}

impl FrequencyScale {
    /// All supported scales
    pub const ALL: [FrequencyScale; 7] = [
        FrequencyScale::BarkTraunmuller,
        FrequencyScale::BarkSchroeder,
        FrequencyScale::BarkWang,
        FrequencyScale::MelHtk,
        FrequencyScale::MelSlaney,
        FrequencyScale::Linear,
        FrequencyScale::Log,
    ];

    /// Configuration name of the scale
    pub fn name(&self) -> &'static str {
        match self {
            FrequencyScale::BarkTraunmuller => "bark_traunmuller",
            FrequencyScale::BarkSchroeder => "bark_schroeder",
            FrequencyScale::BarkWang => "bark_wang",
            FrequencyScale::MelHtk => "mel_htk",
            FrequencyScale::MelSlaney => "mel_slaney",
            FrequencyScale::Linear => "linear",
            FrequencyScale::Log => "log",
        }
    }

    /// Convert a frequency in Hz to scale units
    pub fn hz_to_scale(&self, hz: f64) -> f64 {
        match self {
            FrequencyScale::BarkTraunmuller => 26.81 * hz / (1960.0 + hz) - 0.53,
            FrequencyScale::BarkSchroeder => 7.0 * (hz / 650.0).asinh(),
            FrequencyScale::BarkWang => 6.0 * (hz / 600.0).asinh(),
            FrequencyScale::MelHtk => 2595.0 * (1.0 + hz / 700.0).log10(),
            FrequencyScale::MelSlaney => {
                if hz < SLANEY_BREAK_HZ {
                    hz / SLANEY_HZ_PER_MEL
                } else {
                    SLANEY_BREAK_MEL + (hz / SLANEY_BREAK_HZ).ln() / slaney_log_step()
                }
            }
            FrequencyScale::Linear => hz,
            FrequencyScale::Log => hz.ln(),
        }
    }

    /// Convert scale units back to Hz
    pub fn scale_to_hz(&self, value: f64) -> f64 {
        match self {
            FrequencyScale::BarkTraunmuller => 1960.0 * (value + 0.53) / (26.28 - value),
            FrequencyScale::BarkSchroeder => 650.0 * (value / 7.0).sinh(),
            FrequencyScale::BarkWang => 600.0 * (value / 6.0).sinh(),
            FrequencyScale::MelHtk => 700.0 * (10.0_f64.powf(value / 2595.0) - 1.0),
            FrequencyScale::MelSlaney => {
                if value < SLANEY_BREAK_MEL {
                    value * SLANEY_HZ_PER_MEL
                } else {
                    SLANEY_BREAK_HZ * (slaney_log_step() * (value - SLANEY_BREAK_MEL)).exp()
                }
            }
            FrequencyScale::Linear => value,
            FrequencyScale::Log => value.exp(),
        }
    }

    /// `count` frequencies in Hz, equally spaced in scale units from `f_min`
    /// to `f_max` inclusive
    ///
    /// # Errors
    /// * `Configuration` - If the range is empty, negative, non-finite, or
    ///   starts at 0 Hz on the logarithmic scale
    pub fn break_points(&self, count: usize, f_min: f64, f_max: f64) -> Result<Vec<f64>> {
        self.validate_range(f_min, f_max)?;
        if count < 2 {
            return Err(EqError::config(format!(
                "at least 2 break points are needed, got {}",
                count
            )));
        }

        let lo = self.hz_to_scale(f_min);
        let hi = self.hz_to_scale(f_max);
        let step = (hi - lo) / (count - 1) as f64;
        let mut points: Vec<f64> = (0..count)
            .map(|i| self.scale_to_hz(lo + step * i as f64))
            .collect();
        // Pin the ends so round-off in the warp never moves them
        points[0] = f_min;
        points[count - 1] = f_max;
        Ok(points)
    }

    fn validate_range(&self, f_min: f64, f_max: f64) -> Result<()> {
        if !f_min.is_finite() || !f_max.is_finite() {
            return Err(EqError::config(format!(
                "frequency range must be finite, got {}..{}",
                f_min, f_max
            )));
        }
        if f_min < 0.0 || f_min >= f_max {
            return Err(EqError::config(format!(
                "invalid frequency range {} Hz..{} Hz",
                f_min, f_max
            )));
        }
        if *self == FrequencyScale::Log && f_min <= 0.0 {
            return Err(EqError::config("the log scale needs f_min > 0 Hz"));
        }
        Ok(())
    }
}

impl fmt::Display for FrequencyScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrequencyScale {
    type Err = EqError;

    fn from_str(s: &str) -> Result<Self> {
        FrequencyScale::ALL
            .into_iter()
            .find(|scale| scale.name() == s)
            .ok_or_else(|| {
                EqError::config(format!(
                    "unknown frequency scale '{}' (expected one of: {})",
                    s,
                    FrequencyScale::ALL.map(|sc| sc.name()).join(", ")
                ))
            })
    }
}

// ============================================================================
// Band Layout
// ============================================================================

/// One graphic-EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Center frequency in Hz
    pub center_hz: f64,
    /// Bandwidth in Hz
    pub bandwidth_hz: f64,
}

/// How the graphic equalizer splits the spectrum into bands
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandLayout {
    /// 24 Zwicker critical bands
    #[default]
    Bark,
    /// 31 ISO third-octave bands
    #[serde(alias = "third_octave")]
    ThirdOct,
    /// `n_bands` bands with equal width in the units of `scale`
    Warped {
        scale: FrequencyScale,
        n_bands: usize,
        f_min: f64,
        f_max: f64,
    },
}

impl BandLayout {
    /// Number of bands this layout produces
    pub fn num_bands(&self) -> usize {
        match self {
            BandLayout::Bark => BARK_CENTERS_HZ.len(),
            BandLayout::ThirdOct => THIRD_OCTAVE_BANDS,
            BandLayout::Warped { n_bands, .. } => *n_bands,
        }
    }

    /// Per-band center frequency and bandwidth, ascending in frequency
    ///
    /// # Errors
    /// * `Configuration` - If a warped layout has no bands or an invalid range
    pub fn bands(&self) -> Result<Vec<Band>> {
        match self {
            BandLayout::Bark => Ok(BARK_CENTERS_HZ
                .iter()
                .zip(BARK_EDGES_HZ.windows(2))
                .map(|(&center_hz, edges)| Band {
                    center_hz,
                    bandwidth_hz: edges[1] - edges[0],
                })
                .collect()),
            BandLayout::ThirdOct => {
                let half_band = 2.0_f64.powf(1.0 / 6.0);
                Ok((0..THIRD_OCTAVE_BANDS as i32)
                    .map(|k| {
                        let exponent = (k - THIRD_OCTAVE_REFERENCE_BAND) as f64 / 3.0;
                        let center_hz = 1000.0 * 2.0_f64.powf(exponent);
                        Band {
                            center_hz,
                            bandwidth_hz: center_hz * (half_band - 1.0 / half_band),
                        }
                    })
                    .collect())
            }
            BandLayout::Warped {
                scale,
                n_bands,
                f_min,
                f_max,
            } => {
                if *n_bands == 0 {
                    return Err(EqError::config("a warped band layout needs at least 1 band"));
                }
                let edges = scale.break_points(n_bands + 1, *f_min, *f_max)?;
                Ok(edges
                    .windows(2)
                    .map(|e| {
                        let mid = 0.5 * (scale.hz_to_scale(e[0]) + scale.hz_to_scale(e[1]));
                        Band {
                            center_hz: scale.scale_to_hz(mid),
                            bandwidth_hz: e[1] - e[0],
                        }
                    })
                    .collect())
            }
        }
    }
}

impl FromStr for BandLayout {
    type Err = EqError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bark" => Ok(BandLayout::Bark),
            "third_oct" | "third_octave" => Ok(BandLayout::ThirdOct),
            other => Err(EqError::config(format!(
                "unknown band layout '{}' (expected 'bark' or 'third_oct')",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test_case(FrequencyScale::BarkTraunmuller ; "bark traunmuller")]
    #[test_case(FrequencyScale::BarkSchroeder ; "bark schroeder")]
    #[test_case(FrequencyScale::BarkWang ; "bark wang")]
    #[test_case(FrequencyScale::MelHtk ; "mel htk")]
    #[test_case(FrequencyScale::MelSlaney ; "mel slaney")]
    #[test_case(FrequencyScale::Linear ; "linear")]
    #[test_case(FrequencyScale::Log ; "log")]
    fn test_warp_is_invertible_and_monotonic(scale: FrequencyScale) {
        let mut previous = f64::NEG_INFINITY;
        for hz in [40.0, 100.0, 440.0, 999.0, 1000.0, 1001.0, 4000.0, 16000.0] {
            let units = scale.hz_to_scale(hz);
            assert!(units > previous, "{} is not increasing at {} Hz", scale, hz);
            previous = units;
            assert_relative_eq!(scale.scale_to_hz(units), hz, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_known_values() {
        assert_relative_eq!(FrequencyScale::MelHtk.hz_to_scale(700.0), 2595.0 * 2.0_f64.log10());
        assert_relative_eq!(FrequencyScale::MelSlaney.hz_to_scale(1000.0), 15.0);
        assert_relative_eq!(FrequencyScale::MelSlaney.hz_to_scale(6400.0), 42.0, epsilon = 1e-9);
    }

    #[test]
    fn test_break_points_pin_the_range() {
        let points = FrequencyScale::MelHtk.break_points(10, 40.0, 16000.0).unwrap();
        assert_eq!(points.len(), 10);
        assert_eq!(points[0], 40.0);
        assert_eq!(points[9], 16000.0);
        assert!(points.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_break_points_reject_bad_ranges() {
        assert!(FrequencyScale::Linear.break_points(4, 100.0, 100.0).is_err());
        assert!(FrequencyScale::Linear.break_points(4, -1.0, 100.0).is_err());
        assert!(FrequencyScale::Log.break_points(4, 0.0, 100.0).is_err());
        assert!(FrequencyScale::Linear.break_points(1, 0.0, 100.0).is_err());
    }

    #[test]
    fn test_scale_from_str() {
        assert_eq!("mel_slaney".parse::<FrequencyScale>().unwrap(), FrequencyScale::MelSlaney);
        let err = "mel_unknown".parse::<FrequencyScale>().unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_bark_layout() {
        let bands = BandLayout::Bark.bands().unwrap();
        assert_eq!(bands.len(), 24);
        assert_eq!(BandLayout::Bark.num_bands(), 24);
        assert_eq!(bands[0], Band { center_hz: 50.0, bandwidth_hz: 80.0 });
        assert_eq!(bands[23].bandwidth_hz, 3500.0);
    }

    #[test]
    fn test_third_octave_layout() {
        let bands = BandLayout::ThirdOct.bands().unwrap();
        assert_eq!(bands.len(), 31);
        assert_relative_eq!(bands[17].center_hz, 1000.0);
        // Adjacent centers are a third of an octave apart
        assert_relative_eq!(
            bands[18].center_hz / bands[17].center_hz,
            2.0_f64.powf(1.0 / 3.0),
            epsilon = 1e-12
        );
        assert!(bands[0].center_hz > 19.0 && bands[30].center_hz < 20500.0);
    }

    #[test]
    fn test_warped_layout_tiles_the_range() {
        let layout = BandLayout::Warped {
            scale: FrequencyScale::MelHtk,
            n_bands: 8,
            f_min: 50.0,
            f_max: 12000.0,
        };
        let bands = layout.bands().unwrap();
        assert_eq!(bands.len(), 8);
        let total: f64 = bands.iter().map(|b| b.bandwidth_hz).sum();
        assert_relative_eq!(total, 12000.0 - 50.0, epsilon = 1e-6);
        assert!(bands.windows(2).all(|w| w[0].center_hz < w[1].center_hz));
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("third_oct".parse::<BandLayout>().unwrap(), BandLayout::ThirdOct);
        assert!("octave".parse::<BandLayout>().is_err());
    }
}
