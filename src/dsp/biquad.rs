//! Second-order sections and cascades
//!
//! Transfer function of one section:
//! H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
//! Sections are stored normalized so that a0 = 1.

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Tolerance for treating a section as a pass-through
const IDENTITY_TOLERANCE: f64 = 1e-12;

/// One biquad stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadSection {
    /// Numerator (b0, b1, b2)
    pub b: [f64; 3],
    /// Denominator (a0, a1, a2), a0 = 1
    pub a: [f64; 3],
}

impl Default for BiquadSection {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadSection {
    /// Build a section and normalize it by a0
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        Self {
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            a: [1.0, a[1] / a0, a[2] / a0],
        }
    }

    /// Pass-through section
    pub fn identity() -> Self {
        Self {
            b: [1.0, 0.0, 0.0],
            a: [1.0, 0.0, 0.0],
        }
    }

    /// Check if the section leaves the signal unchanged (numerator == denominator)
    pub fn is_identity(&self) -> bool {
        self.b
            .iter()
            .zip(&self.a)
            .all(|(b, a)| (b - a).abs() < IDENTITY_TOLERANCE)
    }

    /// Check if every coefficient is finite
    pub fn is_finite(&self) -> bool {
        self.b.iter().chain(&self.a).all(|c| c.is_finite())
    }

    /// Complex response at normalized angular frequency `omega` (radians/sample)
    pub fn response(&self, omega: f64) -> Complex<f64> {
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let den = self.a[0] + z1 * self.a[1] + z2 * self.a[2];
        num / den
    }

    /// Filter `signal` in place (direct form I, zero initial state)
    pub fn filter_in_place(&self, signal: &mut [f64]) {
        let mut state = BiquadState::default();
        for sample in signal.iter_mut() {
            *sample = state.process(*sample, self);
        }
    }
}

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl BiquadState {
    /// Process a single sample through the section
    #[inline]
    fn process(&mut self, input: f64, section: &BiquadSection) -> f64 {
        let [b0, b1, b2] = section.b;
        let [_, a1, a2] = section.a;
        let output = b0 * input + b1 * self.x1 + b2 * self.x2 - a1 * self.y1 - a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Ordered series of biquad stages, one per band in ascending band order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BiquadCascade {
    pub sections: Vec<BiquadSection>,
}

impl BiquadCascade {
    /// Wrap an ordered list of sections
    pub fn new(sections: Vec<BiquadSection>) -> Self {
        Self { sections }
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Check if the cascade has no sections
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Check if every section is a pass-through
    pub fn is_identity(&self) -> bool {
        self.sections.iter().all(BiquadSection::is_identity)
    }

    /// Complex response of the whole cascade at `omega` (radians/sample)
    pub fn response(&self, omega: f64) -> Complex<f64> {
        self.sections
            .iter()
            .fold(Complex::new(1.0, 0.0), |acc, s| acc * s.response(omega))
    }

    /// Apply every non-identity section in series, in place
    pub fn filter_in_place(&self, signal: &mut [f64]) {
        for section in self.sections.iter().filter(|s| !s.is_identity()) {
            section.filter_in_place(signal);
        }
    }
}
