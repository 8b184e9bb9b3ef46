//! Second-order low-pass filter (direct form II transposed, Q = 0.707).

use core::f32::consts::PI;

/// Butterworth quality factor.
const Q: f32 = 0.707;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Biquad {
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Low-pass with cutoff `frequency` given as a fraction of the sample
    /// rate (cutoff Hz / loop Hz).
    pub fn lowpass(frequency: f32) -> Self {
        let k = (PI * frequency).tan();
        let norm = 1.0 / (1.0 + k / Q + k * k);
        let a0 = k * k * norm;
        Self {
            a0,
            a1: 2.0 * a0,
            a2: a0,
            b1: 2.0 * (k * k - 1.0) * norm,
            b2: (1.0 - k / Q + k * k) * norm,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let out = input * self.a0 + self.z1;
        self.z1 = input * self.a1 + self.z2 - self.b1 * out;
        self.z2 = input * self.a2 - self.b2 * out;
        out
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
