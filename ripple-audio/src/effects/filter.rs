//! Biquad bandpass (RBJ cookbook, constant 0 dB peak gain)
//!
//! Coefficients and per-channel state are separate so one set of
//! coefficients can drive both channels of a band.

use std::f32::consts::PI;

/// Normalized biquad coefficients (`a0` folded in)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoefficients {
    /// Pass-through
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Bandpass centred on `frequency` Hz
    ///
    /// The centre is kept below 0.45 × sample rate and Q is floored at 0.1,
    /// so the result is always stable.
    pub fn bandpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        if !sample_rate.is_finite()
            || sample_rate <= 0.0
            || !frequency.is_finite()
            || !q.is_finite()
        {
            return Self::IDENTITY;
        }
        let frequency = frequency.clamp(1.0, sample_rate * 0.45);
        let q = q.max(0.1);

        let omega = 2.0 * PI * frequency / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: alpha / a0,
            b1: 0.0,
            b2: -alpha / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Magnitude response at `frequency` Hz
    #[cfg(test)]
    pub fn magnitude_at(&self, frequency: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        if den <= f32::EPSILON {
            0.0
        } else {
            num / den
        }
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Direct form I state for one channel
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    pub fn process(&mut self, c: &BiquadCoefficients, input: f32) -> f32 {
        let output =
            c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
