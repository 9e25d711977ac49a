//! Per-bin spectral transforms
//!
//! Applied once per hop, in order: shift, tilt, then a per-bin pass of
//! feedback, freeze, smear and scatter. Later stages see the output of
//! earlier ones.

use super::fft::{FFT_SIZE, NUM_BINS};
use crate::random::Random;
use rustfft::num_complex::Complex;
use std::f32::consts::PI;

/// Amounts below this are treated as off
const AMOUNT_EPSILON: f32 = 0.01;

/// Effect amounts for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectralSettings {
    /// 0..1
    pub freeze: f32,
    /// 0..1
    pub smear: f32,
    /// 0..1
    pub scatter: f32,
    /// Octaves, -1..1
    pub shift: f32,
    /// -1..1, positive brightens
    pub tilt: f32,
    /// 0..1
    pub feedback: f32,
}

impl SpectralSettings {
    /// Clamp every amount into its range; non-finite values become 0
    pub fn sanitized(self) -> Self {
        fn clamp(v: f32, lo: f32, hi: f32) -> f32 {
            if v.is_finite() {
                v.clamp(lo, hi)
            } else {
                0.0
            }
        }
        Self {
            freeze: clamp(self.freeze, 0.0, 1.0),
            smear: clamp(self.smear, 0.0, 1.0),
            scatter: clamp(self.scatter, 0.0, 1.0),
            shift: clamp(self.shift, -1.0, 1.0),
            tilt: clamp(self.tilt, -1.0, 1.0),
            feedback: clamp(self.feedback, 0.0, 1.0),
        }
    }
}

/// Perceptual display scaling: `((mag / FFT_SIZE) ^ 0.35) * 10`, clamped to 0..1
#[inline]
pub fn display_magnitude(mag: f32) -> f32 {
    let normalized = (mag / FFT_SIZE as f32).max(0.0);
    (normalized.powf(0.35) * 10.0).clamp(0.0, 1.0)
}

/// Gain applied to bin `i` for a given tilt
#[inline]
fn tilt_gain(bin: usize, tilt: f32) -> f32 {
    let freq_norm = bin as f32 / NUM_BINS as f32;
    let gain = if tilt > 0.0 {
        1.0 + tilt * (freq_norm * 2.0 - 1.0)
    } else {
        1.0 - tilt * (1.0 - freq_norm * 2.0)
    };
    gain.clamp(0.2, 3.0)
}

/// Bin state persisting across frames
pub struct SpectralEffects {
    magnitude: [f32; NUM_BINS],
    phase: [f32; NUM_BINS],
    frozen_magnitude: [f32; NUM_BINS],
    frozen_phase: [f32; NUM_BINS],
    smear_buffer: [f32; NUM_BINS],
    feedback_buffer: [f32; NUM_BINS],
    shifted_magnitude: [f32; NUM_BINS],
    temp_magnitude: [f32; NUM_BINS],
    temp_phase: [f32; NUM_BINS],
}

impl SpectralEffects {
    pub fn new() -> Self {
        Self {
            magnitude: [0.0; NUM_BINS],
            phase: [0.0; NUM_BINS],
            frozen_magnitude: [0.0; NUM_BINS],
            frozen_phase: [0.0; NUM_BINS],
            smear_buffer: [0.0; NUM_BINS],
            feedback_buffer: [0.0; NUM_BINS],
            shifted_magnitude: [0.0; NUM_BINS],
            temp_magnitude: [0.0; NUM_BINS],
            temp_phase: [0.0; NUM_BINS],
        }
    }

    pub fn reset(&mut self) {
        self.magnitude.fill(0.0);
        self.phase.fill(0.0);
        self.frozen_magnitude.fill(0.0);
        self.frozen_phase.fill(0.0);
        self.smear_buffer.fill(0.0);
        self.feedback_buffer.fill(0.0);
        self.shifted_magnitude.fill(0.0);
        self.temp_magnitude.fill(0.0);
        self.temp_phase.fill(0.0);
    }

    /// Output magnitudes of the last frame
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitude
    }

    /// Output phases of the last frame
    pub fn phases(&self) -> &[f32] {
        &self.phase
    }

    /// Frozen magnitude snapshot
    pub fn frozen_magnitudes(&self) -> &[f32] {
        &self.frozen_magnitude
    }

    /// Phase recorded alongside the frozen snapshot
    pub fn frozen_phases(&self) -> &[f32] {
        &self.frozen_phase
    }

    /// Transform `NUM_BINS` bins in place
    ///
    /// Short buffers are a no-op.
    pub fn process(
        &mut self,
        bins: &mut [Complex<f32>],
        settings: &SpectralSettings,
        rng: &mut Random,
    ) {
        if bins.len() < NUM_BINS {
            return;
        }
        let s = settings.sanitized();

        for (i, bin) in bins.iter().take(NUM_BINS).enumerate() {
            self.temp_magnitude[i] = bin.norm();
            self.temp_phase[i] = bin.arg();
        }

        if s.shift.abs() > AMOUNT_EPSILON {
            self.apply_shift(s.shift);
        }

        if s.tilt.abs() > AMOUNT_EPSILON {
            for i in 1..NUM_BINS {
                self.temp_magnitude[i] *= tilt_gain(i, s.tilt);
            }
        }

        for i in 0..NUM_BINS {
            let mut mag = self.temp_magnitude[i];
            let mut ph = self.temp_phase[i];

            if s.feedback > AMOUNT_EPSILON {
                mag += self.feedback_buffer[i] * s.feedback * 0.8;
                self.feedback_buffer[i] = self.feedback_buffer[i] * 0.95 + mag * 0.05;
            } else {
                self.feedback_buffer[i] *= 0.9;
            }

            if s.freeze > AMOUNT_EPSILON {
                // freeze near 1 all but stops the capture
                let capture_rate = 0.05 * (1.0 - s.freeze * 0.95);
                self.frozen_magnitude[i] =
                    self.frozen_magnitude[i] * (1.0 - capture_rate) + mag * capture_rate;
                self.frozen_phase[i] = ph;
                mag = mag * (1.0 - s.freeze) + self.frozen_magnitude[i] * s.freeze;
            }

            if s.smear > AMOUNT_EPSILON {
                let decay = 0.85 + s.smear * 0.145;
                self.smear_buffer[i] = (self.smear_buffer[i] * decay).max(mag);
                let blend = s.smear * 0.9;
                mag = mag * (1.0 - blend) + self.smear_buffer[i] * blend;
            } else {
                self.smear_buffer[i] *= 0.8;
            }

            if s.scatter > AMOUNT_EPSILON {
                ph += rng.next_bipolar() * PI * s.scatter;

                if i > 1 && i < NUM_BINS - 2 {
                    let blur = s.scatter * 0.5;
                    let t = &self.temp_magnitude;
                    let neighbours = (t[i - 2] + t[i - 1] + t[i + 1] + t[i + 2]) * 0.25;
                    mag = mag * (1.0 - blur) + neighbours * blur;
                }
            }

            self.magnitude[i] = mag;
            self.phase[i] = ph;
            bins[i] = Complex::from_polar(mag, ph);
        }
    }

    /// Move magnitude from bin `i` to `round(i * 2^shift)`, blended by `|shift|`
    fn apply_shift(&mut self, shift: f32) {
        self.shifted_magnitude.fill(0.0);
        let ratio = 2.0f32.powf(shift);

        for i in 1..NUM_BINS - 1 {
            let target = (i as f32 * ratio).round() as usize;
            if target > 0 && target < NUM_BINS - 1 {
                self.shifted_magnitude[target] += self.temp_magnitude[i];
            }
        }

        let blend = shift.abs();
        for (mag, shifted) in self.temp_magnitude.iter_mut().zip(&self.shifted_magnitude) {
            *mag = *mag * (1.0 - blend) + shifted * blend;
        }
    }
}

impl Default for SpectralEffects {
    fn default() -> Self {
        Self::new()
    }
}
