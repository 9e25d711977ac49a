//! Ripple filter bank
//!
//! Sixteen fixed bandpass filters, 31.5 Hz to 16 kHz on a log scale, per
//! channel. A wave travels across the bands: once per block each band's gain
//! is recomputed from its log-frequency position and the wave phase, then
//! every sample is split into bands, weighted, summed and mixed with dry.

use super::filter::{BiquadCoefficients, BiquadState};
use super::{Effect, NUM_RIPPLE_BANDS};
use crate::smoothing::{SmoothedValue, DEFAULT_RAMP_SECS};
use std::f32::consts::TAU;

/// Lowest band centre in Hz
pub const LOWEST_BAND_HZ: f32 = 31.5;
/// Highest band centre in Hz
pub const HIGHEST_BAND_HZ: f32 = 16000.0;
/// Bandwidth of every band
pub const BAND_Q: f32 = 2.0;
/// Right-channel band offset at width 2
const MAX_BAND_OFFSET: f32 = 4.0;

/// Centre frequency of band `band`
pub fn band_frequency(band: usize) -> f32 {
    let t = band as f32 / (NUM_RIPPLE_BANDS - 1) as f32;
    LOWEST_BAND_HZ * (HIGHEST_BAND_HZ / LOWEST_BAND_HZ).powf(t)
}

/// Position of `frequency` on the band range, 0 at the lowest band and 1 at the highest
fn log_position(frequency: f32) -> f32 {
    (frequency / LOWEST_BAND_HZ).ln() / (HIGHEST_BAND_HZ / LOWEST_BAND_HZ).ln()
}

/// Wave gain for a band position: primary sine plus a tripled "ripple within ripple"
pub fn ripple_gain(position: f32, multiply: f32, amount: f32, wave_phase: f32) -> f32 {
    let x = position * multiply + wave_phase;
    let primary = (TAU * x).sin();
    let secondary = amount * (TAU * 3.0 * x).sin();
    let combined = primary * 0.7 + secondary * 0.3;
    (0.5 + 0.5 * combined).clamp(0.0, 1.0)
}

/// Per-block ripple controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleSettings {
    /// Wave speed in Hz
    pub rate: f32,
    /// Wave cycles across the band range
    pub multiply: f32,
    /// Weight of the tripled component
    pub amount: f32,
    /// 0..2; above 1 the right channel reads bands further along the wave
    pub width: f32,
    /// Bands below this stay at full gain
    pub low_bypass: f32,
    /// Bands above this stay at full gain
    pub high_bypass: f32,
    pub mix: f32,
}

impl Default for RippleSettings {
    fn default() -> Self {
        Self {
            rate: 0.5,
            multiply: 1.0,
            amount: 0.5,
            width: 1.0,
            low_bypass: 20.0,
            high_bypass: 20000.0,
            mix: 1.0,
        }
    }
}

impl RippleSettings {
    fn sanitized(self) -> Self {
        fn clamp(v: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
            if v.is_finite() {
                v.clamp(lo, hi)
            } else {
                fallback
            }
        }
        let d = Self::default();
        Self {
            rate: clamp(self.rate, 0.01, 20.0, d.rate),
            multiply: clamp(self.multiply, 0.1, 8.0, d.multiply),
            amount: clamp(self.amount, 0.0, 1.0, d.amount),
            width: clamp(self.width, 0.0, 2.0, d.width),
            low_bypass: clamp(self.low_bypass, 20.0, 20000.0, d.low_bypass),
            high_bypass: clamp(self.high_bypass, 20.0, 20000.0, d.high_bypass),
            mix: clamp(self.mix, 0.0, 1.0, d.mix),
        }
    }
}

/// Sixteen-band traveling-wave filter bank
pub struct RippleBank {
    sample_rate: f32,
    frequencies: [f32; NUM_RIPPLE_BANDS],
    positions: [f32; NUM_RIPPLE_BANDS],
    coefficients: [BiquadCoefficients; NUM_RIPPLE_BANDS],
    state_l: [BiquadState; NUM_RIPPLE_BANDS],
    state_r: [BiquadState; NUM_RIPPLE_BANDS],
    gains_l: [f32; NUM_RIPPLE_BANDS],
    gains_r: [f32; NUM_RIPPLE_BANDS],
    wave_phase: f32,
    settings: RippleSettings,
    mix: SmoothedValue,
    enabled: bool,
}

impl RippleBank {
    pub fn new(sample_rate: f32) -> Self {
        let frequencies: [f32; NUM_RIPPLE_BANDS] = std::array::from_fn(band_frequency);
        let settings = RippleSettings::default();
        let mut bank = Self {
            sample_rate,
            frequencies,
            positions: std::array::from_fn(|i| log_position(frequencies[i])),
            coefficients: [BiquadCoefficients::IDENTITY; NUM_RIPPLE_BANDS],
            state_l: [BiquadState::default(); NUM_RIPPLE_BANDS],
            state_r: [BiquadState::default(); NUM_RIPPLE_BANDS],
            gains_l: [0.5; NUM_RIPPLE_BANDS],
            gains_r: [0.5; NUM_RIPPLE_BANDS],
            wave_phase: 0.0,
            settings,
            mix: SmoothedValue::new(settings.mix),
            enabled: true,
        };
        bank.prepare(sample_rate);
        bank
    }

    /// Rebuild coefficients for a sample rate and clear state
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for (c, &f) in self.coefficients.iter_mut().zip(&self.frequencies) {
            *c = BiquadCoefficients::bandpass(f, BAND_Q, sample_rate);
        }
        self.mix.reset(sample_rate, DEFAULT_RAMP_SECS);
        self.reset();
    }

    pub fn set_settings(&mut self, settings: RippleSettings) {
        self.settings = settings.sanitized();
        self.mix.set_target(self.settings.mix);
    }

    pub fn settings(&self) -> &RippleSettings {
        &self.settings
    }

    /// Left-channel band gains from the last block
    pub fn band_gains(&self) -> &[f32; NUM_RIPPLE_BANDS] {
        &self.gains_l
    }

    /// Right-channel band gains from the last block
    pub fn band_gains_right(&self) -> &[f32; NUM_RIPPLE_BANDS] {
        &self.gains_r
    }

    pub fn band_frequencies(&self) -> &[f32; NUM_RIPPLE_BANDS] {
        &self.frequencies
    }

    pub fn wave_phase(&self) -> f32 {
        self.wave_phase
    }

    /// Band offset for the right channel
    pub fn stereo_offset(&self) -> usize {
        let extra = (self.settings.width - 1.0).max(0.0);
        (extra * MAX_BAND_OFFSET).round() as usize
    }

    fn is_bypassed(&self, band: usize) -> bool {
        let f = self.frequencies[band];
        f < self.settings.low_bypass || f > self.settings.high_bypass
    }

    /// Recompute band gains from the current wave phase
    fn update_gains(&mut self) {
        let s = self.settings;
        let offset = self.stereo_offset();
        let mut raw = [0.0f32; NUM_RIPPLE_BANDS];
        for (g, &pos) in raw.iter_mut().zip(&self.positions) {
            *g = ripple_gain(pos, s.multiply, s.amount, self.wave_phase);
        }

        for band in 0..NUM_RIPPLE_BANDS {
            if self.is_bypassed(band) {
                self.gains_l[band] = 1.0;
                self.gains_r[band] = 1.0;
            } else {
                self.gains_l[band] = raw[band];
                self.gains_r[band] = raw[(band + offset) % NUM_RIPPLE_BANDS];
            }
        }
    }

    fn advance_phase(&mut self, num_samples: usize) {
        if self.sample_rate <= 0.0 {
            return;
        }
        self.wave_phase += self.settings.rate / self.sample_rate * num_samples as f32;
        self.wave_phase -= self.wave_phase.floor();
    }
}

impl Effect for RippleBank {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let num_samples = left.len().min(right.len());
        if num_samples == 0 {
            return;
        }

        self.update_gains();
        self.advance_phase(num_samples);

        if !self.enabled {
            self.mix.skip(num_samples as u32);
            return;
        }

        // Below unit width the wet pair is narrowed toward its mid
        let narrow = self.settings.width.min(1.0);

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.next();
            let dry_l = *l;
            let dry_r = *r;

            let mut wet_l = 0.0;
            let mut wet_r = 0.0;
            for band in 0..NUM_RIPPLE_BANDS {
                let c = &self.coefficients[band];
                wet_l += self.state_l[band].process(c, dry_l) * self.gains_l[band];
                wet_r += self.state_r[band].process(c, dry_r) * self.gains_r[band];
            }

            let mid = (wet_l + wet_r) * 0.5;
            wet_l = mid + (wet_l - mid) * narrow;
            wet_r = mid + (wet_r - mid) * narrow;

            *l = dry_l * (1.0 - mix) + wet_l * mix;
            *r = dry_r * (1.0 - mix) + wet_r * mix;
        }
    }

    fn reset(&mut self) {
        for s in self.state_l.iter_mut().chain(self.state_r.iter_mut()) {
            s.reset();
        }
        self.wave_phase = 0.0;
        self.gains_l = [0.5; NUM_RIPPLE_BANDS];
        self.gains_r = [0.5; NUM_RIPPLE_BANDS];
        self.mix.set_current_and_target(self.settings.mix);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
