//! Eight-line feedback delay network reverb
//!
//! Each sample: read all lines, damp each read with a one-pole low-pass,
//! mix the damped reads through a normalized 8×8 Hadamard matrix, scale by
//! the per-line feedback gain, add the input (lines 0-3 take left, 4-7 take
//! right) and write back. Left output averages lines 0-3, right 4-7.

use super::Effect;
use crate::smoothing::{SmoothedValue, DEFAULT_RAMP_SECS};

/// Number of delay lines
pub const FDN_SIZE: usize = 8;

/// Line lengths in milliseconds at size 1
pub const BASE_DELAYS_MS: [f32; FDN_SIZE] = [29.7, 37.1, 41.1, 43.7, 53.3, 59.9, 67.7, 79.3];

/// Upper bound on every per-line feedback gain
pub const MAX_FEEDBACK: f32 = 0.95;

/// Damping 1 maps to this one-pole coefficient; at 1.0 the filter would hold
/// its state and the tail would never decay
const MAX_DAMPING_COEFF: f32 = 0.99;

/// Smallest size scale, keeping every line at least a few samples long
const MIN_SIZE_SCALE: f32 = 0.05;

/// 1/√8: makes the Sylvester Hadamard matrix orthonormal
const HADAMARD_SCALE: f32 = 0.353_553_4;

#[inline]
fn butterfly(buf: &mut [f32; FDN_SIZE], i: usize, j: usize) {
    let sum = buf[i] + buf[j];
    let diff = buf[i] - buf[j];
    buf[i] = sum;
    buf[j] = diff;
}

/// Multiply by `H[i][j] = (-1)^popcount(i & j) / √8` in place
#[inline]
pub fn hadamard8(buf: &mut [f32; FDN_SIZE]) {
    for &stride in &[1usize, 2, 4] {
        for block in (0..FDN_SIZE).step_by(stride * 2) {
            for i in block..block + stride {
                butterfly(buf, i, i + stride);
            }
        }
    }
    for x in buf.iter_mut() {
        *x *= HADAMARD_SCALE;
    }
}

/// Decay time in seconds for a size setting
#[inline]
pub fn decay_time(size: f32) -> f32 {
    0.3 + 4.7 * size.clamp(0.0, 1.0)
}

/// Feedback giving -60 dB after `decay_secs` for a line of `delay_ms`
#[inline]
pub fn line_feedback(delay_ms: f32, decay_secs: f32) -> f32 {
    if decay_secs <= 0.0 {
        return 0.0;
    }
    10.0f32
        .powf(-3.0 * delay_ms / 1000.0 / decay_secs)
        .clamp(0.0, MAX_FEEDBACK)
}

/// Circular buffer with a fixed capacity and a variable read offset
struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    delay: usize,
    damping_state: f32,
}

impl DelayLine {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            delay: 1,
            damping_state: 0.0,
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn set_delay(&mut self, delay: usize) {
        self.delay = delay.clamp(1, self.capacity() - 1);
    }

    /// Read the sample written `delay` samples ago, damped
    #[inline]
    fn read_damped(&mut self, damping: f32) -> f32 {
        let cap = self.capacity();
        let idx = (self.write_pos + cap - self.delay) % cap;
        let out = self.buffer[idx];
        self.damping_state = out * (1.0 - damping) + self.damping_state * damping;
        self.damping_state
    }

    #[inline]
    fn write(&mut self, value: f32) {
        self.buffer[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % self.capacity();
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.damping_state = 0.0;
    }
}

/// Stereo FDN reverb
pub struct FdnReverb {
    lines: [DelayLine; FDN_SIZE],
    feedback: [f32; FDN_SIZE],
    sample_rate: f32,
    size: f32,
    damping: f32,
    damping_coeff: f32,
    mix: SmoothedValue,
    enabled: bool,
}

impl FdnReverb {
    pub fn new(sample_rate: f32) -> Self {
        let mut reverb = Self {
            lines: std::array::from_fn(|_| DelayLine::new(2)),
            feedback: [0.0; FDN_SIZE],
            sample_rate,
            size: 0.5,
            damping: 0.5,
            damping_coeff: 0.5 * MAX_DAMPING_COEFF,
            mix: SmoothedValue::new(0.3),
            enabled: false,
        };
        reverb.prepare(sample_rate);
        reverb
    }

    /// Allocate lines for the longest delay at this rate and clear state
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        let longest_ms = BASE_DELAYS_MS.iter().fold(0.0f32, |m, &d| m.max(d));
        let capacity = (longest_ms / 1000.0 * self.sample_rate).ceil() as usize + 2;
        self.lines = std::array::from_fn(|_| DelayLine::new(capacity));
        self.mix.reset(self.sample_rate, DEFAULT_RAMP_SECS);
        self.update_lines();
    }

    /// Line capacity in samples
    pub fn capacity(&self) -> usize {
        self.lines[0].capacity()
    }

    /// Room size 0..1; scales every line and the decay time
    pub fn set_size(&mut self, size: f32) {
        let size = if size.is_finite() { size.clamp(0.0, 1.0) } else { 0.5 };
        if size != self.size {
            self.size = size;
            self.update_lines();
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// High-frequency damping 0..1
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = if damping.is_finite() {
            damping.clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.damping_coeff = self.damping * MAX_DAMPING_COEFF;
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn set_mix(&mut self, mix: f32) {
        let mix = if mix.is_finite() { mix.clamp(0.0, 1.0) } else { 0.3 };
        self.mix.set_target(mix);
    }

    pub fn mix(&self) -> f32 {
        self.mix.target()
    }

    /// Current delay lengths in samples
    pub fn delays(&self) -> [usize; FDN_SIZE] {
        std::array::from_fn(|i| self.lines[i].delay)
    }

    pub fn feedback_gains(&self) -> &[f32; FDN_SIZE] {
        &self.feedback
    }

    fn update_lines(&mut self) {
        let scale = self.size.max(MIN_SIZE_SCALE);
        let decay = decay_time(self.size);
        for (i, line) in self.lines.iter_mut().enumerate() {
            let delay_ms = BASE_DELAYS_MS[i] * scale;
            let samples = (delay_ms / 1000.0 * self.sample_rate).round() as usize;
            line.set_delay(samples);
            self.feedback[i] = line_feedback(delay_ms, decay);
        }
    }

    #[inline]
    fn process_sample(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut reads = [0.0f32; FDN_SIZE];
        for (r, line) in reads.iter_mut().zip(self.lines.iter_mut()) {
            *r = line.read_damped(self.damping_coeff);
        }

        let mut mixed = reads;
        hadamard8(&mut mixed);

        for (i, line) in self.lines.iter_mut().enumerate() {
            let input = if i < FDN_SIZE / 2 { left } else { right };
            line.write(mixed[i] * self.feedback[i] + input);
        }

        let out_l = (reads[0] + reads[1] + reads[2] + reads[3]) * 0.25;
        let out_r = (reads[4] + reads[5] + reads[6] + reads[7]) * 0.25;
        (out_l, out_r)
    }
}

impl Effect for FdnReverb {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.enabled {
            self.mix.skip(left.len() as u32);
            return;
        }

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.next();
            let (wet_l, wet_r) = self.process_sample(*l, *r);
            *l = *l * (1.0 - mix) + wet_l * mix;
            *r = *r * (1.0 - mix) + wet_r * mix;
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
        self.mix.set_current_and_target(self.mix.target());
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        // Tails are kept so re-enabling does not click
    }
}
