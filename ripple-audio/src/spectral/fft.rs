//! Windowed real FFT over a fixed 1024-sample frame
//!
//! Forward: `FFT_SIZE` windowed real samples -> `NUM_BINS` complex bins.
//! Inverse: `NUM_BINS` bins -> `FFT_SIZE` real samples, normalized by
//! `1 / FFT_SIZE` so that inverse(forward(x)) == x.
//!
//! The full-length complex transform is used with Hermitian reconstruction
//! on the way back; the plans and scratch are built once at construction.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// log2 of the frame length
pub const FFT_ORDER: usize = 10;
/// Frame length in samples
pub const FFT_SIZE: usize = 1 << FFT_ORDER;
/// Positive-frequency bins including DC and Nyquist
pub const NUM_BINS: usize = FFT_SIZE / 2 + 1;
/// Frames overlapping at any sample (75% overlap)
pub const OVERLAP: usize = 4;
/// Samples between successive frames
pub const HOP_SIZE: usize = FFT_SIZE / OVERLAP;

/// Periodic Hann window: `0.5 - 0.5 cos(2πi/N)`
pub fn hann_window(size: usize) -> Vec<f32> {
    if size == 0 {
        return Vec::new();
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Gain that makes analysis+synthesis windowing sum to unity at `overlap`
///
/// `1 / (overlap * mean(w²))`; 2/3 for a periodic Hann at 4x overlap.
pub fn overlap_gain_correction(window: &[f32], overlap: usize) -> f32 {
    if window.is_empty() || overlap == 0 {
        return 1.0;
    }
    let mean_sq = window.iter().map(|w| w * w).sum::<f32>() / window.len() as f32;
    if mean_sq <= f32::EPSILON {
        return 1.0;
    }
    1.0 / (overlap as f32 * mean_sq)
}

/// Forward/inverse transform pair with a shared Hann window
pub struct WindowedFft {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    gain_correction: f32,
    work: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    norm_factor: f32,
}

impl WindowedFft {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(FFT_SIZE);
        let inverse = planner.plan_fft_inverse(FFT_SIZE);

        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        let window = hann_window(FFT_SIZE);
        let gain_correction = overlap_gain_correction(&window, OVERLAP);

        Self {
            forward,
            inverse,
            window,
            gain_correction,
            work: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            norm_factor: 1.0 / FFT_SIZE as f32,
        }
    }

    #[inline]
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    #[inline]
    pub fn gain_correction(&self) -> f32 {
        self.gain_correction
    }

    /// Multiply a frame by the analysis window
    pub fn apply_window(&self, frame: &mut [f32]) {
        for (s, w) in frame.iter_mut().zip(&self.window) {
            *s *= w;
        }
    }

    /// Multiply a frame by the synthesis window and the overlap gain correction
    pub fn apply_synthesis_window(&self, frame: &mut [f32]) {
        let gain = self.gain_correction;
        for (s, w) in frame.iter_mut().zip(&self.window) {
            *s *= w * gain;
        }
    }

    /// Transform `FFT_SIZE` real samples into `NUM_BINS` bins
    ///
    /// Short buffers are a no-op.
    pub fn forward(&mut self, frame: &[f32], bins: &mut [Complex<f32>]) {
        if frame.len() < FFT_SIZE || bins.len() < NUM_BINS {
            return;
        }

        for (w, &s) in self.work.iter_mut().zip(frame) {
            *w = Complex::new(s, 0.0);
        }

        self.forward.process_with_scratch(&mut self.work, &mut self.scratch);

        bins[..NUM_BINS].copy_from_slice(&self.work[..NUM_BINS]);
    }

    /// Transform `NUM_BINS` bins back into `FFT_SIZE` real samples
    ///
    /// Short buffers are a no-op.
    pub fn inverse(&mut self, bins: &[Complex<f32>], frame: &mut [f32]) {
        if frame.len() < FFT_SIZE || bins.len() < NUM_BINS {
            return;
        }

        // Rebuild the negative frequencies from Hermitian symmetry
        self.work[..NUM_BINS].copy_from_slice(&bins[..NUM_BINS]);
        for i in 1..FFT_SIZE / 2 {
            self.work[FFT_SIZE - i] = bins[i].conj();
        }

        self.inverse.process_with_scratch(&mut self.work, &mut self.scratch);

        for (s, w) in frame.iter_mut().zip(&self.work) {
            *s = w.re * self.norm_factor;
        }
    }
}

impl Default for WindowedFft {
    fn default() -> Self {
        Self::new()
    }
}
