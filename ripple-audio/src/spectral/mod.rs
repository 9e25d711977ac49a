//! Frequency-domain core: STFT freeze, smear, scatter, shift, tilt and feedback
//!
//! - `fft`: windowed forward/inverse transform
//! - `stft`: overlap-add FIFOs and hop triggering
//! - `effects`: per-bin transforms
//!
//! Input is mono-summed; the processed mono signal is written to every
//! channel. Latency is `FFT_SIZE` samples.

mod effects;
mod fft;
mod stft;

pub use effects::{display_magnitude, SpectralEffects, SpectralSettings};
pub use fft::{
    hann_window, overlap_gain_correction, WindowedFft, FFT_ORDER, FFT_SIZE, HOP_SIZE, NUM_BINS,
    OVERLAP,
};
pub use stft::{FrameState, OverlapAdd};

use crate::meter::{AtomicF32, Meters};
use crate::random::Random;
use rustfft::num_complex::Complex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Pointer gesture shared with the UI thread
pub struct Interaction {
    y: AtomicF32,
    radius: AtomicF32,
    active: AtomicBool,
}

impl Interaction {
    pub fn new() -> Self {
        Self {
            y: AtomicF32::new(0.5),
            radius: AtomicF32::new(0.2),
            active: AtomicBool::new(false),
        }
    }

    /// Update the gesture; `y` and `radius` are normalized to 0..1
    pub fn set(&self, y: f32, radius: f32, active: bool) {
        let y = if y.is_finite() { y.clamp(0.0, 1.0) } else { 0.5 };
        let radius = if radius.is_finite() { radius.clamp(0.0, 1.0) } else { 0.2 };
        self.y.store(y);
        self.radius.store(radius);
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn release(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> InteractionState {
        InteractionState {
            y: self.y.load(),
            radius: self.radius.load(),
            active: self.active.load(Ordering::Relaxed),
        }
    }
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain copy of an `Interaction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionState {
    pub y: f32,
    pub radius: f32,
    pub active: bool,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            y: 0.5,
            radius: 0.2,
            active: false,
        }
    }
}

/// Streaming spectral processor
pub struct SpectralProcessor {
    ola: OverlapAdd,
    fft: WindowedFft,
    effects: Box<SpectralEffects>,
    frame: Vec<f32>,
    bins: Vec<Complex<f32>>,
    settings: SpectralSettings,
    // Carried per hop; no bin processing reads it yet
    #[cfg_attr(not(test), allow(dead_code))]
    interaction: InteractionState,
    rng: Random,
    sample_rate: f64,
}

impl SpectralProcessor {
    pub fn new() -> Self {
        Self {
            ola: OverlapAdd::new(),
            fft: WindowedFft::new(),
            effects: Box::new(SpectralEffects::new()),
            frame: vec![0.0; FFT_SIZE],
            bins: vec![Complex::new(0.0, 0.0); NUM_BINS],
            settings: SpectralSettings::default(),
            interaction: InteractionState::default(),
            rng: Random::default(),
            sample_rate: 44100.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.ola.reset();
        self.effects.reset();
        self.frame.fill(0.0);
        self.bins.fill(Complex::new(0.0, 0.0));
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }

    pub fn set_settings(&mut self, settings: SpectralSettings) {
        self.settings = settings.sanitized();
    }

    pub fn settings(&self) -> &SpectralSettings {
        &self.settings
    }

    pub fn set_interaction(&mut self, interaction: InteractionState) {
        self.interaction = interaction;
    }

    #[cfg(test)]
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn effects(&self) -> &SpectralEffects {
        &self.effects
    }

    /// Latency in samples
    pub fn latency(&self) -> usize {
        FFT_SIZE
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Process planar channels in place, publishing display spectra after each frame
    pub fn process(&mut self, channels: &mut [&mut [f32]], meters: &Meters) {
        let num_samples = channels.iter().map(|ch| ch.len()).min().unwrap_or(0);
        self.process_range(channels, 0, num_samples, meters);
    }

    /// Process samples `start..end` of every channel
    pub fn process_range(
        &mut self,
        channels: &mut [&mut [f32]],
        start: usize,
        end: usize,
        meters: &Meters,
    ) {
        let num_channels = channels.len();
        if num_channels == 0 {
            return;
        }
        let end = channels.iter().map(|ch| ch.len()).fold(end, usize::min);
        let inv_channels = 1.0 / num_channels as f32;

        for n in start..end {
            let mono_in = channels.iter().map(|ch| ch[n]).sum::<f32>() * inv_channels;

            let (mono_out, state) = self.ola.push(mono_in);
            for ch in channels.iter_mut() {
                ch[n] = mono_out;
            }

            if state == FrameState::FrameReady {
                self.process_frame();
                self.publish(meters);
            }
        }
    }

    fn process_frame(&mut self) {
        self.ola.unwrap_frame(&mut self.frame);
        self.fft.apply_window(&mut self.frame);
        self.fft.forward(&self.frame, &mut self.bins);

        self.effects.process(&mut self.bins, &self.settings, &mut self.rng);

        self.fft.inverse(&self.bins, &mut self.frame);
        self.fft.apply_synthesis_window(&mut self.frame);
        self.ola.overlap_add(&self.frame);
    }

    fn publish(&self, meters: &Meters) {
        let live = self.effects.magnitudes();
        let frozen = self.effects.frozen_magnitudes();
        for (bin, (&l, &f)) in live.iter().zip(frozen).enumerate() {
            meters.set_spectrum_bin(bin, display_magnitude(l), display_magnitude(f));
        }
    }
}

impl Default for SpectralProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_mono(proc: &mut SpectralProcessor, input: &[f32], block: usize) -> Vec<f32> {
        let meters = Meters::new();
        let mut out = Vec::with_capacity(input.len());
        for chunk in input.chunks(block) {
            let mut buf = chunk.to_vec();
            {
                let mut channels: [&mut [f32]; 1] = [&mut buf];
                proc.process(&mut channels, &meters);
            }
            out.extend_from_slice(&buf);
        }
        out
    }

    #[test]
    fn test_impulse_comes_back_delayed_by_fft_size() {
        let mut proc = SpectralProcessor::new();
        proc.prepare(44100.0);

        let mut input = vec![0.0f32; FFT_SIZE * 4];
        input[0] = 1.0;
        let out = run_mono(&mut proc, &input, 128);

        for (n, &s) in out.iter().enumerate() {
            if n == FFT_SIZE {
                assert!((s - 1.0).abs() < 1e-3, "peak {}", s);
            } else {
                assert!(s.abs() < 1e-3, "sample {} = {}", n, s);
            }
        }
    }

    #[test]
    fn test_round_trip_reproduces_signal() {
        let mut proc = SpectralProcessor::new();
        proc.prepare(48000.0);

        let input: Vec<f32> = (0..FFT_SIZE * 8)
            .map(|n| (n as f32 * 0.05).sin() * 0.5 + (n as f32 * 0.31).sin() * 0.2)
            .collect();
        let out = run_mono(&mut proc, &input, 333);

        for n in FFT_SIZE * 2..input.len() {
            let expected = input[n - FFT_SIZE];
            assert!((out[n] - expected).abs() < 1e-3, "sample {}", n);
        }
    }

    #[test]
    fn test_block_size_does_not_change_output() {
        let input: Vec<f32> = (0..FFT_SIZE * 3)
            .map(|n| ((n * 7) % 13) as f32 / 13.0 - 0.5)
            .collect();
        let mut a = SpectralProcessor::new();
        let mut b = SpectralProcessor::new();
        let settings = SpectralSettings {
            smear: 0.6,
            tilt: 0.4,
            ..Default::default()
        };
        a.set_settings(settings);
        b.set_settings(settings);

        let out_a = run_mono(&mut a, &input, 64);
        let out_b = run_mono(&mut b, &input, 1000);
        for (x, y) in out_a.iter().zip(&out_b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stereo_is_mono_summed_and_broadcast() {
        let mut proc = SpectralProcessor::new();
        let meters = Meters::new();
        let mut left = vec![0.0f32; FFT_SIZE * 2];
        let mut right = vec![0.0f32; FFT_SIZE * 2];
        left[0] = 1.0;
        right[0] = -1.0;
        {
            let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
            proc.process(&mut channels, &meters);
        }
        // L and R cancel in the mono sum
        assert!(left.iter().all(|s| s.abs() < 1e-4));
        assert_eq!(left, right);
    }

    #[test]
    fn test_spectrum_published_after_frame() {
        let mut proc = SpectralProcessor::new();
        let meters = Meters::new();
        let mut buf: Vec<f32> = (0..FFT_SIZE * 2).map(|n| (n as f32 * 0.2).sin()).collect();
        {
            let mut channels: [&mut [f32]; 1] = [&mut buf];
            proc.process(&mut channels, &meters);
        }
        let mut spectrum = vec![0.0f32; NUM_BINS];
        meters.spectrum(&mut spectrum);
        assert!(spectrum.iter().any(|&v| v > 0.1));
        assert!(spectrum.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_settings_are_clamped() {
        let mut proc = SpectralProcessor::new();
        proc.set_settings(SpectralSettings {
            freeze: 4.0,
            shift: -9.0,
            tilt: f32::NAN,
            ..Default::default()
        });
        assert_eq!(proc.settings().freeze, 1.0);
        assert_eq!(proc.settings().shift, -1.0);
        assert_eq!(proc.settings().tilt, 0.0);
    }

    #[test]
    fn test_interaction_clamps_and_releases() {
        let interaction = Interaction::new();
        interaction.set(1.5, 0.3, true);
        let state = interaction.snapshot();
        assert_eq!(state.y, 1.0);
        assert!((state.radius - 0.3).abs() < 1e-6);
        assert!(state.active);

        interaction.release();
        assert!(!interaction.snapshot().active);
    }

    #[test]
    fn test_empty_input_is_noop() {
        let mut proc = SpectralProcessor::new();
        let meters = Meters::new();
        let mut channels: [&mut [f32]; 0] = [];
        proc.process(&mut channels, &meters);
    }
}
