//! Thread-safe metering and visualization cells
//!
//! The audio thread is the single writer; any number of UI threads read.
//! Each value is an independent f32 stored as bits in an `AtomicU32`, so
//! reads never tear and never block.

use crate::effects::NUM_RIPPLE_BANDS;
use crate::params::NUM_LFOS;
use crate::spectral::NUM_BINS;
use std::sync::atomic::{AtomicU32, Ordering};

/// Lock-free f32 cell
#[derive(Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Copy as many cells as fit into `out`
fn copy_cells(cells: &[AtomicF32], out: &mut [f32]) -> usize {
    let count = cells.len().min(out.len());
    for (dst, cell) in out.iter_mut().zip(cells).take(count) {
        *dst = cell.load();
    }
    count
}

/// Levels, band gains, LFO values and spectra for the UI layer
pub struct Meters {
    input_level: AtomicF32,
    output_level: AtomicF32,
    ripple_bands: [AtomicF32; NUM_RIPPLE_BANDS],
    lfo_values: [AtomicF32; NUM_LFOS],
    spectrum: Box<[AtomicF32]>,
    frozen_spectrum: Box<[AtomicF32]>,
}

impl Meters {
    pub fn new() -> Self {
        Self {
            input_level: AtomicF32::default(),
            output_level: AtomicF32::default(),
            ripple_bands: std::array::from_fn(|_| AtomicF32::new(0.5)),
            lfo_values: std::array::from_fn(|_| AtomicF32::new(0.5)),
            spectrum: (0..NUM_BINS).map(|_| AtomicF32::default()).collect(),
            frozen_spectrum: (0..NUM_BINS).map(|_| AtomicF32::default()).collect(),
        }
    }

    /// Zero everything
    pub fn clear(&self) {
        self.input_level.store(0.0);
        self.output_level.store(0.0);
        for cell in self.ripple_bands.iter().chain(self.lfo_values.iter()) {
            cell.store(0.5);
        }
        for cell in self.spectrum.iter().chain(self.frozen_spectrum.iter()) {
            cell.store(0.0);
        }
    }

    // Writers (audio thread)

    pub fn set_input_level(&self, level: f32) {
        self.input_level.store(level);
    }

    pub fn set_output_level(&self, level: f32) {
        self.output_level.store(level);
    }

    pub fn set_ripple_band(&self, band: usize, gain: f32) {
        if let Some(cell) = self.ripple_bands.get(band) {
            cell.store(gain);
        }
    }

    pub fn set_lfo_value(&self, lfo: usize, value: f32) {
        if let Some(cell) = self.lfo_values.get(lfo) {
            cell.store(value);
        }
    }

    pub fn set_spectrum_bin(&self, bin: usize, live: f32, frozen: f32) {
        if let (Some(l), Some(f)) = (self.spectrum.get(bin), self.frozen_spectrum.get(bin)) {
            l.store(live);
            f.store(frozen);
        }
    }

    // Readers (any thread)

    /// Block peak of the input after input gain
    pub fn input_level(&self) -> f32 {
        self.input_level.load()
    }

    /// Block peak of the output after output gain
    pub fn output_level(&self) -> f32 {
        self.output_level.load()
    }

    /// Current ripple band gains (0-1); returns the number written
    pub fn ripple_bands(&self, out: &mut [f32]) -> usize {
        copy_cells(&self.ripple_bands, out)
    }

    /// Current LFO outputs (0-1); returns the number written
    pub fn lfo_values(&self, out: &mut [f32]) -> usize {
        copy_cells(&self.lfo_values, out)
    }

    /// Perceptually scaled live spectrum (0-1)
    pub fn spectrum(&self, out: &mut [f32]) -> usize {
        copy_cells(&self.spectrum, out)
    }

    /// Perceptually scaled frozen spectrum (0-1)
    pub fn frozen_spectrum(&self, out: &mut [f32]) -> usize {
        copy_cells(&self.frozen_spectrum, out)
    }
}

impl Default for Meters {
    fn default() -> Self {
        Self::new()
    }
}

/// Peak absolute sample over `start..end` of every channel; the range is
/// clipped to each channel's length
pub fn block_peak(channels: &[&mut [f32]], start: usize, end: usize) -> f32 {
    channels
        .iter()
        .flat_map(|ch| {
            let end = end.min(ch.len());
            ch[start.min(end)..end].iter()
        })
        .fold(0.0f32, |peak, s| peak.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_f32_roundtrip() {
        let cell = AtomicF32::new(0.25);
        assert_eq!(cell.load(), 0.25);
        cell.store(-3.5);
        assert_eq!(cell.load(), -3.5);
    }

    #[test]
    fn test_meter_pull_respects_output_length() {
        let meters = Meters::new();
        meters.set_ripple_band(3, 0.9);
        meters.set_ripple_band(99, 1.0); // ignored

        let mut small = [0.0f32; 4];
        assert_eq!(meters.ripple_bands(&mut small), 4);
        assert_eq!(small[3], 0.9);

        let mut big = vec![0.0f32; NUM_BINS + 10];
        assert_eq!(meters.spectrum(&mut big), NUM_BINS);
    }

    #[test]
    fn test_block_peak() {
        let mut l = [0.1, -0.7, 0.3];
        let mut r = [0.2, 0.5, -0.4];
        let channels: [&mut [f32]; 2] = [&mut l, &mut r];
        assert!((block_peak(&channels, 0, 3) - 0.7).abs() < 1e-6);
        assert!((block_peak(&channels, 2, 3) - 0.4).abs() < 1e-6);
        // Ranges past the end are clipped
        assert!((block_peak(&channels, 1, 99) - 0.7).abs() < 1e-6);
        assert_eq!(block_peak(&channels, 5, 9), 0.0);
        assert_eq!(block_peak(&[], 0, 3), 0.0);
    }

    #[test]
    fn test_clear_restores_neutral_values() {
        let meters = Meters::new();
        meters.set_input_level(1.0);
        meters.set_lfo_value(0, 0.1);
        meters.set_spectrum_bin(10, 0.8, 0.6);
        meters.clear();

        assert_eq!(meters.input_level(), 0.0);
        let mut lfo = [0.0f32; NUM_LFOS];
        meters.lfo_values(&mut lfo);
        assert_eq!(lfo[0], 0.5);
        let mut spec = vec![1.0f32; NUM_BINS];
        meters.frozen_spectrum(&mut spec);
        assert_eq!(spec[10], 0.0);
    }
}
