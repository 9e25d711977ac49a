//! Block-rate LFOs
//!
//! Phase advances once per block by `rate * num_samples / sample_rate` and
//! wraps into [0, 1). The per-LFO phase offset is added before the shape is
//! evaluated, and sample and hold redraws when that offset phase wraps. All
//! shapes output 0..1.

use crate::params::{ParamSnapshot, LFO_PARAMS, NUM_LFOS};
use crate::random::Random;
use std::f32::consts::TAU;

/// LFO waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoShape {
    #[default]
    Sine,
    Triangle,
    /// 50% duty, high for the first half of the cycle
    Square,
    SawUp,
    SawDown,
    /// Sample and hold: a new random value each time the offset phase wraps
    Random,
}

impl LfoShape {
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => LfoShape::Triangle,
            2 => LfoShape::Square,
            3 => LfoShape::SawUp,
            4 => LfoShape::SawDown,
            5 => LfoShape::Random,
            _ => LfoShape::Sine,
        }
    }

    /// Evaluate a deterministic shape at `phase` in [0, 1)
    ///
    /// `Random` has no closed form and returns `held`.
    #[inline]
    pub fn evaluate(self, phase: f32, held: f32) -> f32 {
        match self {
            LfoShape::Sine => 0.5 + 0.5 * (TAU * phase).sin(),
            LfoShape::Triangle => {
                if phase < 0.5 {
                    phase * 2.0
                } else {
                    2.0 - phase * 2.0
                }
            }
            LfoShape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            LfoShape::SawUp => phase,
            LfoShape::SawDown => 1.0 - phase,
            LfoShape::Random => held,
        }
    }
}

/// Wrap into [0, 1)
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase - phase.floor();
    // floor of a value just below an integer can round up to 1.0
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

/// One low-frequency oscillator
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    rate: f32,
    shape: LfoShape,
    phase_offset: f32,
    held: f32,
    value: f32,
}

impl Lfo {
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            rate: 1.0,
            shape: LfoShape::Sine,
            phase_offset: 0.0,
            held: 0.5,
            value: 0.5,
        }
    }

    pub fn reset(&mut self, rng: &mut Random) {
        self.phase = 0.0;
        self.held = rng.next_f32();
        self.value = self.evaluate();
    }

    /// Rate in Hz, clamped to 0.01..20
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = if rate.is_finite() { rate.clamp(0.01, 20.0) } else { 1.0 };
    }

    pub fn set_shape(&mut self, shape: LfoShape) {
        self.shape = shape;
    }

    /// Phase offset in cycles, 0..1
    pub fn set_phase_offset(&mut self, offset: f32) {
        self.phase_offset = if offset.is_finite() { offset.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Advance by one block and return the new value
    pub fn advance(&mut self, num_samples: usize, sample_rate: f32, rng: &mut Random) -> f32 {
        if sample_rate > 0.0 {
            let increment = self.rate * num_samples as f32 / sample_rate;
            if wrap_phase(self.phase + self.phase_offset) + increment >= 1.0 {
                self.held = rng.next_f32();
            }
            self.phase = wrap_phase(self.phase + increment);
        }
        self.value = self.evaluate();
        self.value
    }

    fn evaluate(&self) -> f32 {
        let p = wrap_phase(self.phase + self.phase_offset);
        self.shape.evaluate(p, self.held).clamp(0.0, 1.0)
    }

    /// Last value, 0..1
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Last value mapped to -1..1
    #[inline]
    pub fn bipolar(&self) -> f32 {
        self.value * 2.0 - 1.0
    }

    /// Accumulator phase before the offset, 0..1
    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn shape(&self) -> LfoShape {
        self.shape
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new()
    }
}

/// The four LFOs with their shared sample-and-hold source
pub struct LfoBank {
    lfos: [Lfo; NUM_LFOS],
    rng: Random,
    sample_rate: f32,
}

impl LfoBank {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            lfos: std::array::from_fn(|_| Lfo::new()),
            rng: Random::default(),
            sample_rate,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Rewind every LFO and reseed the sample-and-hold source
    pub fn reset(&mut self, seed: u64) {
        self.rng.reseed(seed);
        for lfo in &mut self.lfos {
            lfo.reset(&mut self.rng);
        }
    }

    /// Pull rate, shape and offset from the snapshot and advance one block
    pub fn update(&mut self, snapshot: &ParamSnapshot, num_samples: usize) {
        for (lfo, ids) in self.lfos.iter_mut().zip(LFO_PARAMS.iter()) {
            lfo.set_rate(snapshot.get(ids.rate));
            lfo.set_shape(LfoShape::from_index(snapshot.get_index(ids.shape)));
            lfo.set_phase_offset(snapshot.get(ids.phase));
            lfo.advance(num_samples, self.sample_rate, &mut self.rng);
        }
    }

    pub fn lfo(&self, index: usize) -> Option<&Lfo> {
        self.lfos.get(index)
    }

    /// Current values, 0..1
    pub fn values(&self) -> [f32; NUM_LFOS] {
        std::array::from_fn(|i| self.lfos[i].value())
    }

    /// Current values, -1..1
    pub fn bipolar_values(&self) -> [f32; NUM_LFOS] {
        std::array::from_fn(|i| self.lfos[i].bipolar())
    }
}
