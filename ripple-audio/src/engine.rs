//! Audio engine - orchestrates the spectral core, ripple bank, reverb and modulation
//!
//! Per block: parameter snapshot → bypass → input gain → LFOs and matrix →
//! spectral core → ripple bank → FDN reverb → output gain → meters.
//!
//! Everything is allocated in `prepare`; `process` never allocates, locks or
//! logs.

use crate::effects::{Effect, FdnReverb, RippleBank, RippleSettings};
use crate::error::EngineError;
use crate::meter::{block_peak, Meters};
use crate::modulation::{LfoBank, ModMatrix};
use crate::params::{CoreMode, ParamId, ParamSnapshot, Params, NUM_LFOS};
use crate::smoothing::{SmoothedValue, DEFAULT_RAMP_SECS};
use crate::spectral::{Interaction, SpectralProcessor, SpectralSettings, FFT_SIZE};
use std::sync::Arc;
use tracing::{debug, info};

/// Lowest accepted sample rate
pub const MIN_SAMPLE_RATE: f64 = 8000.0;
/// Highest accepted sample rate
pub const MAX_SAMPLE_RATE: f64 = 384_000.0;
/// Largest accepted block size
pub const MAX_BLOCK_SIZE: usize = 65_536;
/// Most channels `process_interleaved` processes; further channels copy channel 0
pub const MAX_CHANNELS: usize = 8;
/// Reverb and ripple tail reported to hosts
pub const TAIL_SECONDS: f64 = 2.0;

/// Decibels to linear gain
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Engine state (held in the audio thread)
pub struct RippleEngine {
    params: Arc<Params>,
    meters: Arc<Meters>,
    interaction: Arc<Interaction>,

    spectral: Box<SpectralProcessor>,
    ripple: RippleBank,
    reverb: FdnReverb,
    lfos: LfoBank,
    matrix: ModMatrix,

    input_gain: SmoothedValue,
    output_gain: SmoothedValue,

    sample_rate: f64,
    max_block_size: usize,
    prepared: bool,
    core: CoreMode,

    // Pre-allocated processing buffers (no allocation in the audio callback)
    right_scratch: Vec<f32>,
    planar: Vec<Vec<f32>>,
}

impl RippleEngine {
    pub fn new(params: Arc<Params>) -> Self {
        let sample_rate = 44100.0;
        Self {
            params,
            meters: Arc::new(Meters::new()),
            interaction: Arc::new(Interaction::new()),
            spectral: Box::new(SpectralProcessor::new()),
            ripple: RippleBank::new(sample_rate as f32),
            reverb: FdnReverb::new(sample_rate as f32),
            lfos: LfoBank::new(sample_rate as f32),
            matrix: ModMatrix::new(),
            input_gain: SmoothedValue::new(1.0),
            output_gain: SmoothedValue::new(1.0),
            sample_rate,
            max_block_size: 0,
            prepared: false,
            core: CoreMode::default(),
            right_scratch: Vec::new(),
            planar: Vec::new(),
        }
    }

    /// Allocate every buffer for a sample rate and maximum block size
    ///
    /// Must complete before `process` is called again after a rate or block
    /// size change.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<(), EngineError> {
        if !sample_rate.is_finite() || !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if max_block_size == 0 || max_block_size > MAX_BLOCK_SIZE {
            return Err(EngineError::InvalidBlockSize(max_block_size));
        }

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        let sr = sample_rate as f32;
        self.spectral.prepare(sample_rate);
        self.ripple.prepare(sr);
        self.reverb.prepare(sr);
        self.lfos.prepare(sr);
        self.input_gain.reset(sr, DEFAULT_RAMP_SECS);
        self.output_gain.reset(sr, DEFAULT_RAMP_SECS);

        self.right_scratch = vec![0.0; max_block_size];
        self.planar = (0..MAX_CHANNELS).map(|_| vec![0.0; max_block_size]).collect();

        self.prepared = true;
        self.reset();

        info!(
            sample_rate,
            max_block_size,
            reverb_capacity = self.reverb.capacity(),
            "Engine prepared"
        );
        Ok(())
    }

    /// Clear all processing state and snap smoothed values to their targets
    pub fn reset(&mut self) {
        let snapshot = self.params.snapshot();
        let seed = snapshot.get_index(ParamId::RandomSeed) as u64;

        self.spectral.reset();
        self.spectral.reseed(seed);
        self.lfos.reset(seed.wrapping_add(1));
        self.ripple.reset();
        self.reverb.reset();

        self.apply_parameters(&snapshot, 0);
        self.input_gain
            .set_current_and_target(db_to_gain(snapshot.get(ParamId::InputGain)));
        self.output_gain
            .set_current_and_target(db_to_gain(snapshot.get(ParamId::OutputGain)));
        self.ripple.reset();
        self.reverb.reset();

        self.meters.clear();
        debug!(seed, "Engine reset");
    }

    pub fn params(&self) -> &Arc<Params> {
        &self.params
    }

    /// Shared meters; clone the `Arc` for a UI thread
    pub fn meters(&self) -> &Arc<Meters> {
        &self.meters
    }

    /// Shared pointer-gesture input
    pub fn interaction(&self) -> &Arc<Interaction> {
        &self.interaction
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Latency introduced by the selected core(s)
    pub fn latency_samples(&self) -> usize {
        let core = CoreMode::from_index(self.params.snapshot().get_index(ParamId::Core));
        if core.runs_spectral() {
            FFT_SIZE
        } else {
            0
        }
    }

    pub fn tail_seconds(&self) -> f64 {
        TAIL_SECONDS
    }

    /// Process planar channels in place
    ///
    /// Blocks longer than the prepared maximum are split. An unprepared
    /// engine leaves the audio untouched.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        if !self.prepared || channels.is_empty() {
            return;
        }
        let num_samples = channels.iter().map(|ch| ch.len()).min().unwrap_or(0);
        let mut start = 0;
        while start < num_samples {
            let end = (start + self.max_block_size).min(num_samples);
            self.process_block(channels, start, end);
            start = end;
        }
    }

    /// Process an interleaved buffer of `num_channels` channels in place
    ///
    /// The first `MAX_CHANNELS` channels are processed; any beyond that
    /// receive processed channel 0.
    pub fn process_interleaved(&mut self, buffer: &mut [f32], num_channels: usize) {
        if !self.prepared || num_channels == 0 {
            return;
        }
        let processed = num_channels.min(MAX_CHANNELS);
        let frames = buffer.len() / num_channels;
        let mut planar = std::mem::take(&mut self.planar);

        let mut start = 0;
        while start < frames {
            let len = (frames - start).min(self.max_block_size);
            let chunk = &mut buffer[start * num_channels..(start + len) * num_channels];

            for (i, frame) in chunk.chunks_exact(num_channels).enumerate() {
                for (ch, &s) in frame.iter().take(processed).enumerate() {
                    planar[ch][i] = s;
                }
            }

            {
                let mut refs: [&mut [f32]; MAX_CHANNELS] = Default::default();
                for (r, ch) in refs.iter_mut().zip(planar.iter_mut()) {
                    *r = &mut ch[..len];
                }
                self.process_block(&mut refs[..processed], 0, len);
            }

            for (i, frame) in chunk.chunks_exact_mut(num_channels).enumerate() {
                for (ch, s) in frame.iter_mut().enumerate() {
                    *s = if ch < processed { planar[ch][i] } else { planar[0][i] };
                }
            }
            start += len;
        }

        self.planar = planar;
    }

    /// Push the resolved block parameters into every core
    fn apply_parameters(&mut self, snapshot: &ParamSnapshot, num_samples: usize) {
        self.core = snapshot.core_mode();

        self.lfos.update(snapshot, num_samples);
        self.matrix.update(snapshot);
        let lfo_bipolar: [f32; NUM_LFOS] = self.lfos.bipolar_values();
        let p = self.matrix.apply(snapshot, &lfo_bipolar);

        self.spectral.set_settings(SpectralSettings {
            freeze: p.get(ParamId::Freeze),
            smear: p.get(ParamId::Smear),
            scatter: p.get(ParamId::Scatter),
            shift: p.get(ParamId::Shift),
            tilt: p.get(ParamId::Tilt),
            feedback: p.get(ParamId::Feedback),
        });
        self.spectral.set_interaction(self.interaction.snapshot());

        self.ripple.set_settings(RippleSettings {
            rate: p.get(ParamId::RippleRate),
            multiply: p.get(ParamId::RippleMultiply),
            amount: p.get(ParamId::RippleAmount),
            width: p.get(ParamId::RippleWidth),
            low_bypass: p.get(ParamId::RippleLowBypass),
            high_bypass: p.get(ParamId::RippleHighBypass),
            mix: p.get(ParamId::RippleMix),
        });

        let reverb_on = p.get_bool(ParamId::ReverbEnabled);
        if reverb_on != self.reverb.is_enabled() {
            self.reverb.set_enabled(reverb_on);
        }
        self.reverb.set_size(p.get(ParamId::ReverbSize));
        self.reverb.set_damping(p.get(ParamId::ReverbDamping));
        self.reverb.set_mix(p.get(ParamId::ReverbMix));

        self.input_gain.set_target(db_to_gain(p.get(ParamId::InputGain)));
        self.output_gain.set_target(db_to_gain(p.get(ParamId::OutputGain)));
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]], start: usize, end: usize) {
        let len = end - start;
        if len == 0 {
            return;
        }
        let snapshot = self.params.snapshot();

        if snapshot.get_bool(ParamId::Bypass) {
            let peak = block_peak(channels, start, end);
            self.meters.set_input_level(peak);
            self.meters.set_output_level(peak);
            return;
        }

        // Input gain
        for n in start..end {
            let g = self.input_gain.next();
            for ch in channels.iter_mut() {
                ch[n] *= g;
            }
        }
        self.meters.set_input_level(block_peak(channels, start, end));

        // Modulation
        self.apply_parameters(&snapshot, len);
        for (i, v) in self.lfos.values().iter().enumerate() {
            self.meters.set_lfo_value(i, *v);
        }

        // Spectral core
        if self.core.runs_spectral() {
            self.spectral
                .process_range(channels, start, end, &self.meters);
        }

        // Ripple bank and reverb
        if self.core.runs_ripple() {
            self.process_stereo_effects(channels, start, end);
            for (band, &g) in self.ripple.band_gains().iter().enumerate() {
                self.meters.set_ripple_band(band, g);
            }
        }

        // Output gain
        for n in start..end {
            let g = self.output_gain.next();
            for ch in channels.iter_mut() {
                ch[n] *= g;
            }
        }
        self.meters.set_output_level(block_peak(channels, start, end));
    }

    /// Ripple bank then reverb on the first two channels; extra channels copy channel 0
    fn process_stereo_effects(&mut self, channels: &mut [&mut [f32]], start: usize, end: usize) {
        let len = end - start;
        match channels {
            [] => {}
            [mono] => {
                let left = &mut mono[start..end];
                let right = &mut self.right_scratch[..len];
                right.copy_from_slice(left);
                self.ripple.process(left, right);
                self.reverb.process(left, right);
                // Fold the stereo result back to mono
                for (l, r) in left.iter_mut().zip(right.iter()) {
                    *l = (*l + *r) * 0.5;
                }
            }
            [first, second, rest @ ..] => {
                let left = &mut first[start..end];
                let right = &mut second[start..end];
                self.ripple.process(left, right);
                self.reverb.process(left, right);
                for ch in rest.iter_mut() {
                    ch[start..end].copy_from_slice(left);
                }
            }
        }
    }
}
