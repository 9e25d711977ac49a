//! Audio engine for Ripple - spectral core, ripple filter bank and FDN reverb
//!
//! This crate provides the real-time processing pipeline:
//! - Spectral: STFT freeze, smear, scatter, shift, tilt and feedback
//! - Effects: 16-band ripple filter bank and 8-line FDN reverb
//! - Modulation: four LFOs routed through a four-slot matrix
//! - Params/Meters: lock-free parameter store and UI metering
//! - State: versioned `key=value` snapshots

mod effects;
mod engine;
mod error;
mod meter;
mod modulation;
mod params;
mod random;
mod smoothing;
pub mod spectral;
pub mod state;

pub use effects::{
    band_frequency, decay_time, hadamard8, line_feedback, ripple_gain, BiquadCoefficients,
    BiquadState, Effect, FdnReverb, RippleBank, RippleSettings, BAND_Q, BASE_DELAYS_MS, FDN_SIZE,
    HIGHEST_BAND_HZ, LOWEST_BAND_HZ, MAX_FEEDBACK, NUM_RIPPLE_BANDS,
};
pub use engine::{
    db_to_gain, RippleEngine, MAX_BLOCK_SIZE, MAX_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE,
    TAIL_SECONDS,
};
pub use error::EngineError;
pub use meter::{block_peak, AtomicF32, Meters};
pub use modulation::{Lfo, LfoBank, LfoShape, ModMatrix, ModSlot, ModTarget};
pub use params::{
    CoreMode, ParamId, ParamInfo, ParamKind, ParamSnapshot, Params, CORE_MODE_NAMES,
    LFO_SHAPE_NAMES, MOD_SOURCE_NAMES, MOD_TARGET_NAMES, NUM_LFOS, NUM_MOD_SLOTS, PARAM_COUNT,
};
pub use random::Random;
pub use smoothing::SmoothedValue;
pub use spectral::{Interaction, InteractionState, SpectralProcessor, SpectralSettings};
pub use state::{load_into, parse_state, parse_value, serialize_state, LoadReport, STATE_VERSION};
