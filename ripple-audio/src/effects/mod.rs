//! Time-domain effects: ripple filter bank and FDN reverb

mod filter;
mod reverb;
mod ripple;

pub use filter::{BiquadCoefficients, BiquadState};
pub use reverb::{
    decay_time, hadamard8, line_feedback, FdnReverb, BASE_DELAYS_MS, FDN_SIZE, MAX_FEEDBACK,
};
pub use ripple::{
    band_frequency, ripple_gain, RippleBank, RippleSettings, BAND_Q, HIGHEST_BAND_HZ,
    LOWEST_BAND_HZ,
};

/// Bands in the ripple filter bank
pub const NUM_RIPPLE_BANDS: usize = 16;

/// Trait for stereo block effects
pub trait Effect: Send {
    /// Process a block in place; both slices have the same length
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Reset effect state
    fn reset(&mut self);

    /// Check if effect is enabled
    fn is_enabled(&self) -> bool;

    /// Enable/disable the effect
    fn set_enabled(&mut self, enabled: bool);
}
