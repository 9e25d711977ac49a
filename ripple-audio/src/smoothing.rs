//! Linear parameter smoothing
//!
//! A `SmoothedValue` ramps from its current value to a new target over a
//! fixed number of samples. Targets are set once per block from the
//! parameter snapshot; `next()` is called once per sample.

/// Default ramp length in seconds
pub const DEFAULT_RAMP_SECS: f32 = 0.02;

/// Linearly ramped value
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
    step: f32,
    steps_remaining: u32,
    ramp_samples: u32,
}

impl SmoothedValue {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            steps_remaining: 0,
            ramp_samples: 0,
        }
    }

    /// Set ramp length for a sample rate and snap to the current target
    pub fn reset(&mut self, sample_rate: f32, ramp_secs: f32) {
        self.ramp_samples = (sample_rate * ramp_secs).max(0.0).round() as u32;
        self.set_current_and_target(self.target);
    }

    /// Jump immediately to `value`
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.steps_remaining = 0;
    }

    /// Start a ramp toward `target`
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;
        if self.ramp_samples == 0 {
            self.current = target;
            self.steps_remaining = 0;
            return;
        }
        self.steps_remaining = self.ramp_samples;
        self.step = (self.target - self.current) / self.ramp_samples as f32;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.steps_remaining == 0 {
            return self.target;
        }
        self.steps_remaining -= 1;
        if self.steps_remaining == 0 {
            self.current = self.target;
        } else {
            self.current += self.step;
        }
        self.current
    }

    /// Advance `n` samples at once
    pub fn skip(&mut self, n: u32) -> f32 {
        if n >= self.steps_remaining {
            self.current = self.target;
            self.steps_remaining = 0;
        } else {
            self.current += self.step * n as f32;
            self.steps_remaining -= n;
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        if self.steps_remaining == 0 {
            self.target
        } else {
            self.current
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.steps_remaining > 0
    }
}

impl Default for SmoothedValue {
    fn default() -> Self {
        Self::new(0.0)
    }
}
