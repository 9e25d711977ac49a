//! Deterministic PRNG for the audio thread (no allocation, no locking)

/// Xorshift64* generator
#[derive(Debug, Clone)]
pub struct Random {
    state: u64,
}

impl Random {
    const DEFAULT_SEED: u64 = 0xDEADBEEF_CAFEBABE;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: Self::DEFAULT_SEED,
        };
        rng.reseed(seed);
        rng
    }

    /// Reseed; a zero state would lock xorshift at zero, so it is mixed first
    pub fn reseed(&mut self, seed: u64) {
        let mixed = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ Self::DEFAULT_SEED;
        self.state = if mixed == 0 { Self::DEFAULT_SEED } else { mixed };
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform value in [0, 1)
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // Top 24 bits fill the f32 mantissa exactly
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform value in [-1, 1)
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new(0)
    }
}
