//! Simple random number generator for reproducibility.
//!
//! A lightweight xorshift PRNG that backs every randomized initializer and
//! dropout mask, so two runs seeded identically produce identical models.

const FALLBACK_SEED: u64 = 0x9e3779b97f4a7c15;

/// Xorshift generator with an explicit seed.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        Self { state }
    }

    /// Derive an independent generator, advancing this one.
    ///
    /// Layers that draw random numbers during training (dropout) keep their
    /// own stream so that the order in which layers are built does not change
    /// the masks another layer sees.
    pub fn fork(&mut self) -> Self {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        Self::new((hi << 32) | lo)
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Convert to [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        // 24 bits keep the result strictly below 1.0 after rounding.
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }

    /// Standard normal sample (Box-Muller).
    pub fn next_normal(&mut self) -> f32 {
        // Shift u1 into (0, 1] so ln never sees zero.
        let u1 = 1.0 - self.next_f32();
        let u2 = self.next_f32();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
    }
}
