#![forbid(unsafe_code)]

mod synth;

pub use synth::{chirp, gaussian_bumps, linspace, sine_mix, square_steps};

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const MIX_CONST1: u64 = 0xBF58_476D_1CE4_E5B9;
const MIX_CONST2: u64 = 0x94D0_49BB_1331_11EB;
const FNV_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;
pub const DEFAULT_DATASET_SEED: u64 = 0x5167_0A11_7E57_0042;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomError {
    InvalidUpperBound,
    InvalidRange,
    InvalidLength,
}

impl RandomError {
    #[must_use]
    pub const fn reason_code(self) -> &'static str {
        match self {
            Self::InvalidUpperBound => "random_upper_bound_rejected",
            Self::InvalidRange => "random_range_rejected",
            Self::InvalidLength => "random_length_rejected",
        }
    }
}

impl std::fmt::Display for RandomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUpperBound => write!(f, "upper_bound must be > 0"),
            Self::InvalidRange => write!(f, "range must be finite with low < high"),
            Self::InvalidLength => write!(f, "sample count must be > 0"),
        }
    }
}

impl std::error::Error for RandomError {}

/// Stream seed for a named case: the same base seed and label always
/// select the same stream.
#[must_use]
pub fn seed_for_label(base_seed: u64, label: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in label.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    splitmix64(base_seed ^ hash)
}

/// Counter-based splitmix64 stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeterministicRng {
    stream_seed: u64,
    counter: u64,
    spare_normal: Option<f64>,
}

impl DeterministicRng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            stream_seed: seed,
            counter: 0,
            spare_normal: None,
        }
    }

    #[must_use]
    pub fn for_label(base_seed: u64, label: &str) -> Self {
        Self::new(seed_for_label(base_seed, label))
    }

    #[must_use]
    pub const fn state(&self) -> (u64, u64) {
        (self.stream_seed, self.counter)
    }

    #[must_use]
    pub fn next_u64(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(1);
        splitmix64(
            self.stream_seed
                .wrapping_add(self.counter.wrapping_mul(GOLDEN_GAMMA)),
        )
    }

    /// Uniform in `[0, 1)` from the high 53 bits.
    #[must_use]
    pub fn next_f64(&mut self) -> f64 {
        let sample = self.next_u64() >> 11;
        sample as f64 / (1u64 << 53) as f64
    }

    pub fn bounded_u64(&mut self, upper_bound: u64) -> Result<u64, RandomError> {
        if upper_bound == 0 {
            return Err(RandomError::InvalidUpperBound);
        }
        let threshold = u64::MAX - u64::MAX % upper_bound;
        loop {
            let candidate = self.next_u64();
            if candidate < threshold {
                return Ok(candidate % upper_bound);
            }
        }
    }

    pub fn uniform(&mut self, low: f64, high: f64, size: usize) -> Result<Vec<f64>, RandomError> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(RandomError::InvalidRange);
        }
        let range = high - low;
        Ok((0..size).map(|_| low + self.next_f64() * range).collect())
    }

    /// Box-Muller; the second variate of each pair is kept for the next call.
    #[must_use]
    pub fn next_standard_normal(&mut self) -> f64 {
        if let Some(spare) = self.spare_normal.take() {
            return spare;
        }
        let mut u1 = self.next_f64();
        while u1 <= f64::MIN_POSITIVE {
            u1 = self.next_f64();
        }
        let u2 = self.next_f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = std::f64::consts::TAU * u2;
        self.spare_normal = Some(radius * theta.sin());
        radius * theta.cos()
    }

    #[must_use]
    pub fn standard_normal(&mut self, size: usize) -> Vec<f64> {
        (0..size).map(|_| self.next_standard_normal()).collect()
    }

    #[must_use]
    pub fn normal(&mut self, loc: f64, scale: f64, size: usize) -> Vec<f64> {
        self.standard_normal(size)
            .into_iter()
            .map(|z| loc + scale * z)
            .collect()
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(MIX_CONST1);
    x ^= x >> 27;
    x = x.wrapping_mul(MIX_CONST2);
    x ^ (x >> 31)
}
