#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seedable uniform random sources consumed by the height-map engine.
//!
//! Every random draw the engine performs goes through [`UniformSource`].
//! [`SeededRandom`] is the production implementation: a closed set of two
//! generator families selected when the source is seeded, with seed values
//! mapped to generator state through SHA-256 so text and numeric seeds
//! reproduce the same stream on every platform.

use dsmap_core::{PrngAlgorithm, SeedValue};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_pcg::Pcg64;
use sha2::{Digest, Sha256};

const SEED_TAG_TEXT: u8 = 0x54;
const SEED_TAG_NUMBER: u8 = 0x4e;

/// Capability interface of a reseedable source of uniform values in `[0, 1)`.
pub trait UniformSource {
    /// Draws the next value, uniformly distributed in `[0, 1)`.
    fn next_uniform(&mut self) -> f64;

    /// Restarts the stream deterministically from `value` using `algorithm`.
    fn reseed(&mut self, value: &SeedValue, algorithm: PrngAlgorithm);
}

/// Production random source backed by one of the supported generator families.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    generator: Generator,
}

#[derive(Clone, Debug)]
enum Generator {
    Standard(ChaCha8Rng),
    Alternate(Pcg64),
}

impl SeededRandom {
    /// Creates a source seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            generator: Generator::Standard(ChaCha8Rng::from_entropy()),
        }
    }

    /// Creates a source whose stream is fully determined by `value` and `algorithm`.
    #[must_use]
    pub fn seeded(value: &SeedValue, algorithm: PrngAlgorithm) -> Self {
        let seed = derive_seed(value);
        let generator = match algorithm {
            PrngAlgorithm::Standard => Generator::Standard(ChaCha8Rng::from_seed(seed)),
            PrngAlgorithm::Alternate => Generator::Alternate(Pcg64::from_seed(seed)),
        };
        Self { generator }
    }

    /// Generator family currently producing values.
    #[must_use]
    pub fn algorithm(&self) -> PrngAlgorithm {
        match self.generator {
            Generator::Standard(_) => PrngAlgorithm::Standard,
            Generator::Alternate(_) => PrngAlgorithm::Alternate,
        }
    }
}

impl UniformSource for SeededRandom {
    fn next_uniform(&mut self) -> f64 {
        match &mut self.generator {
            Generator::Standard(rng) => rng.gen::<f64>(),
            Generator::Alternate(rng) => rng.gen::<f64>(),
        }
    }

    fn reseed(&mut self, value: &SeedValue, algorithm: PrngAlgorithm) {
        tracing::trace!(seed = %value, ?algorithm, "reseeding random source");
        *self = Self::seeded(value, algorithm);
    }
}

/// Maps a seed value onto the 32 bytes of generator state both families accept.
#[must_use]
pub fn derive_seed(value: &SeedValue) -> [u8; 32] {
    let mut hasher = Sha256::new();
    match value {
        SeedValue::Text(text) => {
            hasher.update([SEED_TAG_TEXT]);
            hasher.update(text.as_bytes());
        }
        SeedValue::Number(number) => {
            hasher.update([SEED_TAG_NUMBER]);
            hasher.update(number.to_le_bytes());
        }
    }
    let digest = hasher.finalize();
    let mut seed = [0_u8; 32];
    seed.copy_from_slice(&digest);
    seed
}
