//! The `random` policy: seeds drawn from a private generator.

use crate::{config, PolicyError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sower_types::{EngineId, Seed};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use toml::Table;

/// Largest seed the policy will draw; also bounds the clock-derived
/// master seed.
const MAX_DRAWN_SEED: Seed = 900_000_000;

/// Draws each engine's seed from a private PRNG.
///
/// The PRNG is seeded once at construction from `masterSeed` (or the
/// wall clock when absent), so a recorded master seed reproduces the
/// whole assignment. Meant to decouple code from the seeding policy in
/// special setups; not for production.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    master_seed: Seed,
    generator: ChaCha8Rng,
}

impl RandomPolicy {
    /// Configuration keys: `masterSeed` (optional; clock-derived when
    /// absent).
    pub fn from_config(table: &Table) -> Result<Self, PolicyError> {
        let master_seed = match config::get_seed(table, "masterSeed")? {
            Some(seed) => seed,
            None => clock_master_seed(),
        };
        config::warn_unknown_keys(table, "random", &["masterSeed"]);
        Ok(Self {
            master_seed,
            generator: ChaCha8Rng::seed_from_u64(u64::from(master_seed)),
        })
    }

    /// The seed the private generator was initialized with.
    #[must_use]
    pub fn master_seed(&self) -> Seed {
        self.master_seed
    }

    /// Draws the next seed, uniform in `[1, 900000000]`.
    pub fn next_seed(&mut self, _id: &EngineId) -> Result<Seed, PolicyError> {
        Ok(self.generator.gen_range(1..=MAX_DRAWN_SEED))
    }
}

/// Derives a master seed from the wall clock, in `[1, 900000000]`.
fn clock_master_seed() -> Seed {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    1 + (nanos % u128::from(MAX_DRAWN_SEED)) as Seed
}

impl fmt::Display for RandomPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "master seed: {}\n  seed within: [1; {MAX_DRAWN_SEED}]",
            self.master_seed
        )
    }
}
