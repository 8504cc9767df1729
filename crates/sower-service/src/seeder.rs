//! Seeder callbacks: how seeds reach the actual generators.
//!
//! The master does not own any random engine; it only remembers, per
//! registered id, a callback that knows how to push a seed into the real
//! generator. "No seeder" is an explicit state (a declared-only engine),
//! represented as `Option::None` on the record rather than a stub that
//! panics.

use parking_lot::Mutex;
use rand::SeedableRng;
use sower_types::{EngineId, Seed};
use std::sync::Arc;
use tracing::debug;

/// A callback that writes a seed into a real generator.
///
/// Any `FnMut(&EngineId, Seed)` closure is a seeder; the canned
/// implementations below cover the two engine families most hosts use.
pub trait Seeder: Send {
    /// Pushes `seed` into the engine identified by `id`.
    fn apply(&mut self, id: &EngineId, seed: Seed);
}

impl<F> Seeder for F
where
    F: FnMut(&EngineId, Seed) + Send,
{
    fn apply(&mut self, id: &EngineId, seed: Seed) {
        self(id, seed)
    }
}

/// A boxed seeder as stored on an engine record.
pub type BoxedSeeder = Box<dyn Seeder>;

/// A generator that can adopt a new seed in place.
///
/// Implement this for engine types that expose a native reseed entry
/// point; engines that can only be rebuilt from a seed are covered by
/// [`RngSeeder`] instead.
pub trait ReseedableEngine {
    /// Replaces the engine's seed, resetting its sequence.
    fn set_seed(&mut self, seed: Seed);
}

/// Seeder for a shared [`ReseedableEngine`].
///
/// The engine stays owned by the caller (or the host framework); the
/// seeder only holds a shared handle to reach it on reseed.
pub struct EngineSeeder<E> {
    engine: Arc<Mutex<E>>,
}

impl<E: ReseedableEngine> EngineSeeder<E> {
    /// Wraps a shared engine handle.
    #[must_use]
    pub fn new(engine: Arc<Mutex<E>>) -> Self {
        Self { engine }
    }
}

impl<E: ReseedableEngine + Send> Seeder for EngineSeeder<E> {
    fn apply(&mut self, id: &EngineId, seed: Seed) {
        debug!(engine = %id, seed, "reseeding engine in place");
        self.engine.lock().set_seed(seed);
    }
}

/// Seeder for a shared [`SeedableRng`] generator.
///
/// These generators cannot be reseeded in place, so the seeder rebuilds
/// the generator from the new seed, discarding its previous state.
pub struct RngSeeder<R> {
    rng: Arc<Mutex<R>>,
}

impl<R: SeedableRng> RngSeeder<R> {
    /// Wraps a shared generator handle.
    #[must_use]
    pub fn new(rng: Arc<Mutex<R>>) -> Self {
        Self { rng }
    }
}

impl<R: SeedableRng + Send> Seeder for RngSeeder<R> {
    fn apply(&mut self, id: &EngineId, seed: Seed) {
        debug!(engine = %id, seed, "rebuilding generator from seed");
        *self.rng.lock() = R::seed_from_u64(u64::from(seed));
    }
}
