//! The seed master: policy, engine records, and seed caches.
//!
//! One `SeedMaster` serves a whole job. It owns the configured policy
//! and, per registered engine, a record (seeder callback + frozen flag)
//! and up to three cached seeds:
//!
//! - **configured**: computed once from the policy at first request,
//!   then stable (or written once by a freeze);
//! - **known event**: the per-event seed of the event being processed,
//!   cleared at every event boundary;
//! - **current**: the most recently assigned seed, kept only for
//!   observation and the end-of-job report.
//!
//! Two registrations of the same id, and two engines sharing a seed
//! under a unique-yielding policy, are errors: a job that would run
//! with an accidental collision must abort instead.

use crate::{BoxedSeeder, ServiceError};
use sower_policy::SeedPolicy;
use sower_types::{is_seed_valid, EngineId, EventData, Seed, INVALID_SEED};
use std::collections::BTreeMap;
use std::fmt;
use toml::Table;

/// Per-engine bookkeeping.
struct EngineRecord {
    /// Callback pushing seeds into the real engine; `None` for engines
    /// that were only declared.
    seeder: Option<BoxedSeeder>,
    /// Once frozen, no policy-driven reseed touches the engine again.
    frozen: bool,
}

impl fmt::Debug for EngineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRecord")
            .field("has_seeder", &self.seeder.is_some())
            .field("frozen", &self.frozen)
            .finish()
    }
}

/// Which seed cache a uniqueness scan runs against.
#[derive(Clone, Copy)]
enum Cache {
    Configured,
    KnownEvent,
}

/// Distributes guaranteed-unique seeds to every engine id in a job.
///
/// The master is policy-agnostic: it asks its [`SeedPolicy`] for every
/// seed, caches the answers per engine id, verifies the uniqueness the
/// policy claims, and remembers which engines are frozen by an explicit
/// override.
///
/// Direct use is for host-less contexts; inside a framework, go through
/// the service adapter, which adds phase policing and identifier
/// qualification on top.
#[derive(Debug)]
pub struct SeedMaster {
    policy: SeedPolicy,
    engines: BTreeMap<EngineId, EngineRecord>,
    configured: BTreeMap<EngineId, Seed>,
    known_event: BTreeMap<EngineId, Seed>,
    current: BTreeMap<EngineId, Seed>,
}

impl SeedMaster {
    /// Creates a master around an already-built policy.
    #[must_use]
    pub fn new(policy: SeedPolicy) -> Self {
        Self {
            policy,
            engines: BTreeMap::new(),
            configured: BTreeMap::new(),
            known_event: BTreeMap::new(),
            current: BTreeMap::new(),
        }
    }

    /// Creates a master from a configuration table (`policy` key plus
    /// the selected policy's parameters).
    ///
    /// # Errors
    ///
    /// Whatever the policy factory rejects.
    pub fn from_config(table: &Table) -> Result<Self, ServiceError> {
        Ok(Self::new(SeedPolicy::from_config(table)?))
    }

    /// The configured policy.
    #[must_use]
    pub fn policy(&self) -> &SeedPolicy {
        &self.policy
    }

    /// Returns `true` if an engine with this id was registered.
    #[must_use]
    pub fn has_engine(&self, id: &EngineId) -> bool {
        self.engines.contains_key(id)
    }

    /// Returns `true` if the engine exists and has a seeder bound.
    #[must_use]
    pub fn has_seeder(&self, id: &EngineId) -> bool {
        self.engines
            .get(id)
            .is_some_and(|record| record.seeder.is_some())
    }

    /// Returns `true` if the engine exists and is frozen.
    #[must_use]
    pub fn is_frozen(&self, id: &EngineId) -> bool {
        self.engines.get(id).is_some_and(|record| record.frozen)
    }

    /// The registered engine ids, in id order.
    pub fn engine_ids(&self) -> impl Iterator<Item = &EngineId> {
        self.engines.keys()
    }

    /// Binds `seeder` to `id`, creating the record if needed.
    ///
    /// An existing record keeps its frozen flag; its seeder is replaced.
    pub fn register_seeder(&mut self, id: EngineId, seeder: Option<BoxedSeeder>) {
        match self.engines.get_mut(&id) {
            Some(record) => record.seeder = seeder,
            None => {
                self.engines.insert(
                    id,
                    EngineRecord {
                        seeder,
                        frozen: false,
                    },
                );
            }
        }
    }

    /// Binds `seeder` to `id`, which must not be registered yet.
    ///
    /// # Errors
    ///
    /// [`ServiceError::DuplicateEngine`] if the id already has a record.
    pub fn register_new_seeder(
        &mut self,
        id: EngineId,
        seeder: Option<BoxedSeeder>,
    ) -> Result<(), ServiceError> {
        if self.has_engine(&id) {
            return Err(ServiceError::DuplicateEngine { id });
        }
        self.register_seeder(id, seeder);
        Ok(())
    }

    /// Pins `id` to `seed`: the configured and current caches take the
    /// value, and no policy-driven reseed will ever touch the engine.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UnknownEngine`] if no engine with this id exists.
    pub fn freeze_seed(&mut self, id: &EngineId, seed: Seed) -> Result<(), ServiceError> {
        let record = self
            .engines
            .get_mut(id)
            .ok_or_else(|| ServiceError::UnknownEngine { id: id.clone() })?;
        record.frozen = true;
        self.configured.insert(id.clone(), seed);
        self.current.insert(id.clone(), seed);
        Ok(())
    }

    /// Returns the configured seed for `id`, computing it on first use.
    ///
    /// Later calls return the cached value unchanged. Under a
    /// unique-yielding policy the fresh value is scanned against every
    /// other configured seed first.
    ///
    /// # Errors
    ///
    /// Policy failures, or [`ServiceError::SeedCollision`].
    pub fn get_seed(&mut self, id: &EngineId) -> Result<Seed, ServiceError> {
        if let Some(&seed) = self.configured.get(id) {
            return Ok(seed);
        }
        let seed = self.policy.get_seed(id)?;
        if self.policy.yields_unique_seeds() {
            self.ensure_unique(id, seed, Cache::Configured)?;
        }
        self.configured.insert(id.clone(), seed);
        self.record_current(id, seed);
        Ok(seed)
    }

    /// Returns the seed of `id` for the event described by `data`,
    /// computing and caching it on first use within the event.
    ///
    /// # Errors
    ///
    /// Policy failures, or [`ServiceError::SeedCollision`] against the
    /// per-event cache.
    pub fn get_event_seed(
        &mut self,
        data: &EventData,
        id: &EngineId,
    ) -> Result<Seed, ServiceError> {
        if let Some(&seed) = self.known_event.get(id) {
            return Ok(seed);
        }
        let seed = self.policy.get_event_seed(id, data)?;
        if is_seed_valid(seed) && self.policy.yields_unique_seeds() {
            self.ensure_unique(id, seed, Cache::KnownEvent)?;
        }
        self.known_event.insert(id.clone(), seed);
        self.record_current(id, seed);
        Ok(seed)
    }

    /// The most recently assigned seed, or [`INVALID_SEED`].
    #[must_use]
    pub fn get_current_seed(&self, id: &EngineId) -> Seed {
        self.current.get(id).copied().unwrap_or(INVALID_SEED)
    }

    /// Recomputes the configured seed of `id` and pushes it into the
    /// engine.
    ///
    /// Returns [`INVALID_SEED`] without touching anything when the
    /// engine has no seeder or is frozen.
    ///
    /// # Errors
    ///
    /// The [`get_seed`](Self::get_seed) failures.
    pub fn reseed(&mut self, id: &EngineId) -> Result<Seed, ServiceError> {
        let eligible = self
            .engines
            .get(id)
            .is_some_and(|record| record.seeder.is_some() && !record.frozen);
        if !eligible {
            return Ok(INVALID_SEED);
        }
        let seed = self.get_seed(id)?;
        if is_seed_valid(seed) {
            self.apply_seed(id, seed);
        }
        Ok(seed)
    }

    /// Computes the event seed of `id` and pushes it into the engine
    /// unless the engine is frozen.
    ///
    /// The event seed is returned either way, so callers can tell
    /// "frozen" apart from "policy yielded no seed". Engines without a
    /// seeder yield [`INVALID_SEED`] immediately.
    ///
    /// # Errors
    ///
    /// The [`get_event_seed`](Self::get_event_seed) failures.
    pub fn reseed_event(
        &mut self,
        id: &EngineId,
        data: &EventData,
    ) -> Result<Seed, ServiceError> {
        let (has_seeder, frozen) = match self.engines.get(id) {
            Some(record) => (record.seeder.is_some(), record.frozen),
            None => (false, false),
        };
        if !has_seeder {
            return Ok(INVALID_SEED);
        }
        let seed = self.get_event_seed(data, id)?;
        if !frozen && is_seed_valid(seed) {
            self.apply_seed(id, seed);
        }
        Ok(seed)
    }

    /// Forgets every per-event seed; called at each event boundary.
    pub fn on_new_event(&mut self) {
        self.known_event.clear();
    }

    /// Invokes the engine's seeder with `seed`, if it has one.
    pub(crate) fn apply_seed(&mut self, id: &EngineId, seed: Seed) {
        if let Some(record) = self.engines.get_mut(id) {
            if let Some(seeder) = &mut record.seeder {
                seeder.apply(id, seed);
            }
        }
    }

    fn record_current(&mut self, id: &EngineId, seed: Seed) {
        if is_seed_valid(seed) {
            self.current.insert(id.clone(), seed);
        } else {
            // keep the id visible in the report, but never downgrade a
            // previously assigned seed to invalid
            self.current.entry(id.clone()).or_insert(seed);
        }
    }

    fn ensure_unique(
        &self,
        id: &EngineId,
        seed: Seed,
        cache: Cache,
    ) -> Result<(), ServiceError> {
        let seeds = match cache {
            Cache::Configured => &self.configured,
            Cache::KnownEvent => &self.known_event,
        };
        for (other, &held) in seeds {
            if other == id {
                continue;
            }
            if held == seed {
                return Err(ServiceError::SeedCollision {
                    id: id.clone(),
                    other: other.clone(),
                    seed,
                });
            }
        }
        Ok(())
    }

    /// Writes the human-readable seed report.
    ///
    /// One row per known engine: configured value, last value, id, plus
    /// `(global)` and `[overridden]` markers. Rows whose configured and
    /// current values disagree in ways the bookkeeping forbids are
    /// flagged loudly.
    pub fn write_summary<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        write!(out, "Summary of seeds computed by the seed service")?;
        write!(out, "\n{}", self.policy)?;
        if self.current.is_empty() {
            return writeln!(out);
        }
        write!(
            out,
            "\n {:>18}  {:>18}   ModuleLabel.InstanceName",
            "Configured value", "Last value"
        )?;
        for (id, &current) in &self.current {
            let configured = self.configured.get(id).copied().unwrap_or(INVALID_SEED);
            write!(out, "\n ")?;
            if !is_seed_valid(configured) {
                if !is_seed_valid(current) {
                    write!(out, "{:>18}  {:>18}   {id}", "INVALID!!!", "")?;
                } else {
                    write!(out, "{:>18}  {:>18}   {id}", "(per event)", current)?;
                }
            } else if configured == current {
                write!(out, "{configured:>18}  {:>18}   {id}", "(same)")?;
            } else {
                write!(out, "{configured:>18}  {current:>18}   {id}  [[ERROR!!!]]")?;
            }
            if id.is_global() {
                write!(out, " (global)")?;
            }
            if self.is_frozen(id) {
                write!(out, " [overridden]")?;
            }
        }
        writeln!(out)
    }

    /// The seed report as a string.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        self.write_summary(&mut out)
            .expect("writing to a String cannot fail");
        out
    }
}
