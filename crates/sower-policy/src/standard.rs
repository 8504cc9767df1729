//! The counter-based and table-based seed policies.

use crate::{config, EngineTable, PolicyError, RangeCheck};
use sower_types::{EngineId, Seed};
use std::fmt;
use toml::Table;

/// Keys consumed by the windowed policies besides the common ones.
const WINDOW_KEYS: &[&str] = &["baseSeed", "checkRange", "maxUniqueEngines"];

/// The `autoIncrement` policy: `baseSeed + k` for the k-th engine.
///
/// Engines receive consecutive seeds in registration order. Uniqueness
/// is structural; the range check guards against registering more
/// engines than the configuration planned for.
#[derive(Debug, Clone)]
pub struct AutoIncrementPolicy {
    first: Seed,
    next: Seed,
    range: RangeCheck,
}

impl AutoIncrementPolicy {
    /// Configuration keys: `baseSeed` (required), `checkRange` (default
    /// `true`), `maxUniqueEngines` (required when checking).
    pub fn from_config(table: &Table) -> Result<Self, PolicyError> {
        let first = config::require_seed(table, "baseSeed", "autoIncrement")?;
        let range = RangeCheck::from_config(table, "autoIncrement", first)?;
        config::warn_unknown_keys(table, "autoIncrement", WINDOW_KEYS);
        Ok(Self {
            first,
            next: first,
            range,
        })
    }

    /// Returns the next seed in the sequence.
    pub fn next_seed(&mut self, id: &EngineId) -> Result<Seed, PolicyError> {
        let seed = self.next;
        self.range.ensure("autoIncrement", id, seed)?;
        self.next = self.next.wrapping_add(1);
        Ok(seed)
    }
}

impl fmt::Display for AutoIncrementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  first seed: {}", self.range, self.first)
    }
}

/// The `linearMapping` policy: `maxUniqueEngines * nJob + k`.
///
/// Each grid job owns a disjoint window of `maxUniqueEngines` seeds;
/// the submitter only has to pick a distinct `nJob` per job.
#[derive(Debug, Clone)]
pub struct LinearMappingPolicy {
    first: Seed,
    next: Seed,
    seeds_per_job: Seed,
    range: RangeCheck,
}

impl LinearMappingPolicy {
    /// Configuration keys: `nJob` (required), `maxUniqueEngines`
    /// (required; the formula needs it even without the range check),
    /// `checkRange` (default `true`).
    pub fn from_config(table: &Table) -> Result<Self, PolicyError> {
        let n_job = match config::get_seed(table, "nJob")? {
            Some(n) => n,
            None => match config::get_seed(table, "baseSeed")? {
                Some(n) => {
                    tracing::warn!(
                        "'baseSeed' is deprecated for the linearMapping policy, \
                         use 'nJob' instead"
                    );
                    n
                }
                None => {
                    return Err(PolicyError::MissingParameter {
                        context: "linearMapping".to_string(),
                        key: "nJob".to_string(),
                    })
                }
            },
        };
        let seeds_per_job = config::require_seed(table, "maxUniqueEngines", "linearMapping")?;
        let first = seeds_per_job
            .checked_mul(n_job)
            .ok_or(PolicyError::ValueOutOfRange {
                key: "nJob".to_string(),
                value: i64::from(n_job),
            })?;
        let enabled = config::get_bool(table, "checkRange")?.unwrap_or(true);
        config::warn_unknown_keys(table, "linearMapping", &["nJob", "baseSeed", "checkRange", "maxUniqueEngines"]);
        Ok(Self {
            first,
            next: first,
            seeds_per_job,
            range: RangeCheck::window(enabled, first, seeds_per_job),
        })
    }

    /// Returns the next seed in this job's window.
    pub fn next_seed(&mut self, id: &EngineId) -> Result<Seed, PolicyError> {
        let seed = self.next;
        self.range.ensure("linearMapping", id, seed)?;
        self.next = self.next.wrapping_add(1);
        Ok(seed)
    }
}

impl fmt::Display for LinearMappingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  first seed:    {}\n  seeds per job: {}",
            self.range, self.first, self.seeds_per_job
        )
    }
}

/// The `preDefinedOffset` policy: `baseSeed + ` a tabulated per-engine offset.
#[derive(Debug, Clone)]
pub struct PredefinedOffsetPolicy {
    base: Seed,
    offsets: EngineTable,
    range: RangeCheck,
}

impl PredefinedOffsetPolicy {
    /// Configuration keys: `baseSeed` (required), the window keys, and
    /// one offset entry per engine.
    pub fn from_config(table: &Table) -> Result<Self, PolicyError> {
        let base = config::require_seed(table, "baseSeed", "preDefinedOffset")?;
        let range = RangeCheck::from_config(table, "preDefinedOffset", base)?;
        let offsets = EngineTable::from_config(table, WINDOW_KEYS)?;
        Ok(Self {
            base,
            offsets,
            range,
        })
    }

    /// Returns the tabulated seed for `id`.
    pub fn seed_for(&self, id: &EngineId) -> Result<Seed, PolicyError> {
        let offset = self.offsets.lookup(id)?;
        let seed = self.base.wrapping_add(offset);
        self.range.ensure("preDefinedOffset", id, seed)?;
        Ok(seed)
    }
}

impl fmt::Display for PredefinedOffsetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  base seed: {}\n  {}",
            self.range, self.base, self.offsets
        )
    }
}

/// The `preDefinedSeed` policy: per-engine seeds taken verbatim.
///
/// No uniqueness or range constraints are imposed on the configured
/// values. Intended for debugging and special tests.
#[derive(Debug, Clone)]
pub struct PredefinedSeedPolicy {
    seeds: EngineTable,
}

impl PredefinedSeedPolicy {
    /// Configuration: one seed entry per engine.
    pub fn from_config(table: &Table) -> Result<Self, PolicyError> {
        let seeds = EngineTable::from_config(table, WINDOW_KEYS)?;
        Ok(Self { seeds })
    }

    /// Returns the configured seed for `id`.
    pub fn seed_for(&self, id: &EngineId) -> Result<Seed, PolicyError> {
        self.seeds.lookup(id)
    }
}

impl fmt::Display for PredefinedSeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seeds directly from the configuration\n  {}", self.seeds)
    }
}
