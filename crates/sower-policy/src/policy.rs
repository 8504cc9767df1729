//! The policy variant and its configuration factory.

use crate::{
    config, AutoIncrementPolicy, LinearMappingPolicy, PerEventPolicy, PolicyError, PolicyKind,
    PredefinedOffsetPolicy, PredefinedSeedPolicy, RandomPolicy,
};
use sower_types::{EngineId, EventData, Seed, INVALID_SEED};
use std::fmt;
use toml::Table;

/// A configured seed-assignment policy.
///
/// The variant is selected by the `policy` key of the configuration
/// table; the remaining keys configure the selected variant (see each
/// policy type). The set is closed on purpose; see [`PolicyKind`] for
/// the complete enumeration.
///
/// # Example
///
/// ```
/// use sower_policy::SeedPolicy;
/// use sower_types::EngineId;
///
/// let table = "policy = \"autoIncrement\"\nbaseSeed = 100\ncheckRange = false"
///     .parse()
///     .unwrap();
/// let mut policy = SeedPolicy::from_config(&table).unwrap();
///
/// assert_eq!(policy.get_seed(&EngineId::new("gen", "")).unwrap(), 100);
/// assert_eq!(policy.get_seed(&EngineId::new("gen", "aux")).unwrap(), 101);
/// ```
#[derive(Debug, Clone)]
pub enum SeedPolicy {
    /// `baseSeed + k` in registration order.
    AutoIncrement(AutoIncrementPolicy),
    /// A per-job window of consecutive seeds.
    LinearMapping(LinearMappingPolicy),
    /// Tabulated offsets added to a base seed.
    PredefinedOffset(PredefinedOffsetPolicy),
    /// Tabulated seeds used verbatim.
    PredefinedSeed(PredefinedSeedPolicy),
    /// Draws from a private, reproducible generator.
    Random(RandomPolicy),
    /// Seeds recomputed from each event's identity.
    PerEvent(PerEventPolicy),
}

impl SeedPolicy {
    /// Builds the policy selected by the `policy` key of `table`.
    ///
    /// # Errors
    ///
    /// [`PolicyError::MissingParameter`] when the `policy` key is
    /// absent, [`PolicyError::UnknownPolicy`] for unrecognized names,
    /// and whatever the selected policy's constructor rejects.
    pub fn from_config(table: &Table) -> Result<Self, PolicyError> {
        let name = config::require_str(table, "policy", "the seed service")?;
        let kind: PolicyKind = name.parse()?;
        match kind {
            PolicyKind::AutoIncrement => {
                AutoIncrementPolicy::from_config(table).map(Self::AutoIncrement)
            }
            PolicyKind::LinearMapping => {
                LinearMappingPolicy::from_config(table).map(Self::LinearMapping)
            }
            PolicyKind::PredefinedOffset => {
                PredefinedOffsetPolicy::from_config(table).map(Self::PredefinedOffset)
            }
            PolicyKind::PredefinedSeed => {
                PredefinedSeedPolicy::from_config(table).map(Self::PredefinedSeed)
            }
            PolicyKind::Random => RandomPolicy::from_config(table).map(Self::Random),
            PolicyKind::PerEvent => PerEventPolicy::from_config(table).map(Self::PerEvent),
        }
    }

    /// The kind of this policy.
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::AutoIncrement(_) => PolicyKind::AutoIncrement,
            Self::LinearMapping(_) => PolicyKind::LinearMapping,
            Self::PredefinedOffset(_) => PolicyKind::PredefinedOffset,
            Self::PredefinedSeed(_) => PolicyKind::PredefinedSeed,
            Self::Random(_) => PolicyKind::Random,
            Self::PerEvent(_) => PolicyKind::PerEvent,
        }
    }

    /// Computes the configured (non-event) seed for `id`.
    ///
    /// For the perEvent policy this is the pre-event seed: the nested
    /// init policy's value, or no seed at all.
    pub fn get_seed(&mut self, id: &EngineId) -> Result<Seed, PolicyError> {
        match self {
            Self::AutoIncrement(policy) => policy.next_seed(id),
            Self::LinearMapping(policy) => policy.next_seed(id),
            Self::PredefinedOffset(policy) => policy.seed_for(id),
            Self::PredefinedSeed(policy) => policy.seed_for(id),
            Self::Random(policy) => policy.next_seed(id),
            Self::PerEvent(policy) => policy.pre_event_seed(id),
        }
    }

    /// Computes the per-event seed for `id`, or no seed for policies
    /// that do not depend on the event.
    pub fn get_event_seed(
        &mut self,
        id: &EngineId,
        data: &EventData,
    ) -> Result<Seed, PolicyError> {
        match self {
            Self::PerEvent(policy) => policy.event_seed(id, data),
            _ => Ok(INVALID_SEED),
        }
    }

    /// Whether the master must verify this policy's seeds never collide.
    ///
    /// The tabulated-seed and per-event policies make no such promise;
    /// everything else does.
    #[must_use]
    pub fn yields_unique_seeds(&self) -> bool {
        !matches!(self, Self::PredefinedSeed(_) | Self::PerEvent(_))
    }
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seed policy: '{}'\n  ", self.kind())?;
        match self {
            Self::AutoIncrement(policy) => fmt::Display::fmt(policy, f),
            Self::LinearMapping(policy) => fmt::Display::fmt(policy, f),
            Self::PredefinedOffset(policy) => fmt::Display::fmt(policy, f),
            Self::PredefinedSeed(policy) => fmt::Display::fmt(policy, f),
            Self::Random(policy) => fmt::Display::fmt(policy, f),
            Self::PerEvent(policy) => fmt::Display::fmt(policy, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sower_types::is_seed_valid;

    fn policy(src: &str) -> SeedPolicy {
        let table: Table = src.parse().expect("test fixture must parse");
        SeedPolicy::from_config(&table).expect("fixture must configure")
    }

    fn event() -> EventData {
        EventData {
            run: 1,
            subrun: 0,
            event: 9,
            timestamp: 777,
            is_time_valid: true,
            process_name: "TestJob".into(),
            module_label: "gen".into(),
        }
    }

    #[test]
    fn factory_requires_policy_key() {
        let table: Table = "baseSeed = 1".parse().unwrap();
        let err = SeedPolicy::from_config(&table).unwrap_err();
        assert!(matches!(err, PolicyError::MissingParameter { .. }));
    }

    #[test]
    fn factory_rejects_unknown_policy() {
        let table: Table = "policy = \"fibonacci\"".parse().unwrap();
        let err = SeedPolicy::from_config(&table).unwrap_err();
        assert!(matches!(err, PolicyError::UnknownPolicy { .. }));
    }

    #[test]
    fn factory_selects_each_kind() {
        let fixtures = [
            ("policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false", PolicyKind::AutoIncrement),
            ("policy = \"linearMapping\"\nnJob = 1\nmaxUniqueEngines = 4", PolicyKind::LinearMapping),
            ("policy = \"preDefinedOffset\"\nbaseSeed = 1\ncheckRange = false", PolicyKind::PredefinedOffset),
            ("policy = \"preDefinedSeed\"", PolicyKind::PredefinedSeed),
            ("policy = \"random\"\nmasterSeed = 1", PolicyKind::Random),
            ("policy = \"perEvent\"", PolicyKind::PerEvent),
        ];
        for (src, kind) in fixtures {
            assert_eq!(policy(src).kind(), kind, "{src}");
        }
    }

    #[test]
    fn uniqueness_claims() {
        assert!(policy("policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false")
            .yields_unique_seeds());
        assert!(policy("policy = \"random\"\nmasterSeed = 1").yields_unique_seeds());
        assert!(!policy("policy = \"preDefinedSeed\"").yields_unique_seeds());
        assert!(!policy("policy = \"perEvent\"").yields_unique_seeds());
    }

    #[test]
    fn non_event_policies_yield_no_event_seed() {
        let mut p = policy("policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false");
        let seed = p
            .get_event_seed(&EngineId::new("gen", ""), &event())
            .unwrap();
        assert_eq!(seed, INVALID_SEED);
    }

    #[test]
    fn per_event_policy_yields_event_seed() {
        let mut p = policy("policy = \"perEvent\"");
        let seed = p
            .get_event_seed(&EngineId::new("gen", ""), &event())
            .unwrap();
        assert!(is_seed_valid(seed));
    }

    #[test]
    fn description_names_the_policy() {
        let p = policy("policy = \"linearMapping\"\nnJob = 2\nmaxUniqueEngines = 8");
        let text = p.to_string();
        assert!(text.contains("linearMapping"));
        assert!(text.contains("seeds per job: 8"));
    }
}
