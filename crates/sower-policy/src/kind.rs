//! The closed set of seed-assignment policy kinds.

use crate::PolicyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// All supported seed-assignment policies.
///
/// The set is closed: adding a policy means adding a variant here, a
/// configuration constructor, and a dispatch arm in
/// [`SeedPolicy`](crate::SeedPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Seeds are `baseSeed + k` for the k-th registered engine.
    AutoIncrement,
    /// Seeds are `maxUniqueEngines * nJob + k`; one window per grid job.
    LinearMapping,
    /// Per-engine offsets from the configuration, added to `baseSeed`.
    PredefinedOffset,
    /// Per-engine seeds taken verbatim from the configuration.
    PredefinedSeed,
    /// Seeds drawn from a private generator seeded by `masterSeed`.
    Random,
    /// Seeds recomputed for every event from the event's identity.
    PerEvent,
}

impl PolicyKind {
    /// Every kind, in configuration-name order.
    pub const ALL: &'static [PolicyKind] = &[
        Self::AutoIncrement,
        Self::LinearMapping,
        Self::PredefinedOffset,
        Self::PredefinedSeed,
        Self::Random,
        Self::PerEvent,
    ];

    /// Returns the configuration name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoIncrement => "autoIncrement",
            Self::LinearMapping => "linearMapping",
            Self::PredefinedOffset => "preDefinedOffset",
            Self::PredefinedSeed => "preDefinedSeed",
            Self::Random => "random",
            Self::PerEvent => "perEvent",
        }
    }

    /// Returns `true` if this policy can derive seeds from event data.
    #[must_use]
    pub fn is_event_dependent(&self) -> bool {
        matches!(self, Self::PerEvent)
    }
}

impl FromStr for PolicyKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownPolicy { name: s.to_string() })
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
