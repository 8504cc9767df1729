//! Policy layer errors.
//!
//! Everything that can go wrong while building a policy from
//! configuration or while computing a seed.
//!
//! # Error code convention
//!
//! All policy errors use the `POLICY_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`UnknownPolicy`](PolicyError::UnknownPolicy) | `POLICY_UNKNOWN` | Yes |
//! | [`UnknownAlgorithm`](PolicyError::UnknownAlgorithm) | `POLICY_UNKNOWN_ALGORITHM` | Yes |
//! | [`MissingParameter`](PolicyError::MissingParameter) | `POLICY_MISSING_PARAMETER` | Yes |
//! | [`WrongType`](PolicyError::WrongType) | `POLICY_WRONG_TYPE` | Yes |
//! | [`ValueOutOfRange`](PolicyError::ValueOutOfRange) | `POLICY_VALUE_OUT_OF_RANGE` | Yes |
//! | [`SeedOutOfRange`](PolicyError::SeedOutOfRange) | `POLICY_SEED_OUT_OF_RANGE` | Yes |
//! | [`NoEngineEntry`](PolicyError::NoEngineEntry) | `POLICY_NO_ENGINE_ENTRY` | Yes |
//! | [`MixedEntry`](PolicyError::MixedEntry) | `POLICY_MIXED_ENTRY` | Yes |
//! | [`NestedPerEvent`](PolicyError::NestedPerEvent) | `POLICY_NESTED_PER_EVENT` | Yes |
//! | [`InvalidTimestamp`](PolicyError::InvalidTimestamp) | `POLICY_INVALID_TIMESTAMP` | No |
//!
//! Configuration mistakes are recoverable in the "fix and resubmit"
//! sense; an event arriving without a timestamp is not, since the input
//! data itself cannot serve the requested algorithm.

use sower_types::{EngineId, ErrorCode, Seed};
use thiserror::Error;

/// Policy layer error.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    /// The `policy` key names no known policy.
    #[error(
        "unknown seed policy '{name}'; known policies are: autoIncrement, \
         linearMapping, preDefinedOffset, preDefinedSeed, random, perEvent"
    )]
    UnknownPolicy {
        /// The unrecognized policy name.
        name: String,
    },

    /// The `algorithm` key of the perEvent policy names no known algorithm.
    #[error("unknown per-event seed algorithm '{name}'")]
    UnknownAlgorithm {
        /// The unrecognized algorithm name.
        name: String,
    },

    /// A required configuration key is absent.
    #[error("missing required configuration key '{key}' for {context}")]
    MissingParameter {
        /// What was being configured (a policy name, usually).
        context: String,
        /// The absent key.
        key: String,
    },

    /// A configuration key holds a value of the wrong type.
    #[error("configuration key '{key}' has the wrong type: expected {expected}")]
    WrongType {
        /// The offending key.
        key: String,
        /// What the key should have held.
        expected: &'static str,
    },

    /// A numeric configuration value does not fit the seed domain.
    #[error("configuration key '{key}' value {value} is outside the seed range")]
    ValueOutOfRange {
        /// The offending key.
        key: String,
        /// The out-of-range value.
        value: i64,
    },

    /// A computed seed fell outside the configured window.
    #[error(
        "policy '{policy}': seed {seed} for engine '{id}' has offset {offset} \
         outside the allowed range 0..{span} (as configured in maxUniqueEngines)"
    )]
    SeedOutOfRange {
        /// Name of the policy that produced the seed.
        policy: &'static str,
        /// Engine the seed was computed for.
        id: EngineId,
        /// The offending seed.
        seed: Seed,
        /// Its offset from the configured base.
        offset: i64,
        /// Number of seeds the configuration allows.
        span: Seed,
    },

    /// The per-engine table has no entry for the requested engine.
    #[error("no seed parameter configured for engine '{id}'")]
    NoEngineEntry {
        /// Engine whose entry is missing.
        id: EngineId,
    },

    /// The per-engine table shape disagrees with the engine's instance form.
    ///
    /// A nameless engine found a per-instance table, or a named instance
    /// found a bare value. The two forms cannot coexist under one module.
    #[error(
        "seed parameter for engine '{id}' is configured {found}, \
         but the engine requires {required}"
    )]
    MixedEntry {
        /// Engine whose entry has the wrong shape.
        id: EngineId,
        /// Shape found in the configuration.
        found: &'static str,
        /// Shape the engine's identity requires.
        required: &'static str,
    },

    /// `initSeedPolicy` tried to nest the perEvent policy inside itself.
    #[error("the perEvent policy cannot be used as its own pre-event policy")]
    NestedPerEvent,

    /// An event-dependent algorithm needs a timestamp the event lacks.
    #[error(
        "event has an invalid timestamp; per-event seed algorithm \
         EventTimestamp_v1 cannot serve engine '{id}'"
    )]
    InvalidTimestamp {
        /// Engine the seed was requested for.
        id: EngineId,
    },
}

impl ErrorCode for PolicyError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownPolicy { .. } => "POLICY_UNKNOWN",
            Self::UnknownAlgorithm { .. } => "POLICY_UNKNOWN_ALGORITHM",
            Self::MissingParameter { .. } => "POLICY_MISSING_PARAMETER",
            Self::WrongType { .. } => "POLICY_WRONG_TYPE",
            Self::ValueOutOfRange { .. } => "POLICY_VALUE_OUT_OF_RANGE",
            Self::SeedOutOfRange { .. } => "POLICY_SEED_OUT_OF_RANGE",
            Self::NoEngineEntry { .. } => "POLICY_NO_ENGINE_ENTRY",
            Self::MixedEntry { .. } => "POLICY_MIXED_ENTRY",
            Self::NestedPerEvent => "POLICY_NESTED_PER_EVENT",
            Self::InvalidTimestamp { .. } => "POLICY_INVALID_TIMESTAMP",
        }
    }

    fn is_recoverable(&self) -> bool {
        // every configuration mistake can be fixed and the job resubmitted
        !matches!(self, Self::InvalidTimestamp { .. })
    }
}
