//! Service layer errors.
//!
//! Misuse of the registration protocol and seed collisions. None of
//! these are retried internally: the host framework is expected to
//! propagate them and abort the job, because running with an unintended
//! seed silently would destroy reproducibility.
//!
//! # Error code convention
//!
//! Service errors use the `SERVICE_` prefix; errors bubbling up from the
//! policy layer keep their `POLICY_` codes.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`IllegalPhase`](ServiceError::IllegalPhase) | `SERVICE_ILLEGAL_PHASE` | No |
//! | [`DuplicateEngine`](ServiceError::DuplicateEngine) | `SERVICE_DUPLICATE_ENGINE` | No |
//! | [`NotDeclared`](ServiceError::NotDeclared) | `SERVICE_NOT_DECLARED` | No |
//! | [`AlreadyDefined`](ServiceError::AlreadyDefined) | `SERVICE_ALREADY_DEFINED` | No |
//! | [`NoCurrentModule`](ServiceError::NoCurrentModule) | `SERVICE_NO_CURRENT_MODULE` | No |
//! | [`UnknownEngine`](ServiceError::UnknownEngine) | `SERVICE_UNKNOWN_ENGINE` | No |
//! | [`SeedCollision`](ServiceError::SeedCollision) | `SERVICE_SEED_COLLISION` | Yes |
//! | [`ProcessNameChanged`](ServiceError::ProcessNameChanged) | `SERVICE_PROCESS_NAME_CHANGED` | No |

use crate::JobPhase;
use sower_policy::PolicyError;
use sower_types::{EngineId, ErrorCode, Seed};
use thiserror::Error;

/// Service layer error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An operation ran in a host phase where it is not allowed.
    #[error("{operation} is not allowed during {phase}")]
    IllegalPhase {
        /// The attempted operation.
        operation: &'static str,
        /// The phase the host was in.
        phase: JobPhase,
    },

    /// An engine with this id has already been registered.
    #[error("an engine with id '{id}' has already been registered")]
    DuplicateEngine {
        /// The id registered twice.
        id: EngineId,
    },

    /// `define_engine` was called for an engine never declared.
    #[error("cannot define engine '{id}': it was never declared")]
    NotDeclared {
        /// The undeclared id.
        id: EngineId,
    },

    /// `define_engine` was called for an engine that already has a seeder.
    #[error("cannot redefine engine '{id}': it already has a seeder")]
    AlreadyDefined {
        /// The already-defined id.
        id: EngineId,
    },

    /// A module-scoped operation ran while no module was current.
    #[error("{operation} requires a current module, but none is set")]
    NoCurrentModule {
        /// The attempted operation.
        operation: &'static str,
    },

    /// An operation referenced an engine that was never registered.
    #[error("no engine with id '{id}' is registered")]
    UnknownEngine {
        /// The unknown id.
        id: EngineId,
    },

    /// A unique-yielding policy produced a seed already in use.
    #[error(
        "seed {seed} computed for engine '{id}' is already used by \
         engine '{other}'"
    )]
    SeedCollision {
        /// Engine the colliding seed was computed for.
        id: EngineId,
        /// Engine already holding the seed.
        other: EngineId,
        /// The shared seed value.
        seed: Seed,
    },

    /// Two modules reported different process names within one job.
    #[error("process name changed from '{previous}' to '{current}'")]
    ProcessNameChanged {
        /// Process name seen first.
        previous: String,
        /// Conflicting process name.
        current: String,
    },

    /// A failure in the policy layer.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl ErrorCode for ServiceError {
    fn code(&self) -> &'static str {
        match self {
            Self::IllegalPhase { .. } => "SERVICE_ILLEGAL_PHASE",
            Self::DuplicateEngine { .. } => "SERVICE_DUPLICATE_ENGINE",
            Self::NotDeclared { .. } => "SERVICE_NOT_DECLARED",
            Self::AlreadyDefined { .. } => "SERVICE_ALREADY_DEFINED",
            Self::NoCurrentModule { .. } => "SERVICE_NO_CURRENT_MODULE",
            Self::UnknownEngine { .. } => "SERVICE_UNKNOWN_ENGINE",
            Self::SeedCollision { .. } => "SERVICE_SEED_COLLISION",
            Self::ProcessNameChanged { .. } => "SERVICE_PROCESS_NAME_CHANGED",
            Self::Policy(inner) => inner.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // a collision means the seed configuration needs widening
            Self::SeedCollision { .. } => true,
            Self::Policy(inner) => inner.is_recoverable(),
            _ => false,
        }
    }
}
