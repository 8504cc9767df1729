//! Seed range checking shared by the windowed policies.

use crate::{config, PolicyError};
use sower_types::{EngineId, Seed};
use std::fmt;
use toml::Table;

/// Verifies that computed seeds stay inside a configured window.
///
/// The windowed policies promise at most `maxUniqueEngines` distinct
/// seeds starting at some base; a seed outside `[base, base + span)`
/// means the job registered more engines than the configuration planned
/// for, which would silently collide with another job's window.
#[derive(Debug, Clone, Copy)]
pub struct RangeCheck {
    enabled: bool,
    base: Seed,
    span: Seed,
}

impl RangeCheck {
    /// Builds the check from `checkRange` / `maxUniqueEngines` keys.
    ///
    /// `checkRange` defaults to `true`; when it is enabled,
    /// `maxUniqueEngines` becomes mandatory. The `base` is supplied by
    /// the policy (its first seed).
    ///
    /// # Errors
    ///
    /// [`PolicyError::MissingParameter`] when the check is enabled
    /// without `maxUniqueEngines`, plus the getter failures.
    pub fn from_config(table: &Table, policy: &str, base: Seed) -> Result<Self, PolicyError> {
        let enabled = config::get_bool(table, "checkRange")?.unwrap_or(true);
        let span = match config::get_seed(table, "maxUniqueEngines")? {
            Some(span) => span,
            None if enabled => {
                return Err(PolicyError::MissingParameter {
                    context: policy.to_string(),
                    key: "maxUniqueEngines".to_string(),
                })
            }
            None => 0,
        };
        Ok(Self { enabled, base, span })
    }

    /// A check that accepts everything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            base: 0,
            span: 0,
        }
    }

    /// An explicit window, already validated by the caller.
    #[must_use]
    pub const fn window(enabled: bool, base: Seed, span: Seed) -> Self {
        Self { enabled, base, span }
    }

    /// Returns `true` if the check is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ensures `seed` lies inside the window.
    ///
    /// # Errors
    ///
    /// [`PolicyError::SeedOutOfRange`] naming the engine, the seed, and
    /// its offset from the window base.
    pub fn ensure(
        &self,
        policy: &'static str,
        id: &EngineId,
        seed: Seed,
    ) -> Result<(), PolicyError> {
        if !self.enabled || (seed >= self.base && seed - self.base < self.span) {
            return Ok(());
        }
        Err(PolicyError::SeedOutOfRange {
            policy,
            id: id.clone(),
            seed,
            offset: i64::from(seed) - i64::from(self.base),
            span: self.span,
        })
    }
}

impl fmt::Display for RangeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled {
            write!(f, "maximum number of seeds: {}", self.span)
        } else {
            f.write_str("no limit on number of seeds")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> Table {
        src.parse().expect("test fixture must parse")
    }

    #[test]
    fn defaults_to_checking() {
        let err = RangeCheck::from_config(&table(""), "autoIncrement", 0).unwrap_err();
        assert!(matches!(err, PolicyError::MissingParameter { .. }));
    }

    #[test]
    fn disabled_check_needs_no_span() {
        let check =
            RangeCheck::from_config(&table("checkRange = false"), "autoIncrement", 0).unwrap();
        assert!(!check.is_enabled());
        let id = EngineId::new("gen", "");
        assert!(check.ensure("autoIncrement", &id, Seed::MAX).is_ok());
    }

    #[test]
    fn window_boundaries() {
        let check = RangeCheck::from_config(
            &table("checkRange = true\nmaxUniqueEngines = 3"),
            "autoIncrement",
            100,
        )
        .unwrap();
        let id = EngineId::new("gen", "");
        assert!(check.ensure("autoIncrement", &id, 100).is_ok());
        assert!(check.ensure("autoIncrement", &id, 102).is_ok());
        assert!(check.ensure("autoIncrement", &id, 103).is_err());
        assert!(check.ensure("autoIncrement", &id, 99).is_err());
    }

    #[test]
    fn violation_names_engine_and_offset() {
        let check = RangeCheck::window(true, 10, 2);
        let id = EngineId::new("gen", "x");
        let err = check.ensure("linearMapping", &id, 15).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gen.x"));
        assert!(msg.contains("15"));
        assert!(msg.contains("offset 5"));
    }
}
