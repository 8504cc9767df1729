//! Per-engine value tables for the predefined policies.
//!
//! The configuration grammar takes two forms. A module with a single
//! nameless engine gets a bare value:
//!
//! ```toml
//! generator = 3
//! ```
//!
//! A module with named engine instances gets a sub-table:
//!
//! ```toml
//! generator = { nominal = 3, aux = 5 }
//! ```
//!
//! Global engines are keyed directly by instance name at the top level.
//! Nameless and named entries cannot coexist under one module.

use crate::{config, PolicyError};
use sower_types::{EngineId, Seed};
use std::collections::BTreeMap;
use std::fmt;
use toml::Table;

#[derive(Debug, Clone)]
enum Entry {
    /// Single nameless engine for this module.
    Value(Seed),
    /// One value per named instance.
    PerInstance(BTreeMap<String, Seed>),
}

/// Seed or offset values tabulated per engine in the configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineTable {
    entries: BTreeMap<String, Entry>,
}

impl EngineTable {
    /// Parses the per-engine entries out of a policy table.
    ///
    /// Keys listed in [`config::COMMON_KEYS`] or in `skip` are policy
    /// parameters, not engine entries, and are ignored here.
    ///
    /// # Errors
    ///
    /// [`PolicyError::WrongType`] / [`PolicyError::ValueOutOfRange`] for
    /// entries that are neither seed values nor tables of seed values.
    pub fn from_config(table: &Table, skip: &[&str]) -> Result<Self, PolicyError> {
        let mut entries = BTreeMap::new();
        for (key, value) in table {
            if config::COMMON_KEYS.contains(&key.as_str()) || skip.contains(&key.as_str()) {
                continue;
            }
            let entry = match value {
                toml::Value::Integer(value) => {
                    let seed = Seed::try_from(*value).map_err(|_| {
                        PolicyError::ValueOutOfRange {
                            key: key.clone(),
                            value: *value,
                        }
                    })?;
                    Entry::Value(seed)
                }
                toml::Value::Table(instances) => {
                    let mut per_instance = BTreeMap::new();
                    for instance in instances.keys() {
                        let seed = config::get_seed(instances, instance)?.ok_or_else(|| {
                            PolicyError::WrongType {
                                key: format!("{key}.{instance}"),
                                expected: "integer",
                            }
                        })?;
                        per_instance.insert(instance.clone(), seed);
                    }
                    Entry::PerInstance(per_instance)
                }
                _ => {
                    return Err(PolicyError::WrongType {
                        key: key.clone(),
                        expected: "integer or table of integers",
                    })
                }
            };
            entries.insert(key.clone(), entry);
        }
        Ok(Self { entries })
    }

    /// Returns the tabulated value for `id`.
    ///
    /// # Errors
    ///
    /// [`PolicyError::NoEngineEntry`] when the module (or instance, or
    /// global name) has no entry; [`PolicyError::MixedEntry`] when the
    /// entry shape disagrees with the engine's instance form.
    pub fn lookup(&self, id: &EngineId) -> Result<Seed, PolicyError> {
        // global engines are keyed by instance name at the top level
        let key = if id.is_global() {
            &id.instance_name
        } else {
            &id.module_label
        };
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| PolicyError::NoEngineEntry { id: id.clone() })?;

        match entry {
            Entry::Value(seed) => {
                if !id.is_global() && id.has_instance() {
                    return Err(PolicyError::MixedEntry {
                        id: id.clone(),
                        found: "as a bare value",
                        required: "a per-instance table",
                    });
                }
                Ok(*seed)
            }
            Entry::PerInstance(instances) => {
                if id.is_global() || !id.has_instance() {
                    return Err(PolicyError::MixedEntry {
                        id: id.clone(),
                        found: "as a per-instance table",
                        required: "a bare value",
                    });
                }
                instances
                    .get(&id.instance_name)
                    .copied()
                    .ok_or_else(|| PolicyError::NoEngineEntry { id: id.clone() })
            }
        }
    }

    /// Number of modules (or global names) with entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no engine entries were configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for EngineTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configured engine entries", self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_table(src: &str) -> EngineTable {
        let table: Table = src.parse().expect("test fixture must parse");
        EngineTable::from_config(&table, &[]).expect("fixture must be a valid table")
    }

    #[test]
    fn bare_value_for_nameless_engine() {
        let table = engine_table("modA = 7");
        assert_eq!(table.lookup(&EngineId::new("modA", "")).unwrap(), 7);
    }

    #[test]
    fn per_instance_table_for_named_engines() {
        let table = engine_table("modB = { x = 9, y = 11 }");
        assert_eq!(table.lookup(&EngineId::new("modB", "x")).unwrap(), 9);
        assert_eq!(table.lookup(&EngineId::new("modB", "y")).unwrap(), 11);
    }

    #[test]
    fn missing_module_fails() {
        let table = engine_table("modA = 7");
        let err = table.lookup(&EngineId::new("modB", "")).unwrap_err();
        assert!(matches!(err, PolicyError::NoEngineEntry { .. }));
    }

    #[test]
    fn missing_instance_fails() {
        let table = engine_table("modB = { x = 9 }");
        let err = table.lookup(&EngineId::new("modB", "y")).unwrap_err();
        assert!(matches!(err, PolicyError::NoEngineEntry { .. }));
    }

    #[test]
    fn named_engine_against_bare_value_fails() {
        let table = engine_table("modA = 7");
        let err = table.lookup(&EngineId::new("modA", "x")).unwrap_err();
        assert!(matches!(err, PolicyError::MixedEntry { .. }));
    }

    #[test]
    fn nameless_engine_against_instance_table_fails() {
        let table = engine_table("modB = { x = 9 }");
        let err = table.lookup(&EngineId::new("modB", "")).unwrap_err();
        assert!(matches!(err, PolicyError::MixedEntry { .. }));
    }

    #[test]
    fn global_engines_keyed_by_instance() {
        let table = engine_table("pileup = 13");
        assert_eq!(table.lookup(&EngineId::global("pileup")).unwrap(), 13);

        let named = engine_table("pileup = { a = 1 }");
        let err = named.lookup(&EngineId::global("pileup")).unwrap_err();
        assert!(matches!(err, PolicyError::MixedEntry { .. }));
    }

    #[test]
    fn policy_parameters_are_skipped() {
        let table: Table = "policy = \"preDefinedSeed\"\nverbosity = 1\nbaseSeed = 5\nmodA = 7"
            .parse()
            .unwrap();
        let parsed = EngineTable::from_config(&table, &["baseSeed"]).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn negative_entry_rejected() {
        let table: Table = "modA = -3".parse().unwrap();
        let err = EngineTable::from_config(&table, &[]).unwrap_err();
        assert!(matches!(err, PolicyError::ValueOutOfRange { .. }));
    }
}
