//! Typed access to TOML configuration tables.
//!
//! Policies (and the service adapter) are configured from hierarchical
//! key/value trees; this module provides the getters that turn loosely
//! typed [`toml::Table`] entries into checked values, failing with a
//! [`PolicyError`] that names the offending key.

use crate::PolicyError;
use sower_types::Seed;
use toml::Table;
use tracing::warn;

/// Keys recognized on every policy table, independent of the policy kind.
pub const COMMON_KEYS: &[&str] = &["policy", "verbosity", "endOfJobSummary"];

/// Reads an optional seed-valued (unsigned 32-bit) key.
///
/// # Errors
///
/// [`PolicyError::WrongType`] if the key holds a non-integer;
/// [`PolicyError::ValueOutOfRange`] if it does not fit a [`Seed`].
pub fn get_seed(table: &Table, key: &str) -> Result<Option<Seed>, PolicyError> {
    match get_i64(table, key)? {
        None => Ok(None),
        Some(value) => Seed::try_from(value)
            .map(Some)
            .map_err(|_| PolicyError::ValueOutOfRange {
                key: key.to_string(),
                value,
            }),
    }
}

/// Reads a required seed-valued key.
///
/// # Errors
///
/// [`PolicyError::MissingParameter`] naming `context` when absent, plus
/// the [`get_seed`] failures.
pub fn require_seed(table: &Table, key: &str, context: &str) -> Result<Seed, PolicyError> {
    get_seed(table, key)?.ok_or_else(|| PolicyError::MissingParameter {
        context: context.to_string(),
        key: key.to_string(),
    })
}

/// Reads an optional integer key.
///
/// # Errors
///
/// [`PolicyError::WrongType`] if the key holds a non-integer.
pub fn get_i64(table: &Table, key: &str) -> Result<Option<i64>, PolicyError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(value)) => Ok(Some(*value)),
        Some(_) => Err(PolicyError::WrongType {
            key: key.to_string(),
            expected: "integer",
        }),
    }
}

/// Reads an optional boolean key.
///
/// # Errors
///
/// [`PolicyError::WrongType`] if the key holds a non-boolean.
pub fn get_bool(table: &Table, key: &str) -> Result<Option<bool>, PolicyError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Boolean(value)) => Ok(Some(*value)),
        Some(_) => Err(PolicyError::WrongType {
            key: key.to_string(),
            expected: "boolean",
        }),
    }
}

/// Reads an optional string key.
///
/// # Errors
///
/// [`PolicyError::WrongType`] if the key holds a non-string.
pub fn get_str<'t>(table: &'t Table, key: &str) -> Result<Option<&'t str>, PolicyError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(PolicyError::WrongType {
            key: key.to_string(),
            expected: "string",
        }),
    }
}

/// Reads a required string key.
///
/// # Errors
///
/// [`PolicyError::MissingParameter`] naming `context` when absent, plus
/// the [`get_str`] failures.
pub fn require_str<'t>(
    table: &'t Table,
    key: &str,
    context: &str,
) -> Result<&'t str, PolicyError> {
    get_str(table, key)?.ok_or_else(|| PolicyError::MissingParameter {
        context: context.to_string(),
        key: key.to_string(),
    })
}

/// Reads an optional sub-table.
///
/// # Errors
///
/// [`PolicyError::WrongType`] if the key holds a non-table.
pub fn get_table<'t>(table: &'t Table, key: &str) -> Result<Option<&'t Table>, PolicyError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Table(value)) => Ok(Some(value)),
        Some(_) => Err(PolicyError::WrongType {
            key: key.to_string(),
            expected: "table",
        }),
    }
}

/// Warns about keys the given policy does not recognize.
///
/// Unknown keys are tolerated (the host's validator may still reject
/// them) but flagged, since a typo here usually means a silently ignored
/// parameter. [`COMMON_KEYS`] are always accepted.
pub fn warn_unknown_keys(table: &Table, policy: &str, known: &[&str]) {
    for key in table.keys() {
        if COMMON_KEYS.contains(&key.as_str()) || known.contains(&key.as_str()) {
            continue;
        }
        warn!(policy, key, "ignoring unrecognized configuration key");
    }
}
