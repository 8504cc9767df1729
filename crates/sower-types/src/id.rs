//! Identifier types for random engines.
//!
//! Every random engine managed in a job is identified by an [`EngineId`]:
//! the label of the module that owns it, an instance name (a module may
//! own several engines), and a scope. Identifiers are structural: two
//! ids with the same fields are the same engine.

use serde::{Deserialize, Serialize};

/// The scope an engine belongs to.
///
/// # Scope semantics
///
/// | Scope | Owned by | Reseeded |
/// |-------|----------|----------|
/// | `Module` | a processing module | before the module's event callback |
/// | `Global` | the job itself | at event begin, before any module runs |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EngineScope {
    /// Tied to a specific module; the module label is non-empty.
    Module,

    /// Not tied to any module; the module label is empty.
    Global,
}

/// Identifier for a random engine in the job.
///
/// An id is a `(module_label, instance_name, scope)` triple. The module
/// label is empty exactly for global engines; the instance name may be
/// empty, meaning "the module's default engine".
///
/// Ids are immutable after construction and totally ordered by their
/// field tuple, so they can key ordered maps and produce stable reports.
///
/// # Example
///
/// ```
/// use sower_types::EngineId;
///
/// let default = EngineId::new("generator", "");
/// let named = EngineId::new("generator", "aux");
/// let global = EngineId::global("pileup");
///
/// assert_eq!(default.to_string(), "generator");
/// assert_eq!(named.to_string(), "generator.aux");
/// assert_eq!(global.to_string(), "<global>.pileup");
/// assert!(global.is_global());
/// assert!(default < named);
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EngineId {
    /// Label of the owning module; empty for global engines.
    pub module_label: String,

    /// Engine instance name within the module; may be empty.
    pub instance_name: String,

    /// Whether the engine is module-scoped or global.
    pub scope: EngineScope,
}

impl EngineId {
    /// Creates a module-scoped engine id.
    #[must_use]
    pub fn new(module_label: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            module_label: module_label.into(),
            instance_name: instance_name.into(),
            scope: EngineScope::Module,
        }
    }

    /// Creates a global engine id (no owning module).
    #[must_use]
    pub fn global(instance_name: impl Into<String>) -> Self {
        Self {
            module_label: String::new(),
            instance_name: instance_name.into(),
            scope: EngineScope::Global,
        }
    }

    /// Returns `true` if this engine is global.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.scope == EngineScope::Global
    }

    /// Returns `true` if the instance name is non-empty.
    #[must_use]
    pub fn has_instance(&self) -> bool {
        !self.instance_name.is_empty()
    }

    /// Checks if this id matches the given module label and instance name.
    #[must_use]
    pub fn matches(&self, module_label: &str, instance_name: &str) -> bool {
        self.module_label == module_label && self.instance_name == instance_name
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_global() {
            f.write_str("<global>")?;
        } else {
            f.write_str(&self.module_label)?;
        }
        if self.has_instance() {
            write!(f, ".{}", self.instance_name)?;
        }
        Ok(())
    }
}
