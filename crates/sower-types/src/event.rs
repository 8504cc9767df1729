//! Per-event context consumed by event-dependent seed policies.

use serde::{Deserialize, Serialize};

/// The slice of an event's identity that can enter a seed.
///
/// Assembled by the service adapter from the host's current event and
/// module context; consumed only by event-dependent policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// Run number.
    pub run: u32,

    /// Subrun number within the run.
    pub subrun: u32,

    /// Event number within the subrun.
    pub event: u32,

    /// Event timestamp; meaningful only when [`is_time_valid`](Self::is_time_valid).
    pub timestamp: u64,

    /// Whether the timestamp carries real information.
    ///
    /// Empty or synthetic events may not have one; algorithms that need
    /// the timestamp must refuse to run without it.
    pub is_time_valid: bool,

    /// Name of the running process.
    pub process_name: String,

    /// Label of the module being processed.
    pub module_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_invalid_time() {
        let data = EventData::default();
        assert!(!data.is_time_valid);
        assert_eq!(data.timestamp, 0);
    }
}
