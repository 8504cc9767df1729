//! Tracking of the host framework's processing phase.
//!
//! The service only learns about the host through its callbacks; this
//! module keeps the little state those callbacks establish (which phase
//! the job is in, which module and event are current) so registrations
//! can be policed and per-event seeds can be derived.
//!
//! # Phase flow
//!
//! ```text
//! NotStarted → ServiceConstruction → ModuleConstruction ⇄ Idle
//!                                        Idle ⇄ ModuleBeginRun
//!                                        Idle → Event ⇄ ModuleEvent
//!                                        Event → Idle ⇄ EndJob
//! ```
//!
//! Every "pre" callback moves into a phase and the matching "post"
//! callback moves back out; a post callback arriving in any other phase
//! is a logic error.

use crate::ServiceError;
use serde::{Deserialize, Serialize};
use sower_types::EventData;
use std::fmt;
use tracing::debug;

/// The host processing phase, as far as the seed service cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    /// No host activity seen yet.
    NotStarted,
    /// Services (including this one) are being constructed.
    ///
    /// The only phase where global engines may be registered.
    ServiceConstruction,
    /// A module is being constructed.
    ///
    /// The only phase where module-scoped engines may be registered.
    ModuleConstruction,
    /// A module is in its begin-of-run callback.
    ModuleBeginRun,
    /// An event is being prepared, before any module runs.
    Event,
    /// A module is processing the current event.
    ModuleEvent,
    /// A module is in its end-of-job callback.
    EndJob,
    /// Between tracked phases.
    Idle,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "job start",
            Self::ServiceConstruction => "service construction",
            Self::ModuleConstruction => "module construction",
            Self::ModuleBeginRun => "begin of run for a module",
            Self::Event => "event preparation",
            Self::ModuleEvent => "event processing by a module",
            Self::EndJob => "end of job",
            Self::Idle => "no tracked phase",
        };
        f.write_str(name)
    }
}

/// Identity of the module a host callback refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// The module's configured label.
    pub label: String,
    /// Name of the process the module runs in.
    pub process_name: String,
}

impl ModuleInfo {
    /// Creates a module description.
    #[must_use]
    pub fn new(label: impl Into<String>, process_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            process_name: process_name.into(),
        }
    }
}

/// Identity of the event a host callback refers to.
///
/// The timestamp is optional: empty or synthetic events may not carry
/// one, and event-dependent seed algorithms must refuse to run on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Run number.
    pub run: u32,
    /// Subrun number.
    pub subrun: u32,
    /// Event number.
    pub event: u32,
    /// Event timestamp, when the event has a meaningful one.
    pub timestamp: Option<u64>,
}

impl EventInfo {
    /// Creates an event identity with a valid timestamp.
    #[must_use]
    pub fn new(run: u32, subrun: u32, event: u32, timestamp: u64) -> Self {
        Self {
            run,
            subrun,
            event,
            timestamp: Some(timestamp),
        }
    }
}

/// The host state the service adapter tracks between callbacks.
#[derive(Debug, Default)]
pub struct HostState {
    phase: Option<JobPhase>,
    module: Option<ModuleInfo>,
    event: Option<EventInfo>,
    process_name: String,
}

impl HostState {
    /// Starts in [`JobPhase::NotStarted`] with no module or event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> JobPhase {
        self.phase.unwrap_or(JobPhase::NotStarted)
    }

    /// Moves to `to`, provided the current phase is one of `from`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::IllegalPhase`] naming `operation` when the
    /// current phase is not in `from`.
    pub fn transit(
        &mut self,
        from: &[JobPhase],
        to: JobPhase,
        operation: &'static str,
    ) -> Result<(), ServiceError> {
        let current = self.phase();
        if !from.contains(&current) {
            return Err(ServiceError::IllegalPhase {
                operation,
                phase: current,
            });
        }
        debug!(from = %current, to = %to, "host phase transition");
        self.phase = Some(to);
        Ok(())
    }

    /// The label of the current module, if a module is current.
    #[must_use]
    pub fn module_label(&self) -> Option<&str> {
        self.module.as_ref().map(|module| module.label.as_str())
    }

    /// The process name, once any module has reported it.
    #[must_use]
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Records the current module.
    ///
    /// # Errors
    ///
    /// [`ServiceError::ProcessNameChanged`] if the module reports a
    /// different process name than previously seen; one job runs in one
    /// process.
    pub fn set_module(&mut self, module: ModuleInfo) -> Result<(), ServiceError> {
        if !module.process_name.is_empty() {
            if !self.process_name.is_empty() && self.process_name != module.process_name {
                return Err(ServiceError::ProcessNameChanged {
                    previous: self.process_name.clone(),
                    current: module.process_name,
                });
            }
            self.process_name = module.process_name.clone();
        }
        self.module = Some(module);
        Ok(())
    }

    /// Forgets the current module.
    pub fn clear_module(&mut self) {
        self.module = None;
    }

    /// Records the current event.
    pub fn set_event(&mut self, event: EventInfo) {
        self.event = Some(event);
    }

    /// Forgets the current event.
    pub fn clear_event(&mut self) {
        self.event = None;
    }

    /// Assembles the event context for per-event seed derivation.
    ///
    /// Fields with nothing current fall back to their empty values; the
    /// timestamp validity flag reflects whether the current event
    /// actually carried one.
    #[must_use]
    pub fn event_data(&self) -> EventData {
        let event = self.event.unwrap_or_default();
        EventData {
            run: event.run,
            subrun: event.subrun,
            event: event.event,
            timestamp: event.timestamp.unwrap_or_default(),
            is_time_valid: event.timestamp.is_some(),
            process_name: self.process_name.clone(),
            module_label: self.module_label().unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_started() {
        let state = HostState::new();
        assert_eq!(state.phase(), JobPhase::NotStarted);
        assert!(state.module_label().is_none());
    }

    #[test]
    fn transit_from_allowed_phase() {
        let mut state = HostState::new();
        state
            .transit(
                &[JobPhase::NotStarted],
                JobPhase::ServiceConstruction,
                "service construction",
            )
            .unwrap();
        assert_eq!(state.phase(), JobPhase::ServiceConstruction);
    }

    #[test]
    fn transit_from_wrong_phase_is_an_error() {
        let mut state = HostState::new();
        let err = state
            .transit(&[JobPhase::Event], JobPhase::ModuleEvent, "module event")
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::IllegalPhase {
                operation: "module event",
                phase: JobPhase::NotStarted,
            }
        ));
        // failed transition leaves the phase untouched
        assert_eq!(state.phase(), JobPhase::NotStarted);
    }

    #[test]
    fn module_tracking() {
        let mut state = HostState::new();
        state
            .set_module(ModuleInfo::new("generator", "TestJob"))
            .unwrap();
        assert_eq!(state.module_label(), Some("generator"));
        assert_eq!(state.process_name(), "TestJob");

        state.clear_module();
        assert!(state.module_label().is_none());
        // the process name outlives the module
        assert_eq!(state.process_name(), "TestJob");
    }

    #[test]
    fn process_name_must_not_change() {
        let mut state = HostState::new();
        state.set_module(ModuleInfo::new("a", "JobA")).unwrap();
        let err = state
            .set_module(ModuleInfo::new("b", "JobB"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::ProcessNameChanged { .. }));
    }

    #[test]
    fn event_data_assembly() {
        let mut state = HostState::new();
        state.set_module(ModuleInfo::new("gen", "TestJob")).unwrap();
        state.set_event(EventInfo::new(1, 2, 3, 12345));

        let data = state.event_data();
        assert_eq!(data.run, 1);
        assert_eq!(data.subrun, 2);
        assert_eq!(data.event, 3);
        assert_eq!(data.timestamp, 12345);
        assert!(data.is_time_valid);
        assert_eq!(data.process_name, "TestJob");
        assert_eq!(data.module_label, "gen");
    }

    #[test]
    fn event_without_timestamp_marks_time_invalid() {
        let mut state = HostState::new();
        state.set_event(EventInfo {
            run: 1,
            subrun: 0,
            event: 5,
            timestamp: None,
        });
        let data = state.event_data();
        assert!(!data.is_time_valid);
        assert_eq!(data.timestamp, 0);
    }

    #[test]
    fn event_data_outside_event_is_empty() {
        let state = HostState::new();
        let data = state.event_data();
        assert_eq!(data.run, 0);
        assert!(!data.is_time_valid);
        assert!(data.module_label.is_empty());
    }
}
