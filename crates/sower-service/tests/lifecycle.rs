//! Full-job integration scenarios for the seed service.
//!
//! Drives the service the way a host framework would: construction,
//! module registrations, events with their callbacks, end of job.

use parking_lot::Mutex;
use sower_service::{
    BoxedSeeder, EventInfo, ModuleInfo, SeedService, ServiceError,
};
use sower_types::{is_seed_valid, EngineId, ErrorCode, Seed, INVALID_SEED};
use std::sync::Arc;
use toml::Table;

/// Records every seed pushed into any engine, in order.
#[derive(Clone, Default)]
struct Recorder {
    log: Arc<Mutex<Vec<(String, Seed)>>>,
}

impl Recorder {
    fn seeder(&self) -> BoxedSeeder {
        let log = Arc::clone(&self.log);
        Box::new(move |id: &EngineId, seed: Seed| {
            log.lock().push((id.to_string(), seed));
        })
    }

    fn entries(&self) -> Vec<(String, Seed)> {
        self.log.lock().clone()
    }

    fn clear(&self) {
        self.log.lock().clear();
    }
}

fn service(src: &str) -> SeedService {
    let table: Table = src.parse().expect("test fixture must parse");
    SeedService::from_config(&table).expect("fixture must configure")
}

fn construct_module(service: &SeedService, label: &str) {
    service
        .pre_module_construction(ModuleInfo::new(label, "TestJob"))
        .expect("pre_module_construction");
}

fn finish_module_construction(service: &SeedService) {
    service
        .post_module_construction()
        .expect("post_module_construction");
}

// =============================================================================
// Registration-time seeding
// =============================================================================

mod registration {
    use super::*;

    #[test]
    fn seeder_runs_before_registration_returns() {
        let svc = service("policy = \"autoIncrement\"\nbaseSeed = 100\ncheckRange = false");
        let recorder = Recorder::default();

        construct_module(&svc, "generator");
        let seed = svc.register_engine(recorder.seeder(), "").unwrap();
        finish_module_construction(&svc);

        assert_eq!(seed, 100);
        assert_eq!(recorder.entries(), vec![("generator".to_string(), 100)]);
    }

    #[test]
    fn three_engines_get_consecutive_distinct_seeds() {
        let svc = service("policy = \"autoIncrement\"\nbaseSeed = 100\ncheckRange = false");
        let recorder = Recorder::default();

        construct_module(&svc, "modA");
        let a = svc.register_engine(recorder.seeder(), "").unwrap();
        finish_module_construction(&svc);

        construct_module(&svc, "modB");
        let bx = svc.register_engine(recorder.seeder(), "x").unwrap();
        let by = svc.register_engine(recorder.seeder(), "y").unwrap();
        finish_module_construction(&svc);

        assert_eq!((a, bx, by), (100, 101, 102));
        // re-querying returns the same values
        assert_eq!(svc.get_seed_for("modA", "").unwrap(), 100);
        assert_eq!(svc.get_seed_for("modB", "x").unwrap(), 101);
        assert_eq!(svc.get_seed_for("modB", "y").unwrap(), 102);
    }

    #[test]
    fn exhausting_the_job_window_aborts_registration() {
        let svc = service("policy = \"linearMapping\"\nnJob = 5\nmaxUniqueEngines = 2");
        let recorder = Recorder::default();

        construct_module(&svc, "gen");
        assert_eq!(svc.register_engine(recorder.seeder(), "a").unwrap(), 10);
        assert_eq!(svc.register_engine(recorder.seeder(), "b").unwrap(), 11);
        let err = svc.register_engine(recorder.seeder(), "c").unwrap_err();
        assert_eq!(err.code(), "POLICY_SEED_OUT_OF_RANGE");
    }

    #[test]
    fn tabulated_seeds_served_verbatim() {
        let svc = service("policy = \"preDefinedSeed\"\nmodA = 7\nmodB = { x = 9 }");
        let recorder = Recorder::default();

        construct_module(&svc, "modA");
        assert_eq!(svc.register_engine(recorder.seeder(), "").unwrap(), 7);
        finish_module_construction(&svc);

        construct_module(&svc, "modB");
        assert_eq!(svc.register_engine(recorder.seeder(), "x").unwrap(), 9);
        let err = svc.register_engine(recorder.seeder(), "y").unwrap_err();
        assert_eq!(err.code(), "POLICY_NO_ENGINE_ENTRY");
    }

    #[test]
    fn pre_event_seed_comes_from_init_policy() {
        let svc = service(
            "policy = \"perEvent\"\n\
             [initSeedPolicy]\n\
             policy = \"autoIncrement\"\nbaseSeed = 50\ncheckRange = false",
        );
        let recorder = Recorder::default();

        construct_module(&svc, "gen");
        let seed = svc.register_engine(recorder.seeder(), "").unwrap();
        assert_eq!(seed, 50);
        assert_eq!(recorder.entries(), vec![("gen".to_string(), 50)]);
    }
}

// =============================================================================
// Seed overrides
// =============================================================================

mod overrides {
    use super::*;

    fn register_with_params(params_src: &str) -> (SeedService, Recorder) {
        let svc = service("policy = \"autoIncrement\"\nbaseSeed = 100\ncheckRange = false");
        let recorder = Recorder::default();
        let params: Table = params_src.parse().expect("params fixture must parse");

        construct_module(&svc, "M");
        svc.register_engine_from_config(recorder.seeder(), "", &params, &["Seed", "MySeed"])
            .expect("registration");
        finish_module_construction(&svc);
        (svc, recorder)
    }

    #[test]
    fn present_parameter_freezes_the_engine() {
        let (svc, recorder) = register_with_params("Seed = 42");
        let id = EngineId::new("M", "");
        assert_eq!(svc.get_current_seed(&id), 42);
        // the override itself was pushed into the engine
        assert_eq!(recorder.entries(), vec![("M".to_string(), 42)]);
        assert!(svc.summary().contains("[overridden]"));
    }

    #[test]
    fn zero_valued_parameter_is_skipped() {
        let (svc, _) = register_with_params("Seed = 0\nMySeed = 7");
        assert_eq!(svc.get_current_seed(&EngineId::new("M", "")), 7);
    }

    #[test]
    fn absent_parameters_fall_back_to_the_policy() {
        let (svc, _) = register_with_params("");
        assert_eq!(svc.get_current_seed(&EngineId::new("M", "")), 100);
        assert!(!svc.summary().contains("[overridden]"));
    }

    #[test]
    fn frozen_engine_survives_events_untouched() {
        let svc = service("policy = \"perEvent\"");
        let recorder = Recorder::default();

        construct_module(&svc, "M");
        svc.register_engine_with_seed(recorder.seeder(), "", Some(42))
            .unwrap();
        finish_module_construction(&svc);
        recorder.clear();

        svc.pre_event(EventInfo::new(1, 0, 1, 5000)).unwrap();
        svc.pre_module_event(ModuleInfo::new("M", "TestJob")).unwrap();
        svc.post_module_event().unwrap();
        svc.post_event().unwrap();

        assert!(recorder.entries().is_empty(), "frozen engine was reseeded");
        assert_eq!(svc.get_current_seed(&EngineId::new("M", "")), 42);
    }
}

// =============================================================================
// Phase policing
// =============================================================================

mod phases {
    use super::*;

    #[test]
    fn registering_during_an_event_is_a_logic_error() {
        let svc = service("policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false");
        let recorder = Recorder::default();

        construct_module(&svc, "M");
        finish_module_construction(&svc);

        svc.pre_event(EventInfo::new(1, 0, 1, 5000)).unwrap();
        svc.pre_module_event(ModuleInfo::new("M", "TestJob")).unwrap();

        let err = svc.register_engine(recorder.seeder(), "late").unwrap_err();
        assert_eq!(err.code(), "SERVICE_ILLEGAL_PHASE");
    }

    #[test]
    fn mismatched_post_callback_is_a_logic_error() {
        let svc = service("policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false");
        let err = svc.post_module_event().unwrap_err();
        assert!(matches!(err, ServiceError::IllegalPhase { .. }));
    }

    #[test]
    fn module_begin_run_brackets() {
        let svc = service("policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false");
        construct_module(&svc, "M");
        finish_module_construction(&svc);

        svc.pre_module_begin_run(ModuleInfo::new("M", "TestJob"))
            .unwrap();
        svc.post_module_begin_run().unwrap();
        // and again for the next module
        svc.pre_module_begin_run(ModuleInfo::new("N", "TestJob"))
            .unwrap();
        svc.post_module_begin_run().unwrap();
    }

    #[test]
    fn end_job_brackets_and_summary() {
        let svc = service(
            "policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false\n\
             endOfJobSummary = true",
        );
        construct_module(&svc, "M");
        svc.register_engine(Recorder::default().seeder(), "").unwrap();
        finish_module_construction(&svc);

        svc.pre_module_end_job(ModuleInfo::new("M", "TestJob")).unwrap();
        svc.post_module_end_job().unwrap();
        svc.post_end_job();

        let report = svc.summary();
        assert!(report.contains('M'));
        assert!(report.contains("(same)"));
    }
}

// =============================================================================
// Per-event reseeding
// =============================================================================

mod events {
    use super::*;

    fn per_event_job() -> (SeedService, Recorder) {
        let svc = service("policy = \"perEvent\"");
        let recorder = Recorder::default();

        // global engine, registered while the service phase is open
        svc.register_global_engine(recorder.seeder(), "pileup")
            .unwrap();

        construct_module(&svc, "modA");
        svc.register_engine(recorder.seeder(), "").unwrap();
        finish_module_construction(&svc);

        construct_module(&svc, "modB");
        svc.register_engine(recorder.seeder(), "").unwrap();
        finish_module_construction(&svc);

        recorder.clear();
        (svc, recorder)
    }

    fn run_event(svc: &SeedService, event: EventInfo, modules: &[&str]) {
        svc.pre_event(event).unwrap();
        for label in modules {
            svc.pre_module_event(ModuleInfo::new(*label, "TestJob"))
                .unwrap();
            svc.post_module_event().unwrap();
        }
        svc.post_event().unwrap();
    }

    #[test]
    fn globals_reseed_before_any_module() {
        let (svc, recorder) = per_event_job();
        run_event(&svc, EventInfo::new(1, 0, 1, 9000), &["modA", "modB"]);

        let entries = recorder.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, "<global>.pileup");
        assert_eq!(entries[1].0, "modA");
        assert_eq!(entries[2].0, "modB");
        assert!(entries.iter().all(|(_, seed)| is_seed_valid(*seed)));
    }

    #[test]
    fn only_the_current_module_is_reseeded() {
        let (svc, recorder) = per_event_job();

        svc.pre_event(EventInfo::new(1, 0, 1, 9000)).unwrap();
        recorder.clear();
        svc.pre_module_event(ModuleInfo::new("modA", "TestJob"))
            .unwrap();
        svc.post_module_event().unwrap();

        let entries = recorder.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "modA");
    }

    #[test]
    fn seeds_change_between_events_and_repeat_within_one() {
        let (svc, recorder) = per_event_job();

        run_event(&svc, EventInfo::new(1, 0, 1, 9000), &["modA"]);
        let first: Vec<_> = recorder.entries();
        recorder.clear();

        // same event identity again: same seeds
        run_event(&svc, EventInfo::new(1, 0, 1, 9000), &["modA"]);
        assert_eq!(recorder.entries(), first);
        recorder.clear();

        // different event: different seeds
        run_event(&svc, EventInfo::new(1, 0, 2, 9001), &["modA"]);
        let second = recorder.entries();
        assert_eq!(second.len(), first.len());
        for ((_, a), (_, b)) in first.iter().zip(&second) {
            assert_ne!(a, b);
        }
    }

    #[test]
    fn event_without_timestamp_fails_the_reseed() {
        let (svc, _) = per_event_job();
        let timeless = EventInfo {
            run: 1,
            subrun: 0,
            event: 1,
            timestamp: None,
        };
        let err = svc.pre_event(timeless).unwrap_err();
        assert_eq!(err.code(), "POLICY_INVALID_TIMESTAMP");
    }

    #[test]
    fn fixed_policies_do_not_reseed_on_events() {
        let svc = service("policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false");
        let recorder = Recorder::default();

        construct_module(&svc, "modA");
        svc.register_engine(recorder.seeder(), "").unwrap();
        finish_module_construction(&svc);
        recorder.clear();

        run_event(&svc, EventInfo::new(1, 0, 1, 9000), &["modA"]);
        assert!(recorder.entries().is_empty());
        // the configured seed is still the current one
        assert_eq!(svc.get_current_seed(&EngineId::new("modA", "")), 1);
    }

    #[test]
    fn per_event_summary_marks_per_event_engines() {
        let (svc, _) = per_event_job();
        run_event(&svc, EventInfo::new(1, 0, 1, 9000), &["modA", "modB"]);

        let report = svc.summary();
        assert!(report.contains("(per event)"));
        assert!(report.contains("(global)"));
    }
}

// =============================================================================
// Invalid-seed bookkeeping
// =============================================================================

mod bookkeeping {
    use super::*;

    #[test]
    fn unqueried_engine_has_no_current_seed() {
        let svc = service("policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false");
        assert_eq!(
            svc.get_current_seed(&EngineId::new("ghost", "")),
            INVALID_SEED
        );
    }

    #[test]
    fn per_event_engine_before_first_event_reports_invalid() {
        let svc = service("policy = \"perEvent\"");
        let recorder = Recorder::default();

        construct_module(&svc, "M");
        let seed = svc.register_engine(recorder.seeder(), "").unwrap();
        assert_eq!(seed, INVALID_SEED);
        // nothing was pushed into the engine yet
        assert!(recorder.entries().is_empty());
        assert!(svc.summary().contains("INVALID!!!"));
    }
}
