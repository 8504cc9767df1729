//! The seed service: the adapter between the master and the host.
//!
//! Modules never talk to the [`SeedMaster`] directly. The service
//! qualifies their short instance names against the current module,
//! polices which host phase each operation is legal in, resolves seed
//! overrides from configuration, and drives reseeding from the host's
//! phase callbacks.
//!
//! The service is a process-wide singleton for the life of the job;
//! share it as `Arc<SeedService>`. All entry points take `&self`; the
//! master and the host state live behind mutexes, which also makes the
//! explicit-label seed query safe to call from worker threads.

use crate::{
    BoxedSeeder, EventInfo, HostState, JobPhase, ModuleInfo, SeedMaster, ServiceError,
};
use parking_lot::Mutex;
use sower_policy::params;
use sower_types::{is_seed_valid, EngineId, Seed};
use toml::Table;
use tracing::{debug, info};

/// Policy-driven seed distribution, wired to a host framework.
///
/// # Configuration
///
/// Built from a key/value table (conventionally the `[services.sower]`
/// subtree of the job configuration):
///
/// ```toml
/// [services.sower]
/// policy = "autoIncrement"
/// verbosity = 0
/// endOfJobSummary = false
/// baseSeed = 1
/// maxUniqueEngines = 20
/// ```
///
/// `policy` selects the seed policy (see `sower-policy`); `verbosity`
/// and `endOfJobSummary` control diagnostics. The remaining keys belong
/// to the selected policy.
///
/// # Registration vocabulary
///
/// | Call | When | Effect |
/// |------|------|--------|
/// | [`register_engine`](Self::register_engine) | module construction | bind seeder, seed immediately |
/// | [`register_engine_with_seed`](Self::register_engine_with_seed) | module construction | same, explicit override |
/// | [`register_engine_from_config`](Self::register_engine_from_config) | module construction | same, override from parameters |
/// | [`declare_engine`](Self::declare_engine) | module construction | record id only, no seeder |
/// | [`define_engine`](Self::define_engine) | module construction | attach seeder to a declared id |
/// | [`get_seed`](Self::get_seed) | any phase | query (lazily declares unknown ids) |
///
/// Global engines have the same vocabulary with `global` in the name and
/// are only registrable during service construction.
pub struct SeedService {
    master: Mutex<SeedMaster>,
    state: Mutex<HostState>,
    verbosity: i64,
    end_of_job_summary: bool,
}

impl SeedService {
    /// Builds the service and enters the service-construction phase.
    ///
    /// # Errors
    ///
    /// Configuration failures from the policy factory or the common
    /// keys.
    pub fn from_config(table: &Table) -> Result<Self, ServiceError> {
        let verbosity = params::get_i64(table, "verbosity")?.unwrap_or(0);
        let end_of_job_summary = params::get_bool(table, "endOfJobSummary")?.unwrap_or(false);
        let master = SeedMaster::from_config(table)?;

        let mut state = HostState::new();
        state.transit(
            &[JobPhase::NotStarted],
            JobPhase::ServiceConstruction,
            "service construction",
        )?;

        if verbosity > 0 {
            info!("{}", master.policy());
        }

        Ok(Self {
            master: Mutex::new(master),
            state: Mutex::new(state),
            verbosity,
            end_of_job_summary,
        })
    }

    // ── Registration ─────────────────────────────────────────────

    /// Registers a module-scoped engine and seeds it before returning.
    ///
    /// # Errors
    ///
    /// Phase, duplicate-id, and policy failures.
    pub fn register_engine(
        &self,
        seeder: BoxedSeeder,
        instance: &str,
    ) -> Result<Seed, ServiceError> {
        self.register_engine_with_seed(seeder, instance, None)
    }

    /// Registers a module-scoped engine with an optional seed override.
    ///
    /// A valid override freezes the engine on the spot: the override is
    /// pushed into the engine and no policy-driven reseed will ever
    /// touch it again. `Some(0)` and `None` both mean "no override".
    ///
    /// # Errors
    ///
    /// Phase, duplicate-id, and policy failures.
    pub fn register_engine_with_seed(
        &self,
        seeder: BoxedSeeder,
        instance: &str,
        seed: Option<Seed>,
    ) -> Result<Seed, ServiceError> {
        let id = self.qualify(instance, "engine registration")?;
        self.register_id(id, Some(seeder), seed)
    }

    /// Registers a module-scoped engine, resolving the override from
    /// configuration parameters.
    ///
    /// The candidate parameter `names` are tried in order against
    /// `parameters`; the first key present with a non-zero value wins.
    /// A key present with value 0 is skipped; that is the documented
    /// way to neutralize an override without deleting the key.
    ///
    /// # Errors
    ///
    /// Phase, duplicate-id, parameter-type, and policy failures.
    pub fn register_engine_from_config(
        &self,
        seeder: BoxedSeeder,
        instance: &str,
        parameters: &Table,
        names: &[&str],
    ) -> Result<Seed, ServiceError> {
        let seed = read_seed_parameter(parameters, names)?;
        self.register_engine_with_seed(seeder, instance, seed)
    }

    /// Registers a global engine and seeds it before returning.
    ///
    /// # Errors
    ///
    /// Phase, duplicate-id, and policy failures.
    pub fn register_global_engine(
        &self,
        seeder: BoxedSeeder,
        instance: &str,
    ) -> Result<Seed, ServiceError> {
        self.register_global_engine_with_seed(seeder, instance, None)
    }

    /// Registers a global engine with an optional seed override.
    ///
    /// # Errors
    ///
    /// Phase, duplicate-id, and policy failures.
    pub fn register_global_engine_with_seed(
        &self,
        seeder: BoxedSeeder,
        instance: &str,
        seed: Option<Seed>,
    ) -> Result<Seed, ServiceError> {
        self.register_id(EngineId::global(instance), Some(seeder), seed)
    }

    /// Registers a global engine, resolving the override from
    /// configuration parameters (see
    /// [`register_engine_from_config`](Self::register_engine_from_config)).
    ///
    /// # Errors
    ///
    /// Phase, duplicate-id, parameter-type, and policy failures.
    pub fn register_global_engine_from_config(
        &self,
        seeder: BoxedSeeder,
        instance: &str,
        parameters: &Table,
        names: &[&str],
    ) -> Result<Seed, ServiceError> {
        let seed = read_seed_parameter(parameters, names)?;
        self.register_global_engine_with_seed(seeder, instance, seed)
    }

    /// Declares a module-scoped engine without a seeder and returns its
    /// configured seed.
    ///
    /// The id is recorded, so a later [`register_engine`] for it fails;
    /// attach the seeder later with [`define_engine`].
    ///
    /// [`register_engine`]: Self::register_engine
    /// [`define_engine`]: Self::define_engine
    ///
    /// # Errors
    ///
    /// Phase, duplicate-id, and policy failures.
    pub fn declare_engine(&self, instance: &str) -> Result<Seed, ServiceError> {
        let id = self.qualify(instance, "engine declaration")?;
        self.register_id(id, None, None)
    }

    /// Declares a module-scoped engine with an override resolved from
    /// configuration parameters.
    ///
    /// # Errors
    ///
    /// Phase, duplicate-id, parameter-type, and policy failures.
    pub fn declare_engine_from_config(
        &self,
        instance: &str,
        parameters: &Table,
        names: &[&str],
    ) -> Result<Seed, ServiceError> {
        let id = self.qualify(instance, "engine declaration")?;
        let seed = read_seed_parameter(parameters, names)?;
        self.register_id(id, None, seed)
    }

    /// Attaches a seeder to an engine declared earlier and pushes the
    /// current seed into it.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotDeclared`] for ids never declared,
    /// [`ServiceError::AlreadyDefined`] for ids that already have a
    /// seeder, plus phase failures.
    pub fn define_engine(
        &self,
        seeder: BoxedSeeder,
        instance: &str,
    ) -> Result<Seed, ServiceError> {
        let id = self.qualify(instance, "engine definition")?;
        let mut master = self.master.lock();
        if !master.has_engine(&id) {
            return Err(ServiceError::NotDeclared { id });
        }
        if master.has_seeder(&id) {
            return Err(ServiceError::AlreadyDefined { id });
        }
        drop(master);
        self.ensure_registration_phase(false, "engine definition")?;

        let mut master = self.master.lock();
        master.register_seeder(id.clone(), Some(seeder));
        master.reseed(&id)
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Returns the seed of the named engine of the current module.
    ///
    /// Querying an engine nobody registered declares it on the fly with
    /// no seeder, which also freezes it out of any future registration.
    /// The lazy declaration is subject to the same phase rules as an
    /// explicit one.
    ///
    /// # Errors
    ///
    /// No-current-module, phase (lazy path only), and policy failures.
    pub fn get_seed(&self, instance: &str) -> Result<Seed, ServiceError> {
        let id = self.qualify(instance, "seed query")?;
        self.get_seed_of(id)
    }

    /// Returns the seed of an engine of an explicitly named module.
    ///
    /// This is the entry point worker threads may call concurrently; it
    /// locks internally. Unknown ids take the lazy-declaration path,
    /// which is phase-checked and rejects one of two contending callers
    /// through the duplicate-id check.
    ///
    /// # Errors
    ///
    /// Phase (lazy path only) and policy failures.
    pub fn get_seed_for(
        &self,
        module_label: &str,
        instance: &str,
    ) -> Result<Seed, ServiceError> {
        self.get_seed_of(EngineId::new(module_label, instance))
    }

    /// Returns the seed of a global engine, lazily declaring it like
    /// [`get_seed`](Self::get_seed) does.
    ///
    /// # Errors
    ///
    /// Phase (lazy path only) and policy failures.
    pub fn get_global_seed(&self, instance: &str) -> Result<Seed, ServiceError> {
        debug!(instance, "global seed query");
        self.get_seed_of(EngineId::global(instance))
    }

    /// The most recently assigned seed of `id`, without computing
    /// anything.
    #[must_use]
    pub fn get_current_seed(&self, id: &EngineId) -> Seed {
        self.master.lock().get_current_seed(id)
    }

    /// Returns `true` if an engine with this id was registered.
    #[must_use]
    pub fn has_engine(&self, id: &EngineId) -> bool {
        self.master.lock().has_engine(id)
    }

    /// The end-of-job seed report.
    #[must_use]
    pub fn summary(&self) -> String {
        self.master.lock().summary()
    }

    // ── Host callbacks ───────────────────────────────────────────

    /// A module constructor is about to run.
    ///
    /// # Errors
    ///
    /// Phase pairing violations.
    pub fn pre_module_construction(&self, module: ModuleInfo) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.transit(
            &[JobPhase::ServiceConstruction, JobPhase::Idle],
            JobPhase::ModuleConstruction,
            "pre_module_construction",
        )?;
        state.set_module(module)
    }

    /// The module constructor returned.
    ///
    /// # Errors
    ///
    /// Phase pairing violations.
    pub fn post_module_construction(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.transit(
            &[JobPhase::ModuleConstruction],
            JobPhase::Idle,
            "post_module_construction",
        )?;
        state.clear_module();
        Ok(())
    }

    /// A module's begin-run callback is about to run.
    ///
    /// # Errors
    ///
    /// Phase pairing violations.
    pub fn pre_module_begin_run(&self, module: ModuleInfo) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.transit(
            &[JobPhase::ServiceConstruction, JobPhase::Idle],
            JobPhase::ModuleBeginRun,
            "pre_module_begin_run",
        )?;
        state.set_module(module)
    }

    /// The module's begin-run callback returned.
    ///
    /// # Errors
    ///
    /// Phase pairing violations.
    pub fn post_module_begin_run(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.transit(
            &[JobPhase::ModuleBeginRun],
            JobPhase::Idle,
            "post_module_begin_run",
        )?;
        state.clear_module();
        Ok(())
    }

    /// A new event is about to be processed.
    ///
    /// Clears the per-event seed cache, then reseeds every global
    /// engine, before any module sees the event.
    ///
    /// # Errors
    ///
    /// Phase pairing violations and policy failures during reseeding.
    pub fn pre_event(&self, event: EventInfo) -> Result<(), ServiceError> {
        {
            let mut state = self.state.lock();
            state.transit(
                &[JobPhase::ServiceConstruction, JobPhase::Idle],
                JobPhase::Event,
                "pre_event",
            )?;
            state.set_event(event);
        }
        self.master.lock().on_new_event();
        debug!("new event: reseeding global engines");
        self.reseed_matching(|id| id.is_global())
    }

    /// A module's event callback is about to run.
    ///
    /// Reseeds every engine of that module, so the reseed happens-before
    /// the module processes the event.
    ///
    /// # Errors
    ///
    /// Phase pairing violations and policy failures during reseeding.
    pub fn pre_module_event(&self, module: ModuleInfo) -> Result<(), ServiceError> {
        let label = module.label.clone();
        {
            let mut state = self.state.lock();
            state.transit(
                &[JobPhase::Event],
                JobPhase::ModuleEvent,
                "pre_module_event",
            )?;
            state.set_module(module)?;
        }
        debug!(module = %label, "reseeding module engines");
        self.reseed_matching(|id| !id.is_global() && id.module_label == label)
    }

    /// The module's event callback returned.
    ///
    /// # Errors
    ///
    /// Phase pairing violations.
    pub fn post_module_event(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.transit(&[JobPhase::ModuleEvent], JobPhase::Event, "post_module_event")?;
        state.clear_module();
        Ok(())
    }

    /// The event is fully processed.
    ///
    /// # Errors
    ///
    /// Phase pairing violations.
    pub fn post_event(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.transit(&[JobPhase::Event], JobPhase::Idle, "post_event")?;
        state.clear_event();
        Ok(())
    }

    /// A module's end-job callback is about to run.
    ///
    /// # Errors
    ///
    /// Phase pairing violations.
    pub fn pre_module_end_job(&self, module: ModuleInfo) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.transit(
            &[JobPhase::ServiceConstruction, JobPhase::Idle],
            JobPhase::EndJob,
            "pre_module_end_job",
        )?;
        state.set_module(module)
    }

    /// The module's end-job callback returned.
    ///
    /// # Errors
    ///
    /// Phase pairing violations.
    pub fn post_module_end_job(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.transit(&[JobPhase::EndJob], JobPhase::Idle, "post_module_end_job")?;
        state.clear_module();
        Ok(())
    }

    /// The job is over; emits the seed report when configured to.
    pub fn post_end_job(&self) {
        if self.verbosity >= 1 || self.end_of_job_summary {
            info!("{}", self.summary());
        }
    }

    // ── Internals ────────────────────────────────────────────────

    /// Builds a module-scoped id for `instance` against the current
    /// module.
    fn qualify(&self, instance: &str, operation: &'static str) -> Result<EngineId, ServiceError> {
        let state = self.state.lock();
        match state.module_label() {
            Some(label) => Ok(EngineId::new(label, instance)),
            None => Err(ServiceError::NoCurrentModule { operation }),
        }
    }

    /// Fails unless the host is in the construction phase matching the
    /// engine's scope.
    fn ensure_registration_phase(
        &self,
        global: bool,
        operation: &'static str,
    ) -> Result<(), ServiceError> {
        let phase = self.state.lock().phase();
        let legal = if global {
            phase == JobPhase::ServiceConstruction
        } else {
            phase == JobPhase::ModuleConstruction
        };
        if legal {
            Ok(())
        } else {
            Err(ServiceError::IllegalPhase { operation, phase })
        }
    }

    /// Creates the record, resolves the override, and seeds the engine
    /// before returning.
    fn register_id(
        &self,
        id: EngineId,
        seeder: Option<BoxedSeeder>,
        override_seed: Option<Seed>,
    ) -> Result<Seed, ServiceError> {
        self.ensure_registration_phase(id.is_global(), "engine registration")?;

        let mut master = self.master.lock();
        master.register_new_seeder(id.clone(), seeder)?;

        match override_seed.filter(|&seed| is_seed_valid(seed)) {
            Some(seed) => {
                // freeze first, then push the override itself
                master.freeze_seed(&id, seed)?;
                master.apply_seed(&id, seed);
                info!(engine = %id, seed, "seed overridden and frozen");
                Ok(seed)
            }
            None => {
                let seed = master.get_seed(&id)?;
                if is_seed_valid(seed) {
                    master.apply_seed(&id, seed);
                }
                Ok(seed)
            }
        }
    }

    /// Queries a seed, lazily declaring the engine when unknown.
    fn get_seed_of(&self, id: EngineId) -> Result<Seed, ServiceError> {
        {
            let mut master = self.master.lock();
            if master.has_engine(&id) {
                return master.get_seed(&id);
            }
        }
        // backward-compatible lazy declaration: record the id with no
        // seeder, which blocks any later registration of the same id
        self.ensure_registration_phase(id.is_global(), "seed query")?;
        let mut master = self.master.lock();
        master.register_new_seeder(id.clone(), None)?;
        master.get_seed(&id)
    }

    /// Reseeds every registered engine matching `select` from the
    /// current event context.
    fn reseed_matching<F>(&self, select: F) -> Result<(), ServiceError>
    where
        F: Fn(&EngineId) -> bool,
    {
        let data = self.state.lock().event_data();
        let mut master = self.master.lock();
        let ids: Vec<EngineId> = master.engine_ids().filter(|id| select(id)).cloned().collect();
        for id in ids {
            let seed = master.reseed_event(&id, &data)?;
            if is_seed_valid(seed) {
                info!(engine = %id, seed, "engine reseeded for this event");
            } else {
                debug!(engine = %id, "no event-specific seed for engine");
            }
        }
        Ok(())
    }
}

/// Resolves a seed override from candidate parameter names.
///
/// The first name present with a non-zero integer value wins; names
/// present with value 0 are skipped (the documented escape hatch for
/// disabling an inherited override).
fn read_seed_parameter(
    parameters: &Table,
    names: &[&str],
) -> Result<Option<Seed>, ServiceError> {
    for name in names {
        if let Some(seed) = params::get_seed(parameters, name)? {
            if is_seed_valid(seed) {
                return Ok(Some(seed));
            }
        }
    }
    Ok(None)
}
