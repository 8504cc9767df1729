//! Seed master and host-framework adapter for the sower engine.
//!
//! Guarantees every random engine in a batch job a seed that is
//! reproducible from configuration plus event identity and free of
//! accidental collisions, while still honoring explicit user overrides.
//!
//! # Layers
//!
//! ```text
//! host framework callbacks ──► SeedService ──► SeedMaster ──► SeedPolicy
//!                                  │               │
//!                              HostState      EngineRecords,
//!                           (phase, module,    seed caches
//!                              event)
//! ```
//!
//! [`SeedMaster`] is usable on its own in host-less contexts; inside a
//! framework, go through [`SeedService`], which adds identifier
//! qualification, phase policing, override resolution, and the
//! callback-driven reseeding schedule.
//!
//! # Example
//!
//! ```
//! use sower_service::{ModuleInfo, SeedService};
//! use sower_types::{EngineId, Seed};
//!
//! let config = "policy = \"autoIncrement\"\nbaseSeed = 1\ncheckRange = false"
//!     .parse()
//!     .unwrap();
//! let service = SeedService::from_config(&config).unwrap();
//!
//! // a module registers its engine during construction
//! service
//!     .pre_module_construction(ModuleInfo::new("generator", "MyJob"))
//!     .unwrap();
//! let seed = service
//!     .register_engine(Box::new(|_: &EngineId, _: Seed| {}), "")
//!     .unwrap();
//! assert_eq!(seed, 1);
//! ```

mod error;
mod master;
mod seeder;
mod service;
mod state;

pub use error::ServiceError;
pub use master::SeedMaster;
pub use seeder::{BoxedSeeder, EngineSeeder, ReseedableEngine, RngSeeder, Seeder};
pub use service::SeedService;
pub use state::{EventInfo, HostState, JobPhase, ModuleInfo};
