//! Core types for the sower seed-allocation engine.
//!
//! This crate is the foundation layer of the workspace: the value types
//! shared by the policy layer and the service adapter.
//!
//! # Crate architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  sower-types   : Seed, EngineId, EventData, ErrorCode ◄ HERE │
//! ├─────────────────────────────────────────────────────────────┤
//! │  sower-policy  : seed-assignment policies and their config  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  sower-service : SeedMaster, host phase tracking, adapter   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identity design
//!
//! Engines are identified structurally by [`EngineId`] (module label,
//! instance name, and scope), not by opaque handles. Two ids with equal
//! fields name the same engine, which is what makes seeds reproducible
//! from configuration plus identity alone.
//!
//! # Example
//!
//! ```
//! use sower_types::{is_seed_valid, EngineId, INVALID_SEED};
//!
//! let id = EngineId::new("generator", "aux");
//! assert_eq!(id.to_string(), "generator.aux");
//! assert!(!is_seed_valid(INVALID_SEED));
//! ```

mod error;
mod event;
mod id;
mod seed;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use event::EventData;
pub use id::{EngineId, EngineScope};
pub use seed::{is_seed_valid, Seed, INVALID_SEED};
