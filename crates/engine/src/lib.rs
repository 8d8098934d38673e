//! Replay engine: live-set reconciliation and the controller that drives it.
//!
//! # Invariants
//! - An entity is materialized at replay time `t` iff its history is active at `t`
//!   once a tick at `t` has completed.
//! - Every host entity the controller creates is removed exactly once.
//! - Reconciliation is pure; only the controller mutates the registry.

pub mod config;
pub mod controller;
pub mod error;
pub mod reconcile;

pub use config::{ConfigChange, ConfigError, ReplayConfig};
pub use controller::{ReplayController, TickStats};
pub use error::ReplayError;
pub use reconcile::{
    CreateFlags, CreateInstruction, ReconcilePlan, Registry, RemoveInstruction, UpdateInstruction,
    placement_of, reconcile,
};
