//! Shared types for the trajectory replay workspace.
//!
//! # Invariants
//! - `EntityId` names an entity in a replay log; `EntityHandle` names an entity in
//!   the host world. The two are never interchangeable.

mod types;

pub use types::{EntityHandle, EntityId, Placement};
