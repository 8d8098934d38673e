//! Host world boundary: the capability the replay engine drives.
//!
//! The engine never reaches for a global engine root. It is handed a
//! [`HostWorld`] and issues every entity mutation through it.
//!
//! # Invariants
//! - The host owns entity lifetime once an entity is created.
//! - Only the creator of an entity removes it.

pub mod host;
pub mod locate;
pub mod world;

pub use host::{HostError, HostWorld};
pub use locate::FileLocator;
pub use world::{EntityData, World, WorldEvent};
