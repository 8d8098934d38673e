use glam::{DQuat, DVec3};
use replay_common::EntityHandle;
use std::path::PathBuf;

/// Errors a host world may report back to the replay engine.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("unknown entity template: {0}")]
    UnknownTemplate(String),
    #[error("entity {0} not found")]
    EntityNotFound(EntityHandle),
}

/// Operations the replay engine needs from the hosting simulation.
pub trait HostWorld {
    /// Instantiate an entity from a template. The entity is not yet part of the
    /// simulated world until [`HostWorld::add_entity`] is called.
    fn create_entity(&mut self, template: &str, name: &str) -> Result<EntityHandle, HostError>;

    fn add_entity(&mut self, handle: EntityHandle) -> Result<(), HostError>;

    /// Remove an entity. Returns `false` if the host did not know the handle.
    fn remove_entity(&mut self, handle: EntityHandle) -> bool;

    fn set_position(&mut self, handle: EntityHandle, position: DVec3) -> Result<(), HostError>;

    fn set_orientation(&mut self, handle: EntityHandle, orientation: DQuat)
    -> Result<(), HostError>;

    /// Exclude the entity from scenario serialization.
    fn mark_non_serializable(&mut self, handle: EntityHandle) -> Result<(), HostError>;

    /// Prevent ordinary user action from deleting the entity.
    fn mark_non_deletable(&mut self, handle: EntityHandle) -> Result<(), HostError>;

    /// Stop the host from integrating the entity's own dynamics.
    fn disable_dynamics(&mut self, handle: EntityHandle) -> Result<(), HostError>;

    fn current_simulation_time(&self) -> f64;

    /// Resolve a file name against the host's search locations.
    fn resolve_file(&self, name: &str) -> Option<PathBuf>;
}

impl<H: HostWorld + ?Sized> HostWorld for &mut H {
    fn create_entity(&mut self, template: &str, name: &str) -> Result<EntityHandle, HostError> {
        (**self).create_entity(template, name)
    }

    fn add_entity(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        (**self).add_entity(handle)
    }

    fn remove_entity(&mut self, handle: EntityHandle) -> bool {
        (**self).remove_entity(handle)
    }

    fn set_position(&mut self, handle: EntityHandle, position: DVec3) -> Result<(), HostError> {
        (**self).set_position(handle, position)
    }

    fn set_orientation(
        &mut self,
        handle: EntityHandle,
        orientation: DQuat,
    ) -> Result<(), HostError> {
        (**self).set_orientation(handle, orientation)
    }

    fn mark_non_serializable(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        (**self).mark_non_serializable(handle)
    }

    fn mark_non_deletable(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        (**self).mark_non_deletable(handle)
    }

    fn disable_dynamics(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        (**self).disable_dynamics(handle)
    }

    fn current_simulation_time(&self) -> f64 {
        (**self).current_simulation_time()
    }

    fn resolve_file(&self, name: &str) -> Option<PathBuf> {
        (**self).resolve_file(name)
    }
}
