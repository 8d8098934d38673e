use glam::{DQuat, DVec3};
use replay_common::{EntityHandle, Placement};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::host::{HostError, HostWorld};
use crate::locate::FileLocator;

/// A record produced by every mutation of the in-memory world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Entity instantiated from a template (not yet in the world).
    Created {
        handle: EntityHandle,
        template: String,
        name: String,
    },
    /// Entity became part of the simulated world.
    Added { handle: EntityHandle },
    /// Entity removed from the world and dropped.
    Removed { handle: EntityHandle },
    PositionSet { handle: EntityHandle, position: DVec3 },
    OrientationSet {
        handle: EntityHandle,
        orientation: DQuat,
    },
}

/// Per-entity data stored in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub template: String,
    pub name: String,
    pub placement: Placement,
    /// Set once the entity has been added to the world.
    pub in_world: bool,
    pub serializable: bool,
    pub deletable: bool,
    pub dynamics_enabled: bool,
}

/// In-memory host world.
///
/// Stands in for a hosting simulation in tests and in the CLI. Entities are
/// kept in a BTreeMap for deterministic iteration. Every mutation is appended to
/// an event log so callers can check the exact order of host operations.
#[derive(Debug, Clone, Default)]
pub struct World {
    entities: BTreeMap<EntityHandle, EntityData>,
    /// Known templates. Empty means every template name is accepted.
    templates: BTreeSet<String>,
    time: f64,
    locator: FileLocator,
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an empty world at time 0 that accepts any template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world that only instantiates the given templates.
    pub fn with_templates<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: templates.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_locator(mut self, locator: FileLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn locator_mut(&mut self) -> &mut FileLocator {
        &mut self.locator
    }

    /// Current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Number of entities known to the world, added or not.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of entities that have been added to the world.
    pub fn live_count(&self) -> usize {
        self.entities.values().filter(|e| e.in_world).count()
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&EntityData> {
        self.entities.get(&handle)
    }

    /// Read-only access to all entities (BTreeMap for deterministic iteration).
    pub fn entities(&self) -> &BTreeMap<EntityHandle, EntityData> {
        &self.entities
    }

    /// Find the first entity with the given display name.
    pub fn find_by_name(&self, name: &str) -> Option<(EntityHandle, &EntityData)> {
        self.entities
            .iter()
            .find(|(_, data)| data.name == name)
            .map(|(handle, data)| (*handle, data))
    }

    /// Entities that a scenario save would write out.
    pub fn serializable_entities(&self) -> impl Iterator<Item = (&EntityHandle, &EntityData)> {
        self.entities.iter().filter(|(_, data)| data.serializable)
    }

    /// Delete an entity the way an interactive user would. Entities marked
    /// non-deletable are refused.
    pub fn delete_by_user(&mut self, handle: EntityHandle) -> Result<bool, HostError> {
        let data = self
            .entities
            .get(&handle)
            .ok_or(HostError::EntityNotFound(handle))?;
        if !data.deletable {
            tracing::warn!(%handle, name = %data.name, "refusing to delete protected entity");
            return Ok(false);
        }
        Ok(self.remove_entity(handle))
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    fn entity_mut(&mut self, handle: EntityHandle) -> Result<&mut EntityData, HostError> {
        self.entities
            .get_mut(&handle)
            .ok_or(HostError::EntityNotFound(handle))
    }
}

impl HostWorld for World {
    fn create_entity(&mut self, template: &str, name: &str) -> Result<EntityHandle, HostError> {
        if !self.templates.is_empty() && !self.templates.contains(template) {
            return Err(HostError::UnknownTemplate(template.to_string()));
        }
        let handle = EntityHandle::new();
        self.entities.insert(
            handle,
            EntityData {
                template: template.to_string(),
                name: name.to_string(),
                placement: Placement::default(),
                in_world: false,
                serializable: true,
                deletable: true,
                dynamics_enabled: true,
            },
        );
        self.event_log.push(WorldEvent::Created {
            handle,
            template: template.to_string(),
            name: name.to_string(),
        });
        Ok(handle)
    }

    fn add_entity(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        self.entity_mut(handle)?.in_world = true;
        self.event_log.push(WorldEvent::Added { handle });
        Ok(())
    }

    fn remove_entity(&mut self, handle: EntityHandle) -> bool {
        let removed = self.entities.remove(&handle).is_some();
        if removed {
            self.event_log.push(WorldEvent::Removed { handle });
        }
        removed
    }

    fn set_position(&mut self, handle: EntityHandle, position: DVec3) -> Result<(), HostError> {
        self.entity_mut(handle)?.placement.position = position;
        self.event_log.push(WorldEvent::PositionSet { handle, position });
        Ok(())
    }

    fn set_orientation(
        &mut self,
        handle: EntityHandle,
        orientation: DQuat,
    ) -> Result<(), HostError> {
        self.entity_mut(handle)?.placement.orientation = orientation;
        self.event_log.push(WorldEvent::OrientationSet {
            handle,
            orientation,
        });
        Ok(())
    }

    fn mark_non_serializable(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        self.entity_mut(handle)?.serializable = false;
        Ok(())
    }

    fn mark_non_deletable(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        self.entity_mut(handle)?.deletable = false;
        Ok(())
    }

    fn disable_dynamics(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        self.entity_mut(handle)?.dynamics_enabled = false;
        Ok(())
    }

    fn current_simulation_time(&self) -> f64 {
        self.time
    }

    fn resolve_file(&self, name: &str) -> Option<PathBuf> {
        self.locator.locate(name)
    }
}
