use replay_common::EntityHandle;
use replay_geodesy::Geodesy;
use replay_track::{HistorySet, LoadError, load_histories};
use replay_world::{HostError, HostWorld};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigChange, ReplayConfig};
use crate::error::ReplayError;
use crate::reconcile::{CreateInstruction, ReconcilePlan, Registry, reconcile};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickStats {
    pub query_time: f64,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Entities materialized after the pass.
    pub materialized: usize,
}

/// Drives replay of a log against a host world.
///
/// Owns the materialized-entity registry: every entity it creates in the host
/// is recorded here and removed exactly once, by a later tick, by a reload, or by
/// [`ReplayController::teardown`]. Dropping the controller tears it down if the
/// owner has not.
pub struct ReplayController<H: HostWorld, G: Geodesy> {
    host: H,
    geodesy: G,
    config: ReplayConfig,
    histories: HistorySet,
    registry: Registry,
    last_load_error: Option<LoadError>,
    torn_down: bool,
}

impl<H: HostWorld, G: Geodesy> ReplayController<H, G> {
    /// Create an idle controller: no log, zero offset, nothing materialized.
    pub fn new(host: H, geodesy: G) -> Self {
        Self {
            host,
            geodesy,
            config: ReplayConfig::default(),
            histories: HistorySet::empty(),
            registry: Registry::new(),
            last_load_error: None,
            torn_down: false,
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn histories(&self) -> &HistorySet {
        &self.histories
    }

    /// Log entity id to host handle for every entity currently materialized.
    pub fn materialized(&self) -> &Registry {
        &self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access for the owner, e.g. to advance simulation time.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Why the most recent log load failed, if it did.
    pub fn last_load_error(&self) -> Option<&LoadError> {
        self.last_load_error.as_ref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// React to a configuration write, then re-seek at the host's current time.
    ///
    /// A new log path reloads histories. A failed load is logged and leaves an
    /// empty history set, so the re-seek removes whatever was materialized. A
    /// successful load first removes every entity of the previous log.
    pub fn on_config_changed(&mut self, change: ConfigChange) -> Result<TickStats, ReplayError> {
        if self.torn_down {
            return Err(ReplayError::TornDown);
        }
        self.config.apply(&change);
        if let ConfigChange::LogPath(_) = change {
            self.reload();
        }
        self.seek()
    }

    /// Reconcile the host against replay time `host_time - time_offset`.
    pub fn on_time_tick(&mut self, host_time: f64) -> Result<TickStats, ReplayError> {
        if self.torn_down {
            return Err(ReplayError::TornDown);
        }
        let query_time = self.config.replay_time(host_time);
        let _span = tracing::info_span!("replay_tick", query_time).entered();

        let plan = reconcile(&self.histories, &self.registry, query_time, &self.geodesy);
        let result = self.apply(&plan);

        let stats = TickStats {
            query_time,
            created: plan.creates.len(),
            updated: plan.updates.len(),
            removed: plan.removes.len(),
            materialized: self.registry.len(),
        };
        tracing::trace!(
            created = stats.created,
            updated = stats.updated,
            removed = stats.removed,
            total = stats.materialized,
            "replay tick complete"
        );
        result.map(|()| stats)
    }

    /// Remove every materialized entity from the host and clear the registry.
    ///
    /// Idempotent. After teardown the controller rejects further input.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let released = self.release_all();
        self.torn_down = true;
        tracing::info!(released, "replay controller torn down");
    }

    fn seek(&mut self) -> Result<TickStats, ReplayError> {
        let now = self.host.current_simulation_time();
        self.on_time_tick(now)
    }

    fn reload(&mut self) {
        match self.load() {
            Ok(histories) => {
                let released = self.release_all();
                if released > 0 {
                    tracing::debug!(released, "released entities of previous log");
                }
                self.histories = histories;
                self.last_load_error = None;
            }
            Err(err) => {
                tracing::error!(path = %self.config.log_path, error = %err, "failed to load replay log");
                self.histories = HistorySet::empty();
                self.last_load_error = Some(err);
            }
        }
    }

    fn load(&self) -> Result<HistorySet, LoadError> {
        let name = &self.config.log_path;
        if name.is_empty() {
            return Ok(HistorySet::empty());
        }
        let path = self
            .host
            .resolve_file(name)
            .ok_or_else(|| LoadError::NotFound(name.clone()))?;
        load_histories(&path, &self.geodesy)
    }

    /// Apply a plan: removes, then creates, then updates. Every instruction is
    /// attempted; the registry tracks what the host actually holds. The first
    /// host failure is returned.
    fn apply(&mut self, plan: &ReconcilePlan) -> Result<(), ReplayError> {
        let mut first_error = None;
        let mut record = |err: ReplayError| {
            tracing::warn!(error = %err, "replay operation failed");
            if first_error.is_none() {
                first_error = Some(err);
            }
        };

        for remove in &plan.removes {
            tracing::debug!(entity = %remove.entity_id, handle = %remove.handle, "removing replay entity");
            if !self.host.remove_entity(remove.handle) {
                tracing::warn!(entity = %remove.entity_id, "host no longer held replay entity");
            }
            self.registry.remove(&remove.entity_id);
        }

        for create in &plan.creates {
            match materialize(&mut self.host, create) {
                Ok(handle) => {
                    tracing::debug!(entity = %create.entity_id, %handle, name = %create.display_name, "created replay entity");
                    self.registry.insert(create.entity_id, handle);
                }
                Err(source) => record(ReplayError::Host {
                    entity_id: create.entity_id,
                    source,
                }),
            }
        }

        for update in &plan.updates {
            let placed = self
                .host
                .set_position(update.handle, update.placement.position)
                .and_then(|()| self.host.set_orientation(update.handle, update.placement.orientation));
            if let Err(source) = placed {
                // The host lost the entity; forget it so a later tick recreates it.
                if let HostError::EntityNotFound(_) = source {
                    self.registry.remove(&update.entity_id);
                }
                record(ReplayError::Host {
                    entity_id: update.entity_id,
                    source,
                });
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn release_all(&mut self) -> usize {
        let registry = std::mem::take(&mut self.registry);
        for (entity_id, handle) in &registry {
            if !self.host.remove_entity(*handle) {
                tracing::warn!(entity = %entity_id, "host no longer held replay entity");
            }
        }
        registry.len()
    }
}

impl<H: HostWorld, G: Geodesy> Drop for ReplayController<H, G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Create, mark, place and add one entity. If any step after creation fails the
/// half-built entity is removed again.
fn materialize(
    host: &mut impl HostWorld,
    create: &CreateInstruction,
) -> Result<EntityHandle, HostError> {
    let handle = host.create_entity(&create.template_name, &create.display_name)?;
    match prepare(host, handle, create) {
        Ok(()) => Ok(handle),
        Err(err) => {
            host.remove_entity(handle);
            Err(err)
        }
    }
}

fn prepare(
    host: &mut impl HostWorld,
    handle: EntityHandle,
    create: &CreateInstruction,
) -> Result<(), HostError> {
    if !create.flags.serializable {
        host.mark_non_serializable(handle)?;
    }
    if !create.flags.deletable {
        host.mark_non_deletable(handle)?;
    }
    if !create.flags.dynamics_enabled {
        host.disable_dynamics(handle)?;
    }
    host.set_position(handle, create.placement.position)?;
    host.set_orientation(handle, create.placement.orientation)?;
    host.add_entity(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_common::EntityId;
    use replay_geodesy::SphericalEarth;
    use replay_world::{FileLocator, World};

    const LOG: &str = "\
time,entity_id,event,arg1,arg2,arg3,arg4,arg5,arg6
0,1,create_entity,Jet,Alpha
0,1,update_entity_state,0,0,100,0,0,0
10,1,update_entity_state,0,1,100,0,0,90
2,2,create_entity,Ship,Bravo
2,2,update_entity_state,10,10,0,0,0,0
30,1,destroy_entity
";

    fn world_with_log(dir: &tempfile::TempDir, name: &str, body: &str) -> World {
        std::fs::write(dir.path().join(name), body).unwrap();
        World::new().with_locator(FileLocator::new().with_search_path(dir.path()))
    }

    #[test]
    fn idle_controller_does_nothing() {
        let mut ctl = ReplayController::new(World::new(), SphericalEarth::default());
        let stats = ctl.on_time_tick(5.0).unwrap();
        assert_eq!(stats.materialized, 0);
        assert!(ctl.histories().is_empty());
        assert!(ctl.host().events().is_empty());
    }

    #[test]
    fn log_path_change_loads_and_seeks() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world_with_log(&dir, "a.csv", LOG);
        world.set_time(5.0);
        let mut ctl = ReplayController::new(world, SphericalEarth::default());

        let stats = ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();
        assert_eq!(stats.query_time, 5.0);
        assert_eq!(stats.created, 2);
        assert_eq!(ctl.histories().len(), 2);
        assert!(ctl.last_load_error().is_none());
        assert_eq!(ctl.host().live_count(), 2);
    }

    #[test]
    fn created_entities_are_protected_replay_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = ReplayController::new(world_with_log(&dir, "a.csv", LOG), SphericalEarth::default());
        ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();

        let handle = ctl.materialized()[&EntityId(1)];
        let data = ctl.host().get(handle).unwrap();
        assert_eq!(data.template, "Jet");
        assert_eq!(data.name, "Alpha");
        assert!(data.in_world);
        assert!(!data.serializable && !data.deletable && !data.dynamics_enabled);
        assert_eq!(ctl.host().serializable_entities().count(), 0);
    }

    #[test]
    fn time_offset_shifts_replay_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = ReplayController::new(world_with_log(&dir, "a.csv", LOG), SphericalEarth::default());
        ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();
        assert_eq!(ctl.materialized().len(), 1);

        let stats = ctl.on_config_changed(ConfigChange::TimeOffset(-3.0)).unwrap();
        assert_eq!(stats.query_time, 3.0);
        assert_eq!(ctl.materialized().len(), 2);

        let stats = ctl.on_time_tick(28.0).unwrap();
        assert_eq!(stats.query_time, 31.0);
        assert_eq!(stats.removed, 1);
        assert!(!ctl.materialized().contains_key(&EntityId(1)));
    }

    #[test]
    fn unresolvable_path_yields_empty_histories() {
        let mut ctl = ReplayController::new(World::new(), SphericalEarth::default());
        let stats = ctl.on_config_changed(ConfigChange::LogPath("missing.csv".into())).unwrap();
        assert_eq!(stats.materialized, 0);
        assert!(matches!(ctl.last_load_error(), Some(LoadError::NotFound(name)) if name == "missing.csv"));
        assert_eq!(ctl.config().log_path, "missing.csv");
    }

    #[test]
    fn empty_path_clears_replay_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = ReplayController::new(world_with_log(&dir, "a.csv", LOG), SphericalEarth::default());
        ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();
        assert_eq!(ctl.host().entity_count(), 1);

        ctl.on_config_changed(ConfigChange::LogPath(String::new())).unwrap();
        assert!(ctl.last_load_error().is_none());
        assert_eq!(ctl.host().entity_count(), 0);
        assert!(ctl.materialized().is_empty());
    }

    #[test]
    fn teardown_removes_everything_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = ReplayController::new(world_with_log(&dir, "a.csv", LOG), SphericalEarth::default());
        ctl.on_config_changed(ConfigChange::TimeOffset(-5.0)).unwrap();
        ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();
        assert_eq!(ctl.host().entity_count(), 2);
        ctl.host_mut().drain_events();

        ctl.teardown();
        ctl.teardown();
        assert!(ctl.is_torn_down());
        assert_eq!(ctl.host().entity_count(), 0);
        assert_eq!(ctl.host().events().len(), 2);
        assert!(matches!(ctl.on_time_tick(1.0), Err(ReplayError::TornDown)));
        assert!(matches!(
            ctl.on_config_changed(ConfigChange::TimeOffset(0.0)),
            Err(ReplayError::TornDown)
        ));
    }

    #[test]
    fn teardown_of_unused_controller_is_safe() {
        let mut ctl = ReplayController::new(World::new(), SphericalEarth::default());
        ctl.teardown();
        assert!(ctl.host().events().is_empty());
    }

    #[test]
    fn drop_releases_host_entities() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world_with_log(&dir, "a.csv", LOG);
        {
            let mut ctl = ReplayController::new(&mut world, SphericalEarth::default());
            ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();
            assert_eq!(ctl.host().entity_count(), 1);
        }
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn unknown_template_fails_tick_but_keeps_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), LOG).unwrap();
        let world = World::with_templates(["Jet"])
            .with_locator(FileLocator::new().with_search_path(dir.path()));
        let mut ctl = ReplayController::new(world, SphericalEarth::default());
        ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();

        let err = ctl.on_time_tick(5.0).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Host {
                entity_id: EntityId(2),
                source: HostError::UnknownTemplate(_)
            }
        ));
        assert_eq!(ctl.materialized().keys().copied().collect::<Vec<_>>(), vec![EntityId(1)]);
        assert_eq!(ctl.host().entity_count(), 1);
    }

    #[test]
    fn entity_lost_by_host_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = ReplayController::new(world_with_log(&dir, "a.csv", LOG), SphericalEarth::default());
        ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();
        let handle = ctl.materialized()[&EntityId(1)];
        assert!(ctl.host_mut().remove_entity(handle));

        assert!(ctl.on_time_tick(1.0).is_err());
        assert!(ctl.materialized().is_empty());

        let stats = ctl.on_time_tick(1.0).unwrap();
        assert_eq!(stats.created, 1);
        assert_ne!(ctl.materialized()[&EntityId(1)], handle);
    }

    #[test]
    fn placement_follows_trajectory() {
        let dir = tempfile::tempdir().unwrap();
        let earth = SphericalEarth::default();
        let mut ctl = ReplayController::new(world_with_log(&dir, "a.csv", LOG), earth);
        ctl.on_config_changed(ConfigChange::LogPath("a.csv".into())).unwrap();
        ctl.on_time_tick(5.0).unwrap();

        let handle = ctl.materialized()[&EntityId(1)];
        let placement = ctl.host().get(handle).unwrap().placement;
        let lla = earth.geocentric_to_geodetic(placement.position);
        assert!((lla.lon.to_degrees() - 0.5).abs() < 1e-6);
        assert!(lla.lat.abs() < 1e-12);

        let expected = earth.euler_to_orientation_at(0.0, 0.0, 45f64.to_radians(), lla.lat, lla.lon);
        assert!(placement.orientation.abs_diff_eq(expected, 1e-9));
    }
}
