use glam::DVec3;
use replay_common::{EntityHandle, EntityId};
use replay_geodesy::Geodesy;
use replay_track::{EntityHistory, HistorySet};
use replay_world::World;
use serde::Serialize;

/// Replay inspector for developer tooling.
///
/// Summarises loaded histories and the host world a replay drives, reporting
/// positions as geodetic coordinates in degrees and metres.
pub struct ReplayInspector;

impl ReplayInspector {
    pub fn history_summary(histories: &HistorySet) -> HistorySummary {
        HistorySummary {
            entity_count: histories.len(),
            sample_count: histories.sample_count(),
            time_span: histories.time_span(),
            entities: histories.iter().map(HistoryInfo::from).collect(),
        }
    }

    pub fn world_summary(world: &World) -> WorldSummary {
        WorldSummary {
            time: world.time(),
            entity_count: world.entity_count(),
            live_count: world.live_count(),
        }
    }

    /// Describe one world entity, with its position converted back to geodetic.
    pub fn inspect_entity(
        world: &World,
        handle: EntityHandle,
        geodesy: &impl Geodesy,
    ) -> Option<EntityInfo> {
        world.get(handle).map(|data| {
            let lla = geodesy.geocentric_to_geodetic(data.placement.position);
            EntityInfo {
                handle,
                template: data.template.clone(),
                name: data.name.clone(),
                latitude_deg: lla.lat.to_degrees(),
                longitude_deg: lla.lon.to_degrees(),
                altitude_m: lla.alt,
                geocentric: data.placement.position,
                in_world: data.in_world,
            }
        })
    }

    /// All entities in the world, ordered by handle.
    pub fn list_entities(world: &World, geodesy: &impl Geodesy) -> Vec<EntityInfo> {
        world
            .entities()
            .keys()
            .filter_map(|handle| Self::inspect_entity(world, *handle, geodesy))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub entity_count: usize,
    pub sample_count: usize,
    pub time_span: Option<(f64, f64)>,
    pub entities: Vec<HistoryInfo>,
}

impl std::fmt::Display for HistorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Histories: entities={} samples={}",
            self.entity_count, self.sample_count
        )?;
        match self.time_span {
            Some((start, end)) => write!(f, " span=[{start:.3}, {end:.3}]"),
            None => write!(f, " span=none"),
        }
    }
}

/// Lifecycle overview of a single history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryInfo {
    pub entity_id: EntityId,
    pub template_name: String,
    pub display_name: String,
    pub created_at: f64,
    pub destroyed_at: Option<f64>,
    pub samples: usize,
}

impl From<&EntityHistory> for HistoryInfo {
    fn from(history: &EntityHistory) -> Self {
        Self {
            entity_id: history.entity_id,
            template_name: history.template_name.clone(),
            display_name: history.display_name.clone(),
            created_at: history.created_at,
            destroyed_at: history.destroyed_at,
            samples: history.samples.len(),
        }
    }
}

impl std::fmt::Display for HistoryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}) created={:.3}",
            self.entity_id, self.display_name, self.template_name, self.created_at
        )?;
        if let Some(destroyed) = self.destroyed_at {
            write!(f, " destroyed={destroyed:.3}")?;
        }
        write!(f, " samples={}", self.samples)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSummary {
    pub time: f64,
    pub entity_count: usize,
    pub live_count: usize,
}

impl std::fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "World: time={:.3} entities={} live={}",
            self.time, self.entity_count, self.live_count
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityInfo {
    pub handle: EntityHandle,
    pub template: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub geocentric: DVec3,
    pub in_world: bool,
}

impl std::fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entity [{}] {} ({}) lat={:.6} lon={:.6} alt={:.1}",
            self.handle,
            self.name,
            self.template,
            self.latitude_deg,
            self.longitude_deg,
            self.altitude_m,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_geodesy::{LatLonAlt, SphericalEarth};
    use replay_track::{Event, HistoryBuilder};
    use replay_world::HostWorld;

    fn histories() -> HistorySet {
        let events = [
            Event::CreateEntity {
                time: 1.0,
                entity_id: EntityId(1),
                template_name: "Jet".into(),
                display_name: "Alpha".into(),
            },
            Event::UpdateState {
                time: 1.0,
                entity_id: EntityId(1),
                latitude: 10.0,
                longitude: 20.0,
                altitude: 100.0,
                roll: 0.0,
                pitch: 0.0,
                yaw: 0.0,
            },
            Event::UpdateState {
                time: 4.0,
                entity_id: EntityId(1),
                latitude: 10.5,
                longitude: 20.0,
                altitude: 100.0,
                roll: 0.0,
                pitch: 0.0,
                yaw: 0.0,
            },
            Event::DestroyEntity {
                time: 9.0,
                entity_id: EntityId(1),
            },
            Event::CreateEntity {
                time: 2.0,
                entity_id: EntityId(2),
                template_name: "Ship".into(),
                display_name: "Bravo".into(),
            },
        ];
        HistoryBuilder::build(SphericalEarth::default(), &events).unwrap()
    }

    #[test]
    fn history_summary_counts() {
        let summary = ReplayInspector::history_summary(&histories());
        assert_eq!(summary.entity_count, 2);
        assert_eq!(summary.sample_count, 2);
        assert_eq!(summary.entities[0].destroyed_at, Some(9.0));
        assert_eq!(summary.entities[1].samples, 0);
    }

    #[test]
    fn history_summary_display() {
        let summary = ReplayInspector::history_summary(&HistorySet::empty());
        let s = format!("{summary}");
        assert!(s.contains("entities=0"));
        assert!(s.contains("span=none"));

        let info = format!("{}", ReplayInspector::history_summary(&histories()).entities[0]);
        assert!(info.contains("Alpha"));
        assert!(info.contains("destroyed=9.000"));
    }

    #[test]
    fn world_summary_empty() {
        let summary = ReplayInspector::world_summary(&World::new());
        assert_eq!(summary.entity_count, 0);
        assert!(format!("{summary}").contains("entities=0"));
    }

    #[test]
    fn inspect_entity_reports_geodetic_position() {
        let earth = SphericalEarth::default();
        let mut world = World::new();
        let handle = world.create_entity("Jet", "Alpha").unwrap();
        let position = earth.geodetic_to_geocentric(LatLonAlt::from_degrees(45.0, -30.0, 250.0));
        world.set_position(handle, position).unwrap();
        world.add_entity(handle).unwrap();

        let info = ReplayInspector::inspect_entity(&world, handle, &earth).unwrap();
        assert!((info.latitude_deg - 45.0).abs() < 1e-9);
        assert!((info.longitude_deg + 30.0).abs() < 1e-9);
        assert!((info.altitude_m - 250.0).abs() < 1e-6);
        assert!(info.in_world);
        assert_eq!(ReplayInspector::list_entities(&world, &earth).len(), 1);
    }

    #[test]
    fn inspect_entity_not_found() {
        let world = World::new();
        let earth = SphericalEarth::default();
        assert!(ReplayInspector::inspect_entity(&world, EntityHandle::new(), &earth).is_none());
    }
}
