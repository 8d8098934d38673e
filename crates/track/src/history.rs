use replay_common::EntityId;
use replay_geodesy::{Geodesy, LatLonAlt, smallest_angle_from_to};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::log::Event;
use crate::sample::{Sample, sample};

/// Event sequences that cannot form a valid set of lifecycles.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReferenceError {
    #[error("t={time}: entity {entity_id} was never created")]
    UnknownEntity { entity_id: EntityId, time: f64 },
    #[error("t={time}: entity {entity_id} already created; id reuse is not supported")]
    DuplicateCreate { entity_id: EntityId, time: f64 },
    #[error("t={time}: entity {entity_id} already destroyed")]
    AlreadyDestroyed { entity_id: EntityId, time: f64 },
    #[error("entity {entity_id} destroyed at t={destroyed_at}, not after its creation at t={created_at}")]
    EmptyLifecycle {
        entity_id: EntityId,
        created_at: f64,
        destroyed_at: f64,
    },
    #[error("t={time}: state of entity {entity_id} precedes its creation at t={created_at}")]
    SampleBeforeCreation {
        entity_id: EntityId,
        time: f64,
        created_at: f64,
    },
    #[error("t={time}: state of entity {entity_id} precedes its previous state at t={previous}")]
    OutOfOrder {
        entity_id: EntityId,
        time: f64,
        previous: f64,
    },
}

/// Reconstructed lifecycle and pose series of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHistory {
    pub entity_id: EntityId,
    pub template_name: String,
    pub display_name: String,
    pub created_at: f64,
    pub destroyed_at: Option<f64>,
    /// Strictly increasing in time, angles unwrapped.
    pub samples: Vec<Sample>,
}

impl EntityHistory {
    /// Whether `time` falls inside the lifecycle window `[created_at, destroyed_at)`.
    pub fn in_lifecycle(&self, time: f64) -> bool {
        time >= self.created_at && self.destroyed_at.is_none_or(|end| time < end)
    }

    /// Whether the entity should be materialized at `time`. A history without
    /// samples is never active.
    pub fn is_active_at(&self, time: f64) -> bool {
        !self.samples.is_empty() && self.in_lifecycle(time)
    }

    /// Interpolated or extrapolated pose at `time`.
    pub fn sample_at(&self, time: f64) -> Option<Sample> {
        sample(&self.samples, time)
    }

    /// Last instant the history says anything about.
    pub fn end_time(&self) -> f64 {
        let last_sample = self.samples.last().map_or(self.created_at, |s| s.time);
        self.destroyed_at.map_or(last_sample, |d| d.max(last_sample))
    }
}

/// Immutable set of histories from one log load, ordered by entity id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySet {
    histories: BTreeMap<EntityId, EntityHistory>,
}

impl HistorySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityHistory> {
        self.histories.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityHistory> {
        self.histories.values()
    }

    /// Histories active at `time`, in entity id order.
    pub fn active_at(&self, time: f64) -> impl Iterator<Item = &EntityHistory> {
        self.histories.values().filter(move |h| h.is_active_at(time))
    }

    /// Earliest creation and latest recorded instant across all histories.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        self.histories.values().fold(None, |span, h| {
            let (start, end) = (h.created_at, h.end_time());
            Some(match span {
                None => (start, end),
                Some((s, e)) => (f64::min(s, start), f64::max(e, end)),
            })
        })
    }

    pub fn sample_count(&self) -> usize {
        self.histories.values().map(|h| h.samples.len()).sum()
    }
}

/// Builds a [`HistorySet`] from events, one event at a time.
///
/// Positions are converted to geocentric through the supplied [`Geodesy`];
/// roll/pitch/yaw are converted to radians and unwrapped so consecutive samples
/// never differ by more than π on any channel.
pub struct HistoryBuilder<G> {
    geodesy: G,
    histories: BTreeMap<EntityId, EntityHistory>,
}

impl<G: Geodesy> HistoryBuilder<G> {
    pub fn new(geodesy: G) -> Self {
        Self {
            geodesy,
            histories: BTreeMap::new(),
        }
    }

    /// Build histories from a complete event sequence. Fails on the first
    /// event that breaks a lifecycle.
    pub fn build<'a>(
        geodesy: G,
        events: impl IntoIterator<Item = &'a Event>,
    ) -> Result<HistorySet, ReferenceError> {
        let mut builder = Self::new(geodesy);
        for event in events {
            builder.apply(event)?;
        }
        Ok(builder.finish())
    }

    pub fn apply(&mut self, event: &Event) -> Result<(), ReferenceError> {
        match event {
            Event::CreateEntity {
                time,
                entity_id,
                template_name,
                display_name,
            } => self.create(*time, *entity_id, template_name, display_name),
            Event::DestroyEntity { time, entity_id } => self.destroy(*time, *entity_id),
            Event::UpdateState {
                time,
                entity_id,
                latitude,
                longitude,
                altitude,
                roll,
                pitch,
                yaw,
            } => {
                let lla = LatLonAlt::from_degrees(*latitude, *longitude, *altitude);
                let raw = Sample {
                    time: *time,
                    position: self.geodesy.geodetic_to_geocentric(lla),
                    roll: roll.to_radians(),
                    pitch: pitch.to_radians(),
                    yaw: yaw.to_radians(),
                };
                self.update(*entity_id, raw)
            }
        }
    }

    pub fn finish(self) -> HistorySet {
        HistorySet {
            histories: self.histories,
        }
    }

    fn create(
        &mut self,
        time: f64,
        entity_id: EntityId,
        template_name: &str,
        display_name: &str,
    ) -> Result<(), ReferenceError> {
        match self.histories.entry(entity_id) {
            Entry::Occupied(_) => Err(ReferenceError::DuplicateCreate { entity_id, time }),
            Entry::Vacant(slot) => {
                slot.insert(EntityHistory {
                    entity_id,
                    template_name: template_name.to_string(),
                    display_name: display_name.to_string(),
                    created_at: time,
                    destroyed_at: None,
                    samples: Vec::new(),
                });
                Ok(())
            }
        }
    }

    fn destroy(&mut self, time: f64, entity_id: EntityId) -> Result<(), ReferenceError> {
        let history = self.history_mut(entity_id, time)?;
        if history.destroyed_at.is_some() {
            return Err(ReferenceError::AlreadyDestroyed { entity_id, time });
        }
        if time <= history.created_at {
            return Err(ReferenceError::EmptyLifecycle {
                entity_id,
                created_at: history.created_at,
                destroyed_at: time,
            });
        }
        history.destroyed_at = Some(time);
        Ok(())
    }

    fn update(&mut self, entity_id: EntityId, raw: Sample) -> Result<(), ReferenceError> {
        let history = self.history_mut(entity_id, raw.time)?;
        if raw.time < history.created_at {
            return Err(ReferenceError::SampleBeforeCreation {
                entity_id,
                time: raw.time,
                created_at: history.created_at,
            });
        }

        // A repeated timestamp replaces the last sample.
        if let Some(last) = history.samples.last() {
            if raw.time < last.time {
                return Err(ReferenceError::OutOfOrder {
                    entity_id,
                    time: raw.time,
                    previous: last.time,
                });
            }
            if raw.time == last.time {
                history.samples.pop();
            }
        }

        let stored = match history.samples.last() {
            Some(prev) => Sample {
                roll: unwrap_angle(prev.roll, raw.roll),
                pitch: unwrap_angle(prev.pitch, raw.pitch),
                yaw: unwrap_angle(prev.yaw, raw.yaw),
                ..raw
            },
            None => raw,
        };
        history.samples.push(stored);
        Ok(())
    }

    fn history_mut(
        &mut self,
        entity_id: EntityId,
        time: f64,
    ) -> Result<&mut EntityHistory, ReferenceError> {
        self.histories
            .get_mut(&entity_id)
            .ok_or(ReferenceError::UnknownEntity { entity_id, time })
    }
}

/// Shift `angle` by whole turns so it lies within π of `previous`.
fn unwrap_angle(previous: f64, angle: f64) -> f64 {
    previous + smallest_angle_from_to(previous, angle)
}
