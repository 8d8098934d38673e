use replay_common::{EntityHandle, EntityId, Placement};
use replay_geodesy::Geodesy;
use replay_track::{HistorySet, Sample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entities the controller has materialized in the host, by log entity id.
pub type Registry = BTreeMap<EntityId, EntityHandle>;

/// Host-side markings applied to every entity created by replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFlags {
    pub serializable: bool,
    pub deletable: bool,
    pub dynamics_enabled: bool,
}

impl CreateFlags {
    /// Replay artifacts: not saved with the scenario, not user-deletable, and
    /// driven purely by the log.
    pub const REPLAY: Self = Self {
        serializable: false,
        deletable: false,
        dynamics_enabled: false,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateInstruction {
    pub entity_id: EntityId,
    pub template_name: String,
    pub display_name: String,
    pub placement: Placement,
    pub flags: CreateFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInstruction {
    pub entity_id: EntityId,
    pub handle: EntityHandle,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveInstruction {
    pub entity_id: EntityId,
    pub handle: EntityHandle,
}

/// Operations that bring the materialized set in line with the active set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub creates: Vec<CreateInstruction>,
    pub updates: Vec<UpdateInstruction>,
    pub removes: Vec<RemoveInstruction>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.removes.is_empty()
    }
}

/// Host placement for a sampled pose.
///
/// The orientation is built in the local frame at the sample's own latitude and
/// longitude, recovered from its geocentric position.
pub fn placement_of(sample: &Sample, geodesy: &impl Geodesy) -> Placement {
    let lla = geodesy.geocentric_to_geodetic(sample.position);
    Placement {
        position: sample.position,
        orientation: geodesy.euler_to_orientation_at(
            sample.roll,
            sample.pitch,
            sample.yaw,
            lla.lat,
            lla.lon,
        ),
    }
}

/// Compute create/update/remove operations for replay time `time`.
///
/// Pure: reads the histories and the current registry, mutates neither.
/// Every id in the result's creates is absent from `materialized`; every id in
/// updates and removes is present in it.
pub fn reconcile(
    histories: &HistorySet,
    materialized: &Registry,
    time: f64,
    geodesy: &impl Geodesy,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for history in histories.active_at(time) {
        let Some(sample) = history.sample_at(time) else {
            continue;
        };
        let placement = placement_of(&sample, geodesy);
        match materialized.get(&history.entity_id) {
            Some(&handle) => plan.updates.push(UpdateInstruction {
                entity_id: history.entity_id,
                handle,
                placement,
            }),
            None => plan.creates.push(CreateInstruction {
                entity_id: history.entity_id,
                template_name: history.template_name.clone(),
                display_name: history.display_name.clone(),
                placement,
                flags: CreateFlags::REPLAY,
            }),
        }
    }

    plan.removes = materialized
        .iter()
        .filter(|(id, _)| histories.get(**id).is_none_or(|h| !h.is_active_at(time)))
        .map(|(&entity_id, &handle)| RemoveInstruction { entity_id, handle })
        .collect();

    plan
}
