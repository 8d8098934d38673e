use replay_common::EntityId;
use replay_world::HostError;

/// Errors from driving the replay against a host world.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("host rejected operation for entity {entity_id}: {source}")]
    Host {
        entity_id: EntityId,
        #[source]
        source: HostError,
    },
    #[error("replay controller has been torn down")]
    TornDown,
}
