use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of an entity as recorded in a replay log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to an entity owned by the host world.
///
/// Handles are opaque to the replay engine; it only stores them to address
/// entities it created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(pub Uuid);

impl EntityHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.simple().to_string();
        write!(f, "{}", &s[..8])
    }
}

/// Host-side pose: geocentric position plus geocentric orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: DVec3,
    pub orientation: DQuat,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            orientation: DQuat::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_handle_uniqueness() {
        let a = EntityHandle::new();
        let b = EntityHandle::new();
        assert_ne!(a, b);
    }

    #[test]
    fn placement_default_is_identity() {
        let p = Placement::default();
        assert_eq!(p.position, DVec3::ZERO);
        assert_eq!(p.orientation, DQuat::IDENTITY);
    }

    #[test]
    fn entity_id_orders_numerically() {
        let mut ids = vec![EntityId(10), EntityId(2), EntityId(-1), EntityId(7)];
        ids.sort();
        assert_eq!(ids, vec![EntityId(-1), EntityId(2), EntityId(7), EntityId(10)]);
        assert_eq!(EntityId(7).to_string(), "#7");
        assert_eq!(EntityId(-1).to_string(), "#-1");
    }

    #[test]
    fn entity_id_serializes_as_integer() {
        let json = serde_json::to_string(&EntityId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn handle_display_is_short() {
        let h = EntityHandle::new();
        assert_eq!(h.to_string().len(), 8);
    }
}
